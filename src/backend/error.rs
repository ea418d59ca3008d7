use std::{io, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum BackendError {
    #[error("could not write '{}'", path.display())]
    #[diagnostic(code(backend::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("generated file '{}' would overwrite the input or the executable", path.display())]
    #[diagnostic(
        code(backend::intermediate_collides),
        help("choose an output name whose .c/.asm/.o siblings are not the input or the output")
    )]
    IntermediateCollides { path: PathBuf },

    #[error("could not run '{program}'")]
    #[diagnostic(
        code(backend::toolchain_unavailable),
        help("install it or point the matching --cc/--nasm/--ld option at it")
    )]
    ToolchainUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' failed with {}", describe_exit(.code))]
    #[diagnostic(code(backend::toolchain_failed))]
    ToolchainFailed { program: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by a signal)".into(),
    }
}
