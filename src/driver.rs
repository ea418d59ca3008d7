use std::{
    env::consts::EXE_SUFFIX,
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use tracing::info;

use crate::backend::{
    error::BackendError,
    toolchain::{remove_intermediate, AsmToolchain, NativeToolchain},
};

/// What the generated code is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Target {
    /// C source, built by a C compiler.
    #[default]
    Native,
    /// 32-bit NASM, assembled and linked for Linux.
    Asm,
}

impl Target {
    pub fn extension(self) -> &'static str {
        match self {
            Target::Native => "c",
            Target::Asm => "asm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub target: Target,
    pub remove_temp: bool,
    pub keep_object: bool,
    pub emit_only: bool,
    pub cc: PathBuf,
    pub nasm: PathBuf,
    pub ld: PathBuf,
}

impl Options {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            target: Target::default(),
            remove_temp: false,
            keep_object: false,
            emit_only: false,
            cc: "cc".into(),
            nasm: "nasm".into(),
            ld: "ld".into(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => executable_name(output.clone()),
            None => default_output(&self.input),
        }
    }

    pub fn intermediate_path(&self) -> PathBuf {
        self.output_path().with_extension(self.target.extension())
    }
}

/// The input's file stem in the current directory, as an executable name.
pub fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "a".into());
    executable_name(PathBuf::from(stem))
}

/// Appends the platform executable suffix to a name without an extension.
fn executable_name(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        return path;
    }
    let mut name = path.into_os_string();
    name.push(EXE_SUFFIX);
    name.into()
}

/// Files left on disk by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// Generated source, unless it was removed.
    pub intermediate: Option<PathBuf>,
    /// Absent when only the intermediate file was requested.
    pub executable: Option<PathBuf>,
}

/// Writes generated `code` next to the output and hands it to the toolchain.
pub fn build(options: &Options, code: &str) -> Result<Artifacts, BackendError> {
    let output = options.output_path();
    let intermediate = options.intermediate_path();
    let object = intermediate.with_extension("o");

    // generated files must not land on the source or the executable
    if intermediate == options.input || intermediate == output || object == output {
        return Err(BackendError::IntermediateCollides { path: intermediate });
    }

    fs::write(&intermediate, code).map_err(|source| BackendError::WriteFailed {
        path: intermediate.clone(),
        source,
    })?;
    info!(path = %intermediate.display(), "wrote intermediate file");

    if options.emit_only {
        return Ok(Artifacts {
            intermediate: Some(intermediate),
            executable: None,
        });
    }

    match options.target {
        Target::Native => NativeToolchain {
            compiler: options.cc.clone(),
            keep_object: options.keep_object,
        }
        .build(&intermediate, &output)?,
        Target::Asm => AsmToolchain {
            assembler: options.nasm.clone(),
            linker: options.ld.clone(),
            keep_object: options.keep_object,
        }
        .build(&intermediate, &output)?,
    }
    info!(path = %output.display(), "built executable");

    let intermediate = if options.remove_temp {
        remove_intermediate(&intermediate);
        None
    } else {
        Some(intermediate)
    };

    Ok(Artifacts {
        intermediate,
        executable: Some(output),
    })
}
