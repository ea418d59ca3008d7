use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info, warn};

use crate::backend::error::BackendError;

/// Turns a generated C file into an executable with a C compiler driver.
#[derive(Debug, Clone)]
pub struct NativeToolchain {
    pub compiler: PathBuf,
    pub keep_object: bool,
}

impl NativeToolchain {
    pub fn build(&self, source: &Path, output: &Path) -> Result<(), BackendError> {
        let object = source.with_extension("o");

        let mut compile = Command::new(&self.compiler);
        compile.arg("-c").arg(source).arg("-o").arg(&object);
        run(compile)?;

        let mut link = Command::new(&self.compiler);
        link.arg(&object).arg("-o").arg(output);
        run(link)?;

        if !self.keep_object {
            remove_intermediate(&object);
        }
        Ok(())
    }
}

/// Assembles and links generated NASM for 32-bit Linux.
#[derive(Debug, Clone)]
pub struct AsmToolchain {
    pub assembler: PathBuf,
    pub linker: PathBuf,
    pub keep_object: bool,
}

impl AsmToolchain {
    pub fn build(&self, source: &Path, output: &Path) -> Result<(), BackendError> {
        let object = source.with_extension("o");

        let mut assemble = Command::new(&self.assembler);
        assemble
            .args(["-f", "elf32"])
            .arg(source)
            .arg("-o")
            .arg(&object);
        run(assemble)?;

        let mut link = Command::new(&self.linker);
        link.args(["-m", "elf_i386"]).arg(&object).arg("-o").arg(output);
        run(link)?;

        if !self.keep_object {
            remove_intermediate(&object);
        }
        Ok(())
    }
}

/// Runs a tool to completion and maps failure to a diagnostic.
fn run(mut command: Command) -> Result<(), BackendError> {
    let program = command.get_program().to_string_lossy().into_owned();
    info!(command = ?command, "running {program}");

    let status = command
        .status()
        .map_err(|source| BackendError::ToolchainUnavailable {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        debug!(program, "finished");
        Ok(())
    } else {
        Err(BackendError::ToolchainFailed {
            program,
            code: status.code(),
        })
    }
}

/// Best effort; a leftover file does not fail the build.
pub fn remove_intermediate(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed intermediate file"),
        Err(error) => warn!(path = %path.display(), %error, "could not remove intermediate file"),
    }
}
