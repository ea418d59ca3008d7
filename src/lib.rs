//! Compiler for hercode, a small indentation-structured language. Source is
//! lexed, parsed into an AST, and then either transpiled to C or lowered to a
//! linear instruction form and emitted as 32-bit NASM.

use tracing::debug;

pub mod ast;
pub mod backend;
pub mod compile;
pub mod driver;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;

pub use driver::{Options, Target};
pub use error::{HercodeError, Result};

/// Generated code plus the warnings produced on the way.
#[derive(Debug)]
pub struct Compiled {
    pub code: String,
    pub diagnostics: Vec<HercodeError>,
}

/// Runs the in-memory pipeline for `target`. Fails only when the source has
/// no `start:` block.
pub fn translate(source: &str, target: Target) -> Result<Compiled> {
    let parsed = parse::parse(source)?;
    debug!(
        nodes = parsed.program.len(),
        diagnostics = parsed.diagnostics.len(),
        "parsed"
    );

    let code = match target {
        Target::Native => backend::generate_c(&parsed.program),
        Target::Asm => backend::generate_x86(&compile::compile(&parsed.program)),
    };

    Ok(Compiled {
        code,
        diagnostics: parsed.diagnostics,
    })
}
