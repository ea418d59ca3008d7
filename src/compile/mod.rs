use tracing::debug;

use crate::{ast::Program, compile::compiler::Compiler, ir::IR};

mod compiler;

/// Lowers a parsed program into the linear instruction form.
pub fn compile<'src>(program: &Program<'src>) -> IR<'src> {
    let mut compiler = Compiler::new();
    compiler.compile(program);

    let ir = compiler.end();
    debug!(instructions = ir.code.len(), "lowered program");
    ir
}
