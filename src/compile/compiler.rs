use tracing::trace;

use crate::{
    ast::{FunctionRegistry, Node, Program},
    ir::{Chunk, Instruction, Label, Operand, Register, Syscall, IR},
};

/// Standard output file descriptor.
const STDOUT: i32 = 1;
/// Bytes pushed for one write call: length, address and descriptor.
const WRITE_FRAME: i32 = 12;

#[derive(Debug, Default)]
pub struct Compiler<'src> {
    code: Vec<Instruction<'src>>,
}

impl<'src> Compiler<'src> {
    pub fn new() -> Self {
        Self { code: vec![] }
    }

    pub fn end(self) -> IR<'src> {
        Chunk { code: self.code }
    }

    pub fn compile(&mut self, program: &Program<'src>) {
        // function bodies come first, so skip past them
        self.emit(Instruction::jmp(Label::Entry).with_comment("Skip function bodies"));

        for (name, body) in FunctionRegistry::from_program(program).iter() {
            self.function(name, body);
        }

        self.emit(Instruction::label(Label::Entry).with_comment("Program entry point"));
        for node in program.iter().filter(|node| !node.is_function_def()) {
            self.statement(node);
        }

        self.epilogue();
    }

    fn function(&mut self, name: &'src str, body: &[Node<'src>]) {
        self.emit(Instruction::label(Label::Function(name)).with_comment(name));
        for node in body {
            self.statement(node);
        }
        self.emit(Instruction::ret().with_comment("Function return"));
    }

    fn statement(&mut self, node: &Node<'src>) {
        match node {
            Node::Emit(text) => self.say(text),
            Node::FunctionCall(name) => {
                self.emit(Instruction::call(Label::Function(name)).with_comment("Function call"));
            }
            // only meaningful to the C backend
            Node::ForeignBlock(_) => {}
            // definitions are lowered up front
            Node::FunctionDef { .. } => {}
        }
    }

    fn say(&mut self, text: &'src str) {
        let length = i32::try_from(text.len()).unwrap_or(i32::MAX);

        self.emit(Instruction::data(text).with_comment(text));
        self.emit(
            Instruction::push(Operand::Immediate(length)).with_comment("Prepare string length"),
        );
        self.emit(Instruction::push(Operand::String(text)).with_comment("Prepare string address"));
        self.emit(Instruction::push(Operand::Immediate(STDOUT)).with_comment("Prepare fd (stdout)"));
        self.emit(Instruction::syscall(Syscall::Write).with_comment("System call: write"));
        self.emit(Instruction::pop(WRITE_FRAME).with_comment("Clean up stack"));
    }

    fn epilogue(&mut self) {
        self.emit(Instruction::mov(Register::Eax, Syscall::Exit.number()).with_comment("Exit syscall"));
        self.emit(Instruction::mov(Register::Ebx, 0).with_comment("Exit code 0"));
        self.emit(Instruction::syscall(Syscall::Exit).with_comment("Execute syscall"));
    }

    fn emit(&mut self, instruction: Instruction<'src>) {
        trace!(%instruction, "lowered");
        self.code.push(instruction);
    }
}
