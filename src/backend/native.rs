use itertools::Itertools;
use tracing::debug;

use crate::{
    ast::{FunctionRegistry, Node, Program},
    backend::{escape, Phase, Quoting},
};

const INCLUDES: [&str; 3] = ["stdio.h", "stdlib.h", "string.h"];

pub fn generate_c(program: &Program) -> String {
    let backend = NativeBackend::new(program);
    backend.generate(program)
}

pub struct NativeBackend<'a, 'src> {
    output: String,
    phase: Phase,
    functions: FunctionRegistry<'a, 'src>,
}

impl<'a, 'src> NativeBackend<'a, 'src> {
    pub fn new(program: &'a Program<'src>) -> Self {
        Self {
            output: String::new(),
            phase: Phase::Start,
            functions: FunctionRegistry::from_program(program),
        }
    }

    pub fn generate(mut self, program: &Program<'src>) -> String {
        self.phase.advance(Phase::InFunctionDecls);
        self.emit_header();
        self.emit_declarations();

        self.phase.advance(Phase::InEntryBody);
        self.writeln("int main(void)");
        self.writeln("{");
        for node in program {
            self.emit_statement(node);
        }
        self.writeln("    return 0;");
        self.writeln("}");

        self.phase.advance(Phase::InFunctionBodies);
        let functions: Vec<_> = self.functions.iter().collect();
        for (name, body) in functions {
            self.emit_function(name, body);
        }

        self.phase.advance(Phase::Done);
        debug!(bytes = self.output.len(), "generated C source");
        self.output
    }

    fn emit_header(&mut self) {
        let includes = INCLUDES
            .iter()
            .map(|header| format!("#include <{header}>"))
            .join("\n");
        self.writeln(&includes);
        self.writeln("");
    }

    fn emit_declarations(&mut self) {
        let declarations = self
            .functions
            .iter()
            .map(|(name, _)| format!("void {}(void);", function_name(name)))
            .join("\n");
        if !declarations.is_empty() {
            self.writeln(&declarations);
            self.writeln("");
        }
    }

    fn emit_function(&mut self, name: &str, body: &[Node]) {
        self.writeln("");
        self.writeln(&format!("void {}(void)", function_name(name)));
        self.writeln("{");
        for node in body {
            self.emit_statement(node);
        }
        self.writeln("}");
    }

    fn emit_statement(&mut self, node: &Node) {
        match node {
            Node::Emit(text) => {
                self.writeln(&format!(
                    "    fputs(\"{}\", stdout);",
                    escape(text, Quoting::C)
                ));
            }
            Node::FunctionCall(name) => {
                self.writeln(&format!("    {}();", function_name(name)));
            }
            Node::ForeignBlock(code) => self.writeln(code),
            // emitted separately
            Node::FunctionDef { .. } => {}
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

/// C identifier for a source-level function.
pub fn function_name(name: &str) -> String {
    format!("fn_{name}")
}
