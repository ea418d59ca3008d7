use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, trace, warn};

use crate::{
    backend::{escape, Phase, Quoting},
    ir::{Instruction, Opcode, Operand, Register, Syscall, IR},
};

/// Indexed by `Register::id`.
const REGISTER_NAMES: [&str; 8] = ["eax", "ebx", "ecx", "edx", "esi", "edi", "esp", "ebp"];

/// Registers the kernel reads syscall arguments from, in argument order.
const ARGUMENT_REGISTERS: [Register; 3] = [Register::Ebx, Register::Ecx, Register::Edx];

pub fn generate_x86(ir: &IR) -> String {
    let backend = X86Backend::new();
    backend.generate(ir)
}

pub struct X86Backend {
    output: String,
    phase: Phase,
    /// Instruction index of each `DATA` to its synthesized label.
    strings: HashMap<usize, String>,
    /// Label of the most recent `DATA` seen while emitting code.
    current_string: Option<String>,
}

impl X86Backend {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            phase: Phase::Start,
            strings: HashMap::new(),
            current_string: None,
        }
    }

    /// Phases map onto the output as: declarations are the `.data` segment,
    /// the entry body is the `.text` header with `_start`, and function
    /// bodies are the instruction walk, which holds the functions and `entry`.
    pub fn generate(mut self, ir: &IR) -> String {
        self.writeln("BITS 32");

        self.phase.advance(Phase::InFunctionDecls);
        self.emit_data(ir);

        self.phase.advance(Phase::InEntryBody);
        self.emit_header();

        self.phase.advance(Phase::InFunctionBodies);
        for (index, instruction) in ir.code.iter().enumerate() {
            self.emit_instruction(index, instruction);
        }
        self.emit_exit();

        self.phase.advance(Phase::Done);
        debug!(
            strings = self.strings.len(),
            bytes = self.output.len(),
            "generated assembly"
        );
        self.output
    }

    fn emit_data(&mut self, ir: &IR) {
        self.writeln("section .data");

        let data = ir
            .code
            .iter()
            .enumerate()
            .filter(|(_, instruction)| instruction.opcode == Opcode::Data);

        for (number, (index, instruction)) in data.enumerate() {
            let label = format!("str_{number}");
            let text = match instruction.operand(0) {
                Some(Operand::String(text)) => text,
                _ => "",
            };
            self.writeln(&format!(
                "    {label} db `{}`, 0",
                escape(text, Quoting::Nasm)
            ));
            self.strings.insert(index, label);
        }
        self.writeln("");
    }

    fn emit_header(&mut self) {
        self.writeln("section .text");
        self.writeln("global _start");
        self.writeln("_start:");
    }

    fn emit_instruction(&mut self, index: usize, instruction: &Instruction) {
        if let Some(comment) = instruction.comment {
            self.writeln(&format!("    ; {}", escape(comment, Quoting::Nasm)));
        }

        match instruction.opcode {
            Opcode::Label => {
                if let Some(label) = instruction.operand(0) {
                    self.writeln(&format!("{label}:"));
                }
            }

            Opcode::Mov => {
                let operands = instruction
                    .operands()
                    .filter_map(|operand| self.operand(operand))
                    .join(", ");
                self.writeln(&format!("    mov {operands}"));
            }

            Opcode::Push => match instruction.operand(0) {
                Some(Operand::Immediate(value)) => self.writeln(&format!("    push dword {value}")),
                Some(Operand::Memory(address)) => {
                    self.writeln(&format!("    push dword [{address:#x}]"));
                }
                Some(operand) => match self.operand(operand) {
                    Some(text) => self.writeln(&format!("    push {text}")),
                    None => warn!(index, "push of a string with no preceding data; skipped"),
                },
                None => {}
            },

            Opcode::Call | Opcode::Jmp => {
                if let Some(label) = instruction.operand(0) {
                    let mnemonic = if instruction.opcode == Opcode::Call {
                        "call"
                    } else {
                        "jmp"
                    };
                    self.writeln(&format!("    {mnemonic} {label}"));
                }
            }

            Opcode::Ret => self.writeln("    ret"),

            Opcode::Syscall => {
                let (Some(Operand::Immediate(number)), Some(Operand::Immediate(arity))) =
                    (instruction.operand(0), instruction.operand(1))
                else {
                    trace!(index, "malformed syscall skipped");
                    return;
                };
                self.emit_syscall(number, arity);
            }

            Opcode::Pop => {
                if let Some(Operand::Immediate(bytes)) = instruction.operand(0) {
                    self.writeln(&format!("    add esp, {bytes}"));
                }
            }

            Opcode::Data => {
                // declared in .data; later pushes refer to this label
                self.current_string = self.strings.get(&index).cloned();
            }
        }
    }

    /// Loads the stacked arguments into the argument registers and traps.
    fn emit_syscall(&mut self, number: i32, arity: i32) {
        let arity = usize::try_from(arity).unwrap_or(0);
        for (slot, register) in ARGUMENT_REGISTERS.iter().take(arity).enumerate() {
            let name = REGISTER_NAMES[register.id()];
            match slot {
                0 => self.writeln(&format!("    mov {name}, [esp]")),
                _ => self.writeln(&format!("    mov {name}, [esp+{}]", slot * 4)),
            }
        }
        self.writeln(&format!("    mov eax, {number}"));
        self.writeln("    int 0x80");
    }

    /// Always present, even when the program already exits.
    fn emit_exit(&mut self) {
        self.writeln("    ; Exit syscall");
        self.writeln(&format!("    mov eax, {}", Syscall::Exit.number()));
        self.writeln("    mov ebx, 0");
        self.writeln("    int 0x80");
    }

    fn operand(&self, operand: Operand) -> Option<String> {
        match operand {
            Operand::Register(register) => Some(REGISTER_NAMES[register.id()].into()),
            Operand::Immediate(value) => Some(value.to_string()),
            Operand::Memory(address) => Some(format!("[{address:#x}]")),
            Operand::Label(label) => Some(label.to_string()),
            Operand::String(_) => self.current_string.clone(),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::Node,
        compile::compile,
        ir::{Chunk, Label},
    };

    fn assembly(program: &[Node]) -> String {
        generate_x86(&compile(&program.to_vec()))
    }

    #[test]
    fn strings_are_numbered_in_order() {
        let asm = assembly(&[
            Node::FunctionDef {
                name: "f",
                body: vec![Node::Emit("one")],
            },
            Node::Emit("two"),
            Node::Emit("three"),
        ]);

        assert!(asm.contains("section .data\n    str_0 db `one`, 0\n    str_1 db `two`, 0\n    str_2 db `three`, 0\n"));
        assert!(!asm.contains("str_3"));

        let first = asm.find("    push str_0").unwrap();
        let second = asm.find("    push str_1").unwrap();
        let third = asm.find("    push str_2").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn write_loads_arguments_from_stack() {
        let asm = assembly(&[Node::Emit("hi")]);

        assert!(asm.contains(
            "    push dword 2\n    ; Prepare string address\n    push str_0\n    \
             ; Prepare fd (stdout)\n    push dword 1\n    ; System call: write\n    \
             mov ebx, [esp]\n    mov ecx, [esp+4]\n    mov edx, [esp+8]\n    mov eax, 4\n    \
             int 0x80\n    ; Clean up stack\n    add esp, 12\n"
        ));
    }

    #[test]
    fn text_segment_layout() {
        let asm = assembly(&[
            Node::FunctionDef {
                name: "greet",
                body: vec![],
            },
            Node::FunctionCall("greet"),
        ]);

        assert!(asm.starts_with("BITS 32\nsection .data\n"));
        assert!(asm.contains("section .text\nglobal _start\n_start:\n"));
        assert!(asm.contains("    jmp entry\n"));
        assert!(asm.contains("fn_greet:\n    ; Function return\n    ret\n"));
        assert!(asm.contains("entry:\n    ; Function call\n    call fn_greet\n"));
    }

    #[test]
    fn exit_sequence_is_always_appended() {
        let asm = generate_x86(&Chunk::default());

        assert!(asm.ends_with("    ; Exit syscall\n    mov eax, 1\n    mov ebx, 0\n    int 0x80\n"));

        let lowered = assembly(&[]);
        assert_eq!(lowered.matches("int 0x80").count(), 2);
        assert!(lowered.contains("    mov eax, 1\n    ; Exit code 0\n    mov ebx, 0\n"));
    }

    #[test]
    fn comments_are_escaped_onto_one_line() {
        let asm = assembly(&[Node::Emit("a\nb")]);

        assert!(asm.contains("    ; a\\nb\n"));
        assert!(asm.contains("    str_0 db `a\\nb`, 0\n"));
    }

    #[test]
    fn unresolved_string_push_is_skipped() {
        let ir = Chunk {
            code: vec![
                Instruction::push(Operand::String("orphan")),
                Instruction::push(Operand::Label(Label::Entry)),
                Instruction::push(Operand::Register(Register::Ebp)),
            ],
        };
        let asm = generate_x86(&ir);

        assert!(!asm.contains("orphan"));
        assert!(asm.contains("    push entry\n    push ebp\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let program = [
            Node::FunctionDef {
                name: "f",
                body: vec![Node::Emit("x"), Node::Emit("y")],
            },
            Node::FunctionCall("f"),
            Node::Emit("z"),
        ];

        assert_eq!(assembly(&program), assembly(&program));
    }
}
