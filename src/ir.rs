use std::fmt::Display;

/// Name of the synthesized label the top-level statements start at.
pub const ENTRY_LABEL: &str = "entry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Eax,
    Ebx,
    Ecx,
    Edx,
    Esi,
    Edi,
    Esp,
    Ebp,
}

impl Register {
    pub fn id(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label<'src> {
    Entry,
    Function(&'src str),
}

impl Display for Label<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Entry => write!(f, "{ENTRY_LABEL}"),
            Label::Function(name) => write!(f, "fn_{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'src> {
    Register(Register),
    Immediate(i32),
    Memory(u32),
    Label(Label<'src>),
    String(&'src str),
}

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Register(register) => write!(f, "%{}", register.id()),
            Operand::Immediate(value) => write!(f, "#{value}"),
            Operand::Memory(address) => write!(f, "[{address:#x}]"),
            Operand::Label(label) => write!(f, "{label}"),
            Operand::String(text) => write!(f, "{text:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Mov,
    Call,
    Ret,
    Push,
    Pop,
    Syscall,
    Label,
    Jmp,
    Data,
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::Mov => "MOV",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Syscall => "SYSCALL",
            Opcode::Label => "LABEL",
            Opcode::Jmp => "JMP",
            Opcode::Data => "DATA",
        };
        write!(f, "{name}")
    }
}

/// Kernel services reachable through `SYSCALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Exit = 1,
    Write = 4,
}

impl Syscall {
    pub fn number(self) -> i32 {
        self as i32
    }

    /// Arguments the service takes from the stack.
    pub fn arity(self) -> i32 {
        match self {
            Syscall::Exit => 0,
            Syscall::Write => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'src> {
    pub opcode: Opcode,
    operands: [Option<Operand<'src>>; 3],
    pub comment: Option<&'src str>,
}

impl<'src> Instruction<'src> {
    pub fn new(opcode: Opcode, operands: &[Operand<'src>]) -> Self {
        assert!(operands.len() <= 3, "{opcode} takes at most 3 operands");
        let mut slots = [None; 3];
        for (slot, operand) in slots.iter_mut().zip(operands) {
            *slot = Some(*operand);
        }
        Self {
            opcode,
            operands: slots,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: &'src str) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn operand(&self, index: usize) -> Option<Operand<'src>> {
        self.operands.get(index).copied().flatten()
    }

    pub fn operands(&self) -> impl Iterator<Item = Operand<'src>> + '_ {
        self.operands.iter().flatten().copied()
    }

    pub fn mov(register: Register, value: i32) -> Self {
        Self::new(
            Opcode::Mov,
            &[Operand::Register(register), Operand::Immediate(value)],
        )
    }

    pub fn call(label: Label<'src>) -> Self {
        Self::new(Opcode::Call, &[Operand::Label(label)])
    }

    pub fn ret() -> Self {
        Self::new(Opcode::Ret, &[])
    }

    pub fn push(operand: Operand<'src>) -> Self {
        Self::new(Opcode::Push, &[operand])
    }

    /// Releases `bytes` of stack.
    pub fn pop(bytes: i32) -> Self {
        Self::new(Opcode::Pop, &[Operand::Immediate(bytes)])
    }

    pub fn syscall(service: Syscall) -> Self {
        Self::new(
            Opcode::Syscall,
            &[
                Operand::Immediate(service.number()),
                Operand::Immediate(service.arity()),
            ],
        )
    }

    pub fn label(label: Label<'src>) -> Self {
        Self::new(Opcode::Label, &[Operand::Label(label)])
    }

    pub fn jmp(label: Label<'src>) -> Self {
        Self::new(Opcode::Jmp, &[Operand::Label(label)])
    }

    pub fn data(text: &'src str) -> Self {
        Self::new(Opcode::Data, &[Operand::String(text)])
    }
}

impl Display for Instruction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, operand) in self.operands().enumerate() {
            let separator = if i == 0 { " " } else { ", " };
            write!(f, "{separator}{operand}")?;
        }
        if let Some(comment) = self.comment {
            write!(f, "  ; {}", comment.escape_debug())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Chunk<'src> {
    pub code: Vec<Instruction<'src>>,
}

pub type IR<'src> = Chunk<'src>;

impl Display for Chunk<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, instruction) in self.code.iter().enumerate() {
            writeln!(f, "{index:04} {instruction}")?;
        }
        Ok(())
    }
}
