use std::fmt::Write;

use tracing::trace;

pub mod error;
pub mod native;
pub mod toolchain;
pub mod x86;

pub use native::generate_c;
pub use x86::generate_x86;

/// Progress of an emitter through its output. Both backends walk these in
/// order and never go back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Start,
    InFunctionDecls,
    InEntryBody,
    InFunctionBodies,
    Done,
}

impl Phase {
    pub fn next(&self) -> Phase {
        match self {
            Phase::Start => Phase::InFunctionDecls,
            Phase::InFunctionDecls => Phase::InEntryBody,
            Phase::InEntryBody => Phase::InFunctionBodies,
            Phase::InFunctionBodies => Phase::Done,
            Phase::Done => Phase::Done,
        }
    }

    fn advance(&mut self, to: Phase) {
        debug_assert_eq!(self.next(), to, "emitter phases run strictly in order");
        trace!(from = ?self, ?to, "emitter phase");
        *self = to;
    }
}

/// Quoting flavour of the consuming toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// C string literal.
    C,
    /// NASM backquoted string.
    Nasm,
}

/// Escapes `text` for a string literal (without the surrounding quotes).
/// Backslash, double quote, newline, carriage return and tab get their
/// usual escapes; any other byte outside printable ASCII becomes `\xHH`.
pub fn escape(text: &str, quoting: Quoting) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut after_hex = false;

    for &byte in text.as_bytes() {
        let was_hex = after_hex;
        after_hex = false;

        match byte {
            b'\\' => escaped.push_str("\\\\"),
            b'"' => escaped.push_str("\\\""),
            b'\n' => escaped.push_str("\\n"),
            b'\r' => escaped.push_str("\\r"),
            b'\t' => escaped.push_str("\\t"),
            b'`' if quoting == Quoting::Nasm => escaped.push_str("\\`"),
            32..=126 => {
                // C hex escapes are greedy
                if was_hex && quoting == Quoting::C && byte.is_ascii_hexdigit() {
                    escaped.push_str("\"\"");
                }
                escaped.push(byte as char);
            }
            _ => {
                _ = write!(escaped, "\\x{byte:02x}");
                after_hex = true;
            }
        }
    }

    escaped
}
