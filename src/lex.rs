use std::{fmt::Display, iter::Peekable, mem, str::CharIndices};

use miette::{Diagnostic, SourceSpan};
use phf::phf_map;
use thiserror::Error;
use tracing::trace;

/// Longest identifier or string literal kept by the lexer, in characters.
pub const MAX_LEXEME_LEN: usize = 255;

/// Identifier that switches the lexer into foreign-block mode when followed by `{`.
pub const FOREIGN_BLOCK_MARKER: &str = "__c__";

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("identifier longer than {max} characters was truncated")]
    #[diagnostic(code(lex::truncated_identifier), severity(Warning))]
    TruncatedIdentifier {
        max: usize,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("string literal longer than {max} characters was truncated")]
    #[diagnostic(code(lex::truncated_string), severity(Warning))]
    TruncatedString {
        max: usize,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unterminated string")]
    #[diagnostic(code(lex::unterminated_string), severity(Warning))]
    UnterminatedString {
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unterminated foreign block")]
    #[diagnostic(
        code(lex::unterminated_foreign_block),
        severity(Warning),
        help("every '{{' inside `__c__ {{ ... }}` needs a matching '}}'")
    )]
    UnterminatedForeignBlock {
        #[label("opened here")]
        span: SourceSpan,
    },

    #[error("dedent to width {width} does not match any enclosing indentation level")]
    #[diagnostic(code(lex::indentation_mismatch), severity(Warning))]
    IndentationMismatch {
        width: usize,
        #[label("here")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Symbols
    Colon,
    Semi,
    LeftBrace,
    RightBrace,

    // Keywords
    Say,
    Function,
    End,
    Start,

    String,
    Identifier,
    ForeignBlock,

    // Layout
    Newline,
    Indent,
    Dedent,

    Unknown,
    Eoi,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Symbols
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Semi => write!(f, "';'"),
            TokenKind::LeftBrace => write!(f, "'{{'"),
            TokenKind::RightBrace => write!(f, "'}}'"),

            // Keywords
            TokenKind::Say => write!(f, "'say'"),
            TokenKind::Function => write!(f, "'function'"),
            TokenKind::End => write!(f, "'end'"),
            TokenKind::Start => write!(f, "'start:'"),

            TokenKind::String => write!(f, "<string>"),
            TokenKind::Identifier => write!(f, "<identifier>"),
            TokenKind::ForeignBlock => write!(f, "<foreign block>"),

            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::Indent => write!(f, "INDENT"),
            TokenKind::Dedent => write!(f, "DEDENT"),

            TokenKind::Unknown => write!(f, "<unknown>"),
            TokenKind::Eoi => write!(f, "EOI"),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "say" => TokenKind::Say,
    "function" => TokenKind::Function,
    "end" => TokenKind::End,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// Identifier name, string contents, foreign source or the offending
    /// character of an unknown token. Layout tokens carry nothing.
    pub text: Option<&'src str>,
    pub span: SourceSpan,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let offset: usize = self.span.offset();
        match self.text {
            Some(text) => write!(f, "{offset:>5} {} {text:?}", self.kind),
            None => write!(f, "{offset:>5} {}", self.kind),
        }
    }
}

#[derive(Debug)]
pub struct Lexer<'src> {
    start: usize,
    current: usize,
    done: bool,
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    /// Open indentation widths; the base level 0 is never popped.
    indents: Vec<usize>,
    pending_dedents: usize,
    diagnostics: Vec<LexError>,
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        Some(self.scan_token())
    }
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Lexer<'src> {
        Lexer {
            start: 0,
            current: 0,
            done: false,
            source,
            chars: source.char_indices().peekable(),
            indents: vec![0],
            pending_dedents: 0,
            diagnostics: vec![],
        }
    }

    /// Width of the innermost open indentation level.
    pub fn indentation(&self) -> usize {
        self.indents.last().copied().unwrap_or(0)
    }

    /// Warnings collected since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<LexError> {
        mem::take(&mut self.diagnostics)
    }

    pub fn scan_token(&mut self) -> Token<'src> {
        let token = self.next_token();
        trace!(kind = %token.kind, text = ?token.text, "token");
        token
    }

    fn next_token(&mut self) -> Token<'src> {
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            self.start = self.current;
            return self.make_token(TokenKind::Dedent);
        }

        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            if self.indents.len() > 1 {
                let levels = self.indents.len() - 1;
                self.indents.truncate(1);
                self.pending_dedents = levels - 1;
                return self.make_token(TokenKind::Dedent);
            }
            self.done = true;
            return self.make_token(TokenKind::Eoi);
        }

        let c = self.advance();
        match c {
            ':' => self.make_token(TokenKind::Colon),
            ';' => self.make_token(TokenKind::Semi),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            '\n' => self.newline(),
            '"' => self.string(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            _ => self.make_text_token(TokenKind::Unknown, self.start, self.current),
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            text: None,
            span: SourceSpan::new(self.start.into(), self.current - self.start),
        }
    }

    fn make_text_token(&self, kind: TokenKind, from: usize, to: usize) -> Token<'src> {
        Token {
            kind,
            text: Some(&self.source[from..to]),
            span: SourceSpan::new(self.start.into(), self.current - self.start),
        }
    }

    fn advance(&mut self) -> char {
        if let Some((idx, ch)) = self.chars.next() {
            self.current = idx + ch.len_utf8();
            ch
        } else {
            '\0'
        }
    }

    fn peek(&mut self) -> char {
        self.chars.peek().map(|&(_, ch)| ch).unwrap_or('\0')
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                _ => return,
            }
        }
    }

    fn skip_comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }

    /// Called with the newline already consumed; measures the next line and
    /// settles it against the indentation stack.
    fn newline(&mut self) -> Token<'src> {
        let mut width = 0;
        while matches!(self.peek(), ' ' | '\t') {
            self.advance();
            width += 1;
        }

        // blank and comment-only lines leave the stack alone
        if self.is_at_end() || matches!(self.peek(), '\n' | '\r' | '#') {
            return self.make_token(TokenKind::Newline);
        }

        let top = self.indentation();
        if width > top {
            self.indents.push(width);
            self.make_token(TokenKind::Indent)
        } else if width < top {
            let mut levels = 0;
            while self.indents.len() > 1 && self.indentation() > width {
                self.indents.pop();
                levels += 1;
            }

            if self.indentation() != width {
                self.diagnostics.push(LexError::IndentationMismatch {
                    width,
                    span: SourceSpan::new(self.start.into(), self.current - self.start),
                });
            }

            self.pending_dedents = levels - 1;
            self.make_token(TokenKind::Dedent)
        } else {
            self.make_token(TokenKind::Newline)
        }
    }

    fn string(&mut self) -> Token<'src> {
        let content_start = self.current;
        let mut kept_end = content_start;
        let mut length = 0;

        while self.peek() != '"' && !self.is_at_end() {
            self.advance();
            length += 1;
            if length <= MAX_LEXEME_LEN {
                kept_end = self.current;
            }
        }

        if self.is_at_end() {
            self.diagnostics.push(LexError::UnterminatedString {
                span: SourceSpan::new(self.start.into(), self.current - self.start),
            });
        } else {
            self.advance();
        }

        if length > MAX_LEXEME_LEN {
            self.diagnostics.push(LexError::TruncatedString {
                max: MAX_LEXEME_LEN,
                span: SourceSpan::new(self.start.into(), self.current - self.start),
            });
        }

        self.make_text_token(TokenKind::String, content_start, kept_end)
    }

    fn identifier(&mut self) -> Token<'src> {
        let mut kept_end = self.current;
        let mut length = 1;

        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
            length += 1;
            if length <= MAX_LEXEME_LEN {
                kept_end = self.current;
            }
        }

        if length > MAX_LEXEME_LEN {
            self.diagnostics.push(LexError::TruncatedIdentifier {
                max: MAX_LEXEME_LEN,
                span: SourceSpan::new(self.start.into(), self.current - self.start),
            });
        }

        let lexeme = &self.source[self.start..kept_end];

        if lexeme == FOREIGN_BLOCK_MARKER {
            if let Some(token) = self.foreign_block() {
                return token;
            }
        }

        if lexeme == "start" && self.peek() == ':' {
            self.advance();
            return self.make_text_token(TokenKind::Start, self.start, self.current);
        }

        let kind = KEYWORDS
            .get(lexeme)
            .copied()
            .unwrap_or(TokenKind::Identifier);

        self.make_text_token(kind, self.start, kept_end)
    }

    /// Captures everything between the brace following the marker and its
    /// matching close brace. Returns `None` when no brace follows.
    fn foreign_block(&mut self) -> Option<Token<'src>> {
        while matches!(self.peek(), ' ' | '\t') {
            self.advance();
        }
        if self.peek() != '{' {
            return None;
        }
        self.advance();

        let body_start = self.current;
        let mut depth = 1;
        loop {
            match self.peek() {
                _ if self.is_at_end() => {
                    self.diagnostics.push(LexError::UnterminatedForeignBlock {
                        span: SourceSpan::new(self.start.into(), body_start - self.start),
                    });
                    return Some(self.make_text_token(
                        TokenKind::ForeignBlock,
                        body_start,
                        self.current,
                    ));
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body_end = self.current;
                        self.advance();
                        return Some(self.make_text_token(
                            TokenKind::ForeignBlock,
                            body_start,
                            body_end,
                        ));
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}
