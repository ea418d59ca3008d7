use tracing::debug;

use crate::{
    ast::{Block, Node, Program},
    error::HercodeError,
    lex::{Lexer, Token, TokenKind},
    parse::error::SyntaxError,
};

#[derive(Debug)]
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    /// Indentation width the parser believes is open.
    indent: usize,
    diagnostics: Vec<HercodeError>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Parser<'src> {
        let mut lexer = Lexer::new(source);
        let current = lexer.scan_token();
        let diagnostics = lexer
            .take_diagnostics()
            .into_iter()
            .map(HercodeError::from)
            .collect();

        Parser {
            lexer,
            current,
            indent: 0,
            diagnostics,
        }
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn into_diagnostics(self) -> Vec<HercodeError> {
        self.diagnostics
    }

    /// Parses the whole program. Returns `None` only when there is no
    /// `start:` block; everything else is reported and recovered from.
    pub fn program(&mut self) -> Option<Program<'src>> {
        let mut program = vec![];

        loop {
            match self.current.kind {
                TokenKind::Newline | TokenKind::End => self.advance(),
                TokenKind::Indent | TokenKind::Dedent => self.advance_layout(),
                TokenKind::Function => {
                    if let Some(function) = self.function() {
                        program.push(function);
                    }
                }
                TokenKind::Start => break,
                TokenKind::Eoi => {
                    self.report(SyntaxError::MissingStart {
                        span: self.current.span,
                    });
                    return None;
                }
                found => {
                    self.report(SyntaxError::UnexpectedToken {
                        found,
                        span: self.current.span,
                        context: "before the 'start:' block".into(),
                    });
                    self.advance();
                }
            }
        }

        self.start_block(&mut program);
        self.finish();

        debug!(nodes = program.len(), "parsed program");
        Some(program)
    }

    fn function(&mut self) -> Option<Node<'src>> {
        self.advance();

        let header = self
            .consume_text(TokenKind::Identifier, "after 'function'")
            .and_then(|name| {
                self.consume(TokenKind::Colon, "after function name")
                    .map(|()| name)
            });
        let name = match header {
            Ok(name) => Some(name),
            Err(err) => {
                self.report(err);
                self.synchronize_line();
                None
            }
        };

        while self.check(TokenKind::Newline) {
            self.advance();
        }

        let body = if self.check(TokenKind::Indent) {
            self.advance();
            let level = self.lexer.indentation();
            self.indent = level;
            self.function_body(level)
        } else if matches!(
            self.current.kind,
            TokenKind::Eoi
                | TokenKind::End
                | TokenKind::Dedent
                | TokenKind::Function
                | TokenKind::Start
        ) {
            vec![]
        } else {
            if name.is_some() {
                self.report(SyntaxError::ExpectedToken {
                    expected: TokenKind::Indent,
                    found: self.current.kind,
                    span: self.current.span,
                    context: "to open the function body".into(),
                });
            }
            return None;
        };

        let name = name?;
        debug!(name, statements = body.len(), "parsed function");
        Some(Node::FunctionDef { name, body })
    }

    fn function_body(&mut self, level: usize) -> Block<'src> {
        let mut body = vec![];

        loop {
            while matches!(self.current.kind, TokenKind::Newline | TokenKind::Indent) {
                self.advance();
            }

            match self.current.kind {
                // left for the caller
                TokenKind::Eoi | TokenKind::Function | TokenKind::Start => break,
                TokenKind::End => {
                    self.advance();
                    break;
                }
                TokenKind::Dedent => {
                    let closes_body = self.lexer.indentation() < level;
                    self.advance_layout();
                    if closes_body {
                        break;
                    }
                }
                _ => {
                    if let Some(statement) = self.statement() {
                        body.push(statement);
                    }
                }
            }
        }

        body
    }

    fn start_block(&mut self, program: &mut Program<'src>) {
        self.advance();

        while self.check(TokenKind::Newline) {
            self.advance();
        }

        let level = if self.check(TokenKind::Indent) {
            self.advance();
            self.indent = self.lexer.indentation();
            self.indent
        } else {
            self.report(SyntaxError::ExpectedToken {
                expected: TokenKind::Indent,
                found: self.current.kind,
                span: self.current.span,
                context: "after 'start:'".into(),
            });
            self.lexer.indentation()
        };

        program.extend(self.block(level));

        if self.check(TokenKind::Dedent) {
            self.advance_layout();
        }
        self.skip_layout();

        if self.matches(TokenKind::End) {
            self.skip_layout();
        }
    }

    /// Statements of the `start:` block, up to the dedent or `end` closing it.
    fn block(&mut self, level: usize) -> Block<'src> {
        let mut statements = vec![];

        loop {
            match self.current.kind {
                TokenKind::Eoi | TokenKind::End => break,
                TokenKind::Dedent => {
                    if self.lexer.indentation() < level {
                        break;
                    }
                    self.advance_layout();
                }
                TokenKind::Newline | TokenKind::Indent => self.advance(),
                TokenKind::Start => {
                    self.report(SyntaxError::RedundantStart {
                        span: self.current.span,
                    });
                    self.advance();
                }
                TokenKind::Function => {
                    self.report(SyntaxError::MisplacedFunction {
                        span: self.current.span,
                    });
                    if let Some(function) = self.function() {
                        statements.push(function);
                    }
                }
                _ => {
                    if let Some(statement) = self.statement() {
                        statements.push(statement);
                    }
                }
            }
        }

        statements
    }

    fn finish(&mut self) {
        if !self.check(TokenKind::Eoi) {
            self.report(SyntaxError::TrailingInput {
                found: self.current.kind,
                span: self.current.span,
            });
        }

        if self.indent != 0 {
            self.report(SyntaxError::UnbalancedIndentation {
                level: self.indent,
                span: self.current.span,
            });
        }
    }

    /// A statement that cannot start here is reported and its token skipped,
    /// so callers can always keep looping.
    fn statement(&mut self) -> Option<Node<'src>> {
        match self.current.kind {
            TokenKind::Say => self.say(),
            TokenKind::ForeignBlock => {
                let code = self.current.text.unwrap_or_default();
                self.advance();
                Some(Node::ForeignBlock(code))
            }
            TokenKind::Identifier => {
                let name = self.current.text.unwrap_or_default();
                self.advance();
                Some(Node::FunctionCall(name))
            }
            found => {
                self.report(SyntaxError::UnexpectedToken {
                    found,
                    span: self.current.span,
                    context: "where a statement was expected".into(),
                });
                self.advance();
                None
            }
        }
    }

    fn say(&mut self) -> Option<Node<'src>> {
        self.advance();
        match self.consume_text(TokenKind::String, "after 'say'") {
            Ok(text) => Some(Node::Emit(text)),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    fn synchronize_line(&mut self) {
        while !matches!(
            self.current.kind,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::Eoi
        ) {
            self.advance();
        }
    }

    fn skip_layout(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Newline => self.advance(),
                TokenKind::Dedent => self.advance_layout(),
                _ => return,
            }
        }
    }

    fn report(&mut self, err: SyntaxError) {
        debug!(%err, "syntax diagnostic");
        self.diagnostics.push(err.into());
    }

    fn advance(&mut self) {
        self.current = self.lexer.scan_token();
        self.diagnostics
            .extend(self.lexer.take_diagnostics().into_iter().map(HercodeError::from));
    }

    /// Consumes an indent or dedent and records the level the lexer settled on.
    fn advance_layout(&mut self) {
        self.indent = self.lexer.indentation();
        self.advance();
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            false
        } else {
            self.advance();
            true
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Consumes `kind` or leaves the token in place and hands back the
    /// diagnostic for the caller to act on.
    fn consume(&mut self, kind: TokenKind, context: &str) -> Result<(), SyntaxError> {
        if self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.expected(kind, context))
        }
    }

    fn consume_text(&mut self, kind: TokenKind, context: &str) -> Result<&'src str, SyntaxError> {
        let text = self.current.text.unwrap_or_default();
        self.consume(kind, context).map(|()| text)
    }

    fn expected(&self, expected: TokenKind, context: &str) -> SyntaxError {
        SyntaxError::ExpectedToken {
            expected,
            found: self.current.kind,
            span: self.current.span,
            context: context.into(),
        }
    }
}
