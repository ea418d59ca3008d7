use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::lex::TokenKind;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("expected {expected} {context}, found {found}")]
    #[diagnostic(code(parse::expected_token))]
    ExpectedToken {
        expected: TokenKind,
        found: TokenKind,
        #[label("here")]
        span: SourceSpan,
        context: String,
    },

    #[error("unexpected token {found} {context}")]
    #[diagnostic(code(parse::unexpected_token))]
    UnexpectedToken {
        found: TokenKind,
        #[label("here")]
        span: SourceSpan,
        context: String,
    },

    #[error("program must contain a 'start:' block")]
    #[diagnostic(
        code(parse::missing_start),
        help("add a `start:` block after the function definitions")
    )]
    MissingStart {
        #[label("input ended here")]
        span: SourceSpan,
    },

    #[error("function definitions belong before the 'start:' block")]
    #[diagnostic(code(parse::misplaced_function), severity(Warning))]
    MisplacedFunction {
        #[label("here")]
        span: SourceSpan,
    },

    #[error("redundant 'start:' inside a block was skipped")]
    #[diagnostic(code(parse::redundant_start), severity(Warning))]
    RedundantStart {
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unexpected {found} after the 'start:' block")]
    #[diagnostic(code(parse::trailing_input))]
    TrailingInput {
        found: TokenKind,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("indentation did not return to zero at end of program (level {level})")]
    #[diagnostic(code(parse::unbalanced_indentation))]
    UnbalancedIndentation {
        level: usize,
        #[label("here")]
        span: SourceSpan,
    },
}
