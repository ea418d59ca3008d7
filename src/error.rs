use miette::Diagnostic;
use thiserror::Error;

use crate::{backend::error::BackendError, lex::LexError, parse::error::SyntaxError};

#[derive(Error, Debug, Diagnostic)]
pub enum HercodeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    LexError(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SyntaxError(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    BackendError(#[from] BackendError),

    #[error("compilation aborted after {} diagnostic(s)", .diagnostics.len())]
    #[diagnostic(code(hercode::aborted))]
    Aborted {
        #[related]
        diagnostics: Vec<HercodeError>,
    },
}

impl HercodeError {
    pub fn is_warning(&self) -> bool {
        matches!(self.severity(), Some(miette::Severity::Warning))
    }
}

pub type Result<T> = std::result::Result<T, HercodeError>;
