use miette::Diagnostic;
use thiserror::Error;

use crate::{
    ast::AstError, backend::error::CodegenError, driver::DriverError, lex::LexError,
    parse::error::SyntaxError, symbol::SymbolError,
};

#[derive(Error, Debug, Diagnostic)]
pub enum EnmaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    LexError(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SyntaxError(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    AstError(#[from] AstError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SymbolError(#[from] SymbolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CodegenError(#[from] CodegenError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DriverError(#[from] DriverError),
}

impl EnmaError {
    /// Faults inside the compiler itself, as opposed to problems with the
    /// program being compiled.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            EnmaError::CodegenError(_) | EnmaError::AstError(_) | EnmaError::SymbolError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EnmaError>;
