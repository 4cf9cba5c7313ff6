use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::lex::TokenKind;

#[derive(Error, Debug, Diagnostic)]
pub enum SyntaxError {
    #[error("expected {expected} {context}, found {found} (line {line}, token {token})")]
    #[diagnostic(code(parse::expected_token))]
    ExpectedToken {
        expected: TokenKind,
        found: TokenKind,
        context: String,
        line: usize,
        token: usize,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unexpected {found} {context} (line {line}, token {token})")]
    #[diagnostic(code(parse::unexpected_token))]
    UnexpectedToken {
        found: TokenKind,
        context: String,
        line: usize,
        token: usize,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("expected an operator or the end of the expression, found {found} (line {line}, token {token})")]
    #[diagnostic(code(parse::expected_operator))]
    ExpectedOperator {
        found: TokenKind,
        line: usize,
        token: usize,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("use of undeclared identifier '{name}' (line {line}, token {token})")]
    #[diagnostic(
        code(parse::undeclared_identifier),
        help("declare it first with `let {name} = ...;`")
    )]
    UndeclaredIdentifier {
        name: String,
        line: usize,
        token: usize,
        #[label("not declared")]
        span: SourceSpan,
    },

    #[error("'{name}' is already declared (line {line}, token {token})")]
    #[diagnostic(
        code(parse::redeclaration),
        help("all declarations share one namespace, blocks do not open a new scope")
    )]
    Redeclaration {
        name: String,
        line: usize,
        token: usize,
        #[label("declared again here")]
        span: SourceSpan,
    },
}

impl SyntaxError {
    /// `(line, token index)` the error was raised at.
    pub fn location(&self) -> (usize, usize) {
        match self {
            SyntaxError::ExpectedToken { line, token, .. }
            | SyntaxError::UnexpectedToken { line, token, .. }
            | SyntaxError::ExpectedOperator { line, token, .. }
            | SyntaxError::UndeclaredIdentifier { line, token, .. }
            | SyntaxError::Redeclaration { line, token, .. } => (*line, *token),
        }
    }
}
