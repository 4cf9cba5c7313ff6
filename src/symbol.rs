use std::collections::HashMap;
use std::fmt::Display;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SymbolError {
    #[error("unknown identifier '{name}'")]
    #[diagnostic(code(symbol::unknown_name))]
    UnknownName { name: String },

    #[error("unknown identifier code {code}")]
    #[diagnostic(code(symbol::unknown_code))]
    UnknownCode { code: SymbolCode },
}

/// Stable integer code for an identifier. Codes are handed out in order
/// starting at 0 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolCode(pub usize);

impl Display for SymbolCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional name <-> code registry for one compilation unit.
#[derive(Debug, Default)]
pub struct SymbolTable {
    codes: HashMap<String, SymbolCode>,
    names: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_declare(&mut self, name: &str) -> SymbolCode {
        if let Some(&code) = self.codes.get(name) {
            return code;
        }

        let code = SymbolCode(self.names.len());
        self.names.push(name.to_string());
        self.codes.insert(name.to_string(), code);
        code
    }

    pub fn has_code(&self, code: SymbolCode) -> bool {
        code.0 < self.names.len()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.codes.contains_key(name)
    }

    pub fn name_of(&self, code: SymbolCode) -> Result<&str, SymbolError> {
        self.names
            .get(code.0)
            .map(String::as_str)
            .ok_or(SymbolError::UnknownCode { code })
    }

    pub fn code_of(&self, name: &str) -> Result<SymbolCode, SymbolError> {
        self.codes
            .get(name)
            .copied()
            .ok_or_else(|| SymbolError::UnknownName { name: name.into() })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
