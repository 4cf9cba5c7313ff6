//! Compiler for enma, a tiny statement language, targeting NASM x86-64.
//!
//! The pipeline is [`lex::tokenize`] → [`parse::parse`] → [`backend::generate`];
//! [`driver::Driver`] wires it to files and the host toolchain.

pub mod ast;
pub mod backend;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod lex;
pub mod link;
pub mod parse;
pub mod symbol;

use crate::{error::Result, symbol::SymbolTable};

/// Compiles one source unit straight to assembly text.
pub fn compile_source(source: &str) -> Result<String> {
    let mut symbols = SymbolTable::new();
    let ast = parse::parse_source(source, &mut symbols)?;
    backend::generate(&ast, &symbols)
}
