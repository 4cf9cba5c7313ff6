use crate::{ast::Ast, error::Result, symbol::SymbolTable};

pub mod error;
pub mod registers;
mod x86_64;

pub use x86_64::{generate_x86_64, X86Backend};

/// Lowers a parsed program to NASM x86-64 assembly text.
///
/// On a fault nothing is returned; the caller never sees half a program.
pub fn generate(ast: &Ast, symbols: &SymbolTable) -> Result<String> {
    generate_x86_64(ast, symbols)
}
