use miette::Diagnostic;
use thiserror::Error;

/// Faults raised while lowering to assembly. None of these are caused by the
/// program being compiled; they mean the generator broke its own contract.
#[derive(Error, Debug, Diagnostic)]
pub enum CodegenError {
    #[error("internal compiler error: register {register}: {reason}")]
    #[diagnostic(code(codegen::register_fault))]
    RegisterFault {
        register: &'static str,
        reason: &'static str,
    },

    #[error("internal compiler error: all {capacity} scratch registers are in use")]
    #[diagnostic(
        code(codegen::registers_exhausted),
        help("expressions are not spilled to memory; split deeply nested expressions across statements")
    )]
    RegistersExhausted { capacity: usize },

    #[error("internal compiler error: malformed syntax tree: {reason}")]
    #[diagnostic(code(codegen::malformed_node))]
    MalformedNode { reason: String },
}
