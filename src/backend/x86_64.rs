use std::collections::BTreeSet;
use std::fmt::Display;

use itertools::Itertools;
use tracing::debug;

use crate::{
    ast::{Ast, BinaryOp, Expr, ExprId, Stmt, StmtId, StmtKind},
    backend::{
        error::CodegenError,
        registers::{Register, RegisterPool},
    },
    error::Result,
    symbol::{SymbolCode, SymbolTable},
};

pub fn generate_x86_64(ast: &Ast, symbols: &SymbolTable) -> Result<String> {
    X86Backend::new(ast, symbols).generate()
}

#[derive(Debug, Clone, Copy)]
enum Construct {
    If,
    While,
    For,
}

impl Display for Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Construct::If => write!(f, "if"),
            Construct::While => write!(f, "while"),
            Construct::For => write!(f, "for"),
        }
    }
}

/// Lowers an [`Ast`] to NASM x86-64 for Linux, calling libc `printf` for
/// `print`. Every declared variable lives in a zeroed `.data` quadword.
pub struct X86Backend<'a> {
    ast: &'a Ast,
    symbols: &'a SymbolTable,
    output: String,
    registers: RegisterPool,
    variables: BTreeSet<SymbolCode>,
    if_counter: usize,
    while_counter: usize,
    for_counter: usize,
}

impl<'a> X86Backend<'a> {
    pub fn new(ast: &'a Ast, symbols: &'a SymbolTable) -> Self {
        Self {
            ast,
            symbols,
            output: String::new(),
            registers: RegisterPool::new(),
            variables: BTreeSet::new(),
            if_counter: 0,
            while_counter: 0,
            for_counter: 0,
        }
    }

    pub fn generate(mut self) -> Result<String> {
        self.reserve_slots(self.ast.root())?;
        self.emit_header();
        self.statements(self.ast.root())?;
        self.emit_footer();
        self.emit_data()?;

        debug!(
            variables = self.variables.len(),
            ifs = self.if_counter,
            whiles = self.while_counter,
            fors = self.for_counter,
            "lowered program"
        );

        Ok(self.output)
    }

    fn emit_header(&mut self) {
        self.writeln("; generated by enma");
        self.writeln("\tdefault rel");
        self.writeln("\textern printf");
        self.writeln("\tglobal main");
        self.writeln("");
        self.writeln("\tsection .text");
        self.writeln("main:");
        self.writeln("\tpush rbp");
        self.writeln("\tmov rbp, rsp");
        // callee-saved registers from the scratch pool
        self.writeln("\tpush r12");
        self.writeln("\tpush r13");
        self.writeln("\tpush r14");
        self.writeln("\tpush r15");
    }

    fn emit_footer(&mut self) {
        self.writeln("\tpop r15");
        self.writeln("\tpop r14");
        self.writeln("\tpop r13");
        self.writeln("\tpop r12");
        self.writeln("\tpop rbp");
        // returning from main exits through libc, which flushes stdout
        self.writeln("\txor eax, eax");
        self.writeln("\tret");
    }

    fn emit_data(&mut self) -> Result<()> {
        let slots = self
            .variables
            .iter()
            .map(|&code| {
                self.symbols
                    .name_of(code)
                    .map(|name| format!("{}: dq 0 ; {name}", Self::slot(code)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.writeln("");
        self.writeln("\tsection .data");
        self.writeln("fmt: db \"%lld\", 10, 0");
        if !slots.is_empty() {
            let slots = slots.iter().join("\n");
            self.writeln(&slots);
        }
        Ok(())
    }

    /// Gives every declared variable its slot up front. Declarations are
    /// visible file-wide, so a use can be lowered before its `let`.
    fn reserve_slots(&mut self, head: Option<StmtId>) -> Result<()> {
        let ast = self.ast;
        for (_, stmt) in ast.chain(head) {
            match &stmt.kind {
                StmtKind::VarDecl { target, .. } => {
                    self.variables.insert(*target);
                }
                StmtKind::Print(_) | StmtKind::Assign { .. } => {}
                StmtKind::If {
                    then_block,
                    else_block,
                    ..
                } => {
                    self.reserve_slots(Some(*then_block))?;
                    self.reserve_slots(*else_block)?;
                }
                StmtKind::While { body, .. } => self.reserve_slots(Some(*body))?,
                StmtKind::For { init, body, .. } => {
                    self.reserve_slots(Some(*init))?;
                    self.reserve_slots(Some(*body))?;
                }
                StmtKind::Block(head) => self.reserve_slots(*head)?,
            }
        }
        Ok(())
    }

    fn statements(&mut self, head: Option<StmtId>) -> Result<()> {
        let ast = self.ast;
        for (_, stmt) in ast.chain(head) {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn statement_at(&mut self, id: StmtId) -> Result<()> {
        let ast = self.ast;
        let stmt = ast.stmt(id)?;
        self.statement(stmt)
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Print(value) => {
                let reg = self.expression(*value)?;
                self.emit_print(reg)?;
                self.registers.release(reg)?;
                Ok(())
            }
            StmtKind::VarDecl { target, value } => {
                let reg = self.expression(*value)?;
                self.emit_store(*target, reg)?;
                self.registers.release(reg)?;
                Ok(())
            }
            StmtKind::Assign { target, value } => {
                if let Some(value) = value {
                    let reg = self.expression(*value)?;
                    self.emit_store(*target, reg)?;
                    self.registers.release(reg)?;
                }
                Ok(())
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let id = self.next_label(Construct::If);
                let then_label = format!("if_{id}_then");
                let end_label = format!("if_{id}_end");

                let reg = self.expression(*condition)?;
                self.emit_test(reg)?;
                self.registers.release(reg)?;
                self.writeln(&format!("\tjnz {then_label}"));

                if let Some(else_block) = else_block {
                    self.statement_at(*else_block)?;
                }
                self.writeln(&format!("\tjmp {end_label}"));

                self.writeln(&format!("{then_label}:"));
                self.statement_at(*then_block)?;
                self.writeln(&format!("{end_label}:"));
                Ok(())
            }
            StmtKind::While { condition, body } => {
                let id = self.next_label(Construct::While);
                let top_label = format!("while_{id}_top");
                let end_label = format!("while_{id}_end");

                self.writeln(&format!("{top_label}:"));
                let reg = self.expression(*condition)?;
                self.emit_test(reg)?;
                self.registers.release(reg)?;
                self.writeln(&format!("\tjz {end_label}"));

                self.statement_at(*body)?;
                self.writeln(&format!("\tjmp {top_label}"));
                self.writeln(&format!("{end_label}:"));
                Ok(())
            }
            StmtKind::For {
                init,
                limit,
                step,
                body,
            } => {
                let counter = match self.ast.stmt(*init)?.kind {
                    StmtKind::VarDecl { target, .. } | StmtKind::Assign { target, .. } => target,
                    _ => {
                        return Err(CodegenError::MalformedNode {
                            reason: "for loop initializer is not a declaration or assignment"
                                .into(),
                        }
                        .into())
                    }
                };

                let id = self.next_label(Construct::For);
                let top_label = format!("for_{id}_top");
                let end_label = format!("for_{id}_end");

                self.statement_at(*init)?;
                self.writeln(&format!("{top_label}:"));

                // the loop runs until the counter hits the limit exactly
                let current = self.load_variable(counter)?;
                let limit = self.expression(*limit)?;
                let reg = self.binary(BinaryOp::NotEqual, current, limit)?;
                self.emit_test(reg)?;
                self.registers.release(reg)?;
                self.writeln(&format!("\tjz {end_label}"));

                self.statement_at(*body)?;

                let step = self.expression(*step)?;
                self.registers.ensure_busy(step)?;
                let slot = self.existing_slot(counter)?;
                self.writeln(&format!("\tadd [{slot}], {}", self.registers.name(step)?));
                self.registers.release(step)?;

                self.writeln(&format!("\tjmp {top_label}"));
                self.writeln(&format!("{end_label}:"));
                Ok(())
            }
            StmtKind::Block(head) => self.statements(*head),
        }
    }

    /// Evaluates `id` into a freshly allocated register. The caller owns the
    /// result and must release it.
    fn expression(&mut self, id: ExprId) -> Result<Register> {
        let ast = self.ast;
        match ast.expr(id)? {
            Expr::Number(value) => {
                let reg = self.registers.allocate()?;
                self.writeln(&format!("\tmov {}, {value}", self.registers.name(reg)?));
                Ok(reg)
            }
            Expr::Identifier(code) => self.load_variable(*code),
            Expr::Binary { op, left, right } => {
                let left = self.expression(*left)?;
                let right = self.expression(*right)?;
                self.binary(*op, left, right)
            }
        }
    }

    /// Combines two live registers into `left` and frees `right`.
    fn binary(&mut self, op: BinaryOp, left: Register, right: Register) -> Result<Register> {
        self.registers.ensure_busy(left)?;
        self.registers.ensure_busy(right)?;
        let l = self.registers.name(left)?;
        let r = self.registers.name(right)?;

        match op {
            BinaryOp::Add => self.writeln(&format!("\tadd {l}, {r}")),
            BinaryOp::Subtract => self.writeln(&format!("\tsub {l}, {r}")),
            BinaryOp::Multiply => self.writeln(&format!("\timul {l}, {r}")),
            BinaryOp::Divide => {
                self.writeln(&format!("\tmov rax, {l}"));
                self.writeln("\tcqo");
                self.writeln(&format!("\tidiv {r}"));
                self.writeln(&format!("\tmov {l}, rax"));
            }
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::LessThan
            | BinaryOp::LessEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterEqual => {
                let condition = match op {
                    BinaryOp::Equal => "e",
                    BinaryOp::NotEqual => "ne",
                    BinaryOp::LessThan => "l",
                    BinaryOp::LessEqual => "le",
                    BinaryOp::GreaterThan => "g",
                    _ => "ge",
                };
                let byte = self.registers.byte_name(left)?;
                self.writeln(&format!("\tcmp {l}, {r}"));
                self.writeln(&format!("\tset{condition} {byte}"));
                self.writeln(&format!("\tmovzx {l}, {byte}"));
            }
        }

        self.registers.release(right)?;
        Ok(left)
    }

    fn load_variable(&mut self, code: SymbolCode) -> Result<Register> {
        let slot = self.existing_slot(code)?;
        let reg = self.registers.allocate()?;
        self.writeln(&format!("\tmov {}, [{slot}]", self.registers.name(reg)?));
        Ok(reg)
    }

    fn emit_store(&mut self, code: SymbolCode, reg: Register) -> Result<()> {
        self.registers.ensure_busy(reg)?;
        let slot = self.existing_slot(code)?;
        self.writeln(&format!("\tmov [{slot}], {}", self.registers.name(reg)?));
        Ok(())
    }

    fn emit_test(&mut self, reg: Register) -> Result<()> {
        self.registers.ensure_busy(reg)?;
        let name = self.registers.name(reg)?;
        self.writeln(&format!("\ttest {name}, {name}"));
        Ok(())
    }

    fn emit_print(&mut self, reg: Register) -> Result<()> {
        self.registers.ensure_busy(reg)?;
        self.writeln(&format!("\tmov rsi, {}", self.registers.name(reg)?));
        self.writeln("\tlea rdi, [fmt]");
        self.writeln("\txor eax, eax");
        self.writeln("\tcall printf wrt ..plt");
        Ok(())
    }

    fn existing_slot(&self, code: SymbolCode) -> Result<String> {
        if self.variables.contains(&code) {
            Ok(Self::slot(code))
        } else {
            let name = self.symbols.name_of(code)?;
            Err(CodegenError::MalformedNode {
                reason: format!("variable '{name}' is used before it has a storage slot"),
            }
            .into())
        }
    }

    fn slot(code: SymbolCode) -> String {
        format!("var_{code}")
    }

    fn next_label(&mut self, construct: Construct) -> usize {
        let counter = match construct {
            Construct::If => &mut self.if_counter,
            Construct::While => &mut self.while_counter,
            Construct::For => &mut self.for_counter,
        };
        let id = *counter;
        *counter += 1;
        debug!(%construct, id, "allocated label");
        id
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}
