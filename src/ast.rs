//! Arena-backed syntax tree.
//!
//! Expressions and statements live in two vectors owned by [`Ast`] and refer
//! to each other through [`ExprId`] / [`StmtId`]. Statements form singly
//! linked chains through their `next` field; a block-like statement owns the
//! head of its inner chain. Every node is attached to at most one parent, and
//! identifier references are checked against the symbol table as they are
//! built.

use std::fmt::Display;

use miette::Diagnostic;
use thiserror::Error;

use crate::{
    lex::TokenKind,
    symbol::{SymbolCode, SymbolTable},
};

#[derive(Error, Debug, Diagnostic)]
pub enum AstError {
    #[error("identifier code {code} is not in the symbol table")]
    #[diagnostic(code(ast::unknown_identifier))]
    UnknownIdentifier { code: SymbolCode },

    #[error("{kind} is not a binary operator")]
    #[diagnostic(code(ast::invalid_operator))]
    InvalidOperator { kind: TokenKind },

    #[error("for loop initializer must be a declaration or an assignment")]
    #[diagnostic(code(ast::invalid_for_init))]
    InvalidForInit { init: StmtId },

    #[error("expression {id} does not exist")]
    #[diagnostic(code(ast::dangling_expression))]
    DanglingExpr { id: ExprId },

    #[error("statement {id} does not exist")]
    #[diagnostic(code(ast::dangling_statement))]
    DanglingStmt { id: StmtId },

    #[error("node is already attached to another parent")]
    #[diagnostic(code(ast::already_attached))]
    AlreadyAttached,

    #[error("statement {id} carries no expression")]
    #[diagnostic(code(ast::no_expression_slot))]
    NoExpressionSlot { id: StmtId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(usize);

impl Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expr#{}", self.0)
    }
}

impl Display for StmtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stmt#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,

    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl TryFrom<TokenKind> for BinaryOp {
    type Error = AstError;

    fn try_from(kind: TokenKind) -> Result<Self, Self::Error> {
        match kind {
            TokenKind::Plus => Ok(BinaryOp::Add),
            TokenKind::Minus => Ok(BinaryOp::Subtract),
            TokenKind::Star => Ok(BinaryOp::Multiply),
            TokenKind::Slash => Ok(BinaryOp::Divide),
            TokenKind::EqEq => Ok(BinaryOp::Equal),
            TokenKind::BangEq => Ok(BinaryOp::NotEqual),
            TokenKind::Less => Ok(BinaryOp::LessThan),
            TokenKind::LessEq => Ok(BinaryOp::LessEqual),
            TokenKind::Greater => Ok(BinaryOp::GreaterThan),
            TokenKind::GreaterEq => Ok(BinaryOp::GreaterEqual),
            kind => Err(AstError::InvalidOperator { kind }),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterEqual => ">=",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    Identifier(SymbolCode),
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Print(ExprId),
    VarDecl {
        target: SymbolCode,
        value: ExprId,
    },
    /// A bare `x;` has no value and generates nothing.
    Assign {
        target: SymbolCode,
        value: Option<ExprId>,
    },
    If {
        condition: ExprId,
        then_block: StmtId,
        else_block: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    For {
        init: StmtId,
        limit: ExprId,
        step: ExprId,
        body: StmtId,
    },
    Block(Option<StmtId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub next: Option<StmtId>,
}

#[derive(Debug, Default)]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    expr_attached: Vec<bool>,
    stmt_attached: Vec<bool>,
    root: Option<StmtId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<StmtId> {
        self.root
    }

    pub fn set_root(&mut self, head: Option<StmtId>) -> Result<(), AstError> {
        if let Some(head) = head {
            self.attach_stmt(head)?;
        }
        if let Some(old) = self.root {
            self.stmt_attached[old.0] = false;
        }
        self.root = head;
        Ok(())
    }

    pub fn expr(&self, id: ExprId) -> Result<&Expr, AstError> {
        self.exprs.get(id.0).ok_or(AstError::DanglingExpr { id })
    }

    pub fn stmt(&self, id: StmtId) -> Result<&Stmt, AstError> {
        self.stmts.get(id.0).ok_or(AstError::DanglingStmt { id })
    }

    pub fn number(&mut self, value: i64) -> ExprId {
        self.push_expr(Expr::Number(value))
    }

    pub fn identifier(
        &mut self,
        code: SymbolCode,
        symbols: &SymbolTable,
    ) -> Result<ExprId, AstError> {
        Self::check_symbol(code, symbols)?;
        Ok(self.push_expr(Expr::Identifier(code)))
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> Result<ExprId, AstError> {
        self.attach_children(&[left, right], &[])?;
        Ok(self.push_expr(Expr::Binary { op, left, right }))
    }

    pub fn print(&mut self, value: ExprId) -> Result<StmtId, AstError> {
        self.attach_expr(value)?;
        Ok(self.push_stmt(StmtKind::Print(value)))
    }

    pub fn var_decl(
        &mut self,
        target: SymbolCode,
        value: ExprId,
        symbols: &SymbolTable,
    ) -> Result<StmtId, AstError> {
        Self::check_symbol(target, symbols)?;
        self.attach_expr(value)?;
        Ok(self.push_stmt(StmtKind::VarDecl { target, value }))
    }

    pub fn assign(
        &mut self,
        target: SymbolCode,
        value: Option<ExprId>,
        symbols: &SymbolTable,
    ) -> Result<StmtId, AstError> {
        Self::check_symbol(target, symbols)?;
        if let Some(value) = value {
            self.attach_expr(value)?;
        }
        Ok(self.push_stmt(StmtKind::Assign { target, value }))
    }

    pub fn if_stmt(
        &mut self,
        condition: ExprId,
        then_block: StmtId,
        else_block: Option<StmtId>,
    ) -> Result<StmtId, AstError> {
        let mut blocks = vec![then_block];
        blocks.extend(else_block);
        self.attach_children(&[condition], &blocks)?;
        Ok(self.push_stmt(StmtKind::If {
            condition,
            then_block,
            else_block,
        }))
    }

    pub fn while_stmt(&mut self, condition: ExprId, body: StmtId) -> Result<StmtId, AstError> {
        self.attach_children(&[condition], &[body])?;
        Ok(self.push_stmt(StmtKind::While { condition, body }))
    }

    /// A missing step becomes the literal `1`.
    pub fn for_stmt(
        &mut self,
        init: StmtId,
        limit: ExprId,
        step: Option<ExprId>,
        body: StmtId,
    ) -> Result<StmtId, AstError> {
        match self.stmt(init)?.kind {
            StmtKind::VarDecl { .. } | StmtKind::Assign { .. } => {}
            _ => return Err(AstError::InvalidForInit { init }),
        }

        let step = match step {
            Some(step) => step,
            None => self.number(1),
        };

        self.attach_children(&[limit, step], &[init, body])?;
        Ok(self.push_stmt(StmtKind::For {
            init,
            limit,
            step,
            body,
        }))
    }

    pub fn block(&mut self, head: Option<StmtId>) -> Result<StmtId, AstError> {
        if let Some(head) = head {
            self.attach_stmt(head)?;
        }
        Ok(self.push_stmt(StmtKind::Block(head)))
    }

    pub fn set_next(&mut self, stmt: StmtId, next: StmtId) -> Result<(), AstError> {
        self.stmt(stmt)?;
        self.attach_stmt(next)?;
        if let Some(old) = self.stmts[stmt.0].next.replace(next) {
            self.stmt_attached[old.0] = false;
        }
        Ok(())
    }

    /// Replaces the expression of a `print`, `let` or assignment.
    pub fn set_expression(&mut self, stmt: StmtId, value: ExprId) -> Result<(), AstError> {
        self.stmt(stmt)?;
        self.attach_expr(value)?;
        let old = match &mut self.stmts[stmt.0].kind {
            StmtKind::Print(slot) | StmtKind::VarDecl { value: slot, .. } => {
                Some(std::mem::replace(slot, value))
            }
            StmtKind::Assign { value: slot, .. } => slot.replace(value),
            _ => {
                self.expr_attached[value.0] = false;
                return Err(AstError::NoExpressionSlot { id: stmt });
            }
        };
        if let Some(old) = old {
            self.expr_attached[old.0] = false;
        }
        Ok(())
    }

    pub fn chain(&self, head: Option<StmtId>) -> Chain<'_> {
        Chain { ast: self, next: head }
    }

    pub fn chain_len(&self, head: Option<StmtId>) -> usize {
        self.chain(head).count()
    }

    /// Indented, human-readable listing of the chain starting at the root.
    pub fn render(&self, symbols: &SymbolTable) -> Result<String, AstError> {
        let mut out = String::new();
        self.render_chain(&mut out, self.root, 0, symbols)?;
        Ok(out)
    }

    fn render_chain(
        &self,
        out: &mut String,
        head: Option<StmtId>,
        depth: usize,
        symbols: &SymbolTable,
    ) -> Result<(), AstError> {
        let indent = "  ".repeat(depth);
        for (_, stmt) in self.chain(head) {
            match &stmt.kind {
                StmtKind::Print(value) => {
                    let value = self.render_expr(*value, symbols)?;
                    out.push_str(&format!("{indent}print {value}\n"));
                }
                StmtKind::VarDecl { target, value } => {
                    let value = self.render_expr(*value, symbols)?;
                    let name = Self::name(*target, symbols);
                    out.push_str(&format!("{indent}let {name} = {value}\n"));
                }
                StmtKind::Assign { target, value } => {
                    let name = Self::name(*target, symbols);
                    match value {
                        Some(value) => {
                            let value = self.render_expr(*value, symbols)?;
                            out.push_str(&format!("{indent}{name} = {value}\n"));
                        }
                        None => out.push_str(&format!("{indent}{name}\n")),
                    }
                }
                StmtKind::If {
                    condition,
                    then_block,
                    else_block,
                } => {
                    let condition = self.render_expr(*condition, symbols)?;
                    out.push_str(&format!("{indent}if {condition}\n"));
                    self.render_chain(out, Some(*then_block), depth + 1, symbols)?;
                    if let Some(else_block) = else_block {
                        out.push_str(&format!("{indent}else\n"));
                        self.render_chain(out, Some(*else_block), depth + 1, symbols)?;
                    }
                }
                StmtKind::While { condition, body } => {
                    let condition = self.render_expr(*condition, symbols)?;
                    out.push_str(&format!("{indent}while {condition}\n"));
                    self.render_chain(out, Some(*body), depth + 1, symbols)?;
                }
                StmtKind::For {
                    init,
                    limit,
                    step,
                    body,
                } => {
                    let limit = self.render_expr(*limit, symbols)?;
                    let step = self.render_expr(*step, symbols)?;
                    out.push_str(&format!("{indent}for to {limit} step {step}\n"));
                    self.render_chain(out, Some(*init), depth + 1, symbols)?;
                    self.render_chain(out, Some(*body), depth + 1, symbols)?;
                }
                StmtKind::Block(head) => {
                    out.push_str(&format!("{indent}block\n"));
                    self.render_chain(out, *head, depth + 1, symbols)?;
                }
            }
        }
        Ok(())
    }

    fn render_expr(&self, id: ExprId, symbols: &SymbolTable) -> Result<String, AstError> {
        Ok(match self.expr(id)? {
            Expr::Number(value) => value.to_string(),
            Expr::Identifier(code) => Self::name(*code, symbols),
            Expr::Binary { op, left, right } => format!(
                "({} {op} {})",
                self.render_expr(*left, symbols)?,
                self.render_expr(*right, symbols)?
            ),
        })
    }

    fn name(code: SymbolCode, symbols: &SymbolTable) -> String {
        symbols
            .name_of(code)
            .map(str::to_string)
            .unwrap_or_else(|_| format!("#{code}"))
    }

    fn check_symbol(code: SymbolCode, symbols: &SymbolTable) -> Result<(), AstError> {
        if symbols.has_code(code) {
            Ok(())
        } else {
            Err(AstError::UnknownIdentifier { code })
        }
    }

    fn push_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        self.expr_attached.push(false);
        ExprId(self.exprs.len() - 1)
    }

    fn push_stmt(&mut self, kind: StmtKind) -> StmtId {
        self.stmts.push(Stmt { kind, next: None });
        self.stmt_attached.push(false);
        StmtId(self.stmts.len() - 1)
    }

    /// Attaches all children or none of them.
    fn attach_children(&mut self, exprs: &[ExprId], stmts: &[StmtId]) -> Result<(), AstError> {
        for (done, &id) in exprs.iter().enumerate() {
            if let Err(err) = self.attach_expr(id) {
                self.detach(&exprs[..done], &[]);
                return Err(err);
            }
        }
        for (done, &id) in stmts.iter().enumerate() {
            if let Err(err) = self.attach_stmt(id) {
                self.detach(exprs, &stmts[..done]);
                return Err(err);
            }
        }
        Ok(())
    }

    fn detach(&mut self, exprs: &[ExprId], stmts: &[StmtId]) {
        for id in exprs {
            self.expr_attached[id.0] = false;
        }
        for id in stmts {
            self.stmt_attached[id.0] = false;
        }
    }

    fn attach_expr(&mut self, id: ExprId) -> Result<(), AstError> {
        match self.expr_attached.get_mut(id.0) {
            None => Err(AstError::DanglingExpr { id }),
            Some(true) => Err(AstError::AlreadyAttached),
            Some(attached) => {
                *attached = true;
                Ok(())
            }
        }
    }

    fn attach_stmt(&mut self, id: StmtId) -> Result<(), AstError> {
        match self.stmt_attached.get_mut(id.0) {
            None => Err(AstError::DanglingStmt { id }),
            Some(true) => Err(AstError::AlreadyAttached),
            Some(attached) => {
                *attached = true;
                Ok(())
            }
        }
    }
}

/// Walks a statement chain through the `next` links.
pub struct Chain<'ast> {
    ast: &'ast Ast,
    next: Option<StmtId>,
}

impl<'ast> Iterator for Chain<'ast> {
    type Item = (StmtId, &'ast Stmt);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let stmt = self.ast.stmts.get(id.0)?;
        self.next = stmt.next;
        Some((id, stmt))
    }
}
