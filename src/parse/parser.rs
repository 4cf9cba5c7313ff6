use std::collections::HashSet;

use crate::{
    ast::{Ast, BinaryOp, ExprId, StmtId},
    cursor::TokenCursor,
    error::Result,
    lex::{Token, TokenKind, TokenValue},
    parse::{error::SyntaxError, prec::Precedence},
    symbol::{SymbolCode, SymbolTable},
};

#[derive(Debug)]
pub struct Parser<'src, 'sym> {
    cursor: TokenCursor<'src>,
    symbols: &'sym SymbolTable,
    // one flat namespace for the whole file, blocks included
    declared: HashSet<SymbolCode>,
    ast: Ast,
}

impl<'src, 'sym> Parser<'src, 'sym> {
    pub fn new(tokens: Vec<Token<'src>>, symbols: &'sym SymbolTable) -> Parser<'src, 'sym> {
        Parser {
            cursor: TokenCursor::new(tokens),
            symbols,
            declared: HashSet::new(),
            ast: Ast::new(),
        }
    }

    pub fn program(mut self) -> Result<Ast> {
        let mut statements = vec![];

        while !self.check(TokenKind::Eoi) {
            statements.push(self.statement()?);
        }

        let head = self.link(statements)?;
        self.ast.set_root(head)?;
        Ok(self.ast)
    }

    fn link(&mut self, statements: Vec<StmtId>) -> Result<Option<StmtId>> {
        for pair in statements.windows(2) {
            self.ast.set_next(pair[0], pair[1])?;
        }
        Ok(statements.first().copied())
    }

    fn statement(&mut self) -> Result<StmtId> {
        match self.cursor.current().kind {
            TokenKind::Print => self.print_statement(),
            TokenKind::Let => self.let_declaration(true),
            TokenKind::Identifier => self.assignment(true),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            _ => Err(self.unexpected("at start of statement")),
        }
    }

    fn print_statement(&mut self) -> Result<StmtId> {
        self.consume(TokenKind::Print, "")?;
        self.consume(TokenKind::LeftParen, "after 'print'")?;
        let value = self.expression()?;
        self.consume(TokenKind::RightParen, "after print argument")?;
        self.consume(TokenKind::Semi, "after print statement")?;
        Ok(self.ast.print(value)?)
    }

    fn let_declaration(&mut self, terminated: bool) -> Result<StmtId> {
        self.consume(TokenKind::Let, "")?;
        let line = self.cursor.line();
        let index = self.cursor.token_index();
        let (target, name_token) = self.identifier("in variable declaration")?;
        if self.declared.contains(&target) {
            return Err(SyntaxError::Redeclaration {
                name: name_token.lexeme.into(),
                line,
                token: index,
                span: name_token.span,
            }
            .into());
        }

        self.consume(TokenKind::Eq, "in variable declaration")?;
        let value = self.expression()?;
        if terminated {
            self.consume(TokenKind::Semi, "after variable declaration")?;
        }

        // the initializer cannot see the variable it initializes
        self.declared.insert(target);
        Ok(self.ast.var_decl(target, value, self.symbols)?)
    }

    fn assignment(&mut self, terminated: bool) -> Result<StmtId> {
        let line = self.cursor.line();
        let index = self.cursor.token_index();
        let (target, name_token) = self.identifier("as assignment target")?;
        if !self.declared.contains(&target) {
            return Err(SyntaxError::UndeclaredIdentifier {
                name: name_token.lexeme.into(),
                line,
                token: index,
                span: name_token.span,
            }
            .into());
        }

        let value = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        if terminated {
            self.consume(TokenKind::Semi, "after assignment")?;
        }

        Ok(self.ast.assign(target, value, self.symbols)?)
    }

    fn if_statement(&mut self) -> Result<StmtId> {
        self.consume(TokenKind::If, "")?;
        let condition = self.condition("if")?;
        let then_block = self.block("after if condition")?;
        let else_block = if self.matches(TokenKind::Else) {
            Some(self.block("after 'else'")?)
        } else {
            None
        };
        Ok(self.ast.if_stmt(condition, then_block, else_block)?)
    }

    fn while_statement(&mut self) -> Result<StmtId> {
        self.consume(TokenKind::While, "")?;
        let condition = self.condition("while")?;
        let body = self.block("after while condition")?;
        Ok(self.ast.while_stmt(condition, body)?)
    }

    fn for_statement(&mut self) -> Result<StmtId> {
        self.consume(TokenKind::For, "")?;
        self.consume(TokenKind::Arrow, "after 'for'")?;
        self.consume(TokenKind::LeftParen, "after '=>'")?;

        let init = match self.cursor.current().kind {
            TokenKind::Let => self.let_declaration(false)?,
            TokenKind::Identifier => self.assignment(false)?,
            _ => return Err(self.unexpected("in for loop initializer")),
        };
        self.consume(TokenKind::To, "after for loop initializer")?;
        let limit = self.expression()?;
        let step = if self.matches(TokenKind::Colon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "after for loop header")?;

        let body = self.block("after for loop header")?;
        Ok(self.ast.for_stmt(init, limit, step, body)?)
    }

    fn condition(&mut self, keyword: &str) -> Result<ExprId> {
        self.consume(TokenKind::Arrow, &format!("after '{keyword}'"))?;
        self.consume(TokenKind::LeftParen, "after '=>'")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "after condition")?;
        Ok(condition)
    }

    fn block(&mut self, context: &str) -> Result<StmtId> {
        self.consume(TokenKind::LeftBrace, context)?;

        let mut statements = vec![];
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eoi) {
            statements.push(self.statement()?);
        }
        self.consume(TokenKind::RightBrace, "after block")?;

        let head = self.link(statements)?;
        Ok(self.ast.block(head)?)
    }

    fn expression(&mut self) -> Result<ExprId> {
        self.parse_precedence(Precedence::None)
    }

    fn parse_precedence(&mut self, floor: Precedence) -> Result<ExprId> {
        let mut left = self.primary()?;

        loop {
            let operator = self.cursor.current();
            let precedence = Precedence::of(operator.kind).ok_or_else(|| {
                SyntaxError::ExpectedOperator {
                    found: operator.kind,
                    line: self.cursor.line(),
                    token: self.cursor.token_index(),
                    span: operator.span,
                }
            })?;
            if precedence <= floor {
                return Ok(left);
            }

            self.cursor.advance();
            let op = BinaryOp::try_from(operator.kind)?;
            let right = self.parse_precedence(precedence)?;
            left = self.ast.binary(op, left, right)?;
        }
    }

    fn primary(&mut self) -> Result<ExprId> {
        let token = self.cursor.current();
        match token.kind {
            TokenKind::Number => {
                let TokenValue::Number(value) = token.value else {
                    return Err(self.unexpected("in expression"));
                };
                self.cursor.advance();
                Ok(self.ast.number(value))
            }
            TokenKind::Identifier => {
                let line = self.cursor.line();
                let index = self.cursor.token_index();
                let (code, name_token) = self.identifier("in expression")?;
                if !self.declared.contains(&code) {
                    return Err(SyntaxError::UndeclaredIdentifier {
                        name: name_token.lexeme.into(),
                        line,
                        token: index,
                        span: name_token.span,
                    }
                    .into());
                }
                Ok(self.ast.identifier(code, self.symbols)?)
            }
            TokenKind::LeftParen => {
                self.cursor.advance();
                let expression = self.expression()?;
                self.consume(TokenKind::RightParen, "after grouping")?;
                Ok(expression)
            }
            _ => Err(self.unexpected("in expression")),
        }
    }

    fn identifier(&mut self, context: &str) -> Result<(SymbolCode, Token<'src>)> {
        let token = self.cursor.current();
        match (token.kind, token.value) {
            (TokenKind::Identifier, TokenValue::Symbol(code)) => {
                self.cursor.advance();
                Ok((code, token))
            }
            _ => Err(self.expected(TokenKind::Identifier, context)),
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            false
        } else {
            self.cursor.advance();
            true
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.cursor.current().kind == kind
    }

    fn consume(&mut self, kind: TokenKind, context: &str) -> Result<()> {
        if self.check(kind) {
            self.cursor.advance();
            Ok(())
        } else {
            Err(self.expected(kind, context))
        }
    }

    fn expected(&self, kind: TokenKind, context: &str) -> crate::error::EnmaError {
        let current = self.cursor.current();
        SyntaxError::ExpectedToken {
            expected: kind,
            found: current.kind,
            context: context.into(),
            line: self.cursor.line(),
            token: self.cursor.token_index(),
            span: current.span,
        }
        .into()
    }

    fn unexpected(&self, context: &str) -> crate::error::EnmaError {
        let current = self.cursor.current();
        SyntaxError::UnexpectedToken {
            found: current.kind,
            context: context.into(),
            line: self.cursor.line(),
            token: self.cursor.token_index(),
            span: current.span,
        }
        .into()
    }
}
