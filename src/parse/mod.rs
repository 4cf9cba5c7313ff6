use crate::{
    ast::Ast,
    error::Result,
    lex::{tokenize, Token},
    parse::parser::Parser,
    symbol::SymbolTable,
};

pub mod error;
mod parser;
mod prec;

pub use prec::Precedence;

/// Builds the AST for an already scanned token stream.
pub fn parse<'src>(tokens: Vec<Token<'src>>, symbols: &SymbolTable) -> Result<Ast> {
    Parser::new(tokens, symbols).program()
}

/// Scans and parses `source` in one go.
pub fn parse_source(source: &str, symbols: &mut SymbolTable) -> Result<Ast> {
    let tokens = tokenize(source, symbols)?;
    parse(tokens, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{BinaryOp, Expr, ExprId, StmtKind},
        error::EnmaError,
        parse::error::SyntaxError,
    };

    fn parse_str(source: &str) -> Result<(Ast, SymbolTable)> {
        let mut symbols = SymbolTable::new();
        let ast = parse_source(source, &mut symbols)?;
        Ok((ast, symbols))
    }

    /// Renders an expression with full parenthesization.
    fn shape(ast: &Ast, symbols: &SymbolTable, id: ExprId) -> String {
        match ast.expr(id).unwrap() {
            Expr::Number(value) => value.to_string(),
            Expr::Identifier(code) => symbols.name_of(*code).unwrap().to_string(),
            Expr::Binary { op, left, right } => format!(
                "({} {op} {})",
                shape(ast, symbols, *left),
                shape(ast, symbols, *right)
            ),
        }
    }

    fn printed(source: &str) -> String {
        let (ast, symbols) = parse_str(source).unwrap();
        let (_, stmt) = ast.chain(ast.root()).last().unwrap();
        match stmt.kind {
            StmtKind::Print(value) => shape(&ast, &symbols, value),
            _ => panic!("last statement is not a print"),
        }
    }

    #[test]
    fn good_programs() {
        let sources = [
            "",
            "print(1);",
            "let x = 1;",
            "let x = 1; x = x + 1; x;",
            "let x = 3; print(x + 4);",
            "if => (1 < 2) { print(1); } else { print(0); }",
            "if => (1) { }",
            "let n = 3; while => (n > 0) { n = n - 1; }",
            "for => (let i = 0 to 5) { print(i); }",
            "let i = 10; for => (i = 0 to 20 : 2) { print(i); }",
            "let i = 0; for => (i to 3) { }",
            "let a = 1;\nif => (a == 1) {\n  let b = 2;\n  print(a * b);\n}\nprint(b);",
            "// comment\nprint(/* inline */ 7);",
        ];
        for source in sources {
            assert!(parse_str(source).is_ok(), "{source}");
        }
    }

    #[test]
    fn bad_programs() {
        let sources = [
            "print 1;",
            "print(1)",
            "let = 4;",
            "let x 4;",
            "let x = ;",
            "1 + 2;",
            "if (1) { }",
            "if => (1) print(1);",
            "while => (1) { print(1); ",
            "for => (print(1) to 3) { }",
            "for => (let i = 0; 3) { }",
            "print(2 3);",
            "print(());",
            "let x = 1; x = = 2;",
            "return 1;",
            "{ print(1); }",
        ];
        for source in sources {
            assert!(parse_str(source).is_err(), "{source}");
        }
    }

    #[test]
    fn chain_length_matches_top_level_statements() {
        let (ast, _) =
            parse_str("let x = 1; if => (x) { print(x); print(x); } x = 2; print(x);").unwrap();
        assert_eq!(ast.chain_len(ast.root()), 4);

        let (ast, _) = parse_str("").unwrap();
        assert_eq!(ast.chain_len(ast.root()), 0);
    }

    #[test]
    fn precedence() {
        assert_eq!(printed("print(2 + 3 * 4);"), "(2 + (3 * 4))");
        assert_eq!(printed("print(2 * 3 + 4);"), "((2 * 3) + 4)");
        assert_eq!(printed("print((2 + 3) * 4);"), "((2 + 3) * 4)");
        assert_eq!(printed("print(2 * (3 + 4));"), "(2 * (3 + 4))");
        assert_eq!(printed("print(1 + 2 < 3 * 4);"), "((1 + 2) < (3 * 4))");
    }

    #[test]
    fn same_precedence_is_left_associative() {
        assert_eq!(printed("print(10 - 4 - 3);"), "((10 - 4) - 3)");
        assert_eq!(printed("print(8 / 4 / 2);"), "((8 / 4) / 2)");
        assert_eq!(printed("print(1 < 2 == 1);"), "((1 < 2) == 1)");
    }

    #[test]
    fn undeclared_identifiers_are_rejected() {
        let sources = ["x = 1;", "print(y);", "let x = x;", "for => (i = 0 to 3) { }"];
        for source in sources {
            assert!(
                matches!(
                    parse_str(source),
                    Err(EnmaError::SyntaxError(SyntaxError::UndeclaredIdentifier { .. }))
                ),
                "{source}"
            );
        }
    }

    #[test]
    fn redeclaration_is_rejected() {
        let sources = [
            "let x = 1; let x = 2;",
            "let x = 1; if => (1) { let x = 2; }",
            "for => (let i = 0 to 2) { } for => (let i = 0 to 2) { }",
        ];
        for source in sources {
            assert!(
                matches!(
                    parse_str(source),
                    Err(EnmaError::SyntaxError(SyntaxError::Redeclaration { .. }))
                ),
                "{source}"
            );
        }
    }

    #[test]
    fn errors_carry_location() {
        let Err(EnmaError::SyntaxError(err)) = parse_str("let a = 1;\n\nprint(b);") else {
            panic!("expected a syntax error");
        };
        // tokens: let a = 1 ; print ( b
        assert_eq!(err.location(), (3, 7));
    }

    #[test]
    fn for_loop_defaults_step_to_one() {
        let (ast, symbols) = parse_str("for => (let i = 0 to 5) { print(i); }").unwrap();
        let (_, stmt) = ast.chain(ast.root()).next().unwrap();
        let StmtKind::For {
            init, limit, step, ..
        } = stmt.kind
        else {
            panic!("expected a for statement");
        };

        assert!(matches!(
            ast.stmt(init).unwrap().kind,
            StmtKind::VarDecl { .. }
        ));
        assert_eq!(shape(&ast, &symbols, limit), "5");
        assert_eq!(shape(&ast, &symbols, step), "1");
    }

    #[test]
    fn for_loop_with_step() {
        let (ast, symbols) =
            parse_str("let i = 0; for => (i = 1 to 9 : 2 * 2) { }").unwrap();
        let (_, stmt) = ast.chain(ast.root()).nth(1).unwrap();
        let StmtKind::For { step, .. } = stmt.kind else {
            panic!("expected a for statement");
        };
        assert_eq!(shape(&ast, &symbols, step), "(2 * 2)");
    }

    #[test]
    fn binary_operators_cover_comparisons() {
        let (ast, _) = parse_str("print(1 >= 2);").unwrap();
        let (_, stmt) = ast.chain(ast.root()).next().unwrap();
        let StmtKind::Print(value) = stmt.kind else {
            panic!("expected a print statement");
        };
        assert!(matches!(
            ast.expr(value).unwrap(),
            Expr::Binary {
                op: BinaryOp::GreaterEqual,
                ..
            }
        ));
    }
}
