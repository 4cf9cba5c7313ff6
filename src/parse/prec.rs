use crate::lex::TokenKind;

/// Binding strength of infix operators. `None` is the floor every
/// expression starts from and the value of tokens that end an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None = 0,
    Comparison = 10, // == != < <= > >=
    Term = 50,       // + -
    Factor = 100,    // * /
}

impl Precedence {
    /// Precedence of `kind` in infix position, or `None` (the Rust one) when
    /// the token can neither continue nor end an expression.
    pub fn of(kind: TokenKind) -> Option<Precedence> {
        match kind {
            TokenKind::Star | TokenKind::Slash => Some(Precedence::Factor),
            TokenKind::Plus | TokenKind::Minus => Some(Precedence::Term),
            TokenKind::EqEq
            | TokenKind::BangEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq => Some(Precedence::Comparison),
            TokenKind::RightParen
            | TokenKind::Semi
            | TokenKind::RightBrace
            | TokenKind::To
            | TokenKind::Colon
            | TokenKind::Eoi => Some(Precedence::None),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table() {
        assert_eq!(Precedence::of(TokenKind::Star).map(Precedence::value), Some(100));
        assert_eq!(Precedence::of(TokenKind::Minus).map(Precedence::value), Some(50));
        assert_eq!(Precedence::of(TokenKind::LessEq).map(Precedence::value), Some(10));
        assert_eq!(Precedence::of(TokenKind::To).map(Precedence::value), Some(0));
        assert_eq!(Precedence::of(TokenKind::Eq), None);
        assert!(Precedence::Factor > Precedence::Term);
        assert!(Precedence::Comparison > Precedence::None);
    }
}
