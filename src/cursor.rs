use crate::lex::{Token, TokenKind};

/// Sequential view over a token stream. Newline tokens are never exposed;
/// they only advance the line counter used for diagnostics.
#[derive(Debug)]
pub struct TokenCursor<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    line: usize,
    index: usize,
}

impl<'src> TokenCursor<'src> {
    pub fn new(mut tokens: Vec<Token<'src>>) -> Self {
        if tokens.last().map(|token| token.kind) != Some(TokenKind::Eoi) {
            let end = tokens
                .last()
                .map(|token| token.span.offset() + token.span.len())
                .unwrap_or(0);
            tokens.push(Token::eoi(end));
        }

        let mut cursor = Self {
            tokens,
            pos: 0,
            line: 1,
            index: 0,
        };
        cursor.skip_newlines();
        cursor
    }

    pub fn current(&self) -> Token<'src> {
        self.tokens[self.pos]
    }

    /// The token after `current()`, newlines skipped.
    pub fn peek_next(&self) -> Token<'src> {
        self.tokens[self.pos + 1..]
            .iter()
            .find(|token| token.kind != TokenKind::Newline)
            .copied()
            .unwrap_or(self.tokens[self.tokens.len() - 1])
    }

    pub fn advance(&mut self) {
        if self.current().kind == TokenKind::Eoi {
            return;
        }
        self.pos += 1;
        self.index += 1;
        self.skip_newlines();
    }

    /// 1-based line of the current token.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 0-based position of the current token, newlines not counted.
    pub fn token_index(&self) -> usize {
        self.index
    }

    pub fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eoi
    }

    fn skip_newlines(&mut self) {
        while self.tokens[self.pos].kind == TokenKind::Newline {
            self.line += 1;
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::tokenize, symbol::SymbolTable};

    #[test]
    fn skips_newlines_and_counts_lines() {
        let mut symbols = SymbolTable::new();
        let tokens = tokenize("\nlet\n\nx ;", &mut symbols).unwrap();
        let mut cursor = TokenCursor::new(tokens);

        assert_eq!(cursor.current().kind, TokenKind::Let);
        assert_eq!((cursor.line(), cursor.token_index()), (2, 0));
        assert_eq!(cursor.peek_next().kind, TokenKind::Identifier);

        cursor.advance();
        assert_eq!(cursor.current().kind, TokenKind::Identifier);
        assert_eq!((cursor.line(), cursor.token_index()), (4, 1));

        cursor.advance();
        cursor.advance();
        assert!(cursor.is_at_end());
        cursor.advance();
        assert!(cursor.is_at_end());
        assert_eq!(cursor.peek_next().kind, TokenKind::Eoi);
    }

    #[test]
    fn empty_stream_is_terminated() {
        let cursor = TokenCursor::new(vec![]);
        assert!(cursor.is_at_end());
    }
}
