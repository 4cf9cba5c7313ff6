use std::{fmt::Display, iter::Peekable, str::CharIndices};

use miette::{Diagnostic, SourceSpan};
use phf::phf_map;
use thiserror::Error;

use crate::{
    error::Result,
    symbol::{SymbolCode, SymbolTable},
};

#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    #[error("unexpected character '{character}'")]
    #[diagnostic(code(lex::unexpected_character))]
    UnexpectedCharacter {
        character: char,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("invalid number literal '{lexeme}'")]
    #[diagnostic(code(lex::invalid_number))]
    InvalidNumber {
        lexeme: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unterminated comment")]
    #[diagnostic(code(lex::unterminated_comment))]
    UnterminatedComment {
        #[label("here")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Eq,
    EqEq,
    Bang,
    BangEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,

    // Punctuation
    LeftBrace,
    RightBrace,
    Semi,
    Colon,
    Comma,
    Arrow,

    // Keywords
    Let,
    Print,
    If,
    Else,
    While,
    For,
    To,
    Return,

    Number,
    Identifier,

    Newline,
    Eoi,
}

/// The coarse token classes the parser-facing contract is phrased in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Constant,
    Identifier,
    Operator,
    Keyword,
    Punctuation,
    Newline,
    End,
}

impl TokenKind {
    pub fn class(self) -> TokenClass {
        match self {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::LeftParen
            | TokenKind::RightParen
            | TokenKind::Eq
            | TokenKind::EqEq
            | TokenKind::Bang
            | TokenKind::BangEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq => TokenClass::Operator,

            TokenKind::LeftBrace
            | TokenKind::RightBrace
            | TokenKind::Semi
            | TokenKind::Colon
            | TokenKind::Comma
            | TokenKind::Arrow => TokenClass::Punctuation,

            TokenKind::Let
            | TokenKind::Print
            | TokenKind::If
            | TokenKind::Else
            | TokenKind::While
            | TokenKind::For
            | TokenKind::To
            | TokenKind::Return => TokenClass::Keyword,

            TokenKind::Number => TokenClass::Constant,
            TokenKind::Identifier => TokenClass::Identifier,
            TokenKind::Newline => TokenClass::Newline,
            TokenKind::Eoi => TokenClass::End,
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::BangEq => write!(f, "'!='"),
            TokenKind::Less => write!(f, "'<'"),
            TokenKind::LessEq => write!(f, "'<='"),
            TokenKind::Greater => write!(f, "'>'"),
            TokenKind::GreaterEq => write!(f, "'>='"),

            TokenKind::LeftBrace => write!(f, "'{{'"),
            TokenKind::RightBrace => write!(f, "'}}'"),
            TokenKind::Semi => write!(f, "';'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Arrow => write!(f, "'=>'"),

            TokenKind::Let => write!(f, "'let'"),
            TokenKind::Print => write!(f, "'print'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::To => write!(f, "'to'"),
            TokenKind::Return => write!(f, "'return'"),

            TokenKind::Number => write!(f, "<number>"),
            TokenKind::Identifier => write!(f, "<identifier>"),

            TokenKind::Newline => write!(f, "<newline>"),
            TokenKind::Eoi => write!(f, "EOI"),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "let" => TokenKind::Let,
    "print" => TokenKind::Print,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "for" => TokenKind::For,
    "to" => TokenKind::To,
    "return" => TokenKind::Return,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValue {
    None,
    Number(i64),
    Symbol(SymbolCode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub span: SourceSpan,
    pub value: TokenValue,
}

impl<'src> Token<'src> {
    pub fn eoi(offset: usize) -> Token<'static> {
        Token {
            kind: TokenKind::Eoi,
            lexeme: "",
            span: SourceSpan::new(offset.into(), 0),
            value: TokenValue::None,
        }
    }
}

/// Scans source text into tokens, registering every identifier it meets in
/// the symbol table.
#[derive(Debug)]
pub struct Lexer<'src, 'sym> {
    start: usize,
    current: usize,
    pending_newlines: usize,
    done: bool,
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    symbols: &'sym mut SymbolTable,
}

impl<'src, 'sym> Iterator for Lexer<'src, 'sym> {
    type Item = Result<Token<'src>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        Some(self.scan_token())
    }
}

impl<'src, 'sym> Lexer<'src, 'sym> {
    pub fn new(source: &'src str, symbols: &'sym mut SymbolTable) -> Lexer<'src, 'sym> {
        Lexer {
            start: 0,
            current: 0,
            pending_newlines: 0,
            done: false,
            source,
            chars: source.char_indices().peekable(),
            symbols,
        }
    }

    pub fn scan_token(&mut self) -> Result<Token<'src>> {
        if self.pending_newlines > 0 {
            self.pending_newlines -= 1;
            return Ok(Token {
                kind: TokenKind::Newline,
                lexeme: "",
                span: SourceSpan::new(self.current.into(), 0),
                value: TokenValue::None,
            });
        }

        self.skip_whitespace()?;
        self.start = self.current;

        if self.pending_newlines > 0 {
            return self.scan_token();
        }

        if self.is_at_end() {
            self.done = true;
            return Ok(self.make_token(TokenKind::Eoi));
        }

        let c = self.advance();
        match c {
            '\n' => Ok(self.make_token(TokenKind::Newline)),
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            ';' => Ok(self.make_token(TokenKind::Semi)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            '-' => Ok(self.make_token(TokenKind::Minus)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '!' => {
                let kind = if self.matches('=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                };
                Ok(self.make_token(kind))
            }
            '=' => {
                let kind = if self.matches('=') {
                    TokenKind::EqEq
                } else if self.matches('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Eq
                };
                Ok(self.make_token(kind))
            }
            '<' => {
                let kind = if self.matches('=') {
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                };
                Ok(self.make_token(kind))
            }
            '>' => {
                let kind = if self.matches('=') {
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                };
                Ok(self.make_token(kind))
            }
            '0'..='9' => self.number(),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier(),
            _ => Err(LexError::UnexpectedCharacter {
                character: c,
                span: SourceSpan::new(self.start.into(), c.len_utf8()),
            }
            .into()),
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            span: SourceSpan::new(self.start.into(), self.current - self.start),
            value: TokenValue::None,
        }
    }

    fn advance(&mut self) -> char {
        if let Some((idx, ch)) = self.chars.next() {
            self.current = idx + ch.len_utf8();
            ch
        } else {
            '\0'
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if let Some(&(_, ch)) = self.chars.peek() {
            if ch == expected {
                self.advance();
                return true;
            }
        }
        false
    }

    fn peek(&mut self) -> char {
        self.chars.peek().map(|&(_, ch)| ch).unwrap_or('\0')
    }

    fn peek_next(&mut self) -> char {
        let mut iter = self.source[self.current..].chars();
        iter.next();
        iter.next().unwrap_or('\0')
    }

    // stops in front of '\n' so newlines become tokens
    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                ' ' | '\r' | '\t' => {
                    self.advance();
                }
                '/' => {
                    if self.peek_next() == '/' {
                        while self.peek() != '\n' && !self.is_at_end() {
                            self.advance();
                        }
                    } else if self.peek_next() == '*' {
                        self.advance();
                        self.advance();
                        self.skip_multiline_comment(self.current - 2)?;
                    } else {
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_multiline_comment(&mut self, start: usize) -> Result<()> {
        let mut depth = 1;
        while depth > 0 && !self.is_at_end() {
            if self.peek() == '/' && self.peek_next() == '*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                if self.advance() == '\n' {
                    self.pending_newlines += 1;
                }
            }
        }
        if depth != 0 {
            Err(LexError::UnterminatedComment {
                span: SourceSpan::new(start.into(), self.current - start),
            }
            .into())
        } else {
            Ok(())
        }
    }

    fn number(&mut self) -> Result<Token<'src>> {
        // swallow trailing letters so "12ab" is reported as one bad literal
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let mut token = self.make_token(TokenKind::Number);
        let value = token
            .lexeme
            .parse::<i64>()
            .map_err(|_| LexError::InvalidNumber {
                lexeme: token.lexeme.into(),
                span: token.span,
            })?;
        token.value = TokenValue::Number(value);
        Ok(token)
    }

    fn identifier(&mut self) -> Result<Token<'src>> {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let lexeme = &self.source[self.start..self.current];
        if let Some(&kind) = KEYWORDS.get(lexeme) {
            return Ok(self.make_token(kind));
        }

        let mut token = self.make_token(TokenKind::Identifier);
        token.value = TokenValue::Symbol(self.symbols.try_declare(lexeme));
        Ok(token)
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

/// Scans the whole source. The returned vector always ends with `Eoi`.
pub fn tokenize<'src>(source: &'src str, symbols: &mut SymbolTable) -> Result<Vec<Token<'src>>> {
    Lexer::new(source, symbols).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut symbols = SymbolTable::new();
        tokenize(source, &mut symbols)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn symbols() {
        let source = "+-*/(){};:,= == => ! != < <= > >=";
        let expected = vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBrace,
            TokenKind::RightBrace,
            TokenKind::Semi,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::Eq,
            TokenKind::EqEq,
            TokenKind::Arrow,
            TokenKind::Bang,
            TokenKind::BangEq,
            TokenKind::Less,
            TokenKind::LessEq,
            TokenKind::Greater,
            TokenKind::GreaterEq,
            TokenKind::Eoi,
        ];

        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn keywords() {
        let source = "hello let print for while if else to return letter";
        let expected = vec![
            TokenKind::Identifier,
            TokenKind::Let,
            TokenKind::Print,
            TokenKind::For,
            TokenKind::While,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::To,
            TokenKind::Return,
            TokenKind::Identifier,
            TokenKind::Eoi,
        ];

        assert_eq!(kinds(source), expected);
    }

    #[test]
    fn identifiers_are_registered() {
        let mut symbols = SymbolTable::new();
        let tokens = tokenize("a b a _c9", &mut symbols).unwrap();

        let values: Vec<_> = tokens.iter().map(|token| token.value).collect();
        assert_eq!(
            values,
            vec![
                TokenValue::Symbol(SymbolCode(0)),
                TokenValue::Symbol(SymbolCode(1)),
                TokenValue::Symbol(SymbolCode(0)),
                TokenValue::Symbol(SymbolCode(2)),
                TokenValue::None,
            ]
        );
        assert_eq!(symbols.name_of(SymbolCode(2)).unwrap(), "_c9");
    }

    #[test]
    fn number_literals() {
        let mut symbols = SymbolTable::new();
        let tokens = tokenize("0 42 9223372036854775807", &mut symbols).unwrap();
        let values: Vec<_> = tokens.iter().map(|token| token.value).collect();
        assert_eq!(
            values,
            vec![
                TokenValue::Number(0),
                TokenValue::Number(42),
                TokenValue::Number(i64::MAX),
                TokenValue::None,
            ]
        );
    }

    #[test]
    fn bad_input() {
        let sources = ["12ab", "99999999999999999999", "let x = 1 @ 2;", "/* open"];
        for source in sources {
            let mut symbols = SymbolTable::new();
            assert!(tokenize(source, &mut symbols).is_err(), "{source}");
        }
    }

    #[test]
    fn newlines_survive_comments() {
        let source = "a // one\n/* two\nthree */ b\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Eoi,
            ]
        );
    }

    #[test]
    fn classes() {
        assert_eq!(TokenKind::Number.class(), TokenClass::Constant);
        assert_eq!(TokenKind::Arrow.class(), TokenClass::Punctuation);
        assert_eq!(TokenKind::EqEq.class(), TokenClass::Operator);
        assert_eq!(TokenKind::To.class(), TokenClass::Keyword);
        assert_eq!(TokenKind::Eoi.class(), TokenClass::End);
    }
}
