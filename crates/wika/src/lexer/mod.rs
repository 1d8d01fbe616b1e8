//! Lexer: converts source bytes into a lazily-pulled stream of tokens.
//!
//! Grounded on the teacher's `compiler/parser/lua_tokenize.rs` (character
//! dispatch, `reset_buff`/`bump`-style cursor) and `original_source/src/
//! scanner.c`'s `identifierType` prefix trie, per `spec.md` §4.1: keyword
//! recognition is a hand match on the first few characters rather than a
//! generic hash lookup.

use smol_str::SmolStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    // single-char punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Star,
    Percent,
    Slash,

    // one/two-char operators
    Minus,
    MinusMinus,
    Plus,
    PlusPlus,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // literals
    Identifier,
    Number,
    String,

    // keywords
    At,
    Gawain,
    Gawin,
    Habang,
    Ibalik,
    Ipakita,
    Itigil,
    Ito,
    Ituloy,
    Kada,
    Kapag,
    Kilalanin,
    Kundiman,
    Kung,
    Mali,
    Mula,
    Null,
    O,
    Palya,
    Sim,
    Suriin,
    Tama,
    Uri,

    // sentinels
    Problema,
    Dulo,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: SmolStr,
    pub line: u32,
}

pub struct Lexer<'a> {
    source: &'a [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Dulo);
        }

        let c = self.advance();

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b'[' => self.make_token(TokenKind::LeftBracket),
            b']' => self.make_token(TokenKind::RightBracket),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b';' => self.make_token(TokenKind::Semicolon),
            b':' => self.make_token(TokenKind::Colon),
            b'*' => self.make_token(TokenKind::Star),
            b'%' => self.make_token(TokenKind::Percent),
            b'/' => self.make_token(TokenKind::Slash),
            b'-' => {
                if self.matches(b'-') {
                    self.make_token(TokenKind::MinusMinus)
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            b'+' => {
                if self.matches(b'+') {
                    self.make_token(TokenKind::PlusPlus)
                } else {
                    self.make_token(TokenKind::Plus)
                }
            }
            b'!' => {
                let kind = if self.matches(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            b'=' => {
                let kind = if self.matches(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            b'>' => {
                let kind = if self.matches(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.matches(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            b'"' => self.string(),
            _ => self.error_token("Hindi kilalang simbolo."),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let lexeme = std::str::from_utf8(&self.source[self.start..self.current])
            .unwrap_or("")
            .into();
        Token {
            kind,
            lexeme,
            line: self.line,
        }
    }

    fn error_token(&self, message: &str) -> Token {
        Token {
            kind: TokenKind::Problema,
            lexeme: SmolStr::new(message),
            line: self.line,
        }
    }

    fn string(&mut self) -> Token {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            if self.peek() == b'\\' && self.peek_next() == b'"' {
                self.advance();
            }
            self.advance();
        }
        if self.is_at_end() {
            return self.error_token("Hindi natapos ang string.");
        }
        self.advance(); // closing quote
        self.make_token(TokenKind::String)
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.make_token(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.advance();
        }
        let kind = self.identifier_kind();
        self.make_token(kind)
    }

    /// Hand-written prefix trie over the closed keyword set, following
    /// `original_source/src/scanner.c`'s `identifierType`.
    fn identifier_kind(&self) -> TokenKind {
        let text = &self.source[self.start..self.current];
        match text.first() {
            Some(b'a') => self.check_keyword(1, b"t", TokenKind::At),
            Some(b'g') => match (text.get(1), text.get(2), text.get(3)) {
                (Some(b'a'), Some(b'w'), Some(b'a')) => {
                    self.check_keyword(4, b"in", TokenKind::Gawain)
                }
                (Some(b'a'), Some(b'w'), Some(b'i')) => {
                    self.check_keyword(4, b"n", TokenKind::Gawin)
                }
                _ => TokenKind::Identifier,
            },
            Some(b'h') => self.check_keyword(1, b"abang", TokenKind::Habang),
            Some(b'i') => match text.get(1) {
                Some(b'b') => self.check_keyword(2, b"alik", TokenKind::Ibalik),
                Some(b'p') => self.check_keyword(2, b"akita", TokenKind::Ipakita),
                Some(b't') => match text.get(2) {
                    Some(b'i') => self.check_keyword(3, b"gil", TokenKind::Itigil),
                    Some(b'o') if text.len() == 3 => TokenKind::Ito,
                    Some(b'u') => self.check_keyword(3, b"loy", TokenKind::Ituloy),
                    _ => TokenKind::Identifier,
                },
                _ => TokenKind::Identifier,
            },
            Some(b'k') => match text.get(1) {
                Some(b'a') => match text.get(2) {
                    Some(b'd') => self.check_keyword(3, b"a", TokenKind::Kada),
                    Some(b'p') => self.check_keyword(3, b"ag", TokenKind::Kapag),
                    _ => TokenKind::Identifier,
                },
                Some(b'i') => self.check_keyword(2, b"lalanin", TokenKind::Kilalanin),
                Some(b'u') => match text.get(2) {
                    Some(b'n') => match text.get(3) {
                        Some(b'd') => self.check_keyword(4, b"iman", TokenKind::Kundiman),
                        Some(b'g') if text.len() == 4 => TokenKind::Kung,
                        _ => TokenKind::Identifier,
                    },
                    _ => TokenKind::Identifier,
                },
                _ => TokenKind::Identifier,
            },
            Some(b'm') => match text.get(1) {
                Some(b'a') => self.check_keyword(2, b"li", TokenKind::Mali),
                Some(b'u') => self.check_keyword(2, b"la", TokenKind::Mula),
                _ => TokenKind::Identifier,
            },
            Some(b'n') => self.check_keyword(1, b"ull", TokenKind::Null),
            Some(b'o') if text.len() == 1 => TokenKind::O,
            Some(b'p') => self.check_keyword(1, b"alya", TokenKind::Palya),
            Some(b's') if text.len() > 1 && text[1] == b'u' => {
                self.check_keyword(1, b"uriin", TokenKind::Suriin)
            }
            Some(b's') => self.check_keyword(1, b"im", TokenKind::Sim),
            Some(b't') => self.check_keyword(1, b"ama", TokenKind::Tama),
            Some(b'u') => self.check_keyword(1, b"ri", TokenKind::Uri),
            _ => TokenKind::Identifier,
        }
    }

    fn check_keyword(&self, start: usize, rest: &[u8], kind: TokenKind) -> TokenKind {
        let text = &self.source[self.start..self.current];
        if text.len() == start + rest.len() && &text[start..] == rest {
            kind
        } else {
            TokenKind::Identifier
        }
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}
