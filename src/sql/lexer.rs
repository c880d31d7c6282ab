//! SQL lexer/tokenizer.
//!
//! The [`Lexer`] converts a SQL string into a stream of [`Token`]s.
//! It handles keywords, identifiers, literals, operators, and comments.

use super::error::{ParseError, Span};
use super::token::{Keyword, Token, TokenKind};

/// SQL lexer that tokenizes input strings.
///
/// Handles:
/// - Keywords (case-insensitive)
/// - Identifiers (`[A-Za-z_][A-Za-z0-9_]*`)
/// - Numeric literals (integers and floats)
/// - String literals (single-quoted with `''` escape)
/// - Operators and punctuation
/// - Comments (`--` line comments and `/* */` block comments)
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    /// Accumulated errors during tokenization.
    errors: Vec<ParseError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Takes all errors, leaving an empty error list.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Tokenizes the entire input and returns all tokens.
    ///
    /// The returned vector always ends with an EOF token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Returns the next token from the input.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.pos;

        let ch = match self.current_char() {
            Some(ch) => ch,
            None => return Token::new(TokenKind::Eof, Span::at(start)),
        };

        if ch == '\'' {
            return self.scan_string_literal();
        }

        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return self.scan_identifier_or_keyword();
        }

        self.advance();
        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Eq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '<' => {
                if self.consume_char('=') {
                    TokenKind::LtEq
                } else if self.consume_char('>') {
                    TokenKind::Neq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.consume_char('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '!' => {
                if self.consume_char('=') {
                    TokenKind::Neq
                } else {
                    self.errors.push(ParseError::new(
                        "unexpected character '!'",
                        Span::new(start, self.pos),
                    ));
                    return self.next_token();
                }
            }
            other => {
                self.errors.push(ParseError::new(
                    format!("unexpected character '{}'", other),
                    Span::new(start, self.pos),
                ));
                return self.next_token();
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    fn scan_string_literal(&mut self) -> Token {
        let start = self.pos;
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.current_char() {
                Some('\'') => {
                    self.advance();
                    // '' inside a string is an escaped quote
                    if self.current_char() == Some('\'') {
                        value.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
                None => {
                    self.errors
                        .push(ParseError::unterminated_string(Span::new(start, self.pos)));
                    break;
                }
            }
        }

        Token::new(TokenKind::String(value), Span::new(start, self.pos))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Fractional part: a dot followed by a digit. A bare trailing dot is
        // left for the parser (qualified names never follow a number anyway).
        let mut is_float = false;
        if self.current_char() == Some('.')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        let span = Span::new(start, self.pos);
        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(n) => TokenKind::Float(n),
                Err(_) => {
                    self.errors.push(ParseError::invalid_number(span));
                    TokenKind::Float(0.0)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Integer(n),
                Err(_) => {
                    self.errors.push(ParseError::invalid_number(span));
                    TokenKind::Integer(0)
                }
            }
        };

        Token::new(kind, span)
    }

    fn scan_identifier_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while self
            .current_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        let span = Span::new(start, self.pos);
        match Keyword::from_str(text) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), span),
            None => Token::new(TokenKind::Identifier(text.to_string()), span),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek_char(1) == Some('-') => {
                    while self.current_char().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                Some('/') if self.peek_char(1) == Some('*') => {
                    let start = self.pos;
                    self.advance();
                    self.advance();
                    loop {
                        match self.current_char() {
                            Some('*') if self.peek_char(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => self.advance(),
                            None => {
                                self.errors.push(ParseError::new(
                                    "unterminated block comment",
                                    Span::new(start, self.pos),
                                ));
                                break;
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }
}
