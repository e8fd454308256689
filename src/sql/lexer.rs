//! SQL Lexer (Tokenizer)
//!
//! This module converts statement text into a stream of tokens, each tagged
//! with its character offset so that parse errors can point at it.

use super::token::{SpannedToken, Token};
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer<'a> {
    /// Original text, kept for error reports
    source: &'a str,
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<SpannedToken> {
        self.skip_whitespace_and_comments();

        let start = self.position;
        if self.is_at_end() {
            return Ok(SpannedToken::new(Token::Eof, start));
        }

        let token = self.read_token()?;
        Ok(SpannedToken::new(token, start))
    }

    fn read_token(&mut self) -> Result<Token> {
        let ch = self.current_char();

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '.' => Some(Token::Dot),
            '*' => Some(Token::Asterisk),
            '=' => Some(Token::Eq),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '-' => {
                match self.peek_char() {
                    Some('>') => {
                        self.advance();
                        self.advance();
                        Ok(Token::Arrow)
                    }
                    Some(d) if d.is_ascii_digit() => {
                        self.advance();
                        self.read_number(true)
                    }
                    _ => Err(self.error(format!("unexpected character '{}'", ch))),
                }
            }
            '<' => {
                self.advance();
                match self.current() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::Lte)
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::Neq)
                    }
                    _ => Ok(Token::Lt),
                }
            }
            '>' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    return Ok(Token::Gte);
                }
                Ok(Token::Gt)
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.advance();
                    self.advance();
                    return Ok(Token::Neq);
                }
                Err(self.error("unexpected character '!'"))
            }
            '\'' => self.read_quoted('\'').map(Token::StringLiteral),
            '"' => self.read_quoted('"').map(Token::QuotedLiteral),
            c if c.is_ascii_digit() => self.read_number(false),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            c => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(message, self.source, Some(self.position))
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace and `--` line comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }
            if self.current() == Some('-') && self.peek_char() == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Read text between `quote` characters; a doubled quote is an escape
    fn read_quoted(&mut self, quote: char) -> Result<String> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == quote {
                if self.peek_char() == Some(quote) {
                    value.push(quote);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(value);
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::parse(
            "unterminated string literal",
            self.source,
            Some(start_pos),
        ))
    }

    /// Read a number (integer or float); the sign has already been consumed
    fn read_number(&mut self, negative: bool) -> Result<Token> {
        let start_pos = if negative {
            self.position - 1
        } else {
            self.position
        };
        let mut value = String::from(if negative { "-" } else { "" });
        let mut is_float = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                value.push(ch);
                self.advance();
            } else if ch == 'e' || ch == 'E' {
                // Scientific notation
                is_float = true;
                value.push(ch);
                self.advance();

                if let Some(sign @ ('+' | '-')) = self.current() {
                    value.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        let invalid = || Error::parse(format!("invalid number '{}'", value), self.source, Some(start_pos));
        if is_float {
            value
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Token::FloatLiteral)
                .ok_or_else(invalid)
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| invalid())
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}
