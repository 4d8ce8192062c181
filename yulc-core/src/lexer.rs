//! Lexer for Yul+ sources.
//!
//! Only the structure the transpiler needs is recognized: identifiers,
//! literals, brackets and the handful of Yul+ forms (`sig"..."`,
//! `topic"..."`). Whitespace and comments are skipped; since every token
//! records its byte range, callers can copy everything between tokens
//! through untouched.

use crate::error::DialectSyntaxError;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    StringLiteral,
    /// `sig"function ..."`
    Sig,
    /// `topic"event ..."`
    Topic,

    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    Comma,    // ,
    Colon,    // :
    Assign,   // :=
    Arrow,    // ->

    // Keywords that matter to the transpiler
    Object,
    Code,
    Function,
    Const,
    Enum,
}

/// A single token with its byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.start..self.end]
    }
}

/// Lex a source string into tokens, stopping at the first error.
pub fn lex(source: &str) -> Result<Vec<Token>, DialectSyntaxError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, DialectSyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let Some(ch) = self.peek_char() else {
                return Ok(tokens);
            };
            let start = self.index;
            let kind = match ch {
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b',' => self.single(TokenKind::Comma),
                b':' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'=') {
                        self.consume_char();
                        TokenKind::Assign
                    } else {
                        TokenKind::Colon
                    }
                }
                b'-' if self.peek_next() == Some(b'>') => {
                    self.index += 2;
                    TokenKind::Arrow
                }
                b'"' => {
                    self.lex_string(start)?;
                    TokenKind::StringLiteral
                }
                b'0'..=b'9' => {
                    self.lex_number();
                    TokenKind::Number
                }
                ch if is_ident_start(ch) => self.lex_ident_or_keyword(start)?,
                _ => {
                    let found = self.source[start..].chars().next().unwrap_or_default();
                    return Err(self.error(start, format!("unexpected character '{found}'")));
                }
            };
            tokens.push(Token {
                kind,
                start,
                end: self.index,
            });
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        kind
    }

    fn skip_trivia(&mut self) -> Result<(), DialectSyntaxError> {
        while let Some(ch) = self.peek_char() {
            match ch {
                ch if is_whitespace(ch) => self.consume_char(),
                b'/' if self.peek_next() == Some(b'/') => {
                    while let Some(ch) = self.peek_char() {
                        if ch == b'\n' {
                            break;
                        }
                        self.consume_char();
                    }
                }
                b'/' if self.peek_next() == Some(b'*') => {
                    let start = self.index;
                    self.index += 2;
                    loop {
                        match self.peek_char() {
                            None => return Err(self.error(start, "unterminated block comment")),
                            Some(b'*') if self.peek_next() == Some(b'/') => {
                                self.index += 2;
                                break;
                            }
                            Some(_) => self.consume_char(),
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn lex_string(&mut self, start: usize) -> Result<(), DialectSyntaxError> {
        // opening quote
        self.consume_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                b'"' => {
                    self.consume_char();
                    return Ok(());
                }
                b'\\' => {
                    // Skip over escape sequence: backslash + next char (if any)
                    self.consume_char();
                    if self.peek_char().is_some() {
                        self.consume_char();
                    }
                }
                b'\n' => break,
                _ => self.consume_char(),
            }
        }
        Err(self.error(start, "unterminated string literal"))
    }

    fn lex_number(&mut self) {
        // decimal or 0x-prefixed hex; validity is left to the backend
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() {
                self.consume_char();
            } else {
                break;
            }
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Result<TokenKind, DialectSyntaxError> {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.index];
        if matches!(text, "sig" | "topic") && self.peek_char() == Some(b'"') {
            self.lex_string(self.index)?;
            return Ok(if text == "sig" {
                TokenKind::Sig
            } else {
                TokenKind::Topic
            });
        }

        Ok(match text {
            "object" => TokenKind::Object,
            "code" => TokenKind::Code,
            "function" => TokenKind::Function,
            "const" => TokenKind::Const,
            "enum" => TokenKind::Enum,
            _ => TokenKind::Ident,
        })
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> DialectSyntaxError {
        DialectSyntaxError::at(self.source, offset, message)
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit() || ch == b'.'
}
