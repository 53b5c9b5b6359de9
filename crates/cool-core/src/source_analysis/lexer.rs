// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexer for Cool source code.
//!
//! Produces a stream of [`Token`]s from source text. The lexer never fails:
//! malformed input (an unterminated string or comment, a stray character)
//! becomes a [`TokenKind::Error`] token and lexing continues, so the parser
//! can report every problem in one pass.
//!
//! Lexical rules worth calling out:
//!
//! - Keywords are case-insensitive; `CLASS` and `class` are the same token.
//! - `true`/`false` are boolean literals only when the first letter is
//!   lowercase. `True` is a type identifier.
//! - `--` starts a comment running to the end of the line; `(* ... *)`
//!   comments nest.
//! - String escapes are decoded here: `\n`, `\t`, `\b` and `\f` map to
//!   their control characters, and `\c` is `c` for any other character.

use std::iter::Peekable;
use std::str::CharIndices;

use super::{Span, Token, TokenKind};

/// A lexer over Cool source text.
///
/// Implements [`Iterator`], yielding tokens until the end of input.
/// Most callers want [`lex`] or [`lex_with_eof`] instead.
pub struct Lexer<'src> {
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
    /// Byte offset just past the most recently consumed character.
    position: usize,
}

impl<'src> Lexer<'src> {
    /// Creates a lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: 0,
        }
    }

    /// Produces the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(error) = self.skip_trivia() {
            return Some(error);
        }

        let start = self.position;
        let c = self.advance()?;
        let kind = self.lex_token_kind(c, start);
        Some(Token::new(kind, self.span_from(start)))
    }

    fn lex_token_kind(&mut self, c: char, start: usize) -> TokenKind {
        match c {
            'a'..='z' | 'A'..='Z' => self.lex_word(start),
            '0'..='9' => self.lex_integer(start),
            '"' => self.lex_string(),
            '<' => {
                if self.match_char('-') {
                    TokenKind::Assign
                } else if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '=' => {
                if self.match_char('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Equal
                }
            }
            '+' => TokenKind::Plus,
            // A `--` comment is consumed by skip_trivia, so a `-` here is
            // always the subtraction operator.
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '~' => TokenKind::Tilde,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '@' => TokenKind::At,
            _ => TokenKind::Error(format!("unexpected character '{c}'").into()),
        }
    }

    /// Lexes an identifier, keyword or boolean literal. The first character
    /// has already been consumed.
    fn lex_word(&mut self, start: usize) -> TokenKind {
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let text = &self.source[start..self.position];
        classify_word(text)
    }

    /// Lexes an integer literal. The first digit has already been consumed.
    fn lex_integer(&mut self, start: usize) -> TokenKind {
        self.advance_while(|c| c.is_ascii_digit());
        TokenKind::Integer(self.source[start..self.position].into())
    }

    /// Lexes a string literal. The opening quote has already been consumed.
    ///
    /// Escape sequences are decoded in place. A raw newline inside the
    /// string is kept verbatim. Reaching the end of input before the
    /// closing quote produces an error token.
    fn lex_string(&mut self) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return TokenKind::Error("unterminated string literal".into()),
                Some('"') => return TokenKind::String(value.into()),
                Some('\\') => match self.advance() {
                    None => return TokenKind::Error("unterminated string literal".into()),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('b') => value.push('\u{0008}'),
                    Some('f') => value.push('\u{000C}'),
                    Some(escaped) => value.push(escaped),
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// Skips whitespace and comments. Returns an error token if a block
    /// comment is left unterminated at the end of input.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.advance_while(char::is_whitespace);
                }
                Some('-') if self.peek_char_n(1) == Some('-') => {
                    self.advance_while(|c| c != '\n');
                }
                Some('(') if self.peek_char_n(1) == Some('*') => {
                    let start = self.position;
                    self.advance();
                    self.advance();
                    if let Some(error) = self.skip_block_comment(start) {
                        return Some(error);
                    }
                }
                _ => return None,
            }
        }
    }

    /// Skips a block comment body, honouring nesting. The opening `(*` has
    /// already been consumed.
    fn skip_block_comment(&mut self, start: usize) -> Option<Token> {
        let mut depth = 1usize;
        loop {
            match self.advance() {
                None => {
                    return Some(Token::new(
                        TokenKind::Error("unterminated block comment".into()),
                        self.span_from(start),
                    ));
                }
                Some('*') if self.peek_char() == Some(')') => {
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        return None;
                    }
                }
                Some('(') if self.peek_char() == Some('*') => {
                    self.advance();
                    depth += 1;
                }
                Some(_) => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Character-level helpers
    // ------------------------------------------------------------------

    /// Consumes one character, tracking the byte position.
    fn advance(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.position = idx + c.len_utf8();
        Some(c)
    }

    /// Consumes characters while `predicate` holds.
    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !predicate(c) {
                break;
            }
            self.advance();
        }
    }

    /// Consumes the next character if it equals `expected`.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// The next character, without consuming it.
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// The character `n` places ahead, without consuming anything.
    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n).map(|(_, c)| c)
    }

    /// A span from `start` to the current position.
    fn span_from(&self, start: usize) -> Span {
        Span::from(start..self.position)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Classifies an alphanumeric word as a keyword, boolean literal, type
/// identifier or object identifier.
fn classify_word(text: &str) -> TokenKind {
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "class" => TokenKind::Class,
        "inherits" => TokenKind::Inherits,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "fi" => TokenKind::Fi,
        "while" => TokenKind::While,
        "loop" => TokenKind::Loop,
        "pool" => TokenKind::Pool,
        "let" => TokenKind::Let,
        "in" => TokenKind::In,
        "case" => TokenKind::Case,
        "of" => TokenKind::Of,
        "esac" => TokenKind::Esac,
        "new" => TokenKind::New,
        "isvoid" => TokenKind::IsVoid,
        "not" => TokenKind::Not,
        _ => {
            let starts_lowercase = text.starts_with(|c: char| c.is_ascii_lowercase());
            if starts_lowercase && (lower == "true" || lower == "false") {
                TokenKind::Bool(lower == "true")
            } else if starts_lowercase {
                TokenKind::Identifier(text.into())
            } else {
                TokenKind::TypeName(text.into())
            }
        }
    }
}

/// Lexes source text into tokens, without a trailing EOF token.
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lexes source text into tokens, appending an EOF token.
///
/// This is the form the parser expects.
#[must_use]
pub fn lex_with_eof(source: &str) -> Vec<Token> {
    let mut tokens = lex(source);
    let end = Span::from(source.len()..source.len());
    tokens.push(Token::new(TokenKind::Eof, end));
    tokens
}
