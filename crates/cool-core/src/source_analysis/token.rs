// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token definitions for Cool source code.
//!
//! Cool's keywords are matched case-insensitively (`CLASS`, `Class` and
//! `class` are all the `class` keyword). The boolean literals are the one
//! exception: `true`/`false` must start with a lowercase letter, while the
//! remaining letters may be any case. `True` is therefore a type
//! identifier, not a boolean.

use ecow::EcoString;
use std::fmt;

use super::Span;

/// The kind of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// An integer literal. The text is kept verbatim; the parser converts
    /// it so an out-of-range literal becomes a parse diagnostic.
    Integer(EcoString),
    /// A string literal with escape sequences already decoded.
    String(EcoString),
    /// A boolean literal (`true` or `false`).
    Bool(bool),

    // Identifiers
    /// A type identifier: leading uppercase letter (`Main`, `SELF_TYPE`).
    TypeName(EcoString),
    /// An object identifier: leading lowercase letter (`main`, `self`).
    Identifier(EcoString),

    // Keywords
    Class,
    Inherits,
    If,
    Then,
    Else,
    Fi,
    While,
    Loop,
    Pool,
    Let,
    In,
    Case,
    Of,
    Esac,
    New,
    IsVoid,
    Not,

    // Operators and punctuation
    /// `<-`
    Assign,
    /// `=>`
    FatArrow,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `=`
    Equal,
    /// `~`
    Tilde,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `@`
    At,

    /// End of input.
    Eof,
    /// A lexical error, carrying a human-readable message. The lexer
    /// recovers and keeps producing tokens after emitting one.
    Error(EcoString),
}

impl TokenKind {
    /// Returns true for literal tokens (integers, strings, booleans).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::String(_) | Self::Bool(_))
    }

    /// Returns true for identifier tokens (type or object identifiers).
    #[must_use]
    pub const fn is_identifier(&self) -> bool {
        matches!(self, Self::TypeName(_) | Self::Identifier(_))
    }

    /// Returns true for keyword tokens.
    #[must_use]
    pub const fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Inherits
                | Self::If
                | Self::Then
                | Self::Else
                | Self::Fi
                | Self::While
                | Self::Loop
                | Self::Pool
                | Self::Let
                | Self::In
                | Self::Case
                | Self::Of
                | Self::Esac
                | Self::New
                | Self::IsVoid
                | Self::Not
        )
    }

    /// Returns true for the end-of-input token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// Returns true for lexical error tokens.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The text payload of identifier and literal tokens.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Integer(s)
            | Self::String(s)
            | Self::TypeName(s)
            | Self::Identifier(s)
            | Self::Error(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(s) | Self::TypeName(s) | Self::Identifier(s) => write!(f, "{s}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Class => write!(f, "class"),
            Self::Inherits => write!(f, "inherits"),
            Self::If => write!(f, "if"),
            Self::Then => write!(f, "then"),
            Self::Else => write!(f, "else"),
            Self::Fi => write!(f, "fi"),
            Self::While => write!(f, "while"),
            Self::Loop => write!(f, "loop"),
            Self::Pool => write!(f, "pool"),
            Self::Let => write!(f, "let"),
            Self::In => write!(f, "in"),
            Self::Case => write!(f, "case"),
            Self::Of => write!(f, "of"),
            Self::Esac => write!(f, "esac"),
            Self::New => write!(f, "new"),
            Self::IsVoid => write!(f, "isvoid"),
            Self::Not => write!(f, "not"),
            Self::Assign => write!(f, "<-"),
            Self::FatArrow => write!(f, "=>"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Less => write!(f, "<"),
            Self::LessEqual => write!(f, "<="),
            Self::Equal => write!(f, "="),
            Self::Tilde => write!(f, "~"),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::LeftBrace => write!(f, "{{"),
            Self::RightBrace => write!(f, "}}"),
            Self::Semicolon => write!(f, ";"),
            Self::Colon => write!(f, ":"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::At => write!(f, "@"),
            Self::Eof => write!(f, "end of file"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// A token: a kind plus its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The token's kind.
    #[must_use]
    pub const fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Consumes the token, returning its kind.
    #[must_use]
    pub fn into_kind(self) -> TokenKind {
        self.kind
    }

    /// The token's source span.
    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }
}
