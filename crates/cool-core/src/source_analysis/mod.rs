// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parsing infrastructure for Cool source code.
//!
//! This module contains the lexer, the parser, and the diagnostic types
//! shared by every stage of the pipeline.
//!
//! # Lexical Analysis
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s. Each token
//! carries its source location via [`Span`].
//!
//! ```
//! use cool_core::source_analysis::Lexer;
//!
//! let tokens: Vec<_> = Lexer::new("count + 1").collect();
//! assert_eq!(tokens.len(), 3); // count, +, 1
//! ```
//!
//! See [`TokenKind`] for all supported syntactic elements.
//!
//! # Parsing
//!
//! The [`parse`] function converts tokens into a [`Program`](crate::ast::Program)
//! AST. Operator precedence uses Pratt parsing for correct associativity and
//! easy extensibility.
//!
//! # Error Handling
//!
//! The lexer uses error recovery: invalid input is converted into
//! [`TokenKind::Error`] tokens rather than stopping. The parser turns those
//! tokens, and its own failures, into [`Diagnostic`] values and keeps going,
//! so one pass over a malformed program reports everything it can.

mod lexer;
mod parser;
mod span;
mod token;


pub use lexer::{Lexer, lex, lex_with_eof};
pub use parser::{Diagnostic, DiagnosticCategory, DiagnosticContext, Severity, parse};
pub use span::Span;
pub use token::{Token, TokenKind};
