// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Cool language core.
//!
//! This crate contains the whole pipeline for the Cool teaching language:
//! - Lexical analysis (tokenisation)
//! - Parsing (AST construction)
//! - Semantic analysis (class table, type checking)
//! - Evaluation (tree-walking interpretation)
//!
//! The static stages accumulate diagnostics instead of stopping at the
//! first error, so one pass over a program reports everything it can.
//! Evaluation is the one stage where an error is fatal.

#![doc = include_str!("../../../README.md")]

pub mod ast;
pub mod evaluation;
pub mod semantic_analysis;
pub mod source_analysis;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::Program;
    pub use crate::evaluation::{Evaluator, RuntimeError, Value, evaluate};
    pub use crate::semantic_analysis::{AnalysisResult, ClassTable, analyse};
    pub use crate::source_analysis::{
        Diagnostic, Severity, Span, lex, lex_with_eof, parse,
    };
}
