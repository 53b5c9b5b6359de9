// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Runtime errors.
//!
//! A dynamic error ends evaluation immediately, unlike static diagnostics
//! which accumulate. Several variants are unreachable from programs that
//! passed analysis (undefined variables, missing methods, operand
//! mismatches); they exist because the evaluator also accepts programs
//! that were never checked.

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

/// An error raised during evaluation.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    /// The program defines no `Main` class.
    #[error("No Main class found")]
    MissingMainClass,

    /// `Main` (and its ancestors) define no `main` method.
    #[error("No main method found in Main class")]
    MissingMainMethod,

    /// Dispatch failed to resolve a method anywhere on the ancestor chain.
    #[error("Method `{method}` not found in class `{class_name}` or its ancestors")]
    MethodNotFound {
        /// The requested method.
        method: EcoString,
        /// The class the lookup started from.
        class_name: EcoString,
    },

    /// A method was called on a void receiver.
    #[error("Dispatch of `{method}` on void")]
    #[diagnostic(help("Initialise the value before calling methods on it"))]
    DispatchOnVoid {
        /// The requested method.
        method: EcoString,
    },

    /// No `case` branch covers the scrutinee's class or any ancestor.
    #[error("No branch of `case` matches a value of class `{class_name}`")]
    CaseUnmatched {
        /// The scrutinee's concrete class.
        class_name: EcoString,
    },

    /// The scrutinee of a `case` was void.
    #[error("`case` scrutinee is void")]
    CaseOnVoid,

    /// A name resolved to neither a local, a formal, nor an attribute.
    #[error("Undefined variable `{name}`")]
    UndefinedVariable {
        /// The unresolved name.
        name: EcoString,
    },

    /// `new` named a class that does not exist.
    #[error("Class `{name}` not found")]
    UndefinedClass {
        /// The unresolved class name.
        name: EcoString,
    },

    /// Integer division with a zero divisor.
    #[error("Division by zero")]
    DivisionByZero,

    /// An arithmetic operation left the 64-bit integer range.
    #[error("Arithmetic overflow in `{operation}`")]
    ArithmeticOverflow {
        /// The operator that overflowed.
        operation: EcoString,
    },

    /// An operand had the wrong dynamic kind for the operation.
    #[error("Expected a value of type `{expected}`, found `{found}`")]
    TypeMismatch {
        /// The kind the operation needs.
        expected: EcoString,
        /// The kind that was found.
        found: EcoString,
    },

    /// The call stack grew past the evaluator's limit.
    #[error("Call depth limit of {limit} exceeded")]
    #[diagnostic(help("Check for unbounded recursion"))]
    CallDepthExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// The program called `abort`.
    #[error("Abort called from class `{class_name}`")]
    Aborted {
        /// The aborting receiver's concrete class.
        class_name: EcoString,
    },

    /// `substr` asked for characters outside the string.
    #[error("`substr({start}, {length})` is out of range for a string of length {string_length}")]
    SubstrOutOfRange {
        /// The requested start index.
        start: i64,
        /// The requested substring length.
        length: i64,
        /// The receiver's length in characters.
        string_length: i64,
    },

    /// Reading input or writing output failed.
    #[error("I/O error during evaluation")]
    Io(#[from] std::io::Error),

    /// An expression the parser replaced with an error marker was reached.
    #[error("Cannot evaluate an expression that failed to parse")]
    InvalidExpression,
}
