// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Semantic analysis for Cool programs.
//!
//! Analysis runs in two stages over a parsed [`Program`]:
//!
//! 1. **Class table construction** ([`ClassTable::build`]) registers every
//!    class alongside the built-ins, validates the inheritance hierarchy,
//!    and resolves method signatures and attribute layouts.
//! 2. **Type checking** walks every method body and attribute initialiser,
//!    applying the typing rules against the table.
//!
//! Diagnostics accumulate across both stages rather than stopping at the
//! first problem, with one exception: a structurally unsound hierarchy
//! (cycle, undefined parent, duplicate class) halts analysis after stage
//! one, because expression checking against a broken table would only
//! produce follow-on noise. The entry-point check (`Main.main()`) runs
//! last, so a missing `Main` never drowns out problems in the classes that
//! do exist.

mod class_table;
mod scope;
mod type_checker;


pub use class_table::{
    AttributeInfo, AttributeSlot, ClassDescriptor, ClassTable, MethodSignature,
};

use crate::ast::Program;
use crate::source_analysis::Diagnostic;

/// The outcome of semantic analysis: the resolved class table plus every
/// diagnostic found along the way.
///
/// The table is returned even when analysis failed, so callers can still
/// answer hierarchy queries about whatever was resolvable.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// The resolved class table.
    pub class_table: ClassTable,
    /// All diagnostics, in reporting order.
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    /// Returns true if any diagnostic is an error.
    ///
    /// Warnings (duplicate features, attribute redefinition) do not make a
    /// program ill-formed on their own.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Analyses a parsed program.
///
/// Expects the parser's output; parse-error recovery nodes in the AST are
/// tolerated and simply not re-reported here.
#[must_use]
pub fn analyse(program: &Program) -> AnalysisResult {
    let (class_table, mut diagnostics) = ClassTable::build(program);
    if class_table.is_sound() {
        diagnostics.extend(type_checker::check_program(program, &class_table));
        diagnostics.extend(class_table.check_entry_point(program));
    }
    AnalysisResult {
        class_table,
        diagnostics,
    }
}
