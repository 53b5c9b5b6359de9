// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Recursive descent parser for Cool source code.
//!
//! This parser builds an AST from a stream of tokens. It always produces a
//! [`Program`], accumulating problems as [`Diagnostic`]s instead of failing,
//! so a single pass reports every error it can find.
//!
//! # Operator Precedence (Pratt Parsing)
//!
//! Infix operator precedence is handled with Pratt parsing (top-down operator
//! precedence): a binding-power table decides how tightly each operator binds,
//! and recursion depth follows from the table rather than from one grammar
//! rule per level.
//!
//! | Level | Operators    | Associativity |
//! |-------|--------------|---------------|
//! | 10    | `<-`         | Right         |
//! | 20    | `<` `<=` `=` | Left          |
//! | 30    | `+` `-`      | Left          |
//! | 40    | `*` `/`      | Left          |
//!
//! The prefix operators bind between these levels: `not` sits below the
//! comparisons, `isvoid` and `~` above the multiplicative operators. Dispatch
//! (`.` and `@Type.`) binds tightest of all.
//!
//! # Usage
//!
//! ```
//! use cool_core::source_analysis::{lex_with_eof, parse};
//!
//! let tokens = lex_with_eof("class Main { main() : Int { 2 + 3 * 4 }; };");
//! let (program, diagnostics) = parse(tokens);
//!
//! assert!(diagnostics.is_empty());
//! assert_eq!(program.classes.len(), 1);
//! ```

use crate::ast::{BinaryOperator, Expression, Program};
use crate::source_analysis::{Span, Token, TokenKind};
use ecow::EcoString;

// Submodules with additional impl blocks for Parser
mod declarations;
mod expressions;

// Property-based tests
#[cfg(test)]
mod property_tests;

// ============================================================================
// Pratt Parsing for Operator Precedence
// ============================================================================

/// Binding power for infix operators (Pratt parsing).
///
/// Higher values bind tighter. Left and right binding powers differ
/// for associativity:
/// - Left-associative: `left_bp == right_bp - 1` (e.g., `+`, `-`)
/// - Right-associative: `left_bp == right_bp + 1` (e.g., `<-`)
#[derive(Debug, Clone, Copy)]
pub(super) struct BindingPower {
    /// Left binding power (how tightly this operator binds to its left operand).
    pub(super) left: u8,
    /// Right binding power (how tightly this operator binds to its right operand).
    pub(super) right: u8,
}

impl BindingPower {
    /// Creates a left-associative binding power.
    const fn left_assoc(precedence: u8) -> Self {
        Self {
            left: precedence,
            right: precedence + 1,
        }
    }

    /// Creates a right-associative binding power.
    const fn right_assoc(precedence: u8) -> Self {
        Self {
            left: precedence + 1,
            right: precedence,
        }
    }
}

/// An infix operator recognised by the Pratt loop.
///
/// Assignment is listed here rather than given its own grammar rule so the
/// binding-power table stays the single source of precedence, but it builds
/// an [`Expression::Assignment`] (with target validation) instead of a
/// [`Expression::BinaryOp`].
#[derive(Debug, Clone, Copy)]
pub(super) enum InfixOperator {
    /// `<-`
    Assign,
    /// `+ - * / < <= =`
    Binary(BinaryOperator),
}

/// Gets the infix operator and binding power for a token, or `None` when the
/// token cannot continue an expression (which ends Pratt parsing, useful for
/// error recovery).
pub(super) fn infix_binding_power(kind: &TokenKind) -> Option<(InfixOperator, BindingPower)> {
    use BinaryOperator::{
        Add, Divide, Equal, LessThan, LessThanOrEqual, Multiply, Subtract,
    };
    let entry = match kind {
        // Assignment (lowest precedence, right-associative)
        TokenKind::Assign => (InfixOperator::Assign, BindingPower::right_assoc(10)),

        // Comparison. Cool makes chained comparisons ill-typed rather than
        // ill-formed, so these are ordinary left-associative operators and
        // the type checker rejects `a < b < c` through its operand rule.
        TokenKind::Less => (InfixOperator::Binary(LessThan), BindingPower::left_assoc(20)),
        TokenKind::LessEqual => (
            InfixOperator::Binary(LessThanOrEqual),
            BindingPower::left_assoc(20),
        ),
        TokenKind::Equal => (InfixOperator::Binary(Equal), BindingPower::left_assoc(20)),

        // Additive
        TokenKind::Plus => (InfixOperator::Binary(Add), BindingPower::left_assoc(30)),
        TokenKind::Minus => (InfixOperator::Binary(Subtract), BindingPower::left_assoc(30)),

        // Multiplicative
        TokenKind::Star => (InfixOperator::Binary(Multiply), BindingPower::left_assoc(40)),
        TokenKind::Slash => (InfixOperator::Binary(Divide), BindingPower::left_assoc(40)),

        _ => return None,
    };
    Some(entry)
}

/// Parse a sequence of tokens into a program.
///
/// This is the main entry point for parsing. It always returns a [`Program`],
/// even if there are syntax errors. Check the returned diagnostics for errors.
///
/// # Examples
///
/// ```
/// use cool_core::source_analysis::{lex_with_eof, parse};
///
/// let tokens = lex_with_eof("class Main { main() : Int { 42 }; };");
/// let (program, diagnostics) = parse(tokens);
///
/// assert!(diagnostics.is_empty());
/// assert_eq!(program.classes.len(), 1);
/// ```
#[must_use]
pub fn parse(tokens: Vec<Token>) -> (Program, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.diagnostics)
}

/// The semantic category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    /// Lexical or syntactic malformation.
    Syntax,
    /// Inheritance-graph problem: duplicate class, undefined parent, cycle.
    Hierarchy,
    /// Name resolution: undefined identifier, unknown class.
    Name,
    /// Expression type rule violation.
    Type,
    /// Dispatch resolution: unknown method, arity or argument mismatch.
    Dispatch,
    /// Missing `Main` class or `main` method.
    EntryPoint,
}

/// The class (and optionally method) a diagnostic was discovered in.
///
/// Attached by the semantic analyser so a diagnostic can be reported as
/// "in method `main` of class `Main`" without re-walking the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticContext {
    /// The enclosing class name.
    pub class: EcoString,
    /// The enclosing method name, when inside a method body.
    pub method: Option<EcoString>,
}

impl DiagnosticContext {
    /// Context for a diagnostic discovered at class level (e.g. in an
    /// attribute initialiser or the class header).
    #[must_use]
    pub fn class(class: impl Into<EcoString>) -> Self {
        Self {
            class: class.into(),
            method: None,
        }
    }

    /// Context for a diagnostic discovered inside a method body.
    #[must_use]
    pub fn method(class: impl Into<EcoString>, method: impl Into<EcoString>) -> Self {
        Self {
            class: class.into(),
            method: Some(method.into()),
        }
    }
}

/// A diagnostic message (error or warning).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// The error message.
    pub message: EcoString,
    /// The source location.
    pub span: Span,
    /// Optional hint for how to fix the issue.
    pub hint: Option<EcoString>,
    /// Optional semantic category.
    pub category: Option<DiagnosticCategory>,
    /// Optional class/method context, attached by the semantic analyser.
    pub context: Option<DiagnosticContext>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            hint: None,
            category: None,
            context: None,
        }
    }

    /// Creates a new warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            hint: None,
            category: None,
            context: None,
        }
    }

    /// Attaches a hint for how to fix the issue.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<EcoString>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attaches a semantic category.
    #[must_use]
    pub fn with_category(mut self, category: DiagnosticCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Attaches the enclosing class/method context.
    #[must_use]
    pub fn with_context(mut self, context: DiagnosticContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns true if this diagnostic is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// An error: the program is malformed or ill-typed.
    Error,
    /// A warning: suspicious but not rejected.
    Warning,
}

/// Maximum nesting depth for expressions before the parser bails out.
///
/// Prevents stack overflow on deeply nested input (e.g., `(((((...)))))`).
/// Each nesting level uses multiple stack frames through the parser call
/// chain, and ASAN-instrumented builds (fuzzing) have larger frames.
/// 64 is generous enough for any realistic program while staying safe.
///
/// As a second line of defence, `stacker::maybe_grow` is used at the
/// recursive entry point so the stack is extended on the heap if needed.
const MAX_NESTING_DEPTH: usize = 64;

/// The parser state.
pub(super) struct Parser {
    /// The tokens being parsed.
    pub(super) tokens: Vec<Token>,
    /// Current token index.
    pub(super) current: usize,
    /// Accumulated diagnostics.
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Current expression nesting depth (guards against stack overflow).
    nesting_depth: usize,
}

impl Parser {
    /// Creates a new parser for the given tokens.
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            nesting_depth: 0,
        }
    }

    // ========================================================================
    // Token Management
    // ========================================================================

    /// Returns the current token.
    pub(super) fn current_token(&self) -> &Token {
        if self.current < self.tokens.len() {
            &self.tokens[self.current]
        } else {
            // If we've advanced past the end of the token stream, fall back to the last token
            // (which should be EOF in well-formed input) rather than panicking.
            self.tokens
                .last()
                .expect("Parser has no tokens; expected at least an EOF token")
        }
    }

    /// Returns the current token kind.
    pub(super) fn current_kind(&self) -> &TokenKind {
        self.current_token().kind()
    }

    /// Returns the span of the most recently consumed token.
    pub(super) fn previous_span(&self) -> Span {
        if self.current == 0 {
            self.current_token().span()
        } else {
            self.tokens[self.current - 1].span()
        }
    }

    /// Checks if we're at the end of input.
    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    /// Advances to the next token and returns the previous one.
    pub(super) fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    /// Checks if the current token matches the given kind.
    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    /// Consumes the current token if it matches the given kind.
    pub(super) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects the current token to match the given kind, advancing if it does.
    ///
    /// If the token doesn't match, reports an error and returns `None`.
    pub(super) fn expect(&mut self, kind: &TokenKind, message: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error(message);
            None
        }
    }

    // ========================================================================
    // Error Handling & Recovery
    // ========================================================================

    /// Reports a syntax error at the current token.
    pub(super) fn error(&mut self, message: impl Into<EcoString>) {
        let span = self.current_token().span();
        self.diagnostics.push(
            Diagnostic::error(message, span).with_category(DiagnosticCategory::Syntax),
        );
    }

    /// Increments the nesting depth and returns `Err(Expression::Error)` if
    /// it exceeds [`MAX_NESTING_DEPTH`].  Call [`Parser::leave_nesting`] on
    /// every exit path when this returns `Ok(())`.
    pub(super) fn enter_nesting(&mut self, span: Span) -> Result<(), Expression> {
        self.nesting_depth += 1;
        if self.nesting_depth > MAX_NESTING_DEPTH {
            self.diagnostics.push(
                Diagnostic::error(
                    format!("Expression nesting is too deep (maximum {MAX_NESTING_DEPTH} levels)"),
                    span,
                )
                .with_category(DiagnosticCategory::Syntax),
            );
            self.nesting_depth -= 1;
            return Err(Expression::Error {
                message: "Expression nesting too deep".into(),
                span,
            });
        }
        Ok(())
    }

    /// Decrements the nesting depth (pair with [`Parser::enter_nesting`]).
    pub(super) fn leave_nesting(&mut self) {
        debug_assert!(
            self.nesting_depth > 0,
            "leave_nesting called without matching enter_nesting"
        );
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }

    /// Synchronizes parser to a safe recovery point.
    ///
    /// Advances until a feature or class boundary:
    /// - Semicolon (`;`) - feature/class terminator
    /// - Right brace (`}`) - body end
    /// - `class` keyword - next definition
    pub(super) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.at_recovery_point() {
                return;
            }

            self.advance();
        }
    }

    /// Returns true if the current token is at a recovery point.
    fn at_recovery_point(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Class
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        AttributeDefinition, ClassDefinition, Feature, LetBinding, MethodDefinition,
    };
    use crate::source_analysis::lex_with_eof;

    fn parse_source(source: &str) -> (Program, Vec<Diagnostic>) {
        parse(lex_with_eof(source))
    }

    /// Parses a program that must be clean, returning it.
    fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse_source(source);
        assert!(
            diagnostics.is_empty(),
            "expected no diagnostics, got: {diagnostics:?}"
        );
        program
    }

    /// Wraps an expression in a minimal program and returns the parsed body
    /// of `Main.main`.
    fn parse_expr(source: &str) -> Expression {
        let program = parse_ok(&format!("class Main {{ main() : Object {{ {source} }}; }};"));
        let class = &program.classes[0];
        match &class.features[0] {
            Feature::Method(method) => method.body.clone(),
            Feature::Attribute(_) => panic!("expected a method"),
        }
    }

    fn sole_class(program: &Program) -> &ClassDefinition {
        assert_eq!(program.classes.len(), 1);
        &program.classes[0]
    }

    fn attribute(feature: &Feature) -> &AttributeDefinition {
        match feature {
            Feature::Attribute(attribute) => attribute,
            Feature::Method(_) => panic!("expected an attribute"),
        }
    }

    fn method(feature: &Feature) -> &MethodDefinition {
        match feature {
            Feature::Method(method) => method,
            Feature::Attribute(_) => panic!("expected a method"),
        }
    }

    // ------------------------------------------------------------------
    // Programs and classes
    // ------------------------------------------------------------------

    #[test]
    fn parses_empty_class() {
        let program = parse_ok("class Empty { };");
        let class = sole_class(&program);
        assert_eq!(class.name.name, "Empty");
        assert!(class.parent.is_none());
        assert!(class.features.is_empty());
    }

    #[test]
    fn parses_class_with_parent() {
        let program = parse_ok("class B inherits A { };");
        let class = sole_class(&program);
        assert_eq!(class.name.name, "B");
        assert_eq!(class.parent.as_ref().map(|p| p.name.as_str()), Some("A"));
    }

    #[test]
    fn parses_multiple_classes_in_order() {
        let program = parse_ok("class A { }; class B { }; class C { };");
        let names: Vec<_> = program
            .classes
            .iter()
            .map(|class| class.name.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn missing_semicolon_after_class_is_reported() {
        let (program, diagnostics) = parse_source("class A { } class B { };");
        assert_eq!(program.classes.len(), 2);
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("';' after class definition"))
        );
    }

    #[test]
    fn stray_tokens_before_class_are_reported_once() {
        let (program, diagnostics) = parse_source("42 17 class A { };");
        assert_eq!(program.classes.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("Expected 'class'"));
    }

    #[test]
    fn empty_input_yields_empty_program() {
        let (program, diagnostics) = parse_source("");
        assert!(program.classes.is_empty());
        assert!(diagnostics.is_empty());
    }

    // ------------------------------------------------------------------
    // Features
    // ------------------------------------------------------------------

    #[test]
    fn parses_attribute_without_initializer() {
        let program = parse_ok("class Counter { count : Int; };");
        let class = sole_class(&program);
        let attr = attribute(&class.features[0]);
        assert_eq!(attr.name.name, "count");
        assert_eq!(attr.declared_type.name, "Int");
        assert!(attr.initializer.is_none());
    }

    #[test]
    fn parses_attribute_with_initializer() {
        let program = parse_ok("class Counter { count : Int <- 5; };");
        let class = sole_class(&program);
        let attr = attribute(&class.features[0]);
        assert!(matches!(
            attr.initializer,
            Some(Expression::IntLiteral { value: 5, .. })
        ));
    }

    #[test]
    fn parses_method_with_formals() {
        let program = parse_ok("class Math { add(a : Int, b : Int) : Int { a + b }; };");
        let class = sole_class(&program);
        let add = method(&class.features[0]);
        assert_eq!(add.name.name, "add");
        assert_eq!(add.formals.len(), 2);
        assert_eq!(add.formals[0].name.name, "a");
        assert_eq!(add.formals[0].declared_type.name, "Int");
        assert_eq!(add.formals[1].name.name, "b");
        assert_eq!(add.return_type.name, "Int");
    }

    #[test]
    fn parses_self_type_return() {
        let program = parse_ok("class A { copy_me() : SELF_TYPE { self }; };");
        let class = sole_class(&program);
        let m = method(&class.features[0]);
        assert!(m.return_type.is_self_type());
        assert!(matches!(m.body, Expression::SelfRef { .. }));
    }

    #[test]
    fn parses_mixed_features_in_order() {
        let program = parse_ok(
            "class Counter {
                count : Int;
                increment() : Int { count <- count + 1 };
                get_count() : Int { count };
            };",
        );
        let class = sole_class(&program);
        assert_eq!(class.features.len(), 3);
        assert_eq!(class.attributes().count(), 1);
        assert_eq!(class.methods().count(), 2);
    }

    #[test]
    fn malformed_feature_does_not_break_the_rest() {
        let (program, diagnostics) = parse_source(
            "class A {
                : Int;
                ok() : Int { 1 };
            };",
        );
        let class = sole_class(&program);
        assert_eq!(class.methods().count(), 1);
        assert!(!diagnostics.is_empty());
    }

    // ------------------------------------------------------------------
    // Literals and identifiers
    // ------------------------------------------------------------------

    #[test]
    fn parses_literals() {
        assert!(matches!(
            parse_expr("42"),
            Expression::IntLiteral { value: 42, .. }
        ));
        assert!(matches!(
            parse_expr("true"),
            Expression::BoolLiteral { value: true, .. }
        ));
        match parse_expr("\"hi\"") {
            Expression::StringLiteral { value, .. } => assert_eq!(value, "hi"),
            other => panic!("expected a string literal, got {other:?}"),
        }
    }

    #[test]
    fn parses_self_as_dedicated_node() {
        assert!(matches!(parse_expr("self"), Expression::SelfRef { .. }));
    }

    #[test]
    fn integer_literal_overflow_is_reported() {
        let (_, diagnostics) =
            parse_source("class Main { main() : Int { 99999999999999999999 }; };");
        assert!(diagnostics.iter().any(|d| d.message.contains("out of range")));
    }

    // ------------------------------------------------------------------
    // Operator precedence and associativity
    // ------------------------------------------------------------------

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // 2 + 3 * 4 => 2 + (3 * 4)
        match parse_expr("2 + 3 * 4") {
            Expression::BinaryOp {
                operator: BinaryOperator::Add,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expression::IntLiteral { value: 2, .. }));
                assert!(matches!(
                    *right,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Multiply,
                        ..
                    }
                ));
            }
            other => panic!("expected addition at the root, got {other:?}"),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        // 1 - 2 - 3 => (1 - 2) - 3
        match parse_expr("1 - 2 - 3") {
            Expression::BinaryOp {
                operator: BinaryOperator::Subtract,
                left,
                right,
                ..
            } => {
                assert!(matches!(
                    *left,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Subtract,
                        ..
                    }
                ));
                assert!(matches!(*right, Expression::IntLiteral { value: 3, .. }));
            }
            other => panic!("expected subtraction at the root, got {other:?}"),
        }
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        // 1 + 2 < 3 * 4 => (1 + 2) < (3 * 4)
        match parse_expr("1 + 2 < 3 * 4") {
            Expression::BinaryOp {
                operator: BinaryOperator::LessThan,
                left,
                right,
                ..
            } => {
                assert!(matches!(
                    *left,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Add,
                        ..
                    }
                ));
                assert!(matches!(
                    *right,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Multiply,
                        ..
                    }
                ));
            }
            other => panic!("expected comparison at the root, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        // x <- y <- 1 => x <- (y <- 1)
        match parse_expr("x <- y <- 1") {
            Expression::Assignment { target, value, .. } => {
                assert_eq!(target.name, "x");
                assert!(matches!(*value, Expression::Assignment { .. }));
            }
            other => panic!("expected assignment at the root, got {other:?}"),
        }
    }

    #[test]
    fn assignment_takes_whole_expression() {
        // x <- 1 + 2 => x <- (1 + 2)
        match parse_expr("x <- 1 + 2") {
            Expression::Assignment { value, .. } => {
                assert!(matches!(
                    *value,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected assignment at the root, got {other:?}"),
        }
    }

    #[test]
    fn assignment_to_self_is_reported() {
        let (_, diagnostics) = parse_source("class Main { main() : Object { self <- 1 }; };");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("Cannot assign to 'self'"))
        );
    }

    #[test]
    fn assignment_to_non_identifier_is_reported() {
        let (_, diagnostics) = parse_source("class Main { main() : Object { 1 + 2 <- 3 }; };");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("Assignment target must be an identifier"))
        );
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        // not 1 < 2 => not (1 < 2)
        match parse_expr("not 1 < 2") {
            Expression::Not { operand, .. } => {
                assert!(matches!(
                    *operand,
                    Expression::BinaryOp {
                        operator: BinaryOperator::LessThan,
                        ..
                    }
                ));
            }
            other => panic!("expected 'not' at the root, got {other:?}"),
        }
    }

    #[test]
    fn negate_binds_tighter_than_multiplication() {
        // ~2 * 3 => (~2) * 3
        match parse_expr("~2 * 3") {
            Expression::BinaryOp {
                operator: BinaryOperator::Multiply,
                left,
                ..
            } => {
                assert!(matches!(*left, Expression::Negate { .. }));
            }
            other => panic!("expected multiplication at the root, got {other:?}"),
        }
    }

    #[test]
    fn isvoid_binds_tighter_than_comparison() {
        // isvoid x = true => (isvoid x) = true
        match parse_expr("isvoid x = true") {
            Expression::BinaryOp {
                operator: BinaryOperator::Equal,
                left,
                ..
            } => {
                assert!(matches!(*left, Expression::IsVoid { .. }));
            }
            other => panic!("expected '=' at the root, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        // (2 + 3) * 4
        match parse_expr("(2 + 3) * 4") {
            Expression::BinaryOp {
                operator: BinaryOperator::Multiply,
                left,
                ..
            } => {
                assert!(matches!(
                    *left,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected multiplication at the root, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    #[test]
    fn parses_dynamic_dispatch() {
        match parse_expr("x.foo(1, 2)") {
            Expression::Dispatch {
                receiver,
                method,
                arguments,
                ..
            } => {
                assert!(matches!(
                    receiver.as_deref(),
                    Some(Expression::Identifier(id)) if id.name == "x"
                ));
                assert_eq!(method.name, "foo");
                assert_eq!(arguments.len(), 2);
            }
            other => panic!("expected a dispatch, got {other:?}"),
        }
    }

    #[test]
    fn parses_implicit_self_dispatch() {
        match parse_expr("foo(42)") {
            Expression::Dispatch {
                receiver,
                method,
                arguments,
                ..
            } => {
                assert!(receiver.is_none());
                assert_eq!(method.name, "foo");
                assert_eq!(arguments.len(), 1);
            }
            other => panic!("expected an implicit dispatch, got {other:?}"),
        }
    }

    #[test]
    fn parses_static_dispatch() {
        match parse_expr("x@Shape.area()") {
            Expression::StaticDispatch {
                receiver,
                static_type,
                method,
                arguments,
                ..
            } => {
                assert!(matches!(
                    *receiver,
                    Expression::Identifier(ref id) if id.name == "x"
                ));
                assert_eq!(static_type.name, "Shape");
                assert_eq!(method.name, "area");
                assert!(arguments.is_empty());
            }
            other => panic!("expected a static dispatch, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_chains_are_left_nested() {
        // a.b().c() => (a.b()).c()
        match parse_expr("a.b().c()") {
            Expression::Dispatch {
                receiver, method, ..
            } => {
                assert_eq!(method.name, "c");
                assert!(matches!(
                    receiver.as_deref(),
                    Some(Expression::Dispatch { .. })
                ));
            }
            other => panic!("expected a dispatch chain, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_binds_tighter_than_arithmetic() {
        // 1 + x.foo() => 1 + (x.foo())
        match parse_expr("1 + x.foo()") {
            Expression::BinaryOp {
                operator: BinaryOperator::Add,
                right,
                ..
            } => {
                assert!(matches!(*right, Expression::Dispatch { .. }));
            }
            other => panic!("expected addition at the root, got {other:?}"),
        }
    }

    #[test]
    fn parses_dispatch_on_self() {
        match parse_expr("self.foo()") {
            Expression::Dispatch { receiver, .. } => {
                assert!(matches!(receiver.as_deref(), Some(Expression::SelfRef { .. })));
            }
            other => panic!("expected a dispatch, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Control constructs
    // ------------------------------------------------------------------

    #[test]
    fn parses_conditional() {
        match parse_expr("if 1 < 2 then 10 else 20 fi") {
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                assert!(matches!(*condition, Expression::BinaryOp { .. }));
                assert!(matches!(*then_branch, Expression::IntLiteral { value: 10, .. }));
                assert!(matches!(*else_branch, Expression::IntLiteral { value: 20, .. }));
            }
            other => panic!("expected a conditional, got {other:?}"),
        }
    }

    #[test]
    fn parses_while_loop() {
        match parse_expr("while x < 3 loop x <- x + 1 pool") {
            Expression::While {
                condition, body, ..
            } => {
                assert!(matches!(*condition, Expression::BinaryOp { .. }));
                assert!(matches!(*body, Expression::Assignment { .. }));
            }
            other => panic!("expected a while loop, got {other:?}"),
        }
    }

    #[test]
    fn parses_block_with_multiple_expressions() {
        match parse_expr("{ 1; 2; 3; }") {
            Expression::Block { body, .. } => {
                assert_eq!(body.len(), 3);
                assert!(matches!(body[2], Expression::IntLiteral { value: 3, .. }));
            }
            other => panic!("expected a block, got {other:?}"),
        }
    }

    #[test]
    fn empty_block_is_reported() {
        let (_, diagnostics) = parse_source("class Main { main() : Object { { } }; };");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("at least one expression"))
        );
    }

    #[test]
    fn parses_let_with_single_binding() {
        match parse_expr("let x : Int <- 7 in x * 2") {
            Expression::Let { bindings, body, .. } => {
                assert_eq!(bindings.len(), 1);
                let LetBinding {
                    name,
                    declared_type,
                    initializer,
                    ..
                } = &bindings[0];
                assert_eq!(name.name, "x");
                assert_eq!(declared_type.name, "Int");
                assert!(initializer.is_some());
                assert!(matches!(*body.clone(), Expression::BinaryOp { .. }));
            }
            other => panic!("expected a let, got {other:?}"),
        }
    }

    #[test]
    fn parses_let_with_multiple_bindings() {
        match parse_expr("let x : Int <- 1, y : Int, z : String <- \"s\" in y") {
            Expression::Let { bindings, .. } => {
                assert_eq!(bindings.len(), 3);
                assert!(bindings[0].initializer.is_some());
                assert!(bindings[1].initializer.is_none());
                assert!(bindings[2].initializer.is_some());
            }
            other => panic!("expected a let, got {other:?}"),
        }
    }

    #[test]
    fn let_body_extends_maximally() {
        // let x : Int <- 1 in x + 1 => body is (x + 1), not x
        match parse_expr("let x : Int <- 1 in x + 1") {
            Expression::Let { body, .. } => {
                assert!(matches!(
                    *body,
                    Expression::BinaryOp {
                        operator: BinaryOperator::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected a let, got {other:?}"),
        }
    }

    #[test]
    fn parses_case_with_branches() {
        match parse_expr("case x of a : A => 1; b : B => 2; esac") {
            Expression::Case {
                scrutinee,
                branches,
                ..
            } => {
                assert!(matches!(
                    *scrutinee,
                    Expression::Identifier(ref id) if id.name == "x"
                ));
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[0].name.name, "a");
                assert_eq!(branches[0].declared_type.name, "A");
                assert_eq!(branches[1].declared_type.name, "B");
            }
            other => panic!("expected a case, got {other:?}"),
        }
    }

    #[test]
    fn case_without_branches_is_reported() {
        let (_, diagnostics) = parse_source("class Main { main() : Object { case x of esac }; };");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("at least one branch"))
        );
    }

    #[test]
    fn parses_new() {
        match parse_expr("new Counter") {
            Expression::New { class_name, .. } => {
                assert_eq!(class_name.name, "Counter");
            }
            other => panic!("expected a new, got {other:?}"),
        }
    }

    #[test]
    fn parses_new_self_type() {
        match parse_expr("new SELF_TYPE") {
            Expression::New { class_name, .. } => {
                assert!(class_name.is_self_type());
            }
            other => panic!("expected a new, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Error recovery
    // ------------------------------------------------------------------

    #[test]
    fn lexical_errors_surface_as_diagnostics() {
        let (_, diagnostics) = parse_source("class Main { main() : Int { # }; };");
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("unexpected character"))
        );
    }

    #[test]
    fn unexpected_token_produces_error_node() {
        let (program, diagnostics) = parse_source("class Main { main() : Int { then }; };");
        assert!(!diagnostics.is_empty());
        let class = &program.classes[0];
        let main = match &class.features[0] {
            Feature::Method(m) => m,
            Feature::Attribute(_) => panic!("expected a method"),
        };
        assert!(main.body.is_error());
    }

    #[test]
    fn deeply_nested_parentheses_hit_the_depth_guard() {
        let depth = 80;
        let source = format!(
            "class Main {{ main() : Int {{ {}1{} }}; }};",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let (_, diagnostics) = parse_source(&source);
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("nesting is too deep"))
        );
    }

    #[test]
    fn all_parser_diagnostics_are_syntax_category() {
        let (_, diagnostics) = parse_source("class A { b; } class");
        assert!(!diagnostics.is_empty());
        assert!(
            diagnostics
                .iter()
                .all(|d| d.category == Some(DiagnosticCategory::Syntax))
        );
    }

    #[test]
    fn diagnostic_builders_attach_metadata() {
        let diagnostic = Diagnostic::error("Unknown class 'Foo'", Span::new(0, 3))
            .with_hint("declare the class before using it")
            .with_category(DiagnosticCategory::Name)
            .with_context(DiagnosticContext::method("Main", "main"));
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.category, Some(DiagnosticCategory::Name));
        let context = diagnostic.context.unwrap();
        assert_eq!(context.class, "Main");
        assert_eq!(context.method.as_deref(), Some("main"));

        let warning = Diagnostic::warning("shadowed attribute", Span::new(0, 1));
        assert!(!warning.is_error());
    }

    #[test]
    fn counter_program_round_trip() {
        let program = parse_ok(
            "class Counter {
                count : Int;

                increment() : Int {
                    count <- count + 1
                };

                get_count() : Int { count };
            };

            class Main inherits Counter {
                main() : Int { { increment(); get_count(); } };
            };",
        );
        assert_eq!(program.classes.len(), 2);
        let counter = &program.classes[0];
        assert_eq!(counter.attributes().count(), 1);
        assert_eq!(counter.methods().count(), 2);
        let main = &program.classes[1];
        assert_eq!(main.parent.as_ref().map(|p| p.name.as_str()), Some("Counter"));
    }
}
