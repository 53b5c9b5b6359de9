// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression-level type checking.
//!
//! The second analysis stage: walks every method body and attribute
//! initialiser of every user class and applies the typing rules, using the
//! [`ClassTable`] for inheritance queries. Checking never stops at the first
//! problem. Each violated rule reports a diagnostic and recovers with
//! `Object`, the type every value conforms to, so one mistake does not
//! cascade into a dozen follow-on reports.
//!
//! `SELF_TYPE` handling lives here rather than in the class table: the
//! checker substitutes the current class before asking conformance
//! questions, and resolves a dispatch's `SELF_TYPE` return against the
//! receiver's static type. The substitution runs on both sides of a
//! conformance check, which is what lets `make() : SELF_TYPE { new A }`
//! pass inside class `A`.

use super::class_table::ClassTable;
use super::scope::TypeScope;
use crate::ast::{
    AttributeDefinition, BinaryOperator, CaseBranch, ClassDefinition, Expression, Feature,
    Identifier, LetBinding, MethodDefinition, Program, TypeName,
};
use crate::source_analysis::{Diagnostic, DiagnosticCategory, DiagnosticContext, Span};
use ecow::EcoString;
use std::collections::{HashMap, HashSet};

/// Type checks every user class in the program against a sound class table.
///
/// Classes rejected during table construction (duplicates, including
/// attempted redefinitions of built-ins) are skipped: their bodies were not
/// recorded, so checking them would resolve names against the wrong class.
pub(super) fn check_program(program: &Program, table: &ClassTable) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut seen: HashSet<EcoString> = HashSet::new();
    for class in &program.classes {
        if !seen.insert(class.name.name.clone()) {
            continue;
        }
        if table
            .get_class(class.name.name.as_str())
            .is_some_and(|descriptor| descriptor.builtin)
        {
            continue;
        }
        let mut checker = TypeChecker::new(table, class.name.name.clone());
        checker.check_class(class);
        diagnostics.extend(checker.diagnostics);
    }
    diagnostics
}

/// Checks one class at a time; a fresh instance per class keeps the scope
/// and context from leaking between classes.
struct TypeChecker<'a> {
    table: &'a ClassTable,
    scope: TypeScope,
    current_class: EcoString,
    current_method: Option<EcoString>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TypeChecker<'a> {
    fn new(table: &'a ClassTable, current_class: EcoString) -> Self {
        Self {
            table,
            scope: TypeScope::new(),
            current_class,
            current_method: None,
            diagnostics: Vec::new(),
        }
    }

    fn check_class(&mut self, class: &ClassDefinition) {
        for feature in &class.features {
            match feature {
                Feature::Attribute(attribute) => self.check_attribute(attribute),
                Feature::Method(method) => self.check_method(method),
            }
        }
    }

    /// Checks an attribute's declared type and, when present, that its
    /// initialiser conforms. Initialisers see `self` and the class's
    /// attributes but no locals.
    fn check_attribute(&mut self, attribute: &AttributeDefinition) {
        self.current_method = None;
        let declared = attribute.declared_type.name.clone();
        let declared_defined = self.type_exists(&declared);
        if !declared_defined {
            self.error(
                DiagnosticCategory::Type,
                format!(
                    "Attribute `{}` has undefined type `{declared}`",
                    attribute.name.name
                ),
                attribute.declared_type.span,
            );
        }
        if let Some(initializer) = &attribute.initializer {
            let actual = self.infer(initializer);
            if declared_defined && !self.conforms(&actual, &declared) {
                self.error(
                    DiagnosticCategory::Type,
                    format!(
                        "Attribute `{}` initialisation has type `{actual}` but declares type `{declared}`",
                        attribute.name.name
                    ),
                    initializer.span(),
                );
            }
        }
    }

    /// Checks a method: formal declarations, return type, and that the body
    /// conforms to the declared return.
    fn check_method(&mut self, method: &MethodDefinition) {
        self.current_method = Some(method.name.name.clone());
        self.scope.push();

        let mut seen: HashMap<EcoString, Span> = HashMap::new();
        for formal in &method.formals {
            if formal.declared_type.is_self_type() {
                self.error(
                    DiagnosticCategory::Type,
                    format!(
                        "`SELF_TYPE` cannot be the type of formal parameter `{}`",
                        formal.name.name
                    ),
                    formal.declared_type.span,
                );
            } else if !self.table.has_class(formal.declared_type.name.as_str()) {
                self.error(
                    DiagnosticCategory::Type,
                    format!(
                        "Formal parameter `{}` has undefined type `{}`",
                        formal.name.name, formal.declared_type.name
                    ),
                    formal.declared_type.span,
                );
            }
            if let Some(first) = seen.get(&formal.name.name) {
                self.report(
                    Diagnostic::error(
                        format!(
                            "Formal parameter `{}` is declared more than once in method `{}`",
                            formal.name.name, method.name.name
                        ),
                        formal.name.span,
                    )
                    .with_hint(format!("Already declared at offset {}", first.start()))
                    .with_category(DiagnosticCategory::Name),
                );
            } else {
                seen.insert(formal.name.name.clone(), formal.name.span);
            }
            self.scope
                .define(formal.name.name.clone(), formal.declared_type.name.clone());
        }

        let declared = method.return_type.name.clone();
        let declared_defined = self.type_exists(&declared);
        if !declared_defined {
            self.error(
                DiagnosticCategory::Type,
                format!(
                    "Method `{}` has undefined return type `{declared}`",
                    method.name.name
                ),
                method.return_type.span,
            );
        }
        let body_type = self.infer(&method.body);
        if declared_defined && !self.conforms(&body_type, &declared) {
            self.error(
                DiagnosticCategory::Type,
                format!(
                    "Method `{}` in class `{}` has body of type `{body_type}` but declares return type `{declared}`",
                    method.name.name, self.current_class
                ),
                method.body.span(),
            );
        }

        self.scope.pop();
        self.current_method = None;
    }

    // --- expression rules ---

    /// Infers an expression's static type, accumulating diagnostics for
    /// every violated rule along the way.
    fn infer(&mut self, expression: &Expression) -> EcoString {
        match expression {
            Expression::IntLiteral { .. } => "Int".into(),
            Expression::StringLiteral { .. } => "String".into(),
            Expression::BoolLiteral { .. } => "Bool".into(),
            Expression::SelfRef { .. } => "SELF_TYPE".into(),
            Expression::Identifier(identifier) => self.infer_identifier(identifier),
            Expression::Assignment { target, value, .. } => self.infer_assignment(target, value),
            Expression::Dispatch {
                receiver,
                method,
                arguments,
                span,
            } => self.infer_dispatch(receiver.as_deref(), method, arguments, *span),
            Expression::StaticDispatch {
                receiver,
                static_type,
                method,
                arguments,
                span,
            } => self.infer_static_dispatch(receiver, static_type, method, arguments, *span),
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.infer_conditional(condition, then_branch, else_branch),
            Expression::While {
                condition, body, ..
            } => self.infer_while(condition, body),
            Expression::Block { body, .. } => self.infer_block(body),
            Expression::Let { bindings, body, .. } => self.infer_let(bindings, body),
            Expression::Case {
                scrutinee, branches, ..
            } => self.infer_case(scrutinee, branches),
            Expression::New { class_name, .. } => self.infer_new(class_name),
            Expression::IsVoid { operand, .. } => {
                self.infer(operand);
                "Bool".into()
            }
            Expression::Negate { operand, span } => self.infer_negate(operand, *span),
            Expression::Not { operand, span } => self.infer_not(operand, *span),
            Expression::BinaryOp {
                operator,
                left,
                right,
                span,
            } => self.infer_binary(*operator, left, right, *span),
            // Already reported by the parser; recover quietly.
            Expression::Error { .. } => "Object".into(),
        }
    }

    /// Locals first, then the class's attributes (inherited included), else
    /// an undefined-identifier diagnostic recovering with `Object`.
    fn infer_identifier(&mut self, identifier: &Identifier) -> EcoString {
        if let Some(declared) = self.scope.lookup(&identifier.name) {
            return declared.clone();
        }
        if let Some(slot) = self.table.find_attribute(&self.current_class, &identifier.name) {
            return slot.declared_type.clone();
        }
        self.error(
            DiagnosticCategory::Name,
            format!("Undefined identifier `{}`", identifier.name),
            identifier.span,
        );
        "Object".into()
    }

    /// The target must resolve (locals first, then attributes) and the
    /// assigned value must conform to its declared type. The assignment's
    /// own type is the value's type.
    fn infer_assignment(&mut self, target: &Identifier, value: &Expression) -> EcoString {
        let value_type = self.infer(value);
        let declared = self.scope.lookup(&target.name).cloned().or_else(|| {
            self.table
                .find_attribute(&self.current_class, &target.name)
                .map(|slot| slot.declared_type.clone())
        });
        let Some(declared) = declared else {
            self.error(
                DiagnosticCategory::Name,
                format!("Assignment to undeclared identifier `{}`", target.name),
                target.span,
            );
            return value_type;
        };
        if !self.conforms(&value_type, &declared) {
            self.error(
                DiagnosticCategory::Type,
                format!(
                    "Cannot assign value of type `{value_type}` to `{}` of type `{declared}`",
                    target.name
                ),
                value.span(),
            );
        }
        value_type
    }

    fn infer_conditional(
        &mut self,
        condition: &Expression,
        then_branch: &Expression,
        else_branch: &Expression,
    ) -> EcoString {
        let condition_type = self.infer(condition);
        if condition_type != "Bool" {
            self.error(
                DiagnosticCategory::Type,
                format!("`if` condition must be `Bool`, found `{condition_type}`"),
                condition.span(),
            );
        }
        // Both branches are checked even under a bad condition.
        let then_type = self.infer(then_branch);
        let else_type = self.infer(else_branch);
        self.join_types(&then_type, &else_type)
    }

    fn infer_while(&mut self, condition: &Expression, body: &Expression) -> EcoString {
        let condition_type = self.infer(condition);
        if condition_type != "Bool" {
            self.error(
                DiagnosticCategory::Type,
                format!("`while` condition must be `Bool`, found `{condition_type}`"),
                condition.span(),
            );
        }
        self.infer(body);
        // A loop runs zero or more times, so its value carries no type
        // information.
        "Object".into()
    }

    fn infer_block(&mut self, body: &[Expression]) -> EcoString {
        let mut result: EcoString = "Object".into();
        for expression in body {
            result = self.infer(expression);
        }
        result
    }

    /// Bindings extend the scope left to right: later initialisers see
    /// earlier bindings, and no binding sees itself.
    fn infer_let(&mut self, bindings: &[LetBinding], body: &Expression) -> EcoString {
        self.scope.push();
        for binding in bindings {
            let declared = binding.declared_type.name.clone();
            let declared_defined = self.type_exists(&declared);
            if !declared_defined {
                self.error(
                    DiagnosticCategory::Type,
                    format!(
                        "Let binding `{}` has undefined type `{declared}`",
                        binding.name.name
                    ),
                    binding.declared_type.span,
                );
            }
            if let Some(initializer) = &binding.initializer {
                let actual = self.infer(initializer);
                if declared_defined && !self.conforms(&actual, &declared) {
                    self.error(
                        DiagnosticCategory::Type,
                        format!(
                            "Let initialisation of `{}` has type `{actual}` but declares type `{declared}`",
                            binding.name.name
                        ),
                        initializer.span(),
                    );
                }
            }
            self.scope.define(binding.name.name.clone(), declared);
        }
        let result = self.infer(body);
        self.scope.pop();
        result
    }

    /// Each branch binds its name at the declared type in an independent
    /// scope. Branch types must be pairwise distinct; a duplicate is
    /// reported and the branch is still checked.
    fn infer_case(&mut self, scrutinee: &Expression, branches: &[CaseBranch]) -> EcoString {
        self.infer(scrutinee);
        let mut seen: HashMap<EcoString, Span> = HashMap::new();
        let mut result: Option<EcoString> = None;
        for branch in branches {
            let declared = branch.declared_type.name.clone();
            if branch.declared_type.is_self_type() {
                self.error(
                    DiagnosticCategory::Type,
                    "`SELF_TYPE` cannot be used as a `case` branch type",
                    branch.declared_type.span,
                );
            } else if !self.table.has_class(declared.as_str()) {
                self.error(
                    DiagnosticCategory::Type,
                    format!("`case` branch has undefined type `{declared}`"),
                    branch.declared_type.span,
                );
            }
            if let Some(first) = seen.get(&declared) {
                self.report(
                    Diagnostic::error(
                        format!("Duplicate branch type `{declared}` in `case` expression"),
                        branch.declared_type.span,
                    )
                    .with_hint(format!("Already covered at offset {}", first.start()))
                    .with_category(DiagnosticCategory::Type),
                );
            } else {
                seen.insert(declared.clone(), branch.declared_type.span);
            }
            self.scope.push();
            self.scope.define(branch.name.name.clone(), declared);
            let branch_type = self.infer(&branch.body);
            self.scope.pop();
            result = Some(match result {
                None => branch_type,
                Some(previous) => self.join_types(&previous, &branch_type),
            });
        }
        result.unwrap_or_else(|| "Object".into())
    }

    fn infer_new(&mut self, class_name: &TypeName) -> EcoString {
        if class_name.is_self_type() {
            return "SELF_TYPE".into();
        }
        if !self.table.has_class(class_name.name.as_str()) {
            self.error(
                DiagnosticCategory::Type,
                format!("Cannot instantiate undefined class `{}`", class_name.name),
                class_name.span,
            );
            return "Object".into();
        }
        class_name.name.clone()
    }

    fn infer_negate(&mut self, operand: &Expression, span: Span) -> EcoString {
        let operand_type = self.infer(operand);
        if operand_type == "Int" {
            "Int".into()
        } else {
            self.error(
                DiagnosticCategory::Type,
                format!("`~` requires an `Int` operand, found `{operand_type}`"),
                span,
            );
            "Object".into()
        }
    }

    fn infer_not(&mut self, operand: &Expression, span: Span) -> EcoString {
        let operand_type = self.infer(operand);
        if operand_type == "Bool" {
            "Bool".into()
        } else {
            self.error(
                DiagnosticCategory::Type,
                format!("`not` requires a `Bool` operand, found `{operand_type}`"),
                span,
            );
            "Object".into()
        }
    }

    /// Arithmetic and ordering need `Int` operands; equality needs its
    /// operands related by subtyping in either direction.
    fn infer_binary(
        &mut self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
        span: Span,
    ) -> EcoString {
        let left_type = self.infer(left);
        let right_type = self.infer(right);
        if operator.is_arithmetic() {
            return if left_type == "Int" && right_type == "Int" {
                "Int".into()
            } else {
                self.error(
                    DiagnosticCategory::Type,
                    format!(
                        "`{operator}` requires `Int` operands, found `{left_type}` and `{right_type}`"
                    ),
                    span,
                );
                "Object".into()
            };
        }
        if operator.is_ordering() {
            return if left_type == "Int" && right_type == "Int" {
                "Bool".into()
            } else {
                self.error(
                    DiagnosticCategory::Type,
                    format!(
                        "`{operator}` requires `Int` operands, found `{left_type}` and `{right_type}`"
                    ),
                    span,
                );
                "Object".into()
            };
        }
        let left_concrete = self.resolve_self_type(&left_type);
        let right_concrete = self.resolve_self_type(&right_type);
        if self.table.is_subtype(&left_concrete, &right_concrete)
            || self.table.is_subtype(&right_concrete, &left_concrete)
        {
            "Bool".into()
        } else {
            self.error(
                DiagnosticCategory::Type,
                format!("Cannot compare expressions of types `{left_type}` and `{right_type}`"),
                span,
            );
            "Object".into()
        }
    }

    /// Dynamic dispatch. An implicit receiver is a self-dispatch whose
    /// static type is the current class; an explicit `self` receiver keeps
    /// `SELF_TYPE`, so a `SELF_TYPE` return stays polymorphic through it.
    fn infer_dispatch(
        &mut self,
        receiver: Option<&Expression>,
        method: &Identifier,
        arguments: &[Expression],
        span: Span,
    ) -> EcoString {
        let receiver_static = match receiver {
            Some(expression) => self.infer(expression),
            None => self.current_class.clone(),
        };
        let lookup_class = self.resolve_self_type(&receiver_static);
        self.check_call(&lookup_class, &receiver_static, method, arguments, span)
    }

    /// Static dispatch: lookup is rooted at a named class, which must be a
    /// defined ancestor of the receiver's static type.
    fn infer_static_dispatch(
        &mut self,
        receiver: &Expression,
        static_type: &TypeName,
        method: &Identifier,
        arguments: &[Expression],
        span: Span,
    ) -> EcoString {
        let receiver_static = self.infer(receiver);
        if static_type.is_self_type() {
            self.error(
                DiagnosticCategory::Type,
                "`SELF_TYPE` cannot be the target of a static dispatch",
                static_type.span,
            );
            for argument in arguments {
                self.infer(argument);
            }
            return "Object".into();
        }
        if !self.table.has_class(static_type.name.as_str()) {
            self.error(
                DiagnosticCategory::Type,
                format!("Static dispatch to undefined class `{}`", static_type.name),
                static_type.span,
            );
            for argument in arguments {
                self.infer(argument);
            }
            return "Object".into();
        }
        let receiver_concrete = self.resolve_self_type(&receiver_static);
        if !self.table.is_subtype(&receiver_concrete, static_type.name.as_str()) {
            self.error(
                DiagnosticCategory::Dispatch,
                format!(
                    "Static dispatch type `{}` is not an ancestor of receiver type `{receiver_static}`",
                    static_type.name
                ),
                span,
            );
        }
        self.check_call(
            static_type.name.as_str(),
            &receiver_static,
            method,
            arguments,
            span,
        )
    }

    /// Shared call checking: resolve the method from `lookup_class`, match
    /// arity, check each argument conforms to its formal, and resolve
    /// `SELF_TYPE` in return position to the receiver's static type.
    ///
    /// Arguments are checked even when resolution or arity fails, so their
    /// own problems still surface in the same run.
    fn check_call(
        &mut self,
        lookup_class: &str,
        receiver_static: &str,
        method: &Identifier,
        arguments: &[Expression],
        span: Span,
    ) -> EcoString {
        let Some(signature) = self.table.find_method(lookup_class, &method.name) else {
            self.error(
                DiagnosticCategory::Dispatch,
                format!(
                    "Method `{}` not found in class `{lookup_class}` or its ancestors",
                    method.name
                ),
                method.span,
            );
            for argument in arguments {
                self.infer(argument);
            }
            return "Object".into();
        };
        if arguments.len() != signature.arity() {
            self.error(
                DiagnosticCategory::Dispatch,
                format!(
                    "Method `{}` expects {} arguments but got {}",
                    method.name,
                    signature.arity(),
                    arguments.len()
                ),
                span,
            );
            for argument in arguments {
                self.infer(argument);
            }
            return "Object".into();
        }
        for (argument, expected) in arguments.iter().zip(&signature.parameter_types) {
            let actual = self.infer(argument);
            if !self.conforms(&actual, expected) {
                self.error(
                    DiagnosticCategory::Dispatch,
                    format!(
                        "In call to `{}`, argument of type `{actual}` where `{expected}` was expected",
                        method.name
                    ),
                    argument.span(),
                );
            }
        }
        if signature.return_type == "SELF_TYPE" {
            receiver_static.into()
        } else {
            signature.return_type.clone()
        }
    }

    // --- conformance helpers ---

    /// Whether an expression of type `actual` satisfies an expected static
    /// type. `SELF_TYPE` on either side resolves to the current class.
    fn conforms(&self, actual: &str, expected: &str) -> bool {
        if actual == expected {
            return true;
        }
        let actual = self.resolve_self_type(actual);
        let expected = self.resolve_self_type(expected);
        self.table.is_subtype(&actual, &expected)
    }

    /// The least common ancestor of two inferred types, preserving
    /// `SELF_TYPE` when both sides carry it.
    fn join_types(&self, first: &str, second: &str) -> EcoString {
        if first == second {
            return first.into();
        }
        self.table
            .join(&self.resolve_self_type(first), &self.resolve_self_type(second))
    }

    fn resolve_self_type(&self, name: &str) -> EcoString {
        if name == "SELF_TYPE" {
            self.current_class.clone()
        } else {
            name.into()
        }
    }

    /// A declared type is valid if it names a known class or `SELF_TYPE`.
    /// Positions where `SELF_TYPE` is banned check that separately, first.
    fn type_exists(&self, name: &str) -> bool {
        name == "SELF_TYPE" || self.table.has_class(name)
    }

    // --- reporting helpers ---

    fn error(&mut self, category: DiagnosticCategory, message: impl Into<EcoString>, span: Span) {
        self.report(Diagnostic::error(message, span).with_category(category));
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        let context = match &self.current_method {
            Some(method) => DiagnosticContext::method(self.current_class.clone(), method.clone()),
            None => DiagnosticContext::class(self.current_class.clone()),
        };
        self.diagnostics.push(diagnostic.with_context(context));
    }
}
