// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Declaration parsing for Cool.
//!
//! This module handles the declaration layer of the grammar:
//! - Programs (a sequence of `class ... ;` definitions)
//! - Class definitions with an optional `inherits` clause
//! - Features: methods (`name(formals) : Type { body }`) and attributes
//!   (`name : Type [<- init]`)

use crate::ast::{
    AttributeDefinition, ClassDefinition, Feature, Formal, Identifier, MethodDefinition, Program,
    TypeName,
};
use crate::source_analysis::TokenKind;

use super::{Diagnostic, DiagnosticCategory, Parser};

impl Parser {
    // ========================================================================
    // Program Parsing
    // ========================================================================

    /// Parses a whole program: one or more class definitions, each terminated
    /// by `;`.
    pub(super) fn parse_program(&mut self) -> Program {
        let start = self.current_token().span();
        let mut classes = Vec::new();

        while !self.is_at_end() {
            // Surface lexical errors that sit between definitions.
            if let TokenKind::Error(message) = self.current_kind() {
                let message = message.clone();
                let span = self.current_token().span();
                self.diagnostics.push(
                    Diagnostic::error(message, span).with_category(DiagnosticCategory::Syntax),
                );
                self.advance();
                continue;
            }

            if !self.check(&TokenKind::Class) {
                self.error("Expected 'class' to begin a class definition");
                self.skip_to_class_boundary();
                continue;
            }

            classes.push(self.parse_class_definition());

            if !self.match_token(&TokenKind::Semicolon) {
                self.error("Expected ';' after class definition");
                self.skip_to_class_boundary();
            }
        }

        let end = classes.last().map_or(start, |class| class.span);
        Program::new(classes, start.merge(end))
    }

    /// Advances to the next `class` keyword (or the end of input) so one
    /// malformed definition cannot cascade into the rest of the program.
    fn skip_to_class_boundary(&mut self) {
        while !self.is_at_end() && !self.check(&TokenKind::Class) {
            self.advance();
        }
    }

    // ========================================================================
    // Class Definition Parsing
    // ========================================================================

    /// Parses a class definition.
    ///
    /// Syntax:
    /// ```text
    /// class Name [inherits Parent] {
    ///     attribute : Type [<- init];
    ///     method(formals) : Type { body };
    /// }
    /// ```
    ///
    /// The caller has already checked that the current token is `class`.
    pub(super) fn parse_class_definition(&mut self) -> ClassDefinition {
        let start = self.current_token().span();
        self.advance(); // `class`

        let name = self.parse_type_name("Expected a class name after 'class'");
        let parent = if self.match_token(&TokenKind::Inherits) {
            Some(self.parse_type_name("Expected a parent class name after 'inherits'"))
        } else {
            None
        };

        self.expect(&TokenKind::LeftBrace, "Expected '{' to open the class body");

        let mut features = Vec::new();
        while !self.is_at_end()
            && !self.check(&TokenKind::RightBrace)
            && !self.check(&TokenKind::Class)
        {
            match self.parse_feature() {
                Some(feature) => {
                    features.push(feature);
                    if !self.match_token(&TokenKind::Semicolon) {
                        self.error("Expected ';' after the feature");
                        self.synchronize();
                        self.match_token(&TokenKind::Semicolon);
                    }
                }
                None => {
                    self.synchronize();
                    self.match_token(&TokenKind::Semicolon);
                }
            }
        }

        let end = self
            .expect(&TokenKind::RightBrace, "Expected '}' to close the class body")
            .map_or_else(|| self.previous_span(), |token| token.span());

        ClassDefinition {
            name,
            parent,
            features,
            span: start.merge(end),
        }
    }

    // ========================================================================
    // Feature Parsing
    // ========================================================================

    /// Parses one feature. Returns `None` (without consuming the offending
    /// token) when no feature can start here; the caller synchronises.
    fn parse_feature(&mut self) -> Option<Feature> {
        if !matches!(self.current_kind(), TokenKind::Identifier(_)) {
            self.error("Expected a feature name");
            return None;
        }
        let name = self.parse_object_identifier("Expected a feature name");

        if self.check(&TokenKind::LeftParen) {
            Some(Feature::Method(self.parse_method_definition(name)))
        } else if self.check(&TokenKind::Colon) {
            Some(Feature::Attribute(self.parse_attribute_definition(name)))
        } else {
            self.error("Expected '(' for a method or ':' for an attribute after the feature name");
            None
        }
    }

    /// Parses a method definition. The name has been consumed; the current
    /// token is `(`.
    fn parse_method_definition(&mut self, name: Identifier) -> MethodDefinition {
        let formals = self.parse_formals();
        self.expect(
            &TokenKind::Colon,
            "Expected ':' before the method's return type",
        );
        let return_type = self.parse_type_name("Expected the method's return type");
        self.expect(&TokenKind::LeftBrace, "Expected '{' to open the method body");
        let body = self.parse_expression();
        let end = self
            .expect(&TokenKind::RightBrace, "Expected '}' to close the method body")
            .map_or_else(|| body.span(), |token| token.span());

        MethodDefinition {
            span: name.span.merge(end),
            name,
            formals,
            return_type,
            body,
        }
    }

    /// Parses a comma-separated formal parameter list, including the
    /// surrounding parentheses.
    fn parse_formals(&mut self) -> Vec<Formal> {
        let mut formals = Vec::new();
        if self
            .expect(&TokenKind::LeftParen, "Expected '(' after the method name")
            .is_none()
        {
            return formals;
        }

        if !self.check(&TokenKind::RightParen) {
            loop {
                let name = self.parse_object_identifier("Expected a formal parameter name");
                self.expect(
                    &TokenKind::Colon,
                    "Expected ':' after the formal parameter name",
                );
                let declared_type = self.parse_type_name("Expected a type for the formal parameter");
                formals.push(Formal {
                    span: name.span.merge(declared_type.span),
                    name,
                    declared_type,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(
            &TokenKind::RightParen,
            "Expected ')' after the formal parameters",
        );
        formals
    }

    /// Parses an attribute definition. The name has been consumed; the
    /// current token is `:`.
    fn parse_attribute_definition(&mut self, name: Identifier) -> AttributeDefinition {
        self.advance(); // `:`
        let declared_type = self.parse_type_name("Expected a type for the attribute");
        let initializer = if self.match_token(&TokenKind::Assign) {
            Some(self.parse_expression())
        } else {
            None
        };
        let end = initializer
            .as_ref()
            .map_or(declared_type.span, crate::ast::Expression::span);

        AttributeDefinition {
            span: name.span.merge(end),
            name,
            declared_type,
            initializer,
        }
    }

    // ========================================================================
    // Identifier Helpers
    // ========================================================================

    /// Parses an object identifier (leading lowercase), reporting an error
    /// and returning a sentinel if not found.
    pub(super) fn parse_object_identifier(&mut self, error_message: &str) -> Identifier {
        if let TokenKind::Identifier(name) = self.current_kind() {
            let name = name.clone();
            let span = self.current_token().span();
            self.advance();
            Identifier::new(name, span)
        } else {
            let span = self.current_token().span();
            self.error(error_message);
            Identifier::new("error", span)
        }
    }

    /// Parses a type identifier (leading uppercase), reporting an error and
    /// returning a sentinel if not found.
    pub(super) fn parse_type_name(&mut self, error_message: &str) -> TypeName {
        if let TokenKind::TypeName(name) = self.current_kind() {
            let name = name.clone();
            let span = self.current_token().span();
            self.advance();
            TypeName::new(name, span)
        } else {
            let span = self.current_token().span();
            self.error(error_message);
            TypeName::new("Error", span)
        }
    }
}
