// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression parsing for Cool.
//!
//! This module contains all expression parsing methods extracted from the
//! main `Parser` implementation. Expression parsing handles:
//!
//! - Infix operators via Pratt parsing (`<-`, comparisons, arithmetic)
//! - Prefix operators (`not`, `isvoid`, `~`)
//! - Dispatch (`expr.method(args)`, `expr@Type.method(args)`, `method(args)`)
//! - Control constructs (`if`, `while`, `let`, `case`, blocks)
//! - Literals, `self`, `new`, parenthesised expressions

use crate::ast::{CaseBranch, Expression, Identifier, LetBinding};
use crate::source_analysis::TokenKind;
use ecow::EcoString;

use super::{Diagnostic, DiagnosticCategory, InfixOperator, Parser, infix_binding_power};

/// Operand binding power for `not`: looser than the comparisons, tighter
/// than assignment, so `not a < b` is `not (a < b)` and `x <- not y` works.
const NOT_OPERAND_POWER: u8 = 15;

/// Operand binding power for `isvoid`: tighter than the multiplicative
/// operators.
const ISVOID_OPERAND_POWER: u8 = 45;

/// Operand binding power for `~`: tightest of the prefix operators.
const NEGATE_OPERAND_POWER: u8 = 50;

/// Helper function for parsing integer literal text.
pub(super) fn parse_integer(text: &str) -> Result<i64, String> {
    text.parse::<i64>()
        .map_err(|_| format!("Integer literal '{text}' is out of range"))
}

impl Parser {
    // ========================================================================
    // Expression Parsing
    // ========================================================================

    /// Parses any expression.
    ///
    /// Entry point for expression parsing. Handles all precedence levels.
    pub(super) fn parse_expression(&mut self) -> Expression {
        self.parse_guarded(0)
    }

    /// Parses an expression with a minimum binding power, guarded against
    /// deep recursion.
    ///
    /// Uses `stacker::maybe_grow` to extend the stack on the heap if
    /// remaining stack space falls below 32 KiB (prevents stack overflow
    /// even under `AddressSanitizer` during fuzzing). The 256 KiB segment
    /// size is kept small because the nesting-depth guard caps recursion,
    /// so we never need many segments.
    ///
    /// All recursive descents come through here: nested constructs via
    /// [`Parser::parse_expression`], prefix operands and assignment values
    /// directly, so the nesting counter sees every level.
    fn parse_guarded(&mut self, min_bp: u8) -> Expression {
        stacker::maybe_grow(32 * 1024, 256 * 1024, || {
            if let Err(error) = self.enter_nesting(self.current_token().span()) {
                return error;
            }
            let result = self.parse_binding_power(min_bp);
            self.leave_nesting();
            result
        })
    }

    /// Pratt parsing for infix expressions.
    ///
    /// The `min_bp` parameter controls the minimum binding power required to
    /// continue, which is how precedence and associativity fall out of the
    /// table in [`infix_binding_power`].
    fn parse_binding_power(&mut self, min_bp: u8) -> Expression {
        let mut left = self.parse_prefix();

        loop {
            let Some((operator, power)) = infix_binding_power(self.current_kind()) else {
                break;
            };

            // Stop if this operator binds less tightly than our minimum.
            if power.left < min_bp {
                break;
            }

            self.advance();

            match operator {
                InfixOperator::Assign => {
                    let value = Box::new(self.parse_guarded(power.right));
                    let span = left.span().merge(value.span());
                    if let Expression::Identifier(target) = left {
                        left = Expression::Assignment {
                            target,
                            value,
                            span,
                        };
                    } else {
                        let message: EcoString = if matches!(left, Expression::SelfRef { .. }) {
                            "Cannot assign to 'self'".into()
                        } else {
                            "Assignment target must be an identifier".into()
                        };
                        self.diagnostics.push(
                            Diagnostic::error(message.clone(), left.span())
                                .with_category(DiagnosticCategory::Syntax),
                        );
                        left = Expression::Error { message, span };
                    }
                }
                InfixOperator::Binary(operator) => {
                    let right = self.parse_binding_power(power.right);
                    let span = left.span().merge(right.span());
                    left = Expression::BinaryOp {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                        span,
                    };
                }
            }
        }

        left
    }

    /// Parses the prefix operators (`not`, `isvoid`, `~`) or falls through
    /// to a postfix expression.
    fn parse_prefix(&mut self) -> Expression {
        match self.current_kind() {
            TokenKind::Not => {
                let start = self.current_token().span();
                self.advance();
                let operand = Box::new(self.parse_guarded(NOT_OPERAND_POWER));
                let span = start.merge(operand.span());
                Expression::Not { operand, span }
            }
            TokenKind::IsVoid => {
                let start = self.current_token().span();
                self.advance();
                let operand = Box::new(self.parse_guarded(ISVOID_OPERAND_POWER));
                let span = start.merge(operand.span());
                Expression::IsVoid { operand, span }
            }
            TokenKind::Tilde => {
                let start = self.current_token().span();
                self.advance();
                let operand = Box::new(self.parse_guarded(NEGATE_OPERAND_POWER));
                let span = start.merge(operand.span());
                Expression::Negate { operand, span }
            }
            _ => self.parse_postfix(),
        }
    }

    /// Parses a primary expression followed by a chain of dispatches, which
    /// bind tightest: `a.b().c()` and `a@T.b()` nest leftward.
    fn parse_postfix(&mut self) -> Expression {
        let mut receiver = self.parse_primary();

        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                let method = self.parse_object_identifier("Expected a method name after '.'");
                let arguments = self.parse_arguments();
                let span = receiver.span().merge(self.previous_span());
                receiver = Expression::Dispatch {
                    receiver: Some(Box::new(receiver)),
                    method,
                    arguments,
                    span,
                };
            } else if self.check(&TokenKind::At) {
                self.advance();
                let static_type = self.parse_type_name("Expected a type name after '@'");
                self.expect(&TokenKind::Dot, "Expected '.' after the static dispatch type");
                let method = self.parse_object_identifier("Expected a method name after '.'");
                let arguments = self.parse_arguments();
                let span = receiver.span().merge(self.previous_span());
                receiver = Expression::StaticDispatch {
                    receiver: Box::new(receiver),
                    static_type,
                    method,
                    arguments,
                    span,
                };
            } else {
                break;
            }
        }

        receiver
    }

    /// Parses a parenthesised, comma-separated argument list.
    fn parse_arguments(&mut self) -> Vec<Expression> {
        let mut arguments = Vec::new();
        if self
            .expect(&TokenKind::LeftParen, "Expected '(' to open the argument list")
            .is_none()
        {
            return arguments;
        }

        if !self.check(&TokenKind::RightParen) {
            loop {
                arguments.push(self.parse_expression());
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(
            &TokenKind::RightParen,
            "Expected ')' to close the argument list",
        );
        arguments
    }

    /// Parses a primary expression: literals, identifiers, `self`, control
    /// constructs, `new`, parentheses.
    fn parse_primary(&mut self) -> Expression {
        match self.current_kind() {
            TokenKind::Integer(_) => self.parse_integer_literal(),
            TokenKind::String(_) => self.parse_string_literal(),
            TokenKind::Bool(_) => self.parse_bool_literal(),
            TokenKind::Identifier(_) => self.parse_identifier_expression(),
            TokenKind::If => self.parse_conditional(),
            TokenKind::While => self.parse_while(),
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::Let => self.parse_let(),
            TokenKind::Case => self.parse_case(),
            TokenKind::New => self.parse_new(),
            TokenKind::LeftParen => self.parse_parenthesized(),

            // Lexical errors surface where an expression was expected.
            TokenKind::Error(message) => {
                let message = message.clone();
                let token = self.advance();
                let span = token.span();
                self.diagnostics.push(
                    Diagnostic::error(message.clone(), span)
                        .with_category(DiagnosticCategory::Syntax),
                );
                Expression::Error { message, span }
            }

            // Unexpected token - consume it to avoid getting stuck.
            _ => {
                let span = self.current_token().span();
                let message: EcoString =
                    format!("Expected an expression, found {}", self.current_kind()).into();
                self.diagnostics.push(
                    Diagnostic::error(message.clone(), span)
                        .with_category(DiagnosticCategory::Syntax),
                );
                if !self.is_at_end() {
                    self.advance();
                }
                Expression::Error { message, span }
            }
        }
    }

    // ------------------------------------------------------------------
    // Literals, identifiers, self
    // ------------------------------------------------------------------

    fn parse_integer_literal(&mut self) -> Expression {
        let token = self.advance();
        let span = token.span();
        let TokenKind::Integer(text) = token.into_kind() else {
            return Expression::Error {
                message: "expected an integer literal".into(),
                span,
            };
        };
        match parse_integer(&text) {
            Ok(value) => Expression::IntLiteral { value, span },
            Err(message) => {
                let message: EcoString = message.into();
                self.diagnostics.push(
                    Diagnostic::error(message.clone(), span)
                        .with_category(DiagnosticCategory::Syntax),
                );
                Expression::Error { message, span }
            }
        }
    }

    fn parse_string_literal(&mut self) -> Expression {
        let token = self.advance();
        let span = token.span();
        let TokenKind::String(value) = token.into_kind() else {
            return Expression::Error {
                message: "expected a string literal".into(),
                span,
            };
        };
        Expression::StringLiteral { value, span }
    }

    fn parse_bool_literal(&mut self) -> Expression {
        let token = self.advance();
        let span = token.span();
        let TokenKind::Bool(value) = token.into_kind() else {
            return Expression::Error {
                message: "expected a boolean literal".into(),
                span,
            };
        };
        Expression::BoolLiteral { value, span }
    }

    /// Parses `self`, an implicit-self call `name(args)`, or a plain
    /// identifier reference.
    fn parse_identifier_expression(&mut self) -> Expression {
        let token = self.advance();
        let span = token.span();
        let TokenKind::Identifier(name) = token.into_kind() else {
            return Expression::Error {
                message: "expected an identifier".into(),
                span,
            };
        };

        if name == "self" {
            return Expression::SelfRef { span };
        }

        if self.check(&TokenKind::LeftParen) {
            let arguments = self.parse_arguments();
            let call_span = span.merge(self.previous_span());
            return Expression::Dispatch {
                receiver: None,
                method: Identifier::new(name, span),
                arguments,
                span: call_span,
            };
        }

        Expression::Identifier(Identifier::new(name, span))
    }

    // ------------------------------------------------------------------
    // Control constructs
    // ------------------------------------------------------------------

    fn parse_conditional(&mut self) -> Expression {
        let start = self.current_token().span();
        self.advance(); // `if`
        let condition = Box::new(self.parse_expression());
        self.expect(&TokenKind::Then, "Expected 'then' after the condition");
        let then_branch = Box::new(self.parse_expression());
        self.expect(&TokenKind::Else, "Expected 'else' in the conditional");
        let else_branch = Box::new(self.parse_expression());
        let end = self
            .expect(&TokenKind::Fi, "Expected 'fi' to close the conditional")
            .map_or_else(|| else_branch.span(), |token| token.span());

        Expression::Conditional {
            condition,
            then_branch,
            else_branch,
            span: start.merge(end),
        }
    }

    fn parse_while(&mut self) -> Expression {
        let start = self.current_token().span();
        self.advance(); // `while`
        let condition = Box::new(self.parse_expression());
        self.expect(&TokenKind::Loop, "Expected 'loop' after the loop condition");
        let body = Box::new(self.parse_expression());
        let end = self
            .expect(&TokenKind::Pool, "Expected 'pool' to close the loop")
            .map_or_else(|| body.span(), |token| token.span());

        Expression::While {
            condition,
            body,
            span: start.merge(end),
        }
    }

    fn parse_block(&mut self) -> Expression {
        let start = self.current_token().span();
        self.advance(); // `{`

        let mut body = Vec::new();
        while !self.is_at_end() && !self.check(&TokenKind::RightBrace) {
            body.push(self.parse_expression());
            if !self.match_token(&TokenKind::Semicolon) {
                self.error("Expected ';' after the expression in a block");
                break;
            }
        }

        let end = self
            .expect(&TokenKind::RightBrace, "Expected '}' to close the block")
            .map_or_else(|| self.previous_span(), |token| token.span());
        let span = start.merge(end);

        if body.is_empty() {
            let message: EcoString = "A block must contain at least one expression".into();
            self.diagnostics.push(
                Diagnostic::error(message.clone(), span).with_category(DiagnosticCategory::Syntax),
            );
            return Expression::Error { message, span };
        }

        Expression::Block { body, span }
    }

    fn parse_let(&mut self) -> Expression {
        let start = self.current_token().span();
        self.advance(); // `let`

        let mut bindings = Vec::new();
        loop {
            let name = self.parse_object_identifier("Expected a name to bind in 'let'");
            self.expect(&TokenKind::Colon, "Expected ':' after the bound name");
            let declared_type = self.parse_type_name("Expected a type for the binding");
            let initializer = if self.match_token(&TokenKind::Assign) {
                Some(self.parse_expression())
            } else {
                None
            };
            let binding_end = initializer
                .as_ref()
                .map_or(declared_type.span, Expression::span);
            bindings.push(LetBinding {
                span: name.span.merge(binding_end),
                name,
                declared_type,
                initializer,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::In, "Expected 'in' after the let bindings");
        // The body extends as far right as possible.
        let body = Box::new(self.parse_expression());
        let span = start.merge(body.span());

        Expression::Let {
            bindings,
            body,
            span,
        }
    }

    fn parse_case(&mut self) -> Expression {
        let start = self.current_token().span();
        self.advance(); // `case`

        let scrutinee = Box::new(self.parse_expression());
        self.expect(&TokenKind::Of, "Expected 'of' after the case scrutinee");

        let mut branches = Vec::new();
        while !self.is_at_end() && !self.check(&TokenKind::Esac) {
            let name = self.parse_object_identifier("Expected a name in the case branch");
            self.expect(&TokenKind::Colon, "Expected ':' after the branch name");
            let declared_type = self.parse_type_name("Expected a type in the case branch");
            self.expect(&TokenKind::FatArrow, "Expected '=>' after the branch type");
            let body = self.parse_expression();
            self.expect(&TokenKind::Semicolon, "Expected ';' after the case branch");
            branches.push(CaseBranch {
                span: name.span.merge(body.span()),
                name,
                declared_type,
                body,
            });
        }

        let end = self
            .expect(&TokenKind::Esac, "Expected 'esac' to close the case")
            .map_or_else(|| self.previous_span(), |token| token.span());
        let span = start.merge(end);

        if branches.is_empty() {
            let message: EcoString = "A case expression must have at least one branch".into();
            self.diagnostics.push(
                Diagnostic::error(message.clone(), span).with_category(DiagnosticCategory::Syntax),
            );
            return Expression::Error { message, span };
        }

        Expression::Case {
            scrutinee,
            branches,
            span,
        }
    }

    fn parse_new(&mut self) -> Expression {
        let start = self.current_token().span();
        self.advance(); // `new`
        let class_name = self.parse_type_name("Expected a class name after 'new'");

        Expression::New {
            span: start.merge(class_name.span),
            class_name,
        }
    }

    /// Parses `( expression )`. The parentheses only group; no node is
    /// recorded for them.
    fn parse_parenthesized(&mut self) -> Expression {
        self.advance(); // `(`
        let inner = self.parse_expression();
        self.expect(
            &TokenKind::RightParen,
            "Expected ')' to close the parenthesised expression",
        );
        inner
    }
}
