// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Abstract Syntax Tree (AST) definitions for Cool.
//!
//! The AST represents the structure of a Cool program after parsing. Every
//! node carries a [`Span`] for diagnostics. Expressions form a single closed
//! enum so the type checker and evaluator can match exhaustively; adding a
//! form is a compile error until every consumer handles it.
//!
//! The parser recovers from malformed input by producing
//! [`Expression::Error`] nodes rather than failing, so later stages must
//! expect them: the type checker assigns them the root type, and the
//! evaluator refuses to execute them.
//!
//! # Example
//!
//! ```ignore
//! // Source: x <- 2 + 3
//! Expression::Assignment {
//!     target: Identifier { name: "x".into(), span: ... },
//!     value: Box::new(Expression::BinaryOp {
//!         operator: BinaryOperator::Add,
//!         left: Box::new(Expression::IntLiteral { value: 2, span: ... }),
//!         right: Box::new(Expression::IntLiteral { value: 3, span: ... }),
//!         span: ...
//!     }),
//!     span: ...
//! }
//! ```

use crate::source_analysis::Span;
use ecow::EcoString;

/// Top-level container for a Cool program: an ordered list of class
/// definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The classes in this program, in source order.
    pub classes: Vec<ClassDefinition>,
    /// Source location spanning the entire program.
    pub span: Span,
}

impl Program {
    /// Creates a new program.
    #[must_use]
    pub fn new(classes: Vec<ClassDefinition>, span: Span) -> Self {
        Self { classes, span }
    }
}

/// A class definition.
///
/// `class Name inherits Parent { features }`. The parent clause is
/// optional in source; an absent parent means the class inherits `Object`,
/// resolved when the class table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    /// The class name.
    pub name: TypeName,
    /// The named parent, if an `inherits` clause was written.
    pub parent: Option<TypeName>,
    /// Attributes and methods, in source order.
    pub features: Vec<Feature>,
    /// Source location of the entire definition.
    pub span: Span,
}

impl ClassDefinition {
    /// The class's methods, in source order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDefinition> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Method(method) => Some(method),
            Feature::Attribute(_) => None,
        })
    }

    /// The class's attributes, in source order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.features.iter().filter_map(|feature| match feature {
            Feature::Attribute(attribute) => Some(attribute),
            Feature::Method(_) => None,
        })
    }
}

/// A class feature: a method or an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// A method definition.
    Method(MethodDefinition),
    /// An attribute definition.
    Attribute(AttributeDefinition),
}

impl Feature {
    /// Returns the span of this feature.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Method(method) => method.span,
            Self::Attribute(attribute) => attribute.span,
        }
    }

    /// Returns the feature's name.
    #[must_use]
    pub const fn name(&self) -> &EcoString {
        match self {
            Self::Method(method) => &method.name.name,
            Self::Attribute(attribute) => &attribute.name.name,
        }
    }
}

/// A method definition: `name(formals) : ReturnType { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// The method name.
    pub name: Identifier,
    /// The formal parameters, in declaration order.
    pub formals: Vec<Formal>,
    /// The declared return type (may be `SELF_TYPE`).
    pub return_type: TypeName,
    /// The method body.
    pub body: Expression,
    /// Source location of the entire definition.
    pub span: Span,
}

/// An attribute definition: `name : Type [<- initializer]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    /// The attribute name.
    pub name: Identifier,
    /// The declared type.
    pub declared_type: TypeName,
    /// The initialiser expression, if one was written.
    pub initializer: Option<Expression>,
    /// Source location of the entire definition.
    pub span: Span,
}

/// A formal parameter: `name : Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    /// The parameter name.
    pub name: Identifier,
    /// The declared type.
    pub declared_type: TypeName,
    /// Source location.
    pub span: Span,
}

/// An object identifier (variable, attribute or method name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// The name.
    pub name: EcoString,
    /// Source location.
    pub span: Span,
}

impl Identifier {
    /// Creates a new identifier.
    #[must_use]
    pub fn new(name: impl Into<EcoString>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A type identifier (class name or `SELF_TYPE`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// The name.
    pub name: EcoString,
    /// Source location.
    pub span: Span,
}

impl TypeName {
    /// Creates a new type name.
    #[must_use]
    pub fn new(name: impl Into<EcoString>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Returns true if this names `SELF_TYPE`.
    #[must_use]
    pub fn is_self_type(&self) -> bool {
        self.name == "SELF_TYPE"
    }
}

/// A single binding in a `let` expression: `name : Type [<- initializer]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    /// The bound name.
    pub name: Identifier,
    /// The declared type.
    pub declared_type: TypeName,
    /// The initialiser expression; an absent initialiser binds void.
    pub initializer: Option<Expression>,
    /// Source location of this binding.
    pub span: Span,
}

/// A single branch in a `case` expression: `name : Type => body`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    /// The name bound to the scrutinee within the branch body.
    pub name: Identifier,
    /// The branch's guard type.
    pub declared_type: TypeName,
    /// The branch body.
    pub body: Expression,
    /// Source location of this branch.
    pub span: Span,
}

/// A Cool expression.
///
/// Cool is expression-oriented: method bodies, initialisers and control
/// constructs are all expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An integer literal.
    IntLiteral {
        /// The literal's value.
        value: i64,
        /// Source location.
        span: Span,
    },

    /// A string literal, with escape sequences already decoded.
    StringLiteral {
        /// The literal's value.
        value: EcoString,
        /// Source location.
        span: Span,
    },

    /// A boolean literal.
    BoolLiteral {
        /// The literal's value.
        value: bool,
        /// Source location.
        span: Span,
    },

    /// The current receiver, `self`.
    SelfRef {
        /// Source location.
        span: Span,
    },

    /// A variable, formal or attribute reference.
    Identifier(Identifier),

    /// An assignment: `target <- value`.
    Assignment {
        /// The identifier being assigned to.
        target: Identifier,
        /// The value being assigned.
        value: Box<Expression>,
        /// Source location of the entire assignment.
        span: Span,
    },

    /// A dynamic dispatch: `receiver.method(arguments)`.
    ///
    /// A `None` receiver is an implicit-self call, `method(arguments)`.
    Dispatch {
        /// The receiver, or `None` for implicit self.
        receiver: Option<Box<Expression>>,
        /// The method name.
        method: Identifier,
        /// The arguments, in source order.
        arguments: Vec<Expression>,
        /// Source location of the entire dispatch.
        span: Span,
    },

    /// A static dispatch: `receiver@Type.method(arguments)`.
    ///
    /// Method lookup starts at the named ancestor instead of the receiver's
    /// dynamic class.
    StaticDispatch {
        /// The receiver.
        receiver: Box<Expression>,
        /// The named ancestor where lookup starts.
        static_type: TypeName,
        /// The method name.
        method: Identifier,
        /// The arguments, in source order.
        arguments: Vec<Expression>,
        /// Source location of the entire dispatch.
        span: Span,
    },

    /// A conditional: `if condition then then_branch else else_branch fi`.
    Conditional {
        /// The condition.
        condition: Box<Expression>,
        /// The branch taken when the condition is true.
        then_branch: Box<Expression>,
        /// The branch taken when the condition is false.
        else_branch: Box<Expression>,
        /// Source location of the entire conditional.
        span: Span,
    },

    /// A loop: `while condition loop body pool`.
    While {
        /// The loop condition.
        condition: Box<Expression>,
        /// The loop body.
        body: Box<Expression>,
        /// Source location of the entire loop.
        span: Span,
    },

    /// A block: `{ expr; expr; ... }`. Its value is the last expression's.
    Block {
        /// The expressions, in order. Never empty in a well-formed program.
        body: Vec<Expression>,
        /// Source location including braces.
        span: Span,
    },

    /// A let: `let bindings in body`.
    Let {
        /// The bindings, introduced left to right.
        bindings: Vec<LetBinding>,
        /// The body, evaluated with all bindings in scope.
        body: Box<Expression>,
        /// Source location of the entire let.
        span: Span,
    },

    /// A case analysis: `case scrutinee of branches esac`.
    Case {
        /// The expression being analysed.
        scrutinee: Box<Expression>,
        /// The branches, in source order.
        branches: Vec<CaseBranch>,
        /// Source location of the entire case.
        span: Span,
    },

    /// An instantiation: `new Type`.
    New {
        /// The class to instantiate (may be `SELF_TYPE`).
        class_name: TypeName,
        /// Source location.
        span: Span,
    },

    /// A void test: `isvoid operand`.
    IsVoid {
        /// The tested expression.
        operand: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// Integer negation: `~operand`.
    Negate {
        /// The negated expression.
        operand: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// Boolean complement: `not operand`.
    Not {
        /// The complemented expression.
        operand: Box<Expression>,
        /// Source location.
        span: Span,
    },

    /// A binary operation: arithmetic, ordering or equality.
    BinaryOp {
        /// The operator.
        operator: BinaryOperator,
        /// The left operand.
        left: Box<Expression>,
        /// The right operand.
        right: Box<Expression>,
        /// Source location of the entire operation.
        span: Span,
    },

    /// An error node for unparseable code.
    ///
    /// Allows the parser to recover and keep producing diagnostics.
    Error {
        /// A description of what went wrong.
        message: EcoString,
        /// Source location of the erroneous code.
        span: Span,
    },
}

impl Expression {
    /// Returns the span of this expression.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::IntLiteral { span, .. }
            | Self::StringLiteral { span, .. }
            | Self::BoolLiteral { span, .. }
            | Self::SelfRef { span }
            | Self::Assignment { span, .. }
            | Self::Dispatch { span, .. }
            | Self::StaticDispatch { span, .. }
            | Self::Conditional { span, .. }
            | Self::While { span, .. }
            | Self::Block { span, .. }
            | Self::Let { span, .. }
            | Self::Case { span, .. }
            | Self::New { span, .. }
            | Self::IsVoid { span, .. }
            | Self::Negate { span, .. }
            | Self::Not { span, .. }
            | Self::BinaryOp { span, .. }
            | Self::Error { span, .. } => *span,
            Self::Identifier(id) => id.span,
        }
    }

    /// Returns true if this expression is an error node.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `=`
    Equal,
}

impl BinaryOperator {
    /// The operator's source spelling.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Equal => "=",
        }
    }

    /// Returns true for `+`, `-`, `*` and `/`, which require `Int` operands
    /// and produce `Int`.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Subtract | Self::Multiply | Self::Divide)
    }

    /// Returns true for `<` and `<=`, which require `Int` operands and
    /// produce `Bool`. Equality (`=`) has its own rule.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::LessThan | Self::LessThanOrEqual)
    }
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_creation() {
        let span = Span::new(0, 10);
        let program = Program::new(Vec::new(), span);
        assert!(program.classes.is_empty());
        assert_eq!(program.span, span);
    }

    #[test]
    fn identifier_and_type_name_creation() {
        let id = Identifier::new("count", Span::new(0, 5));
        assert_eq!(id.name, "count");
        assert_eq!(id.span, Span::new(0, 5));

        let ty = TypeName::new("Counter", Span::new(10, 17));
        assert_eq!(ty.name, "Counter");
        assert!(!ty.is_self_type());
        assert!(TypeName::new("SELF_TYPE", Span::new(0, 9)).is_self_type());
    }

    #[test]
    fn feature_accessors() {
        let method = Feature::Method(MethodDefinition {
            name: Identifier::new("main", Span::new(0, 4)),
            formals: Vec::new(),
            return_type: TypeName::new("Int", Span::new(8, 11)),
            body: Expression::IntLiteral {
                value: 0,
                span: Span::new(14, 15),
            },
            span: Span::new(0, 17),
        });
        assert_eq!(method.name(), "main");
        assert_eq!(method.span(), Span::new(0, 17));

        let attribute = Feature::Attribute(AttributeDefinition {
            name: Identifier::new("count", Span::new(0, 5)),
            declared_type: TypeName::new("Int", Span::new(8, 11)),
            initializer: None,
            span: Span::new(0, 11),
        });
        assert_eq!(attribute.name(), "count");
        assert_eq!(attribute.span(), Span::new(0, 11));
    }

    #[test]
    fn class_feature_iterators() {
        let class = ClassDefinition {
            name: TypeName::new("Counter", Span::new(6, 13)),
            parent: None,
            features: vec![
                Feature::Attribute(AttributeDefinition {
                    name: Identifier::new("count", Span::new(16, 21)),
                    declared_type: TypeName::new("Int", Span::new(24, 27)),
                    initializer: None,
                    span: Span::new(16, 27),
                }),
                Feature::Method(MethodDefinition {
                    name: Identifier::new("get_count", Span::new(30, 39)),
                    formals: Vec::new(),
                    return_type: TypeName::new("Int", Span::new(44, 47)),
                    body: Expression::Identifier(Identifier::new("count", Span::new(50, 55))),
                    span: Span::new(30, 57),
                }),
            ],
            span: Span::new(0, 60),
        };
        assert_eq!(class.methods().count(), 1);
        assert_eq!(class.attributes().count(), 1);
        assert_eq!(class.methods().next().map(|m| m.name.name.as_str()), Some("get_count"));
    }

    #[test]
    fn expression_span() {
        let span = Span::new(10, 20);
        let expr = Expression::IntLiteral { value: 42, span };
        assert_eq!(expr.span(), span);

        let expr = Expression::Identifier(Identifier::new("x", span));
        assert_eq!(expr.span(), span);

        let expr = Expression::SelfRef { span };
        assert_eq!(expr.span(), span);
    }

    #[test]
    fn expression_is_error() {
        let error = Expression::Error {
            message: "expected an expression".into(),
            span: Span::new(0, 5),
        };
        assert!(error.is_error());

        let literal = Expression::BoolLiteral {
            value: true,
            span: Span::new(0, 4),
        };
        assert!(!literal.is_error());
    }

    #[test]
    fn binary_operator_classification() {
        assert!(BinaryOperator::Add.is_arithmetic());
        assert!(BinaryOperator::Divide.is_arithmetic());
        assert!(!BinaryOperator::LessThan.is_arithmetic());

        assert!(BinaryOperator::LessThan.is_ordering());
        assert!(BinaryOperator::LessThanOrEqual.is_ordering());
        assert!(!BinaryOperator::Equal.is_ordering());
        assert!(!BinaryOperator::Equal.is_arithmetic());

        assert_eq!(BinaryOperator::LessThanOrEqual.symbol(), "<=");
        assert_eq!(BinaryOperator::Multiply.to_string(), "*");
    }
}
