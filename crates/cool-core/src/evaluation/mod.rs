// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Tree-walking evaluation of Cool programs.
//!
//! The [`Evaluator`] executes a parsed program directly from its AST,
//! using the [`ClassTable`] for inheritance queries and attribute layouts.
//! Execution starts by instantiating `Main` (running its attribute
//! initialisers) and dispatching `main` on it.
//!
//! Unlike the static stages, which accumulate diagnostics, a runtime error
//! is fatal: evaluation stops and the [`RuntimeError`] is returned.
//! Input and output are injectable, so tests capture what `out_string` and
//! friends produce instead of touching the process's stdio.

mod builtins;
mod environment;
mod error;
mod value;

pub use error::RuntimeError;
pub use value::{ObjectInstance, Value};

use crate::ast::{
    BinaryOperator, CaseBranch, ClassDefinition, Expression, Identifier, LetBinding,
    MethodDefinition, Program, TypeName,
};
use crate::semantic_analysis::{ClassTable, MethodSignature};
use ecow::EcoString;
use environment::Environment;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Maximum number of nested activations (method calls and instantiations)
/// before evaluation is abandoned.
///
/// Recursion in the evaluated program becomes Rust recursion through
/// [`Evaluator::eval`], so the limit is enforced explicitly;
/// `stacker::maybe_grow` keeps the native stack safe within it.
const MAX_CALL_DEPTH: usize = 10_000;

/// Evaluates a program, starting from `Main.main()`.
///
/// Uses the process's stdin and stdout for the I/O built-ins. To capture
/// or supply I/O, construct an [`Evaluator`] directly.
///
/// # Errors
///
/// Returns [`RuntimeError`] if the program has no entry point or if
/// evaluation raises a dynamic error (dispatch on void, unmatched `case`,
/// division by zero, `abort`, and so on).
///
/// # Example
///
/// ```
/// use cool_core::source_analysis::{lex_with_eof, parse};
/// use cool_core::semantic_analysis::analyse;
/// use cool_core::evaluation::{evaluate, Value};
///
/// let (program, _) = parse(lex_with_eof("class Main { main() : Int { 2 + 2 }; };"));
/// let analysis = analyse(&program);
/// let value = evaluate(&program, &analysis.class_table)?;
/// assert_eq!(value, Value::Int(4));
/// # Ok::<(), cool_core::evaluation::RuntimeError>(())
/// ```
pub fn evaluate(program: &Program, class_table: &ClassTable) -> Result<Value, RuntimeError> {
    let mut evaluator = Evaluator::new(program, class_table);
    evaluator.run()
}

/// A method resolved for dispatch: either user-defined (with an AST body)
/// or one of the built-ins, which only have signatures.
enum ResolvedMethod<'p> {
    User(&'p MethodDefinition),
    Builtin(&'p MethodSignature),
}

/// Executes one program.
///
/// Holds the program's class definitions, the class table, the injectable
/// I/O handles, and the call-depth counter. Each [`Evaluator::run`] call
/// replays the program from a fresh `Main`.
pub struct Evaluator<'p> {
    class_table: &'p ClassTable,
    class_defs: HashMap<EcoString, &'p ClassDefinition>,
    output: Box<dyn Write + 'p>,
    input: Box<dyn BufRead + 'p>,
    call_depth: usize,
}

impl<'p> Evaluator<'p> {
    /// Creates an evaluator over a program and its class table, wired to
    /// the process's stdin and stdout.
    ///
    /// Duplicate class definitions keep the first occurrence, matching the
    /// class table's behaviour.
    #[must_use]
    pub fn new(program: &'p Program, class_table: &'p ClassTable) -> Self {
        let mut class_defs: HashMap<EcoString, &'p ClassDefinition> = HashMap::new();
        for class in &program.classes {
            class_defs.entry(class.name.name.clone()).or_insert(class);
        }
        Self {
            class_table,
            class_defs,
            output: Box::new(io::stdout()),
            input: Box::new(io::stdin().lock()),
            call_depth: 0,
        }
    }

    /// Redirects the output written by `out_string` and `out_int`.
    #[must_use]
    pub fn with_output(mut self, output: Box<dyn Write + 'p>) -> Self {
        self.output = output;
        self
    }

    /// Supplies the input read by `in_string` and `in_int`.
    #[must_use]
    pub fn with_input(mut self, input: Box<dyn BufRead + 'p>) -> Self {
        self.input = input;
        self
    }

    /// Instantiates `Main` and dispatches `main` on it, returning the
    /// value of the method body.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] for a missing entry point or any dynamic
    /// error raised during evaluation.
    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        if !self.class_defs.contains_key("Main") {
            return Err(RuntimeError::MissingMainClass);
        }
        if self.find_user_method("Main", "main").is_none() {
            return Err(RuntimeError::MissingMainMethod);
        }
        let main_object = self.instantiate("Main")?;
        let mut env = Environment::new();
        self.dispatch(main_object, "main", &[], &mut env, None)
    }

    // --- expression evaluation ---

    fn eval(
        &mut self,
        expression: &Expression,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        // Deep expression nesting recurses through here; grow the stack
        // on the heap rather than overflow.
        stacker::maybe_grow(32 * 1024, 256 * 1024, || self.eval_inner(expression, env))
    }

    fn eval_inner(
        &mut self,
        expression: &Expression,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        match expression {
            Expression::IntLiteral { value, .. } => Ok(Value::Int(*value)),
            Expression::StringLiteral { value, .. } => Ok(Value::Str(value.clone())),
            Expression::BoolLiteral { value, .. } => Ok(Value::Bool(*value)),
            Expression::SelfRef { .. } => Self::self_value(env),
            Expression::Identifier(identifier) => self.eval_identifier(identifier, env),
            Expression::Assignment { target, value, .. } => {
                self.eval_assignment(target, value, env)
            }
            Expression::Dispatch {
                receiver,
                method,
                arguments,
                ..
            } => {
                let receiver_value = match receiver.as_deref() {
                    Some(expression) => self.eval(expression, env)?,
                    None => Self::self_value(env)?,
                };
                self.dispatch(receiver_value, &method.name, arguments, env, None)
            }
            Expression::StaticDispatch {
                receiver,
                static_type,
                method,
                arguments,
                ..
            } => {
                let receiver_value = self.eval(receiver, env)?;
                self.dispatch(
                    receiver_value,
                    &method.name,
                    arguments,
                    env,
                    Some(static_type.name.as_str()),
                )
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if Self::expect_bool(&self.eval(condition, env)?)? {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }
            Expression::While {
                condition, body, ..
            } => {
                while Self::expect_bool(&self.eval(condition, env)?)? {
                    self.eval(body, env)?;
                }
                Ok(Value::Void)
            }
            Expression::Block { body, .. } => {
                let mut result = Value::Void;
                for expression in body {
                    result = self.eval(expression, env)?;
                }
                Ok(result)
            }
            Expression::Let { bindings, body, .. } => self.eval_let(bindings, body, env),
            Expression::Case {
                scrutinee, branches, ..
            } => self.eval_case(scrutinee, branches, env),
            Expression::New { class_name, .. } => self.eval_new(class_name, env),
            Expression::IsVoid { operand, .. } => {
                let value = self.eval(operand, env)?;
                Ok(Value::Bool(value.is_void()))
            }
            Expression::Negate { operand, .. } => {
                let value = Self::expect_int(&self.eval(operand, env)?)?;
                value
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::ArithmeticOverflow {
                        operation: "~".into(),
                    })
            }
            Expression::Not { operand, .. } => {
                let value = Self::expect_bool(&self.eval(operand, env)?)?;
                Ok(Value::Bool(!value))
            }
            Expression::BinaryOp {
                operator,
                left,
                right,
                ..
            } => self.eval_binary(*operator, left, right, env),
            Expression::Error { .. } => Err(RuntimeError::InvalidExpression),
        }
    }

    /// Reads a name: the receiver's attribute table first when the name is
    /// a known attribute, then the frame stack innermost outward.
    fn eval_identifier(
        &mut self,
        identifier: &Identifier,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        if let Some(receiver) = Self::receiver_in(env) {
            if let Some(value) = receiver.get_attribute(&identifier.name) {
                return Ok(value);
            }
        }
        env.get(&identifier.name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: identifier.name.clone(),
            })
    }

    /// Writes a name, mirroring the read order: a known attribute slot
    /// first, then the innermost frame that binds the name. The assigned
    /// value is the expression's own value.
    fn eval_assignment(
        &mut self,
        target: &Identifier,
        value_expression: &Expression,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        let value = self.eval(value_expression, env)?;
        if let Some(receiver) = Self::receiver_in(env) {
            if receiver.assign_attribute(&target.name, value.clone()) {
                return Ok(value);
            }
        }
        if env.assign(&target.name, value.clone()) {
            return Ok(value);
        }
        Err(RuntimeError::UndefinedVariable {
            name: target.name.clone(),
        })
    }

    fn eval_binary(
        &mut self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        let left_value = self.eval(left, env)?;
        let right_value = self.eval(right, env)?;
        if operator == BinaryOperator::Equal {
            return Ok(Value::Bool(left_value == right_value));
        }
        let lhs = Self::expect_int(&left_value)?;
        let rhs = Self::expect_int(&right_value)?;
        let result = match operator {
            BinaryOperator::Add => lhs.checked_add(rhs),
            BinaryOperator::Subtract => lhs.checked_sub(rhs),
            BinaryOperator::Multiply => lhs.checked_mul(rhs),
            BinaryOperator::Divide => {
                if rhs == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                // Truncates toward zero; `i64::MIN / -1` is the one
                // overflowing case.
                lhs.checked_div(rhs)
            }
            BinaryOperator::LessThan => return Ok(Value::Bool(lhs < rhs)),
            BinaryOperator::LessThanOrEqual => return Ok(Value::Bool(lhs <= rhs)),
            BinaryOperator::Equal => return Ok(Value::Bool(lhs == rhs)),
        };
        result
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::ArithmeticOverflow {
                operation: operator.symbol().into(),
            })
    }

    /// Bindings are introduced left to right; a binding without an
    /// initialiser starts void. The frame is popped when the body is done.
    fn eval_let(
        &mut self,
        bindings: &[LetBinding],
        body: &Expression,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        env.push();
        let result = self.eval_let_body(bindings, body, env);
        env.pop();
        result
    }

    fn eval_let_body(
        &mut self,
        bindings: &[LetBinding],
        body: &Expression,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        for binding in bindings {
            let value = match &binding.initializer {
                Some(initializer) => self.eval(initializer, env)?,
                None => Value::Void,
            };
            env.define(binding.name.name.clone(), value);
        }
        self.eval(body, env)
    }

    /// Selects the branch for the scrutinee's concrete class, walking the
    /// ancestor chain most-specific first; within one ancestor the first
    /// matching branch in source order wins.
    fn eval_case(
        &mut self,
        scrutinee: &Expression,
        branches: &[CaseBranch],
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        let scrutinee_value = self.eval(scrutinee, env)?;
        if scrutinee_value.is_void() {
            return Err(RuntimeError::CaseOnVoid);
        }
        let concrete = scrutinee_value.class_name();
        for ancestor in self.class_table.ancestry(&concrete) {
            for branch in branches {
                if branch.declared_type.name == ancestor {
                    env.push();
                    env.define(branch.name.name.clone(), scrutinee_value.clone());
                    let result = self.eval(&branch.body, env);
                    env.pop();
                    return result;
                }
            }
        }
        Err(RuntimeError::CaseUnmatched {
            class_name: concrete,
        })
    }

    fn eval_new(
        &mut self,
        class_name: &TypeName,
        env: &mut Environment,
    ) -> Result<Value, RuntimeError> {
        if class_name.is_self_type() {
            let receiver = Self::self_value(env)?;
            let concrete = receiver.class_name();
            self.instantiate(&concrete)
        } else {
            self.instantiate(&class_name.name)
        }
    }

    // --- objects and dispatch ---

    /// Creates an instance of a class. The primitive classes produce their
    /// default values; everything else gets an attribute table with every
    /// slot (inherited first) void, after which the initialisers run in
    /// declaration order, parent before child, with the new object bound
    /// as the receiver.
    fn instantiate(&mut self, class_name: &str) -> Result<Value, RuntimeError> {
        match class_name {
            "Int" => return Ok(Value::Int(0)),
            "String" => return Ok(Value::Str(EcoString::new())),
            "Bool" => return Ok(Value::Bool(false)),
            _ => {}
        }
        let Some(descriptor) = self.class_table.get_class(class_name) else {
            return Err(RuntimeError::UndefinedClass {
                name: class_name.into(),
            });
        };
        let instance = Rc::new(ObjectInstance::new(descriptor.name.clone()));
        for slot in &descriptor.layout {
            instance.insert_attribute(slot.name.clone(), Value::Void);
        }
        let receiver = Value::Object(Rc::clone(&instance));
        let ancestors = self.class_table.ancestry(class_name);
        self.enter_call()?;
        let result = self.run_initialisers(&ancestors, &instance, &receiver);
        self.call_depth -= 1;
        result?;
        Ok(receiver)
    }

    fn run_initialisers(
        &mut self,
        ancestors: &[EcoString],
        instance: &Rc<ObjectInstance>,
        receiver: &Value,
    ) -> Result<(), RuntimeError> {
        let mut env = Environment::new();
        env.define("self", receiver.clone());
        for ancestor in ancestors.iter().rev() {
            let Some(class) = self.class_defs.get(ancestor.as_str()).copied() else {
                continue;
            };
            for attribute in class.attributes() {
                if let Some(initializer) = &attribute.initializer {
                    let value = self.eval(initializer, &mut env)?;
                    instance.insert_attribute(attribute.name.name.clone(), value);
                }
            }
        }
        Ok(())
    }

    /// Dispatches a method: void receiver is fatal, then the method is
    /// resolved (dynamically from the receiver's concrete class, or from
    /// the named class for a static dispatch), then the arguments are
    /// evaluated left to right in the caller's environment.
    fn dispatch(
        &mut self,
        receiver: Value,
        method_name: &str,
        arguments: &[Expression],
        env: &mut Environment,
        static_root: Option<&str>,
    ) -> Result<Value, RuntimeError> {
        if receiver.is_void() {
            return Err(RuntimeError::DispatchOnVoid {
                method: method_name.into(),
            });
        }
        let root = match static_root {
            Some(class_name) => EcoString::from(class_name),
            None => receiver.class_name(),
        };
        let Some(resolved) = self.resolve_method(&root, method_name) else {
            return Err(RuntimeError::MethodNotFound {
                method: method_name.into(),
                class_name: root,
            });
        };
        let mut argument_values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            argument_values.push(self.eval(argument, env)?);
        }
        match resolved {
            ResolvedMethod::User(method) => {
                self.call_user_method(method, receiver, argument_values)
            }
            ResolvedMethod::Builtin(signature) => {
                self.call_builtin(signature, receiver, argument_values)
            }
        }
    }

    /// A user definition anywhere on the chain shadows a built-in, since
    /// built-ins only exist at the chain's root classes.
    fn resolve_method(&self, class_name: &str, method_name: &str) -> Option<ResolvedMethod<'p>> {
        if let Some(method) = self.find_user_method(class_name, method_name) {
            return Some(ResolvedMethod::User(method));
        }
        self.class_table
            .find_method(class_name, method_name)
            .map(ResolvedMethod::Builtin)
    }

    /// Walks the ancestor chain for a method with an AST body. Within one
    /// class the last definition wins, matching the class table.
    fn find_user_method(&self, class_name: &str, method_name: &str) -> Option<&'p MethodDefinition> {
        for ancestor in self.class_table.ancestry(class_name) {
            if let Some(class) = self.class_defs.get(ancestor.as_str()).copied() {
                let mut found = None;
                for method in class.methods() {
                    if method.name.name == method_name {
                        found = Some(method);
                    }
                }
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// Runs a user method in a fresh environment holding only the receiver
    /// and the formals.
    fn call_user_method(
        &mut self,
        method: &'p MethodDefinition,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.enter_call()?;
        let mut env = Environment::new();
        env.define("self", receiver);
        for (formal, value) in method.formals.iter().zip(arguments) {
            env.define(formal.name.name.clone(), value);
        }
        let result = self.eval(&method.body, &mut env);
        self.call_depth -= 1;
        result
    }

    fn enter_call(&mut self) -> Result<(), RuntimeError> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded {
                limit: MAX_CALL_DEPTH,
            });
        }
        self.call_depth += 1;
        Ok(())
    }

    // --- value helpers ---

    fn self_value(env: &Environment) -> Result<Value, RuntimeError> {
        env.get("self").ok_or_else(|| RuntimeError::UndefinedVariable {
            name: "self".into(),
        })
    }

    /// The receiver object of the current activation, when it is a class
    /// instance (primitive receivers have no attributes).
    fn receiver_in(env: &Environment) -> Option<Rc<ObjectInstance>> {
        match env.get("self") {
            Some(Value::Object(instance)) => Some(instance),
            _ => None,
        }
    }

    fn expect_int(value: &Value) -> Result<i64, RuntimeError> {
        match value {
            Value::Int(value) => Ok(*value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "Int".into(),
                found: other.class_name(),
            }),
        }
    }

    fn expect_bool(value: &Value) -> Result<bool, RuntimeError> {
        match value {
            Value::Bool(value) => Ok(*value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "Bool".into(),
                found: other.class_name(),
            }),
        }
    }

    fn expect_str(value: &Value) -> Result<EcoString, RuntimeError> {
        match value {
            Value::Str(value) => Ok(value.clone()),
            other => Err(RuntimeError::TypeMismatch {
                expected: "String".into(),
                found: other.class_name(),
            }),
        }
    }
}
