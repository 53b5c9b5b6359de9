// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The built-in methods of `Object`, `IO` and `String`.
//!
//! Built-ins carry signatures in the class table but no AST bodies, so
//! dispatch lands here once resolution picks one. Each implementation
//! receives the already-evaluated receiver and arguments; a user method of
//! the same name anywhere on the receiver's chain shadows these.

use super::error::RuntimeError;
use super::value::Value;
use super::Evaluator;
use crate::semantic_analysis::MethodSignature;
use ecow::EcoString;
use std::io::Write;
use std::rc::Rc;

impl Evaluator<'_> {
    pub(super) fn call_builtin(
        &mut self,
        signature: &MethodSignature,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match (signature.declaring_class.as_str(), signature.name.as_str()) {
            ("Object", "abort") => Err(RuntimeError::Aborted {
                class_name: receiver.class_name(),
            }),
            ("Object", "type_name") => Ok(Value::Str(receiver.class_name())),
            ("Object", "copy") => Ok(Self::copy_value(&receiver)),
            ("IO", "out_string") => match arguments.as_slice() {
                [Value::Str(text)] => {
                    write!(self.output, "{text}")?;
                    self.output.flush()?;
                    Ok(receiver)
                }
                other => Err(Self::argument_mismatch("String", other)),
            },
            ("IO", "out_int") => match arguments.as_slice() {
                [Value::Int(value)] => {
                    write!(self.output, "{value}")?;
                    self.output.flush()?;
                    Ok(receiver)
                }
                other => Err(Self::argument_mismatch("Int", other)),
            },
            ("IO", "in_string") => {
                let mut line = String::new();
                self.input.read_line(&mut line)?;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Value::Str(line.into()))
            }
            ("IO", "in_int") => {
                let mut line = String::new();
                self.input.read_line(&mut line)?;
                Ok(Value::Int(line.trim().parse().unwrap_or(0)))
            }
            ("String", "length") => {
                let text = Self::expect_str(&receiver)?;
                let length = i64::try_from(text.chars().count()).unwrap_or(i64::MAX);
                Ok(Value::Int(length))
            }
            ("String", "concat") => {
                let mut text = Self::expect_str(&receiver)?;
                match arguments.as_slice() {
                    [Value::Str(suffix)] => {
                        text.push_str(suffix);
                        Ok(Value::Str(text))
                    }
                    other => Err(Self::argument_mismatch("String", other)),
                }
            }
            ("String", "substr") => {
                let text = Self::expect_str(&receiver)?;
                match arguments.as_slice() {
                    [Value::Int(start), Value::Int(length)] => {
                        Self::substr(&text, *start, *length)
                    }
                    other => Err(Self::argument_mismatch("Int, Int", other)),
                }
            }
            _ => Err(RuntimeError::MethodNotFound {
                method: signature.name.clone(),
                class_name: signature.declaring_class.clone(),
            }),
        }
    }

    /// `copy` is shallow: the new object gets its own attribute table, but
    /// attribute values (including object references) are shared.
    /// Primitives are their own copies.
    fn copy_value(receiver: &Value) -> Value {
        match receiver {
            Value::Object(instance) => Value::Object(Rc::new(instance.shallow_copy())),
            other => other.clone(),
        }
    }

    /// `substr` indices are character positions, not bytes.
    fn substr(text: &EcoString, start: i64, length: i64) -> Result<Value, RuntimeError> {
        let total = text.chars().count();
        let out_of_range = || RuntimeError::SubstrOutOfRange {
            start,
            length,
            string_length: i64::try_from(total).unwrap_or(i64::MAX),
        };
        let begin = usize::try_from(start).map_err(|_| out_of_range())?;
        let count = usize::try_from(length).map_err(|_| out_of_range())?;
        let end = begin.checked_add(count).ok_or_else(out_of_range)?;
        if end > total {
            return Err(out_of_range());
        }
        let slice: String = text.chars().skip(begin).take(count).collect();
        Ok(Value::Str(slice.into()))
    }

    fn argument_mismatch(expected: &str, arguments: &[Value]) -> RuntimeError {
        let found: EcoString = if arguments.is_empty() {
            "no arguments".into()
        } else {
            arguments
                .iter()
                .map(Value::class_name)
                .collect::<Vec<_>>()
                .join(", ")
                .into()
        };
        RuntimeError::TypeMismatch {
            expected: expected.into(),
            found,
        }
    }
}
