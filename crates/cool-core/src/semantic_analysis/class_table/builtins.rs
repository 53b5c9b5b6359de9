// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Built-in class definitions for the class table.
//!
//! This module defines the five classes every Cool program can rely on:
//! `Object` at the root, `IO` for console input/output, and the primitive
//! classes `Int`, `String` and `Bool`. They are registered before any
//! user-defined classes, so a program that tries to redefine one gets a
//! duplicate-class diagnostic.
//!
//! Built-in methods have signatures but no AST bodies; the evaluator
//! recognises them by their declaring class and runs native code instead.

use super::{ClassDescriptor, MethodSignature};
use ecow::EcoString;
use std::collections::HashMap;

/// Builds a built-in method signature.
fn method(
    name: &str,
    parameter_types: &[&str],
    return_type: &str,
    declaring_class: &str,
) -> (EcoString, MethodSignature) {
    (
        name.into(),
        MethodSignature {
            name: name.into(),
            parameter_types: parameter_types.iter().map(|t| EcoString::from(*t)).collect(),
            return_type: return_type.into(),
            declaring_class: declaring_class.into(),
        },
    )
}

/// Builds a built-in class descriptor. Built-ins have no attributes, so the
/// attribute list and layout are always empty.
fn class(
    name: &str,
    parent: Option<&str>,
    methods: Vec<(EcoString, MethodSignature)>,
) -> (EcoString, ClassDescriptor) {
    (
        name.into(),
        ClassDescriptor {
            name: name.into(),
            parent: parent.map(EcoString::from),
            attributes: Vec::new(),
            methods: methods.into_iter().collect(),
            layout: Vec::new(),
            builtin: true,
        },
    )
}

/// Returns all built-in class definitions, keyed by class name.
pub(super) fn builtin_classes() -> HashMap<EcoString, ClassDescriptor> {
    [
        class(
            "Object",
            None,
            vec![
                method("abort", &[], "Object", "Object"),
                method("type_name", &[], "String", "Object"),
                method("copy", &[], "SELF_TYPE", "Object"),
            ],
        ),
        class(
            "IO",
            Some("Object"),
            vec![
                method("out_string", &["String"], "IO", "IO"),
                method("out_int", &["Int"], "IO", "IO"),
                method("in_string", &[], "String", "IO"),
                method("in_int", &[], "Int", "IO"),
            ],
        ),
        class("Int", Some("Object"), Vec::new()),
        class(
            "String",
            Some("Object"),
            vec![
                method("length", &[], "Int", "String"),
                method("concat", &["String"], "String", "String"),
                method("substr", &["Int", "Int"], "String", "String"),
            ],
        ),
        class("Bool", Some("Object"), Vec::new()),
    ]
    .into_iter()
    .collect()
}
