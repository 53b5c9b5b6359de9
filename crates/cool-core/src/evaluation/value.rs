// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Runtime values.
//!
//! Integers, strings and booleans are unboxed; class instances are
//! reference-counted so that aliased objects share attribute updates. `Void`
//! is the value of uninitialised attributes and bindings and of `while`
//! loops.

use ecow::EcoString;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A Cool runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// A 64-bit integer.
    Int(i64),
    /// A string.
    Str(EcoString),
    /// A boolean.
    Bool(bool),
    /// An instance of a user-defined class (or `Object`/`IO`).
    Object(Rc<ObjectInstance>),
    /// The absence of a value.
    Void,
}

impl Value {
    /// Returns true for `Void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// The value's concrete dynamic class name.
    #[must_use]
    pub fn class_name(&self) -> EcoString {
        match self {
            Self::Int(_) => "Int".into(),
            Self::Str(_) => "String".into(),
            Self::Bool(_) => "Bool".into(),
            Self::Object(instance) => instance.class_name().clone(),
            Self::Void => "Void".into(),
        }
    }
}

/// Equality follows the language's `=` operator: structural for the
/// primitive types, reference identity for objects, and `Void` equal only
/// to itself. Values of different kinds are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Str(left), Self::Str(right)) => left == right,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Object(left), Self::Object(right)) => Rc::ptr_eq(left, right),
            (Self::Void, Self::Void) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Object(instance) => write!(f, "<{}>", instance.class_name()),
            Self::Void => write!(f, "void"),
        }
    }
}

/// A class instance: its concrete class plus a mutable attribute table.
///
/// Attributes use interior mutability because every alias of the instance
/// observes assignments. The full attribute set (inherited slots included)
/// is filled in with `Void` placeholders at instantiation before any
/// initialiser runs.
#[derive(Debug)]
pub struct ObjectInstance {
    class_name: EcoString,
    attributes: RefCell<HashMap<EcoString, Value>>,
}

impl ObjectInstance {
    pub(super) fn new(class_name: EcoString) -> Self {
        Self {
            class_name,
            attributes: RefCell::new(HashMap::new()),
        }
    }

    /// The concrete class this instance was created from.
    #[must_use]
    pub fn class_name(&self) -> &EcoString {
        &self.class_name
    }

    /// Reads an attribute, or `None` if this class has no such slot.
    pub(super) fn get_attribute(&self, name: &str) -> Option<Value> {
        self.attributes.borrow().get(name).cloned()
    }

    /// Creates or overwrites an attribute slot. Used during instantiation.
    pub(super) fn insert_attribute(&self, name: EcoString, value: Value) {
        self.attributes.borrow_mut().insert(name, value);
    }

    /// Writes an existing attribute slot; false if there is no such slot.
    pub(super) fn assign_attribute(&self, name: &str, value: Value) -> bool {
        let mut attributes = self.attributes.borrow_mut();
        if let Some(slot) = attributes.get_mut(name) {
            *slot = value;
            true
        } else {
            false
        }
    }

    /// A copy with its own attribute table holding the same values.
    /// Nested objects stay shared.
    pub(super) fn shallow_copy(&self) -> Self {
        Self {
            class_name: self.class_name.clone(),
            attributes: RefCell::new(self.attributes.borrow().clone()),
        }
    }
}
