// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexical scope tracking for the type checker.
//!
//! A [`TypeScope`] is a stack of binding levels mapping names to declared
//! static types. The base level holds a method's formal parameters; `let`
//! bindings and `case` branches push and pop levels on top of it. Attributes
//! are deliberately not recorded here: the checker falls back to the class
//! table when a name misses every level, so locals shadow attributes.

use ecow::EcoString;
use std::collections::HashMap;

/// Tracks statically-typed name bindings across nested scopes.
#[derive(Debug, Clone)]
pub(super) struct TypeScope {
    levels: Vec<ScopeLevel>,
}

#[derive(Debug, Clone)]
struct ScopeLevel {
    bindings: HashMap<EcoString, EcoString>,
}

impl TypeScope {
    /// Creates a scope with a single base level.
    pub(super) fn new() -> Self {
        Self {
            levels: vec![ScopeLevel {
                bindings: HashMap::new(),
            }],
        }
    }

    /// Enters a new nested level.
    pub(super) fn push(&mut self) {
        self.levels.push(ScopeLevel {
            bindings: HashMap::new(),
        });
    }

    /// Exits the current level.
    ///
    /// Returns `true` if a level was popped. Popping the base level is a
    /// no-op returning `false`, never a panic.
    pub(super) fn pop(&mut self) -> bool {
        if self.levels.len() > 1 {
            self.levels.pop();
            true
        } else {
            false
        }
    }

    /// Binds a name to a declared type in the current level, replacing any
    /// existing binding of the same name at this level.
    pub(super) fn define(&mut self, name: impl Into<EcoString>, declared_type: impl Into<EcoString>) {
        if let Some(level) = self.levels.last_mut() {
            level.bindings.insert(name.into(), declared_type.into());
        }
    }

    /// Looks up a name, innermost level first.
    pub(super) fn lookup(&self, name: &str) -> Option<&EcoString> {
        self.levels
            .iter()
            .rev()
            .find_map(|level| level.bindings.get(name))
    }
}

impl Default for TypeScope {
    fn default() -> Self {
        Self::new()
    }
}
