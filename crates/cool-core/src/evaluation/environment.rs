// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Runtime environments.
//!
//! An [`Environment`] is the frame stack of one activation: the base frame
//! holds `self` and the formal parameters, and `let`/`case` push and pop
//! frames on top. Each method call gets a fresh environment, so a callee
//! never sees its caller's locals. Attributes live on the receiver object,
//! not here.

use super::value::Value;
use ecow::EcoString;
use std::collections::HashMap;

#[derive(Debug)]
pub(super) struct Environment {
    frames: Vec<Frame>,
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<EcoString, Value>,
}

impl Environment {
    /// Creates an environment with a single base frame.
    pub(super) fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Pushes a frame for a `let` or `case` body.
    pub(super) fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the innermost frame. The base frame is never popped; returns
    /// false if that was attempted.
    pub(super) fn pop(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Binds a name in the innermost frame, replacing any binding with the
    /// same name in that frame.
    pub(super) fn define(&mut self, name: impl Into<EcoString>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.into(), value);
        }
    }

    /// Reads a name, innermost frame outward.
    pub(super) fn get(&self, name: &str) -> Option<Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(name).cloned())
    }

    /// Writes to the innermost frame that already binds the name; false if
    /// no frame does.
    pub(super) fn assign(&mut self, name: &str, value: Value) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.bindings.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
