// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for parser crash safety testing.
//!
//! This target feeds arbitrary byte sequences to the parser and asserts
//! that it never panics. The parser must handle all input gracefully,
//! producing either a valid AST or diagnostics.
//!
//! # Success Criteria
//!
//! The parser passes fuzzing if:
//! - It never panics on any input (including deeply nested expressions)
//! - It always returns a Program and Vec<Diagnostic>
//! - No assertions fail during parsing

#![no_main]

use cool_core::source_analysis::{lex_with_eof, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only test valid UTF-8 (the lexer expects strings).
    // Invalid UTF-8 is not a parser concern - it's filtered earlier.
    if let Ok(source) = std::str::from_utf8(data) {
        let tokens = lex_with_eof(source);

        // Success = no panic. We don't care if there are diagnostics.
        let (_program, _diagnostics) = parse(tokens);
    }
});
