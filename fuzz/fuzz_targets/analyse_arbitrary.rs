// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for the full static pipeline.
//!
//! Runs lexing, parsing and semantic analysis over arbitrary input. The
//! analyser must cope with any AST the parser can produce, including ones
//! full of error nodes, without panicking.
//!
//! # Success Criteria
//!
//! - No panics in class table construction or type checking
//! - Analysis always returns a class table and diagnostics, however
//!   malformed the hierarchy

#![no_main]

use cool_core::semantic_analysis::analyse;
use cool_core::source_analysis::{lex_with_eof, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        let (program, _diagnostics) = parse(lex_with_eof(source));
        let _analysis = analyse(&program);
    }
});
