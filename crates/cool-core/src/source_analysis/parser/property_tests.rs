// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the Cool parser.
//!
//! These tests use `proptest` to verify parser invariants over generated inputs:
//!
//! 1. **Parser never panics** — arbitrary string input always returns a result
//! 2. **Diagnostic spans within input** — all spans have `end <= input.len()`
//! 3. **Error nodes produce diagnostics** — `Expression::Error` implies
//!    non-empty diagnostics
//! 4. **Error messages are user-facing** — no internal type names in diagnostics

use proptest::prelude::*;

use crate::ast::{Expression, Feature, Program};
use crate::source_analysis::{lex_with_eof, parse};

// ============================================================================
// Near-valid Cool generators
// ============================================================================

/// Valid Cool programs for composing near-valid inputs.
const FRAGMENTS: &[&str] = &[
    "class Main { main() : Int { 42 }; };",
    "class Main { main() : Int { 2 + 3 * 4 }; };",
    "class A { x : Int <- 5; get_x() : Int { x }; };",
    "class B inherits A { };",
    "class Main { main() : Int { if 1 < 2 then 10 else 20 fi }; };",
    "class Main { main() : Int { let x : Int <- 7 in x * 2 }; };",
    "class Main { run(x : Int) : Object { while x < 3 loop x <- x + 1 pool }; };",
    "class Main { main() : Int { case new Main of a : A => 1; b : B => 2; esac }; };",
    "class Main { main() : String { \"hello\".concat(\"world\") }; };",
    "class Main { main() : Bool { not isvoid self }; };",
    "class Main { main() : Int { ~5 - ~3 }; };",
    "class Main { main() : Object { (new IO).out_string(\"hi\") }; };",
    "class Main { foo() : Int { 1 }; main() : Int { self.foo() + foo() }; };",
    "class Main { main() : Int { (new Main)@Main.main() }; };",
    "class Main { main() : SELF_TYPE { self }; };",
    "class Counter { count : Int; increment() : Int { count <- count + 1 }; };",
    "class Main { main() : Object { { 1; \"two\"; true; } }; };",
];

/// Generates a valid Cool program from the seed corpus.
fn valid_fragment() -> impl Strategy<Value = String> {
    prop::sample::select(FRAGMENTS).prop_map(std::string::ToString::to_string)
}

/// Generates a truncated program (cut at a random point).
fn truncated_program() -> impl Strategy<Value = String> {
    valid_fragment().prop_flat_map(|s| {
        let len = s.len();
        if len <= 1 {
            Just(s).boxed()
        } else {
            (1..len)
                .prop_map(move |cut| {
                    // Back off to the nearest char boundary so slicing
                    // cannot panic on multi-byte characters.
                    let mut safe_cut = cut;
                    while safe_cut > 0 && !s.is_char_boundary(safe_cut) {
                        safe_cut -= 1;
                    }
                    if safe_cut == 0 {
                        s.clone()
                    } else {
                        s[..safe_cut].to_string()
                    }
                })
                .boxed()
        }
    })
}

/// Generates input with swapped delimiters via single-pass char mapping.
fn swapped_delimiters() -> impl Strategy<Value = String> {
    valid_fragment().prop_map(|s| {
        let mut result = String::with_capacity(s.len());
        for ch in s.chars() {
            let mapped = match ch {
                '{' => '(',
                '}' => ')',
                '(' => '{',
                _ => ch,
            };
            result.push(mapped);
        }
        result
    })
}

/// Generates input with all semicolons removed.
fn removed_semicolons() -> impl Strategy<Value = String> {
    valid_fragment().prop_map(|s| s.replace(';', " "))
}

/// Generates input with closing keywords dropped (`fi`, `pool`, `esac`).
fn dropped_closers() -> impl Strategy<Value = String> {
    valid_fragment().prop_map(|s| {
        s.replace(" fi", " ")
            .replace(" pool", " ")
            .replace(" esac", " ")
    })
}

/// Generates input with duplicated operators.
fn duplicated_operators() -> impl Strategy<Value = String> {
    valid_fragment().prop_map(|s| s.replace('+', "+ +").replace('*', "* *"))
}

/// Generates a near-valid Cool input using one of several mutation strategies.
fn near_valid_cool() -> impl Strategy<Value = String> {
    prop_oneof![
        valid_fragment(),
        truncated_program(),
        swapped_delimiters(),
        removed_semicolons(),
        dropped_closers(),
        duplicated_operators(),
    ]
}

// ============================================================================
// AST helpers
// ============================================================================

/// Recursively checks if an expression contains any `Expression::Error` nodes.
fn has_error_node(expr: &Expression) -> bool {
    match expr {
        Expression::Error { .. } => true,
        Expression::Assignment { value, .. } => has_error_node(value),
        Expression::Dispatch {
            receiver,
            arguments,
            ..
        } => {
            receiver.as_deref().is_some_and(has_error_node)
                || arguments.iter().any(has_error_node)
        }
        Expression::StaticDispatch {
            receiver,
            arguments,
            ..
        } => has_error_node(receiver) || arguments.iter().any(has_error_node),
        Expression::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            has_error_node(condition)
                || has_error_node(then_branch)
                || has_error_node(else_branch)
        }
        Expression::While {
            condition, body, ..
        } => has_error_node(condition) || has_error_node(body),
        Expression::Block { body, .. } => body.iter().any(has_error_node),
        Expression::Let { bindings, body, .. } => {
            bindings
                .iter()
                .any(|b| b.initializer.as_ref().is_some_and(has_error_node))
                || has_error_node(body)
        }
        Expression::Case {
            scrutinee,
            branches,
            ..
        } => has_error_node(scrutinee) || branches.iter().any(|b| has_error_node(&b.body)),
        Expression::IsVoid { operand, .. }
        | Expression::Negate { operand, .. }
        | Expression::Not { operand, .. } => has_error_node(operand),
        Expression::BinaryOp { left, right, .. } => has_error_node(left) || has_error_node(right),
        // Leaf nodes
        Expression::IntLiteral { .. }
        | Expression::StringLiteral { .. }
        | Expression::BoolLiteral { .. }
        | Expression::SelfRef { .. }
        | Expression::Identifier(_)
        | Expression::New { .. } => false,
    }
}

/// Checks if a program's AST contains any `Expression::Error` nodes.
fn program_has_error_nodes(program: &Program) -> bool {
    program.classes.iter().any(|class| {
        class.features.iter().any(|feature| match feature {
            Feature::Method(method) => has_error_node(&method.body),
            Feature::Attribute(attribute) => {
                attribute.initializer.as_ref().is_some_and(has_error_node)
            }
        })
    })
}

/// Internal type names that should never appear in user-facing diagnostics.
const INTERNAL_NAMES: &[&str] = &[
    "TokenKind",
    "unwrap()",
    "panic!",
    "unreachable!",
    "Expression::",
    "internal error",
];

// ============================================================================
// Property tests
// ============================================================================

/// Default is 512 cases for standard CI; override via `PROPTEST_CASES` env var
/// for extended runs (e.g., `PROPTEST_CASES=10000`).
fn proptest_config() -> ProptestConfig {
    let default = ProptestConfig::default();
    ProptestConfig {
        cases: default.cases.max(512),
        ..default
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Property 1: Parser never panics on arbitrary string input.
    ///
    /// The parser must always return a (Program, Vec<Diagnostic>) pair,
    /// even for completely invalid input.
    #[test]
    fn parser_never_panics(input in "\\PC{0,500}") {
        let tokens = lex_with_eof(&input);
        let (_program, _diagnostics) = parse(tokens);
        // If we get here without panicking, the property holds.
    }

    /// Property 1b: Parser never panics on near-valid structured input.
    ///
    /// Uses near-valid generators that exercise error recovery more deeply.
    #[test]
    fn parser_never_panics_near_valid(input in near_valid_cool()) {
        let tokens = lex_with_eof(&input);
        let (_program, _diagnostics) = parse(tokens);
    }

    /// Property 2: All diagnostic spans are within the input bounds.
    ///
    /// Every diagnostic's span must satisfy `end <= input.len()` (byte-level).
    #[test]
    fn diagnostic_spans_within_input(input in "\\PC{0,500}") {
        let tokens = lex_with_eof(&input);
        let (_program, diagnostics) = parse(tokens);
        let input_len = u32::try_from(input.len()).unwrap_or(u32::MAX);
        for diag in &diagnostics {
            prop_assert!(
                diag.span.end() <= input_len,
                "Diagnostic span end {} exceeds input length {} for input {:?}: {}",
                diag.span.end(),
                input_len,
                input,
                diag.message,
            );
            prop_assert!(
                diag.span.start() <= diag.span.end(),
                "Diagnostic span start {} > end {} for input {:?}: {}",
                diag.span.start(),
                diag.span.end(),
                input,
                diag.message,
            );
        }
    }

    /// Property 3: Error AST nodes always produce diagnostics.
    ///
    /// If the AST contains any `Expression::Error` node, the diagnostics
    /// vector must be non-empty.
    #[test]
    fn error_nodes_produce_diagnostics(input in near_valid_cool()) {
        let tokens = lex_with_eof(&input);
        let (program, diagnostics) = parse(tokens);
        if program_has_error_nodes(&program) {
            prop_assert!(
                !diagnostics.is_empty(),
                "AST contains Error node(s) but diagnostics is empty for input: {:?}",
                input,
            );
        }
    }

    /// Property 4: Error messages are user-facing (no internal type names).
    ///
    /// No diagnostic message should contain internal Rust type names or
    /// panic-related strings that would confuse end users.
    #[test]
    fn error_messages_are_user_facing(input in near_valid_cool()) {
        let tokens = lex_with_eof(&input);
        let (_program, diagnostics) = parse(tokens);
        for diag in &diagnostics {
            for internal in INTERNAL_NAMES {
                prop_assert!(
                    !diag.message.contains(internal),
                    "Diagnostic message contains internal name {:?}: {:?} (input: {:?})",
                    internal,
                    diag.message,
                    input,
                );
            }
        }
    }
}

#[cfg(test)]
mod corpus {
    use super::*;

    /// Every seed fragment is valid Cool and must parse without diagnostics.
    #[test]
    fn all_fragments_parse_cleanly() {
        for fragment in FRAGMENTS {
            let (_, diagnostics) = parse(lex_with_eof(fragment));
            assert!(
                diagnostics.is_empty(),
                "fragment produced diagnostics: {fragment}\n{diagnostics:?}"
            );
        }
    }
}
