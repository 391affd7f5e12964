//! Command text parser
//!
//! Turns one command into an [`Expression`]: a flat sequence of freshly
//! allocated slots, one per whitespace-separated token.
//!
//! | token shape            | slot value                     |
//! |------------------------|--------------------------------|
//! | `(...)` or `[...]`     | list of the recursively parsed group |
//! | `"..."` or `'...'`     | string without the quotes      |
//! | numeric (`12`, `-3.5`) | number                         |
//! | anything else          | unresolved symbol              |
//!
//! Symbols are resolved late, by the evaluator, so forward references work.

use tracing::debug;

use crate::runtime::memory::Slot;
use crate::runtime::value::Value;
use crate::util::string::special_space_split;
use crate::vm::{VMError, VMResult, VirtualMachine};

/// Parsed expression: ordered slots, the first one being the operator
pub type Expression = Vec<Slot>;

/// Parse command text into an expression.
///
/// Empty input yields an empty expression. Unbalanced groups or quotes fail
/// with `UnterminatedExpression`; nothing allocated by a failed parse stays
/// live.
pub fn parse(
    vm: &mut VirtualMachine,
    source: &str,
) -> VMResult<Expression> {
    debug!(len = source.len(), "parse start");
    let expr = parse_group(vm, source, 0)?;
    debug!(tokens = expr.len(), "parse complete");
    Ok(expr)
}

fn parse_group(
    vm: &mut VirtualMachine,
    source: &str,
    depth: usize,
) -> VMResult<Expression> {
    let max_depth = vm.config().max_depth;
    if depth >= max_depth {
        return Err(VMError::StackOverflow(max_depth));
    }

    let tokens = special_space_split(source)?;
    let mut expr = Expression::with_capacity(tokens.len());
    for token in &tokens {
        match parse_token(vm, token, depth) {
            Ok(slot) => expr.push(slot),
            Err(err) => {
                for slot in expr {
                    vm.unuse_tree(slot);
                }
                return Err(err);
            }
        }
    }
    Ok(expr)
}

fn parse_token(
    vm: &mut VirtualMachine,
    token: &str,
    depth: usize,
) -> VMResult<Slot> {
    // The splitter only yields groups and quoted strings whose first and last
    // chars are the ASCII delimiters.
    let inner = token.get(1..token.len().saturating_sub(1)).unwrap_or("");
    match token.chars().next() {
        Some('(') | Some('[') => {
            let items = parse_group(vm, inner, depth + 1)?;
            Ok(vm.new_value(Value::List(items)))
        }
        Some('"') | Some('\'') => Ok(vm.new_string(inner)),
        _ => match parse_number(token) {
            Some(n) => Ok(vm.new_number(n)),
            None => Ok(vm.new_value(Value::Symbol(token.to_string()))),
        },
    }
}

/// Numeric shape: a digit, or a sign / dot followed by a digit or dot, and
/// the whole token must parse as a finite float. `-` alone stays a symbol,
/// and so does a literal that overflows, such as `1e400`.
pub fn parse_number(token: &str) -> Option<f64> {
    let mut chars = token.chars();
    let numeric_shape = match chars.next()? {
        c if c.is_ascii_digit() => true,
        '-' | '+' | '.' => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
        _ => false,
    };
    if numeric_shape {
        token.parse::<f64>().ok().filter(|n| n.is_finite())
    } else {
        None
    }
}
