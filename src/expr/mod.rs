// SPDX-License-Identifier: MIT

//! Guard and template expression evaluation
//!
//! A small expression language used on edge guards and in `{{ ... }}`
//! template spans:
//! - `errorCount > 0 && activeState == 'retry'`
//! - `Requirements.needsCustomTool`
//! - `tags contains 'urgent'`
//!
//! Evaluation is purely functional over a [`VariableContext`]; unknown
//! variables resolve to an undefined sentinel and comparisons against it are
//! `false` rather than errors.

mod ast;
mod context;
mod evaluator;
mod parser;
mod template;

pub use ast::{CompareOp, Expression, Literal, Operand};
pub use context::VariableContext;
pub use evaluator::{evaluate, evaluate_value};
pub use parser::parse;
pub use template::resolve_template;

use crate::error::ExpressionError;

/// Parse and evaluate a boolean guard expression in one call.
///
/// Grammar errors are returned for the caller to downgrade (the engine
/// treats a guard that fails to parse as an ineligible edge).
pub fn evaluate_condition(expr: &str, ctx: &VariableContext) -> Result<bool, ExpressionError> {
    Ok(evaluate(&parse(expr)?, ctx))
}
