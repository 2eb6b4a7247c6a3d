// SPDX-License-Identifier: MIT

//! Template interpolation
//!
//! Substitutes `{{ expr }}` spans inside arbitrary strings with the
//! expression's evaluated, stringified result. A span that fails to parse or
//! references an undefined variable is left verbatim, so a broken template
//! degrades to showing its raw text instead of erroring.

use super::context::VariableContext;
use super::evaluator::evaluate_value;
use super::parser::parse;
use serde_json::Value;

/// Resolve every `{{ ... }}` span in `text` against `ctx`.
pub fn resolve_template(text: &str, ctx: &VariableContext) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            // Unclosed span, keep the remainder as-is
            break;
        };
        let end = start + 2 + end;
        out.push_str(&rest[..start]);

        let span = &rest[start..end + 2];
        let inner = &rest[start + 2..end];
        match render_span(inner, ctx) {
            Some(rendered) => out.push_str(&rendered),
            None => {
                log::warn!("Template span left verbatim: {}", span);
                out.push_str(span);
            }
        }
        rest = &rest[end + 2..];
    }

    out.push_str(rest);
    out
}

fn render_span(inner: &str, ctx: &VariableContext) -> Option<String> {
    let expr = parse(inner).ok()?;
    let value = evaluate_value(&expr, ctx)?;
    Some(stringify(&value))
}

/// Canonical textual form: strings raw, numbers and booleans literally,
/// structured values as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        structured => serde_json::to_string(structured).unwrap_or_default(),
    }
}
