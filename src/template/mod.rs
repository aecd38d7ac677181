//! Template rendering for generated notes
//!
//! Placeholders are written `{{name}}` (dotted paths such as
//! `{{data.title}}` reach into nested values). The `<%= it.name %>` form is
//! accepted as well so older note templates keep rendering.

mod defaults;

pub use defaults::{DEFAULT_BOOK_TEMPLATE, DEFAULT_NOTE_TEMPLATE};

use serde_json::{Map, Value};
use thiserror::Error;

/// Values available to a template
pub type Variables = Map<String, Value>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to read template {path}: {reason}")]
    TemplateRead { path: String, reason: String },

    #[error("Unknown template variable: {0}")]
    UnknownVariable(String),

    #[error("Unterminated placeholder at byte {0}")]
    UnterminatedTag(usize),

    #[error("Unsupported template expression: {0}")]
    UnsupportedExpression(String),
}

const TAGS: [(&str, &str); 2] = [("{{", "}}"), ("<%=", "%>")];

/// Substitute every placeholder in `template`.
pub fn render(template: &str, variables: &Variables) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    loop {
        let next = TAGS
            .iter()
            .filter_map(|(open, close)| rest.find(open).map(|pos| (pos, *open, *close)))
            .min_by_key(|(pos, _, _)| *pos);

        let Some((pos, open, close)) = next else {
            out.push_str(rest);
            break;
        };

        out.push_str(&rest[..pos]);
        let inner_start = pos + open.len();
        let inner_len = rest[inner_start..]
            .find(close)
            .ok_or(RenderError::UnterminatedTag(offset + pos))?;
        let expression = rest[inner_start..inner_start + inner_len].trim();

        let path = if open == "<%=" {
            expression
                .strip_prefix("it.")
                .ok_or_else(|| RenderError::UnsupportedExpression(expression.to_string()))?
        } else {
            expression
        };

        out.push_str(&format_value(lookup(variables, path)?));

        let consumed = inner_start + inner_len + close.len();
        rest = &rest[consumed..];
        offset += consumed;
    }

    Ok(out)
}

fn lookup<'a>(variables: &'a Variables, path: &str) -> Result<&'a Value, RenderError> {
    let unknown = || RenderError::UnknownVariable(path.to_string());
    let mut parts = path.split('.');
    let first = parts.next().ok_or_else(unknown)?;
    let mut value = variables.get(first).ok_or_else(unknown)?;
    for part in parts {
        value = value.get(part).ok_or_else(unknown)?;
    }
    Ok(value)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // Whole floats print without a fraction (25.0 -> "25")
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.is_finite() => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
