//! Field lookup in result rows of uncertain shape
//!
//! The same canonical field (say `user.client_id`) may arrive as a flat
//! dotted key, as nested objects, under `attributes`, or under
//! `resources`/`resource`. Candidates are tried in a fixed order and the first
//! non-empty scalar wins. Rows wrapped in a `data` object are searched the
//! same way.

use serde_json::Value;

/// First non-empty scalar found for `field` in `row`
pub fn lookup<'v>(row: &'v Value, field: &str) -> Option<&'v Value> {
    let obj = row.as_object()?;
    let attributes = obj.get("attributes");
    let resources = obj.get("resources");
    let resource = obj.get("resource");

    let candidates = [
        obj.get(field),
        attributes.and_then(|a| nested(a, field)),
        attributes.and_then(|a| a.get(field)),
        nested(row, field),
        resources.and_then(|r| nested(r, field)),
        resources.and_then(|r| r.get(field)),
        resource.and_then(|r| nested(r, field)),
        resource.and_then(|r| r.get(field)),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|v| is_scalar(v))
        .or_else(|| {
            obj.get("data")
                .filter(|d| d.is_object())
                .and_then(|d| lookup(d, field))
        })
}

/// [`lookup`] rendered as a trimmed string
pub fn lookup_string(row: &Value, field: &str) -> Option<String> {
    lookup(row, field).and_then(scalar_string)
}

fn nested<'v>(value: &'v Value, field: &str) -> Option<&'v Value> {
    if !field.contains('.') {
        return None;
    }
    field
        .split('.')
        .try_fold(value, |current, part| current.as_object()?.get(part))
}

fn is_scalar(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) | Value::Bool(_) => true,
        _ => false,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
