//! Filter conditions and their compilation to the backend expression grammar
//!
//! Grammar: `field IN ('a', 'b')`, `field = 'v'`, `field = 123`,
//! `field >= 123`, `field CONTAINS 'v'`, joined with ` AND `. String values
//! are single-quoted with embedded quotes doubled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    In,
    NotIn,
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
}

impl FilterOp {
    fn keyword(self) -> &'static str {
        match self {
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT IN",
            FilterOp::Eq => "=",
            FilterOp::NotEq => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Contains => "CONTAINS",
            FilterOp::NotContains => "NOT CONTAINS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FilterValue {
    fn is_blank(&self) -> bool {
        matches!(self, FilterValue::Str(s) if s.trim().is_empty())
    }

    /// Numbers bare, strings quoted
    fn render(&self) -> String {
        match self {
            FilterValue::Int(n) => n.to_string(),
            FilterValue::Float(f) => f.to_string(),
            FilterValue::Str(s) => quote(s),
        }
    }

    fn render_quoted(&self) -> String {
        match self {
            FilterValue::Int(n) => quote(&n.to_string()),
            FilterValue::Float(f) => quote(&f.to_string()),
            FilterValue::Str(s) => quote(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Str(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub values: Vec<FilterValue>,
    pub op: FilterOp,
}

impl FilterCondition {
    pub fn new(field: &str, op: FilterOp, values: Vec<FilterValue>) -> Self {
        Self {
            field: field.to_string(),
            values,
            op,
        }
    }

    pub fn one_of<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        Self::new(field, FilterOp::In, values.into_iter().map(Into::into).collect())
    }

    pub fn equals(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, vec![value.into()])
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, FilterOp::Contains, vec![value.into()])
    }

    /// Render this condition; `None` when it has no usable value
    pub fn compile(&self) -> Option<String> {
        let values: Vec<&FilterValue> = self.values.iter().filter(|v| !v.is_blank()).collect();
        let first = values.first()?;

        let rendered = match self.op {
            FilterOp::In | FilterOp::NotIn => {
                let list = values
                    .iter()
                    .map(|v| v.render())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} {} ({})", self.field, self.op.keyword(), list)
            }
            FilterOp::Contains | FilterOp::NotContains => {
                format!("{} {} {}", self.field, self.op.keyword(), first.render_quoted())
            }
            _ => format!("{} {} {}", self.field, self.op.keyword(), first.render()),
        };
        Some(rendered)
    }
}

/// Join compiled conditions with ` AND `, skipping empty ones
pub fn compile_filters(conditions: &[FilterCondition]) -> String {
    conditions
        .iter()
        .filter_map(FilterCondition::compile)
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_in_is_parenthesized_and_escaped() {
        let cond = FilterCondition::one_of("x", ["a'b"]);
        assert_eq!(cond.compile().unwrap(), "x IN ('a''b')");
    }

    #[test]
    fn test_two_filters_join_with_one_and() {
        let expr = compile_filters(&[
            FilterCondition::one_of("service.name", ["user-service", "pay"]),
            FilterCondition::equals("response.status", 500i64),
        ]);
        assert_eq!(
            expr,
            "service.name IN ('user-service', 'pay') AND response.status = 500"
        );
        assert_eq!(expr.matches(" AND ").count(), 1);
    }

    #[test]
    fn test_numeric_comparison_unquoted() {
        let cond = FilterCondition::new("severity_number", FilterOp::Gte, vec![FilterValue::Int(17)]);
        assert_eq!(cond.compile().unwrap(), "severity_number >= 17");

        let cond = FilterCondition::one_of("severity_number", [17i64, 18]);
        assert_eq!(cond.compile().unwrap(), "severity_number IN (17, 18)");
    }

    #[test]
    fn test_string_equality_and_contains_quoted() {
        assert_eq!(
            FilterCondition::equals("geo.city_name", "Xi'an").compile().unwrap(),
            "geo.city_name = 'Xi''an'"
        );
        assert_eq!(
            FilterCondition::contains("message", "timeout").compile().unwrap(),
            "message CONTAINS 'timeout'"
        );
        let cond = FilterCondition::new("body", FilterOp::NotContains, vec![FilterValue::Int(42)]);
        assert_eq!(cond.compile().unwrap(), "body NOT CONTAINS '42'");
    }

    #[test]
    fn test_not_in_and_not_equal() {
        let cond = FilterCondition::new("env", FilterOp::NotIn, vec!["dev".into()]);
        assert_eq!(cond.compile().unwrap(), "env NOT IN ('dev')");
        let cond = FilterCondition::new("env", FilterOp::NotEq, vec!["dev".into()]);
        assert_eq!(cond.compile().unwrap(), "env != 'dev'");
    }

    #[test]
    fn test_empty_conditions_are_skipped() {
        let expr = compile_filters(&[
            FilterCondition::one_of("user.id", Vec::<String>::new()),
            FilterCondition::one_of("user.client_id", [""]),
            FilterCondition::one_of("service.name", ["a"]),
        ]);
        assert_eq!(expr, "service.name IN ('a')");
        assert_eq!(compile_filters(&[]), "");
    }

    #[test]
    fn test_untagged_values_deserialize() {
        let cond: FilterCondition = serde_json::from_str(
            r#"{"field": "x", "values": ["a", 3, 1.5], "op": "in"}"#,
        )
        .unwrap();
        assert_eq!(cond.compile().unwrap(), "x IN ('a', 3, 1.5)");
    }
}
