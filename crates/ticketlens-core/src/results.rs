//! Results document written by the external query executor

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsDocument {
    #[serde(default, alias = "queries_executed")]
    pub queries_executed: Vec<ExecutedQuery>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutedQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub result: QueryResult,
}

/// Rows arrive under `rows`, or under `data` from older executors.
/// `data` is read only when `rows` holds nothing; non-array values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub rows: Value,
    #[serde(default)]
    pub data: Value,
}

impl QueryResult {
    pub fn rows(&self) -> std::slice::Iter<'_, Value> {
        let rows = as_rows(&self.rows);
        if rows.as_slice().is_empty() {
            as_rows(&self.data)
        } else {
            rows
        }
    }
}

fn as_rows(value: &Value) -> std::slice::Iter<'_, Value> {
    match value {
        Value::Array(items) => items.iter(),
        _ => {
            let empty: &'static [Value] = &[];
            empty.iter()
        }
    }
}

impl ResultsDocument {
    /// Every row of every executed query, in document order
    pub fn rows(&self) -> impl Iterator<Item = &Value> {
        self.queries_executed.iter().flat_map(|q| q.result.rows())
    }

    pub fn row_count(&self) -> usize {
        self.rows().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_or_data_per_query() {
        let doc: ResultsDocument = serde_json::from_value(serde_json::json!({
            "queriesExecuted": [
                {"result": {"rows": [{"a": 1}, {"a": 2}]}},
                {"result": {"data": [{"a": 3}]}},
                {"result": {"rows": [], "data": {"not": "an array"}}},
            ]
        }))
        .unwrap();
        assert_eq!(doc.row_count(), 3);
    }

    #[test]
    fn test_rows_mirrored_in_data_counted_once() {
        let doc: ResultsDocument = serde_json::from_value(serde_json::json!({
            "queriesExecuted": [
                {"result": {"rows": [{"a": 1}, {"a": 2}], "data": [{"a": 1}, {"a": 2}]}}
            ]
        }))
        .unwrap();
        assert_eq!(doc.row_count(), 2);
    }

    #[test]
    fn test_snake_case_key_accepted() {
        let doc: ResultsDocument = serde_json::from_value(serde_json::json!({
            "queries_executed": [{"result": {"rows": [{}]}}]
        }))
        .unwrap();
        assert_eq!(doc.row_count(), 1);
    }

    #[test]
    fn test_empty_document() {
        let doc: ResultsDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.row_count(), 0);
    }
}
