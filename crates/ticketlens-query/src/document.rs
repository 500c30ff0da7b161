//! Backend builder-query document
//!
//! One raw logs query per document: time bounds, selected columns, a filter
//! expression, newest-first ordering and a row limit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ticketlens_core::schema::FieldDataType;
use ticketlens_core::BackendConfig;

pub const SCHEMA_VERSION: &str = "v1";
pub const SIGNAL_LOGS: &str = "logs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDocument {
    pub schema_version: String,
    pub start: i64,
    pub end: i64,
    pub request_type: String,
    pub composite_query: CompositeQuery,
    pub format_options: FormatOptions,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeQuery {
    pub queries: Vec<QueryEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub spec: BuilderSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSpec {
    pub name: String,
    pub signal: String,
    pub disabled: bool,
    pub limit: u32,
    pub offset: u32,
    pub order: Vec<OrderBy>,
    pub select_fields: Vec<SelectField>,
    pub filter: Expression,
    pub having: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub key: OrderKey,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderKey {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectField {
    pub name: String,
    pub field_data_type: FieldDataType,
    pub signal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    pub format_table_result_for_ui: bool,
    pub fill_gaps: bool,
}

impl QueryDocument {
    /// Raw logs query over `[start, end]`, newest rows first
    pub fn logs(
        start: i64,
        end: i64,
        fields: &[String],
        expression: String,
        limit: u32,
        backend: Option<&BackendConfig>,
    ) -> Self {
        let select_fields = fields
            .iter()
            .map(|name| SelectField {
                name: name.clone(),
                field_data_type: match backend {
                    Some(b) => b.field_type(name),
                    None => ticketlens_core::schema::field_type(name),
                },
                signal: SIGNAL_LOGS.to_string(),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            start,
            end,
            request_type: "raw".to_string(),
            composite_query: CompositeQuery {
                queries: vec![QueryEnvelope {
                    kind: "builder_query".to_string(),
                    spec: BuilderSpec {
                        name: "A".to_string(),
                        signal: SIGNAL_LOGS.to_string(),
                        disabled: false,
                        limit,
                        offset: 0,
                        order: vec![OrderBy {
                            key: OrderKey {
                                name: "timestamp".to_string(),
                            },
                            direction: "desc".to_string(),
                        }],
                        select_fields,
                        filter: Expression { expression },
                        having: Expression::default(),
                    },
                }],
            },
            format_options: FormatOptions {
                format_table_result_for_ui: true,
                fill_gaps: false,
            },
            variables: Map::new(),
        }
    }

    /// Filter expression of the (single) builder query
    pub fn filter_expression(&self) -> &str {
        self.composite_query
            .queries
            .first()
            .map(|q| q.spec.filter.expression.as_str())
            .unwrap_or("")
    }
}
