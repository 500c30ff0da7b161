//! Engine settings and per-project configuration documents

use chrono::FixedOffset;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::schema::FieldDataType;
use crate::time;

/// Required keys of `project_context.json`
pub const PROJECT_CONTEXT_REQUIRED: &[&str] = &["services", "key_files", "architecture", "tech_stack"];

/// Required keys of `backend_config.json`
pub const BACKEND_CONFIG_REQUIRED: &[&str] = &[
    "init_code_location",
    "base_url",
    "app_version",
    "environment",
    "env_vars",
    "fields",
    "common_query_fields",
    "service_names",
];

/// Distinct-entity thresholds for the prevalence ladder.
///
/// The defaults are hand-picked calibration values; operators may retune
/// them in `settings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrevalenceThresholds {
    pub prevalent_rows: usize,
    pub prevalent_entities: usize,
    pub medium_rows: usize,
    pub medium_entities: usize,
    pub low_rows: usize,
    pub low_entities: usize,
    pub critical_countries: usize,
    pub critical_cities: usize,
    pub high_countries: usize,
    pub high_cities: usize,
}

impl PrevalenceThresholds {
    pub fn new() -> Self {
        Self {
            prevalent_rows: 50,
            prevalent_entities: 10,
            medium_rows: 20,
            medium_entities: 5,
            low_rows: 10,
            low_entities: 3,
            critical_countries: 2,
            critical_cities: 5,
            high_countries: 1,
            high_cities: 3,
        }
    }
}

impl Default for PrevalenceThresholds {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine tunables (`settings.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Margin added on both sides of extracted ticket/problem times
    pub expansion_hours: i64,

    /// Window length when the ticket carries no usable time
    pub default_range_hours: i64,

    /// How far past "now" a window may end before a warning is attached
    pub future_tolerance_hours: i64,

    /// Cap on per-service scan queries
    pub max_service_queries: usize,

    /// Cap on selected columns per query
    pub max_select_fields: usize,

    /// Row limit for content queries
    pub query_limit: u32,

    /// Row limit for the unscoped prevalence query
    pub prevalence_limit: u32,

    /// Half-width of the prevalence window around the incident
    pub prevalence_expand_hours: i64,

    /// Offset used to read and display naive timestamps
    pub utc_offset: String,

    pub thresholds: PrevalenceThresholds,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            expansion_hours: 2,
            default_range_hours: 1,
            future_tolerance_hours: 1,
            max_service_queries: 5,
            max_select_fields: 15,
            query_limit: 100,
            prevalence_limit: 500,
            prevalence_expand_hours: 24,
            utc_offset: "+08:00".to_string(),
            thresholds: PrevalenceThresholds::new(),
        }
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        time::parse_offset(&self.utc_offset)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Project description (`project_context.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectContext {
    pub services: Vec<String>,
    pub key_files: Vec<String>,
    pub architecture: String,
    pub tech_stack: Vec<String>,
}

/// Observability backend configuration (`backend_config.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_code_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Named base URLs per environment or client
    pub api_baseurls: BTreeMap<String, String>,
    /// Relative API path to the pathname the backend records
    pub api_pathname_mapping: BTreeMap<String, String>,
    /// Category (`user_id`, `client_id`) to label-in-text to canonical field
    pub field_extraction_rules: BTreeMap<String, BTreeMap<String, String>>,
    /// Presentation alias to canonical service name
    pub service_name_mapping: BTreeMap<String, String>,
    #[serde(alias = "signoz_env_vars")]
    pub env_vars: BTreeMap<String, String>,
    /// Field name to data type, overriding the built-in schema.
    /// A plain list of names is accepted and typed from the schema.
    #[serde(deserialize_with = "deserialize_fields")]
    pub fields: BTreeMap<String, FieldDataType>,
    pub common_query_fields: Vec<String>,
    /// Canonical service name to free-form description
    pub service_names: BTreeMap<String, Value>,
}

impl BackendConfig {
    /// Data type of a field, preferring the project's declaration
    pub fn field_type(&self, name: &str) -> FieldDataType {
        self.fields
            .get(name)
            .copied()
            .unwrap_or_else(|| crate::schema::field_type(name))
    }

    /// Canonical name for a service alias, if the project maps it
    pub fn canonical_service(&self, alias: &str) -> Option<&str> {
        self.service_name_mapping.get(alias).map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldsDecl {
    Names(Vec<String>),
    Typed(BTreeMap<String, FieldDataType>),
}

fn deserialize_fields<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, FieldDataType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match FieldsDecl::deserialize(deserializer)? {
        FieldsDecl::Names(names) => names
            .into_iter()
            .map(|name| {
                let data_type = crate::schema::field_type(&name);
                (name, data_type)
            })
            .collect(),
        FieldsDecl::Typed(fields) => fields,
    })
}

/// Required keys absent (or null/empty) in a raw configuration document
pub fn missing_fields(doc: &Value, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|key| match doc.get(**key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(a)) => a.is_empty(),
            Some(Value::Object(o)) => o.is_empty(),
            Some(_) => false,
        })
        .map(|key| key.to_string())
        .collect()
}
