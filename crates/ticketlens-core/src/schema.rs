//! Log field schema of the observability backend
//!
//! Named constant tables: field definitions, default and priority column
//! lists, and the severity values treated as errors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDataType {
    String,
    Int64,
    #[serde(alias = "float")]
    Float64,
    Bool,
}

impl FieldDataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldDataType::Int64 | FieldDataType::Float64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldContext {
    Resource,
    Attribute,
    Log,
}

pub struct FieldDef {
    pub name: &'static str,
    pub context: FieldContext,
    pub data_type: FieldDataType,
}

const fn field(name: &'static str, context: FieldContext, data_type: FieldDataType) -> FieldDef {
    FieldDef {
        name,
        context,
        data_type,
    }
}

use FieldContext::{Attribute, Log, Resource};
use FieldDataType::{Float64, Int64, String as Str};

pub const LOG_FIELDS: &[FieldDef] = &[
    field("service.name", Resource, Str),
    field("service.version", Resource, Str),
    field("service.environment", Resource, Str),
    field("browser.name", Attribute, Str),
    field("browser.version", Attribute, Str),
    field("browser.user_agent", Attribute, Str),
    field("localTime", Attribute, Str),
    field("path", Attribute, Str),
    field("pathname", Attribute, Str),
    field("referrer", Attribute, Str),
    field("request.host", Attribute, Str),
    field("request.pathname", Attribute, Str),
    field("request.query", Attribute, Str),
    field("request.method", Attribute, Str),
    field("response.status", Attribute, Int64),
    field("response.time", Attribute, Int64),
    field("response.errno", Attribute, Int64),
    field("message", Attribute, Str),
    field("stack", Attribute, Str),
    field("user.id", Attribute, Str),
    field("user.client_id", Attribute, Str),
    field("geo.location.lat", Attribute, Float64),
    field("geo.location.lon", Attribute, Float64),
    field("geo.city_name", Attribute, Str),
    field("geo.country_name", Attribute, Str),
    field("geo.country_iso_code", Attribute, Str),
    field("geo.region_name", Attribute, Str),
    field("source.address", Attribute, Str),
    field("body", Log, Str),
    field("severity_text", Log, Str),
    field("severity_number", Log, Int64),
    field("trace_id", Log, Str),
    field("span_id", Log, Str),
    field("timestamp", Log, Int64),
];

/// Columns the result view renders first
pub const PRIORITY_FIELDS: &[&str] = &[
    "service.name",
    "pathname",
    "message",
    "stack",
    "severity_text",
    "user.id",
];

/// Columns selected when a project declares no `common_query_fields`
pub const DEFAULT_QUERY_FIELDS: &[&str] = &[
    "service.name",
    "pathname",
    "message",
    "stack",
    "severity_text",
    "user.id",
    "severity_number",
    "timestamp",
    "localTime",
    "service.version",
    "service.environment",
    "body",
    "request.pathname",
    "response.status",
    "response.errno",
    "trace_id",
    "span_id",
];

/// `severity_text` values treated as errors
pub const SEVERITY_ERROR_VALUES: &[&str] = &[
    "error", "Error", "ERROR", "异常", "错误", "fatal", "Fatal", "FATAL", "critical", "Critical",
    "CRITICAL",
];

/// `severity_number` values treated as errors (OpenTelemetry ERROR..FATAL)
pub const SEVERITY_ERROR_NUMBERS: &[i64] = &[17, 18, 19, 20, 21, 22];

pub fn lookup(name: &str) -> Option<&'static FieldDef> {
    LOG_FIELDS.iter().find(|f| f.name == name)
}

/// Built-in data type of a field; unknown fields are strings
pub fn field_type(name: &str) -> FieldDataType {
    lookup(name).map(|f| f.data_type).unwrap_or(FieldDataType::String)
}

pub fn is_error_severity(text: &str) -> bool {
    SEVERITY_ERROR_VALUES
        .iter()
        .any(|v| v.eq_ignore_ascii_case(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_types() {
        assert_eq!(field_type("response.status"), FieldDataType::Int64);
        assert_eq!(field_type("geo.location.lat"), FieldDataType::Float64);
        assert_eq!(field_type("user.id"), FieldDataType::String);
        assert_eq!(field_type("custom.unknown"), FieldDataType::String);
        assert!(field_type("timestamp").is_numeric());
    }

    #[test]
    fn test_priority_fields_lead_default_fields() {
        assert_eq!(&DEFAULT_QUERY_FIELDS[..PRIORITY_FIELDS.len()], PRIORITY_FIELDS);
    }

    #[test]
    fn test_error_severity() {
        assert!(is_error_severity("ERROR"));
        assert!(is_error_severity("Fatal"));
        assert!(is_error_severity("错误"));
        assert!(!is_error_severity("info"));
    }

    #[test]
    fn test_service_name_is_resource_field() {
        let def = lookup("service.name").unwrap();
        assert_eq!(def.context, FieldContext::Resource);
    }
}
