//! Incident summary of executed-query results
//!
//! Counts rows per severity, classifies error rows by type, and keeps a
//! bounded list of representative error messages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use ticketlens_core::schema::{is_error_severity, SEVERITY_ERROR_NUMBERS};
use ticketlens_core::ResultsDocument;

use crate::fieldpath::lookup_string;

/// Key errors kept per summary
pub const MAX_KEY_ERRORS: usize = 10;

/// Characters kept of each key error message
pub const MAX_MESSAGE_CHARS: usize = 200;

/// Error type and the lowercase fragments that identify it, checked in order
const ERROR_PATTERNS: &[(&str, &[&str])] = &[
    ("timeout", &["timeout", "超时"]),
    ("connection", &["connection", "连接", "connect"]),
    ("permission", &["permission", "权限", "forbidden"]),
    ("not found", &["not found", "404", "未找到"]),
    ("server error", &["500", "server error", "服务器错误"]),
    ("validation", &["validation", "验证", "invalid"]),
    ("database", &["database", "数据库", "sql"]),
];

const UNKNOWN_ERROR: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub rows: usize,
    pub error_count: usize,
    pub severity_counts: BTreeMap<String, usize>,
    pub error_types: BTreeMap<String, usize>,
    pub services: Vec<String>,
    pub key_errors: Vec<KeyError>,
    pub summary: String,
}

impl LogSummary {
    pub fn from_results(results: &ResultsDocument) -> Self {
        let mut summary = Self::default();

        for row in results.rows() {
            summary.rows += 1;

            let service = lookup_string(row, "service.name")
                .or_else(|| lookup_string(row, "service_name"));
            if let Some(name) = &service {
                if !summary.services.contains(name) {
                    summary.services.push(name.clone());
                }
            }

            let severity = lookup_string(row, "severity_text")
                .or_else(|| lookup_string(row, "severity"));
            let number = lookup_string(row, "severity_number").and_then(|n| n.parse::<i64>().ok());
            let label = severity
                .as_deref()
                .map(str::to_uppercase)
                .or_else(|| number.map(|n| severity_label(n).to_string()))
                .unwrap_or_else(|| "UNKNOWN".to_string());
            *summary.severity_counts.entry(label).or_default() += 1;

            let is_error = severity.as_deref().is_some_and(is_error_severity)
                || number.is_some_and(|n| SEVERITY_ERROR_NUMBERS.contains(&n));
            if !is_error {
                continue;
            }
            summary.error_count += 1;

            let body = lookup_string(row, "body").or_else(|| lookup_string(row, "message"));
            if let Some(kind) = body.as_deref().or(severity.as_deref()).map(classify_error) {
                *summary.error_types.entry(kind.to_string()).or_default() += 1;
            }
            if let Some(body) = body {
                if summary.key_errors.len() < MAX_KEY_ERRORS {
                    summary.key_errors.push(KeyError {
                        service,
                        severity,
                        message: body.chars().take(MAX_MESSAGE_CHARS).collect(),
                    });
                }
            }
        }

        summary.summary = summary.render();
        info!(
            rows = summary.rows,
            errors = summary.error_count,
            types = summary.error_types.len(),
            "Summarized query results"
        );
        summary
    }

    fn render(&self) -> String {
        let mut parts = Vec::new();
        if self.error_count > 0 {
            parts.push(format!("发现 {} 个错误", self.error_count));
        }
        if !self.error_types.is_empty() {
            let types: Vec<String> = self
                .error_types
                .iter()
                .map(|(kind, count)| format!("{}({})", kind, count))
                .collect();
            parts.push(format!("错误类型: {}", types.join(", ")));
        }
        if !self.services.is_empty() {
            parts.push(format!("涉及服务: {}", self.services.join(", ")));
        }
        if !self.key_errors.is_empty() {
            parts.push(format!("关键错误: {} 条", self.key_errors.len()));
        }

        if parts.is_empty() {
            "未发现明显错误".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Error type of a message; `unknown` when no pattern matches
pub fn classify_error(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    ERROR_PATTERNS
        .iter()
        .find(|(_, fragments)| fragments.iter().any(|f| lower.contains(f)))
        .map(|(kind, _)| *kind)
        .unwrap_or(UNKNOWN_ERROR)
}

/// OpenTelemetry severity range name for a `severity_number`
fn severity_label(number: i64) -> &'static str {
    match number {
        1..=4 => "TRACE",
        5..=8 => "DEBUG",
        9..=12 => "INFO",
        13..=16 => "WARN",
        17..=20 => "ERROR",
        21..=24 => "FATAL",
        _ => "UNKNOWN",
    }
}
