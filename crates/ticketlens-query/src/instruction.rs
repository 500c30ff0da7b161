//! Instruction documents handed to the external query executor

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ticketlens_core::TimeWindow;

pub const TOOL_LIST_SERVICES: &str = "list_services";
pub const TOOL_BUILDER_QUERY: &str = "execute_builder_query";

pub const PRIORITY_DISCOVERY: u8 = 1;
pub const PRIORITY_ERROR_SCAN: u8 = 2;
pub const PRIORITY_SERVICE_SCAN: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInstruction {
    pub priority: u8,
    pub tool: String,
    pub params: Value,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionDocument {
    pub ticket_id: String,
    pub time_range: TimeWindow,
    pub services: Vec<String>,
    pub queries: Vec<QueryInstruction>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl InstructionDocument {
    /// True when priorities never decrease and discovery comes first
    pub fn is_ordered(&self) -> bool {
        let ascending = self.queries.windows(2).all(|w| w[0].priority <= w[1].priority);
        let discovery_first = self
            .queries
            .first()
            .map(|q| q.priority == PRIORITY_DISCOVERY)
            .unwrap_or(true);
        ascending && discovery_first
    }

    pub fn count(&self, priority: u8) -> usize {
        self.queries.iter().filter(|q| q.priority == priority).count()
    }
}

/// Outcome of a generation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Generation {
    Ready(InstructionDocument),
    Insufficient { reasons: Vec<String> },
}

impl Generation {
    pub fn document(&self) -> Option<&InstructionDocument> {
        match self {
            Generation::Ready(doc) => Some(doc),
            Generation::Insufficient { .. } => None,
        }
    }
}

/// Compact span label used by service discovery: `45m`, `4h`
pub fn span_label(start: i64, end: i64) -> String {
    let span = (end - start).max(0);
    if span < 3_600_000 {
        format!("{}m", span / 60_000)
    } else {
        format!("{}h", span / 3_600_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(priority: u8) -> QueryInstruction {
        QueryInstruction {
            priority,
            tool: TOOL_BUILDER_QUERY.to_string(),
            params: Value::Null,
            description: String::new(),
        }
    }

    fn doc(priorities: &[u8]) -> InstructionDocument {
        InstructionDocument {
            ticket_id: "T-1".to_string(),
            time_range: TimeWindow {
                start: 1,
                end: 2,
                start_display: String::new(),
                end_display: String::new(),
                source: String::new(),
            },
            services: vec![],
            queries: priorities.iter().map(|p| instruction(*p)).collect(),
            notes: vec![],
        }
    }

    #[test]
    fn test_ordering_check() {
        assert!(doc(&[1, 2, 3, 3]).is_ordered());
        assert!(doc(&[1, 3]).is_ordered());
        assert!(!doc(&[1, 3, 2]).is_ordered());
        assert!(!doc(&[2, 3]).is_ordered());
        assert_eq!(doc(&[1, 3, 3]).count(PRIORITY_SERVICE_SCAN), 2);
    }

    #[test]
    fn test_span_label() {
        assert_eq!(span_label(0, 45 * 60_000), "45m");
        assert_eq!(span_label(0, 4 * 3_600_000), "4h");
        assert_eq!(span_label(0, 90 * 60_000), "1h");
    }

    #[test]
    fn test_generation_is_tagged() {
        let json = serde_json::to_value(Generation::Insufficient {
            reasons: vec!["x".to_string()],
        })
        .unwrap();
        assert_eq!(json["status"], "insufficient");
        assert_eq!(json["reasons"][0], "x");

        let json = serde_json::to_value(Generation::Ready(doc(&[1]))).unwrap();
        assert_eq!(json["status"], "ready");
        assert_eq!(json["ticketId"], "T-1");
    }
}
