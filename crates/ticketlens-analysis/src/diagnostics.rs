//! Advice for result documents that came back empty

use serde::{Deserialize, Serialize};
use tracing::warn;

use ticketlens_core::{ResultsDocument, TicketContext};

/// Widest window that is not flagged as too broad
const WIDE_WINDOW_HOURS: f64 = 48.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub signal: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub row_count: usize,
    pub window_hours: f64,
    pub signals: Vec<Signal>,
    pub advisories: Vec<String>,
}

impl Diagnostics {
    pub fn is_empty_result(&self) -> bool {
        self.row_count == 0
    }
}

/// Which identity signals the query had to work with, and what to add
pub fn diagnose(context: &TicketContext, results: &ResultsDocument, expansion_hours: i64) -> Diagnostics {
    let info = &context.ticket_info;
    let checks = [
        (
            "service.name",
            !info.services.is_empty(),
            "缺少服务名称：请在工单中注明服务名，或通过 --service 指定",
        ),
        (
            "user.id",
            info.user_info.id().is_some(),
            "缺少用户ID：补充用户ID可以精确定位该用户的请求日志",
        ),
        (
            "user.client_id",
            info.device_info.id().is_some(),
            "缺少设备ID：补充设备ID（client_id）可以关联同一设备的请求",
        ),
        (
            "request.pathname",
            info.api_info.query_path().is_some(),
            "缺少接口路径：补充出错的接口路径可以缩小查询范围",
        ),
    ];

    let mut signals = Vec::new();
    let mut advisories = Vec::new();
    for (signal, present, advice) in checks {
        signals.push(Signal {
            signal: signal.to_string(),
            present,
        });
        if !present {
            advisories.push(advice.to_string());
        }
    }

    let window_hours = context.time_range.width_hours();
    if window_hours < (expansion_hours * 2) as f64 {
        advisories.push(format!(
            "查询时间范围较窄（{:.1}小时），可以尝试放宽时间范围",
            window_hours
        ));
    } else if window_hours > WIDE_WINDOW_HOURS {
        advisories.push(format!(
            "查询时间范围较宽（{:.1}小时），建议提供更准确的问题发生时间",
            window_hours
        ));
    }

    let row_count = results.row_count();
    if row_count == 0 {
        warn!(
            ticket = %context.ticket_id,
            advisories = advisories.len(),
            "Query results are empty"
        );
    }

    Diagnostics {
        row_count,
        window_hours,
        signals,
        advisories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use ticketlens_core::{TicketInfo, TimeWindow};

    fn context(info: TicketInfo, hours: i64) -> TicketContext {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let end = tz.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        TicketContext {
            ticket_id: "T-1".to_string(),
            ticket_info: info,
            time_range: TimeWindow::new(end - chrono::Duration::hours(hours), end, "test"),
            project_context: None,
            backend_config: None,
            created_at: end,
            refinements: 0,
        }
    }

    fn empty_rows() -> ResultsDocument {
        serde_json::from_value(serde_json::json!({"queriesExecuted": [{"result": {"rows": []}}]}))
            .unwrap()
    }

    #[test]
    fn test_missing_identity_signals_are_advised() {
        let report = diagnose(&context(TicketInfo::new("x"), 4), &empty_rows(), 2);
        assert!(report.is_empty_result());
        assert_eq!(report.signals.len(), 4);
        assert!(report.signals.iter().all(|s| !s.present));
        assert!(report.advisories.iter().any(|a| a.starts_with("缺少用户ID")));
        assert_eq!(report.advisories.iter().filter(|a| a.starts_with("缺少")).count(), 4);
    }

    #[test]
    fn test_no_missing_advice_when_all_signals_present() {
        let mut info = TicketInfo::new("x");
        info.add_service("auth");
        info.user_info.set_id("u1");
        info.device_info.set_id("d1");
        info.api_info.pathname = Some("/api/login".to_string());

        let report = diagnose(&context(info, 4), &empty_rows(), 2);
        assert!(report.signals.iter().all(|s| s.present));
        assert!(report.advisories.iter().all(|a| !a.contains("缺少")));
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn test_window_width_advice() {
        let narrow = diagnose(&context(TicketInfo::new("x"), 1), &empty_rows(), 2);
        assert!(narrow.advisories.iter().any(|a| a.contains("较窄")));
        let wide = diagnose(&context(TicketInfo::new("x"), 72), &empty_rows(), 2);
        assert!(wide.advisories.iter().any(|a| a.contains("较宽")));
        assert_eq!(wide.window_hours, 72.0);
    }
}
