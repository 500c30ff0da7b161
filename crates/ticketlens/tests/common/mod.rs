#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::{json, Value};
use ticketlens_core::{ResultsDocument, Settings, TicketContext};
use ticketlens_query::ContextBuilder;

pub const LOGIN_TICKET: &str = "用户反馈登录接口返回500错误，工单时间：2025-01-20 10:00:00";

pub fn cst() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

pub fn sample_now() -> DateTime<FixedOffset> {
    cst().with_ymd_and_hms(2025, 1, 20, 15, 0, 0).unwrap()
}

pub fn sample_context(text: &str) -> TicketContext {
    ContextBuilder::new(Settings::default(), sample_now())
        .ticket_id(Some("T-1".to_string()))
        .build(text)
        .unwrap()
}

pub fn results_with_rows(rows: Vec<Value>) -> ResultsDocument {
    serde_json::from_value(json!({"queriesExecuted": [{"result": {"rows": rows}}]})).unwrap()
}
