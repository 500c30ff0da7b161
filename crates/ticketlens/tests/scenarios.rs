mod common;

use serde_json::json;
use ticketlens_analysis::{diagnose, PrevalenceAnalyzer, PrevalenceLevel};
use ticketlens_core::Settings;
use ticketlens_query::{Generation, QueryGenerator};

use common::{cst, results_with_rows, sample_context, sample_now, LOGIN_TICKET};

#[test]
fn test_ticket_time_window_from_login_report() {
    let context = sample_context(LOGIN_TICKET);
    assert!(context.time_range.source.contains("工单/邮件时间"));
    assert_eq!(context.time_range.start_display, "2025-01-20 08:00:00");
    assert_eq!(context.time_range.end_display, "2025-01-20 12:00:00");

    let generation = QueryGenerator::new(Settings::default(), sample_now()).generate(&context);
    let Generation::Ready(doc) = generation else {
        panic!("expected instructions");
    };
    assert!(doc.is_ordered());
    assert_eq!(doc.time_range, context.time_range);
}

#[test]
fn test_twelve_devices_classify_as_medium() {
    let rows = (0..12)
        .map(|i| json!({"attributes": {"user": {"client_id": format!("client-{}", i)}}}))
        .collect();
    let analyzer = PrevalenceAnalyzer::new(Settings::default(), cst(), sample_now());
    let report = analyzer.classify(&results_with_rows(rows));

    assert!(report.is_prevalent);
    assert_eq!(report.level, PrevalenceLevel::Medium);
    assert_eq!(report.affected_devices.len(), 12);
    assert_eq!(report.affected_countries.len(), 0);
}

#[test]
fn test_empty_rows_advise_missing_identity() {
    let empty = results_with_rows(vec![]);

    let bare = sample_context(LOGIN_TICKET);
    let report = diagnose(&bare, &empty, Settings::default().expansion_hours);
    assert_eq!(report.row_count, 0);
    assert!(report.advisories.iter().any(|a| a.starts_with("缺少用户ID")));

    let complete = sample_context(
        "服务: auth 用户ID: u-1 设备ID: d-1 接口: /api/login 报错，工单时间：2025-01-20 10:00:00",
    );
    let report = diagnose(&complete, &empty, Settings::default().expansion_hours);
    assert!(report.signals.iter().all(|s| s.present), "{:?}", report.signals);
    assert!(report.advisories.iter().all(|a| !a.starts_with("缺少")));
}
