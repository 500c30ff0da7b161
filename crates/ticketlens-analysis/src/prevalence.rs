//! Prevalence analysis
//!
//! Builds an unscoped error query (no user or device filter) around the
//! incident and classifies its results by distinct affected entities.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use ticketlens_core::schema::SEVERITY_ERROR_VALUES;
use ticketlens_core::time::{self, parse_timestamp};
use ticketlens_core::{PrevalenceThresholds, ResultsDocument, Settings, TicketContext, TicketInfo, TimeWindow};
use ticketlens_query::instruction::{PRIORITY_ERROR_SCAN, TOOL_BUILDER_QUERY};
use ticketlens_query::{
    compile_filters, FilterCondition, Generation, InstructionDocument, QueryDocument,
    QueryInstruction,
};

use crate::fieldpath::lookup_string;

/// Columns selected by the prevalence query
pub const PREVALENCE_FIELDS: &[&str] = &[
    "service.name",
    "service.environment",
    "service.version",
    "body",
    "request.pathname",
    "message",
    "severity_text",
    "timestamp",
    "geo.country_name",
    "geo.city_name",
    "browser.name",
    "browser.version",
    "user.id",
    "user.client_id",
    "source.address",
];

const HOUR_BUCKET_FORMAT: &str = "%Y-%m-%d %H:00";

/// Ticket features that narrow the prevalence query without naming a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrevalenceScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_path: Option<String>,
}

impl PrevalenceScope {
    pub fn from_ticket(info: &TicketInfo) -> Self {
        let client = &info.client_info;
        Self {
            service_name: info.services.first().cloned(),
            environment: client.environment.clone(),
            service_version: client.service_version.clone(),
            country: info.region_info.country.clone(),
            city: info.region_info.city.clone(),
            browser_name: client.browser_name.clone(),
            browser_version: client.browser_version.clone(),
            api_path: info.api_info.query_path().map(|p| {
                if p.starts_with('/') {
                    p.to_string()
                } else {
                    format!("/{}", p)
                }
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Severity filter plus one `IN` condition per known feature
    pub fn filters(&self) -> Vec<FilterCondition> {
        let mut filters = vec![FilterCondition::one_of(
            "severity_text",
            SEVERITY_ERROR_VALUES.iter().copied(),
        )];
        let scoped = [
            ("service.name", &self.service_name),
            ("service.environment", &self.environment),
            ("service.version", &self.service_version),
            ("geo.country_name", &self.country),
            ("geo.city_name", &self.city),
            ("browser.name", &self.browser_name),
            ("browser.version", &self.browser_version),
            ("request.pathname", &self.api_path),
        ];
        for (field, value) in scoped {
            if let Some(v) = value {
                filters.push(FilterCondition::one_of(field, [v.as_str()]));
            }
        }
        filters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrevalenceLevel {
    Isolated,
    Low,
    Medium,
    High,
    Critical,
}

impl PrevalenceLevel {
    pub fn is_prevalent(self) -> bool {
        self != PrevalenceLevel::Isolated
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            PrevalenceLevel::Critical => "⚠️ **严重普遍性问题**：此问题影响多个国家/地区的大量用户，建议立即采取紧急措施，考虑回滚或发布热修复。",
            PrevalenceLevel::High => "⚠️ **高普遍性问题**：此问题影响多个用户和设备，建议优先处理，考虑发布修复版本。",
            PrevalenceLevel::Medium => "⚠️ **中等普遍性问题**：此问题影响一定数量的用户，建议尽快处理。",
            PrevalenceLevel::Low => "⚠️ **轻微普遍性问题**：此问题影响少量用户，建议关注并处理。",
            PrevalenceLevel::Isolated => "✅ 此问题似乎是孤立事件，影响范围有限。",
        }
    }
}

/// Distinct-entity counts fed to the threshold ladder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub rows: usize,
    pub users: usize,
    pub devices: usize,
    pub countries: usize,
    pub cities: usize,
}

impl EntityCounts {
    pub fn level(&self, t: &PrevalenceThresholds) -> PrevalenceLevel {
        let crosses = |rows: usize, entities: usize| {
            self.rows >= rows || self.users >= entities || self.devices >= entities
        };

        if crosses(t.prevalent_rows, t.prevalent_entities) {
            if self.countries >= t.critical_countries || self.cities >= t.critical_cities {
                PrevalenceLevel::Critical
            } else if self.countries >= t.high_countries || self.cities >= t.high_cities {
                PrevalenceLevel::High
            } else {
                PrevalenceLevel::Medium
            }
        } else if crosses(t.medium_rows, t.medium_entities) {
            PrevalenceLevel::Medium
        } else if crosses(t.low_rows, t.low_entities) {
            PrevalenceLevel::Low
        } else {
            PrevalenceLevel::Isolated
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrevalenceReport {
    pub is_prevalent: bool,
    pub level: PrevalenceLevel,
    pub affected_count: usize,
    pub affected_users: Vec<String>,
    pub affected_devices: Vec<String>,
    pub affected_countries: Vec<String>,
    pub affected_cities: Vec<String>,
    pub time_distribution: BTreeMap<String, usize>,
    pub key_indicators: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone)]
pub struct PrevalenceAnalyzer {
    settings: Settings,
    offset: FixedOffset,
    now: DateTime<FixedOffset>,
}

impl PrevalenceAnalyzer {
    pub fn new(settings: Settings, offset: FixedOffset, now: DateTime<FixedOffset>) -> Self {
        Self {
            settings,
            offset,
            now,
        }
    }

    /// Incident window widened to `center ± expand`, kept out of the future
    pub fn widen(&self, window: &TimeWindow) -> (i64, i64) {
        let half = Duration::hours(self.settings.prevalence_expand_hours).num_milliseconds();
        let center = window.center_millis();
        let now = self.now.timestamp_millis();

        let (mut start, mut end) = (center - half, center + half);
        if end > now {
            end = now;
            start = end - 2 * half;
        }
        (start, end)
    }

    pub fn build_query(&self, context: &TicketContext) -> Generation {
        let scope = PrevalenceScope::from_ticket(&context.ticket_info);
        if scope.is_empty() {
            warn!(ticket = %context.ticket_id, "No scoping feature for prevalence query");
            return Generation::Insufficient {
                reasons: vec![
                    "特征信息不足：需要服务名称、环境、版本、地区、浏览器或接口路径中的至少一项"
                        .to_string(),
                ],
            };
        }
        if !context.time_range.is_valid() {
            return Generation::Insufficient {
                reasons: vec!["时间范围无效".to_string()],
            };
        }

        let (start, end) = self.widen(&context.time_range);
        let expression = compile_filters(&scope.filters());
        debug!(%expression, "Prevalence filter expression");

        let fields: Vec<String> = PREVALENCE_FIELDS.iter().map(|f| f.to_string()).collect();
        let query = QueryDocument::logs(
            start,
            end,
            &fields,
            expression,
            self.settings.prevalence_limit,
            context.backend_config.as_ref(),
        );

        let window = match (time::from_millis(start, self.offset), time::from_millis(end, self.offset)) {
            (Some(s), Some(e)) => TimeWindow::new(
                s,
                e,
                &format!(
                    "事发时间前后{}小时（普遍性分析）",
                    self.settings.prevalence_expand_hours
                ),
            ),
            _ => context.time_range.clone(),
        };

        info!(ticket = %context.ticket_id, "Built prevalence query");

        Generation::Ready(InstructionDocument {
            ticket_id: context.ticket_id.clone(),
            time_range: window,
            services: scope.service_name.iter().cloned().collect(),
            queries: vec![QueryInstruction {
                priority: PRIORITY_ERROR_SCAN,
                tool: TOOL_BUILDER_QUERY.to_string(),
                params: json!({ "query": query }),
                description: "普遍性分析：查询相同特征下所有用户的错误日志（不限定用户ID和设备ID）"
                    .to_string(),
            }],
            notes: vec![
                "查询不包含用户ID和设备ID过滤条件，用于统计受影响范围".to_string(),
                "查询结果保存到 prevalence_results.json 文件中".to_string(),
            ],
        })
    }

    pub fn classify(&self, results: &ResultsDocument) -> PrevalenceReport {
        let mut users = BTreeSet::new();
        let mut devices = BTreeSet::new();
        let mut countries = BTreeSet::new();
        let mut cities = BTreeSet::new();
        let mut time_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut affected_count = 0;

        for row in results.rows() {
            affected_count += 1;
            let entities = [
                (&mut users, "user.id"),
                (&mut devices, "user.client_id"),
                (&mut countries, "geo.country_name"),
                (&mut cities, "geo.city_name"),
            ];
            for (set, field) in entities {
                if let Some(v) = lookup_string(row, field) {
                    set.insert(v);
                }
            }

            let bucket = lookup_string(row, "timestamp")
                .and_then(|raw| parse_timestamp(&raw, self.offset, self.now))
                .map(|t| t.with_timezone(&self.offset).format(HOUR_BUCKET_FORMAT).to_string());
            if let Some(bucket) = bucket {
                *time_distribution.entry(bucket).or_insert(0) += 1;
            }
        }

        let counts = EntityCounts {
            rows: affected_count,
            users: users.len(),
            devices: devices.len(),
            countries: countries.len(),
            cities: cities.len(),
        };
        let level = counts.level(&self.settings.thresholds);

        let affected_countries: Vec<String> = countries.into_iter().collect();
        let affected_cities: Vec<String> = cities.into_iter().collect();
        let key_indicators = if level.is_prevalent() {
            key_indicators(&counts, &affected_countries, &affected_cities)
        } else {
            Vec::new()
        };

        info!(
            rows = counts.rows,
            users = counts.users,
            devices = counts.devices,
            level = ?level,
            "Classified prevalence"
        );

        PrevalenceReport {
            is_prevalent: level.is_prevalent(),
            level,
            affected_count,
            affected_users: users.into_iter().collect(),
            affected_devices: devices.into_iter().collect(),
            affected_countries,
            affected_cities,
            time_distribution,
            key_indicators,
            recommendation: level.recommendation().to_string(),
        }
    }
}

fn key_indicators(counts: &EntityCounts, countries: &[String], cities: &[String]) -> Vec<String> {
    let mut lines = vec![format!("影响 {} 个错误日志", counts.rows)];
    if counts.users > 0 {
        lines.push(format!("影响 {} 个不同用户", counts.users));
    }
    if counts.devices > 0 {
        lines.push(format!("影响 {} 个不同设备", counts.devices));
    }
    if counts.countries > 0 {
        let sample: Vec<&str> = countries.iter().take(5).map(String::as_str).collect();
        lines.push(format!(
            "影响 {} 个国家/地区: {}",
            counts.countries,
            sample.join(", ")
        ));
    }
    if counts.cities > 0 {
        let sample: Vec<&str> = cities.iter().take(5).map(String::as_str).collect();
        lines.push(format!("影响 {} 个城市: {}", counts.cities, sample.join(", ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2025, 1, 20, 15, 0, 0).unwrap()
    }

    fn analyzer() -> PrevalenceAnalyzer {
        PrevalenceAnalyzer::new(Settings::default(), tz(), now())
    }

    fn results(rows: Vec<Value>) -> ResultsDocument {
        serde_json::from_value(json!({"queriesExecuted": [{"result": {"rows": rows}}]})).unwrap()
    }

    fn context(info: TicketInfo) -> TicketContext {
        let start = tz().with_ymd_and_hms(2025, 1, 20, 8, 0, 0).unwrap();
        let end = tz().with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        TicketContext {
            ticket_id: "T-1".to_string(),
            ticket_info: info,
            time_range: TimeWindow::new(start, end, "test"),
            project_context: None,
            backend_config: None,
            created_at: now(),
            refinements: 0,
        }
    }

    #[test]
    fn test_twelve_devices_no_geo_is_medium() {
        let rows = (0..12)
            .map(|i| json!({"user.client_id": format!("dev-{}", i)}))
            .collect();
        let report = analyzer().classify(&results(rows));
        assert!(report.is_prevalent);
        assert_eq!(report.level, PrevalenceLevel::Medium);
        assert_eq!(report.affected_devices.len(), 12);
        assert!(report.affected_countries.is_empty());
        assert_eq!(serde_json::to_value(&report).unwrap()["level"], "medium");
    }

    #[test]
    fn test_ladder() {
        let t = PrevalenceThresholds::default();
        let counts = |rows, users, countries, cities| EntityCounts {
            rows,
            users,
            devices: 0,
            countries,
            cities,
        };
        assert_eq!(counts(1, 1, 0, 0).level(&t), PrevalenceLevel::Isolated);
        assert_eq!(counts(10, 0, 0, 0).level(&t), PrevalenceLevel::Low);
        assert_eq!(counts(0, 3, 0, 0).level(&t), PrevalenceLevel::Low);
        assert_eq!(counts(20, 0, 0, 0).level(&t), PrevalenceLevel::Medium);
        assert_eq!(counts(50, 0, 0, 0).level(&t), PrevalenceLevel::Medium);
        assert_eq!(counts(0, 10, 1, 0).level(&t), PrevalenceLevel::High);
        assert_eq!(counts(0, 10, 0, 3).level(&t), PrevalenceLevel::High);
        assert_eq!(counts(0, 10, 2, 0).level(&t), PrevalenceLevel::Critical);
        assert_eq!(counts(60, 0, 0, 5).level(&t), PrevalenceLevel::Critical);
        // geo alone does not escalate below the prevalent tier
        assert_eq!(counts(0, 5, 3, 9).level(&t), PrevalenceLevel::Medium);
    }

    #[test]
    fn test_more_users_never_lowers_level() {
        let rows_for = |users: usize| -> Vec<Value> {
            (0..users)
                .map(|i| json!({"attributes": {"user": {"id": format!("u{}", i)}}}))
                .collect()
        };
        let mut previous = PrevalenceLevel::Isolated;
        for users in 4..=10 {
            let level = analyzer().classify(&results(rows_for(users))).level;
            assert!(level >= previous, "{} users: {:?} < {:?}", users, level, previous);
            previous = level;
        }
        assert_eq!(previous, PrevalenceLevel::Medium);
    }

    #[test]
    fn test_time_distribution_and_indicators() {
        let rows = vec![
            json!({"timestamp": "2025-01-20T10:15:00+08:00", "user.id": "a", "geo.country_name": "CN"}),
            json!({"timestamp": "1737339300000", "user.id": "b", "geo.city_name": "Shanghai"}),
            json!({"timestamp": 1737342000000i64, "user.id": "c"}),
            json!({"timestamp": "not a time"}),
        ];
        let report = analyzer().classify(&results(rows));
        assert_eq!(report.affected_count, 4);
        assert_eq!(report.level, PrevalenceLevel::Low);
        assert_eq!(report.time_distribution.get("2025-01-20 10:00"), Some(&2));
        assert_eq!(report.time_distribution.get("2025-01-20 11:00"), Some(&1));
        assert_eq!(report.key_indicators[0], "影响 4 个错误日志");
        assert!(report.key_indicators.contains(&"影响 1 个国家/地区: CN".to_string()));
    }

    #[test]
    fn test_isolated_report() {
        let report = analyzer().classify(&ResultsDocument::default());
        assert!(!report.is_prevalent);
        assert_eq!(report.level, PrevalenceLevel::Isolated);
        assert!(report.key_indicators.is_empty());
        assert!(report.recommendation.starts_with("✅"));
    }

    #[test]
    fn test_query_excludes_identity_filters() {
        let mut info = TicketInfo::new("x");
        info.add_service("auth");
        info.user_info.set_id("u1");
        info.device_info.set_id("d1");
        info.region_info.country = Some("CN".to_string());
        info.client_info.browser_name = Some("Chrome".to_string());

        let doc = match analyzer().build_query(&context(info)) {
            Generation::Ready(doc) => doc,
            Generation::Insufficient { reasons } => panic!("{:?}", reasons),
        };
        let query = &doc.queries[0].params["query"];
        let expr = query["compositeQuery"]["queries"][0]["spec"]["filter"]["expression"]
            .as_str()
            .unwrap();
        assert!(expr.starts_with("severity_text IN ("));
        assert!(expr.ends_with(
            "AND service.name IN ('auth') AND geo.country_name IN ('CN') AND browser.name IN ('Chrome')"
        ));
        assert!(!expr.contains("user.id"));
        assert!(!expr.contains("user.client_id"));
        assert_eq!(query["compositeQuery"]["queries"][0]["spec"]["limit"], 500);
        assert_eq!(
            query["compositeQuery"]["queries"][0]["spec"]["selectFields"]
                .as_array()
                .unwrap()
                .len(),
            15
        );
    }

    #[test]
    fn test_widen_clamps_to_now_keeping_span() {
        let info = TicketInfo::new("x");
        let ctx = context(info);
        let (start, end) = analyzer().widen(&ctx.time_range);
        assert_eq!(end, now().timestamp_millis());
        assert_eq!(end - start, 48 * 3_600_000);

        let early = PrevalenceAnalyzer::new(
            Settings::default(),
            tz(),
            tz().with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        );
        let (start, end) = early.widen(&ctx.time_range);
        assert_eq!(start, ctx.time_range.center_millis() - 24 * 3_600_000);
        assert_eq!(end, ctx.time_range.center_millis() + 24 * 3_600_000);
    }

    #[test]
    fn test_no_scope_is_insufficient() {
        let mut info = TicketInfo::new("x");
        info.user_info.set_id("u1");
        match analyzer().build_query(&context(info)) {
            Generation::Insufficient { reasons } => assert!(reasons[0].starts_with("特征信息不足")),
            Generation::Ready(_) => panic!("expected insufficient"),
        }
    }
}
