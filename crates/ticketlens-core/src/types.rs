//! Incident data model: extracted ticket info, query window and context

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, ProjectContext};
use crate::time;

/// User identity extracted from a ticket or mined from backend rows.
///
/// The id is held under the alias used in ticket text (`user_id`) and under
/// the backend's canonical field (`user.id`); [`UserInfo::set_id`] keeps both
/// in step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "user.id", default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserInfo {
    pub fn set_id(&mut self, id: &str) {
        self.user_id = Some(id.to_string());
        self.canonical_id = Some(id.to_string());
    }

    pub fn id(&self) -> Option<&str> {
        self.canonical_id.as_deref().or(self.user_id.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.id().is_none() && self.username.is_none() && self.email.is_none()
    }
}

/// Client/device identity, dual-keyed like [`UserInfo`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(
        rename = "user.client_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub canonical_id: Option<String>,
}

impl DeviceInfo {
    pub fn set_id(&mut self, id: &str) {
        self.device_id = Some(id.to_string());
        self.client_id = Some(id.to_string());
        self.canonical_id = Some(id.to_string());
    }

    pub fn id(&self) -> Option<&str> {
        self.canonical_id
            .as_deref()
            .or(self.client_id.as_deref())
            .or(self.device_id.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.id().is_none()
    }
}

/// How an API path was turned into the backend pathname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathResolution {
    /// Exact entry in the project's pathname mapping
    Mapping,
    /// Prefixed with the path component of the configured base URL
    BaseUrl,
    /// Used as written
    AsIs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<PathResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl ApiInfo {
    /// Path to filter on: resolved pathname if known, else the raw path
    pub fn query_path(&self) -> Option<&str> {
        self.pathname.as_deref().or(self.api_path.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Category of a time signal found in ticket text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKind {
    Ticket,
    Email,
    Problem,
}

/// Time signals, one sorted and deduplicated list per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ticket_times: Vec<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_times: Vec<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problem_times: Vec<DateTime<FixedOffset>>,
}

impl TimeInfo {
    pub fn push(&mut self, kind: TimeKind, t: DateTime<FixedOffset>) {
        let list = match kind {
            TimeKind::Ticket => &mut self.ticket_times,
            TimeKind::Email => &mut self.email_times,
            TimeKind::Problem => &mut self.problem_times,
        };
        if let Err(pos) = list.binary_search(&t) {
            list.insert(pos, t);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticket_times.is_empty() && self.email_times.is_empty() && self.problem_times.is_empty()
    }
}

/// A mail participant named in the ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Client-side features, usually learned from backend rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_addresses: Vec<String>,
}

/// Structured understanding of one incident report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub device_info: DeviceInfo,
    #[serde(default)]
    pub api_info: ApiInfo,
    #[serde(default)]
    pub region_info: RegionInfo,
    #[serde(default)]
    pub time_info: TimeInfo,
    #[serde(default)]
    pub senders_info: Vec<Sender>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub client_info: ClientInfo,
}

impl TicketInfo {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Self::default()
        }
    }

    /// Add a service name, keeping discovery order and dropping duplicates
    pub fn add_service(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.services.iter().any(|s| s == name) {
            self.services.push(name.to_string());
        }
    }

    pub fn add_keyword(&mut self, keyword: &str) {
        if !self.keywords.iter().any(|k| k == keyword) {
            self.keywords.push(keyword.to_string());
        }
    }

    pub fn add_sender(&mut self, sender: Sender) {
        if !self.senders_info.contains(&sender) {
            self.senders_info.push(sender);
        }
    }
}

/// Resolved query window in epoch milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
    pub start_display: String,
    pub end_display: String,
    /// Which rule produced the window
    pub source: String,
}

impl TimeWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>, source: &str) -> Self {
        Self {
            start: start.timestamp_millis(),
            end: end.timestamp_millis(),
            start_display: time::display(&start),
            end_display: time::display(&end),
            source: source.to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start > 0 && self.end > 0 && self.start < self.end
    }

    pub fn width_hours(&self) -> f64 {
        (self.end - self.start) as f64 / 3_600_000.0
    }

    pub fn center_millis(&self) -> i64 {
        self.start + (self.end - self.start) / 2
    }
}

/// Persisted unit of work for one incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketContext {
    pub ticket_id: String,
    pub ticket_info: TicketInfo,
    pub time_range: TimeWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<ProjectContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_config: Option<BackendConfig>,
    pub created_at: DateTime<FixedOffset>,
    /// Number of refinement merges applied to `ticket_info`
    #[serde(default)]
    pub refinements: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_user_id_is_dual_keyed() {
        let mut user = UserInfo::default();
        assert!(user.is_empty());
        user.set_id("u-42");

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["user_id"], "u-42");
        assert_eq!(json["user.id"], "u-42");
        assert_eq!(user.id(), Some("u-42"));
    }

    #[test]
    fn test_device_id_is_keyed_three_ways() {
        let mut device = DeviceInfo::default();
        device.set_id("dev-9");

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["device_id"], "dev-9");
        assert_eq!(json["client_id"], "dev-9");
        assert_eq!(json["user.client_id"], "dev-9");
    }

    #[test]
    fn test_time_info_sorted_and_deduplicated() {
        let mut info = TimeInfo::default();
        let late = cst().with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        let early = cst().with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap();

        info.push(TimeKind::Problem, late);
        info.push(TimeKind::Problem, early);
        info.push(TimeKind::Problem, late);

        assert_eq!(info.problem_times, vec![early, late]);
        assert!(info.ticket_times.is_empty());
    }

    #[test]
    fn test_services_keep_discovery_order() {
        let mut info = TicketInfo::new("text");
        info.add_service("user-service");
        info.add_service("pay-service");
        info.add_service("user-service");
        info.add_service("  ");
        assert_eq!(info.services, vec!["user-service", "pay-service"]);
    }

    #[test]
    fn test_ticket_info_camel_case_keys() {
        let mut info = TicketInfo::new("desc");
        info.ticket_id = Some("T-1".to_string());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["ticketId"], "T-1");
        assert!(json.get("userInfo").is_some());
        assert!(json.get("timeInfo").is_some());
    }

    #[test]
    fn test_window_display_and_width() {
        let start = cst().with_ymd_and_hms(2025, 1, 20, 8, 0, 0).unwrap();
        let end = cst().with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        let window = TimeWindow::new(start, end, "test");

        assert_eq!(window.start_display, "2025-01-20 08:00:00");
        assert_eq!(window.end_display, "2025-01-20 12:00:00");
        assert!(window.is_valid());
        assert_eq!(window.width_hours(), 4.0);
        assert_eq!(
            window.center_millis(),
            cst()
                .with_ymd_and_hms(2025, 1, 20, 10, 0, 0)
                .unwrap()
                .timestamp_millis()
        );
    }
}
