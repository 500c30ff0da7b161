//! Label tables and compiled patterns for ticket text
//!
//! Labels are bilingual. Within a table, longer labels come first so that
//! alternation prefers `API路径` over `API`.

use regex::Regex;
use std::sync::OnceLock;
use ticketlens_core::TimeKind;

pub(crate) const TICKET_ID_LABELS: &[&str] = &["工单编号", "工单ID", "工单号", "Ticket ID", "TicketID"];

pub(crate) const SERVICE_LABELS: &[&str] = &["服务名称", "服务名", "服务", "Service Name", "Service"];

pub(crate) const USER_ID_LABELS: &[&str] = &[
    "用户编号", "用户ID", "用户号", "User ID", "UserID", "user_id", "UID",
];

pub(crate) const USERNAME_LABELS: &[&str] = &["用户名称", "用户名", "User Name", "Username"];

pub(crate) const EMAIL_LABELS: &[&str] = &["用户邮箱", "邮箱", "E-mail", "Email"];

pub(crate) const DEVICE_ID_LABELS: &[&str] = &[
    "设备编号", "设备ID", "设备号", "客户端ID", "Device ID", "DeviceID", "Client ID", "ClientID",
    "client_id",
];

pub(crate) const API_LABELS: &[&str] = &[
    "接口路径", "接口地址", "接口", "API路径", "API Path", "ApiPath", "API", "URL", "请求路径",
];

pub(crate) const COUNTRY_LABELS: &[&str] = &["国家", "Country"];

pub(crate) const CITY_LABELS: &[&str] = &["城市", "City"];

pub(crate) const BROWSER_LABELS: &[&str] = &["浏览器", "Browser"];

pub(crate) const APP_VERSION_LABELS: &[&str] = &["应用版本", "客户端版本", "版本号", "App Version", "Version"];

pub(crate) const ENVIRONMENT_LABELS: &[&str] = &["运行环境", "环境", "Environment", "Env"];

/// Business functions, checked in table order
pub(crate) const FUNCTION_KEYWORDS: &[&str] = &[
    "登录", "注册", "上传", "下载", "支付", "查询", "删除", "更新", "同步", "分享",
];

/// Error-family classification tags, in discovery order
pub(crate) const ERROR_KEYWORDS: &[&str] = &[
    "错误", "异常", "失败", "超时", "500", "404", "502", "503", "error", "exception", "fail",
    "timeout",
];

/// Service-family classification tags
pub(crate) const SERVICE_KEYWORDS: &[&str] = &["服务", "接口", "API", "service"];

struct TimeLabels {
    kind: TimeKind,
    labels: &'static [&'static str],
}

const TIME_LABEL_MAP: &[TimeLabels] = &[
    TimeLabels {
        kind: TimeKind::Ticket,
        labels: &[
            "工单创建时间", "工单时间", "上报时间", "创建时间", "提交时间", "工单创建", "工单提交",
            "Ticket Time", "Reported At", "Created At",
        ],
    },
    TimeLabels {
        kind: TimeKind::Email,
        labels: &[
            "邮件时间", "发送时间", "收到时间", "邮件发送", "邮件收到", "Sent", "Date",
        ],
    },
    TimeLabels {
        kind: TimeKind::Problem,
        labels: &["发生时间", "出现时间", "异常时间", "问题时间", "Occurred At"],
    },
];

const ID_VALUE: &str = r"[A-Za-z0-9_.@\-]+";
const TEXT_VALUE: &str = r"[^\s,，;；。、)）]+";
const LIST_VALUE: &str = r"[A-Za-z0-9_.\-]+(?:\s*[,，、]\s*[A-Za-z0-9_.\-]+)*";
const PATH_VALUE: &str = r"(?:https?://[^\s，。]+|/[A-Za-z0-9_.\-]+(?:/[A-Za-z0-9_.\-{}:]*)*|[A-Za-z0-9_.\-]+(?:/[A-Za-z0-9_.\-{}:]*)+)";
const TIME_VALUE: &str = r"(?:\d{4}[-/]\d{1,2}[-/]\d{1,2}(?:[ T]\d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?|\d{19}|\d{16}|\d{13}|\d{10}|(?:今天|刚才|刚刚|昨天)\s*(?:\d{1,2}:\d{2}(?::\d{2})?)?|\d{1,2}:\d{2}(?::\d{2})?)";

static TICKET_ID_RE: OnceLock<Regex> = OnceLock::new();
static SERVICE_RE: OnceLock<Regex> = OnceLock::new();
static USER_ID_RE: OnceLock<Regex> = OnceLock::new();
static USERNAME_RE: OnceLock<Regex> = OnceLock::new();
static EMAIL_LABEL_RE: OnceLock<Regex> = OnceLock::new();
static DEVICE_ID_RE: OnceLock<Regex> = OnceLock::new();
static API_RE: OnceLock<Regex> = OnceLock::new();
static COUNTRY_RE: OnceLock<Regex> = OnceLock::new();
static CITY_RE: OnceLock<Regex> = OnceLock::new();
static BROWSER_RE: OnceLock<Regex> = OnceLock::new();
static APP_VERSION_RE: OnceLock<Regex> = OnceLock::new();
static ENVIRONMENT_RE: OnceLock<Regex> = OnceLock::new();
static TIME_RES: OnceLock<Vec<(TimeKind, Regex)>> = OnceLock::new();

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static URL_RE: OnceLock<Regex> = OnceLock::new();
static BARE_PATH_RE: OnceLock<Regex> = OnceLock::new();
static HEADER_RE: OnceLock<Regex> = OnceLock::new();
static NAMED_ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

/// Build `<label> : <value>` with the value in capture group 1
pub(crate) fn labelled(labels: &[&str], value: &str) -> Result<Regex, regex::Error> {
    let alternation = labels
        .iter()
        .map(|label| regex::escape(label).replace(' ', r"\s*"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?i)(?:^|[^A-Za-z])(?:{})\s*[:：=]\s*({})",
        alternation, value
    ))
}

pub(crate) fn ticket_id_re() -> &'static Regex {
    TICKET_ID_RE.get_or_init(|| labelled(TICKET_ID_LABELS, r"[A-Za-z0-9_\-]+").unwrap())
}

pub(crate) fn service_re() -> &'static Regex {
    SERVICE_RE.get_or_init(|| labelled(SERVICE_LABELS, LIST_VALUE).unwrap())
}

pub(crate) fn user_id_re() -> &'static Regex {
    USER_ID_RE.get_or_init(|| labelled(USER_ID_LABELS, ID_VALUE).unwrap())
}

pub(crate) fn username_re() -> &'static Regex {
    USERNAME_RE.get_or_init(|| labelled(USERNAME_LABELS, TEXT_VALUE).unwrap())
}

pub(crate) fn email_label_re() -> &'static Regex {
    EMAIL_LABEL_RE.get_or_init(|| {
        labelled(EMAIL_LABELS, r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap()
    })
}

pub(crate) fn device_id_re() -> &'static Regex {
    DEVICE_ID_RE.get_or_init(|| labelled(DEVICE_ID_LABELS, ID_VALUE).unwrap())
}

pub(crate) fn api_re() -> &'static Regex {
    API_RE.get_or_init(|| labelled(API_LABELS, PATH_VALUE).unwrap())
}

pub(crate) fn country_re() -> &'static Regex {
    COUNTRY_RE.get_or_init(|| labelled(COUNTRY_LABELS, TEXT_VALUE).unwrap())
}

pub(crate) fn city_re() -> &'static Regex {
    CITY_RE.get_or_init(|| labelled(CITY_LABELS, TEXT_VALUE).unwrap())
}

pub(crate) fn browser_re() -> &'static Regex {
    BROWSER_RE
        .get_or_init(|| labelled(BROWSER_LABELS, r"[A-Za-z]+(?:\s*/?\s*\d+(?:\.\d+)*)?").unwrap())
}

pub(crate) fn app_version_re() -> &'static Regex {
    APP_VERSION_RE.get_or_init(|| labelled(APP_VERSION_LABELS, r"v?\d+(?:\.\d+)*[A-Za-z0-9\-]*").unwrap())
}

pub(crate) fn environment_re() -> &'static Regex {
    ENVIRONMENT_RE.get_or_init(|| labelled(ENVIRONMENT_LABELS, r"[A-Za-z][A-Za-z0-9_\-]*").unwrap())
}

/// One pattern per time category, each matching every occurrence
pub(crate) fn time_res() -> &'static [(TimeKind, Regex)] {
    TIME_RES.get_or_init(|| {
        TIME_LABEL_MAP
            .iter()
            .map(|entry| {
                let alternation = entry
                    .labels
                    .iter()
                    .map(|label| regex::escape(label).replace(' ', r"\s*"))
                    .collect::<Vec<_>>()
                    .join("|");
                let re = Regex::new(&format!(
                    r"(?i)(?:^|[^A-Za-z])(?:{})\s*[:：=]?\s*({})",
                    alternation, TIME_VALUE
                ))
                .unwrap();
                (entry.kind, re)
            })
            .collect()
    })
}

pub(crate) fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap())
}

pub(crate) fn url_re() -> &'static Regex {
    URL_RE.get_or_init(|| Regex::new(r"https?://[^\s，。,;；]+").unwrap())
}

/// Positional fallback: a token that begins with `/`
pub(crate) fn bare_path_re() -> &'static Regex {
    BARE_PATH_RE.get_or_init(|| {
        Regex::new(r#"(?:^|[\s:：（(,，"'“])(/[A-Za-z0-9_\-]+(?:/[A-Za-z0-9_.\-]+)*)"#).unwrap()
    })
}

/// Mail header line naming participants
pub(crate) fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:From|To|Cc|发件人|收件人|抄送)\s*[:：]\s*(.+)$").unwrap()
    })
}

/// `Name <address>`
pub(crate) fn named_address_re() -> &'static Regex {
    NAMED_ADDRESS_RE.get_or_init(|| Regex::new(r"^(.*?)\s*<([^>]+)>$").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_requires_separator() {
        let re = user_id_re();
        assert!(re.captures("用户ID：u_123").is_some());
        assert!(re.captures("User ID: u_123").is_some());
        assert!(re.captures("用户ID异常").is_none());
    }

    #[test]
    fn test_label_needs_word_boundary() {
        assert!(user_id_re().captures("GUID: abc").is_none());
        assert_eq!(&user_id_re().captures("uid=42").unwrap()[1], "42");
    }

    #[test]
    fn test_longer_api_label_wins() {
        let cap = api_re().captures("API路径: /v1/login").unwrap();
        assert_eq!(&cap[1], "/v1/login");
    }

    #[test]
    fn test_time_patterns_cover_every_category() {
        let kinds: Vec<TimeKind> = time_res().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![TimeKind::Ticket, TimeKind::Email, TimeKind::Problem]);
    }

    #[test]
    fn test_bare_path_ignores_dates() {
        assert!(bare_path_re().captures("2025/01/20 出错").is_none());
        let cap = bare_path_re().captures("调用 /api/user/info 失败").unwrap();
        assert_eq!(&cap[1], "/api/user/info");
    }
}
