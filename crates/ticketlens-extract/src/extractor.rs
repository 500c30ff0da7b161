//! Rule-based extraction of `TicketInfo` from free text
//!
//! Each field has an ordered list of strategies and the first one that
//! yields a value wins. Strategy groups always run in the same order:
//! project mapping rules, generic bilingual labels, positional fallback.
//! A field that matches nothing stays empty.

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use tracing::debug;

use ticketlens_core::time::parse_timestamp;
use ticketlens_core::{BackendConfig, Sender, TicketInfo};

use crate::pathname::{normalize_api_path, resolve_pathname};
use crate::patterns::{self, labelled};

type Strategy<'s> = &'s dyn Fn(&str) -> Option<String>;

fn first_match(text: &str, strategies: &[Strategy<'_>]) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy(text))
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct FieldExtractor<'a> {
    backend: Option<&'a BackendConfig>,
    offset: FixedOffset,
    now: DateTime<FixedOffset>,
}

impl<'a> FieldExtractor<'a> {
    /// `now` anchors relative times such as 今天 or 昨天
    pub fn new(offset: FixedOffset, now: DateTime<FixedOffset>) -> Self {
        Self {
            backend: None,
            offset,
            now,
        }
    }

    /// Use the project's alias tables ahead of the generic patterns
    pub fn with_backend(mut self, backend: &'a BackendConfig) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn extract(&self, text: &str) -> TicketInfo {
        let mut info = TicketInfo::new(text);

        info.ticket_id = capture(patterns::ticket_id_re(), text);

        for service in self.services(text) {
            info.add_service(&service);
        }

        if let Some(id) = self.user_id(text) {
            info.user_info.set_id(&id);
        }
        info.user_info.username = capture(patterns::username_re(), text);
        info.user_info.email = self.email(text);

        if let Some(id) = self.device_id(text) {
            info.device_info.set_id(&id);
        }

        if let Some(path) = self.api_path(text) {
            let (pathname, resolution) = resolve_pathname(&path, self.backend);
            info.api_info.pathname = Some(pathname);
            info.api_info.resolution = Some(resolution);
            info.api_info.api_path = Some(path);
        }
        info.api_info.function_name = patterns::FUNCTION_KEYWORDS
            .iter()
            .find(|kw| text.contains(**kw))
            .map(|kw| kw.to_string());

        info.region_info.country = capture(patterns::country_re(), text);
        info.region_info.city = capture(patterns::city_re(), text);

        self.client_features(text, &mut info);
        self.times(text, &mut info);

        for sender in senders(text) {
            info.add_sender(sender);
        }

        for keyword in keywords(text) {
            info.add_keyword(keyword);
        }

        debug!(
            ticket_id = ?info.ticket_id,
            services = info.services.len(),
            has_user = !info.user_info.is_empty(),
            has_device = !info.device_info.is_empty(),
            api_path = ?info.api_info.api_path,
            keywords = info.keywords.len(),
            "extracted ticket fields"
        );

        info
    }

    fn services(&self, text: &str) -> Vec<String> {
        let mapped = || -> Vec<String> {
            let Some(backend) = self.backend else {
                return Vec::new();
            };
            let mut hits: Vec<(usize, &str)> = backend
                .service_name_mapping
                .iter()
                .filter_map(|(alias, canonical)| text.find(alias.as_str()).map(|pos| (pos, canonical.as_str())))
                .collect();
            hits.sort_by_key(|(pos, _)| *pos);
            hits.into_iter().map(|(_, canonical)| canonical.to_string()).collect()
        };

        let labelled_services = || -> Vec<String> {
            patterns::service_re()
                .captures_iter(text)
                .filter_map(|cap| cap.get(1))
                .flat_map(|m| {
                    m.as_str()
                        .split([',', '，', '、'])
                        .map(|s| s.trim().to_string())
                        .collect::<Vec<_>>()
                })
                .filter(|s| !s.is_empty())
                .map(|s| match self.backend.and_then(|b| b.canonical_service(&s)) {
                    Some(canonical) => canonical.to_string(),
                    None => s,
                })
                .collect()
        };

        let strategies: [&dyn Fn() -> Vec<String>; 2] = [&mapped, &labelled_services];
        strategies
            .iter()
            .map(|strategy| strategy())
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    fn user_id(&self, text: &str) -> Option<String> {
        let mapped = |t: &str| self.mapped_value(t, &["user_id"], "user.id");
        let generic = |t: &str| capture(patterns::user_id_re(), t);
        let strategies: [Strategy<'_>; 2] = [&mapped, &generic];
        first_match(text, &strategies)
    }

    fn device_id(&self, text: &str) -> Option<String> {
        let mapped = |t: &str| self.mapped_value(t, &["client_id", "device_id"], "user.client_id");
        let generic = |t: &str| capture(patterns::device_id_re(), t);
        let strategies: [Strategy<'_>; 2] = [&mapped, &generic];
        first_match(text, &strategies)
    }

    fn email(&self, text: &str) -> Option<String> {
        let generic = |t: &str| capture(patterns::email_label_re(), t);
        let fallback = |t: &str| {
            t.lines()
                .filter(|line| !patterns::header_re().is_match(line))
                .find_map(|line| patterns::email_re().find(line))
                .map(|m| m.as_str().to_string())
        };
        let strategies: [Strategy<'_>; 2] = [&generic, &fallback];
        first_match(text, &strategies)
    }

    fn api_path(&self, text: &str) -> Option<String> {
        let generic = |t: &str| {
            capture(patterns::api_re(), t).and_then(|value| normalize_api_path(&value))
        };
        let url = |t: &str| {
            patterns::url_re()
                .find_iter(t)
                .find_map(|m| normalize_api_path(m.as_str()))
        };
        let fallback = |t: &str| capture(patterns::bare_path_re(), t);
        let strategies: [Strategy<'_>; 3] = [&generic, &url, &fallback];
        first_match(text, &strategies)
    }

    /// Labels declared by the project under any of `categories`, or mapped to
    /// `canonical`, searched in table order
    fn mapped_value(&self, text: &str, categories: &[&str], canonical: &str) -> Option<String> {
        let backend = self.backend?;
        let labels: Vec<&str> = backend
            .field_extraction_rules
            .iter()
            .flat_map(|(category, rules)| {
                let in_category = categories.contains(&category.as_str());
                rules
                    .iter()
                    .filter(move |(_, field)| in_category || field.as_str() == canonical)
                    .map(|(label, _)| label.as_str())
            })
            .collect();
        if labels.is_empty() {
            return None;
        }

        let re = labelled(&labels, r"[A-Za-z0-9_.@\-]+").ok()?;
        capture(&re, text)
    }

    fn client_features(&self, text: &str, info: &mut TicketInfo) {
        if let Some(browser) = capture(patterns::browser_re(), text) {
            let split = browser.find(|c: char| c.is_ascii_digit());
            match split {
                Some(pos) => {
                    let name = browser[..pos].trim_end_matches([' ', '/']).to_string();
                    info.client_info.browser_name = Some(name);
                    info.client_info.browser_version = Some(browser[pos..].to_string());
                }
                None => info.client_info.browser_name = Some(browser),
            }
        }
        info.client_info.service_version = capture(patterns::app_version_re(), text);
        info.client_info.environment = capture(patterns::environment_re(), text);
    }

    fn times(&self, text: &str, info: &mut TicketInfo) {
        for (kind, re) in patterns::time_res() {
            for cap in re.captures_iter(text) {
                let Some(raw) = cap.get(1) else {
                    continue;
                };
                match parse_timestamp(raw.as_str(), self.offset, self.now) {
                    Some(t) => info.time_info.push(*kind, t),
                    None => debug!(value = raw.as_str(), "unparseable time signal skipped"),
                }
            }
        }
    }
}

/// Participants named on mail header lines, split on `,` and `;`
fn senders(text: &str) -> Vec<Sender> {
    let mut found = Vec::new();
    for cap in patterns::header_re().captures_iter(text) {
        let Some(value) = cap.get(1) else {
            continue;
        };
        for part in value.as_str().split([',', ';', '，', '；']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            found.push(parse_participant(part));
        }
    }
    found
}

fn parse_participant(part: &str) -> Sender {
    if let Some(cap) = patterns::named_address_re().captures(part) {
        let name = cap[1].trim().trim_matches(['"', '\'']).trim();
        return Sender {
            name: (!name.is_empty()).then(|| name.to_string()),
            email: Some(cap[2].trim().to_string()),
        };
    }

    if patterns::email_re().is_match(part) {
        Sender {
            name: None,
            email: Some(part.to_string()),
        }
    } else {
        Sender {
            name: Some(part.to_string()),
            email: None,
        }
    }
}

/// Classification tags in table order, error family first
fn keywords(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    patterns::ERROR_KEYWORDS
        .iter()
        .chain(patterns::SERVICE_KEYWORDS.iter())
        .filter(|kw| lowered.contains(&kw.to_lowercase()))
        .copied()
        .collect()
}
