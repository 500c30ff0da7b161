//! Feature mining from query results and merge back into the ticket

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ticketlens_core::{ResultsDocument, TicketInfo};
use ticketlens_query::Refiner;

use crate::fieldpath::lookup_string;

/// Single-valued canonical fields, first value across the payload wins
const SCALAR_FIELDS: &[&str] = &[
    "user.client_id",
    "user.id",
    "geo.city_name",
    "geo.country_name",
    "browser.name",
    "browser.version",
    "service.version",
    "service.environment",
];

/// Canonical fields collected as ordered sets
const SET_FIELDS: &[&str] = &["source.address", "service.name"];

/// Signals observed in executed-query results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(rename = "user.client_id", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(rename = "user.id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "source.address", default)]
    pub source_addresses: Vec<String>,
    #[serde(rename = "geo.city_name", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "geo.country_name", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "browser.name", default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(rename = "browser.version", default, skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(rename = "service.version", default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
    #[serde(rename = "service.name", default)]
    pub services: Vec<String>,
    #[serde(rename = "service.environment", default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(rename = "rowsScanned", default)]
    pub rows_scanned: usize,
}

impl FeatureSet {
    /// Scan every row of every executed query
    pub fn extract(results: &ResultsDocument) -> Self {
        let mut features = Self::default();
        for row in results.rows() {
            features.rows_scanned += 1;
            for field in SCALAR_FIELDS {
                if let Some(slot) = features.scalar_mut(field) {
                    if slot.is_none() {
                        *slot = lookup_string(row, field);
                    }
                }
            }
            for field in SET_FIELDS {
                if let Some(value) = lookup_string(row, field) {
                    let set = features.set_mut(field);
                    if !set.contains(&value) {
                        set.push(value);
                    }
                }
            }
        }
        debug!(rows = features.rows_scanned, "Extracted features from results");
        features
    }

    pub fn is_empty(&self) -> bool {
        *self
            == Self {
                rows_scanned: self.rows_scanned,
                ..Self::default()
            }
    }

    fn scalar_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "user.client_id" => Some(&mut self.client_id),
            "user.id" => Some(&mut self.user_id),
            "geo.city_name" => Some(&mut self.city),
            "geo.country_name" => Some(&mut self.country),
            "browser.name" => Some(&mut self.browser_name),
            "browser.version" => Some(&mut self.browser_version),
            "service.version" => Some(&mut self.service_version),
            "service.environment" => Some(&mut self.environment),
            _ => None,
        }
    }

    fn set_mut(&mut self, field: &str) -> &mut Vec<String> {
        match field {
            "source.address" => &mut self.source_addresses,
            _ => &mut self.services,
        }
    }
}

/// Fill empty ticket fields from `features`; returns true if anything changed.
///
/// Populated fields are never overwritten, so merging the same features
/// twice is a no-op.
pub fn merge(info: &mut TicketInfo, features: &FeatureSet) -> bool {
    let mut changed = false;

    if info.user_info.id().is_none() {
        if let Some(id) = &features.user_id {
            info.user_info.set_id(id);
            changed = true;
        }
    }
    if info.device_info.id().is_none() {
        if let Some(id) = &features.client_id {
            info.device_info.set_id(id);
            changed = true;
        }
    }

    changed |= fill(&mut info.region_info.city, &features.city);
    changed |= fill(&mut info.region_info.country, &features.country);

    let client = &mut info.client_info;
    changed |= fill(&mut client.browser_name, &features.browser_name);
    changed |= fill(&mut client.browser_version, &features.browser_version);
    changed |= fill(&mut client.service_version, &features.service_version);
    changed |= fill(&mut client.environment, &features.environment);
    if client.source_addresses.is_empty() && !features.source_addresses.is_empty() {
        client.source_addresses = features.source_addresses.clone();
        changed = true;
    }

    if info.services.is_empty() && !features.services.is_empty() {
        for service in &features.services {
            info.add_service(service);
        }
        changed = true;
    }

    changed
}

fn fill(target: &mut Option<String>, value: &Option<String>) -> bool {
    if target.as_deref().map_or(true, |t| t.trim().is_empty()) {
        if let Some(v) = value {
            *target = Some(v.clone());
            return true;
        }
    }
    false
}

/// [`Refiner`] backed by [`FeatureSet::extract`] and [`merge`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureRefiner;

impl Refiner for FeatureRefiner {
    fn refine(&self, info: &mut TicketInfo, results: &ResultsDocument) -> bool {
        let features = FeatureSet::extract(results);
        let changed = merge(info, &features);
        info!(
            rows = features.rows_scanned,
            changed, "Merged result features into ticket"
        );
        changed
    }
}
