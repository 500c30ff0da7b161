//! Ticket identifier selection

use chrono::{DateTime, FixedOffset};
use sha2::{Digest, Sha256};
use ticketlens_store::clean_ticket_id;

/// Deterministic id from the ticket text: `ticket_<timestamp>_<hash8>`
pub fn generate_ticket_id(text: &str, now: DateTime<FixedOffset>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("ticket_{}_{}", now.format("%Y%m%d_%H%M%S"), &digest[..8])
}

/// Caller-supplied id, else the id found in the text, else a generated one
pub fn resolve_ticket_id(
    explicit: Option<&str>,
    extracted: Option<&str>,
    text: &str,
    now: DateTime<FixedOffset>,
) -> String {
    non_blank(explicit)
        .or_else(|| non_blank(extracted))
        .map(clean_ticket_id)
        .unwrap_or_else(|| generate_ticket_id(text, now))
}

fn non_blank(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 20, 10, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_generated_id_shape() {
        let id = generate_ticket_id("登录失败", now());
        assert!(id.starts_with("ticket_20250120_100509_"));
        assert_eq!(id.len(), "ticket_20250120_100509_".len() + 8);
        assert_eq!(id, generate_ticket_id("登录失败", now()));
        assert_ne!(id, generate_ticket_id("上传失败", now()));
    }

    #[test]
    fn test_resolution_order() {
        assert_eq!(resolve_ticket_id(Some("CLI-1"), Some("T-9"), "x", now()), "CLI-1");
        assert_eq!(resolve_ticket_id(None, Some("T 9"), "x", now()), "T_9");
        assert!(resolve_ticket_id(None, None, "x", now()).starts_with("ticket_"));
        assert!(resolve_ticket_id(Some("  "), None, "x", now()).starts_with("ticket_"));
    }

    #[test]
    fn test_blank_explicit_id_falls_back_to_extracted() {
        assert_eq!(resolve_ticket_id(Some("  "), Some("T-9"), "x", now()), "T-9");
        assert_eq!(resolve_ticket_id(Some(""), Some(" INC 4 "), "x", now()), "INC_4");
    }
}
