use serde_json::{json, Value};
use std::path::Path;

use ticketlens_store::{Paths, TicketPaths};

pub fn run(root: &Path, ticket_id: Option<&str>) -> anyhow::Result<()> {
    let paths = Paths::new(root);
    let output = match ticket_id {
        Some(id) => ticket_status(id, &paths.ticket(id)),
        None => {
            let tickets: Vec<Value> = paths
                .list_tickets()?
                .iter()
                .map(|id| ticket_status(id, &paths.ticket(id)))
                .collect();
            json!({
                "stateDir": paths.root.display().to_string(),
                "configured": paths.project_context_file().exists()
                    && paths.backend_config_file().exists(),
                "tickets": tickets,
            })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Most advanced stage reached by a ticket, judged by which documents exist
fn stage(ticket: &TicketPaths) -> &'static str {
    if ticket.prevalence_report_file().exists() {
        "prevalence_classified"
    } else if ticket.prevalence_instructions_file().exists() {
        "prevalence_pending"
    } else if ticket.features_file().exists() {
        "refined"
    } else if ticket.diagnostics_file().exists() {
        "empty_results"
    } else if ticket.results_file().exists() {
        "results_available"
    } else if ticket.instructions_file().exists() {
        "awaiting_results"
    } else if ticket.context_file().exists() {
        "prepared"
    } else {
        "unknown"
    }
}

fn ticket_status(id: &str, ticket: &TicketPaths) -> Value {
    let files = [
        ("context", ticket.context_file()),
        ("instructions", ticket.instructions_file()),
        ("results", ticket.results_file()),
        ("features", ticket.features_file()),
        ("summary", ticket.summary_file()),
        ("diagnostics", ticket.diagnostics_file()),
        ("prevalenceInstructions", ticket.prevalence_instructions_file()),
        ("prevalenceResults", ticket.prevalence_results_file()),
        ("prevalenceReport", ticket.prevalence_report_file()),
    ];
    let present: serde_json::Map<String, Value> = files
        .iter()
        .map(|(name, path)| (name.to_string(), json!(path.exists())))
        .collect();

    json!({
        "ticketId": id,
        "stage": stage(ticket),
        "files": present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use ticketlens_store::write_json;

    #[test]
    fn test_stage_progression() {
        let temp = TempDir::new().unwrap();
        let ticket = Paths::new(temp.path()).ticket("T-1");
        assert_eq!(stage(&ticket), "unknown");

        write_json(&ticket.context_file(), &json!({})).unwrap();
        assert_eq!(stage(&ticket), "prepared");
        write_json(&ticket.instructions_file(), &json!({})).unwrap();
        assert_eq!(stage(&ticket), "awaiting_results");
        write_json(&ticket.results_file(), &json!({})).unwrap();
        assert_eq!(stage(&ticket), "results_available");
        write_json(&ticket.features_file(), &json!({})).unwrap();
        assert_eq!(stage(&ticket), "refined");
        write_json(&ticket.prevalence_report_file(), &json!({})).unwrap();
        assert_eq!(stage(&ticket), "prevalence_classified");
    }

    #[test]
    fn test_status_lists_files() {
        let temp = TempDir::new().unwrap();
        let ticket = Paths::new(temp.path()).ticket("T-1");
        write_json(&ticket.context_file(), &json!({})).unwrap();
        let status = ticket_status("T-1", &ticket);
        assert_eq!(status["files"]["context"], true);
        assert_eq!(status["files"]["results"], false);
        assert!(run(temp.path(), None).is_ok());
    }
}
