use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

use ticketlens_analysis::{diagnose, FeatureRefiner, FeatureSet, LogSummary};
use ticketlens_core::ResultsDocument;
use ticketlens_query::{Generation, QueryGenerator};
use ticketlens_store::{read_json, write_json};

use super::Project;

pub fn run(root: &Path, ticket_id: &str) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let output = refine(&project, ticket_id, project.now())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One refinement pass over `results.json`.
///
/// Absent results are `pending`; results without rows produce a diagnostics
/// report; otherwise the rows are summarized and mined features narrow the
/// next instruction document.
pub fn refine(project: &Project, ticket_id: &str, now: DateTime<FixedOffset>) -> anyhow::Result<Value> {
    let mut context = project.load_context(ticket_id)?;
    let ticket = project.ticket(&context.ticket_id);

    let Some(results) = read_json::<ResultsDocument>(&ticket.results_file())? else {
        return Ok(json!({
            "ticketId": context.ticket_id,
            "status": "pending",
            "resultsFile": ticket.results_file().display().to_string(),
        }));
    };

    if results.row_count() == 0 {
        let report = diagnose(&context, &results, project.settings.expansion_hours);
        write_json(&ticket.diagnostics_file(), &report)?;
        return Ok(json!({
            "ticketId": context.ticket_id,
            "status": "empty",
            "diagnostics": report,
            "diagnosticsFile": ticket.diagnostics_file().display().to_string(),
        }));
    }

    let features = FeatureSet::extract(&results);
    write_json(&ticket.features_file(), &features)?;
    let summary = LogSummary::from_results(&results);
    write_json(&ticket.summary_file(), &summary)?;

    let before = context.refinements;
    let generation = QueryGenerator::new(project.settings.clone(), now).generate_refined(
        &mut context,
        &results,
        &FeatureRefiner,
    );
    write_json(&ticket.context_file(), &context)?;

    let mut output = json!({
        "ticketId": context.ticket_id,
        "rows": results.row_count(),
        "features": features,
        "summary": summary,
        "changed": context.refinements > before,
        "refinements": context.refinements,
    });
    match &generation {
        Generation::Ready(doc) => {
            write_json(&ticket.instructions_file(), doc)?;
            output["status"] = json!("refined");
            output["queries"] = json!(doc.queries.len());
            output["instructionsFile"] = json!(ticket.instructions_file().display().to_string());
        }
        Generation::Insufficient { reasons } => {
            output["status"] = json!("insufficient");
            output["reasons"] = json!(reasons);
        }
    }
    info!(ticket = %context.ticket_id, pass = context.refinements, "Refinement pass complete");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PrepareArgs;
    use crate::commands::prepare::prepare;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use ticketlens_core::TicketContext;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 20, 15, 0, 0)
            .unwrap()
    }

    fn prepared(temp: &TempDir) -> Project {
        let project = Project::load(temp.path()).unwrap();
        let args = PrepareArgs {
            ticket_id: Some("T-1".to_string()),
            ..PrepareArgs::default()
        };
        prepare(&project, &args, "服务: auth 登录异常，工单时间：2025-01-20 10:00:00", now())
            .unwrap();
        project
    }

    #[test]
    fn test_pending_without_results() {
        let temp = TempDir::new().unwrap();
        let project = prepared(&temp);
        let output = refine(&project, "T-1", now()).unwrap();
        assert_eq!(output["status"], "pending");
    }

    #[test]
    fn test_empty_rows_write_diagnostics() {
        let temp = TempDir::new().unwrap();
        let project = prepared(&temp);
        let ticket = project.ticket("T-1");
        write_json(
            &ticket.results_file(),
            &json!({"queriesExecuted": [{"result": {"rows": []}}]}),
        )
        .unwrap();

        let output = refine(&project, "T-1", now()).unwrap();
        assert_eq!(output["status"], "empty");
        assert!(ticket.diagnostics_file().exists());
        let advisories = output["diagnostics"]["advisories"].as_array().unwrap();
        assert!(advisories
            .iter()
            .any(|a| a.as_str().unwrap().starts_with("缺少用户ID")));
    }

    #[test]
    fn test_rows_refine_context_once() {
        let temp = TempDir::new().unwrap();
        let project = prepared(&temp);
        let ticket = project.ticket("T-1");
        write_json(
            &ticket.results_file(),
            &json!({"queriesExecuted": [{"result": {"rows": [
                {"attributes": {"user.id": "u-42", "user.client_id": "dev-7"}},
                {"severity_text": "ERROR", "body": "login timeout", "service.name": "auth"}
            ]}}]}),
        )
        .unwrap();

        let output = refine(&project, "T-1", now()).unwrap();
        assert_eq!(output["status"], "refined");
        assert_eq!(output["changed"], true);
        assert!(ticket.features_file().exists());
        assert!(ticket.summary_file().exists());
        assert_eq!(output["summary"]["errorCount"], 1);
        assert_eq!(output["summary"]["errorTypes"]["timeout"], 1);

        let context: TicketContext = read_json(&ticket.context_file()).unwrap().unwrap();
        assert_eq!(context.ticket_info.user_info.id(), Some("u-42"));
        assert_eq!(context.refinements, 1);

        let again = refine(&project, "T-1", now()).unwrap();
        assert_eq!(again["changed"], false);
        assert_eq!(again["refinements"], 1);
    }
}
