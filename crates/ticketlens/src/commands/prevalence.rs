use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::path::Path;

use ticketlens_analysis::PrevalenceAnalyzer;
use ticketlens_core::ResultsDocument;
use ticketlens_query::Generation;
use ticketlens_store::{read_json, write_json};

use super::Project;

pub fn run(root: &Path, ticket_id: &str) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let output = prevalence(&project, ticket_id, project.now())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Classify `prevalence_results.json` when present, else emit the unscoped query
pub fn prevalence(
    project: &Project,
    ticket_id: &str,
    now: DateTime<FixedOffset>,
) -> anyhow::Result<Value> {
    let context = project.load_context(ticket_id)?;
    let ticket = project.ticket(&context.ticket_id);
    let analyzer = PrevalenceAnalyzer::new(project.settings.clone(), project.offset, now);

    if let Some(results) = read_json::<ResultsDocument>(&ticket.prevalence_results_file())? {
        let report = analyzer.classify(&results);
        write_json(&ticket.prevalence_report_file(), &report)?;
        return Ok(json!({
            "ticketId": context.ticket_id,
            "status": "classified",
            "report": report,
            "reportFile": ticket.prevalence_report_file().display().to_string(),
        }));
    }

    match analyzer.build_query(&context) {
        Generation::Ready(doc) => {
            write_json(&ticket.prevalence_instructions_file(), &doc)?;
            Ok(json!({
                "ticketId": context.ticket_id,
                "status": "pending",
                "timeRange": doc.time_range,
                "instructionsFile": ticket.prevalence_instructions_file().display().to_string(),
                "resultsFile": ticket.prevalence_results_file().display().to_string(),
            }))
        }
        Generation::Insufficient { reasons } => Ok(json!({
            "ticketId": context.ticket_id,
            "status": "insufficient",
            "reasons": reasons,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PrepareArgs;
    use crate::commands::prepare::prepare;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 20, 15, 0, 0)
            .unwrap()
    }

    fn prepared(temp: &TempDir, text: &str) -> Project {
        let project = Project::load(temp.path()).unwrap();
        let args = PrepareArgs {
            ticket_id: Some("T-1".to_string()),
            ..PrepareArgs::default()
        };
        prepare(&project, &args, text, now()).unwrap();
        project
    }

    #[test]
    fn test_query_then_classification() {
        let temp = TempDir::new().unwrap();
        let project = prepared(&temp, "服务: auth 登录异常");

        let output = prevalence(&project, "T-1", now()).unwrap();
        assert_eq!(output["status"], "pending");
        let ticket = project.ticket("T-1");
        assert!(ticket.prevalence_instructions_file().exists());

        let rows: Vec<Value> = (0..12)
            .map(|i| json!({"user.client_id": format!("dev-{}", i)}))
            .collect();
        write_json(
            &ticket.prevalence_results_file(),
            &json!({"queriesExecuted": [{"result": {"rows": rows}}]}),
        )
        .unwrap();

        let output = prevalence(&project, "T-1", now()).unwrap();
        assert_eq!(output["status"], "classified");
        assert_eq!(output["report"]["isPrevalent"], true);
        assert_eq!(output["report"]["level"], "medium");
        assert!(ticket.prevalence_report_file().exists());
    }

    #[test]
    fn test_no_features_is_insufficient() {
        let temp = TempDir::new().unwrap();
        let project = prepared(&temp, "用户ID: 123 打不开");
        let output = prevalence(&project, "T-1", now()).unwrap();
        assert_eq!(output["status"], "insufficient");
    }
}
