use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;
use tracing::info;

use ticketlens_core::time::parse_explicit;
use ticketlens_core::ExplicitRange;
use ticketlens_query::{ContextBuilder, Generation, QueryGenerator};
use ticketlens_store::write_json;

use super::Project;
use crate::cli::PrepareArgs;

pub fn run(root: &Path, args: &PrepareArgs) -> anyhow::Result<()> {
    let project = Project::load(root)?;
    let text = read_ticket_text(args)?;
    let output = prepare(&project, args, &text, project.now())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_ticket_text(args: &PrepareArgs) -> anyhow::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(file) = &args.file {
        return std::fs::read_to_string(file)
            .with_context(|| format!("reading ticket file {}", file.display()));
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    if text.trim().is_empty() {
        anyhow::bail!("No ticket text given. Pass it as an argument, with --file, or on stdin.");
    }
    Ok(text)
}

/// Build and persist the ticket context and its first instruction document
pub fn prepare(
    project: &Project,
    args: &PrepareArgs,
    text: &str,
    now: DateTime<FixedOffset>,
) -> anyhow::Result<Value> {
    let explicit = ExplicitRange {
        start: args
            .start_time
            .as_deref()
            .map(|raw| parse_explicit(raw, project.offset, now))
            .transpose()
            .context("invalid --start-time")?,
        end: args
            .end_time
            .as_deref()
            .map(|raw| parse_explicit(raw, project.offset, now))
            .transpose()
            .context("invalid --end-time")?,
    };

    let context = ContextBuilder::new(project.settings.clone(), now)
        .project(project.project_context.clone())
        .backend(project.backend_config.clone())
        .explicit_range(explicit)
        .ticket_id(args.ticket_id.clone())
        .services(args.services.clone())
        .build(text)?;

    let ticket = project.ticket(&context.ticket_id);
    write_json(&ticket.context_file(), &context)?;

    let generation = QueryGenerator::new(project.settings.clone(), now).generate(&context);
    let mut output = json!({
        "ticketId": context.ticket_id,
        "timeRange": context.time_range,
        "services": context.ticket_info.services,
        "contextFile": ticket.context_file().display().to_string(),
    });

    match &generation {
        Generation::Ready(doc) => {
            write_json(&ticket.instructions_file(), doc)?;
            info!(ticket = %context.ticket_id, queries = doc.queries.len(), "Prepared ticket");
            output["status"] = json!("ready");
            output["queries"] = json!(doc.queries.len());
            output["instructionsFile"] = json!(ticket.instructions_file().display().to_string());
            output["resultsFile"] = json!(ticket.results_file().display().to_string());
        }
        Generation::Insufficient { reasons } => {
            output["status"] = json!("insufficient");
            output["reasons"] = json!(reasons);
        }
    }
    Ok(output)
}
