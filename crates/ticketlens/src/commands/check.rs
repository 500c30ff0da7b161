use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

use ticketlens_core::{missing_fields, BACKEND_CONFIG_REQUIRED, PROJECT_CONTEXT_REQUIRED};
use ticketlens_store::{read_json, Paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let report = check(&Paths::new(root))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Required-field report for both configuration documents
pub fn check(paths: &Paths) -> anyhow::Result<Value> {
    let project = check_file(paths.project_context_file(), PROJECT_CONTEXT_REQUIRED)?;
    let backend = check_file(paths.backend_config_file(), BACKEND_CONFIG_REQUIRED)?;
    let ready = project["complete"] == true && backend["complete"] == true;

    Ok(json!({
        "ready": ready,
        "projectContext": project,
        "backendConfig": backend,
    }))
}

fn check_file(file: PathBuf, required: &[&str]) -> anyhow::Result<Value> {
    let doc: Option<Value> = read_json(&file)?;
    let (exists, missing) = match &doc {
        Some(doc) => (true, missing_fields(doc, required)),
        None => (false, required.iter().map(|k| k.to_string()).collect()),
    };
    if !missing.is_empty() {
        warn!(file = %file.display(), ?missing, "Configuration incomplete");
    }

    Ok(json!({
        "file": file.display().to_string(),
        "exists": exists,
        "complete": missing.is_empty(),
        "missing": missing,
    }))
}
