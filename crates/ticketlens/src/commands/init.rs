use serde_json::{json, Value};
use std::path::Path;

use ticketlens_core::schema::DEFAULT_QUERY_FIELDS;
use ticketlens_core::Settings;
use ticketlens_store::{write_json, Paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let paths = Paths::new(root);
    let written = write_templates(&paths)?;

    let output = json!({
        "stateDir": paths.root.display().to_string(),
        "files": written
            .iter()
            .map(|(file, created)| json!({"file": file, "created": created}))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    println!("\nFill in project_context.json and backend_config.json, then run `ticketlens check`.");
    Ok(())
}

/// Write each missing template; returns `(file name, created)` per template
fn write_templates(paths: &Paths) -> anyhow::Result<Vec<(String, bool)>> {
    let templates = [
        (paths.project_context_file(), project_context_template()),
        (paths.backend_config_file(), backend_config_template()),
        (paths.settings_file(), serde_json::to_value(Settings::default())?),
    ];

    let mut written = Vec::new();
    for (file, template) in templates {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let created = !file.exists();
        if created {
            write_json(&file, &template)?;
        }
        written.push((name, created));
    }
    std::fs::create_dir_all(paths.tickets_dir())?;
    Ok(written)
}

fn project_context_template() -> Value {
    json!({
        "services": [],
        "key_files": [],
        "architecture": "",
        "tech_stack": [],
    })
}

fn backend_config_template() -> Value {
    json!({
        "init_code_location": "",
        "base_url": "",
        "app_version": "",
        "environment": "",
        "api_baseurls": {},
        "api_pathname_mapping": {},
        "field_extraction_rules": {
            "user_id": {},
            "client_id": {},
        },
        "service_name_mapping": {},
        "env_vars": {},
        "fields": {},
        "common_query_fields": DEFAULT_QUERY_FIELDS,
        "service_names": {},
    })
}
