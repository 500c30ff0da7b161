//! Path resolution for project configuration and per-ticket state

use std::path::{Path, PathBuf};

/// State directory created inside the analysed project
pub const STATE_DIR: &str = ".ticket-analyzer";

/// Resolves standard paths under `<project>/.ticket-analyzer`
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            root: project_dir.join(STATE_DIR),
        }
    }

    /// Paths for the current working directory
    pub fn from_cwd() -> std::io::Result<Self> {
        Ok(Self::new(&std::env::current_dir()?))
    }

    pub fn project_context_file(&self) -> PathBuf {
        self.root.join("project_context.json")
    }

    pub fn backend_config_file(&self) -> PathBuf {
        self.root.join("backend_config.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn tickets_dir(&self) -> PathBuf {
        self.root.join("tickets")
    }

    pub fn ticket(&self, ticket_id: &str) -> TicketPaths {
        TicketPaths {
            dir: self.tickets_dir().join(clean_ticket_id(ticket_id)),
        }
    }

    /// Ticket ids with a state directory, sorted
    pub fn list_tickets(&self) -> std::io::Result<Vec<String>> {
        let dir = self.tickets_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Documents belonging to one ticket
#[derive(Debug, Clone)]
pub struct TicketPaths {
    pub dir: PathBuf,
}

impl TicketPaths {
    pub fn context_file(&self) -> PathBuf {
        self.dir.join("context.json")
    }

    pub fn instructions_file(&self) -> PathBuf {
        self.dir.join("instructions.json")
    }

    /// Written by the external executor
    pub fn results_file(&self) -> PathBuf {
        self.dir.join("results.json")
    }

    pub fn features_file(&self) -> PathBuf {
        self.dir.join("features.json")
    }

    pub fn summary_file(&self) -> PathBuf {
        self.dir.join("summary.json")
    }

    pub fn diagnostics_file(&self) -> PathBuf {
        self.dir.join("diagnostics.json")
    }

    pub fn prevalence_instructions_file(&self) -> PathBuf {
        self.dir.join("prevalence_instructions.json")
    }

    /// Written by the external executor
    pub fn prevalence_results_file(&self) -> PathBuf {
        self.dir.join("prevalence_results.json")
    }

    pub fn prevalence_report_file(&self) -> PathBuf {
        self.dir.join("prevalence_report.json")
    }
}

/// Restrict a ticket id to `[A-Za-z0-9_-]` so it is safe as a directory name
pub fn clean_ticket_id(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "ticket".to_string()
    } else {
        cleaned
    }
}
