//! Project state shared by the commands: paths, settings and configuration

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};
use std::path::Path;
use tracing::debug;

use ticketlens_core::{BackendConfig, ProjectContext, Settings, TicketContext};
use ticketlens_store::{read_json, Paths, TicketPaths};

pub struct Project {
    pub paths: Paths,
    pub settings: Settings,
    pub offset: FixedOffset,
    pub project_context: Option<ProjectContext>,
    pub backend_config: Option<BackendConfig>,
}

impl Project {
    /// Load configuration under `<root>/.ticket-analyzer`; absent files fall back to defaults
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let paths = Paths::new(root);

        let settings: Settings = read_json(&paths.settings_file())
            .with_context(|| format!("reading {}", paths.settings_file().display()))?
            .unwrap_or_default();
        let offset = settings.offset()?;

        let project_context = read_json(&paths.project_context_file())
            .with_context(|| format!("reading {}", paths.project_context_file().display()))?;
        let backend_config = read_json(&paths.backend_config_file())
            .with_context(|| format!("reading {}", paths.backend_config_file().display()))?;

        debug!(
            root = %paths.root.display(),
            project_context = project_context.is_some(),
            backend_config = backend_config.is_some(),
            "Loaded project configuration"
        );

        Ok(Self {
            paths,
            settings,
            offset,
            project_context,
            backend_config,
        })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn ticket(&self, ticket_id: &str) -> TicketPaths {
        self.paths.ticket(ticket_id)
    }

    /// Persisted context of a prepared ticket
    pub fn load_context(&self, ticket_id: &str) -> anyhow::Result<TicketContext> {
        let file = self.ticket(ticket_id).context_file();
        read_json(&file)
            .with_context(|| format!("reading {}", file.display()))?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No context for ticket {}. Run `ticketlens prepare` first.",
                    ticket_id
                )
            })
    }
}
