//! Ticket context assembly: extraction, time window and configuration

use chrono::{DateTime, FixedOffset};
use tracing::info;

use ticketlens_core::{
    BackendConfig, ExplicitRange, ProjectContext, Result, Settings, TicketContext,
    TimeRangeResolver,
};
use ticketlens_extract::{resolve_ticket_id, FieldExtractor};

#[derive(Debug, Clone)]
pub struct ContextBuilder {
    settings: Settings,
    now: DateTime<FixedOffset>,
    project: Option<ProjectContext>,
    backend: Option<BackendConfig>,
    explicit: ExplicitRange,
    ticket_id: Option<String>,
    services: Vec<String>,
}

impl ContextBuilder {
    pub fn new(settings: Settings, now: DateTime<FixedOffset>) -> Self {
        Self {
            settings,
            now,
            project: None,
            backend: None,
            explicit: ExplicitRange::default(),
            ticket_id: None,
            services: Vec::new(),
        }
    }

    pub fn project(mut self, project: Option<ProjectContext>) -> Self {
        self.project = project;
        self
    }

    pub fn backend(mut self, backend: Option<BackendConfig>) -> Self {
        self.backend = backend;
        self
    }

    pub fn explicit_range(mut self, explicit: ExplicitRange) -> Self {
        self.explicit = explicit;
        self
    }

    pub fn ticket_id(mut self, id: Option<String>) -> Self {
        self.ticket_id = id;
        self
    }

    /// Services named by the caller, added ahead of extracted ones
    pub fn services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }

    pub fn build(&self, text: &str) -> Result<TicketContext> {
        let offset = self.settings.offset()?;

        let mut extractor = FieldExtractor::new(offset, self.now);
        if let Some(backend) = &self.backend {
            extractor = extractor.with_backend(backend);
        }
        let mut ticket_info = extractor.extract(text);

        if !self.services.is_empty() {
            let extracted = std::mem::take(&mut ticket_info.services);
            for name in self.services.iter().chain(extracted.iter()) {
                let canonical = self
                    .backend
                    .as_ref()
                    .and_then(|b| b.canonical_service(name.trim()))
                    .unwrap_or(name.as_str());
                ticket_info.add_service(canonical);
            }
        }

        let ticket_id = resolve_ticket_id(
            self.ticket_id.as_deref(),
            ticket_info.ticket_id.as_deref(),
            text,
            self.now,
        );

        let resolver = TimeRangeResolver::from_settings(&self.settings)?;
        let time_range = resolver.resolve(&ticket_info, &self.explicit, self.now);

        info!(
            ticket = %ticket_id,
            services = ticket_info.services.len(),
            window = %format!("{} - {}", time_range.start_display, time_range.end_display),
            "Built ticket context"
        );

        Ok(TicketContext {
            ticket_id,
            ticket_info,
            time_range,
            project_context: self.project.clone(),
            backend_config: self.backend.clone(),
            created_at: self.now,
            refinements: 0,
        })
    }
}
