//! Query instruction generator
//!
//! Turns a [`TicketContext`] into an ordered instruction document:
//! service discovery first, then an error scan when the ticket reads like an
//! error report, then one scan per candidate service. Refinement passes mine
//! a previous results document into the ticket before generating again.

use chrono::{DateTime, Duration, FixedOffset};
use serde_json::json;
use tracing::{debug, info, warn};

use ticketlens_core::schema::{DEFAULT_QUERY_FIELDS, PRIORITY_FIELDS, SEVERITY_ERROR_VALUES};
use ticketlens_core::{ResultsDocument, Settings, TicketContext, TicketInfo};
use ticketlens_store::STATE_DIR;

use crate::document::QueryDocument;
use crate::filter::{compile_filters, FilterCondition};
use crate::instruction::{
    span_label, Generation, InstructionDocument, QueryInstruction, PRIORITY_DISCOVERY,
    PRIORITY_ERROR_SCAN, PRIORITY_SERVICE_SCAN, TOOL_BUILDER_QUERY, TOOL_LIST_SERVICES,
};

/// Keyword tags that make a ticket read as an error report
const ERROR_TAGS: &[&str] = &["错误", "error", "异常", "exception"];

/// Mines executed-query results back into a ticket.
///
/// Implementations must only fill empty fields, so applying the same results
/// twice changes nothing the second time.
pub trait Refiner {
    /// Merge signals found in `results` into `info`; true if anything was added
    fn refine(&self, info: &mut TicketInfo, results: &ResultsDocument) -> bool;
}

#[derive(Debug, Clone)]
pub struct QueryGenerator {
    settings: Settings,
    now: DateTime<FixedOffset>,
}

impl QueryGenerator {
    pub fn new(settings: Settings, now: DateTime<FixedOffset>) -> Self {
        Self { settings, now }
    }

    pub fn generate(&self, context: &TicketContext) -> Generation {
        let window = &context.time_range;
        let info = &context.ticket_info;

        let mut reasons = Vec::new();
        if !window.is_valid() {
            reasons.push(format!(
                "时间范围无效：{} - {}",
                window.start_display, window.end_display
            ));
        }
        if info.description.trim().is_empty() {
            reasons.push("工单描述为空".to_string());
        }
        if !reasons.is_empty() {
            warn!(ticket = %context.ticket_id, ?reasons, "Insufficient input for query generation");
            return Generation::Insufficient { reasons };
        }

        let mut notes = execution_notes(&context.ticket_id);

        // Future guard: advisory only, the window is kept
        let limit = self.now + Duration::hours(self.settings.future_tolerance_hours);
        if window.end > limit.timestamp_millis() {
            warn!(end = %window.end_display, "Query window ends in the future");
            notes.push(format!(
                "注意：查询结束时间 {} 晚于当前时间超过{}小时，请确认工单时间是否正确",
                window.end_display, self.settings.future_tolerance_hours
            ));
        }

        // Narrow guard: advise widening rather than rewriting the window
        let span = Duration::milliseconds(window.end - window.start);
        if span < Duration::hours(self.settings.expansion_hours) {
            debug!(minutes = span.num_minutes(), "Query window is narrow");
            notes.push(format!(
                "注意：查询时间范围仅{:.1}小时，较窄；若结果为空，建议扩大为事发时间前后{}小时",
                span.num_minutes() as f64 / 60.0,
                self.settings.expansion_hours
            ));
        }

        let fields = self.select_fields(context);
        let constraints = constraint_filters(info);
        let candidates = candidate_services(context);
        let mut queries = Vec::new();

        // Step 1: discovery
        queries.push(QueryInstruction {
            priority: PRIORITY_DISCOVERY,
            tool: TOOL_LIST_SERVICES.to_string(),
            params: json!({
                "timeRange": span_label(window.start, window.end),
                "start": window.start,
                "end": window.end,
            }),
            description: "获取服务列表，确认服务名称（必须首先执行）".to_string(),
        });

        // Step 2: error scan
        if reads_as_error(info) {
            let mut filters = vec![FilterCondition::one_of(
                "severity_text",
                SEVERITY_ERROR_VALUES.iter().copied(),
            )];
            filters.push(FilterCondition::one_of(
                "service.name",
                candidates.iter().map(String::as_str),
            ));
            filters.extend(constraints.iter().cloned());
            queries.push(self.builder_instruction(
                context,
                PRIORITY_ERROR_SCAN,
                &fields,
                &filters,
                "查询错误日志".to_string(),
            ));
        }

        // Step 3: per-service scans
        for service in candidates.iter().take(self.settings.max_service_queries) {
            let mut filters = vec![FilterCondition::one_of("service.name", [service.as_str()])];
            filters.extend(constraints.iter().cloned());
            queries.push(self.builder_instruction(
                context,
                PRIORITY_SERVICE_SCAN,
                &fields,
                &filters,
                format!("查询服务 {} 的日志", service),
            ));
        }

        if candidates.len() > self.settings.max_service_queries {
            notes.push(format!(
                "候选服务共{}个，仅为前{}个生成了服务查询",
                candidates.len(),
                self.settings.max_service_queries
            ));
        }

        info!(
            ticket = %context.ticket_id,
            queries = queries.len(),
            services = candidates.len(),
            "Generated query instructions"
        );

        Generation::Ready(InstructionDocument {
            ticket_id: context.ticket_id.clone(),
            time_range: window.clone(),
            services: info.services.clone(),
            queries,
            notes,
        })
    }

    /// Merge `results` into the context's ticket, then generate again.
    ///
    /// `refinements` is bumped only when the merge added something.
    pub fn generate_refined(
        &self,
        context: &mut TicketContext,
        results: &ResultsDocument,
        refiner: &dyn Refiner,
    ) -> Generation {
        if refiner.refine(&mut context.ticket_info, results) {
            context.refinements += 1;
            info!(
                ticket = %context.ticket_id,
                pass = context.refinements,
                "Ticket refined from query results"
            );
        } else {
            debug!(ticket = %context.ticket_id, "Results added no new constraints");
        }
        self.generate(context)
    }

    /// Priority fields, then project common fields (or the defaults), capped
    pub fn select_fields(&self, context: &TicketContext) -> Vec<String> {
        let common: Vec<String> = match &context.backend_config {
            Some(b) if !b.common_query_fields.is_empty() => b.common_query_fields.clone(),
            _ => DEFAULT_QUERY_FIELDS.iter().map(|f| f.to_string()).collect(),
        };

        let mut fields: Vec<String> = Vec::new();
        for name in PRIORITY_FIELDS.iter().map(|f| f.to_string()).chain(common) {
            if fields.len() >= self.settings.max_select_fields {
                break;
            }
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    fn builder_instruction(
        &self,
        context: &TicketContext,
        priority: u8,
        fields: &[String],
        filters: &[FilterCondition],
        description: String,
    ) -> QueryInstruction {
        let expression = compile_filters(filters);
        debug!(priority, %expression, "Compiled filter expression");
        let query = QueryDocument::logs(
            context.time_range.start,
            context.time_range.end,
            fields,
            expression,
            self.settings.query_limit,
            context.backend_config.as_ref(),
        );
        QueryInstruction {
            priority,
            tool: TOOL_BUILDER_QUERY.to_string(),
            params: json!({ "query": query }),
            description,
        }
    }
}

fn reads_as_error(info: &TicketInfo) -> bool {
    info.keywords
        .iter()
        .any(|k| ERROR_TAGS.iter().any(|tag| k.eq_ignore_ascii_case(tag)))
}

/// User, device, path and geo constraints known for the ticket
pub fn constraint_filters(info: &TicketInfo) -> Vec<FilterCondition> {
    let mut filters = Vec::new();
    if let Some(id) = info.user_info.id() {
        filters.push(FilterCondition::one_of("user.id", [id]));
    }
    if let Some(id) = info.device_info.id() {
        filters.push(FilterCondition::one_of("user.client_id", [id]));
    }
    if let Some(path) = info.api_info.query_path() {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        filters.push(FilterCondition::one_of("request.pathname", [path]));
    }
    if let Some(city) = info.region_info.city.as_deref() {
        filters.push(FilterCondition::one_of("geo.city_name", [city]));
    }
    if let Some(country) = info.region_info.country.as_deref() {
        filters.push(FilterCondition::one_of("geo.country_name", [country]));
    }
    filters
}

/// Ticket services, else backend-declared services, else project services
pub fn candidate_services(context: &TicketContext) -> Vec<String> {
    if !context.ticket_info.services.is_empty() {
        return context.ticket_info.services.clone();
    }
    if let Some(backend) = &context.backend_config {
        if !backend.service_names.is_empty() {
            return backend.service_names.keys().cloned().collect();
        }
    }
    context
        .project_context
        .as_ref()
        .map(|p| p.services.clone())
        .unwrap_or_default()
}

fn execution_notes(ticket_id: &str) -> Vec<String> {
    vec![
        "请按照优先级顺序执行查询：".to_string(),
        "1. 必须首先执行 list_services 获取服务列表，确认服务名称".to_string(),
        "2. 根据服务名称和查询条件，使用 execute_builder_query 执行具体查询".to_string(),
        format!(
            "3. 查询结果保存到 {}/tickets/{}/results.json 文件中",
            STATE_DIR, ticket_id
        ),
    ]
}
