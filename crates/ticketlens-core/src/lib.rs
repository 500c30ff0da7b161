//! Core data model, configuration and time-window resolution for ticket analysis

mod config;
mod error;
mod resolver;
mod results;
pub mod schema;
pub mod time;
mod types;

pub use config::{
    missing_fields, BackendConfig, PrevalenceThresholds, ProjectContext, Settings,
    BACKEND_CONFIG_REQUIRED, PROJECT_CONTEXT_REQUIRED,
};
pub use error::{Error, Result};
pub use resolver::{ExplicitRange, TimeRangeResolver};
pub use results::{ExecutedQuery, QueryResult, ResultsDocument};
pub use types::{
    ApiInfo, ClientInfo, DeviceInfo, PathResolution, RegionInfo, Sender, TicketContext,
    TicketInfo, TimeInfo, TimeKind, TimeWindow, UserInfo,
};
