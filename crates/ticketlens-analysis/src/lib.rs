//! Result analysis: feature mining, incident summary, prevalence classification, diagnostics

mod diagnostics;
mod features;
pub mod fieldpath;
mod prevalence;
mod summary;

pub use diagnostics::{diagnose, Diagnostics, Signal};
pub use features::{merge, FeatureRefiner, FeatureSet};
pub use prevalence::{
    EntityCounts, PrevalenceAnalyzer, PrevalenceLevel, PrevalenceReport, PrevalenceScope,
    PREVALENCE_FIELDS,
};
pub use summary::{classify_error, KeyError, LogSummary, MAX_KEY_ERRORS};
