//! Field extraction from unstructured incident text

mod extractor;
mod pathname;
mod patterns;
mod ticket_id;

pub use extractor::FieldExtractor;
pub use pathname::{normalize_api_path, resolve_pathname};
pub use ticket_id::{generate_ticket_id, resolve_ticket_id};
