//! Query instruction generation for ticket investigations

mod context;
pub mod document;
pub mod filter;
mod generator;
pub mod instruction;

pub use context::ContextBuilder;
pub use document::QueryDocument;
pub use filter::{compile_filters, FilterCondition, FilterOp, FilterValue};
pub use generator::{candidate_services, constraint_filters, QueryGenerator, Refiner};
pub use instruction::{Generation, InstructionDocument, QueryInstruction};
