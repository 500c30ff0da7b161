pub mod check;
pub mod init;
pub mod prepare;
pub mod prevalence;
pub mod refine;
pub mod status;
pub mod version;

mod project;

pub use project::Project;
