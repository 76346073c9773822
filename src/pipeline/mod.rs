//! Import pipeline: walker, worker pool, shared context.

pub mod context;
pub mod orchestrator;
pub mod walk;
pub mod worker;

pub use context::{ImportContext, Stats};
pub use orchestrator::run_import;
