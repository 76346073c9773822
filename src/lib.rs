//! cpic: content-addressed picture importer.
//!
//! Walks source directory trees, stages each file through a streaming
//! copy that computes its MD5/SHA-256 fingerprint as a side effect,
//! derives the destination name from an strftime template over the
//! picture's metadata timestamp, and commits every picture through a
//! transactional SQLite catalog enforcing fingerprint and path
//! uniqueness. Commits are two-phase: catalog insert, then rename of the
//! staged copy, with a compensating delete when the rename fails.

pub mod catalog;
pub mod engine;
pub mod exiftool;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

/// Result alias used by the public cpic API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use engine::handlers::import;
pub use utils::cancel::CancelToken;
