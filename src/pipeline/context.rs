//! Shared pipeline state: channels, counters and the per-run context.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::catalog::Catalog;
use crate::types::StatsSnapshot;
use crate::utils::cancel::CancelToken;
use crate::utils::config::PipelineConsts;
use crate::utils::locker::Locker;

/// Import counters, updated atomically across the walker and workers.
#[derive(Debug, Default)]
pub struct Stats {
    pub total: AtomicU64,
    pub unknown_extension: AtomicU64,
    pub info_error: AtomicU64,
    pub date_time_error: AtomicU64,
    pub date_time_not_found: AtomicU64,
    pub already_exists: AtomicU64,
    pub renamed: AtomicU64,
    pub imported: AtomicU64,
    pub removed: AtomicU64,
}

impl Stats {
    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            unknown_extension: self.unknown_extension.load(Ordering::Relaxed),
            info_error: self.info_error.load(Ordering::Relaxed),
            date_time_error: self.date_time_error.load(Ordering::Relaxed),
            date_time_not_found: self.date_time_not_found.load(Ordering::Relaxed),
            already_exists: self.already_exists.load(Ordering::Relaxed),
            renamed: self.renamed.load(Ordering::Relaxed),
            imported: self.imported.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
        }
    }
}

/// Shared context handed to the walker and every worker.
pub struct ImportContext {
    /// Absolute work directory (destination tree root).
    pub work_dir: PathBuf,
    /// Absolute staging directory (`<work_dir>/tmp`).
    pub tmp_dir: PathBuf,
    /// Validated destination-path template.
    pub format: String,
    /// Remove source files after a successful import.
    pub remove_source: bool,
    /// Upper-cased extension allow-list; empty disables filtering.
    pub ext_list: HashSet<String>,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    pub catalog: Catalog,
    pub locker: Locker,
    pub stats: Stats,
    pub token: CancelToken,
}

/// Bounded source-path channel sized for the worker pool.
pub fn create_path_channel(worker_count: usize) -> (Sender<PathBuf>, Receiver<PathBuf>) {
    bounded(worker_count * PipelineConsts::CHANNEL_CAP_PER_WORKER)
}
