//! Public options and counters for the import API.

use crate::utils::config::ImportDefaults;

/// Options for an import run.
#[derive(Clone, Debug)]
pub struct ImportOpts {
    /// Destination-path template (strftime subset, validated up front).
    pub format: String,
    /// Remove each source file after a successful import.
    pub remove_source: bool,
    /// Comma-separated extension allow-list (case-insensitive, no dots).
    /// An empty list disables filtering.
    pub ext_list: String,
    /// Follow symbolic links while walking the source trees.
    pub follow_symlinks: bool,
    /// Worker pool size. Zero selects the host CPU count.
    pub worker_count: usize,
}

impl Default for ImportOpts {
    fn default() -> Self {
        Self {
            format: ImportDefaults::FORMAT.to_string(),
            remove_source: false,
            ext_list: ImportDefaults::EXT_LIST.to_string(),
            follow_symlinks: false,
            worker_count: 0,
        }
    }
}

/// Point-in-time copy of the import counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Regular files considered by the walker.
    pub total: u64,
    /// Files filtered out by the extension allow-list.
    pub unknown_extension: u64,
    /// Metadata extraction failures.
    pub info_error: u64,
    /// Timestamp derivation failures other than a missing timestamp.
    pub date_time_error: u64,
    /// Files with no usable timestamp (routed under `noinfo/`).
    pub date_time_not_found: u64,
    /// Files whose content was already catalogued.
    pub already_exists: u64,
    /// Imports committed under a collision-suffixed name.
    pub renamed: u64,
    /// Successfully committed imports.
    pub imported: u64,
    /// Source files removed after import.
    pub removed: u64,
}
