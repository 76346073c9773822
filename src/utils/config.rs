//! Application configuration constants.
//! Tuning and defaults in one place.

use std::time::Duration;

// ---- Streaming copy ----

/// Copy buffer sizes.
pub struct CopyConsts;

impl CopyConsts {
    /// Fallback chunk size when the caller passes no buffer (bytes).
    pub const DEFAULT_BUF_SIZE: usize = 32 * 1024;
    /// Chunk size used by the import pipeline (bytes).
    pub const IMPORT_BUF_SIZE: usize = 64 * 1024;
}

// ---- Worker pool / channels ----

/// Worker pool and channel tuning.
pub struct PipelineConsts;

impl PipelineConsts {
    /// Source-path channel capacity per worker (cap = workers * this).
    pub const CHANNEL_CAP_PER_WORKER: usize = 2;
    /// Idle send/receive timeout while polling the cancellation token.
    pub const CHANNEL_POLL: Duration = Duration::from_millis(200);
}

// ---- Import defaults ----

/// Defaults for the `import` subcommand flags.
pub struct ImportDefaults;

impl ImportDefaults {
    pub const FORMAT: &'static str = "%Y/%Y-%m/%Y-%m-%d/%Y%m%d-%H%M%S";
    pub const EXT_LIST: &'static str = "JPG,JPEG,PNG,TIFF,CR2,NEF";
}

// ---- Work directory layout ----

/// Directory names reserved at the top of the work directory; the
/// destination template must not resolve under them.
pub const RESERVED_DIRS: [&str; 2] = ["cpic", "tmp"];

/// Relative path of the catalog database inside the work directory.
pub const CATALOG_DB_PATH: &str = "cpic/catalog.sqlite3";

/// Relative path of the staging directory inside the work directory.
pub const TMP_DIR: &str = "tmp";

/// Destination directory for pictures with no usable timestamp.
pub const NOINFO_DIR: &str = "noinfo";
