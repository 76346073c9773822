//! Import orchestration: one walk thread fans out to a worker pool over
//! a bounded channel; the first fatal error cancels the whole pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use log::{error, info};

use crate::pipeline::context::{create_path_channel, ImportContext};
use crate::pipeline::walk::spawn_walk_thread;
use crate::pipeline::worker::worker_loop;
use crate::types::StatsSnapshot;
use crate::utils::cancel::is_canceled;
use crate::Result;

/// Run the import pipeline to completion and return the final counters.
///
/// Worker errors other than cancellation are logged and trip the token so
/// the walker and the remaining workers drain; the run still reports its
/// counters, matching a graceful shutdown.
pub fn run_import(
    ctx: Arc<ImportContext>,
    roots: Vec<PathBuf>,
    worker_count: usize,
) -> Result<StatsSnapshot> {
    let (path_tx, path_rx) = create_path_channel(worker_count);

    let walk_handle = spawn_walk_thread(Arc::clone(&ctx), roots, path_tx);

    let worker_handles: Vec<_> = (0..worker_count)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let path_rx = path_rx.clone();
            thread::spawn(move || {
                if let Err(err) = worker_loop(&ctx, &path_rx) {
                    if !is_canceled(&err) {
                        error!("{err:#}");
                        ctx.token.cancel();
                    }
                }
            })
        })
        .collect();
    drop(path_rx);

    walk_handle
        .join()
        .map_err(|_| anyhow::anyhow!("walk thread panicked"))?;
    for handle in worker_handles {
        let _ = handle.join();
    }

    let stats = ctx.stats.snapshot();
    info!(
        "{} of {} pictures successfully imported \
         (unknown_extension={} info_error={} date_time_error={} date_time_not_found={} \
         already_exists={} renamed={} removed={})",
        stats.imported,
        stats.total,
        stats.unknown_extension,
        stats.info_error,
        stats.date_time_error,
        stats.date_time_not_found,
        stats.already_exists,
        stats.renamed,
        stats.removed,
    );
    Ok(stats)
}
