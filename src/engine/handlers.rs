//! Command handlers: prepare the work directory and run the import.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use log::debug;

use crate::catalog::Catalog;
use crate::engine::arg_parser::{Cli, Commands, ImportArgs};
use crate::engine::tools;
use crate::pipeline::context::{ImportContext, Stats};
use crate::pipeline::run_import;
use crate::types::{ImportOpts, StatsSnapshot};
use crate::utils::cancel::{install_signal_handler, CancelToken};
use crate::utils::config::{CATALOG_DB_PATH, TMP_DIR};
use crate::utils::locker::Locker;
use crate::utils::setup_logging;
use crate::Result;

/// Dispatch a parsed command line.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.debug);
    match &cli.command {
        Commands::Import(args) => handle_import(cli, args),
    }
}

/// Handle the import subcommand: wire the signal handler and run.
/// A signal-initiated cancel still exits cleanly.
fn handle_import(cli: &Cli, args: &ImportArgs) -> Result<()> {
    let opts = ImportOpts {
        format: args.format.clone(),
        remove_source: args.remove_source,
        ext_list: args.ext_list.clone(),
        follow_symlinks: args.follow_symlinks,
        worker_count: 0,
    };
    let token = install_signal_handler()?;
    import(&cli.work_dir, &args.src_dirs, &opts, &token)?;
    Ok(())
}

/// Import the source trees into `work_dir` per `opts`. Library entry
/// point; the token lets embedders cancel cooperatively. Config faults
/// (bad template, bad source directory) fail before any work starts.
pub fn import(
    work_dir: &Path,
    src_dirs: &[PathBuf],
    opts: &ImportOpts,
    token: &CancelToken,
) -> Result<StatsSnapshot> {
    let format = tools::validate_template(&opts.format)?;
    let ext_list = tools::parse_ext_list(&opts.ext_list);

    if src_dirs.is_empty() {
        bail!("no source directories given");
    }
    let mut roots = Vec::with_capacity(src_dirs.len());
    for dir in src_dirs {
        let abs = fs::canonicalize(dir)
            .with_context(|| format!("source directory {:?} resolve error", dir))?;
        let stat = fs::symlink_metadata(&abs)
            .with_context(|| format!("source directory {:?} stat error", dir))?;
        if !stat.is_dir() {
            bail!("source directory {:?} is not a directory", dir);
        }
        roots.push(abs);
    }

    fs::create_dir_all(work_dir).context("work directory create error")?;
    let work_dir = fs::canonicalize(work_dir).context("work directory resolve error")?;
    let tmp_dir = work_dir.join(TMP_DIR);
    fs::create_dir_all(&tmp_dir).context("temp directory create error")?;
    let catalog = Catalog::open(&work_dir.join(CATALOG_DB_PATH)).context("catalog open error")?;

    let worker_count = if opts.worker_count > 0 {
        opts.worker_count
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    };

    debug!(
        "importing {} source tree(s) into {:?} with {} workers, format {:?}",
        roots.len(),
        work_dir,
        worker_count,
        format
    );

    let ctx = Arc::new(ImportContext {
        work_dir,
        tmp_dir,
        format,
        remove_source: opts.remove_source,
        ext_list,
        follow_symlinks: opts.follow_symlinks,
        catalog,
        locker: Locker::new(),
        stats: Stats::default(),
        token: token.clone(),
    });

    run_import(ctx, roots, worker_count)
}
