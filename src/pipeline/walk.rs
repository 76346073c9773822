//! Cycle-safe recursive directory traversal feeding the worker pool.
//!
//! Symbolic links are only followed when enabled, and a followed link is
//! resolved fully and re-checked: targets above the root, outside the
//! root at the root's string boundary, or re-entering the walked tree
//! are skipped, so the walk terminates on any finite filesystem.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use crossbeam_channel::{SendTimeoutError, Sender};
use log::{debug, error, warn};

use crate::engine::tools;
use crate::pipeline::context::ImportContext;
use crate::utils::config::PipelineConsts;
use crate::Result;

struct WalkState {
    first_root: PathBuf,
    first_root_stat: Metadata,
}

/// Spawn the walk thread over all source roots. The sender is dropped on
/// return so workers observe the channel closing.
pub fn spawn_walk_thread(
    ctx: Arc<ImportContext>,
    roots: Vec<PathBuf>,
    path_tx: Sender<PathBuf>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for root in roots {
            if ctx.token.is_canceled() {
                break;
            }
            if let Err(err) = walk_root(&ctx, &root, &path_tx) {
                error!("source directory {:?} walk error: {:#}", root, err);
                break;
            }
        }
        drop(path_tx);
    })
}

/// Walk a single root. A bad root is an error; per-directory errors
/// inside the tree are logged and skipped.
pub fn walk_root(ctx: &ImportContext, root: &Path, path_tx: &Sender<PathBuf>) -> Result<()> {
    let first_root = fs::canonicalize(root).context("source directory resolve error")?;
    let first_root_stat =
        fs::symlink_metadata(&first_root).context("source directory stat error")?;
    if !first_root_stat.is_dir() {
        anyhow::bail!("source directory {:?} is not a directory", root);
    }
    let state = WalkState {
        first_root: first_root.clone(),
        first_root_stat,
    };
    walk_dir(ctx, &first_root, path_tx, &state, 0)
}

fn walk_dir(
    ctx: &ImportContext,
    dir: &Path,
    path_tx: &Sender<PathBuf>,
    state: &WalkState,
    depth: u32,
) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if depth == 0 => {
            return Err(err).context("source directory open error");
        }
        Err(err) => {
            warn!("source directory {:?} read error: {}", dir, err);
            return Ok(());
        }
    };

    for entry in entries {
        if ctx.token.is_canceled() {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("source directory {:?} entry error: {}", dir, err);
                continue;
            }
        };
        let mut path = entry.path();
        let mut stat = match entry.metadata() {
            Ok(stat) => stat,
            Err(err) => {
                warn!("source file {:?} stat error: {}", path, err);
                continue;
            }
        };

        // A followed symlink re-enters this loop with its target's kind.
        loop {
            if same_file(&stat, &state.first_root_stat) {
                break;
            }
            if stat.is_dir() {
                walk_dir(ctx, &path, path_tx, state, depth + 1)?;
                break;
            }
            if stat.file_type().is_symlink() {
                if !ctx.follow_symlinks {
                    break;
                }
                path = match fs::canonicalize(&path) {
                    Ok(resolved) => resolved,
                    Err(err) => {
                        warn!("sym-link {:?} eval error: {}", path, err);
                        break;
                    }
                };
                stat = match fs::symlink_metadata(&path) {
                    Ok(stat) => stat,
                    Err(err) => {
                        warn!("sym-link target {:?} stat error: {}", path, err);
                        break;
                    }
                };
                if link_escapes_or_reenters(&path, state) {
                    break;
                }
                continue;
            }
            if stat.is_file() {
                emit_file(ctx, path, path_tx);
                break;
            }
            // sockets, fifos, devices
            break;
        }
    }
    Ok(())
}

/// Containment test for a resolved symlink target against the original
/// root: true means skip the target.
fn link_escapes_or_reenters(path: &Path, state: &WalkState) -> bool {
    let path_str = path.to_string_lossy();
    let root_str = state.first_root.to_string_lossy();
    let (path_bytes, root_bytes) = (path_str.as_bytes(), root_str.as_bytes());
    let (plen, rlen) = (path_bytes.len(), root_bytes.len());

    // points above the root
    if rlen > plen {
        return true;
    }
    // diverges at the root's boundary without a separator
    if rlen + 1 <= plen && !std::path::is_separator(path_bytes[rlen] as char) {
        return true;
    }
    let prefix = &path_str[..rlen];
    // re-enters the tree we are walking
    if prefix == root_str {
        return true;
    }
    if prefix.eq_ignore_ascii_case(&root_str) {
        if let Ok(prefix_stat) = fs::symlink_metadata(Path::new(prefix)) {
            if same_file(&prefix_stat, &state.first_root_stat) {
                return true;
            }
        }
    }
    false
}

/// Count the file, apply the extension filter, and send it to the
/// workers, polling the token while the channel is full.
fn emit_file(ctx: &ImportContext, path: PathBuf, path_tx: &Sender<PathBuf>) {
    ctx.stats.total.fetch_add(1, Ordering::Relaxed);

    if !ctx.ext_list.is_empty() && !ctx.ext_list.contains(&tools::upper_ext(&path)) {
        debug!("picture {:?} has unknown extension", path);
        ctx.stats.unknown_extension.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let mut msg = path;
    loop {
        match path_tx.send_timeout(msg, PipelineConsts::CHANNEL_POLL) {
            Ok(()) => return,
            Err(SendTimeoutError::Timeout(returned)) => {
                if ctx.token.is_canceled() {
                    return;
                }
                msg = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => return,
        }
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    a.file_type() == b.file_type()
        && a.len() == b.len()
        && a.modified().ok() == b.modified().ok()
        && a.created().ok() == b.created().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::pipeline::context::Stats;
    use crate::utils::cancel::CancelToken;
    use crate::utils::locker::Locker;
    use crossbeam_channel::bounded;
    use std::collections::HashSet;

    fn test_ctx(ext: &[&str], follow: bool) -> Arc<ImportContext> {
        Arc::new(ImportContext {
            work_dir: PathBuf::new(),
            tmp_dir: PathBuf::new(),
            format: String::new(),
            remove_source: false,
            ext_list: ext.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            follow_symlinks: follow,
            catalog: Catalog::open_in_memory().unwrap(),
            locker: Locker::new(),
            stats: Stats::default(),
            token: CancelToken::new(),
        })
    }

    fn walk_collect(ctx: &ImportContext, root: &Path) -> Vec<PathBuf> {
        let (tx, rx) = bounded(1024);
        walk_root(ctx, root, &tx).unwrap();
        drop(tx);
        let mut paths: Vec<_> = rx.iter().collect();
        paths.sort();
        paths
    }

    #[test]
    fn emits_nested_regular_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("top.jpg"), b"1").unwrap();
        std::fs::write(root.join("a/mid.jpg"), b"2").unwrap();
        std::fs::write(root.join("a/b/deep.jpg"), b"3").unwrap();

        let ctx = test_ctx(&[], false);
        let paths = walk_collect(&ctx, &root);
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["deep.jpg", "mid.jpg", "top.jpg"]);
        assert_eq!(ctx.stats.snapshot().total, 3);
    }

    #[test]
    fn extension_filter_counts_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("keep.JPG"), b"1").unwrap();
        std::fs::write(root.join("keep2.jpg"), b"2").unwrap();
        std::fs::write(root.join("drop.txt"), b"3").unwrap();
        std::fs::write(root.join("noext"), b"4").unwrap();

        let ctx = test_ctx(&["JPG"], false);
        let paths = walk_collect(&ctx, &root);
        assert_eq!(paths.len(), 2);
        let stats = ctx.stats.snapshot();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.unknown_extension, 2);
    }

    #[test]
    fn bad_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = test_ctx(&[], false);
        let (tx, _rx) = bounded(8);
        assert!(walk_root(&ctx, &tmp.path().join("missing"), &tx).is_err());
    }

    #[test]
    fn canceled_token_stops_the_walk() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("a.jpg"), b"1").unwrap();

        let ctx = test_ctx(&[], false);
        ctx.token.cancel();
        let paths = walk_collect(&ctx, &root);
        assert!(paths.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped_without_follow() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(tmp.path().join("outside.jpg"), b"1").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("outside.jpg"), root.join("link.jpg")).unwrap();

        let ctx = test_ctx(&[], false);
        assert!(walk_collect(&ctx, &root).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_terminates_and_emits_each_file_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("a/x.jpg"), b"1").unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let ctx = test_ctx(&[], true);
        let paths = walk_collect(&ctx, &root);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].file_name().unwrap(), "x.jpg");
        assert_eq!(ctx.stats.snapshot().total, 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_reentering_a_subtree_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("a/x.jpg"), b"1").unwrap();
        std::os::unix::fs::symlink(root.join("a"), root.join("again")).unwrap();

        let ctx = test_ctx(&[], true);
        let paths = walk_collect(&ctx, &root);
        assert_eq!(paths.len(), 1, "the linked subtree must not be walked twice");
    }

    #[cfg(unix)]
    #[test]
    fn followed_file_link_inside_the_tree_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("x.jpg"), b"1").unwrap();
        std::os::unix::fs::symlink(root.join("x.jpg"), root.join("alias.jpg")).unwrap();

        let ctx = test_ctx(&[], true);
        let paths = walk_collect(&ctx, &root);
        assert_eq!(paths.len(), 1);
        assert_eq!(ctx.stats.snapshot().total, 1);
    }
}
