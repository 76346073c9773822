//! Per-file import: metadata, staging copy, collision loop, and the
//! catalog-then-rename two-phase commit.
//!
//! The catalog insert is the point of commit. A successful insert
//! followed by a failed rename is the only window where the catalog can
//! reference a missing file; the compensating delete below closes it
//! before the worker returns.

use std::fs;
use std::io::{ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::{anyhow, bail, Context};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use md5::{Digest, Md5};
use sha2::digest::DynDigest;
use sha2::Sha256;

use crate::catalog::{self, Picture};
use crate::engine::tools;
use crate::exiftool;
use crate::pipeline::context::ImportContext;
use crate::utils::config::{CopyConsts, PipelineConsts, NOINFO_DIR};
use crate::utils::{copy, strftime};
use crate::Result;

/// Worker loop: pull source paths until the channel closes or the token
/// trips. The first fatal error is returned to the spawner, which logs
/// it and cancels the pipeline.
pub fn worker_loop(ctx: &ImportContext, path_rx: &Receiver<PathBuf>) -> Result<()> {
    loop {
        let src = match path_rx.recv_timeout(PipelineConsts::CHANNEL_POLL) {
            Ok(path) => path,
            Err(RecvTimeoutError::Timeout) => {
                ctx.token.check()?;
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };
        ctx.token.check()?;

        import_file(ctx, &src)?;

        if ctx.remove_source {
            // the import stands even when the source cannot be removed
            match fs::remove_file(&src) {
                Ok(()) => {
                    ctx.stats.removed.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => warn!("source file {:?} remove error: {}", src, err),
            }
        }
    }
}

/// Import one source file. Metadata failures are soft (counted, the file
/// is routed to `noinfo/`); a fingerprint already in the catalog counts
/// as `already_exists` and is success.
fn import_file(ctx: &ImportContext, src: &Path) -> Result<()> {
    let mut src_file = fs::File::open(src)
        .with_context(|| format!("source file {:?} open error", src))?;
    let src_stat = src_file
        .metadata()
        .with_context(|| format!("source file {:?} stat error", src))?;
    if !src_stat.is_file() {
        bail!("source file {:?} is not a regular file", src);
    }

    let mut pic = Picture::default();

    match exiftool::read_tags_from_file(&ctx.token, src) {
        Err(exiftool::Error::Canceled(canceled)) => return Err(canceled.into()),
        Err(err) => {
            debug!("source file {:?} info error: {}", src, err);
            ctx.stats.info_error.fetch_add(1, Ordering::Relaxed);
        }
        Ok(tags) => match tags.date_time() {
            Ok(taken_at) => pic.taken_at = Some(taken_at),
            Err(exiftool::Error::DateTimeNotFound) => {
                debug!("source file {:?} datetime not found", src);
                ctx.stats.date_time_not_found.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                debug!("source file {:?} datetime error: {}", src, err);
                ctx.stats.date_time_error.fetch_add(1, Ordering::Relaxed);
            }
        },
    }

    src_file
        .seek(SeekFrom::Start(0))
        .context("source file seek error")?;

    let ext = tools::upper_ext(src);
    let dst_ext = if ext.is_empty() {
        String::new()
    } else {
        format!(".{ext}")
    };
    let mut dst_base = tools::upper_stem(src);
    let mut dst_dir = NOINFO_DIR.to_string();
    if let Some(taken_at) = &pic.taken_at {
        let composite = format!("{}-{}", strftime::format(&ctx.format, taken_at), dst_base);
        let (dir, base) = tools::split_dir_base(&composite);
        dst_dir = dir;
        dst_base = base;
    }

    fs::create_dir_all(ctx.work_dir.join(&dst_dir))
        .context("destination directory create error")?;

    let src_name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut staged = tempfile::Builder::new()
        .prefix(&src_name)
        .tempfile_in(&ctx.tmp_dir)
        .context("temp file open error")?;

    let mut buf = vec![0u8; CopyConsts::IMPORT_BUF_SIZE];
    let mut sum_md5 = Md5::new();
    let mut sum_sha256 = Sha256::new();
    {
        let mut sums: [&mut dyn DynDigest; 2] = [&mut sum_md5, &mut sum_sha256];
        pic.size = copy::copy(
            &ctx.token,
            staged.as_file_mut(),
            &mut src_file,
            &mut buf,
            &mut sums,
        )?;
    }
    pic.sum_md5 = tools::hex_upper(&sum_md5.finalize());
    pic.sum_sha256 = tools::hex_upper(&sum_sha256.finalize());

    let hash_str = format!("{}{}", pic.sum_md5, pic.sum_sha256);
    for i in 0..=hash_str.len() / 4 {
        let dst_file_name = if i == 0 {
            format!("{dst_base}{dst_ext}")
        } else {
            let k = (i - 1) * 4;
            format!("{dst_base}-{}{dst_ext}", &hash_str[k..k + 4])
        };
        let dst_file = if dst_dir == "." {
            dst_file_name
        } else {
            format!("{dst_dir}/{dst_file_name}")
        };
        pic.path = dst_file.clone();

        match ctx.catalog.new_picture(&pic) {
            Err(catalog::Error::PathAlreadyExists) => continue,
            Err(catalog::Error::PictureAlreadyExists) => {
                debug!("picture {:?} already exists", src);
                ctx.stats.already_exists.fetch_add(1, Ordering::Relaxed);
                // dropping the staged file removes it
                return Ok(());
            }
            Err(err) => return Err(err).context("catalog insert error"),
            Ok(()) => {}
        }

        // filesystem commit; the locker serializes stat+rename per path
        let abs_dst = ctx.work_dir.join(&dst_file);
        let guard = ctx.locker.lock(&dst_file);
        let commit_err = match fs::symlink_metadata(&abs_dst) {
            Ok(_) => anyhow!(
                "picture {:?} destination file {:?} already exists",
                src,
                dst_file
            ),
            Err(err) if err.kind() != ErrorKind::NotFound => {
                anyhow::Error::new(err).context("destination file stat error")
            }
            Err(_) => match staged.persist_noclobber(&abs_dst) {
                Ok(_) => {
                    drop(guard);
                    if i > 0 {
                        debug!("picture {:?} renamed to {:?}", src, dst_file);
                        ctx.stats.renamed.fetch_add(1, Ordering::Relaxed);
                    }
                    debug!("picture {:?} imported to {:?}", src, dst_file);
                    ctx.stats.imported.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(err) if err.error.kind() == ErrorKind::AlreadyExists => anyhow!(
                    "picture {:?} destination file {:?} already exists",
                    src,
                    dst_file
                ),
                Err(err) => anyhow::Error::new(err.error).context("destination file rename error"),
            },
        };
        drop(guard);

        // compensate: the insert committed but the file never landed
        if let Err(err) = ctx.catalog.delete_picture(&pic.path) {
            warn!(
                "picture {:?} catalog record delete error, possible data inconsistency: {}",
                src, err
            );
        }
        return Err(commit_err);
    }

    bail!("picture {:?} destination file path collision error", src)
}
