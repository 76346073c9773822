//! Single-pass streaming copy with parallel digest accumulation.

use std::io::{Read, Write};

use sha2::digest::DynDigest;

use crate::utils::cancel::{CancelToken, Canceled};
use crate::utils::config::CopyConsts;

/// Copy failure taxonomy. `ShortWrite` is raised when the writer accepts
/// fewer bytes than the chunk without reporting an error of its own.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("operation canceled")]
    Canceled(#[from] Canceled),
    #[error("short write")]
    ShortWrite,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Copy `reader` to `writer` in `buf`-sized chunks, feeding every digest
/// in `sums` with exactly the bytes the writer accepted. Returns the
/// total bytes written.
///
/// The token is polled before each read; a tripped token fails the copy
/// without interrupting a chunk already in flight. An empty `buf` selects
/// the 32 KiB default.
pub fn copy<R, W>(
    token: &CancelToken,
    writer: &mut W,
    reader: &mut R,
    buf: &mut [u8],
    sums: &mut [&mut dyn DynDigest],
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut fallback = Vec::new();
    let buf = if buf.is_empty() {
        fallback.resize(CopyConsts::DEFAULT_BUF_SIZE, 0u8);
        fallback.as_mut_slice()
    } else {
        buf
    };

    let mut written = 0u64;
    loop {
        token.check()?;
        let nr = reader.read(buf)?;
        if nr == 0 {
            return Ok(written);
        }
        let nw = writer.write(&buf[..nr])?;
        if nw > 0 {
            written += nw as u64;
            for sum in sums.iter_mut() {
                sum.update(&buf[..nw]);
            }
        }
        if nw != nr {
            return Err(CopyError::ShortWrite);
        }
    }
}
