//! Cooperative cancellation: a shared token polled at suspension points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

/// Marker error for cooperative shutdown. Workers propagate it silently
/// instead of logging and tripping the global cancel.
#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("operation canceled")]
pub struct Canceled;

/// Shared cancellation flag. Cloning yields a handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Poll point: `Err(Canceled)` once the token has tripped.
    pub fn check(&self) -> Result<(), Canceled> {
        if self.is_canceled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }
}

/// Install a Ctrl+C / SIGTERM handler that trips the returned token.
pub fn install_signal_handler() -> crate::Result<CancelToken> {
    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .context("set Ctrl+C handler")?;
    Ok(token)
}

/// True when any error in the chain is [`Canceled`].
pub fn is_canceled(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.downcast_ref::<Canceled>().is_some())
}
