pub mod cancel;
pub mod config;
pub mod copy;
pub mod locker;
pub mod logger;
pub mod strftime;

pub use cancel::{install_signal_handler, is_canceled, CancelToken, Canceled};
pub use config::*;
pub use copy::CopyError;
pub use locker::Locker;
pub use logger::setup_logging;
