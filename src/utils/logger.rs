use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// Only warnings and errors carry a severity tag; info-level import
/// progress stays a bare prefixed line.
fn severity_tag(level: Level) -> Option<ColoredString> {
    match level {
        Level::Error => Some("error".red().bold()),
        Level::Warn => Some("warn".yellow()),
        _ => None,
    }
}

/// Configure logging from the CLI flags: `-v N` raises our crate to
/// debug, `--debug` to trace; dependencies stay at warn.
pub fn setup_logging(verbose: u8, debug: bool) {
    use log::LevelFilter;

    let level = if debug {
        LevelFilter::Trace
    } else if verbose > 0 {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME").cyan();
            match severity_tag(record.level()) {
                Some(tag) => writeln!(
                    buf,
                    "{name} {tag} ({}): {}",
                    record.target(),
                    record.args()
                ),
                None => writeln!(buf, "{name}: {}", record.args()),
            }
        })
        .init();
}
