//! cpic CLI: import pictures into a content-addressed work directory.

use anyhow::Result;
use clap::Parser;
use cpic::engine::arg_parser::Cli;
use cpic::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
