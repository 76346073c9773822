use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::config::ImportDefaults;

/// Content-addressed picture importer.
#[derive(Debug, Parser)]
#[command(name = "cpic")]
#[command(about = "Import pictures into a content-addressed work directory.")]
pub struct Cli {
    /// Verbose level.
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 0, global = true)]
    pub verbose: u8,

    /// Debug mode (trace logging).
    #[arg(long, global = true)]
    pub debug: bool,

    /// Work directory holding the catalog, the staging area and the
    /// imported pictures.
    #[arg(short = 'w', long = "work-dir", value_name = "DIR", default_value = ".", global = true)]
    pub work_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import pictures from one or more source directory trees.
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Destination-path template expanded with each picture's timestamp.
    #[arg(short = 'f', long = "format", value_name = "FMT", default_value = ImportDefaults::FORMAT)]
    pub format: String,

    /// Remove each source file after a successful import.
    #[arg(short = 'r', long = "remove")]
    pub remove_source: bool,

    /// Comma-separated extension allow-list (no dots, case-insensitive).
    #[arg(short = 'e', long = "extensions", value_name = "LIST", default_value = ImportDefaults::EXT_LIST)]
    pub ext_list: String,

    /// Follow symbolic links while walking the source trees.
    #[arg(short = 'l', long = "follow-symlinks")]
    pub follow_symlinks: bool,

    /// Source directories to import from.
    #[arg(value_name = "SRC_DIR", required = true)]
    pub src_dirs: Vec<PathBuf>,
}
