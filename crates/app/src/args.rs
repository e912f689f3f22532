pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wfx")]
#[command(about = "Generate multi-node whisper client test fixtures")]
pub struct Args {
    /// Directory scenarios are generated into (defaults to the current directory)
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Path to the fixture config (defaults to <work-dir>/wfx.toml)
    #[arg(long = "config", global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::Command,
}
