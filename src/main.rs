//! Demo Harness - drives non-interactive GUI demo processes over a JSON
//! protocol and verifies their serialization and rendering.

use std::path::PathBuf;

use clap::Parser;
use demo_harness::cli;
use demo_harness::commands::Commands;
use demo_harness::common::logging::{self, LogLevel};

#[derive(Parser)]
#[command(name = "demo-harness", about = "Black-box verification harness for GUI demos")]
#[command(version, long_about = None)]
struct Cli {
    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Configuration file (default: ~/.config/demo-harness/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init(cli.log_level);

    match cli::dispatch(cli.command, cli.config.as_deref()).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
