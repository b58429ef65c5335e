//! CLI command definitions
//!
//! Defines the clap commands for the demo harness.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Render the pan/zoom demo under each transform and check its digests
    Panzoom {
        /// Directory containing the demo binaries and UI files
        bindir: PathBuf,

        /// Display the concatenated strip of rendered frames when done
        #[arg(long)]
        viscat: bool,

        /// Keep the rendered frames instead of removing them at teardown
        #[arg(long)]
        keep_artifacts: bool,

        /// Arguments for the scenario runner: name filters, --exact, --list,
        /// --fail-fast
        #[arg(last = true)]
        remainder: Vec<String>,
    },

    /// Round-trip every builder model through the serialization demo
    Serialize {
        /// Directory containing the demo binaries and UI files
        bindir: PathBuf,

        /// Arguments for the scenario runner
        #[arg(last = true)]
        remainder: Vec<String>,
    },

    /// Run a suite described in a YAML file
    Run {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Directory containing the demo binaries and UI files
        bindir: PathBuf,

        /// Display the concatenated strip of rendered frames when done
        #[arg(long)]
        viscat: bool,

        /// Keep the rendered frames instead of removing them at teardown
        #[arg(long)]
        keep_artifacts: bool,

        /// Arguments for the scenario runner
        #[arg(last = true)]
        remainder: Vec<String>,
    },

    /// Print the digests the pan/zoom demo computes for each scenario
    Record {
        /// Directory containing the demo binaries and UI files
        bindir: PathBuf,

        /// YAML suite to record instead of the built-in panzoom suite
        #[arg(long)]
        suite: Option<PathBuf>,

        /// UI file to render (default: the suite's first UI file)
        #[arg(long)]
        ui: Option<String>,
    },
}
