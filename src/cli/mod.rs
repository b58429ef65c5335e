//! CLI command handling
//!
//! Resolves configuration, builds the driver and runs the selected suite.

use std::path::Path;
use std::time::Instant;

use crate::commands::Commands;
use crate::common::config::{Config, HarnessConfig};
use crate::common::{Error, Result};
use crate::testing::{print_summary, suites, Driver, RunnerArgs, Suite};

/// Dispatch a CLI command
///
/// Returns whether every executed scenario passed.
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<bool> {
    let config = Config::load(config_path)?;

    match command {
        Commands::Panzoom {
            bindir,
            viscat,
            keep_artifacts,
            remainder,
        } => {
            let suite = suites::panzoom().with_overrides(&config.panzoom);
            run_suite(&config, &bindir, viscat, keep_artifacts, &suite, &remainder).await
        }

        Commands::Serialize { bindir, remainder } => {
            let suite = suites::serialize().with_overrides(&config.serialize);
            run_suite(&config, &bindir, false, false, &suite, &remainder).await
        }

        Commands::Run {
            suite,
            bindir,
            viscat,
            keep_artifacts,
            remainder,
        } => {
            let suite = Suite::load(&suite)?;
            run_suite(&config, &bindir, viscat, keep_artifacts, &suite, &remainder).await
        }

        Commands::Record { bindir, suite, ui } => {
            let suite = match suite {
                Some(path) => Suite::load(&path)?,
                None => suites::panzoom().with_overrides(&config.panzoom),
            };
            let ui = ui
                .or_else(|| suite.ui_files.first().cloned())
                .ok_or_else(|| Error::Config(format!("Suite '{}' has no UI files", suite.name)))?;

            let driver = Driver::new(HarnessConfig::new(&bindir, &config)?);
            for (scenario, digest) in driver.record_digests(&suite, &ui).await? {
                println!("{}: {}", scenario, digest);
            }
            Ok(true)
        }
    }
}

async fn run_suite(
    config: &Config,
    bindir: &Path,
    viscat: bool,
    keep_artifacts: bool,
    suite: &Suite,
    remainder: &[String],
) -> Result<bool> {
    let args = RunnerArgs::from_remainder(remainder)?;

    let mut harness = HarnessConfig::new(bindir, config)?;
    harness.viscat = viscat;
    harness.keep_artifacts |= keep_artifacts;
    tracing::debug!("Binary directory: {}", harness.bindir.display());

    let driver = Driver::new(harness);
    let started = Instant::now();
    let report = driver.run_suite(suite, &args).await?;

    if args.list {
        return Ok(true);
    }

    print_summary(&report, started.elapsed());
    for test in &report.tests {
        if let Some(path) = &test.artifacts {
            println!("Artifacts for {}: {}", test.ui_file, path.display());
        }
    }

    Ok(report.passed())
}
