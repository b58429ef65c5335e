//! Scenario driver
//!
//! Runs a suite's scenarios in order against the demo binary, one process
//! session per scenario. The working fixture is carried from one scenario to
//! the next, and every session is reaped before the next one starts,
//! whatever the outcome.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use crate::common::config::HarnessConfig;
use crate::common::{Error, Result};
use crate::fixtures::FixtureSet;
use crate::process::{LaunchSpec, ProcessSession, SessionState};
use crate::protocol::{Envelope, Fixture, Response};

use super::artifacts::{self, ArtifactDir};
use super::config::{Scenario, Suite, Variant};
use super::verifier::{self, FieldMismatch, Verdict};

/// Scenario selection, parsed from the arguments after `--`
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "scenarios", no_binary_name = true)]
pub struct RunnerArgs {
    /// Run only scenarios whose `<ui-file>/<scenario>` name contains a filter
    pub filters: Vec<String>,

    /// Filters must match the full name exactly
    #[arg(long)]
    pub exact: bool,

    /// List scenario names without running them
    #[arg(long)]
    pub list: bool,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,
}

impl RunnerArgs {
    /// Parse pass-through arguments
    pub fn from_remainder(args: &[String]) -> Result<Self> {
        Self::try_parse_from(args).map_err(|e| Error::Config(e.to_string()))
    }

    /// Whether the scenario with this full name should run
    pub fn selects(&self, full_name: &str) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        self.filters.iter().any(|filter| {
            if self.exact {
                full_name == filter
            } else {
                full_name.contains(filter.as_str())
            }
        })
    }
}

/// Why a scenario failed
#[derive(Debug)]
pub enum Failure {
    /// Spawn failure, protocol violation, timeout or other harness-side error
    Error(Error),
    /// A round-tripped field differs from what was sent
    Field(FieldMismatch),
    /// The demo exited non-zero
    ExitCode(i32),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(e) => write!(f, "{}", e),
            Failure::Field(mismatch) => write!(f, "{}", mismatch),
            Failure::ExitCode(code) => write!(f, "demo exited with code {}", code),
        }
    }
}

/// Result of one scenario
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub exit_code: Option<i32>,
    pub failures: Vec<Failure>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of one test: a suite run against one UI file
#[derive(Debug)]
pub struct TestReport {
    pub ui_file: String,
    pub scenarios: Vec<ScenarioOutcome>,
    /// Artifact directory left on disk, when artifacts are kept
    pub artifacts: Option<PathBuf>,
}

/// Result of a whole suite
#[derive(Debug)]
pub struct SuiteReport {
    pub suite: String,
    pub tests: Vec<TestReport>,
}

impl SuiteReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.tests.iter().flat_map(|t| t.scenarios.iter())
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes().filter(|o| o.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes().filter(|o| !o.passed()).count()
    }

    pub fn passed(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Drives demo processes through suite scenarios
pub struct Driver {
    config: HarnessConfig,
    fixtures: FixtureSet,
}

impl Driver {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            fixtures: FixtureSet::builtin(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every selected scenario of the suite
    pub async fn run_suite(&self, suite: &Suite, args: &RunnerArgs) -> Result<SuiteReport> {
        suite.validate()?;

        let mut report = SuiteReport {
            suite: suite.name.clone(),
            tests: Vec::new(),
        };

        if args.list {
            for ui_file in &suite.ui_files {
                for scenario in &suite.scenarios {
                    let full_name = format!("{}/{}", ui_file, scenario.name);
                    if args.selects(&full_name) {
                        println!("{}: scenario", full_name);
                    }
                }
            }
            return Ok(report);
        }

        println!(
            "\n{} {}",
            "Running Suite:".blue().bold(),
            suite.name.white().bold()
        );
        if let Some(desc) = &suite.description {
            println!("  {}", desc.dimmed());
        }

        for ui_file in &suite.ui_files {
            let test = self.run_test(suite, ui_file, args).await?;
            let stop = args.fail_fast && test.scenarios.iter().any(|o| !o.passed());
            report.tests.push(test);
            if stop {
                break;
            }
        }

        Ok(report)
    }

    /// Run the suite's scenarios against one UI file
    async fn run_test(&self, suite: &Suite, ui_file: &str, args: &RunnerArgs) -> Result<TestReport> {
        println!("\n{}", format!("{}:", ui_file).cyan());

        let mut working = suite.fixture.instantiate(&self.fixtures)?;
        let artifacts = match suite.variant {
            Variant::Panzoom => Some(ArtifactDir::create(
                &format!("{}_test_", suite.name),
                self.config.keep_artifacts,
            )?),
            Variant::Serialize => None,
        };

        let mut scenarios = Vec::new();
        for (index, scenario) in suite.scenarios.iter().enumerate() {
            // Deltas accumulate even for scenarios that are filtered out, so a
            // selected scenario sees the same fixture as in a full run
            working.apply(&scenario.set);

            let full_name = format!("{}/{}", ui_file, scenario.name);
            if !args.selects(&full_name) {
                tracing::debug!("Skipping {}", full_name);
                continue;
            }

            let frame = artifacts.as_ref().map(|dir| dir.frame_path(index));
            let outcome = self.run_scenario(suite, ui_file, scenario, &working, frame).await;
            print_outcome(&outcome);

            let failed = !outcome.passed();
            scenarios.push(outcome);
            if failed && args.fail_fast {
                break;
            }
        }

        let kept = match artifacts {
            Some(dir) => {
                if self.config.viscat {
                    let frames = dir.frames(suite.scenarios.len());
                    let strip = dir.path().join("cat.png");
                    if let Err(e) = artifacts::show_strip(&frames, &strip, &self.config.viscat_tools).await {
                        tracing::warn!("Could not display rendered frames: {}", e);
                    }
                }
                dir.finish()?
            }
            None => None,
        };

        Ok(TestReport {
            ui_file: ui_file.to_string(),
            scenarios,
            artifacts: kept,
        })
    }

    /// Run one scenario in its own process session
    async fn run_scenario(
        &self,
        suite: &Suite,
        ui_file: &str,
        scenario: &Scenario,
        fixture: &Fixture,
        frame: Option<PathBuf>,
    ) -> ScenarioOutcome {
        let spec = self.launch_spec(suite, ui_file, scenario, frame);
        let mut session = ProcessSession::new(spec);

        let exchanged = self.exchange(&mut session, suite.variant, fixture).await;
        session.reap(self.config.exit_timeout(), self.config.kill_grace()).await;
        debug_assert_eq!(session.state(), SessionState::Reaped);

        let mut failures = Vec::new();
        match exchanged {
            Ok((code, response)) => {
                if let Verdict::Fail { exit_code } = verifier::verify_exit(code) {
                    failures.push(Failure::ExitCode(exit_code));
                }
                if let Some(response) = response {
                    failures.extend(
                        verifier::verify_round_trip(fixture, &response.builder_models)
                            .into_iter()
                            .map(Failure::Field),
                    );
                }
            }
            Err(e) => {
                if let Some(payload) = e.payload() {
                    tracing::warn!("Offending payload for '{}': {}", scenario.name, payload);
                }
                failures.push(Failure::Error(e));
            }
        }

        ScenarioOutcome {
            name: scenario.name.clone(),
            exit_code: session.exit_code(),
            failures,
        }
    }

    /// Feed one envelope to a fresh session and collect its outcome
    async fn exchange(
        &self,
        session: &mut ProcessSession,
        variant: Variant,
        fixture: &Fixture,
    ) -> Result<(i32, Option<Response>)> {
        session.launch(&self.config.launcher).await?;
        ensure_running(session)?;

        session.send(&Envelope::new(fixture.clone())).await?;
        session.close_input()?;

        let response = match variant {
            Variant::Serialize => Some(
                session
                    .receive_within(self.config.exit_timeout(), self.config.kill_grace())
                    .await?,
            ),
            Variant::Panzoom => None,
        };

        let code = session
            .wait(self.config.exit_timeout(), self.config.kill_grace())
            .await?;
        Ok((code, response))
    }

    fn launch_spec(
        &self,
        suite: &Suite,
        ui_file: &str,
        scenario: &Scenario,
        frame: Option<PathBuf>,
    ) -> LaunchSpec {
        let args = match suite.variant {
            Variant::Panzoom => {
                let mut args = vec![
                    "--input".to_string(),
                    "-".to_string(),
                    "--ui".to_string(),
                    ui_file.to_string(),
                    "test".to_string(),
                ];
                if let Some(frame) = frame {
                    args.push("--outfile".to_string());
                    args.push(frame.display().to_string());
                }
                if let Some(threshold) = suite.threshold {
                    args.push("--threshold".to_string());
                    args.push(threshold.to_string());
                }
                args.push(scenario.digest.clone().unwrap_or_default());
                args
            }
            Variant::Serialize => vec![
                ui_file.to_string(),
                "--input".to_string(),
                "-".to_string(),
                "--output".to_string(),
                "-".to_string(),
                "--test".to_string(),
            ],
        };

        LaunchSpec {
            program: self.config.bindir.join(&suite.binary),
            cwd: self.config.bindir.clone(),
            args,
            capture_stdout: suite.variant == Variant::Serialize,
        }
    }

    /// Run the panzoom demo in its `hash` mode for every scenario and collect
    /// the digests it prints
    ///
    /// Used to regenerate expected digests after an intentional rendering
    /// change. The fixture sequence is the same cumulative one `run_suite`
    /// uses.
    pub async fn record_digests(&self, suite: &Suite, ui_file: &str) -> Result<Vec<(String, String)>> {
        if suite.variant != Variant::Panzoom {
            return Err(Error::Config(format!(
                "Suite '{}' does not render frames; nothing to record",
                suite.name
            )));
        }

        let artifacts = ArtifactDir::create(&format!("{}_record_", suite.name), false)?;
        let mut working = suite.fixture.instantiate(&self.fixtures)?;
        let mut digests = Vec::new();

        for (index, scenario) in suite.scenarios.iter().enumerate() {
            working.apply(&scenario.set);

            let mut session = ProcessSession::new(LaunchSpec {
                program: self.config.bindir.join(&suite.binary),
                cwd: self.config.bindir.clone(),
                args: vec![
                    "--input".to_string(),
                    "-".to_string(),
                    "--ui".to_string(),
                    ui_file.to_string(),
                    "hash".to_string(),
                    "--outfile".to_string(),
                    artifacts.frame_path(index).display().to_string(),
                ],
                capture_stdout: true,
            });

            let recorded = self.record_one(&mut session, &working).await;
            session.reap(self.config.exit_timeout(), self.config.kill_grace()).await;

            let digest = recorded?;
            tracing::info!("{}/{}: {}", ui_file, scenario.name, digest);
            digests.push((scenario.name.clone(), digest));
        }

        artifacts.finish()?;
        Ok(digests)
    }

    async fn record_one(&self, session: &mut ProcessSession, fixture: &Fixture) -> Result<String> {
        session.launch(&self.config.launcher).await?;
        session.send(&Envelope::new(fixture.clone())).await?;
        session.close_input()?;

        let digest = session
            .receive_line_within(self.config.exit_timeout(), self.config.kill_grace())
            .await?
            .trim()
            .to_string();
        let code = session
            .wait(self.config.exit_timeout(), self.config.kill_grace())
            .await?;
        if code != 0 {
            return Err(Error::TestAssertion(format!(
                "demo hash mode exited with code {}",
                code
            )));
        }
        super::config::validate_digest(&digest)?;
        Ok(digest)
    }
}

/// Fail when the demo has already exited before receiving input
fn ensure_running(session: &mut ProcessSession) -> Result<()> {
    match session.poll_exited()? {
        Some(code) => Err(Error::PrematureExit(code)),
        None => Ok(()),
    }
}

fn print_outcome(outcome: &ScenarioOutcome) {
    if outcome.passed() {
        println!("  {} {}", "✓".green(), outcome.name);
        return;
    }
    println!("  {} {}", "✗".red(), outcome.name.red());
    for failure in &outcome.failures {
        println!("      {}", failure);
    }
}

/// Print the pass/fail totals for a suite
pub fn print_summary(report: &SuiteReport, elapsed: Duration) {
    let passed = report.passed_count();
    let failed = report.failed_count();

    if failed == 0 {
        println!(
            "\n{} {} ({} passed in {:.2}s)\n",
            "✓".green().bold(),
            format!("Suite '{}' passed", report.suite).green().bold(),
            passed,
            elapsed.as_secs_f64()
        );
    } else {
        println!(
            "\n{} {} ({} passed, {} failed in {:.2}s)\n",
            "✗".red().bold(),
            format!("Suite '{}' failed", report.suite).red().bold(),
            passed,
            failed,
            elapsed.as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_args_from_remainder() {
        let args = RunnerArgs::from_remainder(&[
            "offset".to_string(),
            "--fail-fast".to_string(),
        ])
        .unwrap();
        assert_eq!(args.filters, vec!["offset".to_string()]);
        assert!(args.fail_fast);
        assert!(!args.list);

        assert!(RunnerArgs::from_remainder(&["--bogus".to_string()]).is_err());
    }

    #[test]
    fn test_filter_selection() {
        let all = RunnerArgs::default();
        assert!(all.selects("panzoom.ui/nominal"));

        let args = RunnerArgs {
            filters: vec!["scaled".to_string()],
            ..Default::default()
        };
        assert!(args.selects("panzoom.ui/scaled up"));
        assert!(!args.selects("panzoom.ui/offset"));

        let exact = RunnerArgs {
            filters: vec!["panzoom.ui/scaled".to_string()],
            exact: true,
            ..Default::default()
        };
        assert!(!exact.selects("panzoom.ui/scaled up"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_before_input_is_premature() {
        use crate::common::config::LauncherConfig;

        let mut session = ProcessSession::new(LaunchSpec {
            program: PathBuf::from("sh"),
            cwd: std::env::temp_dir(),
            args: vec!["-c".to_string(), "exit 4".to_string()],
            capture_stdout: false,
        });
        session.launch(&LauncherConfig::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let err = ensure_running(&mut session).unwrap_err();
        assert!(matches!(err, Error::PrematureExit(4)));
        assert_eq!(session.state(), SessionState::Exited);

        session.reap(None, Duration::from_millis(200)).await;
        assert_eq!(session.state(), SessionState::Reaped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_running_demo_passes_start_check() {
        use crate::common::config::LauncherConfig;

        let mut session = ProcessSession::new(LaunchSpec {
            program: PathBuf::from("cat"),
            cwd: std::env::temp_dir(),
            args: Vec::new(),
            capture_stdout: false,
        });
        session.launch(&LauncherConfig::default()).await.unwrap();
        assert!(ensure_running(&mut session).is_ok());
        session.reap(None, Duration::from_millis(200)).await;
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(Failure::ExitCode(1).to_string(), "demo exited with code 1");
        assert_eq!(
            Failure::Error(Error::PrematureExit(2)).to_string(),
            "Demo process exited before receiving input (exit code 2)"
        );
    }
}
