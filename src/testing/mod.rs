//! Suite execution
//!
//! Built-in and YAML-defined suites are run scenario by scenario against a
//! demo binary. Assertions are made on structured data: the exit code and
//! the decoded response envelope.

pub mod artifacts;
mod config;
mod runner;
pub mod suites;
pub mod verifier;

pub use config::*;
pub use runner::{
    print_summary, Driver, Failure, RunnerArgs, ScenarioOutcome, SuiteReport, TestReport,
};
