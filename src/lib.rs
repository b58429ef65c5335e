//! Demo Harness - black-box verification of non-interactive GUI demos
//!
//! This library starts demo processes, feeds them builder model fixtures over
//! a line-delimited JSON protocol on their standard streams, and checks the
//! echoed models or the exit status of their rendering self-check.

pub mod cli;
pub mod commands;
pub mod common;
pub mod fixtures;
pub mod process;
pub mod protocol;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use protocol::{Envelope, Fixture, Response, Scalar};
