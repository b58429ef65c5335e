//! Common utilities shared by the launcher, protocol and driver

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
