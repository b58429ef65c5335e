//! Exchange protocol spoken with demo processes over their standard streams

pub mod codec;
mod types;

pub use types::{Envelope, Fixture, Response, Scalar};
