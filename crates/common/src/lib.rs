//! Shared error definitions and time helpers used across all parrot crates.

pub mod error;
pub mod time;

pub use error::{Error, FromMessage, Result};
