//! Shared building blocks for the binaries and the HTTP crate.

pub mod types;
pub mod utils;
