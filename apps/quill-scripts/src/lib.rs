//! # Quill Scripts
//!
//! Shared plumbing for the demonstration binaries under `src/bin`: each
//! binary opens a [`session::Session`], runs one linear sequence of data
//! access calls and prints every result as JSON.

pub mod config;
pub mod fixtures;
pub mod output;
pub mod session;
pub mod telemetry;
