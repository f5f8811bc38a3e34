//! # Quill Core
//!
//! The domain layer of Quill: records, query expressions, projections
//! and the ports that storage backends implement.
//! This crate contains pure data-access logic with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod query;
pub mod schema;
pub mod shape;

pub use error::RepoError;
