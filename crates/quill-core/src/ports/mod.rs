//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod repository;
mod transaction;

pub use auth::{AuthError, PasswordService};
pub use repository::{Record, Repository, Store};
pub use transaction::{Mutation, MutationOutcome, Outcome, Write, apply_in_order, clear_all};
