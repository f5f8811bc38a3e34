//! # Quill Infrastructure
//!
//! Concrete [`Store`](quill_core::ports::Store) implementations for the
//! ports defined in `quill-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory store only
//! - `postgres` - PostgreSQL store via SeaORM
//! - `auth` - Argon2 password hashing

#[cfg(feature = "postgres")]
mod redact;

pub mod memory;

#[cfg(feature = "postgres")]
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

pub use memory::InMemoryStore;

#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, DatabaseConnections, PostgresStore, StoreConnection};

#[cfg(feature = "auth")]
pub use auth::Argon2PasswordService;
