//! PostgreSQL persistence via SeaORM.

mod condition;
mod connections;
mod order;
mod postgres_base;
mod postgres_repo;
mod store;

pub mod entity;

pub use connections::{DatabaseConfig, DatabaseConnections};
pub use store::{PostgresStore, StoreConnection};

#[cfg(test)]
mod tests;
