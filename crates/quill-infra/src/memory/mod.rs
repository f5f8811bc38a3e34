//! In-memory persistence.

mod eval;
mod sort;
mod state;
mod store;
mod table;

pub use store::InMemoryStore;

#[cfg(test)]
mod tests;
