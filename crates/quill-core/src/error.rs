//! Repository-level error types.

use thiserror::Error;

use crate::schema::EntityKind;

/// Errors raised by the data access layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("{entity} not found")]
    NotFound { entity: EntityKind },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl RepoError {
    pub fn not_found(entity: EntityKind) -> Self {
        Self::NotFound { entity }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
