//! Store Errors
//!
//! Error types for ledger and identity store operations.

use uuid::Uuid;

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Row addressed by id does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// Deletion rejected because dependent rows exist
    #[error("Cannot delete {entity} {id}: dependent records exist")]
    DeleteProtected { entity: &'static str, id: Uuid },

    /// Unique constraint violated; holds the field name
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(String),

    /// Foreign key points at a missing row
    #[error("Referenced {0} does not exist")]
    MissingReference(String),

    /// Serialization failure or deadlock; the whole unit may be retried
    #[error("Concurrent modification conflict")]
    ConcurrencyConflict,

    /// A stored value could not be decoded into a domain type
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Store could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Check if this error is a concurrency conflict
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict)
    }
}

/// Postgres SQLSTATE codes the store reacts to
mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const SERIALIZATION_FAILURE: &str = "40001";
    pub const DEADLOCK_DETECTED: &str = "40P01";
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some(sqlstate::UNIQUE_VIOLATION) => {
                    return StoreError::UniqueViolation(unique_field(&constraint));
                }
                Some(sqlstate::FOREIGN_KEY_VIOLATION) => {
                    return StoreError::MissingReference(constraint);
                }
                Some(sqlstate::SERIALIZATION_FAILURE) | Some(sqlstate::DEADLOCK_DETECTED) => {
                    return StoreError::ConcurrencyConflict;
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Map a unique constraint name (`profiles_tax_number_key`) to its field
fn unique_field(constraint: &str) -> String {
    const FIELDS: &[&str] = &["username", "phone_number", "id_number", "tax_number"];

    FIELDS
        .iter()
        .find(|field| constraint.contains(*field))
        .map(|field| field.to_string())
        .unwrap_or_else(|| constraint.to_string())
}
