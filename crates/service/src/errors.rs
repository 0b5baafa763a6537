use common::NamingError;
use models::errors::ModelError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("cannot connect to database: {0}")]
    Connect(String),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("naming error: {0}")]
    Naming(#[from] NamingError),
}

impl ServiceError {
    /// Coarse classification used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Db(e) | Self::Model(ModelError::Db(e)) if is_unique_violation(e) => "conflict",
            Self::Db(_) | Self::Connect(_) | Self::Model(ModelError::Db(_)) => "storage",
            Self::Model(ModelError::CorruptJson { .. }) => "corrupt_stored_json",
            Self::Model(ModelError::InvalidJson { .. } | ModelError::Validation(_)) => "invalid_input",
            Self::Naming(_) => "config",
        }
    }
}

/// A write lost against the one-active-counter-per-location index.
fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
