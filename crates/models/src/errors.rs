use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    /// A JSON column of a stored row does not hold the expected document.
    #[error("corrupt stored JSON in `{field}`: {source}")]
    CorruptJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// Caller supplied JSON that cannot be stored.
    #[error("invalid JSON for `{field}`: {source}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
