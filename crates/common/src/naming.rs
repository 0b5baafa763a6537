//! Table naming.
//!
//! The counter table name is `<prefix>cvcounter` and the migration record table
//! is `<prefix>seaql_migrations`, so deployments with different prefixes can
//! share one database. The prefix is configured once, before the schema is
//! created or any query is built; every later lookup sees the same names for
//! the lifetime of the process.

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Unprefixed name of the counter table.
pub const COUNTER_TABLE_BASE: &str = "cvcounter";

/// Unprefixed name of the table recording applied migrations.
pub const MIGRATION_TABLE_BASE: &str = "seaql_migrations";

#[derive(Debug)]
struct TableNames {
    counter: String,
    migrations: String,
}

impl TableNames {
    fn for_prefix(prefix: &str) -> Result<Self, NamingError> {
        Ok(Self {
            counter: prefixed(prefix, COUNTER_TABLE_BASE)?,
            migrations: prefixed(prefix, MIGRATION_TABLE_BASE)?,
        })
    }

    fn unprefixed() -> Self {
        Self {
            counter: COUNTER_TABLE_BASE.to_string(),
            migrations: MIGRATION_TABLE_BASE.to_string(),
        }
    }
}

static TABLES: OnceCell<TableNames> = OnceCell::new();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("invalid table prefix {0:?}: only ASCII letters, digits and '_' are allowed")]
    InvalidPrefix(String),
    #[error("counter table already configured as {current:?}, cannot switch to {requested:?}")]
    AlreadyConfigured { current: String, requested: String },
}

/// Join a prefix and a base table name after validating the prefix.
pub fn prefixed(prefix: &str, base: &str) -> Result<String, NamingError> {
    validate_prefix(prefix)?;
    Ok(format!("{prefix}{base}"))
}

pub fn validate_prefix(prefix: &str) -> Result<(), NamingError> {
    if prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(NamingError::InvalidPrefix(prefix.to_string()))
    }
}

/// Fix the counter table prefix for this process.
///
/// Calling it again with a prefix that yields the same name is a no-op.
pub fn set_table_prefix(prefix: &str) -> Result<&'static str, NamingError> {
    let requested = TableNames::for_prefix(prefix)?;
    let requested_counter = requested.counter.clone();
    let current = TABLES.get_or_init(|| requested);
    if current.counter != requested_counter {
        return Err(NamingError::AlreadyConfigured {
            current: current.counter.clone(),
            requested: requested_counter,
        });
    }
    Ok(current.counter.as_str())
}

fn tables() -> &'static TableNames {
    TABLES.get_or_init(TableNames::unprefixed)
}

/// Name of the counter table. Falls back to the unprefixed name (and pins it)
/// when no prefix was configured.
pub fn counter_table() -> &'static str {
    tables().counter.as_str()
}

/// Name of the migration record table, prefixed like the counter table.
pub fn migration_table() -> &'static str {
    tables().migrations.as_str()
}
