#![cfg(test)]
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use tempfile::TempDir;
use uuid::Uuid;

use crate::counter_store::CounterStore;

fn test_config() -> DatabaseConfig {
    match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => DatabaseConfig { url, max_connections: 20, acquire_timeout: std::time::Duration::from_secs(10), ..DatabaseConfig::default() },
        Err(_) => DatabaseConfig::in_memory(),
    }
}

/// Connection with the schema applied: `TEST_DATABASE_URL` when set, else a
/// private in-memory SQLite database per call.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = connect_with_config(&test_config()).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn get_store() -> Result<CounterStore, anyhow::Error> {
    Ok(CounterStore::open(&test_config()).await?)
}

/// Store whose pool holds several connections to one database:
/// `TEST_DATABASE_URL` when set, else a SQLite file in a temporary directory
/// that must outlive the store.
pub async fn get_shared_store() -> Result<(CounterStore, Option<TempDir>), anyhow::Error> {
    let (cfg, dir) = match std::env::var("TEST_DATABASE_URL") {
        Ok(_) => (test_config(), None),
        Err(_) => {
            let dir = tempfile::tempdir()?;
            let url = format!("sqlite://{}?mode=rwc", dir.path().join("counter.db").display());
            let cfg = DatabaseConfig { url, max_connections: 8, connect_retries: 0, ..DatabaseConfig::default() };
            (cfg, Some(dir))
        }
    };
    Ok((CounterStore::open(&cfg).await?, dir))
}

/// Location name unique to the calling test.
pub fn unique_location(tag: &str) -> String {
    format!("{tag}_{}", Uuid::new_v4().simple())
}
