use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{info, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// Runtime connection settings, usually built from `configs::DatabaseConfig`.
/// The default has no URL.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub table_prefix: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    /// Extra attempts after the first failed connect.
    pub connect_retries: u32,
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            table_prefix: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(3600)),
            connect_retries: 3,
            sqlx_logging: false,
        }
    }
}

impl DatabaseConfig {
    pub fn from_app(cfg: &configs::DatabaseConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            table_prefix: cfg.table_prefix.clone(),
            max_connections: cfg.max_connections,
            min_connections: cfg.min_connections,
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.acquire_timeout_secs),
            idle_timeout: Some(Duration::from_secs(cfg.idle_timeout_secs)),
            max_lifetime: Some(Duration::from_secs(cfg.max_lifetime_secs)),
            connect_retries: cfg.connect_retries,
            sqlx_logging: cfg.sqlx_logging,
        }
    }

    /// A private in-memory SQLite database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout: None,
            max_lifetime: None,
            connect_retries: 0,
            ..Self::default()
        }
    }

    /// Every pooled connection to an in-memory SQLite URL opens its own
    /// database, so such pools are pinned to a single connection.
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("sqlite:") && (self.url.contains(":memory:") || self.url.contains("mode=memory"))
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opts = ConnectOptions::new(self.url.clone());
        let (max, min) = if self.is_in_memory() {
            (1, 1)
        } else {
            (self.max_connections, self.min_connections)
        };
        opts.max_connections(max)
            .min_connections(min)
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .sqlx_logging(self.sqlx_logging);
        if !self.is_in_memory() {
            if let Some(idle) = self.idle_timeout {
                opts.idle_timeout(idle);
            }
            if let Some(lifetime) = self.max_lifetime {
                opts.max_lifetime(lifetime);
            }
        }
        opts
    }
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(1u32 << attempt.min(16))
        .min(RETRY_MAX_DELAY)
}

/// Connect with pool settings from `cfg`, retrying with exponential backoff.
pub async fn connect_with_config(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let opts = cfg.connect_options();
    let mut attempt = 0u32;
    loop {
        match Database::connect(opts.clone()).await {
            Ok(db) => {
                info!(event = "db_connected", attempt, "database connection established");
                return Ok(db);
            }
            Err(e) if attempt < cfg.connect_retries => {
                let delay = retry_delay(attempt);
                warn!(
                    event = "db_connect_retry",
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "database connection failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
