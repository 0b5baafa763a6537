use std::path::Path;
use std::process::ExitCode;

use configs::{AppConfig, LogFormat, LoggingConfig};
use dotenvy::dotenv;
use tracing::{error, info, warn};

fn init_logging(cfg: &LoggingConfig) {
    match (&cfg.error_log, cfg.format) {
        (Some(path), format) => {
            if let Err(e) = common::utils::logging::init_logging_with_error_file(Path::new(path), format == LogFormat::Json) {
                common::utils::logging::init_logging_default();
                warn!(event = "error_log_unavailable", %path, error = %e, "cannot open error log; logging to stdout only");
            }
        }
        (None, LogFormat::Json) => common::utils::logging::init_logging_json(),
        (None, LogFormat::Compact) => common::utils::logging::init_logging_default(),
    }
}

fn main() -> ExitCode {
    // Load .env early so RUST_LOG and DATABASE_URL take effect
    dotenv().ok();

    // Prefer config.toml, fall back to environment variables
    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(file_err) => match AppConfig::from_env() {
            Ok(cfg) => cfg,
            Err(env_err) => {
                common::utils::logging::init_logging_default();
                error!(event = "config_invalid", file_error = %file_err, env_error = %env_err, "no usable configuration");
                return ExitCode::FAILURE;
            }
        },
    };
    init_logging(&cfg.logging);

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let db_cfg = models::db::DatabaseConfig::from_app(&cfg.database);
    info!(
        event = "start",
        version = env!("CARGO_PKG_VERSION"),
        table_prefix = %db_cfg.table_prefix,
        "preparing counter schema"
    );

    rt.block_on(async move {
        match service::CounterStore::open(&db_cfg).await {
            Ok(_) => {
                info!(event = "migrated", table = common::naming::counter_table(), "counter schema is up to date");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(event = "migrate_failed", kind = e.kind(), error = %e, "cannot prepare counter schema");
                ExitCode::FAILURE
            }
        }
    })
}
