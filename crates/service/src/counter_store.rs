//! `CounterStore`: the boundary callers use to record inspection counts.
//!
//! Failures never escape as errors here. They are logged with their
//! classification and turned into `false` / `None`, while "no active counter"
//! is an ordinary negative answer.

use std::backtrace::{Backtrace, BacktraceStatus};

use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tracing::{error, info};

use models::counter::{self, Tally};
use models::db::DatabaseConfig;
use models::part::PartTally;

use crate::counter_service;
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};

#[derive(Clone, Debug)]
pub struct CounterStore {
    db: DatabaseConnection,
}

impl CounterStore {
    /// Apply the table prefix, connect and create the schema if absent.
    pub async fn open(cfg: &DatabaseConfig) -> Result<Self, ServiceError> {
        let table = common::naming::set_table_prefix(&cfg.table_prefix)?;
        let db = models::db::connect_with_config(cfg)
            .await
            .map_err(|e| ServiceError::Connect(format!("{e:#}")))?;
        migration::Migrator::up(&db, None).await?;
        info!(event = "store_ready", table, "counter store ready");
        Ok(Self { db })
    }

    /// Wrap a connection whose schema is already in place.
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn save_result(&self, location: &str, tally: Tally, custom_fields: &str, active: bool) -> bool {
        match counter_service::save_result(&self.db, location, tally, custom_fields, active).await {
            Ok(_) => true,
            Err(e) => {
                report("save_result", location, &e);
                false
            }
        }
    }

    pub async fn save_part_result(&self, location: &str, tally: PartTally) -> bool {
        match counter_service::save_part_result(&self.db, location, tally).await {
            Ok(updated) => updated.is_some(),
            Err(e) => {
                report("save_part_result", location, &e);
                false
            }
        }
    }

    pub async fn close_current_count(&self, location: &str) -> bool {
        match counter_service::close_current_count(&self.db, location).await {
            Ok(closed) => closed.is_some(),
            Err(e) => {
                report("close_current_count", location, &e);
                false
            }
        }
    }

    pub async fn get_current_count(&self, key: &str) -> Option<counter::Model> {
        counter_service::get_current_count(&self.db, key)
            .await
            .unwrap_or_else(|e| {
                report("get_current_count", key, &e);
                None
            })
    }

    pub async fn get_count(&self, id: i32) -> Option<counter::Model> {
        counter_service::get_count(&self.db, id).await.unwrap_or_else(|e| {
            report("get_count", &id.to_string(), &e);
            None
        })
    }

    pub async fn get_paginated(&self, key: &str, page: u64, per_page: u64) -> Option<Page<counter::Model>> {
        match counter_service::get_paginated(&self.db, key, Pagination::new(page, per_page)).await {
            Ok(page) => Some(page),
            Err(e) => {
                report("get_paginated", key, &e);
                None
            }
        }
    }
}

/// Log a failed operation. `key` is the location, or the id for `get_count`.
///
/// The trace is the reporting call site's stack, captured only when
/// `RUST_BACKTRACE` enables it; the failure's origin is in `error`.
fn report(op: &'static str, key: &str, err: &ServiceError) {
    error!(op, %key, kind = err.kind(), error = %err, "counter operation failed");
    let call_site = Backtrace::capture();
    if call_site.status() == BacktraceStatus::Captured {
        error!(op, %key, backtrace = %call_site, "call site of failed operation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_shared_store, get_store, unique_location};
    use futures::future::join_all;
    use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait, QueryFilter, Set};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    async fn rows_for(store: &CounterStore, location: &str) -> u64 {
        counter::Entity::find()
            .filter(counter::Column::Location.eq(location))
            .count(store.connection())
            .await
            .expect("count rows")
    }

    #[tokio::test]
    async fn first_save_creates_active_counter() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("line1");
        let tally = Tally { total: 100, source: 95, defects: 5, correct: 90 };

        assert!(store.save_result(&loc, tally, "", true).await);

        let current = store.get_current_count(&loc).await.expect("active counter");
        assert!(current.active);
        assert_eq!(current.location, loc);
        assert_eq!(
            (current.total_count, current.source_count, current.defects_count, current.correct_count),
            (100, 95, 5, 90)
        );
        assert_eq!(rows_for(&store, &loc).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn second_save_updates_in_place() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("line");
        assert!(store.save_result(&loc, Tally { total: 1, ..Tally::default() }, "", true).await);
        let first = store.get_current_count(&loc).await.expect("created");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.save_result(&loc, Tally { total: 7, correct: 7, ..Tally::default() }, "", true).await);
        let second = store.get_current_count(&loc).await.expect("updated");

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!((second.total_count, second.correct_count), (7, 7));
        assert_eq!(rows_for(&store, &loc).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn custom_fields_merge_across_saves() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("line");
        assert!(store.save_result(&loc, Tally::default(), r#"{"a": 1}"#, true).await);
        assert!(store.save_result(&loc, Tally::default(), r#"{"a": 1}"#, true).await);
        let once = store.get_current_count(&loc).await.expect("row");
        assert_eq!(once.custom_fields.as_deref(), Some(r#"{"a": 1}"#));

        assert!(store.save_result(&loc, Tally::default(), r#"{"a": 2, "operator": "Иван"}"#, true).await);
        assert!(store.save_result(&loc, Tally::default(), "", true).await);
        let merged = store.get_current_count(&loc).await.expect("row");
        assert_eq!(
            serde_json::Value::Object(merged.decoded_custom_fields()?),
            json!({"a": 2, "operator": "Иван"})
        );
        assert!(merged.custom_fields.as_deref().is_some_and(str::is_ascii));
        Ok(())
    }

    #[tokio::test]
    async fn part_without_active_counter_is_a_no_op() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("idle");
        assert!(!store.save_part_result(&loc, PartTally { current: 1, ..PartTally::default() }).await);
        assert_eq!(rows_for(&store, &loc).await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn parts_accumulate_newest_first() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("parts");
        assert!(store.save_result(&loc, Tally::default(), "", true).await);
        let before = store.get_current_count(&loc).await.expect("row");

        for current in 1..=5 {
            let tally = PartTally { current, total: current * 10, defects: 1, correct: current * 10 - 1 };
            assert!(store.save_part_result(&loc, tally).await);
        }

        let after = store.get_current_count(&loc).await.expect("row");
        let parts = after.decoded_parts()?;
        assert_eq!(parts.len(), 5);
        assert!(parts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(after.id, before.id);
        assert_eq!(after.tally(), before.tally());
        assert!(after.updated_at >= before.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn closing_then_saving_starts_a_new_counter() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("shift");
        assert!(store.save_result(&loc, Tally { total: 3, ..Tally::default() }, "", true).await);
        let old = store.get_current_count(&loc).await.expect("row");

        assert!(store.close_current_count(&loc).await);
        assert!(store.get_current_count(&loc).await.is_none());
        assert!(!store.close_current_count(&loc).await);

        assert!(store.save_result(&loc, Tally { total: 1, ..Tally::default() }, "", true).await);
        let fresh = store.get_current_count(&loc).await.expect("row");
        assert_ne!(fresh.id, old.id);
        assert_eq!(fresh.total_count, 1);

        let retired = store.get_count(old.id).await.expect("old row kept");
        assert!(!retired.active);
        assert_eq!(retired.total_count, 3);
        assert_eq!(rows_for(&store, &loc).await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn get_count_misses_unknown_id() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        assert!(store.get_count(i32::MAX).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn pagination_over_fifteen_rows() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("paged");
        for total in 0..15 {
            assert!(store.save_result(&loc, Tally { total, ..Tally::default() }, "", true).await);
            assert!(store.close_current_count(&loc).await);
        }

        let page = store.get_paginated(&loc, 2, 10).await.expect("page");
        assert_eq!(page.total, 15);
        assert_eq!(page.results.len(), 5);
        assert!(!page.has_next);
        assert!(page.has_prev);
        assert_eq!(page.results[0].total_count, 10);

        let first = store.get_paginated(&loc, 0, 0).await.expect("clamped page");
        assert_eq!((first.page, first.per_page), (1, 1));
        assert_eq!(first.results.len(), 1);
        assert!(first.has_next);

        let empty = store.get_paginated(&unique_location("none"), 1, 10).await.expect("empty page");
        assert_eq!(empty.total, 0);
        assert!(empty.results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_custom_fields_fail_without_changes() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("corrupt");
        assert!(store.save_result(&loc, Tally { total: 4, ..Tally::default() }, "", true).await);
        let row = store.get_current_count(&loc).await.expect("row");
        let mut am: counter::ActiveModel = row.clone().into();
        am.custom_fields = Set(Some("{broken".into()));
        am.update(store.connection()).await?;

        assert!(!store.save_result(&loc, Tally { total: 9, ..Tally::default() }, r#"{"a": 1}"#, true).await);
        let after = store.get_current_count(&loc).await.expect("row");
        assert_eq!(after.total_count, 4);
        assert_eq!(after.custom_fields.as_deref(), Some("{broken"));
        Ok(())
    }

    #[tokio::test]
    async fn negative_counts_are_refused() -> Result<(), anyhow::Error> {
        let store = get_store().await?;
        let loc = unique_location("neg");
        assert!(!store.save_result(&loc, Tally { defects: -3, ..Tally::default() }, "", true).await);
        assert_eq!(rows_for(&store, &loc).await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_first_saves_leave_one_active_counter() -> Result<(), anyhow::Error> {
        let (store, _dir) = get_shared_store().await?;
        let loc = unique_location("race");
        let db = store.connection().clone();
        let barrier = Arc::new(Barrier::new(8));

        let handles = (0..8).map(|total| {
            let db = db.clone();
            let loc = loc.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                counter_service::save_result(&db, &loc, Tally { total, ..Tally::default() }, "", true).await
            })
        });
        let outcomes: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .collect();

        assert!(outcomes.iter().any(Result::is_ok));
        // Postgres lets every transaction read "no active row", so losers hit
        // the unique index. SQLite serialises writers and may refuse a stale
        // writer as busy instead.
        let allowed: &[&str] = match db.get_database_backend() {
            DbBackend::Postgres => &["conflict"],
            _ => &["conflict", "storage"],
        };
        for err in outcomes.iter().filter_map(|o| o.as_ref().err()) {
            assert!(allowed.contains(&err.kind()), "unexpected failure: {err}");
        }

        let active = counter::Entity::find()
            .filter(counter::Column::Location.eq(loc.as_str()))
            .filter(counter::Column::Active.eq(true))
            .count(&db)
            .await?;
        assert_eq!(active, 1);
        assert!(store.get_current_count(&loc).await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn get_count_failures_are_reported_with_the_id() -> Result<(), anyhow::Error> {
        let store = CounterStore::open(&DatabaseConfig::in_memory()).await?;
        let log = tempfile::NamedTempFile::new()?;
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(log.reopen()?))
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        store
            .connection()
            .execute_unprepared(&format!("DROP TABLE {}", common::naming::counter_table()))
            .await?;
        assert!(store.get_count(42).await.is_none());

        let logged = std::fs::read_to_string(log.path())?;
        assert!(logged.contains("get_count"), "{logged}");
        assert!(logged.contains("key=42"), "{logged}");
        assert!(logged.contains("storage"), "{logged}");
        Ok(())
    }
}
