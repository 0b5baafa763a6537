//! Counter operations. Each call runs in its own transaction: committed when
//! the operation succeeds, rolled back on any error.

use chrono::{Local, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, warn};

use models::counter::{self, Tally};
use models::custom_fields;
use models::part::{self, PartEntry, PartTally};

use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};

async fn finish<T>(txn: DatabaseTransaction, outcome: Result<T, ServiceError>) -> Result<T, ServiceError> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(event = "rollback_failed", error = %rb, "transaction rollback failed");
            }
            Err(e)
        }
    }
}

/// Create the active counter for `location`, or overwrite the counters of the
/// existing one and merge `raw_custom_fields` into its stored fields.
pub async fn save_result(
    db: &DatabaseConnection,
    location: &str,
    tally: Tally,
    raw_custom_fields: &str,
    active: bool,
) -> Result<counter::Model, ServiceError> {
    let txn = db.begin().await?;
    let outcome = save_result_in(&txn, location, tally, raw_custom_fields, active).await;
    finish(txn, outcome).await
}

async fn save_result_in(
    txn: &DatabaseTransaction,
    location: &str,
    tally: Tally,
    raw_custom_fields: &str,
    active: bool,
) -> Result<counter::Model, ServiceError> {
    tally.validate()?;
    let incoming = custom_fields::parse_input(raw_custom_fields)?;

    let Some(row) = counter::find_active_for_update(txn, location).await? else {
        let stored = if incoming.is_empty() {
            "{}".to_string()
        } else {
            raw_custom_fields.trim().to_string()
        };
        let created = counter::create(txn, location, tally, stored, active).await?;
        info!(event = "counter_created", %location, id = created.id, "counter created");
        return Ok(created);
    };

    let merged = custom_fields::merge(row.decoded_custom_fields()?, incoming);
    let encoded = custom_fields::encode(&merged)?;

    let mut am: counter::ActiveModel = row.into();
    am.active = Set(active);
    am.total_count = Set(tally.total);
    am.source_count = Set(tally.source);
    am.defects_count = Set(tally.defects);
    am.correct_count = Set(tally.correct);
    am.custom_fields = Set(Some(encoded));
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(txn).await?;
    debug!(event = "counter_updated", %location, id = updated.id, active, "counter updated");
    Ok(updated)
}

/// Append a part entry to the active counter. `Ok(None)` when `location` has
/// no active counter.
pub async fn save_part_result(
    db: &DatabaseConnection,
    location: &str,
    tally: PartTally,
) -> Result<Option<counter::Model>, ServiceError> {
    let txn = db.begin().await?;
    let outcome = save_part_result_in(&txn, location, tally).await;
    finish(txn, outcome).await
}

async fn save_part_result_in(
    txn: &DatabaseTransaction,
    location: &str,
    tally: PartTally,
) -> Result<Option<counter::Model>, ServiceError> {
    let Some(row) = counter::find_active_for_update(txn, location).await? else {
        debug!(event = "part_skipped", %location, "no active counter");
        return Ok(None);
    };

    let mut parts = row.decoded_parts()?;
    part::append(&mut parts, PartEntry::stamped(tally, Local::now().naive_local()));
    let encoded = part::encode(&parts)?;

    let mut am: counter::ActiveModel = row.into();
    am.parts = Set(Some(encoded));
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(txn).await?;
    debug!(event = "part_appended", %location, id = updated.id, parts = parts.len(), "part result appended");
    Ok(Some(updated))
}

/// Retire the active counter. `Ok(None)` when there is none.
pub async fn close_current_count(
    db: &DatabaseConnection,
    location: &str,
) -> Result<Option<counter::Model>, ServiceError> {
    let txn = db.begin().await?;
    let outcome = close_current_count_in(&txn, location).await;
    finish(txn, outcome).await
}

async fn close_current_count_in(
    txn: &DatabaseTransaction,
    location: &str,
) -> Result<Option<counter::Model>, ServiceError> {
    let Some(row) = counter::find_active_for_update(txn, location).await? else {
        return Ok(None);
    };
    let mut am: counter::ActiveModel = row.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    let closed = am.update(txn).await?;
    info!(event = "counter_closed", %location, id = closed.id, "counter closed");
    Ok(Some(closed))
}

/// Active counter for `location`.
pub async fn get_current_count(
    db: &DatabaseConnection,
    location: &str,
) -> Result<Option<counter::Model>, ServiceError> {
    let txn = db.begin().await?;
    let outcome = counter::find_active(&txn, location).await.map_err(ServiceError::from);
    finish(txn, outcome).await
}

/// Counter by primary key.
pub async fn get_count(db: &DatabaseConnection, id: i32) -> Result<Option<counter::Model>, ServiceError> {
    let txn = db.begin().await?;
    let outcome = counter::Entity::find_by_id(id).one(&txn).await.map_err(ServiceError::from);
    finish(txn, outcome).await
}

/// All counters of `location`, active or retired, in id order.
pub async fn get_paginated(
    db: &DatabaseConnection,
    location: &str,
    opts: Pagination,
) -> Result<Page<counter::Model>, ServiceError> {
    let txn = db.begin().await?;
    let outcome = get_paginated_in(&txn, location, opts).await;
    finish(txn, outcome).await
}

async fn get_paginated_in(
    txn: &DatabaseTransaction,
    location: &str,
    opts: Pagination,
) -> Result<Page<counter::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = counter::Entity::find()
        .filter(counter::Column::Location.eq(location))
        .order_by_asc(counter::Column::Id)
        .paginate(txn, per_page);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page_idx).await?;
    Ok(Page::new(opts, total, rows))
}
