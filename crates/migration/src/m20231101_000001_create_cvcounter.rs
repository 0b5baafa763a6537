//! Create the counter table.
//!
//! `parts` and `custom_fields` are text columns holding JSON documents.
use sea_orm_migration::{prelude::*, schema::*};

use crate::counter_table;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(counter_table())
                    .if_not_exists()
                    .col(pk_auto(Counter::Id))
                    .col(boolean(Counter::Active).default(true))
                    .col(string_len(Counter::Location, 255))
                    .col(integer(Counter::TotalCount).default(0))
                    .col(integer(Counter::SourceCount).default(0))
                    .col(integer(Counter::DefectsCount).default(0))
                    .col(integer(Counter::CorrectCount).default(0))
                    .col(ColumnDef::new(Counter::Parts).text().null())
                    .col(ColumnDef::new(Counter::CustomFields).text().null())
                    .col(timestamp_with_time_zone(Counter::CreatedAt))
                    .col(timestamp_with_time_zone(Counter::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(counter_table()).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Counter {
    Id,
    Active,
    Location,
    TotalCount,
    SourceCount,
    DefectsCount,
    CorrectCount,
    Parts,
    CustomFields,
    CreatedAt,
    UpdatedAt,
}
