use sea_orm_migration::prelude::*;

use crate::counter_table;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn location_index_name() -> String {
    format!("idx_{}_location", common::naming::counter_table())
}

fn active_location_index_name() -> String {
    format!("uniq_{}_active_location", common::naming::counter_table())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Lookups and pagination filter on location
        manager
            .create_index(
                Index::create()
                    .name(location_index_name())
                    .table(counter_table())
                    .col(Counter::Location)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // At most one active counter per location. Partial indexes are
        // understood by both Postgres and SQLite with the same syntax.
        let sql = format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "{}" ON "{}" ("location") WHERE "active""#,
            active_location_index_name(),
            common::naming::counter_table(),
        );
        manager.get_connection().execute_unprepared(&sql).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = format!(r#"DROP INDEX IF EXISTS "{}""#, active_location_index_name());
        manager.get_connection().execute_unprepared(&sql).await?;
        manager
            .drop_index(Index::drop().name(location_index_name()).table(counter_table()).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Counter { Location }
