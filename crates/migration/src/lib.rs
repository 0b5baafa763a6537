//! Migrator for the counter schema. Table names, including the migration
//! record table, go through `common::naming`, so the configured prefix must be
//! set before `up` runs. Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20231101_000001_create_cvcounter;
mod m20231101_000002_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20231101_000001_create_cvcounter::Migration),
            // Indexes should always be applied last
            Box::new(m20231101_000002_add_indexes::Migration),
        ]
    }

    // Each prefix keeps its own record so a shared database migrates every
    // deployment's tables.
    fn migration_table_name() -> DynIden {
        Alias::new(common::naming::migration_table()).into_iden()
    }
}

/// Table identifier honoring the configured prefix.
pub(crate) fn counter_table() -> Alias {
    Alias::new(common::naming::counter_table())
}
