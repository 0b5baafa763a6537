//! The counter entity.
//!
//! Written in SeaORM's expanded form because the table name comes from
//! `common::naming` at runtime instead of a fixed attribute.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use sea_orm::{NotSet, QueryFilter, QueryOrder, QuerySelect, Select, Set};
use serde::{Deserialize, Serialize};

use crate::custom_fields::{self, CustomFields};
use crate::errors::ModelError;
use crate::part::{self, PartEntry};

#[derive(Copy, Clone, Default, Debug, DeriveEntity)]
pub struct Entity;

impl EntityName for Entity {
    fn table_name(&self) -> &str {
        common::naming::counter_table()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveModel, DeriveActiveModel, Serialize, Deserialize)]
pub struct Model {
    pub id: i32,
    pub active: bool,
    pub location: String,
    pub total_count: i32,
    pub source_count: i32,
    pub defects_count: i32,
    pub correct_count: i32,
    pub parts: Option<String>,
    pub custom_fields: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveColumn)]
pub enum Column {
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

#[derive(Copy, Clone, Debug, EnumIter, DerivePrimaryKey)]
pub enum PrimaryKey {
    Id,
}

impl PrimaryKeyTrait for PrimaryKey {
    type ValueType = i32;

    fn auto_increment() -> bool {
        true
    }
}

impl ColumnTrait for Column {
    type EntityName = Entity;

    fn def(&self) -> ColumnDef {
        match self {
            Self::Id => ColumnType::Integer.def(),
            Self::Active => ColumnType::Boolean.def(),
            Self::Location => ColumnType::String(StringLen::N(255)).def(),
            Self::TotalCount | Self::SourceCount | Self::DefectsCount | Self::CorrectCount => {
                ColumnType::Integer.def()
            }
            Self::Parts | Self::CustomFields => ColumnType::Text.def().nullable(),
            Self::CreatedAt | Self::UpdatedAt => ColumnType::TimestampWithTimeZone.def(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn tally(&self) -> Tally {
        Tally {
            total: self.total_count,
            source: self.source_count,
            defects: self.defects_count,
            correct: self.correct_count,
        }
    }

    /// Part log, newest first.
    pub fn decoded_parts(&self) -> Result<Vec<PartEntry>, ModelError> {
        part::decode_stored(self.parts.as_deref())
    }

    pub fn decoded_custom_fields(&self) -> Result<CustomFields, ModelError> {
        custom_fields::decode_stored(self.custom_fields.as_deref())
    }
}

/// The four cumulative counters of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: i32,
    pub source: i32,
    pub defects: i32,
    pub correct: i32,
}

impl Tally {
    pub fn validate(&self) -> Result<(), ModelError> {
        let fields = [
            ("total_count", self.total),
            ("source_count", self.source),
            ("defects_count", self.defects),
            ("correct_count", self.correct),
        ];
        match fields.iter().find(|(_, v)| *v < 0) {
            Some((name, v)) => Err(ModelError::Validation(format!("{name} must be >= 0, got {v}"))),
            None => Ok(()),
        }
    }
}

/// Active counters for `location`, lowest id first.
pub fn active_for(location: &str) -> Select<Entity> {
    Entity::find()
        .filter(Column::Location.eq(location))
        .filter(Column::Active.eq(true))
        .order_by_asc(Column::Id)
}

pub async fn find_active<C: ConnectionTrait>(db: &C, location: &str) -> Result<Option<Model>, ModelError> {
    Ok(active_for(location).one(db).await?)
}

/// Like [`find_active`], holding a row lock until the transaction ends on
/// backends that support `FOR UPDATE`.
pub async fn find_active_for_update<C: ConnectionTrait>(db: &C, location: &str) -> Result<Option<Model>, ModelError> {
    Ok(active_for(location).lock_exclusive().one(db).await?)
}

/// Insert a new counter row.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    location: &str,
    tally: Tally,
    custom_fields: String,
    active: bool,
) -> Result<Model, ModelError> {
    tally.validate()?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let am = ActiveModel {
        id: NotSet,
        active: Set(active),
        location: Set(location.to_string()),
        total_count: Set(tally.total),
        source_count: Set(tally.source),
        defects_count: Set(tally.defects),
        correct_count: Set(tally.correct),
        parts: Set(None),
        custom_fields: Set(Some(custom_fields)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
