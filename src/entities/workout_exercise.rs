use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::SyncStatus;

/// An exercise performed within a workout. References its parent workout
/// and the exercise definition by local id.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workout_exercises")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub local_id: String,
    pub server_id: Option<String>,
    #[sea_orm(indexed)]
    pub workout_local_id: String,
    pub exercise_local_id: String,
    pub order_index: i32,
    pub notes: Option<String>,
    pub updated_at: DateTimeUtc,
    pub sync_status: SyncStatus,
    pub needs_sync: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
