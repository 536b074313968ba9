use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::SyncStatus;

/// A set logged against a workout exercise. Set numbers are 1-based and
/// kept contiguous when a set is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workout_sets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub local_id: String,
    pub server_id: Option<String>,
    #[sea_orm(indexed)]
    pub workout_exercise_local_id: String,
    pub set_number: i32,
    pub weight: f64,
    pub reps: i32,
    pub rpe: Option<f64>,
    pub completed: bool,
    pub completed_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
    pub sync_status: SyncStatus,
    pub needs_sync: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
