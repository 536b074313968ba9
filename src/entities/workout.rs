use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{SyncStatus, WorkoutStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workouts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub local_id: String,
    pub server_id: Option<String>,
    #[sea_orm(indexed)]
    pub user_id: String,
    pub template_id: Option<String>,
    pub name: String,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    #[sea_orm(indexed)]
    pub status: WorkoutStatus,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub server_updated_at: Option<DateTimeUtc>,
    pub sync_status: SyncStatus,
    pub needs_sync: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
