use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::SyncStatus;

/// A user-owned exercise definition, possibly copied from the read-only
/// exercise library (tracked via `library_id`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exercises")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub local_id: String,
    pub server_id: Option<String>,
    #[sea_orm(indexed)]
    pub user_id: String,
    pub name: String,
    pub muscle_group: Option<String>,
    pub description: Option<String>,
    pub library_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub sync_status: SyncStatus,
    pub needs_sync: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
