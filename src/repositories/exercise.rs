//! Exercise repository for database operations.

use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder,
};

use crate::entities::exercise;
use crate::entities::SyncStatus;

/// Repository for user-owned exercise definitions.
pub struct ExerciseRepository;

impl ExerciseRepository {
    /// Get a single exercise by local id.
    pub async fn get_by_local_id<C>(conn: &C, local_id: &str) -> Result<Option<exercise::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(exercise::Entity::find()
            .filter(exercise::Column::LocalId.eq(local_id))
            .one(conn)
            .await?)
    }

    /// Get a single exercise by server id.
    pub async fn get_by_server_id<C>(conn: &C, server_id: &str) -> Result<Option<exercise::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(exercise::Entity::find()
            .filter(exercise::Column::ServerId.eq(server_id))
            .one(conn)
            .await?)
    }

    /// Get all exercises for a user ordered by name.
    pub async fn get_for_user<C>(conn: &C, user_id: &str) -> Result<Vec<exercise::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(exercise::Entity::find()
            .filter(exercise::Column::UserId.eq(user_id))
            .order_by_asc(exercise::Column::Name)
            .all(conn)
            .await?)
    }

    /// Record the server-assigned id after a successful create sync.
    pub async fn mark_synced<C>(conn: &C, local_id: &str, server_id: Option<&str>) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if let Some(model) = Self::get_by_local_id(conn, local_id).await? {
            let mut active = model.into_active_model();
            if let Some(server_id) = server_id {
                active.server_id = ActiveValue::Set(Some(server_id.to_owned()));
            }
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
            active.update(conn).await?;
        }
        Ok(())
    }

    /// Mark an exercise as terminally failed to sync.
    pub async fn mark_failed<C>(conn: &C, local_id: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if let Some(model) = Self::get_by_local_id(conn, local_id).await? {
            let mut active = model.into_active_model();
            active.sync_status = ActiveValue::Set(SyncStatus::Failed);
            active.update(conn).await?;
        }
        Ok(())
    }

    /// Remove an exercise row by local id.
    pub async fn delete_by_local_id<C>(conn: &C, local_id: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        exercise::Entity::delete_many()
            .filter(exercise::Column::LocalId.eq(local_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
