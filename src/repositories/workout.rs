//! Workout repository for database operations.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder,
};

use crate::entities::workout;
use crate::entities::{SyncStatus, WorkoutStatus};

/// Repository for workout-related database operations.
pub struct WorkoutRepository;

impl WorkoutRepository {
    /// Get a single workout by local id.
    pub async fn get_by_local_id<C>(conn: &C, local_id: &str) -> Result<Option<workout::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout::Entity::find()
            .filter(workout::Column::LocalId.eq(local_id))
            .one(conn)
            .await?)
    }

    /// Get a single workout by server id.
    pub async fn get_by_server_id<C>(conn: &C, server_id: &str) -> Result<Option<workout::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout::Entity::find()
            .filter(workout::Column::ServerId.eq(server_id))
            .one(conn)
            .await?)
    }

    /// Get the in-progress workout for a user, if any. At most one is
    /// expected; the most recently started wins if data is inconsistent.
    pub async fn get_active<C>(conn: &C, user_id: &str) -> Result<Option<workout::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout::Entity::find()
            .filter(workout::Column::UserId.eq(user_id))
            .filter(workout::Column::Status.eq(WorkoutStatus::InProgress))
            .order_by_desc(workout::Column::StartedAt)
            .one(conn)
            .await?)
    }

    /// Get all workouts for a user, newest first.
    pub async fn get_for_user<C>(conn: &C, user_id: &str) -> Result<Vec<workout::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout::Entity::find()
            .filter(workout::Column::UserId.eq(user_id))
            .order_by_desc(workout::Column::StartedAt)
            .all(conn)
            .await?)
    }

    /// Record the server-assigned id after a successful create sync.
    pub async fn mark_synced<C>(
        conn: &C,
        local_id: &str,
        server_id: Option<&str>,
        server_updated_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if let Some(model) = Self::get_by_local_id(conn, local_id).await? {
            let mut active = model.into_active_model();
            if let Some(server_id) = server_id {
                active.server_id = ActiveValue::Set(Some(server_id.to_owned()));
            }
            active.server_updated_at = ActiveValue::Set(server_updated_at);
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
            active.update(conn).await?;
        }
        Ok(())
    }

    /// Mark a workout as terminally failed to sync.
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

    /// Remove a workout row by local id.
    pub async fn delete_by_local_id<C>(conn: &C, local_id: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        workout::Entity::delete_many()
            .filter(workout::Column::LocalId.eq(local_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
