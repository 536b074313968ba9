//! Workout-set repository for database operations.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder,
};

use crate::entities::workout_set;
use crate::entities::SyncStatus;

/// Repository for the sets logged against a workout exercise.
pub struct WorkoutSetRepository;

impl WorkoutSetRepository {
    /// Get a single set by local id.
    pub async fn get_by_local_id<C>(conn: &C, local_id: &str) -> Result<Option<workout_set::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout_set::Entity::find()
            .filter(workout_set::Column::LocalId.eq(local_id))
            .one(conn)
            .await?)
    }

    /// Get all sets of a workout exercise ordered by set number.
    pub async fn get_for_exercise<C>(
        conn: &C,
        workout_exercise_local_id: &str,
    ) -> Result<Vec<workout_set::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout_set::Entity::find()
            .filter(workout_set::Column::WorkoutExerciseLocalId.eq(workout_exercise_local_id))
            .order_by_asc(workout_set::Column::SetNumber)
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

    /// Mark a set as terminally failed to sync.
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

    /// Rewrite the set number of one set, flagging it for sync.
    pub async fn set_number<C>(conn: &C, local_id: &str, set_number: i32) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if let Some(model) = Self::get_by_local_id(conn, local_id).await? {
            let mut active = model.into_active_model();
            active.set_number = ActiveValue::Set(set_number);
            active.updated_at = ActiveValue::Set(Utc::now());
            active.sync_status = ActiveValue::Set(SyncStatus::Pending);
            active.needs_sync = ActiveValue::Set(true);
            active.update(conn).await?;
        }
        Ok(())
    }

    /// Remove a set row by local id.
    pub async fn delete_by_local_id<C>(conn: &C, local_id: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        workout_set::Entity::delete_many()
            .filter(workout_set::Column::LocalId.eq(local_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
