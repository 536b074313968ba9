//! Workout-exercise repository for database operations.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder,
};

use crate::entities::workout_exercise;
use crate::entities::SyncStatus;

/// Repository for the exercises performed within a workout.
pub struct WorkoutExerciseRepository;

impl WorkoutExerciseRepository {
    /// Get a single workout exercise by local id.
    pub async fn get_by_local_id<C>(
        conn: &C,
        local_id: &str,
    ) -> Result<Option<workout_exercise::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout_exercise::Entity::find()
            .filter(workout_exercise::Column::LocalId.eq(local_id))
            .one(conn)
            .await?)
    }

    /// Get all exercises of a workout ordered by display position.
    pub async fn get_for_workout<C>(
        conn: &C,
        workout_local_id: &str,
    ) -> Result<Vec<workout_exercise::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(workout_exercise::Entity::find()
            .filter(workout_exercise::Column::WorkoutLocalId.eq(workout_local_id))
            .order_by_asc(workout_exercise::Column::OrderIndex)
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

    /// Mark a workout exercise as terminally failed to sync.
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

    /// Rewrite the display position of one workout exercise.
    pub async fn set_order_index<C>(conn: &C, local_id: &str, order_index: i32) -> Result<()>
    where
        C: ConnectionTrait,
    {
        if let Some(model) = Self::get_by_local_id(conn, local_id).await? {
            let mut active = model.into_active_model();
            active.order_index = ActiveValue::Set(order_index);
            active.updated_at = ActiveValue::Set(Utc::now());
            active.sync_status = ActiveValue::Set(SyncStatus::Pending);
            active.needs_sync = ActiveValue::Set(true);
            active.update(conn).await?;
        }
        Ok(())
    }

    /// Remove a workout exercise row by local id.
    pub async fn delete_by_local_id<C>(conn: &C, local_id: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        workout_exercise::Entity::delete_many()
            .filter(workout_exercise::Column::LocalId.eq(local_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
