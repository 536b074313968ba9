//! Applying remote changes to the local store.
//!
//! Records are merged last-write-wins on `updated_at`: a local row with
//! unpushed edits newer than the remote copy is left alone and wins on the
//! next push. Parents are applied before children so reference rewriting
//! from server ids to local ids can always find the parent row.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseConnection, DatabaseTransaction, IntoActiveModel,
    TransactionTrait,
};

use crate::backend::{
    RemoteExercise, RemoteWorkout, RemoteWorkoutExercise, RemoteWorkoutSet, SyncChanges,
};
use crate::entities::{exercise, workout, workout_exercise, workout_set, SyncStatus, WorkoutStatus};
use crate::local_id;
use crate::repositories::{
    ExerciseRepository, WorkoutExerciseRepository, WorkoutRepository, WorkoutSetRepository,
};

/// Merge a batch of remote changes into the local store in one transaction.
/// Returns the number of records applied.
pub(crate) async fn apply_changes(
    conn: &DatabaseConnection,
    user_id: &str,
    changes: &SyncChanges,
) -> Result<usize> {
    let txn = conn.begin().await?;
    let mut applied = 0usize;

    for remote in &changes.exercises {
        if apply_exercise(&txn, user_id, remote).await? {
            applied += 1;
        }
    }
    for remote in &changes.workouts {
        if apply_workout(&txn, user_id, remote).await? {
            applied += 1;
        }
    }
    for remote in &changes.workout_exercises {
        if apply_workout_exercise(&txn, remote).await? {
            applied += 1;
        }
    }
    for remote in &changes.workout_sets {
        if apply_workout_set(&txn, remote).await? {
            applied += 1;
        }
    }

    txn.commit().await?;
    Ok(applied)
}

/// Find the local row a remote record corresponds to: by server id first,
/// then by the echoed local id for rows awaiting their create ack.
async fn find_local_exercise(
    txn: &DatabaseTransaction,
    remote: &RemoteExercise,
) -> Result<Option<exercise::Model>> {
    if let Some(row) = ExerciseRepository::get_by_server_id(txn, &remote.id).await? {
        return Ok(Some(row));
    }
    if let Some(local_id) = &remote.local_id {
        return ExerciseRepository::get_by_local_id(txn, local_id).await;
    }
    Ok(None)
}

async fn apply_exercise(
    txn: &DatabaseTransaction,
    user_id: &str,
    remote: &RemoteExercise,
) -> Result<bool> {
    let existing = find_local_exercise(txn, remote).await?;

    if remote.is_deleted {
        let Some(row) = existing else { return Ok(false) };
        ExerciseRepository::delete_by_local_id(txn, &row.local_id).await?;
        return Ok(true);
    }

    match existing {
        Some(row) => {
            if row.needs_sync && row.updated_at > remote.updated_at {
                return Ok(false);
            }
            let mut active = row.into_active_model();
            active.server_id = ActiveValue::Set(Some(remote.id.clone()));
            active.name = ActiveValue::Set(remote.name.clone());
            active.muscle_group = ActiveValue::Set(remote.muscle_group.clone());
            active.description = ActiveValue::Set(remote.description.clone());
            active.library_id = ActiveValue::Set(remote.library_id.clone());
            active.updated_at = ActiveValue::Set(remote.updated_at);
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
            active.update(txn).await?;
        }
        None => {
            exercise::ActiveModel {
                id: ActiveValue::NotSet,
                local_id: ActiveValue::Set(local_id::generate()),
                server_id: ActiveValue::Set(Some(remote.id.clone())),
                user_id: ActiveValue::Set(user_id.to_owned()),
                name: ActiveValue::Set(remote.name.clone()),
                muscle_group: ActiveValue::Set(remote.muscle_group.clone()),
                description: ActiveValue::Set(remote.description.clone()),
                library_id: ActiveValue::Set(remote.library_id.clone()),
                created_at: ActiveValue::Set(Utc::now()),
                updated_at: ActiveValue::Set(remote.updated_at),
                sync_status: ActiveValue::Set(SyncStatus::Synced),
                needs_sync: ActiveValue::Set(false),
            }
            .insert(txn)
            .await?;
        }
    }
    Ok(true)
}

async fn find_local_workout(
    txn: &DatabaseTransaction,
    remote: &RemoteWorkout,
) -> Result<Option<workout::Model>> {
    if let Some(row) = WorkoutRepository::get_by_server_id(txn, &remote.id).await? {
        return Ok(Some(row));
    }
    if let Some(local_id) = &remote.local_id {
        return WorkoutRepository::get_by_local_id(txn, local_id).await;
    }
    Ok(None)
}

async fn apply_workout(
    txn: &DatabaseTransaction,
    user_id: &str,
    remote: &RemoteWorkout,
) -> Result<bool> {
    let existing = find_local_workout(txn, remote).await?;

    if remote.is_deleted {
        let Some(row) = existing else { return Ok(false) };
        delete_workout_cascade(txn, &row.local_id).await?;
        return Ok(true);
    }

    let Some(status) = WorkoutStatus::parse(&remote.status) else {
        log::warn!("skipping workout {} with unknown status {:?}", remote.id, remote.status);
        return Ok(false);
    };

    match existing {
        Some(row) => {
            if row.needs_sync && row.updated_at > remote.updated_at {
                return Ok(false);
            }
            let mut active = row.into_active_model();
            active.server_id = ActiveValue::Set(Some(remote.id.clone()));
            active.name = ActiveValue::Set(remote.name.clone());
            active.template_id = ActiveValue::Set(remote.template_id.clone());
            active.started_at = ActiveValue::Set(remote.started_at);
            active.completed_at = ActiveValue::Set(remote.completed_at);
            active.status = ActiveValue::Set(status);
            active.notes = ActiveValue::Set(remote.notes.clone());
            active.updated_at = ActiveValue::Set(remote.updated_at);
            active.server_updated_at = ActiveValue::Set(Some(remote.updated_at));
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
            active.update(txn).await?;
        }
        None => {
            workout::ActiveModel {
                id: ActiveValue::NotSet,
                local_id: ActiveValue::Set(local_id::generate()),
                server_id: ActiveValue::Set(Some(remote.id.clone())),
                user_id: ActiveValue::Set(user_id.to_owned()),
                template_id: ActiveValue::Set(remote.template_id.clone()),
                name: ActiveValue::Set(remote.name.clone()),
                started_at: ActiveValue::Set(remote.started_at),
                completed_at: ActiveValue::Set(remote.completed_at),
                status: ActiveValue::Set(status),
                notes: ActiveValue::Set(remote.notes.clone()),
                created_at: ActiveValue::Set(Utc::now()),
                updated_at: ActiveValue::Set(remote.updated_at),
                server_updated_at: ActiveValue::Set(Some(remote.updated_at)),
                sync_status: ActiveValue::Set(SyncStatus::Synced),
                needs_sync: ActiveValue::Set(false),
            }
            .insert(txn)
            .await?;
        }
    }
    Ok(true)
}

/// Remove a workout together with its exercises and their sets.
async fn delete_workout_cascade(txn: &DatabaseTransaction, workout_local_id: &str) -> Result<()> {
    for we in WorkoutExerciseRepository::get_for_workout(txn, workout_local_id).await? {
        for set in WorkoutSetRepository::get_for_exercise(txn, &we.local_id).await? {
            WorkoutSetRepository::delete_by_local_id(txn, &set.local_id).await?;
        }
        WorkoutExerciseRepository::delete_by_local_id(txn, &we.local_id).await?;
    }
    WorkoutRepository::delete_by_local_id(txn, workout_local_id).await?;
    Ok(())
}

async fn find_local_workout_exercise(
    txn: &DatabaseTransaction,
    remote: &RemoteWorkoutExercise,
) -> Result<Option<workout_exercise::Model>> {
    if let Some(row) = workout_exercise_by_server_id(txn, &remote.id).await? {
        return Ok(Some(row));
    }
    if let Some(local_id) = &remote.local_id {
        return WorkoutExerciseRepository::get_by_local_id(txn, local_id).await;
    }
    Ok(None)
}

async fn workout_exercise_by_server_id(
    txn: &DatabaseTransaction,
    server_id: &str,
) -> Result<Option<workout_exercise::Model>> {
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    Ok(workout_exercise::Entity::find()
        .filter(workout_exercise::Column::ServerId.eq(server_id))
        .one(txn)
        .await?)
}

async fn apply_workout_exercise(
    txn: &DatabaseTransaction,
    remote: &RemoteWorkoutExercise,
) -> Result<bool> {
    let existing = find_local_workout_exercise(txn, remote).await?;

    if remote.is_deleted {
        let Some(row) = existing else { return Ok(false) };
        for set in WorkoutSetRepository::get_for_exercise(txn, &row.local_id).await? {
            WorkoutSetRepository::delete_by_local_id(txn, &set.local_id).await?;
        }
        WorkoutExerciseRepository::delete_by_local_id(txn, &row.local_id).await?;
        return Ok(true);
    }

    // References arrive as server ids; rewrite them to the parent's local id.
    let Some(parent_workout) = WorkoutRepository::get_by_server_id(txn, &remote.workout_id).await?
    else {
        log::warn!(
            "skipping workout exercise {}: workout {} not in local store",
            remote.id,
            remote.workout_id
        );
        return Ok(false);
    };
    let exercise_local_id =
        match ExerciseRepository::get_by_server_id(txn, &remote.exercise_id).await? {
            Some(row) => row.local_id,
            // A library exercise not mirrored locally; keep the server id.
            None => remote.exercise_id.clone(),
        };

    match existing {
        Some(row) => {
            if row.needs_sync && row.updated_at > remote.updated_at {
                return Ok(false);
            }
            let mut active = row.into_active_model();
            active.server_id = ActiveValue::Set(Some(remote.id.clone()));
            active.workout_local_id = ActiveValue::Set(parent_workout.local_id);
            active.exercise_local_id = ActiveValue::Set(exercise_local_id);
            active.order_index = ActiveValue::Set(remote.order_index);
            active.notes = ActiveValue::Set(remote.notes.clone());
            active.updated_at = ActiveValue::Set(remote.updated_at);
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
            active.update(txn).await?;
        }
        None => {
            workout_exercise::ActiveModel {
                id: ActiveValue::NotSet,
                local_id: ActiveValue::Set(local_id::generate()),
                server_id: ActiveValue::Set(Some(remote.id.clone())),
                workout_local_id: ActiveValue::Set(parent_workout.local_id),
                exercise_local_id: ActiveValue::Set(exercise_local_id),
                order_index: ActiveValue::Set(remote.order_index),
                notes: ActiveValue::Set(remote.notes.clone()),
                updated_at: ActiveValue::Set(remote.updated_at),
                sync_status: ActiveValue::Set(SyncStatus::Synced),
                needs_sync: ActiveValue::Set(false),
            }
            .insert(txn)
            .await?;
        }
    }
    Ok(true)
}

async fn find_local_workout_set(
    txn: &DatabaseTransaction,
    remote: &RemoteWorkoutSet,
) -> Result<Option<workout_set::Model>> {
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    let by_server = workout_set::Entity::find()
        .filter(workout_set::Column::ServerId.eq(&remote.id))
        .one(txn)
        .await?;
    if by_server.is_some() {
        return Ok(by_server);
    }
    if let Some(local_id) = &remote.local_id {
        return WorkoutSetRepository::get_by_local_id(txn, local_id).await;
    }
    Ok(None)
}

async fn apply_workout_set(txn: &DatabaseTransaction, remote: &RemoteWorkoutSet) -> Result<bool> {
    let existing = find_local_workout_set(txn, remote).await?;

    if remote.is_deleted {
        let Some(row) = existing else { return Ok(false) };
        WorkoutSetRepository::delete_by_local_id(txn, &row.local_id).await?;
        return Ok(true);
    }

    let Some(parent) =
        workout_exercise_by_server_id(txn, &remote.workout_exercise_id).await?
    else {
        log::warn!(
            "skipping workout set {}: workout exercise {} not in local store",
            remote.id,
            remote.workout_exercise_id
        );
        return Ok(false);
    };

    match existing {
        Some(row) => {
            if row.needs_sync && row.updated_at > remote.updated_at {
                return Ok(false);
            }
            let mut active = row.into_active_model();
            active.server_id = ActiveValue::Set(Some(remote.id.clone()));
            active.workout_exercise_local_id = ActiveValue::Set(parent.local_id);
            active.set_number = ActiveValue::Set(remote.set_number);
            active.weight = ActiveValue::Set(remote.weight);
            active.reps = ActiveValue::Set(remote.reps);
            active.rpe = ActiveValue::Set(remote.rpe);
            active.completed = ActiveValue::Set(remote.completed);
            active.completed_at = ActiveValue::Set(remote.completed_at);
            active.updated_at = ActiveValue::Set(remote.updated_at);
            active.sync_status = ActiveValue::Set(SyncStatus::Synced);
            active.needs_sync = ActiveValue::Set(false);
            active.update(txn).await?;
        }
        None => {
            workout_set::ActiveModel {
                id: ActiveValue::NotSet,
                local_id: ActiveValue::Set(local_id::generate()),
                server_id: ActiveValue::Set(Some(remote.id.clone())),
                workout_exercise_local_id: ActiveValue::Set(parent.local_id),
                set_number: ActiveValue::Set(remote.set_number),
                weight: ActiveValue::Set(remote.weight),
                reps: ActiveValue::Set(remote.reps),
                rpe: ActiveValue::Set(remote.rpe),
                completed: ActiveValue::Set(remote.completed),
                completed_at: ActiveValue::Set(remote.completed_at),
                updated_at: ActiveValue::Set(remote.updated_at),
                sync_status: ActiveValue::Set(SyncStatus::Synced),
                needs_sync: ActiveValue::Set(false),
            }
            .insert(txn)
            .await?;
        }
    }
    Ok(true)
}
