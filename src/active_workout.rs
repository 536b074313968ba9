//! Live view of the workout currently in progress.
//!
//! [`ActiveWorkoutSession`] owns every mutation made during a workout. Each
//! one writes the entity change and its queue record in a single
//! transaction, then rebuilds the aggregate and publishes it on a watch
//! channel, so the UI always renders from the local store and never waits
//! on the network.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, DatabaseTransaction, IntoActiveModel,
    TransactionTrait,
};
use serde_json::json;
use tokio::sync::{watch, Mutex};

use crate::backend::{WorkoutExercisePayload, WorkoutPayload, WorkoutSetPayload};
use crate::entities::operation::{OpEntity, OpType};
use crate::entities::{workout, workout_exercise, workout_set, SyncStatus, WorkoutStatus};
use crate::local_id;
use crate::repositories::{
    OperationRepository, WorkoutExerciseRepository, WorkoutRepository, WorkoutSetRepository,
};
use crate::storage::LocalStorage;

/// One exercise within the active workout, with its sets in order.
#[derive(Debug, Clone)]
pub struct ActiveExercise {
    pub entry: workout_exercise::Model,
    pub sets: Vec<workout_set::Model>,
}

/// The in-progress workout with exercises and sets resolved for display.
#[derive(Debug, Clone)]
pub struct ActiveWorkout {
    pub workout: workout::Model,
    pub exercises: Vec<ActiveExercise>,
}

/// Fields of a set that can change after it is logged.
#[derive(Debug, Clone, Default)]
pub struct UpdateSetInput {
    pub weight: Option<f64>,
    pub reps: Option<i32>,
    pub rpe: Option<Option<f64>>,
    pub completed: Option<bool>,
}

/// Stateful handle on the user's current workout.
pub struct ActiveWorkoutSession {
    storage: Arc<Mutex<LocalStorage>>,
    user_id: String,
    state: watch::Sender<Option<ActiveWorkout>>,
}

impl ActiveWorkoutSession {
    pub fn new(storage: Arc<Mutex<LocalStorage>>, user_id: &str) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            storage,
            user_id: user_id.to_owned(),
            state,
        }
    }

    /// Subscribe to aggregate updates. The receiver holds `None` while no
    /// workout is in progress.
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveWorkout>> {
        self.state.subscribe()
    }

    /// Snapshot of the current aggregate.
    pub fn current(&self) -> Option<ActiveWorkout> {
        self.state.borrow().clone()
    }

    /// Load the in-progress workout from the store, if one exists, and
    /// publish it.
    pub async fn load(&self) -> Result<Option<ActiveWorkout>> {
        let storage = self.storage.lock().await;
        let aggregate = build_aggregate(&storage.conn, &self.user_id).await?;
        self.state.send_replace(aggregate.clone());
        Ok(aggregate)
    }

    /// Begin a new workout. Fails if one is already in progress.
    pub async fn start_workout(
        &self,
        name: &str,
        template_id: Option<&str>,
    ) -> Result<ActiveWorkout> {
        let storage = self.storage.lock().await;

        if WorkoutRepository::get_active(&storage.conn, &self.user_id).await?.is_some() {
            bail!("a workout is already in progress");
        }

        let now = Utc::now();
        let txn = storage.conn.begin().await?;
        let row = workout::ActiveModel {
            id: ActiveValue::NotSet,
            local_id: ActiveValue::Set(local_id::generate()),
            server_id: ActiveValue::Set(None),
            user_id: ActiveValue::Set(self.user_id.clone()),
            template_id: ActiveValue::Set(template_id.map(str::to_owned)),
            name: ActiveValue::Set(name.to_owned()),
            started_at: ActiveValue::Set(now),
            completed_at: ActiveValue::Set(None),
            status: ActiveValue::Set(WorkoutStatus::InProgress),
            notes: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            server_updated_at: ActiveValue::Set(None),
            sync_status: ActiveValue::Set(SyncStatus::Pending),
            needs_sync: ActiveValue::Set(true),
        }
        .insert(&txn)
        .await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Create,
            OpEntity::Workout,
            &row.local_id,
            serde_json::to_value(WorkoutPayload::from(&row))?,
        )
        .await?;
        txn.commit().await?;

        log::info!("started workout {} ({})", row.name, row.local_id);
        self.refresh(&storage.conn).await?.ok_or_else(|| {
            anyhow::anyhow!("workout {} missing after insert", row.local_id)
        })
    }

    /// Append an exercise to the active workout. Order indexes are
    /// zero-based and assigned at the end of the list.
    pub async fn add_exercise(
        &self,
        exercise_local_id: &str,
        notes: Option<&str>,
    ) -> Result<workout_exercise::Model> {
        let storage = self.storage.lock().await;
        let active = self.require_active(&storage.conn).await?;

        let existing =
            WorkoutExerciseRepository::get_for_workout(&storage.conn, &active.local_id).await?;

        let txn = storage.conn.begin().await?;
        let row = workout_exercise::ActiveModel {
            id: ActiveValue::NotSet,
            local_id: ActiveValue::Set(local_id::generate()),
            server_id: ActiveValue::Set(None),
            workout_local_id: ActiveValue::Set(active.local_id.clone()),
            exercise_local_id: ActiveValue::Set(exercise_local_id.to_owned()),
            order_index: ActiveValue::Set(existing.len() as i32),
            notes: ActiveValue::Set(notes.map(str::to_owned)),
            updated_at: ActiveValue::Set(Utc::now()),
            sync_status: ActiveValue::Set(SyncStatus::Pending),
            needs_sync: ActiveValue::Set(true),
        }
        .insert(&txn)
        .await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Create,
            OpEntity::WorkoutExercise,
            &row.local_id,
            serde_json::to_value(WorkoutExercisePayload::from(&row))?,
        )
        .await?;
        txn.commit().await?;

        self.refresh(&storage.conn).await?;
        Ok(row)
    }

    /// Remove an exercise and its sets, closing the gap in the order
    /// indexes of the exercises after it.
    pub async fn remove_exercise(&self, entry_local_id: &str) -> Result<()> {
        let storage = self.storage.lock().await;
        let active = self.require_active(&storage.conn).await?;

        let Some(entry) =
            WorkoutExerciseRepository::get_by_local_id(&storage.conn, entry_local_id).await?
        else {
            bail!("exercise entry {entry_local_id} not found");
        };
        if entry.workout_local_id != active.local_id {
            bail!("exercise entry {entry_local_id} does not belong to the active workout");
        }

        let txn = storage.conn.begin().await?;

        // Children before parent so remote deletes replay in a valid order.
        for set in WorkoutSetRepository::get_for_exercise(&txn, &entry.local_id).await? {
            queue_delete(&txn, OpEntity::WorkoutSet, &set.local_id, set.server_id.as_deref())
                .await?;
            WorkoutSetRepository::delete_by_local_id(&txn, &set.local_id).await?;
        }
        queue_delete(
            &txn,
            OpEntity::WorkoutExercise,
            &entry.local_id,
            entry.server_id.as_deref(),
        )
        .await?;
        WorkoutExerciseRepository::delete_by_local_id(&txn, &entry.local_id).await?;

        renumber_exercises(&txn, &active.local_id).await?;
        txn.commit().await?;

        self.refresh(&storage.conn).await?;
        Ok(())
    }

    /// Persist a new exercise order. `order` lists entry local ids in the
    /// desired sequence and must cover the active workout's entries.
    pub async fn reorder_exercises(&self, order: &[String]) -> Result<()> {
        let storage = self.storage.lock().await;
        let active = self.require_active(&storage.conn).await?;

        let entries =
            WorkoutExerciseRepository::get_for_workout(&storage.conn, &active.local_id).await?;
        if entries.len() != order.len()
            || !entries.iter().all(|e| order.contains(&e.local_id))
        {
            bail!("reorder list does not match the active workout's exercises");
        }

        let txn = storage.conn.begin().await?;
        for (index, entry_local_id) in order.iter().enumerate() {
            let current = entries
                .iter()
                .find(|e| &e.local_id == entry_local_id)
                .map(|e| e.order_index);
            if current == Some(index as i32) {
                continue;
            }
            WorkoutExerciseRepository::set_order_index(&txn, entry_local_id, index as i32).await?;
            enqueue_entry_update(&txn, entry_local_id).await?;
        }
        txn.commit().await?;

        self.refresh(&storage.conn).await?;
        Ok(())
    }

    /// Log a set for an exercise entry. Set numbers are one-based and
    /// contiguous within the entry.
    pub async fn add_set(
        &self,
        entry_local_id: &str,
        weight: f64,
        reps: i32,
        rpe: Option<f64>,
    ) -> Result<workout_set::Model> {
        let storage = self.storage.lock().await;
        let active = self.require_active(&storage.conn).await?;

        let Some(entry) =
            WorkoutExerciseRepository::get_by_local_id(&storage.conn, entry_local_id).await?
        else {
            bail!("exercise entry {entry_local_id} not found");
        };
        if entry.workout_local_id != active.local_id {
            bail!("exercise entry {entry_local_id} does not belong to the active workout");
        }

        let existing = WorkoutSetRepository::get_for_exercise(&storage.conn, &entry.local_id).await?;

        let txn = storage.conn.begin().await?;
        let row = workout_set::ActiveModel {
            id: ActiveValue::NotSet,
            local_id: ActiveValue::Set(local_id::generate()),
            server_id: ActiveValue::Set(None),
            workout_exercise_local_id: ActiveValue::Set(entry.local_id.clone()),
            set_number: ActiveValue::Set(existing.len() as i32 + 1),
            weight: ActiveValue::Set(weight),
            reps: ActiveValue::Set(reps),
            rpe: ActiveValue::Set(rpe),
            completed: ActiveValue::Set(false),
            completed_at: ActiveValue::Set(None),
            updated_at: ActiveValue::Set(Utc::now()),
            sync_status: ActiveValue::Set(SyncStatus::Pending),
            needs_sync: ActiveValue::Set(true),
        }
        .insert(&txn)
        .await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Create,
            OpEntity::WorkoutSet,
            &row.local_id,
            serde_json::to_value(WorkoutSetPayload::from(&row))?,
        )
        .await?;
        txn.commit().await?;

        self.refresh(&storage.conn).await?;
        Ok(row)
    }

    /// Edit a logged set. Marking it completed stamps `completed_at`.
    pub async fn update_set(
        &self,
        set_local_id: &str,
        input: UpdateSetInput,
    ) -> Result<workout_set::Model> {
        let storage = self.storage.lock().await;

        let Some(row) = WorkoutSetRepository::get_by_local_id(&storage.conn, set_local_id).await?
        else {
            bail!("set {set_local_id} not found");
        };

        let txn = storage.conn.begin().await?;
        let mut active = row.into_active_model();
        if let Some(weight) = input.weight {
            active.weight = ActiveValue::Set(weight);
        }
        if let Some(reps) = input.reps {
            active.reps = ActiveValue::Set(reps);
        }
        if let Some(rpe) = input.rpe {
            active.rpe = ActiveValue::Set(rpe);
        }
        if let Some(completed) = input.completed {
            active.completed = ActiveValue::Set(completed);
            active.completed_at =
                ActiveValue::Set(if completed { Some(Utc::now()) } else { None });
        }
        active.updated_at = ActiveValue::Set(Utc::now());
        active.sync_status = ActiveValue::Set(SyncStatus::Pending);
        active.needs_sync = ActiveValue::Set(true);
        let updated = active.update(&txn).await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Update,
            OpEntity::WorkoutSet,
            &updated.local_id,
            serde_json::to_value(WorkoutSetPayload::from(&updated))?,
        )
        .await?;
        txn.commit().await?;

        self.refresh(&storage.conn).await?;
        Ok(updated)
    }

    /// Delete a set and renumber the remaining sets of the entry so the
    /// numbering stays contiguous.
    pub async fn delete_set(&self, set_local_id: &str) -> Result<()> {
        let storage = self.storage.lock().await;

        let Some(row) = WorkoutSetRepository::get_by_local_id(&storage.conn, set_local_id).await?
        else {
            bail!("set {set_local_id} not found");
        };

        let txn = storage.conn.begin().await?;
        queue_delete(&txn, OpEntity::WorkoutSet, &row.local_id, row.server_id.as_deref()).await?;
        WorkoutSetRepository::delete_by_local_id(&txn, &row.local_id).await?;

        renumber_sets(&txn, &row.workout_exercise_local_id).await?;
        txn.commit().await?;

        self.refresh(&storage.conn).await?;
        Ok(())
    }

    /// Finish the active workout and clear the published aggregate.
    pub async fn complete_workout(&self) -> Result<workout::Model> {
        let storage = self.storage.lock().await;
        let active = self.require_active(&storage.conn).await?;

        let now = Utc::now();
        let txn = storage.conn.begin().await?;
        let mut model = active.into_active_model();
        model.status = ActiveValue::Set(WorkoutStatus::Completed);
        model.completed_at = ActiveValue::Set(Some(now));
        model.updated_at = ActiveValue::Set(now);
        model.sync_status = ActiveValue::Set(SyncStatus::Pending);
        model.needs_sync = ActiveValue::Set(true);
        let updated = model.update(&txn).await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Update,
            OpEntity::Workout,
            &updated.local_id,
            serde_json::to_value(WorkoutPayload::from(&updated))?,
        )
        .await?;
        txn.commit().await?;

        log::info!("completed workout {} ({})", updated.name, updated.local_id);
        self.state.send_replace(None);
        Ok(updated)
    }

    /// Throw away the active workout entirely, locally and remotely.
    pub async fn discard_workout(&self) -> Result<()> {
        let storage = self.storage.lock().await;
        let active = self.require_active(&storage.conn).await?;

        let txn = storage.conn.begin().await?;
        for entry in WorkoutExerciseRepository::get_for_workout(&txn, &active.local_id).await? {
            for set in WorkoutSetRepository::get_for_exercise(&txn, &entry.local_id).await? {
                queue_delete(&txn, OpEntity::WorkoutSet, &set.local_id, set.server_id.as_deref())
                    .await?;
                WorkoutSetRepository::delete_by_local_id(&txn, &set.local_id).await?;
            }
            queue_delete(
                &txn,
                OpEntity::WorkoutExercise,
                &entry.local_id,
                entry.server_id.as_deref(),
            )
            .await?;
            WorkoutExerciseRepository::delete_by_local_id(&txn, &entry.local_id).await?;
        }
        queue_delete(&txn, OpEntity::Workout, &active.local_id, active.server_id.as_deref())
            .await?;
        WorkoutRepository::delete_by_local_id(&txn, &active.local_id).await?;
        txn.commit().await?;

        log::info!("discarded workout {} ({})", active.name, active.local_id);
        self.state.send_replace(None);
        Ok(())
    }

    async fn require_active<C: ConnectionTrait>(&self, conn: &C) -> Result<workout::Model> {
        WorkoutRepository::get_active(conn, &self.user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no workout in progress"))
    }

    async fn refresh<C: ConnectionTrait>(&self, conn: &C) -> Result<Option<ActiveWorkout>> {
        let aggregate = build_aggregate(conn, &self.user_id).await?;
        self.state.send_replace(aggregate.clone());
        Ok(aggregate)
    }
}

async fn build_aggregate<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> Result<Option<ActiveWorkout>> {
    let Some(workout) = WorkoutRepository::get_active(conn, user_id).await? else {
        return Ok(None);
    };

    let entries = WorkoutExerciseRepository::get_for_workout(conn, &workout.local_id).await?;
    let mut exercises = Vec::with_capacity(entries.len());
    for entry in entries {
        let sets = WorkoutSetRepository::get_for_exercise(conn, &entry.local_id).await?;
        exercises.push(ActiveExercise { entry, sets });
    }

    Ok(Some(ActiveWorkout { workout, exercises }))
}

/// Cancel any queued work for a record being deleted, and queue a remote
/// delete only if the server has ever seen it. The server id travels in
/// the payload because the local row is gone by the time the queue drains.
async fn queue_delete(
    txn: &DatabaseTransaction,
    entity: OpEntity,
    local_id: &str,
    server_id: Option<&str>,
) -> Result<()> {
    OperationRepository::cancel_for(txn, entity, local_id).await?;
    if let Some(server_id) = server_id {
        OperationRepository::enqueue(
            txn,
            OpType::Delete,
            entity,
            local_id,
            json!({ "local_id": local_id, "server_id": server_id }),
        )
        .await?;
    }
    Ok(())
}

/// Close gaps in the order indexes after a removal, queueing an update for
/// each entry that moved.
async fn renumber_exercises(txn: &DatabaseTransaction, workout_local_id: &str) -> Result<()> {
    let entries = WorkoutExerciseRepository::get_for_workout(txn, workout_local_id).await?;
    for (index, entry) in entries.iter().enumerate() {
        if entry.order_index != index as i32 {
            WorkoutExerciseRepository::set_order_index(txn, &entry.local_id, index as i32).await?;
            enqueue_entry_update(txn, &entry.local_id).await?;
        }
    }
    Ok(())
}

/// Restore one-based contiguous set numbers after a deletion.
async fn renumber_sets(txn: &DatabaseTransaction, entry_local_id: &str) -> Result<()> {
    let sets = WorkoutSetRepository::get_for_exercise(txn, entry_local_id).await?;
    for (index, set) in sets.iter().enumerate() {
        let wanted = index as i32 + 1;
        if set.set_number != wanted {
            WorkoutSetRepository::set_number(txn, &set.local_id, wanted).await?;
            if let Some(updated) =
                WorkoutSetRepository::get_by_local_id(txn, &set.local_id).await?
            {
                OperationRepository::enqueue(
                    txn,
                    OpType::Update,
                    OpEntity::WorkoutSet,
                    &updated.local_id,
                    serde_json::to_value(WorkoutSetPayload::from(&updated))?,
                )
                .await?;
            }
        }
    }
    Ok(())
}

async fn enqueue_entry_update(txn: &DatabaseTransaction, entry_local_id: &str) -> Result<()> {
    if let Some(updated) =
        WorkoutExerciseRepository::get_by_local_id(txn, entry_local_id).await?
    {
        OperationRepository::enqueue(
            txn,
            OpType::Update,
            OpEntity::WorkoutExercise,
            &updated.local_id,
            serde_json::to_value(WorkoutExercisePayload::from(&updated))?,
        )
        .await?;
    }
    Ok(())
}
