//! Sync engine: pushes queued offline operations to the backend, then pulls
//! remote changes into the local store.
//!
//! The engine drains the queue in dependency order so parents reach the
//! server before the children that reference them. Operations whose parent
//! create has not been acknowledged yet are deferred within the run instead
//! of failed.

mod pull;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::{
    Backend, BackendError, ExercisePayload, WorkoutExercisePayload, WorkoutPayload,
    WorkoutSetPayload,
};
use crate::entities::operation::{self, OpEntity, OpType};
use crate::local_id;
use crate::repositories::{
    ExerciseRepository, OperationRepository, SyncMetaRepository, WorkoutExerciseRepository,
    WorkoutRepository, WorkoutSetRepository,
};
use crate::repositories::operation::FailureDisposition;
use crate::repositories::sync_meta::LAST_FULL_SYNC;
use crate::config::SyncConfig;
use crate::storage::LocalStorage;

/// Result of a sync attempt.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Another sync was already running; nothing was done.
    AlreadyRunning,
    /// The device is offline; queued operations stay pending untouched.
    Offline,
    Success { stats: SyncStats, last_sync: DateTime<Utc> },
    Error { message: String },
}

/// Counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Operations confirmed by the server.
    pub pushed: usize,
    /// Operations rescheduled with backoff after a transient failure.
    pub retried: usize,
    /// Operations that reached a terminal failure.
    pub failed: usize,
    /// Operations discarded without a remote call (stale or already applied).
    pub dropped: usize,
    /// Remote records applied to the local store during pull.
    pub pulled: usize,
    /// Operations still pending when the run ended.
    pub remaining: u64,
}

/// Visible result of attempting one queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpOutcome {
    Pushed,
    /// Parent not acknowledged yet; try again later in the run.
    Deferred,
    Retried,
    Failed,
    Dropped,
}

/// How a parent reference resolves to a server id.
enum Resolution {
    Resolved(String),
    /// Parent create still queued.
    Pending,
    /// Parent create terminally failed or the parent row is gone.
    FailedParent,
}

enum PushAction {
    Done(OpOutcome),
    Errored(BackendError),
}

/// Sync engine coordinating the local store and the remote backend.
#[derive(Clone)]
pub struct SyncEngine {
    storage: Arc<Mutex<LocalStorage>>,
    backend: Arc<dyn Backend>,
    user_id: String,
    config: SyncConfig,
    sync_in_progress: Arc<Mutex<bool>>,
    online: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(
        storage: Arc<Mutex<LocalStorage>>,
        backend: Arc<dyn Backend>,
        user_id: &str,
        config: SyncConfig,
    ) -> Self {
        Self {
            storage,
            backend,
            user_id: user_id.to_owned(),
            config,
            sync_in_progress: Arc::new(Mutex::new(false)),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check if sync is currently in progress
    pub async fn is_syncing(&self) -> bool {
        *self.sync_in_progress.lock().await
    }

    /// Operations still waiting to be pushed.
    pub async fn pending_count(&self) -> Result<u64> {
        let storage = self.storage.lock().await;
        OperationRepository::count_pending(&storage.conn).await
    }

    /// Terminally failed operations, for surfacing to the user.
    pub async fn failed_operations(&self) -> Result<Vec<operation::Model>> {
        let storage = self.storage.lock().await;
        OperationRepository::get_failed(&storage.conn).await
    }

    /// Timestamp of the last completed pull, if any.
    pub async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>> {
        let storage = self.storage.lock().await;
        let raw = SyncMetaRepository::get(&storage.conn, LAST_FULL_SYNC).await?;
        Ok(raw
            .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
            .map(|ts| ts.with_timezone(&Utc)))
    }

    /// Update the connectivity flag. An offline-to-online transition kicks
    /// off a sync immediately so queued work drains without waiting for the
    /// periodic timer.
    pub fn notify_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            log::info!("connectivity restored, starting sync");
            let engine = self.clone();
            tokio::spawn(async move {
                if let Err(e) = engine.sync().await {
                    log::warn!("sync after reconnect failed: {e}");
                }
            });
        }
    }

    /// Sync when the app returns to the foreground, unless the last sync is
    /// recent enough.
    pub async fn handle_app_foregrounded(&self) -> Result<SyncOutcome> {
        if self.config.auto_sync_interval_minutes > 0 {
            if let Some(last) = self.last_sync_time().await? {
                let threshold =
                    Utc::now() - Duration::minutes(self.config.auto_sync_interval_minutes as i64);
                if last > threshold {
                    return Ok(SyncOutcome::Success {
                        stats: SyncStats::default(),
                        last_sync: last,
                    });
                }
            }
        }
        self.sync().await
    }

    /// Spawn a background task that syncs on the configured interval.
    /// Returns `None` when the interval is zero (manual sync only).
    pub fn spawn_periodic(&self) -> Option<JoinHandle<()>> {
        if self.config.auto_sync_interval_minutes == 0 {
            return None;
        }
        let engine = self.clone();
        let period = std::time::Duration::from_secs(self.config.auto_sync_interval_minutes * 60);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = engine.sync().await {
                    log::warn!("periodic sync failed: {e}");
                }
            }
        }))
    }

    /// Push queued operations, then pull remote changes. Re-entrant calls
    /// return [`SyncOutcome::AlreadyRunning`] without doing work, and while
    /// the device is offline nothing is drained, so queued operations keep
    /// their retry budget for when connectivity returns.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        if !self.online.load(Ordering::SeqCst) {
            log::debug!("offline, leaving queued operations pending");
            return Ok(SyncOutcome::Offline);
        }

        {
            let mut guard = self.sync_in_progress.lock().await;
            if *guard {
                return Ok(SyncOutcome::AlreadyRunning);
            }
            *guard = true;
        }

        let result = self.perform_sync().await;

        {
            let mut guard = self.sync_in_progress.lock().await;
            *guard = false;
        }

        result
    }

    async fn perform_sync(&self) -> Result<SyncOutcome> {
        let mut stats = SyncStats::default();

        // The storage lock is held only long enough to clone the pooled
        // connection, so view-builder reads and writes never queue behind a
        // remote call made during the drain.
        let conn = self.storage.lock().await.conn.clone();

        if let Err(e) = self.push(&conn, &mut stats).await {
            log::warn!("push aborted: {e}");
            return Ok(SyncOutcome::Error {
                message: format!("Failed to push queued operations: {e}"),
            });
        }

        let pull_started = Utc::now();
        let changes = match self.backend.fetch_changes(self.last_sync_time().await?).await {
            Ok(changes) => changes,
            Err(e) => {
                return Ok(SyncOutcome::Error {
                    message: format!("Failed to fetch remote changes: {e}"),
                });
            }
        };

        match pull::apply_changes(&conn, &self.user_id, &changes).await {
            Ok(applied) => stats.pulled = applied,
            Err(e) => {
                return Ok(SyncOutcome::Error {
                    message: format!("Failed to apply remote changes: {e}"),
                });
            }
        }
        SyncMetaRepository::set(&conn, LAST_FULL_SYNC, &pull_started.to_rfc3339()).await?;
        stats.remaining = OperationRepository::count_pending(&conn).await?;

        log::info!(
            "sync finished: {} pushed, {} retried, {} failed, {} dropped, {} pulled, {} remaining",
            stats.pushed,
            stats.retried,
            stats.failed,
            stats.dropped,
            stats.pulled,
            stats.remaining
        );

        Ok(SyncOutcome::Success {
            stats,
            last_sync: pull_started,
        })
    }

    /// Drain due operations in dependency order. Repeats passes as long as
    /// at least one operation makes progress, so children deferred behind a
    /// parent create get pushed in the same run once the parent resolves.
    async fn push(&self, conn: &DatabaseConnection, stats: &mut SyncStats) -> Result<()> {
        let mut resolved: HashMap<String, String> = HashMap::new();

        loop {
            let due = OperationRepository::due_in_order(conn, Utc::now()).await?;
            if due.is_empty() {
                break;
            }

            let mut progressed = false;
            let mut deferred = 0usize;
            for op in &due {
                match self.execute_operation(conn, op, &mut resolved).await? {
                    OpOutcome::Pushed => {
                        stats.pushed += 1;
                        progressed = true;
                    }
                    OpOutcome::Dropped => {
                        stats.dropped += 1;
                        progressed = true;
                    }
                    OpOutcome::Retried => stats.retried += 1,
                    OpOutcome::Failed => {
                        stats.failed += 1;
                        progressed = true;
                    }
                    OpOutcome::Deferred => deferred += 1,
                }
            }

            if deferred == 0 || !progressed {
                break;
            }
        }

        Ok(())
    }

    async fn execute_operation(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
        resolved: &mut HashMap<String, String>,
    ) -> Result<OpOutcome> {
        let action = match (op.op_type, op.entity) {
            (OpType::Delete, _) => self.push_delete(conn, op).await?,
            (_, OpEntity::Exercise) => self.push_exercise(conn, op, resolved).await?,
            (_, OpEntity::Workout) => self.push_workout(conn, op, resolved).await?,
            (_, OpEntity::WorkoutExercise) => {
                self.push_workout_exercise(conn, op, resolved).await?
            }
            (_, OpEntity::WorkoutSet) => self.push_workout_set(conn, op, resolved).await?,
        };

        match action {
            PushAction::Done(outcome) => Ok(outcome),
            PushAction::Errored(err) => self.handle_backend_error(conn, op, &err).await,
        }
    }

    /// Deletes carry the server id captured when the local row was removed.
    /// An op without one refers to a record the server never saw; drop it.
    async fn push_delete(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
    ) -> Result<PushAction> {
        let Some(server_id) = op.data.get("server_id").and_then(|v| v.as_str()) else {
            log::debug!("dropping delete of never-synced {} {}", op.entity.as_str(), op.local_id);
            OperationRepository::mark_succeeded(conn, op.id).await?;
            return Ok(PushAction::Done(OpOutcome::Dropped));
        };

        let result = match op.entity {
            OpEntity::Exercise => self.backend.delete_exercise(server_id).await,
            OpEntity::Workout => self.backend.delete_workout(server_id).await,
            OpEntity::WorkoutExercise => self.backend.delete_workout_exercise(server_id).await,
            OpEntity::WorkoutSet => self.backend.delete_workout_set(server_id).await,
        };

        match result {
            // Already gone remotely is the outcome the delete wanted.
            Ok(()) | Err(BackendError::NotFound) => {
                OperationRepository::mark_succeeded(conn, op.id).await?;
                Ok(PushAction::Done(OpOutcome::Pushed))
            }
            Err(err) => Ok(PushAction::Errored(err)),
        }
    }

    async fn push_exercise(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
        resolved: &mut HashMap<String, String>,
    ) -> Result<PushAction> {
        let Some(row) = ExerciseRepository::get_by_local_id(conn, &op.local_id).await? else {
            OperationRepository::mark_succeeded(conn, op.id).await?;
            return Ok(PushAction::Done(OpOutcome::Dropped));
        };
        let payload = ExercisePayload::from(&row);

        match op.op_type {
            OpType::Create => {
                if let Some(server_id) = row.server_id.clone() {
                    // Acknowledged on an earlier run; nothing left to send.
                    resolved.insert(row.local_id.clone(), server_id);
                    OperationRepository::mark_succeeded(conn, op.id).await?;
                    return Ok(PushAction::Done(OpOutcome::Dropped));
                }
                match self.backend.create_exercise(&payload).await {
                    Ok(record) => {
                        ExerciseRepository::mark_synced(conn, &row.local_id, Some(&record.id))
                            .await?;
                        resolved.insert(row.local_id.clone(), record.id);
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Update => {
                let Some(server_id) = row.server_id.clone() else {
                    return self.defer_or_fail_orphan_update(conn, op).await;
                };
                match self.backend.update_exercise(&server_id, &payload).await {
                    Ok(_) => {
                        ExerciseRepository::mark_synced(conn, &row.local_id, None).await?;
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Delete => unreachable!("deletes are dispatched to push_delete"),
        }
    }

    async fn push_workout(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
        resolved: &mut HashMap<String, String>,
    ) -> Result<PushAction> {
        let Some(row) = WorkoutRepository::get_by_local_id(conn, &op.local_id).await? else {
            OperationRepository::mark_succeeded(conn, op.id).await?;
            return Ok(PushAction::Done(OpOutcome::Dropped));
        };
        let payload = WorkoutPayload::from(&row);

        match op.op_type {
            OpType::Create => {
                if let Some(server_id) = row.server_id.clone() {
                    resolved.insert(row.local_id.clone(), server_id);
                    OperationRepository::mark_succeeded(conn, op.id).await?;
                    return Ok(PushAction::Done(OpOutcome::Dropped));
                }
                match self.backend.create_workout(&payload).await {
                    Ok(record) => {
                        WorkoutRepository::mark_synced(
                            conn,
                            &row.local_id,
                            Some(&record.id),
                            Some(record.updated_at),
                        )
                        .await?;
                        resolved.insert(row.local_id.clone(), record.id);
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Update => {
                let Some(server_id) = row.server_id.clone() else {
                    return self.defer_or_fail_orphan_update(conn, op).await;
                };
                match self.backend.update_workout(&server_id, &payload).await {
                    Ok(record) => {
                        WorkoutRepository::mark_synced(
                            conn,
                            &row.local_id,
                            None,
                            Some(record.updated_at),
                        )
                        .await?;
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Delete => unreachable!("deletes are dispatched to push_delete"),
        }
    }

    async fn push_workout_exercise(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
        resolved: &mut HashMap<String, String>,
    ) -> Result<PushAction> {
        let Some(row) = WorkoutExerciseRepository::get_by_local_id(conn, &op.local_id).await?
        else {
            OperationRepository::mark_succeeded(conn, op.id).await?;
            return Ok(PushAction::Done(OpOutcome::Dropped));
        };

        let workout_ref =
            resolve_workout_ref(conn, resolved, &row.workout_local_id).await?;
        let exercise_ref =
            resolve_exercise_ref(conn, resolved, &row.exercise_local_id).await?;
        let (workout_id, exercise_id) = match (workout_ref, exercise_ref) {
            (Resolution::Resolved(w), Resolution::Resolved(e)) => (w, e),
            (Resolution::FailedParent, _) | (_, Resolution::FailedParent) => {
                return self.fail_with_broken_parent(conn, op).await;
            }
            _ => return Ok(PushAction::Done(OpOutcome::Deferred)),
        };

        let mut payload = WorkoutExercisePayload::from(&row);
        payload.workout_id = workout_id;
        payload.exercise_id = exercise_id;

        match op.op_type {
            OpType::Create => {
                if let Some(server_id) = row.server_id.clone() {
                    resolved.insert(row.local_id.clone(), server_id);
                    OperationRepository::mark_succeeded(conn, op.id).await?;
                    return Ok(PushAction::Done(OpOutcome::Dropped));
                }
                match self.backend.create_workout_exercise(&payload).await {
                    Ok(record) => {
                        WorkoutExerciseRepository::mark_synced(
                            conn,
                            &row.local_id,
                            Some(&record.id),
                        )
                        .await?;
                        resolved.insert(row.local_id.clone(), record.id);
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Update => {
                let Some(server_id) = row.server_id.clone() else {
                    return self.defer_or_fail_orphan_update(conn, op).await;
                };
                match self
                    .backend
                    .update_workout_exercise(&server_id, &payload)
                    .await
                {
                    Ok(_) => {
                        WorkoutExerciseRepository::mark_synced(conn, &row.local_id, None).await?;
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Delete => unreachable!("deletes are dispatched to push_delete"),
        }
    }

    async fn push_workout_set(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
        resolved: &mut HashMap<String, String>,
    ) -> Result<PushAction> {
        let Some(row) = WorkoutSetRepository::get_by_local_id(conn, &op.local_id).await? else {
            OperationRepository::mark_succeeded(conn, op.id).await?;
            return Ok(PushAction::Done(OpOutcome::Dropped));
        };

        let parent_ref =
            resolve_workout_exercise_ref(conn, resolved, &row.workout_exercise_local_id).await?;
        let workout_exercise_id = match parent_ref {
            Resolution::Resolved(id) => id,
            Resolution::FailedParent => return self.fail_with_broken_parent(conn, op).await,
            Resolution::Pending => return Ok(PushAction::Done(OpOutcome::Deferred)),
        };

        let mut payload = WorkoutSetPayload::from(&row);
        payload.workout_exercise_id = workout_exercise_id;

        match op.op_type {
            OpType::Create => {
                if let Some(server_id) = row.server_id.clone() {
                    resolved.insert(row.local_id.clone(), server_id);
                    OperationRepository::mark_succeeded(conn, op.id).await?;
                    return Ok(PushAction::Done(OpOutcome::Dropped));
                }
                match self.backend.create_workout_set(&payload).await {
                    Ok(record) => {
                        WorkoutSetRepository::mark_synced(conn, &row.local_id, Some(&record.id))
                            .await?;
                        resolved.insert(row.local_id.clone(), record.id);
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Update => {
                let Some(server_id) = row.server_id.clone() else {
                    return self.defer_or_fail_orphan_update(conn, op).await;
                };
                match self.backend.update_workout_set(&server_id, &payload).await {
                    Ok(_) => {
                        WorkoutSetRepository::mark_synced(conn, &row.local_id, None).await?;
                        OperationRepository::mark_succeeded(conn, op.id).await?;
                        Ok(PushAction::Done(OpOutcome::Pushed))
                    }
                    Err(err) => Ok(PushAction::Errored(err)),
                }
            }
            OpType::Delete => unreachable!("deletes are dispatched to push_delete"),
        }
    }

    /// An update whose row has no server id depends on a create that is
    /// either still queued (defer) or terminally failed (cascade the
    /// failure rather than send an unroutable update).
    async fn defer_or_fail_orphan_update(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
    ) -> Result<PushAction> {
        if OperationRepository::has_failed_create(conn, &op.local_id).await? {
            self.fail_with_broken_parent(conn, op).await
        } else {
            Ok(PushAction::Done(OpOutcome::Deferred))
        }
    }

    /// Terminally fail an operation whose parent will never exist remotely,
    /// and everything else queued for the same record.
    async fn fail_with_broken_parent(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
    ) -> Result<PushAction> {
        let error = "parent record was never created on the server";
        log::warn!(
            "failing {} {} for {}: {error}",
            op.op_type.as_str(),
            op.entity.as_str(),
            op.local_id
        );
        OperationRepository::record_failure(conn, op, error, false, Utc::now()).await?;
        OperationRepository::fail_pending_for(conn, &op.local_id, error).await?;
        self.mark_entity_failed(conn, op.entity, &op.local_id).await?;
        Ok(PushAction::Done(OpOutcome::Failed))
    }

    async fn handle_backend_error(
        &self,
        conn: &DatabaseConnection,
        op: &operation::Model,
        err: &BackendError,
    ) -> Result<OpOutcome> {
        let retryable = err.is_retryable();
        let next_attempt = Utc::now() + self.backoff_delay(op.retry_count);
        let disposition = OperationRepository::record_failure(
            conn,
            op,
            &err.to_string(),
            retryable,
            next_attempt,
        )
        .await?;

        match disposition {
            FailureDisposition::Scheduled(at) => {
                log::debug!(
                    "{} {} for {} failed ({err}), retrying at {at}",
                    op.op_type.as_str(),
                    op.entity.as_str(),
                    op.local_id
                );
                Ok(OpOutcome::Retried)
            }
            FailureDisposition::Terminal => {
                log::warn!(
                    "{} {} for {} failed permanently: {err}",
                    op.op_type.as_str(),
                    op.entity.as_str(),
                    op.local_id
                );
                if op.op_type == OpType::Create {
                    // Dependents can never resolve their reference now.
                    let cascade = format!("create failed: {err}");
                    OperationRepository::fail_pending_for(conn, &op.local_id, &cascade).await?;
                }
                self.mark_entity_failed(conn, op.entity, &op.local_id).await?;
                Ok(OpOutcome::Failed)
            }
        }
    }

    async fn mark_entity_failed(
        &self,
        conn: &DatabaseConnection,
        entity: OpEntity,
        local_id: &str,
    ) -> Result<()> {
        match entity {
            OpEntity::Exercise => ExerciseRepository::mark_failed(conn, local_id).await,
            OpEntity::Workout => WorkoutRepository::mark_failed(conn, local_id).await,
            OpEntity::WorkoutExercise => {
                WorkoutExerciseRepository::mark_failed(conn, local_id).await
            }
            OpEntity::WorkoutSet => WorkoutSetRepository::mark_failed(conn, local_id).await,
        }
    }

    /// Exponential backoff with full jitter: a uniform draw between zero and
    /// the capped exponential delay for this attempt.
    fn backoff_delay(&self, retry_count: i32) -> Duration {
        let base = self.config.initial_backoff_secs as f64
            * self.config.backoff_multiplier.powi(retry_count);
        let capped = base.min(self.config.max_backoff_secs as f64);
        let jittered = rand::rng().random_range(0.0..=capped);
        Duration::milliseconds((jittered * 1000.0) as i64)
    }
}

async fn resolve_workout_ref(
    conn: &DatabaseConnection,
    resolved: &HashMap<String, String>,
    reference: &str,
) -> Result<Resolution> {
    if !local_id::is_local(reference) {
        return Ok(Resolution::Resolved(reference.to_owned()));
    }
    if let Some(server_id) = resolved.get(reference) {
        return Ok(Resolution::Resolved(server_id.clone()));
    }
    match WorkoutRepository::get_by_local_id(conn, reference).await? {
        Some(row) => match row.server_id {
            Some(server_id) => Ok(Resolution::Resolved(server_id)),
            None if OperationRepository::has_failed_create(conn, reference).await? => {
                Ok(Resolution::FailedParent)
            }
            None => Ok(Resolution::Pending),
        },
        None => Ok(Resolution::FailedParent),
    }
}

async fn resolve_exercise_ref(
    conn: &DatabaseConnection,
    resolved: &HashMap<String, String>,
    reference: &str,
) -> Result<Resolution> {
    if !local_id::is_local(reference) {
        return Ok(Resolution::Resolved(reference.to_owned()));
    }
    if let Some(server_id) = resolved.get(reference) {
        return Ok(Resolution::Resolved(server_id.clone()));
    }
    match ExerciseRepository::get_by_local_id(conn, reference).await? {
        Some(row) => match row.server_id {
            Some(server_id) => Ok(Resolution::Resolved(server_id)),
            None if OperationRepository::has_failed_create(conn, reference).await? => {
                Ok(Resolution::FailedParent)
            }
            None => Ok(Resolution::Pending),
        },
        None => Ok(Resolution::FailedParent),
    }
}

async fn resolve_workout_exercise_ref(
    conn: &DatabaseConnection,
    resolved: &HashMap<String, String>,
    reference: &str,
) -> Result<Resolution> {
    if !local_id::is_local(reference) {
        return Ok(Resolution::Resolved(reference.to_owned()));
    }
    if let Some(server_id) = resolved.get(reference) {
        return Ok(Resolution::Resolved(server_id.clone()));
    }
    match WorkoutExerciseRepository::get_by_local_id(conn, reference).await? {
        Some(row) => match row.server_id {
            Some(server_id) => Ok(Resolution::Resolved(server_id)),
            None if OperationRepository::has_failed_create(conn, reference).await? => {
                Ok(Resolution::FailedParent)
            }
            None => Ok(Resolution::Pending),
        },
        None => Ok(Resolution::FailedParent),
    }
}
