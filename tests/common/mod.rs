//! Shared test fixtures: an in-memory store and a scriptable backend.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use liftlog::backend::{
    Backend, BackendError, ExercisePayload, RemoteRecord, SyncChanges, WorkoutExercisePayload,
    WorkoutPayload, WorkoutSetPayload,
};
use liftlog::storage::LocalStorage;

pub const USER: &str = "user-1";

pub async fn memory_storage() -> Arc<Mutex<LocalStorage>> {
    let storage = LocalStorage::in_memory()
        .await
        .expect("in-memory storage should initialize");
    Arc::new(Mutex::new(storage))
}

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    next_id: u64,
    /// Server ids handed out per idempotency key, so a replayed create
    /// returns the same record instead of minting a duplicate.
    created: HashMap<String, String>,
    deleted: Vec<String>,
    /// Scripted errors per method name, consumed in order.
    failures: HashMap<String, VecDeque<BackendError>>,
    /// Scripted latencies per method name, consumed in order.
    delays: HashMap<String, VecDeque<Duration>>,
    changes: SyncChanges,
}

/// In-memory backend that records calls and can be scripted to fail.
#[derive(Default)]
pub struct MockBackend {
    state: StdMutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next call to `method` (e.g. "create_workout") to fail.
    pub fn fail_next(&self, method: &str, err: BackendError) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(method.to_owned()).or_default().push_back(err);
    }

    /// Script the next call to `method` to stall for `delay` first.
    pub fn delay_next(&self, method: &str, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.delays.entry(method.to_owned()).or_default().push_back(delay);
    }

    /// Set the response for the next `fetch_changes` call.
    pub fn set_changes(&self, changes: SyncChanges) {
        self.state.lock().unwrap().changes = changes;
    }

    /// Every call made so far, as "method entity-or-id" strings.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Server ids deleted so far.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// The server id assigned to a created record, if any.
    pub fn server_id_for(&self, local_id: &str) -> Option<String> {
        self.state.lock().unwrap().created.get(local_id).cloned()
    }

    fn check_failure(state: &mut MockState, method: &str) -> Result<(), BackendError> {
        if let Some(queue) = state.failures.get_mut(method) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }
        Ok(())
    }

    async fn take_delay(&self, method: &str) {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.delays.get_mut(method).and_then(|queue| queue.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn create(&self, method: &str, local_id: &str) -> Result<RemoteRecord, BackendError> {
        self.take_delay(method).await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{method} {local_id}"));
        Self::check_failure(&mut state, method)?;

        let id = match state.created.get(local_id) {
            Some(existing) => existing.clone(),
            None => {
                state.next_id += 1;
                let id = format!("srv-{}", state.next_id);
                state.created.insert(local_id.to_owned(), id.clone());
                id
            }
        };
        Ok(RemoteRecord {
            id,
            updated_at: Utc::now(),
        })
    }

    fn update(&self, method: &str, server_id: &str) -> Result<RemoteRecord, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{method} {server_id}"));
        Self::check_failure(&mut state, method)?;
        Ok(RemoteRecord {
            id: server_id.to_owned(),
            updated_at: Utc::now(),
        })
    }

    fn delete(&self, method: &str, server_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{method} {server_id}"));
        Self::check_failure(&mut state, method)?;
        state.deleted.push(server_id.to_owned());
        Ok(())
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn backend_type(&self) -> &'static str {
        "mock"
    }

    async fn fetch_changes(
        &self,
        _since: Option<DateTime<Utc>>,
    ) -> Result<SyncChanges, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("fetch_changes".to_owned());
        Self::check_failure(&mut state, "fetch_changes")?;
        Ok(state.changes.clone())
    }

    async fn create_workout(&self, payload: &WorkoutPayload) -> Result<RemoteRecord, BackendError> {
        self.create("create_workout", &payload.local_id).await
    }

    async fn update_workout(
        &self,
        server_id: &str,
        _payload: &WorkoutPayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.update("update_workout", server_id)
    }

    async fn delete_workout(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete("delete_workout", server_id)
    }

    async fn create_workout_exercise(
        &self,
        payload: &WorkoutExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        // Children must never be sent with unresolved parent references.
        assert!(
            !payload.workout_id.starts_with("local-"),
            "workout reference {} was not resolved to a server id",
            payload.workout_id
        );
        self.create("create_workout_exercise", &payload.local_id).await
    }

    async fn update_workout_exercise(
        &self,
        server_id: &str,
        _payload: &WorkoutExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.update("update_workout_exercise", server_id)
    }

    async fn delete_workout_exercise(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete("delete_workout_exercise", server_id)
    }

    async fn create_workout_set(
        &self,
        payload: &WorkoutSetPayload,
    ) -> Result<RemoteRecord, BackendError> {
        assert!(
            !payload.workout_exercise_id.starts_with("local-"),
            "workout exercise reference {} was not resolved to a server id",
            payload.workout_exercise_id
        );
        self.create("create_workout_set", &payload.local_id).await
    }

    async fn update_workout_set(
        &self,
        server_id: &str,
        _payload: &WorkoutSetPayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.update("update_workout_set", server_id)
    }

    async fn delete_workout_set(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete("delete_workout_set", server_id)
    }

    async fn create_exercise(
        &self,
        payload: &ExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.create("create_exercise", &payload.local_id).await
    }

    async fn update_exercise(
        &self,
        server_id: &str,
        _payload: &ExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.update("update_exercise", server_id)
    }

    async fn delete_exercise(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete("delete_exercise", server_id)
    }
}
