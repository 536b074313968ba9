//! Remote backend abstraction.
//!
//! The sync engine talks to the server exclusively through the [`Backend`]
//! trait, so tests can substitute a scripted implementation and the HTTP
//! transport stays in one place.

pub mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{exercise, workout, workout_exercise, workout_set};

/// Errors surfaced by a backend. The retryable classification drives the
/// queue's backoff-versus-terminal decision.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: HTTP {0}")]
    Server(u16),

    #[error("Rejected by server: HTTP {0}: {1}")]
    Validation(u16, String),

    #[error("Authentication failed")]
    Auth,

    #[error("Not found")]
    NotFound,

    #[error("Invalid response data: {0}")]
    InvalidData(String),
}

impl BackendError {
    /// Transient failures worth retrying with backoff. Rejections, auth
    /// failures and malformed data will not improve on replay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Network(_) | BackendError::Timeout | BackendError::Server(_)
        )
    }
}

/// Server acknowledgement of a create or update.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutPayload {
    pub local_id: String,
    pub name: String,
    pub template_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub notes: Option<String>,
}

impl From<&workout::Model> for WorkoutPayload {
    fn from(model: &workout::Model) -> Self {
        Self {
            local_id: model.local_id.clone(),
            name: model.name.clone(),
            template_id: model.template_id.clone(),
            started_at: model.started_at,
            completed_at: model.completed_at,
            status: model.status.as_str().to_owned(),
            notes: model.notes.clone(),
        }
    }
}

/// References start out as local ids and are rewritten to server ids by the
/// sync engine before the payload is sent.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutExercisePayload {
    pub local_id: String,
    pub workout_id: String,
    pub exercise_id: String,
    pub order_index: i32,
    pub notes: Option<String>,
}

impl From<&workout_exercise::Model> for WorkoutExercisePayload {
    fn from(model: &workout_exercise::Model) -> Self {
        Self {
            local_id: model.local_id.clone(),
            workout_id: model.workout_local_id.clone(),
            exercise_id: model.exercise_local_id.clone(),
            order_index: model.order_index,
            notes: model.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutSetPayload {
    pub local_id: String,
    pub workout_exercise_id: String,
    pub set_number: i32,
    pub weight: f64,
    pub reps: i32,
    pub rpe: Option<f64>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&workout_set::Model> for WorkoutSetPayload {
    fn from(model: &workout_set::Model) -> Self {
        Self {
            local_id: model.local_id.clone(),
            workout_exercise_id: model.workout_exercise_local_id.clone(),
            set_number: model.set_number,
            weight: model.weight,
            reps: model.reps,
            rpe: model.rpe,
            completed: model.completed,
            completed_at: model.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExercisePayload {
    pub local_id: String,
    pub name: String,
    pub muscle_group: Option<String>,
    pub description: Option<String>,
    pub library_id: Option<String>,
}

impl From<&exercise::Model> for ExercisePayload {
    fn from(model: &exercise::Model) -> Self {
        Self {
            local_id: model.local_id.clone(),
            name: model.name.clone(),
            muscle_group: model.muscle_group.clone(),
            description: model.description.clone(),
            library_id: model.library_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteWorkout {
    pub id: String,
    pub local_id: Option<String>,
    pub name: String,
    pub template_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteWorkoutExercise {
    pub id: String,
    pub local_id: Option<String>,
    pub workout_id: String,
    pub exercise_id: String,
    pub order_index: i32,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteWorkoutSet {
    pub id: String,
    pub local_id: Option<String>,
    pub workout_exercise_id: String,
    pub set_number: i32,
    pub weight: f64,
    pub reps: i32,
    pub rpe: Option<f64>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteExercise {
    pub id: String,
    pub local_id: Option<String>,
    pub name: String,
    pub muscle_group: Option<String>,
    pub description: Option<String>,
    pub library_id: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Everything the server reports changed since a checkpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncChanges {
    #[serde(default)]
    pub exercises: Vec<RemoteExercise>,
    #[serde(default)]
    pub workouts: Vec<RemoteWorkout>,
    #[serde(default)]
    pub workout_exercises: Vec<RemoteWorkoutExercise>,
    #[serde(default)]
    pub workout_sets: Vec<RemoteWorkoutSet>,
}

/// Remote API surface used by the sync engine and the remote repositories.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier for log lines.
    fn backend_type(&self) -> &'static str;

    /// Fetch everything changed since the checkpoint; `None` means a full
    /// snapshot.
    async fn fetch_changes(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<SyncChanges, BackendError>;

    async fn create_workout(&self, payload: &WorkoutPayload) -> Result<RemoteRecord, BackendError>;
    async fn update_workout(
        &self,
        server_id: &str,
        payload: &WorkoutPayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn delete_workout(&self, server_id: &str) -> Result<(), BackendError>;

    async fn create_workout_exercise(
        &self,
        payload: &WorkoutExercisePayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn update_workout_exercise(
        &self,
        server_id: &str,
        payload: &WorkoutExercisePayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn delete_workout_exercise(&self, server_id: &str) -> Result<(), BackendError>;

    async fn create_workout_set(
        &self,
        payload: &WorkoutSetPayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn update_workout_set(
        &self,
        server_id: &str,
        payload: &WorkoutSetPayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn delete_workout_set(&self, server_id: &str) -> Result<(), BackendError>;

    async fn create_exercise(
        &self,
        payload: &ExercisePayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn update_exercise(
        &self,
        server_id: &str,
        payload: &ExercisePayload,
    ) -> Result<RemoteRecord, BackendError>;
    async fn delete_exercise(&self, server_id: &str) -> Result<(), BackendError>;
}
