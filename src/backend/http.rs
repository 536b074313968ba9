//! HTTP implementation of the [`Backend`] trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{
    Backend, BackendError, ExercisePayload, RemoteRecord, SyncChanges, WorkoutExercisePayload,
    WorkoutPayload, WorkoutSetPayload,
};

/// Backend speaking to the REST API over HTTPS with bearer auth.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else {
                BackendError::Network(e.to_string())
            }
        })?;
        classify_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidData(e.to_string()))
    }

    /// POST a create. The entity's local id doubles as an idempotency key so
    /// a replayed create after a lost acknowledgement does not duplicate the
    /// record server side.
    async fn post_create<P: Serialize>(
        &self,
        path: &str,
        local_id: &str,
        payload: &P,
    ) -> Result<RemoteRecord, BackendError> {
        let response = self
            .send(
                self.request(Method::POST, path)
                    .header("Idempotency-Key", local_id)
                    .json(payload),
            )
            .await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidData(e.to_string()))
    }

    async fn put_update<P: Serialize>(
        &self,
        path: &str,
        payload: &P,
    ) -> Result<RemoteRecord, BackendError> {
        let response = self.send(self.request(Method::PUT, path).json(payload)).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidData(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

async fn classify_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Auth),
        StatusCode::NOT_FOUND => Err(BackendError::NotFound),
        s if s.is_server_error() => Err(BackendError::Server(s.as_u16())),
        s => {
            let body = response.text().await.unwrap_or_default();
            Err(BackendError::Validation(s.as_u16(), body))
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn backend_type(&self) -> &'static str {
        "http"
    }

    async fn fetch_changes(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<SyncChanges, BackendError> {
        let path = match since {
            Some(ts) => format!(
                "/api/sync/changes?since={}",
                ts.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            None => "/api/sync/changes".to_owned(),
        };
        self.get_json(&path).await
    }

    async fn create_workout(&self, payload: &WorkoutPayload) -> Result<RemoteRecord, BackendError> {
        self.post_create("/api/workouts", &payload.local_id, payload).await
    }

    async fn update_workout(
        &self,
        server_id: &str,
        payload: &WorkoutPayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.put_update(&format!("/api/workouts/{server_id}"), payload).await
    }

    async fn delete_workout(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete(&format!("/api/workouts/{server_id}")).await
    }

    async fn create_workout_exercise(
        &self,
        payload: &WorkoutExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.post_create("/api/workout-exercises", &payload.local_id, payload)
            .await
    }

    async fn update_workout_exercise(
        &self,
        server_id: &str,
        payload: &WorkoutExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.put_update(&format!("/api/workout-exercises/{server_id}"), payload)
            .await
    }

    async fn delete_workout_exercise(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete(&format!("/api/workout-exercises/{server_id}")).await
    }

    async fn create_workout_set(
        &self,
        payload: &WorkoutSetPayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.post_create("/api/workout-sets", &payload.local_id, payload).await
    }

    async fn update_workout_set(
        &self,
        server_id: &str,
        payload: &WorkoutSetPayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.put_update(&format!("/api/workout-sets/{server_id}"), payload).await
    }

    async fn delete_workout_set(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete(&format!("/api/workout-sets/{server_id}")).await
    }

    async fn create_exercise(
        &self,
        payload: &ExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.post_create("/api/exercises", &payload.local_id, payload).await
    }

    async fn update_exercise(
        &self,
        server_id: &str,
        payload: &ExercisePayload,
    ) -> Result<RemoteRecord, BackendError> {
        self.put_update(&format!("/api/exercises/{server_id}"), payload).await
    }

    async fn delete_exercise(&self, server_id: &str) -> Result<(), BackendError> {
        self.delete(&format!("/api/exercises/{server_id}")).await
    }
}
