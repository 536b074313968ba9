//! Unified exercise access.
//!
//! Callers work against [`ExerciseService`] without caring whether records
//! come from the offline store or straight from the backend. The local
//! implementation is the normal path; the remote one exists for contexts
//! with no local database, such as one-off scripted tooling.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, IntoActiveModel, TransactionTrait};
use serde_json::json;
use tokio::sync::Mutex;

use crate::backend::{Backend, ExercisePayload, RemoteExercise};
use crate::entities::operation::{OpEntity, OpType};
use crate::entities::{exercise, SyncStatus};
use crate::local_id;
use crate::repositories::{ExerciseRepository, OperationRepository};
use crate::storage::LocalStorage;

/// An exercise as callers see it, independent of where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedExercise {
    /// Local id when mirrored locally, otherwise the server id.
    pub id: String,
    pub server_id: Option<String>,
    pub name: String,
    pub muscle_group: Option<String>,
    pub description: Option<String>,
    pub library_id: Option<String>,
    /// True while local edits have not reached the server.
    pub pending_sync: bool,
}

impl From<&exercise::Model> for UnifiedExercise {
    fn from(model: &exercise::Model) -> Self {
        Self {
            id: model.local_id.clone(),
            server_id: model.server_id.clone(),
            name: model.name.clone(),
            muscle_group: model.muscle_group.clone(),
            description: model.description.clone(),
            library_id: model.library_id.clone(),
            pending_sync: model.needs_sync,
        }
    }
}

impl From<&RemoteExercise> for UnifiedExercise {
    fn from(remote: &RemoteExercise) -> Self {
        Self {
            id: remote.id.clone(),
            server_id: Some(remote.id.clone()),
            name: remote.name.clone(),
            muscle_group: remote.muscle_group.clone(),
            description: remote.description.clone(),
            library_id: remote.library_id.clone(),
            pending_sync: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateExerciseInput {
    pub name: String,
    pub muscle_group: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateExerciseInput {
    pub name: Option<String>,
    pub muscle_group: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

/// A curated exercise available to copy into the user's own list.
#[derive(Debug, Clone, Copy)]
pub struct LibraryEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub muscle_group: &'static str,
    pub description: &'static str,
}

/// Built-in exercise catalog. Copying an entry records its id in
/// `library_id` so copies can be traced back to their origin.
pub static EXERCISE_LIBRARY: &[LibraryEntry] = &[
    LibraryEntry {
        id: "lib-back-squat",
        name: "Back Squat",
        muscle_group: "legs",
        description: "Barbell squat with the bar on the upper back",
    },
    LibraryEntry {
        id: "lib-front-squat",
        name: "Front Squat",
        muscle_group: "legs",
        description: "Barbell squat with the bar racked on the front delts",
    },
    LibraryEntry {
        id: "lib-deadlift",
        name: "Deadlift",
        muscle_group: "back",
        description: "Conventional barbell deadlift from the floor",
    },
    LibraryEntry {
        id: "lib-romanian-deadlift",
        name: "Romanian Deadlift",
        muscle_group: "hamstrings",
        description: "Hip hinge with a slight knee bend, bar kept close",
    },
    LibraryEntry {
        id: "lib-bench-press",
        name: "Bench Press",
        muscle_group: "chest",
        description: "Barbell press from a flat bench",
    },
    LibraryEntry {
        id: "lib-incline-bench-press",
        name: "Incline Bench Press",
        muscle_group: "chest",
        description: "Barbell press from a 30 degree incline bench",
    },
    LibraryEntry {
        id: "lib-overhead-press",
        name: "Overhead Press",
        muscle_group: "shoulders",
        description: "Standing barbell press to lockout",
    },
    LibraryEntry {
        id: "lib-barbell-row",
        name: "Barbell Row",
        muscle_group: "back",
        description: "Bent-over row with a barbell",
    },
    LibraryEntry {
        id: "lib-pull-up",
        name: "Pull-Up",
        muscle_group: "back",
        description: "Bodyweight pull-up with a pronated grip",
    },
    LibraryEntry {
        id: "lib-dip",
        name: "Dip",
        muscle_group: "chest",
        description: "Bodyweight dip on parallel bars",
    },
    LibraryEntry {
        id: "lib-leg-press",
        name: "Leg Press",
        muscle_group: "legs",
        description: "Machine leg press",
    },
    LibraryEntry {
        id: "lib-leg-curl",
        name: "Leg Curl",
        muscle_group: "hamstrings",
        description: "Machine hamstring curl",
    },
    LibraryEntry {
        id: "lib-lateral-raise",
        name: "Lateral Raise",
        muscle_group: "shoulders",
        description: "Dumbbell raise to the side at shoulder height",
    },
    LibraryEntry {
        id: "lib-barbell-curl",
        name: "Barbell Curl",
        muscle_group: "arms",
        description: "Standing biceps curl with a barbell",
    },
    LibraryEntry {
        id: "lib-triceps-pushdown",
        name: "Triceps Pushdown",
        muscle_group: "arms",
        description: "Cable pushdown with a straight bar or rope",
    },
];

/// Look up a built-in library entry by id.
pub fn library_entry(library_id: &str) -> Option<&'static LibraryEntry> {
    EXERCISE_LIBRARY.iter().find(|entry| entry.id == library_id)
}

/// Where exercise data lives for a given caller.
pub struct RepositoryContext {
    pub user_id: String,
    pub storage: Option<Arc<Mutex<LocalStorage>>>,
    pub backend: Option<Arc<dyn Backend>>,
}

/// Uniform CRUD surface over exercises.
#[async_trait]
pub trait ExerciseService: Send + Sync {
    async fn create(&self, input: CreateExerciseInput) -> Result<UnifiedExercise>;
    async fn get_by_id(&self, id: &str) -> Result<Option<UnifiedExercise>>;
    async fn get_all(&self) -> Result<Vec<UnifiedExercise>>;
    async fn update(&self, id: &str, input: UpdateExerciseInput) -> Result<UnifiedExercise>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Copy a built-in library entry into the user's exercises.
    async fn copy_from_library(&self, library_id: &str) -> Result<UnifiedExercise>;
}

/// Pick the implementation the context supports. Local wins when both a
/// store and a backend are available; the store is the source of truth and
/// the sync engine covers the remote side.
pub fn exercise_service(ctx: &RepositoryContext) -> Result<Arc<dyn ExerciseService>> {
    if let Some(storage) = &ctx.storage {
        return Ok(Arc::new(LocalExerciseService {
            storage: storage.clone(),
            user_id: ctx.user_id.clone(),
        }));
    }
    if let Some(backend) = &ctx.backend {
        return Ok(Arc::new(RemoteExerciseService {
            backend: backend.clone(),
        }));
    }
    bail!("repository context has neither local storage nor a backend");
}

/// Offline-first implementation: every mutation lands in the local store
/// and the operation queue in one transaction.
pub struct LocalExerciseService {
    storage: Arc<Mutex<LocalStorage>>,
    user_id: String,
}

/// Callers hold whichever id they last saw, so lookups accept both forms.
async fn find_exercise<C: ConnectionTrait>(
    conn: &C,
    id: &str,
) -> Result<Option<exercise::Model>> {
    if local_id::is_local(id) {
        ExerciseRepository::get_by_local_id(conn, id).await
    } else {
        ExerciseRepository::get_by_server_id(conn, id).await
    }
}

impl LocalExerciseService {
    async fn insert_exercise(
        &self,
        storage: &LocalStorage,
        name: &str,
        muscle_group: Option<String>,
        description: Option<String>,
        library_id: Option<String>,
    ) -> Result<exercise::Model> {
        let now = Utc::now();
        let txn = storage.conn.begin().await?;
        let row = exercise::ActiveModel {
            id: ActiveValue::NotSet,
            local_id: ActiveValue::Set(local_id::generate()),
            server_id: ActiveValue::Set(None),
            user_id: ActiveValue::Set(self.user_id.clone()),
            name: ActiveValue::Set(name.to_owned()),
            muscle_group: ActiveValue::Set(muscle_group),
            description: ActiveValue::Set(description),
            library_id: ActiveValue::Set(library_id),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            sync_status: ActiveValue::Set(SyncStatus::Pending),
            needs_sync: ActiveValue::Set(true),
        }
        .insert(&txn)
        .await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Create,
            OpEntity::Exercise,
            &row.local_id,
            serde_json::to_value(ExercisePayload::from(&row))?,
        )
        .await?;
        txn.commit().await?;
        Ok(row)
    }
}

#[async_trait]
impl ExerciseService for LocalExerciseService {
    async fn create(&self, input: CreateExerciseInput) -> Result<UnifiedExercise> {
        let storage = self.storage.lock().await;
        let row = self
            .insert_exercise(&storage, &input.name, input.muscle_group, input.description, None)
            .await?;
        Ok(UnifiedExercise::from(&row))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<UnifiedExercise>> {
        let storage = self.storage.lock().await;
        let row = find_exercise(&storage.conn, id).await?;
        Ok(row.as_ref().map(UnifiedExercise::from))
    }

    async fn get_all(&self) -> Result<Vec<UnifiedExercise>> {
        let storage = self.storage.lock().await;
        let rows = ExerciseRepository::get_for_user(&storage.conn, &self.user_id).await?;
        Ok(rows.iter().map(UnifiedExercise::from).collect())
    }

    async fn update(&self, id: &str, input: UpdateExerciseInput) -> Result<UnifiedExercise> {
        let storage = self.storage.lock().await;
        let Some(row) = find_exercise(&storage.conn, id).await? else {
            bail!("exercise {id} not found");
        };

        let txn = storage.conn.begin().await?;
        let mut active = row.into_active_model();
        if let Some(name) = input.name {
            active.name = ActiveValue::Set(name);
        }
        if let Some(muscle_group) = input.muscle_group {
            active.muscle_group = ActiveValue::Set(muscle_group);
        }
        if let Some(description) = input.description {
            active.description = ActiveValue::Set(description);
        }
        active.updated_at = ActiveValue::Set(Utc::now());
        active.sync_status = ActiveValue::Set(SyncStatus::Pending);
        active.needs_sync = ActiveValue::Set(true);
        let updated = active.update(&txn).await?;

        OperationRepository::enqueue(
            &txn,
            OpType::Update,
            OpEntity::Exercise,
            &updated.local_id,
            serde_json::to_value(ExercisePayload::from(&updated))?,
        )
        .await?;
        txn.commit().await?;

        Ok(UnifiedExercise::from(&updated))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let storage = self.storage.lock().await;
        let Some(row) = find_exercise(&storage.conn, id).await? else {
            bail!("exercise {id} not found");
        };

        let txn = storage.conn.begin().await?;
        OperationRepository::cancel_for(&txn, OpEntity::Exercise, &row.local_id).await?;
        if let Some(server_id) = &row.server_id {
            OperationRepository::enqueue(
                &txn,
                OpType::Delete,
                OpEntity::Exercise,
                &row.local_id,
                json!({ "local_id": row.local_id, "server_id": server_id }),
            )
            .await?;
        }
        ExerciseRepository::delete_by_local_id(&txn, &row.local_id).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn copy_from_library(&self, library_id: &str) -> Result<UnifiedExercise> {
        let Some(entry) = library_entry(library_id) else {
            bail!("unknown library exercise {library_id}");
        };
        let storage = self.storage.lock().await;
        let row = self
            .insert_exercise(
                &storage,
                entry.name,
                Some(entry.muscle_group.to_owned()),
                Some(entry.description.to_owned()),
                Some(entry.id.to_owned()),
            )
            .await?;
        Ok(UnifiedExercise::from(&row))
    }
}

/// Direct backend implementation for contexts without a local store.
pub struct RemoteExerciseService {
    backend: Arc<dyn Backend>,
}

#[async_trait]
impl ExerciseService for RemoteExerciseService {
    async fn create(&self, input: CreateExerciseInput) -> Result<UnifiedExercise> {
        let payload = ExercisePayload {
            local_id: local_id::generate(),
            name: input.name.clone(),
            muscle_group: input.muscle_group.clone(),
            description: input.description.clone(),
            library_id: None,
        };
        let record = self.backend.create_exercise(&payload).await?;
        Ok(UnifiedExercise {
            id: record.id.clone(),
            server_id: Some(record.id),
            name: input.name,
            muscle_group: input.muscle_group,
            description: input.description,
            library_id: None,
            pending_sync: false,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<UnifiedExercise>> {
        let all = self.get_all().await?;
        Ok(all.into_iter().find(|e| e.id == id))
    }

    async fn get_all(&self) -> Result<Vec<UnifiedExercise>> {
        let changes = self.backend.fetch_changes(None).await?;
        Ok(changes
            .exercises
            .iter()
            .filter(|e| !e.is_deleted)
            .map(UnifiedExercise::from)
            .collect())
    }

    async fn update(&self, id: &str, input: UpdateExerciseInput) -> Result<UnifiedExercise> {
        let Some(current) = self.get_by_id(id).await? else {
            bail!("exercise {id} not found");
        };
        let payload = ExercisePayload {
            local_id: current.id.clone(),
            name: input.name.unwrap_or(current.name),
            muscle_group: input.muscle_group.unwrap_or(current.muscle_group),
            description: input.description.unwrap_or(current.description),
            library_id: current.library_id,
        };
        self.backend.update_exercise(id, &payload).await?;
        Ok(UnifiedExercise {
            id: id.to_owned(),
            server_id: Some(id.to_owned()),
            name: payload.name,
            muscle_group: payload.muscle_group,
            description: payload.description,
            library_id: payload.library_id,
            pending_sync: false,
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete_exercise(id).await?;
        Ok(())
    }

    async fn copy_from_library(&self, library_id: &str) -> Result<UnifiedExercise> {
        let Some(entry) = library_entry(library_id) else {
            bail!("unknown library exercise {library_id}");
        };
        let payload = ExercisePayload {
            local_id: local_id::generate(),
            name: entry.name.to_owned(),
            muscle_group: Some(entry.muscle_group.to_owned()),
            description: Some(entry.description.to_owned()),
            library_id: Some(entry.id.to_owned()),
        };
        let record = self.backend.create_exercise(&payload).await?;
        Ok(UnifiedExercise {
            id: record.id.clone(),
            server_id: Some(record.id),
            name: payload.name,
            muscle_group: payload.muscle_group,
            description: payload.description,
            library_id: payload.library_id,
            pending_sync: false,
        })
    }
}
