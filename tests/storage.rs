use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue};

use liftlog::entities::{workout, SyncStatus, WorkoutStatus};
use liftlog::local_id;
use liftlog::repositories::WorkoutRepository;
use liftlog::storage::LocalStorage;

fn pending_workout(user_id: &str, name: &str) -> workout::ActiveModel {
    let now = Utc::now();
    workout::ActiveModel {
        id: ActiveValue::NotSet,
        local_id: ActiveValue::Set(local_id::generate()),
        server_id: ActiveValue::Set(None),
        user_id: ActiveValue::Set(user_id.to_owned()),
        template_id: ActiveValue::Set(None),
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
}

#[tokio::test]
async fn test_in_memory_storage_creation() {
    let result = LocalStorage::in_memory().await;
    assert!(result.is_ok(), "LocalStorage should be created successfully");
}

#[tokio::test]
async fn test_schema_reinit_is_idempotent() {
    let storage = LocalStorage::in_memory().await.unwrap();
    // A second storage against the same URL re-runs schema creation.
    let row = pending_workout("u", "Push Day").insert(&storage.conn).await;
    assert!(row.is_ok());
}

#[tokio::test]
async fn test_has_data_reflects_workouts() {
    let storage = LocalStorage::in_memory().await.unwrap();
    assert!(!storage.has_data().await.unwrap());

    pending_workout("u", "Push Day").insert(&storage.conn).await.unwrap();
    assert!(storage.has_data().await.unwrap());
}

#[tokio::test]
async fn test_clear_all_data() {
    let storage = LocalStorage::in_memory().await.unwrap();
    pending_workout("u", "Push Day").insert(&storage.conn).await.unwrap();

    storage.clear_all_data().await.unwrap();
    assert!(!storage.has_data().await.unwrap());
}

#[tokio::test]
async fn test_workout_lookup_by_local_and_server_id() {
    let storage = LocalStorage::in_memory().await.unwrap();
    let row = pending_workout("u", "Leg Day").insert(&storage.conn).await.unwrap();

    let by_local = WorkoutRepository::get_by_local_id(&storage.conn, &row.local_id)
        .await
        .unwrap();
    assert_eq!(by_local.as_ref().map(|w| w.name.as_str()), Some("Leg Day"));

    WorkoutRepository::mark_synced(&storage.conn, &row.local_id, Some("srv-9"), None)
        .await
        .unwrap();
    let by_server = WorkoutRepository::get_by_server_id(&storage.conn, "srv-9")
        .await
        .unwrap()
        .expect("workout should be found by server id");
    assert_eq!(by_server.local_id, row.local_id);
    assert_eq!(by_server.sync_status, SyncStatus::Synced);
    assert!(!by_server.needs_sync);
}

#[tokio::test]
async fn test_get_active_returns_most_recent_in_progress() {
    let storage = LocalStorage::in_memory().await.unwrap();

    let mut first = pending_workout("u", "Old");
    first.started_at = ActiveValue::Set(Utc::now() - chrono::Duration::hours(2));
    first.insert(&storage.conn).await.unwrap();

    let newer = pending_workout("u", "New").insert(&storage.conn).await.unwrap();

    let active = WorkoutRepository::get_active(&storage.conn, "u")
        .await
        .unwrap()
        .expect("an in-progress workout exists");
    assert_eq!(active.local_id, newer.local_id);

    // Other users see nothing.
    assert!(WorkoutRepository::get_active(&storage.conn, "someone-else")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_local_id_format() {
    let id = local_id::generate();
    assert!(local_id::is_local(&id));
    assert!(id.starts_with("local-"));
    assert!(!local_id::is_local("srv-42"));

    let other = local_id::generate();
    assert_ne!(id, other, "generated ids must be unique");
}
