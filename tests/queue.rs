use chrono::{Duration, Utc};
use sea_orm::EntityTrait;
use serde_json::json;

use liftlog::entities::operation::{OpEntity, OpStatus, OpType};
use liftlog::repositories::operation::{
    EnqueueOutcome, FailureDisposition, OperationRepository, DEFAULT_MAX_RETRIES,
};
use liftlog::storage::LocalStorage;

#[tokio::test]
async fn test_enqueue_appends_pending_operation() {
    let storage = LocalStorage::in_memory().await.unwrap();

    let outcome = OperationRepository::enqueue(
        &storage.conn,
        OpType::Create,
        OpEntity::Workout,
        "local-w1",
        json!({"name": "Push Day"}),
    )
    .await
    .unwrap();

    assert_eq!(outcome, EnqueueOutcome::Queued);
    assert_eq!(OperationRepository::count_pending(&storage.conn).await.unwrap(), 1);

    let due = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].op_type, OpType::Create);
    assert_eq!(due[0].max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(due[0].status, OpStatus::Pending);
}

#[tokio::test]
async fn test_update_merges_into_pending_create() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(
        &storage.conn,
        OpType::Create,
        OpEntity::WorkoutSet,
        "local-s1",
        json!({"weight": 100.0, "reps": 5}),
    )
    .await
    .unwrap();

    let outcome = OperationRepository::enqueue(
        &storage.conn,
        OpType::Update,
        OpEntity::WorkoutSet,
        "local-s1",
        json!({"reps": 8}),
    )
    .await
    .unwrap();

    assert_eq!(outcome, EnqueueOutcome::Merged);
    let due = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1, "the update must fold into the pending create");
    assert_eq!(due[0].op_type, OpType::Create);
    assert_eq!(due[0].data["weight"], json!(100.0));
    assert_eq!(due[0].data["reps"], json!(8));
}

#[tokio::test]
async fn test_update_merges_into_pending_update() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(
        &storage.conn,
        OpType::Update,
        OpEntity::Workout,
        "local-w1",
        json!({"name": "a"}),
    )
    .await
    .unwrap();
    OperationRepository::enqueue(
        &storage.conn,
        OpType::Update,
        OpEntity::Workout,
        "local-w1",
        json!({"notes": "b"}),
    )
    .await
    .unwrap();

    let due = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].data["name"], json!("a"));
    assert_eq!(due[0].data["notes"], json!("b"));
}

#[tokio::test]
async fn test_delete_replaces_pending_update() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(
        &storage.conn,
        OpType::Update,
        OpEntity::Workout,
        "local-w1",
        json!({"name": "a"}),
    )
    .await
    .unwrap();
    OperationRepository::enqueue(
        &storage.conn,
        OpType::Delete,
        OpEntity::Workout,
        "local-w1",
        json!({"server_id": "srv-1"}),
    )
    .await
    .unwrap();

    let due = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1, "the update is subsumed by the delete");
    assert_eq!(due[0].op_type, OpType::Delete);
}

#[tokio::test]
async fn test_cancel_for_reports_pending_create() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(
        &storage.conn,
        OpType::Create,
        OpEntity::WorkoutSet,
        "local-s1",
        json!({}),
    )
    .await
    .unwrap();

    let had_create =
        OperationRepository::cancel_for(&storage.conn, OpEntity::WorkoutSet, "local-s1")
            .await
            .unwrap();
    assert!(had_create, "a pending create was cancelled");
    assert_eq!(OperationRepository::count_pending(&storage.conn).await.unwrap(), 0);

    // Nothing queued means nothing to cancel.
    let had_create =
        OperationRepository::cancel_for(&storage.conn, OpEntity::WorkoutSet, "local-s1")
            .await
            .unwrap();
    assert!(!had_create);
}

#[tokio::test]
async fn test_due_in_order_ranks_parents_first() {
    let storage = LocalStorage::in_memory().await.unwrap();

    // Enqueued child-first on purpose.
    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::WorkoutSet, "local-s1", json!({}))
        .await
        .unwrap();
    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::WorkoutExercise, "local-we1", json!({}))
        .await
        .unwrap();
    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::Workout, "local-w1", json!({}))
        .await
        .unwrap();
    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::Exercise, "local-e1", json!({}))
        .await
        .unwrap();

    let due = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    let entities: Vec<OpEntity> = due.iter().map(|op| op.entity).collect();
    assert_eq!(
        entities,
        vec![
            OpEntity::Exercise,
            OpEntity::Workout,
            OpEntity::WorkoutExercise,
            OpEntity::WorkoutSet,
        ]
    );
}

#[tokio::test]
async fn test_due_in_order_ranks_deletes_children_first() {
    let storage = LocalStorage::in_memory().await.unwrap();

    // Enqueued parent-first on purpose.
    OperationRepository::enqueue(&storage.conn, OpType::Delete, OpEntity::Workout, "local-w1", json!({"server_id": "srv-w1"}))
        .await
        .unwrap();
    OperationRepository::enqueue(&storage.conn, OpType::Delete, OpEntity::WorkoutSet, "local-s1", json!({"server_id": "srv-s1"}))
        .await
        .unwrap();
    OperationRepository::enqueue(&storage.conn, OpType::Delete, OpEntity::WorkoutExercise, "local-we1", json!({"server_id": "srv-we1"}))
        .await
        .unwrap();

    let due = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    let entities: Vec<OpEntity> = due.iter().map(|op| op.entity).collect();
    assert_eq!(
        entities,
        vec![OpEntity::WorkoutSet, OpEntity::WorkoutExercise, OpEntity::Workout],
        "a child's remote row goes away before its parent's"
    );
}

#[tokio::test]
async fn test_due_in_order_skips_backed_off_operations() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::Workout, "local-w1", json!({}))
        .await
        .unwrap();
    let op = OperationRepository::due_in_order(&storage.conn, Utc::now())
        .await
        .unwrap()
        .remove(0);

    let next_attempt = Utc::now() + Duration::minutes(5);
    let disposition =
        OperationRepository::record_failure(&storage.conn, &op, "timeout", true, next_attempt)
            .await
            .unwrap();
    assert_eq!(disposition, FailureDisposition::Scheduled(next_attempt));

    let due_now = OperationRepository::due_in_order(&storage.conn, Utc::now()).await.unwrap();
    assert!(due_now.is_empty(), "backed-off op is not due yet");

    let due_later =
        OperationRepository::due_in_order(&storage.conn, Utc::now() + Duration::minutes(6))
            .await
            .unwrap();
    assert_eq!(due_later.len(), 1);
    assert_eq!(due_later[0].retry_count, 1);
    assert_eq!(due_later[0].last_error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_retries_exhaust_into_terminal_failure() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::Workout, "local-w1", json!({}))
        .await
        .unwrap();

    for attempt in 1..=DEFAULT_MAX_RETRIES {
        let op = liftlog::operation::Entity::find()
            .one(&storage.conn)
            .await
            .unwrap()
            .unwrap();
        let disposition = OperationRepository::record_failure(
            &storage.conn,
            &op,
            "server error",
            true,
            Utc::now(),
        )
        .await
        .unwrap();
        if attempt < DEFAULT_MAX_RETRIES {
            assert!(matches!(disposition, FailureDisposition::Scheduled(_)));
        } else {
            assert_eq!(disposition, FailureDisposition::Terminal);
        }
    }

    let failed = OperationRepository::get_failed(&storage.conn).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].retry_count, DEFAULT_MAX_RETRIES);
    assert_eq!(OperationRepository::count_pending(&storage.conn).await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_retryable_failure_is_immediately_terminal() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::Workout, "local-w1", json!({}))
        .await
        .unwrap();
    let op = OperationRepository::due_in_order(&storage.conn, Utc::now())
        .await
        .unwrap()
        .remove(0);

    let disposition =
        OperationRepository::record_failure(&storage.conn, &op, "validation", false, Utc::now())
            .await
            .unwrap();
    assert_eq!(disposition, FailureDisposition::Terminal);
    assert!(OperationRepository::has_failed_create(&storage.conn, "local-w1").await.unwrap());
}

#[tokio::test]
async fn test_fail_pending_for_cascades() {
    let storage = LocalStorage::in_memory().await.unwrap();

    OperationRepository::enqueue(&storage.conn, OpType::Create, OpEntity::WorkoutSet, "local-s1", json!({}))
        .await
        .unwrap();

    let count = OperationRepository::fail_pending_for(&storage.conn, "local-s1", "parent gone")
        .await
        .unwrap();
    assert_eq!(count, 1);

    let failed = OperationRepository::get_failed(&storage.conn).await.unwrap();
    assert_eq!(failed[0].last_error.as_deref(), Some("parent gone"));
}
