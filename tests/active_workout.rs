mod common;

use common::{memory_storage, USER};

use liftlog::active_workout::{ActiveWorkoutSession, UpdateSetInput};
use liftlog::entities::operation::{OpEntity, OpType};
use liftlog::entities::WorkoutStatus;
use liftlog::repositories::OperationRepository;

#[tokio::test]
async fn test_start_workout_is_visible_immediately() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage.clone(), USER);

    let active = session.start_workout("Leg Day", None).await.unwrap();
    assert_eq!(active.workout.name, "Leg Day");
    assert_eq!(active.workout.status, WorkoutStatus::InProgress);
    assert!(active.workout.needs_sync, "new workout awaits sync");
    assert!(active.exercises.is_empty());

    // The mutation also queued a create without any network involvement.
    let guard = storage.lock().await;
    assert_eq!(OperationRepository::count_pending(&guard.conn).await.unwrap(), 1);
}

#[tokio::test]
async fn test_second_start_fails_while_one_in_progress() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);

    session.start_workout("Leg Day", None).await.unwrap();
    assert!(session.start_workout("Push Day", None).await.is_err());
}

#[tokio::test]
async fn test_add_exercise_assigns_order_indexes() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);
    session.start_workout("Leg Day", None).await.unwrap();

    let first = session.add_exercise("lib-back-squat", None).await.unwrap();
    let second = session.add_exercise("lib-leg-press", None).await.unwrap();
    assert_eq!(first.order_index, 0);
    assert_eq!(second.order_index, 1);

    let active = session.current().expect("aggregate published");
    assert_eq!(active.exercises.len(), 2);
    assert_eq!(active.exercises[0].entry.local_id, first.local_id);
}

#[tokio::test]
async fn test_set_numbers_are_one_based_and_contiguous() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);
    session.start_workout("Leg Day", None).await.unwrap();
    let entry = session.add_exercise("lib-back-squat", None).await.unwrap();

    let s1 = session.add_set(&entry.local_id, 100.0, 5, None).await.unwrap();
    let s2 = session.add_set(&entry.local_id, 100.0, 5, Some(8.0)).await.unwrap();
    let s3 = session.add_set(&entry.local_id, 102.5, 3, None).await.unwrap();
    assert_eq!((s1.set_number, s2.set_number, s3.set_number), (1, 2, 3));

    // Deleting the middle set renumbers the one after it.
    session.delete_set(&s2.local_id).await.unwrap();
    let active = session.current().unwrap();
    let numbers: Vec<i32> = active.exercises[0].sets.iter().map(|s| s.set_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(active.exercises[0].sets[1].local_id, s3.local_id);
}

#[tokio::test]
async fn test_update_set_stamps_completion() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);
    session.start_workout("Leg Day", None).await.unwrap();
    let entry = session.add_exercise("lib-back-squat", None).await.unwrap();
    let set = session.add_set(&entry.local_id, 100.0, 5, None).await.unwrap();

    let updated = session
        .update_set(
            &set.local_id,
            UpdateSetInput {
                reps: Some(6),
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.reps, 6);
    assert!(updated.completed);
    assert!(updated.completed_at.is_some());

    let reopened = session
        .update_set(
            &set.local_id,
            UpdateSetInput {
                completed: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(reopened.completed_at.is_none());
}

#[tokio::test]
async fn test_remove_exercise_cascades_and_renumbers() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage.clone(), USER);
    session.start_workout("Leg Day", None).await.unwrap();

    let first = session.add_exercise("lib-back-squat", None).await.unwrap();
    let second = session.add_exercise("lib-leg-press", None).await.unwrap();
    session.add_set(&first.local_id, 100.0, 5, None).await.unwrap();

    session.remove_exercise(&first.local_id).await.unwrap();

    let active = session.current().unwrap();
    assert_eq!(active.exercises.len(), 1);
    assert_eq!(active.exercises[0].entry.local_id, second.local_id);
    assert_eq!(active.exercises[0].entry.order_index, 0, "gap closed");

    // Never-synced children leave no delete behind in the queue.
    let guard = storage.lock().await;
    let due = OperationRepository::due_in_order(&guard.conn, chrono::Utc::now()).await.unwrap();
    assert!(!due
        .iter()
        .any(|op| op.op_type == OpType::Delete),
        "deletes of never-synced records are purged locally");
    assert!(!due
        .iter()
        .any(|op| op.entity == OpEntity::WorkoutSet),
        "the set's queued create was cancelled");
}

#[tokio::test]
async fn test_reorder_exercises_persists_new_order() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);
    session.start_workout("Leg Day", None).await.unwrap();

    let a = session.add_exercise("lib-back-squat", None).await.unwrap();
    let b = session.add_exercise("lib-leg-press", None).await.unwrap();
    let c = session.add_exercise("lib-leg-curl", None).await.unwrap();

    session
        .reorder_exercises(&[c.local_id.clone(), a.local_id.clone(), b.local_id.clone()])
        .await
        .unwrap();

    let active = session.current().unwrap();
    let order: Vec<&str> = active
        .exercises
        .iter()
        .map(|e| e.entry.local_id.as_str())
        .collect();
    assert_eq!(order, vec![c.local_id.as_str(), a.local_id.as_str(), b.local_id.as_str()]);

    // A list that does not cover the entries is rejected.
    assert!(session.reorder_exercises(&[a.local_id.clone()]).await.is_err());
}

#[tokio::test]
async fn test_complete_workout_clears_session() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);
    session.start_workout("Leg Day", None).await.unwrap();

    let done = session.complete_workout().await.unwrap();
    assert_eq!(done.status, WorkoutStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(session.current().is_none());
    assert!(session.complete_workout().await.is_err(), "nothing left to complete");
}

#[tokio::test]
async fn test_discard_workout_purges_everything() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage.clone(), USER);
    session.start_workout("Leg Day", None).await.unwrap();
    let entry = session.add_exercise("lib-back-squat", None).await.unwrap();
    session.add_set(&entry.local_id, 100.0, 5, None).await.unwrap();

    session.discard_workout().await.unwrap();
    assert!(session.current().is_none());

    let guard = storage.lock().await;
    assert!(!guard.has_data().await.unwrap());
    // Everything was local-only, so the queue drained to nothing.
    assert_eq!(OperationRepository::count_pending(&guard.conn).await.unwrap(), 0);
}

#[tokio::test]
async fn test_watch_channel_publishes_updates() {
    let storage = memory_storage().await;
    let session = ActiveWorkoutSession::new(storage, USER);
    let mut rx = session.subscribe();
    assert!(rx.borrow().is_none());

    session.start_workout("Leg Day", None).await.unwrap();
    assert!(rx.has_changed().unwrap());
    let name = rx.borrow_and_update().as_ref().map(|w| w.workout.name.clone());
    assert_eq!(name.as_deref(), Some("Leg Day"));

    session.complete_workout().await.unwrap();
    assert!(rx.borrow_and_update().is_none());
}
