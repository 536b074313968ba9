//! Repository layer for database operations.
//!
//! Each repository wraps the queries for one table and is generic over
//! `ConnectionTrait`, so the same helpers work on the shared connection and
//! inside transactions.

pub mod exercise;
pub mod operation;
pub mod sync_meta;
pub mod workout;
pub mod workout_exercise;
pub mod workout_set;

pub use exercise::ExerciseRepository;
pub use operation::OperationRepository;
pub use sync_meta::SyncMetaRepository;
pub use workout::WorkoutRepository;
pub use workout_exercise::WorkoutExerciseRepository;
pub use workout_set::WorkoutSetRepository;
