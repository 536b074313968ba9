//! Liftlog - an offline-first workout logging engine
//!
//! This library provides the data layer for a workout tracking application:
//! a local SQLite mirror of server-owned entities, a durable offline
//! operation queue, and a sync engine that reconciles local mutations with
//! a remote REST backend once connectivity returns. All reads are served
//! from the local store, so the application stays responsive regardless of
//! network state.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`config`] - Application configuration management
//! * [`storage`] - Local database and data persistence
//! * [`entities`] - SeaORM entity models for database tables
//! * [`repositories`] - Repository layer for database operations
//! * [`backend`] - Remote API abstraction and HTTP implementation
//! * [`sync`] - Sync engine draining the offline operation queue
//! * [`active_workout`] - In-progress workout aggregate and mutations
//! * [`facade`] - Storage-agnostic exercise repository facade

/// In-progress workout view builder and mutation entry points
pub mod active_workout;

/// Remote backend abstraction and HTTP implementation
pub mod backend;

/// Configuration module for managing application settings
pub mod config;

/// SeaORM entity models for database tables
pub mod entities;

/// Storage-agnostic repository facade for exercises
pub mod facade;

/// Client-side identifier allocation for offline-created entities
pub mod local_id;

/// Logging setup for debugging and error tracking
pub mod logger;

/// Repository layer for database operations
pub mod repositories;

/// Local storage layer holding mirrored entities and the operation queue
pub mod storage;

/// Synchronization engine for reconciling local and remote state
pub mod sync;

// Re-export entity models for convenient access
pub use entities::{exercise, operation, workout, workout_exercise, workout_set};
pub use entities::{SyncStatus, WorkoutStatus};

pub use active_workout::{ActiveExercise, ActiveWorkout, ActiveWorkoutSession};
pub use backend::{Backend, BackendError, HttpBackend};
pub use storage::LocalStorage;
pub use sync::{SyncEngine, SyncOutcome, SyncStats};
