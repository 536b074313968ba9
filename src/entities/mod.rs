//! SeaORM entity models for the local database.
//!
//! Every mirrored entity carries a stable `local_id`, an optional
//! `server_id` assigned on first successful sync, and sync bookkeeping
//! fields. Cross-references between entities are always expressed via
//! local ids, never server ids.

pub mod enums;
pub mod exercise;
pub mod operation;
pub mod sync_meta;
pub mod workout;
pub mod workout_exercise;
pub mod workout_set;

pub use enums::{SyncStatus, WorkoutStatus};
pub use operation::{OpEntity, OpStatus, OpType};
