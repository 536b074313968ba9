//! Local storage module for the mirrored workout data.
//!
//! This module provides database setup and lifecycle using SeaORM for:
//! - Workouts, workout exercises and workout sets
//! - User exercises
//! - The offline operation queue
//! - Sync metadata (checkpoints)

pub mod db;

pub use db::LocalStorage;
