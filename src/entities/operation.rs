use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of mutation recorded in the offline queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    #[sea_orm(string_value = "create")]
    Create,
    #[sea_orm(string_value = "update")]
    Update,
    #[sea_orm(string_value = "delete")]
    Delete,
}

impl OpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Create => "create",
            OpType::Update => "update",
            OpType::Delete => "delete",
        }
    }
}

/// Entity kind an operation targets. The discriminants double as the
/// replay order during a drain: parents sync before their children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OpEntity {
    #[sea_orm(string_value = "exercise")]
    Exercise,
    #[sea_orm(string_value = "workout")]
    Workout,
    #[sea_orm(string_value = "workout_exercise")]
    WorkoutExercise,
    #[sea_orm(string_value = "workout_set")]
    WorkoutSet,
}

impl OpEntity {
    /// Dependency rank used to order a drain pass. Lower ranks are replayed
    /// first so parent creates resolve before child operations need them.
    pub fn rank(self) -> u8 {
        match self {
            OpEntity::Exercise => 0,
            OpEntity::Workout => 1,
            OpEntity::WorkoutExercise => 2,
            OpEntity::WorkoutSet => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpEntity::Exercise => "exercise",
            OpEntity::Workout => "workout",
            OpEntity::WorkoutExercise => "workout_exercise",
            OpEntity::WorkoutSet => "workout_set",
        }
    }
}

/// Queue state of an operation. Succeeded operations are deleted rather
/// than kept, so only pending and terminally failed rows exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// A durable record of an intended mutation, replayed against the remote
/// API when connectivity is available.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub operation_id: String,
    pub op_type: OpType,
    pub entity: OpEntity,
    #[sea_orm(indexed)]
    pub local_id: String,
    pub data: Json,
    pub enqueued_at: DateTimeUtc,
    pub retry_count: i32,
    pub max_retries: i32,
    #[sea_orm(indexed)]
    pub status: OpStatus,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
