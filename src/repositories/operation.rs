//! Offline operation queue.
//!
//! Mutations performed against the local store are recorded here in the
//! same transaction as the entity write, so the queue and the store never
//! diverge on crash. The sync engine drains the queue in dependency order
//! once connectivity is available.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder,
};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::entities::operation::{self, OpEntity, OpStatus, OpType};

/// Retry budget for a freshly enqueued operation.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// What `enqueue` did with the requested operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new queue row was appended.
    Queued,
    /// The payload was folded into an already-pending operation for the
    /// same entity instance.
    Merged,
}

/// Terminal-or-retry decision taken for a failed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The operation stays pending and becomes due again at the given time.
    Scheduled(DateTime<Utc>),
    /// Retries are exhausted or the error is not retryable.
    Terminal,
}

/// Repository for the offline operation queue.
pub struct OperationRepository;

impl OperationRepository {
    /// Find the single pending operation for an entity instance, if any.
    /// Coalescing keeps at most one pending row per (entity, local id).
    async fn get_pending_for<C>(
        conn: &C,
        entity: OpEntity,
        local_id: &str,
    ) -> Result<Option<operation::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(operation::Entity::find()
            .filter(operation::Column::Entity.eq(entity))
            .filter(operation::Column::LocalId.eq(local_id))
            .filter(operation::Column::Status.eq(OpStatus::Pending))
            .one(conn)
            .await?)
    }

    /// Append an operation, coalescing with an already-pending one:
    /// an update folds its payload into a pending create or update, and a
    /// delete replaces a pending update. Callers must run this in the same
    /// transaction as the entity write it records.
    pub async fn enqueue<C>(
        conn: &C,
        op_type: OpType,
        entity: OpEntity,
        local_id: &str,
        data: Json,
    ) -> Result<EnqueueOutcome>
    where
        C: ConnectionTrait,
    {
        let existing = Self::get_pending_for(conn, entity, local_id).await?;

        match (op_type, existing) {
            (OpType::Update, Some(existing))
                if matches!(existing.op_type, OpType::Create | OpType::Update) =>
            {
                let merged = merge_payload(existing.data.clone(), &data);
                let mut active = existing.into_active_model();
                active.data = ActiveValue::Set(merged);
                active.enqueued_at = ActiveValue::Set(Utc::now());
                active.update(conn).await?;
                Ok(EnqueueOutcome::Merged)
            }
            (OpType::Create, Some(existing)) if existing.op_type == OpType::Create => {
                let merged = merge_payload(existing.data.clone(), &data);
                let mut active = existing.into_active_model();
                active.data = ActiveValue::Set(merged);
                active.update(conn).await?;
                Ok(EnqueueOutcome::Merged)
            }
            (OpType::Delete, Some(existing)) => {
                // A pending create should have been cancelled by the caller
                // before queueing a delete; a pending update is subsumed.
                operation::Entity::delete_by_id(existing.id).exec(conn).await?;
                Self::insert(conn, op_type, entity, local_id, data).await?;
                Ok(EnqueueOutcome::Queued)
            }
            _ => {
                Self::insert(conn, op_type, entity, local_id, data).await?;
                Ok(EnqueueOutcome::Queued)
            }
        }
    }

    async fn insert<C>(
        conn: &C,
        op_type: OpType,
        entity: OpEntity,
        local_id: &str,
        data: Json,
    ) -> Result<()>
    where
        C: ConnectionTrait,
    {
        operation::ActiveModel {
            id: ActiveValue::NotSet,
            operation_id: ActiveValue::Set(Uuid::new_v4().to_string()),
            op_type: ActiveValue::Set(op_type),
            entity: ActiveValue::Set(entity),
            local_id: ActiveValue::Set(local_id.to_owned()),
            data: ActiveValue::Set(data),
            enqueued_at: ActiveValue::Set(Utc::now()),
            retry_count: ActiveValue::Set(0),
            max_retries: ActiveValue::Set(DEFAULT_MAX_RETRIES),
            status: ActiveValue::Set(OpStatus::Pending),
            last_error: ActiveValue::Set(None),
            next_attempt_at: ActiveValue::Set(None),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    /// Remove every queued operation for an entity instance. Returns true
    /// if a pending create was among them, meaning the entity never reached
    /// the server and can be purged locally with no remote call.
    pub async fn cancel_for<C>(conn: &C, entity: OpEntity, local_id: &str) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        let ops = operation::Entity::find()
            .filter(operation::Column::Entity.eq(entity))
            .filter(operation::Column::LocalId.eq(local_id))
            .all(conn)
            .await?;

        let had_pending_create = ops
            .iter()
            .any(|op| op.op_type == OpType::Create && op.status == OpStatus::Pending);

        operation::Entity::delete_many()
            .filter(operation::Column::Entity.eq(entity))
            .filter(operation::Column::LocalId.eq(local_id))
            .exec(conn)
            .await?;

        Ok(had_pending_create)
    }

    /// Pending operations that are due now, in replay order: creates and
    /// updates go parents before children (dependency rank) so references
    /// resolve, deletes go children before parents so no remote row is
    /// removed while rows still point at it. Enqueue order breaks ties.
    pub async fn due_in_order<C>(conn: &C, now: DateTime<Utc>) -> Result<Vec<operation::Model>>
    where
        C: ConnectionTrait,
    {
        let mut ops = operation::Entity::find()
            .filter(operation::Column::Status.eq(OpStatus::Pending))
            .order_by_asc(operation::Column::Id)
            .all(conn)
            .await?;

        ops.retain(|op| op.next_attempt_at.map_or(true, |at| at <= now));
        // Stable sort keeps enqueue order within each rank.
        ops.sort_by_key(|op| match op.op_type {
            OpType::Delete => OpEntity::WorkoutSet.rank() - op.entity.rank(),
            _ => op.entity.rank(),
        });
        Ok(ops)
    }

    /// Count of operations still waiting to be pushed.
    pub async fn count_pending<C>(conn: &C) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        use sea_orm::PaginatorTrait;
        Ok(operation::Entity::find()
            .filter(operation::Column::Status.eq(OpStatus::Pending))
            .count(conn)
            .await?)
    }

    /// Terminally failed operations, surfaced to the user for manual
    /// resolution.
    pub async fn get_failed<C>(conn: &C) -> Result<Vec<operation::Model>>
    where
        C: ConnectionTrait,
    {
        Ok(operation::Entity::find()
            .filter(operation::Column::Status.eq(OpStatus::Failed))
            .order_by_asc(operation::Column::Id)
            .all(conn)
            .await?)
    }

    /// Remove an operation whose remote effect is confirmed applied.
    pub async fn mark_succeeded<C>(conn: &C, id: i32) -> Result<()>
    where
        C: ConnectionTrait,
    {
        operation::Entity::delete_by_id(id).exec(conn).await?;
        Ok(())
    }

    /// Record a failed attempt. Retryable errors reschedule the operation
    /// for `next_attempt` until the retry budget runs out; everything else
    /// parks it in the terminal failed state.
    pub async fn record_failure<C>(
        conn: &C,
        op: &operation::Model,
        error: &str,
        retryable: bool,
        next_attempt: DateTime<Utc>,
    ) -> Result<FailureDisposition>
    where
        C: ConnectionTrait,
    {
        let attempts = op.retry_count + 1;
        let terminal = !retryable || attempts >= op.max_retries;

        let mut active = op.clone().into_active_model();
        active.retry_count = ActiveValue::Set(attempts);
        active.last_error = ActiveValue::Set(Some(error.to_owned()));
        if terminal {
            active.status = ActiveValue::Set(OpStatus::Failed);
            active.next_attempt_at = ActiveValue::Set(None);
        } else {
            active.next_attempt_at = ActiveValue::Set(Some(next_attempt));
        }
        active.update(conn).await?;

        if terminal {
            Ok(FailureDisposition::Terminal)
        } else {
            Ok(FailureDisposition::Scheduled(next_attempt))
        }
    }

    /// Fail every still-pending operation for an entity instance. Used when
    /// its create fails terminally: dependents must not be sent with a
    /// dangling reference.
    pub async fn fail_pending_for<C>(conn: &C, local_id: &str, error: &str) -> Result<u64>
    where
        C: ConnectionTrait,
    {
        let ops = operation::Entity::find()
            .filter(operation::Column::LocalId.eq(local_id))
            .filter(operation::Column::Status.eq(OpStatus::Pending))
            .all(conn)
            .await?;

        let count = ops.len() as u64;
        for op in ops {
            let mut active = op.into_active_model();
            active.status = ActiveValue::Set(OpStatus::Failed);
            active.last_error = ActiveValue::Set(Some(error.to_owned()));
            active.next_attempt_at = ActiveValue::Set(None);
            active.update(conn).await?;
        }
        Ok(count)
    }

    /// Whether the create for an entity instance has terminally failed.
    pub async fn has_failed_create<C>(conn: &C, local_id: &str) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        Ok(operation::Entity::find()
            .filter(operation::Column::LocalId.eq(local_id))
            .filter(operation::Column::OpType.eq(OpType::Create))
            .filter(operation::Column::Status.eq(OpStatus::Failed))
            .one(conn)
            .await?
            .is_some())
    }
}

/// Shallow merge of two JSON object payloads; the patch wins per key.
fn merge_payload(mut base: Json, patch: &Json) -> Json {
    match (base.as_object_mut(), patch.as_object()) {
        (Some(base_map), Some(patch_map)) => {
            for (key, value) in patch_map {
                base_map.insert(key.clone(), value.clone());
            }
            base
        }
        _ => patch.clone(),
    }
}
