//! Key-value store for sync bookkeeping, such as the last pull checkpoint.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, EntityTrait, IntoActiveModel};

use crate::entities::sync_meta;

/// Checkpoint key holding the timestamp of the last completed pull.
pub const LAST_FULL_SYNC: &str = "last_full_sync";

pub struct SyncMetaRepository;

impl SyncMetaRepository {
    pub async fn get<C>(conn: &C, key: &str) -> Result<Option<String>>
    where
        C: ConnectionTrait,
    {
        Ok(sync_meta::Entity::find_by_id(key)
            .one(conn)
            .await?
            .map(|row| row.value))
    }

    pub async fn set<C>(conn: &C, key: &str, value: &str) -> Result<()>
    where
        C: ConnectionTrait,
    {
        match sync_meta::Entity::find_by_id(key).one(conn).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.value = ActiveValue::Set(value.to_owned());
                active.updated_at = ActiveValue::Set(Utc::now());
                active.update(conn).await?;
            }
            None => {
                sync_meta::ActiveModel {
                    key: ActiveValue::Set(key.to_owned()),
                    value: ActiveValue::Set(value.to_owned()),
                    updated_at: ActiveValue::Set(Utc::now()),
                }
                .insert(conn)
                .await?;
            }
        }
        Ok(())
    }
}
