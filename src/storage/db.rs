use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};

use crate::entities::{exercise, operation, sync_meta, workout, workout_exercise, workout_set};

/// Local storage manager for the mirrored workout data.
///
/// Owns the database connection; every compound operation (entity write plus
/// queue enqueue, cascade deletes) goes through a transaction begun on
/// [`LocalStorage::conn`], so a concurrent reader sees the action fully
/// applied or not at all.
pub struct LocalStorage {
    pub conn: DatabaseConnection,
}

impl LocalStorage {
    /// Initialize local storage against the given `SQLite` database URL.
    pub async fn new(database_url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options.max_connections(4).sqlx_logging(false);

        // In-memory databases live only as long as their connection, so the
        // pool must be pinned to a single connection.
        if database_url.contains("memory") {
            options.max_connections(1).min_connections(1);
        }

        let conn = Database::connect(options).await?;

        let storage = LocalStorage { conn };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize an in-memory database, used by tests and ephemeral runs.
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Create tables and secondary indexes from the entity definitions.
    async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(DbBackend::Sqlite);

        macro_rules! create_table {
            ($entity:expr) => {{
                let mut stmt = schema.create_table_from_entity($entity);
                stmt.if_not_exists();
                self.conn.execute(backend.build(&stmt)).await?;
                for mut index in schema.create_index_from_entity($entity) {
                    index.if_not_exists();
                    self.conn.execute(backend.build(&index)).await?;
                }
            }};
        }

        create_table!(exercise::Entity);
        create_table!(workout::Entity);
        create_table!(workout_exercise::Entity);
        create_table!(workout_set::Entity);
        create_table!(operation::Entity);
        create_table!(sync_meta::Entity);

        Ok(())
    }

    /// Check whether the database holds any workout data.
    pub async fn has_data(&self) -> Result<bool> {
        use sea_orm::{EntityTrait, PaginatorTrait};
        let count = workout::Entity::find().count(&self.conn).await?;
        Ok(count > 0)
    }

    /// Clear all data, used on sign-out.
    pub async fn clear_all_data(&self) -> Result<()> {
        use sea_orm::EntityTrait;
        workout_set::Entity::delete_many().exec(&self.conn).await?;
        workout_exercise::Entity::delete_many().exec(&self.conn).await?;
        workout::Entity::delete_many().exec(&self.conn).await?;
        exercise::Entity::delete_many().exec(&self.conn).await?;
        operation::Entity::delete_many().exec(&self.conn).await?;
        sync_meta::Entity::delete_many().exec(&self.conn).await?;
        Ok(())
    }
}
