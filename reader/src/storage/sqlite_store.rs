//! SQLite key/value backend
//!
//! One row per key in the `local_storage` table. Writes are upserts, so a
//! save always replaces the whole stored document.

use super::KeyValueStore;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

/// Key/value store persisted in the reader database
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All stored keys, sorted
    pub async fn keys(&self) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM local_storage ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(keys)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_storage WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn test_set_and_get_item() {
        let store = create_test_store().await;

        store.set_item("displayMode", "2").await.unwrap();

        let value = store.get_item("displayMode").await.unwrap();
        assert_eq!(value, Some("2".to_string()));

        // Update existing
        store.set_item("displayMode", "3").await.unwrap();

        let updated = store.get_item("displayMode").await.unwrap();
        assert_eq!(updated, Some("3".to_string()));
    }

    #[tokio::test]
    async fn test_missing_item_is_none() {
        let store = create_test_store().await;

        assert_eq!(store.get_item("notes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_item_and_keys() {
        let store = create_test_store().await;

        store.set_item("notes", "[]").await.unwrap();
        store.set_item("highlights", "[]").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["highlights", "notes"]);

        store.remove_item("notes").await.unwrap();

        assert_eq!(store.get_item("notes").await.unwrap(), None);
        assert_eq!(store.keys().await.unwrap(), vec!["highlights"]);
    }
}
