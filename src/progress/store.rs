use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use sqlx::SqlitePool;

use crate::utils::now_utc;

/// Key value persistence behind a [`super::ProgressTracker`]
pub trait ProgressStore: Send + Sync {
    fn load(&self, key: &str) -> impl Future<Output = anyhow::Result<Option<String>>> + Send;
    fn save(&self, key: &str, value: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProgressStore {
    values: Arc<DashMap<String, String>>,
}

impl MemoryProgressStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ProgressStore for MemoryProgressStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get(key))
    }
    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.insert(key, value);
        Ok(())
    }
}

/// `progress_store` table of the service database
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    database: SqlitePool,
}

impl SqliteProgressStore {
    pub fn new(database: SqlitePool) -> Self {
        Self { database }
    }
}

impl ProgressStore for SqliteProgressStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM progress_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.database)
            .await?;
        Ok(value)
    }

    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query("REPLACE INTO progress_store (key, value, update_time) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(now_utc())
            .execute(&self.database)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn sqlite_store_overwrites_by_key() {
        let store = SqliteProgressStore::new(test_pool().await);
        assert_eq!(store.load("progress_1").await.unwrap(), None);
        store.save("progress_1", "{}").await.unwrap();
        store.save("progress_1", r#"{"c":{}}"#).await.unwrap();
        store.save("progress_2", "{}").await.unwrap();
        assert_eq!(
            store.load("progress_1").await.unwrap().as_deref(),
            Some(r#"{"c":{}}"#)
        );
    }
}
