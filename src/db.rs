use std::{path::Path, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

/// Open (or create) the service database and bring its schema up to date
pub async fn connect(path: impl AsRef<Path>) -> anyhow::Result<SqlitePool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    info!("Opening database {}", path.display());
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let database = SqlitePool::connect_with(options).await?;
    migrate(&database).await?;
    Ok(database)
}

pub async fn migrate(database: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(database).await?;
    Ok(())
}

/// Private in-memory database, one connection so every query sees the same data
pub async fn memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let database = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&database).await?;
    Ok(database)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    memory().await.unwrap()
}
