use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

use crate::utils::now_utc;

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
}

pub async fn create_user(
    database: &SqlitePool,
    name: String,
    email: String,
    password: String,
) -> anyhow::Result<i64> {
    if email.trim().is_empty() || password.is_empty() {
        anyhow::bail!("Email and password are required");
    }
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    let user = sqlx::query("INSERT INTO users (name, email, password, created_at) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email.trim())
        .bind(password_hash)
        .bind(now_utc())
        .execute(database)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                anyhow::anyhow!("Email already registered")
            }
            e => e.into(),
        })?;
    Ok(user.last_insert_rowid())
}

pub async fn get_user_info(database: &SqlitePool, id: i64) -> anyhow::Result<UserInfo> {
    let user = sqlx::query_as::<_, UserInfo>("SELECT id, name, email FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(database)
        .await?;
    Ok(user)
}

pub async fn login(database: &SqlitePool, email: String, password: String) -> anyhow::Result<i64> {
    let (id, password_hash) =
        sqlx::query_as::<_, (i64, String)>("SELECT id, password FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(database)
            .await?
            .ok_or(anyhow::anyhow!("Invalid email or password"))?;
    let parsed_hash = PasswordHash::new(&password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Invalid email or password"))?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn login_checks_the_password() {
        let database = test_pool().await;
        let id = create_user(&database, "ada".into(), "ada@x.io".into(), "secret".into())
            .await
            .unwrap();
        assert_eq!(
            login(&database, "ada@x.io".into(), "secret".into()).await.unwrap(),
            id
        );
        assert!(login(&database, "ada@x.io".into(), "wrong".into()).await.is_err());
        assert!(login(&database, "nobody@x.io".into(), "secret".into()).await.is_err());
        assert_eq!(get_user_info(&database, id).await.unwrap().name, "ada");
    }

    #[tokio::test]
    async fn email_is_unique() {
        let database = test_pool().await;
        create_user(&database, "a".into(), "same@x.io".into(), "pw".into())
            .await
            .unwrap();
        let err = create_user(&database, "b".into(), " same@x.io".into(), "pw".into())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }
}
