//! User repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::UserStore;
use crate::models::user::{CreateUserRequest, User, UserNotionToken};
use crate::utils::errors::Result;

const USER_COLUMNS: &str = "id, tg_id, tg_username, name, photo_url, timezone, default_database_id, \
     notion_connected, calendar_token, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE tg_id = $1", USER_COLUMNS))
            .bind(tg_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(tg_username) = LOWER($1) LIMIT 1",
            USER_COLUMNS
        ))
        .bind(username.trim_start_matches('@'))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (tg_id, tg_username, name, photo_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(request.tg_id)
        .bind(request.tg_username)
        .bind(request.name)
        .bind(request.photo_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, name: &str, tg_username: Option<&str>) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, tg_username = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(tg_username)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_notion_token(&self, user_id: Uuid) -> Result<Option<UserNotionToken>> {
        let token = sqlx::query_as::<_, UserNotionToken>(
            r#"
            SELECT user_id, access_token_enc, workspace_id, workspace_name, created_at, updated_at
            FROM user_notion_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn list_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}
