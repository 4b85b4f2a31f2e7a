// db/userdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::usermodel::{NewUser, User, UserProfileUpdate};

pub(crate) const USER_COLUMNS: &str = "id, name, email, password, role, phone, avatar_url, skills, \
     experience, location, hourly_rate, created_at, updated_at";

#[async_trait]
pub trait UserExt: Send + Sync {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    async fn save_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: UserProfileUpdate,
    ) -> Result<User, StoreError>;

    async fn touch_user(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE id = $1",
                USER_COLUMNS
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE email = $1",
                USER_COLUMNS
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password, role, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.name)
        .bind(user.email)
        .bind(user.password)
        .bind(user.role)
        .bind(user.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: UserProfileUpdate,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                avatar_url = COALESCE($3, avatar_url),
                skills = COALESCE($4, skills),
                experience = COALESCE($5, experience),
                location = COALESCE($6, location),
                hourly_rate = COALESCE($7, hourly_rate),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(update.name)
        .bind(update.avatar_url)
        .bind(update.skills)
        .bind(update.experience)
        .bind(update.location)
        .bind(update.hourly_rate)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("users", user_id))
    }

    async fn touch_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
