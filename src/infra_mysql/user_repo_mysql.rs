use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::sync::Arc;

const SELECT_USER: &str = r#"
SELECT user_id, username, email, full_name, avatar_url, cover_image_url,
       password_hash, refresh_token, created_at
FROM user
"#;

pub struct MySqlUserRepo {
    pool: MySqlPool,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool, credential_hasher: Arc<dyn CredentialHasher>) -> Self {
        MySqlUserRepo {
            pool,
            credential_hasher,
        }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let store_err = |e: sqlx::Error| AuthError::Store(e.to_string());

        let user_id: UserId = row.try_get("user_id").map_err(store_err)?;
        let username: String = row.try_get("username").map_err(store_err)?;
        let email: String = row.try_get("email").map_err(store_err)?;
        let full_name: String = row.try_get("full_name").map_err(store_err)?;
        let avatar_url: String = row.try_get("avatar_url").map_err(store_err)?;
        let cover_image_url: String = row.try_get("cover_image_url").map_err(store_err)?;
        let password_hash: String = row.try_get("password_hash").map_err(store_err)?;
        let refresh_token: Option<String> = row.try_get("refresh_token").map_err(store_err)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_err)?;

        Ok(UserRecord {
            user_id,
            username,
            email,
            full_name,
            avatar_url,
            cover_image_url,
            password_hash,
            refresh_token,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let sql = format!("{SELECT_USER} WHERE user_id = ?");
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("query user by id: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, AuthError> {
        let (column, value) = match lookup {
            UserLookup::Username(name) => ("username", name),
            UserLookup::Email(email) => ("email", email),
        };
        let sql = format!("{SELECT_USER} WHERE {column} = ?");
        let row_opt: Option<MySqlRow> = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("query user by {column}: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_credentials(
        &self,
        lookup: &UserLookup,
        password: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        let Some(record) = self.find_one(lookup).await? else {
            return Ok(None);
        };
        let ok = self
            .credential_hasher
            .verify_password(password, &record.password_hash)
            .await?;
        Ok(ok.then_some(record))
    }

    async fn set_refresh_token(&self, user_id: UserId, token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE user SET refresh_token = ? WHERE user_id = ?")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_swap_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new_token: &str,
    ) -> Result<bool, AuthError> {
        // refresh_token is ascii_bin, so the comparison is byte-exact.
        let result = sqlx::query(
            r#"
UPDATE user
SET refresh_token = ?
WHERE user_id = ? AND refresh_token = ?
"#,
        )
        .bind(new_token)
        .bind(user_id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), AuthError> {
        sqlx::query("UPDATE user SET refresh_token = NULL WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }
}
