use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local user store. Each update runs under the entry's shard lock,
/// which makes the refresh-token swap atomic.
pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl MemoryUserRepo {
    pub fn new(credential_hasher: Arc<dyn CredentialHasher>) -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
            credential_hasher,
        }
    }

    /// Add a user with a freshly hashed password.
    pub async fn insert_user(&self, new_user: NewUser) -> Result<UserId, AuthError> {
        let username = new_user.username.trim().to_lowercase();
        let email = new_user.email.trim().to_string();
        let taken = self.users.iter().any(|entry| {
            let existing = entry.value();
            existing.username == username || existing.email == email
        });
        if taken {
            return Err(AuthError::Store(format!(
                "user {username} or email {email} already exists"
            )));
        }

        let password_hash = self
            .credential_hasher
            .hash_password(&new_user.password)
            .await?;
        let user_id = UserId::new_random();
        self.users.insert(
            user_id,
            UserRecord {
                user_id,
                username,
                email,
                full_name: new_user.full_name,
                avatar_url: new_user.avatar_url,
                cover_image_url: new_user.cover_image_url,
                password_hash,
                refresh_token: None,
                created_at: Utc::now(),
            },
        );
        Ok(user_id)
    }

    pub fn remove_user(&self, user_id: UserId) -> bool {
        self.users.remove(&user_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().matches(lookup))
            .map(|entry| entry.value().clone()))
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
        match self.users.get_mut(&user_id) {
            Some(mut entry) => {
                entry.refresh_token = Some(token.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn compare_and_swap_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new_token: &str,
    ) -> Result<bool, AuthError> {
        let Some(mut entry) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if entry.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        entry.refresh_token = Some(new_token.to_string());
        Ok(true)
    }

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), AuthError> {
        if let Some(mut entry) = self.users.get_mut(&user_id) {
            entry.refresh_token = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::Argon2PasswordHasher;

    fn repo() -> MemoryUserRepo {
        let hasher = Argon2PasswordHasher::with_params(1024, 1, 1).unwrap();
        MemoryUserRepo::new(Arc::new(hasher))
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username.to_lowercase()),
            full_name: "Test User".to_string(),
            avatar_url: String::new(),
            cover_image_url: String::new(),
            password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn credentials_resolve_by_username_or_email() {
        let repo = repo();
        let id = repo.insert_user(new_user("Alice")).await.unwrap();

        let by_name = repo
            .find_by_credentials(&UserLookup::Username("alice".into()), "hunter22")
            .await
            .unwrap();
        assert_eq!(by_name.map(|r| r.user_id), Some(id));

        let by_email = repo
            .find_by_credentials(&UserLookup::Email("alice@example.com".into()), "hunter22")
            .await
            .unwrap();
        assert_eq!(by_email.map(|r| r.user_id), Some(id));

        let wrong = repo
            .find_by_credentials(&UserLookup::Username("alice".into()), "nope")
            .await
            .unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn duplicate_usernames_are_refused() {
        let repo = repo();
        repo.insert_user(new_user("bob")).await.unwrap();
        assert!(repo.insert_user(new_user("BOB")).await.is_err());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn swap_only_applies_to_the_expected_value() {
        let repo = repo();
        let id = repo.insert_user(new_user("carol")).await.unwrap();

        assert!(repo.set_refresh_token(id, "r1").await.unwrap());
        assert!(!repo.compare_and_swap_refresh_token(id, "r0", "r2").await.unwrap());
        assert!(repo.compare_and_swap_refresh_token(id, "r1", "r2").await.unwrap());
        assert!(!repo.compare_and_swap_refresh_token(id, "r1", "r3").await.unwrap());

        let stored = repo.find_by_id(id).await.unwrap().unwrap().refresh_token;
        assert_eq!(stored.as_deref(), Some("r2"));

        repo.clear_refresh_token(id).await.unwrap();
        assert!(!repo.compare_and_swap_refresh_token(id, "r2", "r3").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_user_writes_report_absence() {
        let repo = repo();
        let ghost = UserId::new_random();
        assert!(!repo.set_refresh_token(ghost, "r1").await.unwrap());
        assert!(!repo.compare_and_swap_refresh_token(ghost, "r1", "r2").await.unwrap());
        repo.clear_refresh_token(ghost).await.unwrap();
    }
}
