use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    async fn find_one(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, AuthError>;

    /// Resolve a user and check the password. Unknown user and wrong
    /// password both yield `Ok(None)`.
    async fn find_by_credentials(
        &self,
        lookup: &UserLookup,
        password: &str,
    ) -> Result<Option<UserRecord>, AuthError>;

    /// Overwrite the stored refresh token, touching no other column.
    /// Returns `false` when no such user exists.
    async fn set_refresh_token(&self, user_id: UserId, token: &str) -> Result<bool, AuthError>;

    /// Replace the stored refresh token only if it still equals `expected`.
    /// Must be a single atomic step in the backing store.
    async fn compare_and_swap_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new_token: &str,
    ) -> Result<bool, AuthError>;

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), AuthError>;
}
