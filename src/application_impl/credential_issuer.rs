use super::store_deadline::within;
use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::UserRepo;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;

/// Mints access/refresh pairs and records the refresh token on the user.
pub struct CredentialIssuer {
    token_codec: Arc<dyn TokenCodec>,
    user_repo: Arc<dyn UserRepo>,
    store_timeout: Duration,
}

impl CredentialIssuer {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        user_repo: Arc<dyn UserRepo>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            token_codec,
            user_repo,
            store_timeout,
        }
    }

    /// Sign a fresh pair without touching the store.
    pub fn mint(&self, user_id: UserId) -> Result<AuthTokens, AuthError> {
        let (access_token, access_exp) =
            self.token_codec.issue_access_token(user_id).map_err(|e| {
                error!(%user_id, error = %e, "signing access token failed");
                AuthError::TokenGeneration
            })?;
        let (refresh_token, refresh_exp) =
            self.token_codec.issue_refresh_token(user_id).map_err(|e| {
                error!(%user_id, error = %e, "signing refresh token failed");
                AuthError::TokenGeneration
            })?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Mint a pair and make its refresh token the only valid one for the user.
    /// Any failure, including an unknown user, is reported as `TokenGeneration`.
    pub async fn issue(&self, user_id: UserId) -> Result<AuthTokens, AuthError> {
        let tokens = self.mint(user_id)?;

        let saved = within(
            self.store_timeout,
            self.user_repo
                .set_refresh_token(user_id, &tokens.refresh_token.0),
        )
        .await
        .and_then(|found| if found { Ok(()) } else { Err(AuthError::UserNotFound) });

        match saved {
            Ok(()) => {
                info!(%user_id, "issued credential pair");
                Ok(tokens)
            }
            Err(e) => {
                error!(%user_id, error = %e, "persisting refresh token failed");
                Err(AuthError::TokenGeneration)
            }
        }
    }
}
