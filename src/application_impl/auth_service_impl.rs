use super::credential_issuer::CredentialIssuer;
use super::store_deadline::within;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::UserRepo;
use crate::logger::*;
use constant_time_eq::constant_time_eq;
use std::sync::Arc;
use std::time::Duration;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    token_codec: Arc<dyn TokenCodec>,
    issuer: CredentialIssuer,
    store_timeout: Duration,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        token_codec: Arc<dyn TokenCodec>,
        store_timeout: Duration,
    ) -> Self {
        let issuer = CredentialIssuer::new(token_codec.clone(), user_repo.clone(), store_timeout);
        Self {
            user_repo,
            token_codec,
            issuer,
            store_timeout,
        }
    }

    #[inline]
    fn present(token: Option<&str>) -> Option<&str> {
        token.map(str::trim).filter(|t| !t.is_empty())
    }

    #[inline]
    fn same_token(stored: &str, presented: &str) -> bool {
        constant_time_eq(stored.as_bytes(), presented.as_bytes())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { lookup, password } = request;
        let lookup = lookup.normalized();

        let record = within(
            self.store_timeout,
            self.user_repo.find_by_credentials(&lookup, &password),
        )
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        let tokens = self.issuer.issue(record.user_id).await?;
        info!(user_id = %record.user_id, "user logged in");

        Ok(LoginResult {
            user: record.to_subject(),
            tokens,
        })
    }

    async fn verify_token(&self, token: Option<&str>) -> Result<Subject, AuthError> {
        let token = Self::present(token).ok_or(AuthError::MissingToken)?;

        let verified = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .map_err(|e| {
                debug!(error = %e, "access token rejected");
                AuthError::InvalidToken
            })?;

        // A deleted user looks exactly like a bad token.
        let record = within(self.store_timeout, self.user_repo.find_by_id(verified.user_id))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(record.to_subject())
    }

    async fn refresh_token(&self, refresh_token: Option<&str>) -> Result<AuthTokens, AuthError> {
        // Presented
        let presented = Self::present(refresh_token).ok_or(AuthError::MissingRefreshToken)?;

        // SignatureChecked
        let verified = self
            .token_codec
            .verify_refresh_token(&RefreshToken(presented.to_string()))
            .map_err(|e| {
                debug!(error = %e, "refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;
        let user_id = verified.user_id;

        // OwnershipChecked
        let record = within(self.store_timeout, self.user_repo.find_by_id(user_id))
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let matches = record
            .refresh_token
            .as_deref()
            .is_some_and(|stored| Self::same_token(stored, presented));
        if !matches {
            warn!(%user_id, jti = %verified.jti, "superseded refresh token presented");
            return Err(AuthError::RefreshTokenReused);
        }

        // Rotated: the swap re-checks the stored value atomically, so a
        // concurrent rotation or logout makes this attempt lose.
        let tokens = self.issuer.mint(user_id)?;
        let swapped = within(
            self.store_timeout,
            self.user_repo.compare_and_swap_refresh_token(
                user_id,
                presented,
                &tokens.refresh_token.0,
            ),
        )
        .await?;
        if !swapped {
            warn!(%user_id, jti = %verified.jti, "refresh token lost rotation race");
            return Err(AuthError::RefreshTokenReused);
        }

        info!(%user_id, "rotated refresh token");
        Ok(tokens)
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        within(self.store_timeout, self.user_repo.clear_refresh_token(user_id)).await?;
        info!(%user_id, "user logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtConfig, JwtHs256Codec, ManualClock};
    use chrono::Utc;
    use std::sync::Mutex;

    /// Single-user store whose failure modes can be switched on.
    struct ScriptedRepo {
        record: Mutex<Option<UserRecord>>,
        fail_writes: bool,
        stall: Option<Duration>,
        lose_swap: bool,
    }

    impl ScriptedRepo {
        fn new(record: Option<UserRecord>) -> Self {
            Self {
                record: Mutex::new(record),
                fail_writes: false,
                stall: None,
                lose_swap: false,
            }
        }

        async fn maybe_stall(&self) {
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
        }
    }

    #[async_trait::async_trait]
    impl UserRepo for ScriptedRepo {
        async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
            self.maybe_stall().await;
            let record = self.record.lock().unwrap().clone();
            Ok(record.filter(|r| r.user_id == user_id))
        }

        async fn find_one(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, AuthError> {
            let record = self.record.lock().unwrap().clone();
            Ok(record.filter(|r| r.matches(lookup)))
        }

        async fn find_by_credentials(
            &self,
            lookup: &UserLookup,
            password: &str,
        ) -> Result<Option<UserRecord>, AuthError> {
            let found = self.find_one(lookup).await?;
            Ok(found.filter(|r| r.password_hash == password))
        }

        async fn set_refresh_token(
            &self,
            user_id: UserId,
            token: &str,
        ) -> Result<bool, AuthError> {
            if self.fail_writes {
                return Err(AuthError::Store("connection reset".into()));
            }
            let mut guard = self.record.lock().unwrap();
            match guard.as_mut().filter(|r| r.user_id == user_id) {
                Some(record) => {
                    record.refresh_token = Some(token.to_string());
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
            if self.lose_swap {
                return Ok(false);
            }
            let mut guard = self.record.lock().unwrap();
            match guard.as_mut().filter(|r| r.user_id == user_id) {
                Some(record) if record.refresh_token.as_deref() == Some(expected) => {
                    record.refresh_token = Some(new_token.to_string());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), AuthError> {
            let mut guard = self.record.lock().unwrap();
            if let Some(record) = guard.as_mut().filter(|r| r.user_id == user_id) {
                record.refresh_token = None;
            }
            Ok(())
        }
    }

    fn record() -> UserRecord {
        UserRecord {
            user_id: UserId::new_random(),
            username: "u1".to_string(),
            email: "u1@example.com".to_string(),
            full_name: "User One".to_string(),
            avatar_url: String::new(),
            cover_image_url: String::new(),
            password_hash: "pw".to_string(),
            refresh_token: None,
            created_at: Utc::now(),
        }
    }

    fn build_service(repo: ScriptedRepo) -> (RealAuthService, Arc<ScriptedRepo>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let codec = JwtHs256Codec::new(
            JwtConfig {
                issuer: "turnstile.test".to_string(),
                audience: "test-client".to_string(),
                access_ttl: Duration::from_secs(60),
                refresh_ttl: Duration::from_secs(3600),
                access_secret: b"a".to_vec(),
                refresh_secret: b"r".to_vec(),
            },
            clock,
        )
        .unwrap();
        let repo = Arc::new(repo);
        let service = RealAuthService::new(
            repo.clone(),
            Arc::new(codec),
            Duration::from_millis(100),
        );
        (service, repo)
    }

    fn login_input() -> LoginInput {
        LoginInput {
            lookup: UserLookup::Username("U1".to_string()),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn store_failure_during_issue_is_reported_generically() {
        let mut repo = ScriptedRepo::new(Some(record()));
        repo.fail_writes = true;
        let (service, _) = build_service(repo);

        let err = service.login(login_input()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenGeneration));
    }

    #[tokio::test]
    async fn issuing_for_a_missing_user_fails_generically() {
        let (service, _) = build_service(ScriptedRepo::new(None));
        let err = service.issuer.issue(UserId::new_random()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenGeneration));
    }

    #[tokio::test]
    async fn slow_store_surfaces_as_timeout() {
        let (service, _) = build_service(ScriptedRepo::new(Some(record())));
        let tokens = service.login(login_input()).await.unwrap();

        // Every `build_service()` signs with the same keys.
        let mut slow = ScriptedRepo::new(Some(record()));
        slow.stall = Some(Duration::from_secs(2));
        let (slow_service, _) = build_service(slow);
        let err = slow_service
            .verify_token(Some(&tokens.tokens.access_token.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Timeout));
    }

    #[tokio::test]
    async fn losing_the_swap_counts_as_reuse() {
        let (service, repo) = build_service(ScriptedRepo::new(Some(record())));
        let login = service.login(login_input()).await.unwrap();

        let mut racing = ScriptedRepo::new(repo.record.lock().unwrap().clone());
        racing.lose_swap = true;
        let (racing_service, racing_repo) = build_service(racing);

        let err = racing_service
            .refresh_token(Some(&login.tokens.refresh_token.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenReused));
        assert_eq!(
            racing_repo.record.lock().unwrap().as_ref().unwrap().refresh_token,
            Some(login.tokens.refresh_token.0.clone())
        );
    }

    #[tokio::test]
    async fn blank_tokens_count_as_missing() {
        let (service, _) = build_service(ScriptedRepo::new(Some(record())));
        assert!(matches!(
            service.verify_token(Some("   ")).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            service.refresh_token(None).await,
            Err(AuthError::MissingRefreshToken)
        ));
    }
}
