#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use turnstile::application_impl::*;
use turnstile::application_port::*;
use turnstile::domain_model::*;
use turnstile::infra_memory::MemoryUserRepo;

pub const ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TTL: Duration = Duration::from_secs(10 * 24 * 60 * 60);
pub const PASSWORD: &str = "correct horse battery";

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        issuer: "turnstile.test".to_string(),
        audience: "test-client".to_string(),
        access_ttl: ACCESS_TTL,
        refresh_ttl: REFRESH_TTL,
        access_secret: b"test-access-secret".to_vec(),
        refresh_secret: b"test-refresh-secret".to_vec(),
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub repo: Arc<MemoryUserRepo>,
    pub codec: Arc<JwtHs256Codec>,
    pub service: Arc<RealAuthService>,
    pub user_id: UserId,
}

impl Harness {
    /// One seeded user, "u1", with a cheap argon2 configuration.
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let hasher = Argon2PasswordHasher::with_params(1024, 1, 1).expect("argon2 params");
        let repo = Arc::new(MemoryUserRepo::new(Arc::new(hasher)));
        let user_id = repo
            .insert_user(NewUser {
                username: "u1".to_string(),
                email: "u1@example.com".to_string(),
                full_name: "User One".to_string(),
                avatar_url: "https://media.example.com/u1.png".to_string(),
                cover_image_url: String::new(),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("seed user");

        let codec = Arc::new(JwtHs256Codec::new(jwt_config(), clock.clone()).expect("codec"));
        let service = Arc::new(RealAuthService::new(
            repo.clone(),
            codec.clone(),
            Duration::from_secs(2),
        ));

        Harness {
            clock,
            repo,
            codec,
            service,
            user_id,
        }
    }

    pub async fn login(&self) -> AuthTokens {
        self.service
            .login(LoginInput {
                lookup: UserLookup::Username("u1".to_string()),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("login")
            .tokens
    }

    pub fn advance(&self, by: Duration) {
        self.clock
            .advance(ChronoDuration::from_std(by).expect("duration in range"));
    }
}
