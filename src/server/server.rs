use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub fn new(auth_service: Arc<dyn AuthService>) -> Self {
        Self {
            auth_service,
            pool: None,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher::new());
        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHs256Codec::new(settings.auth.jwt_config(), clock)?);

        let (user_repo, pool): (Arc<dyn UserRepo>, Option<Pool<MySql>>) =
            match settings.store.backend.as_str() {
                "memory" => {
                    let repo = MemoryUserRepo::new(credential_hasher);
                    for user in settings.store.seed_users.iter().cloned() {
                        let username = user.username.clone();
                        let user_id = repo.insert_user(user).await?;
                        info!(%user_id, %username, "seeded user");
                    }
                    (Arc::new(repo), None)
                }
                "mysql" => {
                    let dsn = settings
                        .store
                        .mysql_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow::anyhow!("mysql backend needs mysql_dsn"))?;
                    let pool = Pool::<MySql>::connect(dsn).await?;
                    let repo = MySqlUserRepo::new(pool.clone(), credential_hasher);
                    (Arc::new(repo), Some(pool))
                }
                other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
            };

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo,
            token_codec,
            settings.auth.store_timeout(),
        ));

        info!(backend = %settings.store.backend, "server started");

        Ok(Self { auth_service, pool })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
