use crate::application_impl::JwtConfig;
use crate::domain_model::NewUser;
use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub store: Store,
}

#[derive(Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

fn default_store_timeout_ms() -> u64 {
    2_000
}

impl Auth {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            access_ttl: Duration::from_secs(self.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.refresh_ttl_secs),
            access_secret: self.access_secret.clone().into_bytes(),
            refresh_secret: self.refresh_secret.clone().into_bytes(),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "mysql"
    pub mysql_dsn: Option<String>,
    #[serde(default)]
    pub seed_users: Vec<NewUser>, // memory backend only
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "TURNSTILE";

/// Load settings from a TOML file, then apply `TURNSTILE__SECTION__KEY`
/// environment overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.check()?;
    Ok(settings)
}

impl Settings {
    fn check(&self) -> Result<()> {
        self.auth
            .jwt_config()
            .validate()
            .map_err(|e| anyhow!("auth settings: {e}"))?;
        if self.auth.store_timeout_ms == 0 {
            bail!("auth settings: store_timeout_ms must be positive");
        }
        match self.store.backend.as_str() {
            "memory" => Ok(()),
            "mysql" if self.store.mysql_dsn.is_some() => Ok(()),
            "mysql" => bail!("store settings: mysql backend needs mysql_dsn"),
            other => bail!("store settings: unknown backend {other}"),
        }
    }
}
