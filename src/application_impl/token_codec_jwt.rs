use crate::application_port::*;
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AuthError::InternalError("signing secrets must not be empty".into()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(AuthError::InternalError(
                "access and refresh secrets must differ".into(),
            ));
        }
        if self.access_ttl.is_zero() || self.access_ttl >= self.refresh_ttl {
            return Err(AuthError::InternalError(
                "access ttl must be non-zero and shorter than refresh ttl".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // keeps two pairs minted in the same second distinct
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        KeyPair {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// HS256 codec with separate keys and lifetimes for access and refresh tokens.
/// Expiry is judged against the injected clock with no leeway.
pub struct JwtHs256Codec {
    issuer: String,
    audience: String,
    access: KeyPair,
    refresh: KeyPair,
    clock: Arc<dyn Clock>,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        cfg.validate()?;
        Ok(JwtHs256Codec {
            access: KeyPair::new(&cfg.access_secret, cfg.access_ttl),
            refresh: KeyPair::new(&cfg.refresh_secret, cfg.refresh_ttl),
            issuer: cfg.issuer,
            audience: cfg.audience,
            clock,
        })
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = false; // checked below against the injected clock
        v.leeway = 0;
        v.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
        v.set_audience(&[self.audience.as_str()]);
        v.set_issuer(&[self.issuer.as_str()]);
        v
    }

    fn encode(&self, user: UserId, keys: &KeyPair) -> Result<(String, DateTime<Utc>), TokenError> {
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + keys.ttl;
        let claims = Claims {
            sub: user.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, exp_dt))
    }

    fn decode(&self, token: &str, keys: &KeyPair) -> Result<TokenVerifyResult, TokenError> {
        let data = decode::<Claims>(token, &keys.decoding, &self.validation())
            .map_err(|e| TokenError::Rejected(e.to_string()))?;
        let claims = data.claims;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenError::BadSubject)?;
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::Rejected("exp out of range".to_string()))?;

        Ok(TokenVerifyResult {
            user_id,
            jti: claims.jti,
            expires_at,
        })
    }
}

impl TokenCodec for JwtHs256Codec {
    fn issue_access_token(&self, user: UserId) -> Result<(AccessToken, DateTime<Utc>), TokenError> {
        let (token, exp_dt) = self.encode(user, &self.access)?;
        Ok((AccessToken(token), exp_dt))
    }

    fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), TokenError> {
        let (token, exp_dt) = self.encode(user, &self.refresh)?;
        Ok((RefreshToken(token), exp_dt))
    }

    fn verify_access_token(&self, token: &AccessToken) -> Result<TokenVerifyResult, TokenError> {
        self.decode(&token.0, &self.access)
    }

    fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, TokenError> {
        self.decode(&token.0, &self.refresh)
    }
}
