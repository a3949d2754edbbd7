use super::cookie::{ACCESS_COOKIE, REFRESH_COOKIE};
use super::error::*;
use super::handler::{self, RefreshRequest};
use crate::application_port::AuthService;
use crate::domain_model::Subject;
use crate::server::*;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::pin;
use std::sync::Arc;
use warp::hyper::body::Buf;
use warp::{Filter, http, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::path!("users" / "login")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh_token = warp::path!("users" / "refresh-token")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_COOKIE))
        .and(optional_refresh_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh_token);

    let logout = warp::path!("users" / "logout")
        .and(warp::post())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let current_user = warp::path!("users" / "current-user")
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and_then(handler::current_user);

    login.or(refresh_token).or(logout).or(current_user)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Access gate: resolves the caller from the `accesstoken` cookie or a
/// bearer header, cookie first.
fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (Subject,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(ACCESS_COOKIE)
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_str(),
        ))
        .and_then(move |cookie: Option<String>, header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let token = cookie.filter(|c| !c.is_empty()).or_else(|| {
                    header.and_then(|h| h.strip_prefix("Bearer ").map(str::to_string))
                });
                let subject = auth_service
                    .verify_token(token.as_deref())
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok::<_, warp::Rejection>(subject)
            }
        })
}

/// The refresh body is optional; browsers usually send only the cookie.
/// A declared length over the cap is refused before any body is read.
fn optional_refresh_body() -> impl Filter<Extract = (RefreshRequest,), Error = warp::Rejection> + Clone
{
    warp::header::optional::<u64>(http::header::CONTENT_LENGTH.as_str())
        .and(warp::body::stream())
        .and_then(|declared: Option<u64>, body| async move {
            if declared.is_some_and(|len| len > MAX_BODY_BYTES) {
                return Err(reject::custom(ApiErrorCode::PayloadTooLarge));
            }
            let body = read_capped(body, MAX_BODY_BYTES).await?;
            if body.iter().all(u8::is_ascii_whitespace) {
                return Ok(RefreshRequest::default());
            }
            serde_json::from_slice::<RefreshRequest>(&body)
                .map_err(|_| reject::custom(ApiErrorCode::BadRequest))
        })
}

/// Collects a body stream, giving up as soon as it grows past `limit`.
async fn read_capped<S, B>(body: S, limit: u64) -> Result<Vec<u8>, warp::Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let mut body = pin!(body);
    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|_| reject::custom(ApiErrorCode::BadRequest))?;
        if (collected.len() + chunk.remaining()) as u64 > limit {
            return Err(reject::custom(ApiErrorCode::PayloadTooLarge));
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            let n = part.len();
            collected.extend_from_slice(part);
            chunk.advance(n);
        }
    }
    Ok(collected)
}
