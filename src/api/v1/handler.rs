use super::cookie::*;
use super::error::*;
use crate::application_port::*;
use crate::domain_model::{Subject, UserLookup};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reply::Response;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    fn lookup(&self) -> Option<UserLookup> {
        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());
        non_empty(&self.username)
            .map(UserLookup::Username)
            .or_else(|| non_empty(&self.email).map(UserLookup::Email))
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: Subject,
    pub auth_tokens: AuthTokens,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<Response, warp::Rejection> {
    let lookup = body
        .lookup()
        .ok_or_else(|| reject::custom(ApiErrorCode::BadRequest))?;

    let login_input = LoginInput {
        lookup,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookies = session_cookies(&login_result.tokens);
    let login_response = LoginResponse {
        user: login_result.user,
        auth_tokens: login_result.tokens,
    };

    with_cookies(warp::reply::json(&ApiResponse::ok(login_response)), &cookies)
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub auth_tokens: AuthTokens,
}

/// The cookie wins over the body when both carry a token.
pub async fn refresh_token(
    cookie: Option<String>,
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<Response, warp::Rejection> {
    let presented = cookie
        .filter(|c| !c.is_empty())
        .or(body.refresh_token);

    let tokens = auth_service
        .refresh_token(presented.as_deref())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookies = session_cookies(&tokens);
    with_cookies(
        warp::reply::json(&ApiResponse::ok(RefreshResponse {
            auth_tokens: tokens,
        })),
        &cookies,
    )
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {}

pub async fn logout(
    subject: Subject,
    auth_service: Arc<dyn AuthService>,
) -> Result<Response, warp::Rejection> {
    auth_service
        .logout(subject.id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    with_cookies(
        warp::reply::json(&ApiResponse::ok(LogoutResponse {})),
        &[expired_cookie(ACCESS_COOKIE), expired_cookie(REFRESH_COOKIE)],
    )
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: Subject,
}

pub async fn current_user(subject: Subject) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(CurrentUserResponse {
        user: subject,
    })))
}

fn session_cookies(tokens: &AuthTokens) -> [String; 2] {
    [
        set_cookie(ACCESS_COOKIE, &tokens.access_token.0),
        set_cookie(REFRESH_COOKIE, &tokens.refresh_token.0),
    ]
}
