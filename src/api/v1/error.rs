use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::InvalidHeader>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
    {
        ApiErrorCode::BadRequest
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        ApiErrorCode::PayloadTooLarge
    } else {
        ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing refresh token")]
    MissingRefreshToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("refresh token expired or reused")]
    RefreshTokenReused,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Malformed request")]
    BadRequest,
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Token generation failed")]
    TokenGeneration,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::MissingToken
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::MissingRefreshToken
            | ApiErrorCode::InvalidRefreshToken
            | ApiErrorCode::RefreshTokenReused
            | ApiErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::TokenGeneration | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingToken => ApiErrorCode::MissingToken,
            // A vanished user never surfaces as such.
            AuthError::InvalidToken | AuthError::UserNotFound => ApiErrorCode::InvalidToken,
            AuthError::MissingRefreshToken => ApiErrorCode::MissingRefreshToken,
            AuthError::InvalidRefreshToken => ApiErrorCode::InvalidRefreshToken,
            AuthError::RefreshTokenReused => ApiErrorCode::RefreshTokenReused,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::TokenGeneration => ApiErrorCode::TokenGeneration,
            e @ (AuthError::Timeout | AuthError::Store(_) | AuthError::InternalError(_)) => {
                ApiErrorCode::internal(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_family_maps_to_401() {
        for error in [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::UserNotFound,
            AuthError::MissingRefreshToken,
            AuthError::InvalidRefreshToken,
            AuthError::RefreshTokenReused,
            AuthError::InvalidCredentials,
        ] {
            assert_eq!(ApiErrorCode::from(error).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn user_not_found_is_indistinguishable_from_bad_token() {
        let code = ApiErrorCode::from(AuthError::UserNotFound);
        assert_eq!(code.to_string(), "invalid token");
    }

    #[test]
    fn internal_causes_stay_out_of_the_message() {
        let code = ApiErrorCode::from(AuthError::Store("mysql at 10.0.0.3 refused".into()));
        assert_eq!(code.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code.to_string(), "Internal error");

        let code = ApiErrorCode::from(AuthError::Timeout);
        assert_eq!(code.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oversized_payload_rejection_is_413() {
        let reply = recover_error(reject::custom(ApiErrorCode::PayloadTooLarge))
            .await
            .unwrap();
        let response = warp::Reply::into_response(reply);
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
