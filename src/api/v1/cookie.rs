use super::error::ApiErrorCode;
use warp::http::header::{HeaderValue, SET_COOKIE};
use warp::reply::Response;
use warp::{Reply, reject};

pub const ACCESS_COOKIE: &str = "accesstoken";
pub const REFRESH_COOKIE: &str = "refreshToken";

const ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=None";

pub fn set_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; {ATTRIBUTES}")
}

/// A cookie the browser drops immediately.
pub fn expired_cookie(name: &str) -> String {
    format!("{name}=; {ATTRIBUTES}; Max-Age=0")
}

/// Append each cookie as its own `Set-Cookie` header.
pub fn with_cookies(
    reply: impl Reply,
    cookies: &[String],
) -> Result<Response, warp::Rejection> {
    let mut response = reply.into_response();
    for cookie in cookies {
        let value = HeaderValue::from_str(cookie)
            .map_err(ApiErrorCode::internal)
            .map_err(reject::custom)?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_are_http_only_and_secure() {
        let cookie = set_cookie(ACCESS_COOKIE, "abc");
        assert!(cookie.starts_with("accesstoken=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn every_cookie_gets_its_own_header() {
        let response = with_cookies(
            warp::reply(),
            &[expired_cookie(ACCESS_COOKIE), expired_cookie(REFRESH_COOKIE)],
        )
        .unwrap();
        let values: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.to_str().unwrap().contains("Max-Age=0")));
    }
}
