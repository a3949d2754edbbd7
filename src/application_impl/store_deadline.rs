use crate::application_port::AuthError;
use std::future::Future;
use std::time::Duration;

/// Run a store call under a deadline. Elapsing surfaces as `AuthError::Timeout`
/// and is not retried.
pub(crate) async fn within<T, F>(limit: Duration, call: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| AuthError::Timeout)?
}
