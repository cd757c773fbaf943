//! HTTP failure classification shared by provider clients
//!
//! Maps transport errors and non-success responses onto the common error
//! taxonomy so the retry policy can tell transient from final failures.

use moodlog_common::Error;
use reqwest::{Response, StatusCode};

/// Classify a reqwest transport error
pub fn transport_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{} request timed out: {}", provider, err))
    } else if err.is_decode() {
        Error::Provider(format!("{} returned an unreadable body: {}", provider, err))
    } else {
        Error::Network(format!("{} request failed: {}", provider, err))
    }
}

/// Classify a non-success HTTP status
///
/// - 401/403: bad credentials (final)
/// - 408: timeout (retryable)
/// - 429 and 5xx: server-side trouble (retryable)
/// - other 4xx: request rejected (final)
pub fn status_error(provider: &str, status: StatusCode, body: String) -> Error {
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Provider(format!(
            "{} rejected credentials ({}): {}",
            provider,
            status.as_u16(),
            message
        )),
        StatusCode::REQUEST_TIMEOUT => {
            Error::Timeout(format!("{} timed out: {}", provider, message))
        }
        StatusCode::TOO_MANY_REQUESTS => Error::Server {
            status: status.as_u16(),
            message,
        },
        s if s.is_server_error() => Error::Server {
            status: s.as_u16(),
            message,
        },
        s => Error::Provider(format!(
            "{} rejected request ({}): {}",
            provider,
            s.as_u16(),
            message
        )),
    }
}

/// Pass a successful response through, or classify the failure
pub async fn ensure_success(provider: &str, response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(provider, status, body))
}
