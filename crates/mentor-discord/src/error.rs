use std::time::Duration;

use thiserror::Error;

/// Fallback wait when the platform reports a rate limit without a
/// usable retry-after value.
const RATE_LIMIT_FALLBACK_SECS: u64 = 5;

/// Failure contract of the platform adapter. Retry policy lives above the
/// adapter — nothing in this crate retries on the caller's behalf.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("missing permission")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

impl From<serenity::Error> for PlatformError {
    fn from(err: serenity::Error) -> Self {
        match err {
            serenity::Error::Http(http_err) => match http_err {
                serenity::http::HttpError::UnsuccessfulRequest(resp) => {
                    match resp.status_code.as_u16() {
                        403 => PlatformError::Forbidden,
                        404 => PlatformError::NotFound,
                        429 => PlatformError::RateLimited {
                            retry_after: Duration::from_secs(RATE_LIMIT_FALLBACK_SECS),
                        },
                        _ => PlatformError::Protocol(format!(
                            "{}: {}",
                            resp.status_code, resp.error.message
                        )),
                    }
                }
                other => PlatformError::Network(other.to_string()),
            },
            serenity::Error::Io(e) => PlatformError::Network(e.to_string()),
            serenity::Error::Gateway(e) => PlatformError::Network(format!("gateway: {e:?}")),
            other => PlatformError::Protocol(other.to_string()),
        }
    }
}
