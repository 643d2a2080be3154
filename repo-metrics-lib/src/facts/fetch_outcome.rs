use chrono::{DateTime, Local, Utc};
use compact_str::CompactString;
use core::fmt::{Display, Formatter};
use reqwest::StatusCode;

/// Classified result of a single API fetch, after any retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    /// The request succeeded and the body parsed into the expected shape.
    Success(T),

    /// The rate limit was still exhausted when the retries ran out.
    RateLimited(DateTime<Utc>),

    /// Server errors or network failures persisted through every retry.
    /// The status is `None` when the last attempt got no response at all.
    TransientError(Option<StatusCode>),

    /// The request failed in a way that retrying cannot fix.
    FatalError(StatusCode, CompactString),
}

impl<T> FetchOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the payload if `Success`, otherwise `None`.
    #[must_use]
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            Self::Success(data) => FetchOutcome::Success(f(data)),
            Self::RateLimited(reset) => FetchOutcome::RateLimited(reset),
            Self::TransientError(status) => FetchOutcome::TransientError(status),
            Self::FatalError(status, message) => FetchOutcome::FatalError(status, message),
        }
    }
}

impl<T> Display for FetchOutcome<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Success(_) => write!(f, "success"),
            Self::RateLimited(reset) => {
                write!(f, "rate limit exceeded, resets at {}", reset.with_timezone(&Local).format("%T"))
            }
            Self::TransientError(Some(status)) => write!(f, "{status} persisted after retries"),
            Self::TransientError(None) => write!(f, "network failure persisted after retries"),
            Self::FatalError(status, message) => write!(f, "{status}: {message}"),
        }
    }
}
