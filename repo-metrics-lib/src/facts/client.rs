//! GitHub API client
//!
//! Issues authenticated GET requests and runs each one through a bounded retry
//! loop that tells rate limits, transient failures, and fatal errors apart.

use super::{Clock, Credentials, FetchOutcome, LogContext, RetryPolicy, SystemClock};
use crate::Result;
use chrono::{DateTime, Local, Utc};
use compact_str::CompactString;
use core::time::Duration;
use ohno::IntoAppError;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, LINK, RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const LOG_TARGET: &str = "fetch";
const USER_AGENT: &str = concat!("repo-metrics/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate limit information from response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitInfo {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let remaining = header_str(headers, "x-ratelimit-remaining").and_then(|s| s.parse::<u64>().ok());
        let reset_at = header_str(headers, "x-ratelimit-reset")
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        Self { remaining, reset_at }
    }

    /// The response says no requests are left in the current window.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(0))
    }
}

/// One page of a listing endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: T,

    /// The `Link` header advertises a `rel="next"` page.
    pub has_next: bool,
}

/// How the retry loop treats a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    RateLimited,
    Transient,
    Fatal,
}

/// Result of a single request attempt
enum Attempt<T> {
    /// Nothing left to retry.
    Done(FetchOutcome<Page<T>>),

    RateLimited {
        rate_limit: RateLimitInfo,
        retry_after: Option<Duration>,
    },

    Transient {
        status: Option<StatusCode>,
        reason: String,
    },
}

/// API client (GitHub or a GitHub Enterprise server)
#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client<C = SystemClock> {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
    clock: C,
    log: LogContext,
}

impl<C: Clock> Client<C> {
    /// Create a client that authenticates every request with the credentials' bearer token
    pub fn new(credentials: &Credentials, base_url: impl Into<String>, policy: RetryPolicy, clock: C, log: &LogContext) -> Result<Self> {
        let mut auth_val = HeaderValue::from_str(&format!("Bearer {}", credentials.token()))
            .into_app_err("access token contains characters that are not allowed in an HTTP header")?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, auth_val);
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let _ = headers.insert(HeaderName::from_static("x-github-api-version"), HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .into_app_err("creating HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
            clock,
            log: log.with_target(LOG_TARGET),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Fetch `endpoint` (a path below the base URL) and parse the body as `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> FetchOutcome<T> {
        self.fetch_page::<T>(endpoint, params).await.map(|page| page.items)
    }

    /// Like [`Client::fetch`], also reporting whether a next page exists.
    pub async fn fetch_page<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> FetchOutcome<Page<T>> {
        let url = format!("{}{endpoint}", self.base_url);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut waited = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.log.debug(format_args!("GET {url} (attempt {attempt}/{max_attempts})"));

            let (delay, exhausted, reason) = match self.attempt::<T>(&url, params).await {
                Attempt::Done(outcome) => return outcome,

                Attempt::RateLimited { rate_limit, retry_after } => {
                    let now = self.clock.now();
                    let delay = self.policy.rate_limit_wait(now, rate_limit.reset_at, retry_after);
                    let reset_at = rate_limit
                        .reset_at
                        .unwrap_or_else(|| now + chrono::Duration::from_std(delay).unwrap_or_default());
                    let reason = format!(
                        "Rate limit exceeded for {url}, resets at {}",
                        reset_at.with_timezone(&Local).format("%T")
                    );
                    (delay, FetchOutcome::RateLimited(reset_at), reason)
                }

                Attempt::Transient { status, reason } => (self.policy.backoff_delay(attempt), FetchOutcome::TransientError(status), reason),
            };

            if attempt >= max_attempts {
                self.log.error(format_args!("Giving up on {url} after {attempt} attempt(s): {reason}"));
                return exhausted;
            }

            let budget = self.policy.max_total_wait.saturating_sub(waited);
            if delay > budget {
                self.log.error(format_args!(
                    "Giving up on {url}: waiting {}s more would exceed the {}s retry budget ({reason})",
                    delay.as_secs(),
                    self.policy.max_total_wait.as_secs()
                ));
                return exhausted;
            }

            self.log.warn(format_args!(
                "{reason}; retrying in {:.1}s (retry {attempt}/{})",
                delay.as_secs_f64(),
                max_attempts - 1
            ));
            self.clock.sleep(delay).await;
            waited += delay;
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Attempt<T> {
        let resp = match self.client.get(url).query(params).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Attempt::Transient {
                    status: None,
                    reason: format!("Request to {url} failed: {e}"),
                };
            }
        };

        let status = resp.status();
        let rate_limit = RateLimitInfo::from_headers(resp.headers());
        self.log.debug(format_args!(
            "{url} responded {status} (rate limit remaining: {}, reset: {})",
            rate_limit.remaining.map_or_else(|| "n/a".to_string(), |r| r.to_string()),
            rate_limit
                .reset_at
                .map_or_else(|| "n/a".to_string(), |r| r.with_timezone(&Local).format("%T").to_string()),
        ));

        match classify(status, resp.headers()) {
            StatusClass::Success => {
                let has_next = has_next_page(resp.headers());
                let body = match resp.bytes().await {
                    Ok(body) => body,
                    Err(e) => {
                        return Attempt::Transient {
                            status: None,
                            reason: format!("Reading response from {url} failed: {e}"),
                        };
                    }
                };

                match serde_json::from_slice::<T>(&body) {
                    Ok(items) => Attempt::Done(FetchOutcome::Success(Page { items, has_next })),
                    Err(e) => {
                        self.log.error(format_args!("Malformed response from {url}: {e}"));
                        Attempt::Done(FetchOutcome::FatalError(status, format!("malformed response body: {e}").into()))
                    }
                }
            }

            StatusClass::RateLimited => Attempt::RateLimited {
                rate_limit,
                retry_after: parse_retry_after(resp.headers()),
            },

            StatusClass::Transient => Attempt::Transient {
                status: Some(status),
                reason: format!("{url} responded {status}"),
            },

            StatusClass::Fatal => {
                let message = error_message(resp).await;
                self.log.error(format_args!("{url} responded {status}: {message}"));
                Attempt::Done(FetchOutcome::FatalError(status, message))
            }
        }
    }
}

/// Classify a response status for retry purposes.
fn classify(status: StatusCode, headers: &HeaderMap) -> StatusClass {
    if status.is_success() {
        return StatusClass::Success;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return StatusClass::RateLimited;
    }

    // A 403 is only a rate limit when the headers say so; otherwise it is a
    // permission problem (e.g. traffic data without push access).
    if status == StatusCode::FORBIDDEN
        && (parse_retry_after(headers).is_some() || RateLimitInfo::from_headers(headers).is_exhausted())
    {
        return StatusClass::RateLimited;
    }

    if status.is_server_error() {
        StatusClass::Transient
    } else {
        StatusClass::Fatal
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|link_str| link_str.contains(r#"rel="next""#))
}

/// Pull the `message` out of a GitHub error body, falling back to the status reason.
async fn error_message(resp: reqwest::Response) -> CompactString {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    let status = resp.status();
    let fallback = || CompactString::from(status.canonical_reason().unwrap_or("request failed"));

    match resp.bytes().await {
        Ok(body) => serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .map_or_else(fallback, CompactString::from),
        Err(_) => fallback(),
    }
}
