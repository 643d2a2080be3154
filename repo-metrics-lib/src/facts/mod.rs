//! API access and metric collection for a single repository
//!
//! This module talks to the GitHub REST API and turns its responses into a
//! [`MetricRecord`](crate::metrics::MetricRecord).
//!
//! # Implementation Model
//!
//! The [`Client`] is the HTTP fetcher. Every call goes through one bounded retry
//! loop that classifies each response as success, rate limited, transient, or
//! fatal, and reports the result as a [`FetchOutcome`]. Rate-limited and
//! transient failures are retried with waits computed by the [`RetryPolicy`];
//! fatal failures return immediately.
//!
//! The [`Collector`] drives the client sequentially: repository info first
//! (mandatory), then traffic and forks (optional). Failures of the optional
//! groups degrade the affected metrics to null instead of aborting the run.
//!
//! Diagnostics go through an explicit [`LogContext`] handed to both components,
//! and all waiting goes through a [`Clock`] so that tests can observe the backoff
//! schedule without sleeping.

mod client;
mod clock;
mod collector;
mod credentials;
mod fetch_outcome;
mod log_context;
mod payloads;
mod retry_policy;

pub use client::{Client, DEFAULT_API_URL, Page, RateLimitInfo};
pub use clock::{Clock, SystemClock};
pub use collector::{Collector, ForkPages};
pub use credentials::Credentials;
pub use fetch_outcome::FetchOutcome;
pub use log_context::{Fanout, LogContext};
pub use payloads::{Fork, Owner, Repository, TrafficSummary};
pub use retry_policy::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};

#[cfg(test)]
pub(crate) use clock::ManualClock;
#[cfg(test)]
pub(crate) use log_context::CapturedLog;
