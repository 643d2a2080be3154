use super::{Client, Clock, Credentials, FetchOutcome, Fork, LogContext, Repository, SystemClock, TrafficSummary};
use crate::Result;
use crate::metrics::{ForkDetail, MetricKey, MetricRecord, MetricValue};
use ohno::app_err;
use reqwest::StatusCode;

const LOG_TARGET: &str = "collect";
const FORK_PAGE_SIZE: u8 = 100;
const MAX_FORK_PAGES: u32 = 10;

/// How much of the fork listing to fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForkPages {
    /// Only the first page (up to 100 forks).
    #[default]
    First,

    /// Follow `rel="next"` links, up to 10 pages.
    All,
}

/// Unwrap a successful `FetchOutcome` or return the failure as-is
macro_rules! unwrap_or_return {
    ($expr:expr) => {
        match $expr {
            FetchOutcome::Success(data) => data,
            FetchOutcome::RateLimited(reset_at) => return FetchOutcome::RateLimited(reset_at),
            FetchOutcome::TransientError(status) => return FetchOutcome::TransientError(status),
            FetchOutcome::FatalError(status, message) => return FetchOutcome::FatalError(status, message),
        }
    };
}

/// Gathers the metrics of one repository into a [`MetricRecord`].
#[derive(Debug, Clone)]
pub struct Collector<C = SystemClock> {
    client: Client<C>,
    log: LogContext,
    fork_pages: ForkPages,
}

impl<C: Clock> Collector<C> {
    #[must_use]
    pub fn new(client: Client<C>, log: &LogContext, fork_pages: ForkPages) -> Self {
        Self {
            client,
            log: log.with_target(LOG_TARGET),
            fork_pages,
        }
    }

    /// Collect every metric of the repository named by `credentials`.
    ///
    /// The repository lookup must succeed; traffic and fork failures only leave
    /// their metrics empty.
    pub async fn collect(&self, credentials: &Credentials) -> Result<MetricRecord> {
        let mut record = MetricRecord::new();
        record.set(MetricKey::Timestamp, Some(self.client.clock().now().into()));
        record.set(MetricKey::Repository, Some(MetricValue::String(credentials.to_string().into())));

        self.log.info(format_args!("Collecting metrics for '{credentials}'"));

        let base = format!("/repos/{}/{}", credentials.owner(), credentials.repo());

        let repo = self.fetch_repository(&base, credentials).await?;
        record.set(MetricKey::Stars, repo.stargazers_count.map(MetricValue::from));
        record.set(MetricKey::Forks, repo.forks_count.map(MetricValue::from));
        record.set(MetricKey::Watchers, repo.subscribers_count.map(MetricValue::from));
        record.set(MetricKey::OpenIssues, repo.open_issues_count.map(MetricValue::from));
        record.set(MetricKey::UpdatedAt, repo.updated_at.map(MetricValue::from));

        self.collect_traffic(&base, &mut record).await;
        self.collect_forks(&base, &mut record).await;

        self.log.info(format_args!("Finished collecting metrics for '{credentials}'"));
        Ok(record)
    }

    async fn fetch_repository(&self, base: &str, credentials: &Credentials) -> Result<Repository> {
        let outcome = match self.client.fetch::<Repository>(base, &[]).await {
            FetchOutcome::Success(repo) => return Ok(repo),
            outcome => outcome,
        };

        let err = match &outcome {
            FetchOutcome::FatalError(StatusCode::NOT_FOUND, _) => app_err!("repository '{credentials}' not found"),
            FetchOutcome::FatalError(StatusCode::UNAUTHORIZED, message) => {
                app_err!("unauthorized to access repository '{credentials}', check the access token: {message}")
            }
            FetchOutcome::RateLimited(_) => app_err!("could not fetch repository '{credentials}': {outcome}"),
            FetchOutcome::TransientError(_) => app_err!("unrecoverable failure fetching repository '{credentials}': {outcome}"),
            FetchOutcome::FatalError(..) | FetchOutcome::Success(_) => app_err!("could not fetch repository '{credentials}': {outcome}"),
        };

        self.log.error(format_args!("{err}"));
        Err(err)
    }

    async fn collect_traffic(&self, base: &str, record: &mut MetricRecord) {
        let mut failures = Vec::new();

        match self.client.fetch::<TrafficSummary>(&format!("{base}/traffic/views"), &[]).await {
            FetchOutcome::Success(views) => {
                record.set(MetricKey::Views, views.count.map(MetricValue::from));
                record.set(MetricKey::UniqueVisitors, views.uniques.map(MetricValue::from));
            }
            outcome => failures.push(format!("views ({outcome})")),
        }

        match self.client.fetch::<TrafficSummary>(&format!("{base}/traffic/clones"), &[]).await {
            FetchOutcome::Success(clones) => {
                record.set(MetricKey::Clones, clones.count.map(MetricValue::from));
                record.set(MetricKey::UniqueCloners, clones.uniques.map(MetricValue::from));
            }
            outcome => failures.push(format!("clones ({outcome})")),
        }

        if !failures.is_empty() {
            self.log.warn(format_args!(
                "Traffic data unavailable, leaving it empty: {}",
                failures.join(", ")
            ));
        }
    }

    async fn collect_forks(&self, base: &str, record: &mut MetricRecord) {
        match self.fetch_forks(base).await {
            FetchOutcome::Success(forks) => {
                self.log.debug(format_args!("Found {} fork(s)", forks.len()));
                record.set(MetricKey::ForkCount, u64::try_from(forks.len()).ok().map(MetricValue::from));
                record.set(MetricKey::ForkDetails, Some(forks.into()));
            }
            outcome => {
                self.log.warn(format_args!("Fork details unavailable, leaving them empty: {outcome}"));
                record.set(MetricKey::ForkCount, None);
                record.set(MetricKey::ForkDetails, Some(MetricValue::Forks(Vec::new())));
            }
        }
    }

    async fn fetch_forks(&self, base: &str) -> FetchOutcome<Vec<ForkDetail>> {
        let endpoint = format!("{base}/forks");
        let max_pages = match self.fork_pages {
            ForkPages::First => 1,
            ForkPages::All => MAX_FORK_PAGES,
        };

        let mut forks = Vec::new();
        for page in 1..=max_pages {
            let params = [("per_page", FORK_PAGE_SIZE.to_string()), ("page", page.to_string())];
            let fetched = unwrap_or_return!(self.client.fetch_page::<Vec<Fork>>(&endpoint, &params).await);
            forks.extend(fetched.items.into_iter().map(ForkDetail::from));

            if !fetched.has_next {
                break;
            }

            if page == max_pages {
                match self.fork_pages {
                    ForkPages::First => self.log.info(format_args!(
                        "More than {FORK_PAGE_SIZE} forks exist; only the first page was fetched (use --all-fork-pages for more)"
                    )),
                    ForkPages::All => self.log.warn(format_args!("Stopped fetching forks after {MAX_FORK_PAGES} pages")),
                }
            }
        }

        FetchOutcome::Success(forks)
    }
}
