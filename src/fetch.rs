//! Fetching upstream HTML with a bounded timeout and retry on transient errors.
//!
//! The module uses a trait-based design so parsers can be exercised without
//! the network:
//! - [`FetchHtml`]: core trait, URL in, document body out
//! - [`HttpFetcher`]: `reqwest` implementation with timeout and user agent
//! - [`RetryFetch`]: decorator that retries transient failures of any [`FetchHtml`]
//!
//! # Retry Strategy
//!
//! - Only [`Error::is_transient`] failures are retried (connection errors,
//!   HTTP 429 and 5xx); timeouts and 4xx are returned immediately
//! - Exponential backoff from the configured base delay, capped at 5 seconds
//! - Random jitter (0-250ms) added to every delay

use crate::config::Config;
use crate::error::Error;
use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Source of HTML documents.
pub trait FetchHtml: Send + Sync {
    /// Fetch `url` and return the response body as text.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, Error>> + Send;
}

/// Fetches pages over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a client from the fetch settings in `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies `fetch_timeout_secs` and `user_agent`
    ///
    /// # Returns
    ///
    /// The fetcher, or [`Error::Fetch`] if the TLS backend cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let timeout = config.fetch_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Fetch {
                url: config.base_url.clone(),
                source: Box::new(e),
            })?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, url: &Url, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else {
            Error::Fetch {
                url: url.to_string(),
                source: Box::new(e),
            }
        }
    }
}

impl FetchHtml for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, Error> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned non-success status");
            return Err(Error::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| self.classify(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched upstream page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry to any [`FetchHtml`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: FetchHtml> RetryFetch<T> {
    /// Wrap `inner` so transient failures are retried.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fetcher that does the actual work
    /// * `max_retries` - Extra attempts after the first; zero disables retries
    /// * `base_delay` - Delay before the first retry, doubled for each later one
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = RetryFetch::new(HttpFetcher::new(&config)?, 2, Duration::from_millis(500));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(5),
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        self.base_delay
            .saturating_mul(1 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: FetchHtml> FetchHtml for RetryFetch<T> {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, Error> {
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.delay_for(attempt) + Duration::from_millis(jitter_ms);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned pages by URL; anything else is an upstream 404.
    #[derive(Debug, Default)]
    pub(crate) struct FixtureFetcher {
        pages: HashMap<String, String>,
    }

    impl FixtureFetcher {
        pub(crate) fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl FetchHtml for FixtureFetcher {
        async fn fetch(&self, url: &Url) -> Result<String, Error> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| Error::UpstreamStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    /// Fails with the given status a fixed number of times, then succeeds.
    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    impl FetchHtml for Flaky {
        async fn fetch(&self, url: &Url) -> Result<String, Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(Error::UpstreamStatus {
                    url: url.to_string(),
                    status: self.status,
                })
            } else {
                Ok("<html></html>".to_string())
            }
        }
    }

    /// Counts calls before handing them to the wrapped fetcher.
    #[derive(Debug)]
    struct Counting<T> {
        inner: T,
        calls: AtomicUsize,
    }

    impl<T: FetchHtml> FetchHtml for Counting<T> {
        async fn fetch(&self, url: &Url) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(url).await
        }
    }

    /// Address of a local server that accepts connections and never answers.
    pub(crate) async fn silent_upstream() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    pub(crate) fn one_second_timeout() -> Config {
        Config {
            fetch_timeout_secs: 1,
            ..Config::default()
        }
    }

    fn url() -> Url {
        Url::parse("https://www.basketball-reference.com/boxscores/").unwrap()
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let flaky = Flaky {
            failures: 2,
            status: 503,
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(flaky, 2, Duration::from_millis(1));
        assert!(fetcher.fetch(&url()).await.is_ok());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let flaky = Flaky {
            failures: 10,
            status: 502,
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(flaky, 1, Duration::from_millis(1));
        let err = fetcher.fetch(&url()).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_status");
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let flaky = Flaky {
            failures: 1,
            status: 404,
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(flaky, 3, Duration::from_millis(1));
        assert!(fetcher.fetch(&url()).await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_silent_upstream_is_timeout() {
        let addr = silent_upstream().await;
        let fetcher = HttpFetcher::new(&one_second_timeout()).unwrap();
        let url = Url::parse(&format!("http://{addr}/boxscores/")).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let addr = silent_upstream().await;
        let counting = Counting {
            inner: HttpFetcher::new(&one_second_timeout()).unwrap(),
            calls: AtomicUsize::new(0),
        };
        let fetcher = RetryFetch::new(counting, 3, Duration::from_millis(1));
        let url = Url::parse(&format!("http://{addr}/boxscores/")).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { after, .. } if after == Duration::from_secs(1)));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let fetcher = RetryFetch::new(FixtureFetcher::default(), 5, Duration::from_secs(1));
        assert_eq!(fetcher.delay_for(1), Duration::from_secs(1));
        assert_eq!(fetcher.delay_for(2), Duration::from_secs(2));
        assert_eq!(fetcher.delay_for(10), Duration::from_secs(5));
    }
}
