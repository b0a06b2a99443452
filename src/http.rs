//! Page download with retry and backoff.
//!
//! The design is trait-based so the fetcher can be exercised without a network:
//! - [`PageSource`]: anything that turns a URL into an HTML body
//! - [`HttpSource`]: the `reqwest` implementation
//! - [`RetryingSource`]: decorator adding a [`RetryPolicy`] to any source
//! - [`Sleeper`]: the clock the decorator waits on between attempts
//!
//! # Retry Strategy
//!
//! Only [`FetchErrorKind::Network`] failures are retried. The delay after the
//! n-th failed attempt is either fixed or `min(base * 2^(n-1), max)`, plus a
//! random jitter in `0..=jitter`.

use crate::config::{BackoffKind, HttpConfig, RetryConfig};
use crate::errors::{FetchError, FetchErrorKind};
use rand::{Rng, rng};
use reqwest::StatusCode;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

/// Source of HTML pages.
pub trait PageSource {
    /// Fetch the body at `url`.
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        (**self).get(url).await
    }
}

/// Waits between retry attempts. Tests inject a recording implementation.
pub trait Sleeper {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

/// How many times to try a URL and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: usize,
    pub backoff: Backoff,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: Backoff, jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            jitter,
        }
    }

    /// Delay after the `attempt`-th failure (1-based), without jitter.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exp = attempt.saturating_sub(1).min(31) as u32;
                base.saturating_mul(2u32.saturating_pow(exp)).min(max)
            }
        }
    }

    fn jittered_delay_after(&self, attempt: usize) -> Duration {
        let delay = self.delay_after(attempt);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        let base = Duration::from_millis(config.base_delay_ms);
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed(base),
            BackoffKind::Exponential => Backoff::Exponential {
                base,
                max: Duration::from_millis(config.max_delay_ms),
            },
        };
        RetryPolicy::new(
            config.max_attempts,
            backoff,
            Duration::from_millis(config.jitter_ms),
        )
    }
}

/// Decorator that retries the inner source according to a [`RetryPolicy`].
pub struct RetryingSource<S, C = TokioSleeper> {
    inner: S,
    policy: RetryPolicy,
    sleeper: C,
}

impl<S, C> RetryingSource<S, C>
where
    S: PageSource,
    C: Sleeper,
{
    pub fn new(inner: S, policy: RetryPolicy, sleeper: C) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }
}

impl<S, C> fmt::Debug for RetryingSource<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingSource")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S, C> PageSource for RetryingSource<S, C>
where
    S: PageSource,
    C: Sleeper,
{
    #[instrument(level = "info", skip(self))]
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            attempt += 1;
            let e = match self.inner.get(url).await {
                Ok(body) => {
                    debug!(attempt, bytes = body.len(), "Fetched page");
                    return Ok(body);
                }
                Err(e) => e,
            };

            let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
            let elapsed_ms_total = total_t0.elapsed().as_millis();

            if !e.kind.is_retryable() {
                error!(attempt, kind = %e.kind, error = %e.cause, "Non-retryable fetch failure");
                return Err(e);
            }

            if attempt >= self.policy.max_attempts {
                error!(
                    attempt,
                    max = self.policy.max_attempts,
                    elapsed_ms_attempt,
                    elapsed_ms_total,
                    error = %e.cause,
                    "get() exhausted retries"
                );
                return Err(e);
            }

            let delay = self.policy.jittered_delay_after(attempt);
            warn!(
                attempt,
                max = self.policy.max_attempts,
                elapsed_ms_attempt,
                elapsed_ms_total,
                ?delay,
                error = %e.cause,
                "get() attempt failed; backing off"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

/// [`PageSource`] backed by a `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(url, format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::network(url, format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Network, url, e))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted sources and a recording clock for tests.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Answers each URL from a queue of scripted responses; the last one repeats.
    #[derive(Debug, Default)]
    pub struct ScriptedSource {
        responses: Mutex<HashMap<String, VecDeque<Result<String, FetchErrorKind>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, url: &str, responses: Vec<Result<String, FetchErrorKind>>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), responses.into());
            self
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    impl PageSource for ScriptedSource {
        async fn get(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut responses = self.responses.lock().unwrap();
            let Some(queue) = responses.get_mut(url) else {
                return Err(FetchError::not_found(url, "HTTP 404 Not Found"));
            };
            let next = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            next.map_err(|kind| FetchError::new(kind, url, "HTTP 500 Internal Server Error"))
        }
    }

    /// Records requested delays instead of sleeping.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for &RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingSleeper, ScriptedSource};
    use super::*;

    const URL: &str = "https://fbref.com/en/comps/9/schedule/Premier-League-Scores-and-Fixtures";

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Backoff::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(3),
            },
            Duration::ZERO,
        )
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let p = policy(5);
        assert_eq!(p.delay_after(1), Duration::from_secs(1));
        assert_eq!(p.delay_after(2), Duration::from_secs(2));
        assert_eq!(p.delay_after(3), Duration::from_secs(3));
        assert_eq!(p.delay_after(40), Duration::from_secs(3));
    }

    #[test]
    fn test_fixed_backoff_and_jitter_bounds() {
        let p = RetryPolicy::new(
            3,
            Backoff::Fixed(Duration::from_millis(500)),
            Duration::from_millis(250),
        );
        assert_eq!(p.delay_after(1), Duration::from_millis(500));
        assert_eq!(p.delay_after(7), Duration::from_millis(500));
        for attempt in 1..10 {
            let d = p.jittered_delay_after(attempt);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(750));
        }
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig::default();
        let p = RetryPolicy::from(&config);
        assert_eq!(p.max_attempts, 3);
        assert_eq!(
            p.backoff,
            Backoff::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(30)
            }
        );
        assert_eq!(RetryPolicy::new(0, p.backoff, p.jitter).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let source = ScriptedSource::new().respond(
            URL,
            vec![
                Err(FetchErrorKind::Network),
                Err(FetchErrorKind::Network),
                Ok("<html></html>".into()),
            ],
        );
        let sleeper = RecordingSleeper::default();
        let retrying = RetryingSource::new(&source, policy(3), &sleeper);

        let body = retrying.get(URL).await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(source.calls_to(URL), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let source = ScriptedSource::new().respond(URL, vec![Err(FetchErrorKind::Network)]);
        let sleeper = RecordingSleeper::default();
        let retrying = RetryingSource::new(&source, policy(3), &sleeper);

        let err = retrying.get(URL).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Network);
        assert_eq!(err.url, URL);
        assert_eq!(source.calls_to(URL), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let source = ScriptedSource::new();
        let sleeper = RecordingSleeper::default();
        let retrying = RetryingSource::new(&source, policy(3), &sleeper);

        let err = retrying.get(URL).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NotFound);
        assert_eq!(source.calls_to(URL), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    /// Serve fixed statuses on a loopback port: `/missing` is 404, `/broken` is 500,
    /// anything else 200. Returns the base URL and the list of requested paths.
    async fn status_server() -> (String, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let path = String::from_utf8_lossy(&request)
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                let status = match path.as_str() {
                    "/missing" => "404 Not Found",
                    "/broken" => "500 Internal Server Error",
                    _ => "200 OK",
                };
                seen.lock().unwrap().push(path);
                let body = "<table></table>";
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, hits)
    }

    #[tokio::test]
    async fn test_http_statuses_map_to_error_kinds() {
        let (base, hits) = status_server().await;
        let http = HttpSource::new(&HttpConfig::default()).unwrap();
        let sleeper = RecordingSleeper::default();
        let retrying = RetryingSource::new(&http, policy(3), &sleeper);

        let ok = retrying.get(&format!("{base}/fixtures")).await.unwrap();
        assert_eq!(ok, "<table></table>");

        let err = retrying.get(&format!("{base}/broken")).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Network);
        assert!(err.cause.contains("500"));
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);

        let err = retrying.get(&format!("{base}/missing")).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NotFound);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);

        let hits = hits.lock().unwrap();
        assert_eq!(hits.iter().filter(|p| *p == "/broken").count(), 3);
        assert_eq!(hits.iter().filter(|p| *p == "/missing").count(), 1);
    }
}
