//! HTTP fetching with exponential backoff retry logic.
//!
//! [`Fetcher`] wraps one shared `reqwest::Client` and offers two entry points:
//! - [`Fetcher::get`]: a single attempt, for callers that do not need resilience
//! - [`Fetcher::get_with_retry`]: bounded retries with backoff, jitter and
//!   `Retry-After` support, interruptible by a [`CancellationToken`]
//!
//! # Retry Strategy
//!
//! - `retries + 1` attempts in total
//! - 2xx returns the body; other statuses outside {429, 5xx} fail at once
//! - 429, 5xx and transport errors are retried
//! - a positive integer `Retry-After` (seconds) is waited out before the backoff
//! - backoff starts at `base_backoff`, doubles per attempt up to `max_backoff`,
//!   and gets up to 50% random jitter, capped again at `max_backoff`
//! - no wait after the final attempt; exhaustion is an explicit error

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::utils::truncate_for_log;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

/// Shared page fetcher.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    /// Retries after the first attempt.
    retries: usize,
    /// Initial delay between attempts (doubles with each attempt).
    base_backoff: Duration,
    /// Maximum delay cap, jitter included.
    max_backoff: Duration,
}

/// Outcome of one attempt that did not end the fetch.
enum Attempt {
    Success(String),
    Retryable {
        error: FetchError,
        retry_after: Option<Duration>,
    },
}

impl Fetcher {
    /// Build the fetcher and its HTTP client from configuration.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .min_tls_version(reqwest::tls::Version::TLS_1_2);
        if !config.user_agent.is_empty() {
            builder = builder.user_agent(config.user_agent.as_str());
        }

        Ok(Self {
            client: builder.build()?,
            retries: config.retries,
            base_backoff: config.base_backoff(),
            max_backoff: config.max_backoff(),
        })
    }

    /// Single GET without retries. Non-2xx statuses are errors.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }
        Ok(response.text().await?)
    }

    /// GET with retries, backoff and cancellation.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Status`] for a non-retryable status (the body is kept)
    /// - [`FetchError::RetriesExhausted`] when every attempt failed retryably
    /// - [`FetchError::Cancelled`] as soon as `cancel` fires
    #[instrument(level = "debug", skip(self, cancel))]
    pub async fn get_with_retry(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let attempts = self.retries + 1;
        let mut backoff = self.base_backoff;
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();
            let (error, retry_after) = match self.attempt(url, cancel).await? {
                Attempt::Success(body) => {
                    debug!(
                        attempt,
                        bytes = body.len(),
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        "Fetched page"
                    );
                    return Ok(body);
                }
                Attempt::Retryable { error, retry_after } => (error, retry_after),
            };

            if attempt >= attempts {
                error!(
                    attempt,
                    max = attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    status = ?error.status(),
                    error = %error,
                    "Fetch exhausted retries"
                );
                return Err(FetchError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = retry_after.unwrap_or_default() + self.jittered(backoff);
            warn!(
                attempt,
                max = attempts,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                ?retry_after,
                ?delay,
                error = %error,
                "Fetch attempt failed; backing off"
            );
            sleep_or_cancel(delay, cancel).await?;
            backoff = backoff.saturating_mul(2).min(self.max_backoff);
        }
    }

    /// One request. Terminal outcomes other than success come back as `Err`.
    async fn attempt(&self, url: &str, cancel: &CancellationToken) -> Result<Attempt, FetchError> {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            sent = self.client.get(url).send() => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                return Ok(Attempt::Retryable {
                    error: FetchError::Request(e),
                    retry_after: None,
                });
            }
        };

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = match read_body(response, cancel).await? {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Ok(Attempt::Retryable {
                    error: FetchError::Request(e),
                    retry_after: None,
                });
            }
            Err(_) => String::new(),
        };

        if status.is_success() {
            Ok(Attempt::Success(body))
        } else if is_retryable_status(status) {
            Ok(Attempt::Retryable {
                error: FetchError::Status { status, body },
                retry_after,
            })
        } else {
            warn!(
                %status,
                body_preview = %truncate_for_log(&body, 200),
                "Non-retryable status"
            );
            Err(FetchError::Status { status, body })
        }
    }

    /// Current backoff plus up to 50% jitter, capped at `max_backoff`.
    fn jittered(&self, backoff: Duration) -> Duration {
        let half_ms = (backoff.as_millis() / 2) as u64;
        let jitter_ms = if half_ms == 0 {
            0
        } else {
            rng().random_range(0..=half_ms)
        };
        (backoff + Duration::from_millis(jitter_ms)).min(self.max_backoff)
    }
}

/// Read the response body unless cancelled first.
async fn read_body(
    response: Response,
    cancel: &CancellationToken,
) -> Result<Result<String, reqwest::Error>, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        body = response.text() => Ok(body),
    }
}

/// 429 and every 5xx are worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `Retry-After` in its delta-seconds form; anything else is ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Sleep for `delay`, or fail with [`FetchError::Cancelled`] if `cancel` fires first.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        _ = sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, test_http_config};
    use axum::extract::State;
    use axum::http::{StatusCode as AxumStatus, header};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::{Router, routing::get};
    use reqwest::header::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn fetcher_with_retries(retries: usize) -> Fetcher {
        let mut config = test_http_config();
        config.retries = retries;
        Fetcher::new(&config).unwrap()
    }

    async fn count_hits(State(hits): State<Arc<AtomicUsize>>) -> AxumStatus {
        hits.fetch_add(1, Ordering::SeqCst);
        AxumStatus::INTERNAL_SERVER_ERROR
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
        assert!(!is_retryable_status(StatusCode::OK));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut config = test_http_config();
        config.base_backoff_ms = 100;
        config.max_backoff_ms = 1_000;
        let fetcher = Fetcher::new(&config).unwrap();

        for _ in 0..100 {
            let d = fetcher.jittered(Duration::from_millis(100));
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(150));
            let capped = fetcher.jittered(Duration::from_millis(900));
            assert!(capped <= Duration::from_millis(1_000));
        }
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let base = serve(Router::new().route("/", get(|| async { "hello" }))).await;
        let fetcher = fetcher_with_retries(3);
        let body = fetcher
            .get_with_retry(&base, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "hello");
        assert_eq!(fetcher.get(&base).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_always_500_makes_retries_plus_one_attempts() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/", get(count_hits))
            .with_state(hits.clone());
        let base = serve(app).await;

        let err = fetcher_with_retries(3)
            .get_with_retry(&base, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 4);
        match err {
            FetchError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 4);
                assert_eq!(last.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/", get(count_hits))
            .with_state(hits.clone());
        let base = serve(app).await;

        let err = fetcher_with_retries(0)
            .get_with_retry(&base, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(matches!(err, FetchError::RetriesExhausted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::NOT_FOUND, "no such page")
                }),
            )
            .with_state(hits.clone());
        let base = serve(app).await;

        let err = fetcher_with_retries(5)
            .get_with_retry(&base, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "no such page");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                        (AxumStatus::SERVICE_UNAVAILABLE, "busy")
                    } else {
                        (AxumStatus::OK, "finally")
                    }
                }),
            )
            .with_state(hits.clone());
        let base = serve(app).await;

        let body = fetcher_with_retries(5)
            .get_with_retry(&base, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "finally");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_delays_next_attempt() {
        let seen: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/",
                get(|State(seen): State<Arc<Mutex<Vec<Instant>>>>| async move {
                    let first = {
                        let mut seen = seen.lock().unwrap();
                        seen.push(Instant::now());
                        seen.len() == 1
                    };
                    let response: AxumResponse = if first {
                        (
                            AxumStatus::TOO_MANY_REQUESTS,
                            [(header::RETRY_AFTER, "2")],
                            "slow down",
                        )
                            .into_response()
                    } else {
                        (AxumStatus::OK, "ok").into_response()
                    };
                    response
                }),
            )
            .with_state(seen.clone());
        let base = serve(app).await;

        let body = fetcher_with_retries(1)
            .get_with_retry(&base, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "ok");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].duration_since(seen[0]) >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/", get(count_hits))
            .with_state(hits.clone());
        let base = serve(app).await;

        let mut config = test_http_config();
        config.base_backoff_ms = 30_000;
        config.max_backoff_ms = 60_000;
        let fetcher = Fetcher::new(&config).unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let t0 = Instant::now();
        let err = fetcher.get_with_retry(&base, &cancel).await.unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
        assert!(t0.elapsed() < Duration::from_secs(5));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let err = fetcher_with_retries(2)
            .get_with_retry(&format!("http://{addr}/"), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            FetchError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Request(_)));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_already_cancelled_token_aborts_immediately() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fetcher_with_retries(3)
            .get_with_retry("http://127.0.0.1:9/", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test]
    async fn test_get_is_single_attempt() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/", get(count_hits))
            .with_state(Arc::clone(&hits));
        let base = serve(app).await;

        let err = fetcher_with_retries(5).get(&base).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
