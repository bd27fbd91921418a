use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ClassifiedError, ErrorClass};
use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest};
use crate::request::ApiRequest;
use crate::retry::{RetryConfig, RetryState};
use crate::throttling::RateLimiter;

/// Path of the single upstream API script.
pub const API_PATH: &str = "/api.php";

/// Default per-attempt network timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Successful upstream body together with how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub body: String,
    pub attempts: u32,
}

/// Performs one logical request: rate limit, send, classify, retry.
///
/// The executor never touches the cache.
#[derive(Clone)]
pub struct RequestExecutor {
    http: Arc<dyn HttpClient>,
    limiter: RateLimiter,
    retry: RetryConfig,
    base_url: String,
    auth: HttpAuth,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(
        http: Arc<dyn HttpClient>,
        limiter: RateLimiter,
        base_url: impl Into<String>,
        auth: HttpAuth,
    ) -> Self {
        Self {
            http,
            limiter,
            retry: RetryConfig::default(),
            base_url: base_url.into(),
            auth,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn build_request(&self, request: &ApiRequest) -> HttpRequest {
        let url = format!("{}{API_PATH}", self.base_url.trim_end_matches('/'));
        HttpRequest::get(url)
            .with_query(request.query_pairs())
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout(self.timeout)
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ClassifiedError> {
        let mut state = RetryState::new();
        self.execute_with_state(request, &mut state).await
    }

    /// Same as [`Self::execute`], exposing the retry bookkeeping to the caller.
    pub async fn execute_with_state(
        &self,
        request: &ApiRequest,
        state: &mut RetryState,
    ) -> Result<RawResponse, ClassifiedError> {
        let http_request = self.build_request(request);

        loop {
            let attempt = state.begin_attempt();
            self.limiter.acquire().await;

            let error = match self.http.execute(http_request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(request = %request, attempt, "upstream request succeeded");
                    return Ok(RawResponse {
                        body: response.body,
                        attempts: attempt,
                    });
                }
                Ok(response) => ClassifiedError::from_status(response.status, &response.body),
                Err(error) => classify_transport(&error),
            };

            let Some(delay) = state.record_failure(error.class(), &self.retry) else {
                return Err(error.with_attempts(attempt));
            };

            warn!(
                request = %request,
                class = %error.class(),
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "upstream request failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn classify_transport(error: &HttpError) -> ClassifiedError {
    let class = if error.retryable() {
        ErrorClass::ServerTransient
    } else {
        ErrorClass::ClientPermanent
    };
    ClassifiedError::new(class, format!("transport error: {}", error.message()))
}
