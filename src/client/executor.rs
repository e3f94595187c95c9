//! Freshdesk HTTP client with retry and backoff
//!
//! Every network call goes through [`FreshdeskClient::execute`]. Rate limits
//! (429), server errors (5xx) and connect/timeout failures are retried;
//! anything else fails on the first response.

use super::pagination::PageCursor;
use crate::config::Config;
use crate::error::{FreshdeskError, Result};
use crate::metrics::METRICS;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("freshdesk-mcp/", env!("CARGO_PKG_VERSION"));

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body; `Null` when the body was empty
    pub body: Value,
}

impl ApiResponse {
    /// Raw `Link` header, if any
    pub fn link_header(&self) -> Option<&str> {
        self.headers.get(LINK).and_then(|v| v.to_str().ok())
    }

    /// Pagination cursor decoded from the `Link` header
    pub fn cursor(&self) -> PageCursor {
        PageCursor::decode(self.link_header())
    }

    /// Deserialize the body
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: usize,
    /// Sleep before the first retry without `Retry-After`; doubles each time
    pub base_backoff: Duration,
    /// Cap for server-provided `Retry-After`
    pub max_retry_after: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: config.retry_backoff(),
            max_retry_after: config.max_retry_after(),
        }
    }
}

/// Outcome of one HTTP attempt
enum Attempt {
    Success(ApiResponse),
    Retry {
        error: FreshdeskError,
        retry_after: Option<Duration>,
        reason: &'static str,
    },
    Fail(FreshdeskError),
}

/// Freshdesk API client.
///
/// Owns the single connection pool for the process. Cloning is not needed;
/// share it behind an `Arc`.
pub struct FreshdeskClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl FreshdeskClient {
    /// Create a new client from validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        let credential = BASE64.encode(format!("{}:X", config.api_key.expose_secret()));
        let mut auth = HeaderValue::from_str(&format!("Basic {credential}"))
            .map_err(|e| FreshdeskError::Config(format!("API key is not header-safe: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| FreshdeskError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `path` with query parameters
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        self.execute(Method::GET, path, query, None).await
    }

    /// POST a JSON body to `path`
    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    /// Issue one logical request, retrying transient failures
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let start = Instant::now();
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut backoff = self.retry.base_backoff;
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            debug!("Freshdesk {} {} (attempt {})", method, path, attempt);

            match self.attempt(&method, &url, query, body).await {
                Attempt::Success(response) => break Ok(response),
                Attempt::Fail(e) => break Err(e),
                Attempt::Retry {
                    error: e,
                    retry_after,
                    reason,
                } => {
                    if attempt >= self.retry.max_attempts {
                        error!(
                            "Freshdesk {} {} failed after {} attempts: {}",
                            method, path, attempt, e
                        );
                        break Err(e);
                    }

                    let delay = match retry_after {
                        Some(wait) => wait.min(self.retry.max_retry_after),
                        None => {
                            let wait = backoff;
                            backoff = backoff.saturating_mul(2);
                            wait
                        }
                    };

                    METRICS.record_retry(reason);
                    warn!(
                        "Freshdesk {} {} attempt {} failed ({}): {}, retrying in {:?}",
                        method, path, attempt, reason, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        METRICS
            .api_request_duration
            .with_label_values(&[method.as_str()])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Attempt {
        let mut request = self.http.request(method.clone(), url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                METRICS.record_request(method.as_str(), "network_error");
                return classify_network_error(e);
            }
        };

        let status = response.status();
        METRICS.record_request(method.as_str(), status.as_str());

        if status.is_success() {
            let headers = response.headers().clone();
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => return classify_network_error(e),
            };
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                match serde_json::from_str(&text) {
                    Ok(body) => body,
                    Err(e) => {
                        return Attempt::Fail(FreshdeskError::Unexpected(format!(
                            "invalid JSON in response: {e}"
                        )))
                    }
                }
            };
            return Attempt::Success(ApiResponse {
                status,
                headers,
                body,
            });
        }

        let retry_after = parse_retry_after(response.headers());
        let payload = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok());
        let error = FreshdeskError::status(status.as_u16(), payload);

        if status == StatusCode::TOO_MANY_REQUESTS {
            Attempt::Retry {
                error,
                retry_after,
                reason: "rate_limited",
            }
        } else if status.is_server_error() {
            Attempt::Retry {
                error,
                retry_after,
                reason: "server_error",
            }
        } else {
            Attempt::Fail(error)
        }
    }
}

fn classify_network_error(e: reqwest::Error) -> Attempt {
    let error = FreshdeskError::network(e.to_string());
    if e.is_timeout() || e.is_connect() {
        Attempt::Retry {
            error,
            retry_after: None,
            reason: "network",
        }
    } else {
        Attempt::Fail(error)
    }
}

/// `Retry-After` as whole seconds; HTTP-date and negative values are ignored
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
