//! The GitHub REST client: configuration, authentication, and request
//! execution with retries.

use std::collections::HashMap;
use std::time::Duration;

use connector::{Installation, InstallationId, RetryPolicy, SourceError, Timestamp};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::response::{classify_failure, next_link};
use crate::wire::WireAccessToken;

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// Installation tokens are refreshed this long before GitHub expires them.
const TOKEN_REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// GitHub caps `per_page` at 100 on every endpoint used here.
const MAX_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for [`GithubClient`].
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GithubClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// GitHub App bearer token (signed App JWT) used for `/app/...` calls.
    pub app_token: String,
    /// Records per page when the caller does not ask for a page size.
    pub page_size: u32,
    /// Retries after the first attempt for retryable failures.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            app_token: String::new(),
            page_size: MAX_PAGE_SIZE,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            timeout_secs: 30,
            user_agent: concat!("code-scanning-connector/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl std::fmt::Debug for GithubClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClientConfig")
            .field("api_url", &self.api_url)
            .field("app_token", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct InstallationToken {
    token: String,
    expires_at: Timestamp,
}

/// One page of a listing plus the URL of the page after it.
pub(crate) struct Page<T> {
    pub(crate) items: T,
    pub(crate) next: Option<String>,
}

/// GitHub REST client authenticated as a GitHub App.
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubClientConfig,
    tokens: Mutex<HashMap<InstallationId, InstallationToken>>,
}

impl GithubClient {
    /// Creates a client. Fails when no App token is configured or the HTTP
    /// client cannot be built.
    pub fn new(mut config: GithubClientConfig) -> Result<Self, SourceError> {
        if config.app_token.trim().is_empty() {
            return Err(SourceError::Configuration {
                message: "a GitHub App token is required".to_string(),
            });
        }
        config.api_url = config.api_url.trim_end_matches('/').to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    /// Absolute URL for an API path starting with `/`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    /// Page size to request: the caller's preference, else the configured
    /// default, clamped to what GitHub accepts.
    pub(crate) fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.config.page_size)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub(crate) fn app_token(&self) -> &str {
        &self.config.app_token
    }

    /// Returns a valid access token for the installation, minting one when
    /// the cached token is missing or about to expire.
    #[instrument(skip_all, fields(installation = %installation.id))]
    pub(crate) async fn installation_token(
        &self,
        installation: &Installation,
    ) -> Result<String, SourceError> {
        let now = Timestamp::now().as_millis();
        if let Some(cached) = self.tokens.lock().await.get(&installation.id) {
            if cached.expires_at.as_millis() - TOKEN_REFRESH_MARGIN_MS > now {
                return Ok(cached.token.clone());
            }
        }

        let url = self.url(&format!("/app/installations/{}/access_tokens", installation.id));
        let response = self
            .execute(Method::POST, &url, &self.config.app_token)
            .await
            .map_err(|err| match err {
                SourceError::Http { status, message } if status == 404 || status == 403 => {
                    SourceError::Authentication {
                        message: format!("installation token refused ({status}): {message}"),
                    }
                }
                other => other,
            })?;
        let minted: WireAccessToken = decode(response).await?;
        debug!(expires_at = %minted.expires_at, "Minted installation token");

        self.tokens.lock().await.insert(
            installation.id,
            InstallationToken {
                token: minted.token.clone(),
                expires_at: minted.expires_at,
            },
        );
        Ok(minted.token)
    }

    /// Fetches and decodes one page of a listing.
    pub(crate) async fn fetch_page<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<Page<T>, SourceError> {
        let response = self.execute(Method::GET, url, token).await?;
        let next = next_link(response.headers());
        let items = decode(response).await?;
        Ok(Page { items, next })
    }

    /// Sends a request, retrying retryable failures with exponential back-off.
    ///
    /// Only successful (2xx) responses are returned.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: &str,
        token: &str,
    ) -> Result<Response, SourceError> {
        let mut attempt = 0;
        loop {
            let err = match self.execute_once(method.clone(), url, token).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            match err.retry_policy() {
                RetryPolicy::Retryable { after } if attempt < self.config.max_retries => {
                    let delay = after
                        .unwrap_or_else(|| self.backoff(attempt))
                        .min(Duration::from_millis(self.config.max_backoff_ms));
                    attempt += 1;
                    warn!(
                        %method,
                        url,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying GitHub request"
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => return Err(err),
            }
        }
    }

    async fn execute_once(
        &self,
        method: Method,
        url: &str,
        token: &str,
    ) -> Result<Response, SourceError> {
        debug!(%method, url, "GitHub request");
        let response = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or_default().to_string());
        Err(classify_failure(status, &headers, body, Timestamp::now()))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.config.initial_backoff_ms.saturating_mul(factor))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
    let bytes = response.bytes().await.map_err(|e| SourceError::Transport {
        message: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GithubClientConfig {
        GithubClientConfig {
            app_token: "app-jwt".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_requires_an_app_token() {
        let err = GithubClient::new(GithubClientConfig::default()).err().unwrap();
        assert!(matches!(err, SourceError::Configuration { .. }));
    }

    #[test]
    fn test_api_url_trailing_slash_is_trimmed() {
        let client = GithubClient::new(GithubClientConfig {
            api_url: "https://ghe.example.com/api/v3/".into(),
            ..config()
        })
        .unwrap();
        assert_eq!(client.url("/app/installations"), "https://ghe.example.com/api/v3/app/installations");
    }

    #[test]
    fn test_page_size_is_clamped_to_api_limits() {
        let client = GithubClient::new(config()).unwrap();
        assert_eq!(client.page_size(None), 100);
        assert_eq!(client.page_size(Some(0)), 1);
        assert_eq!(client.page_size(Some(500)), 100);
        assert_eq!(client.page_size(Some(25)), 25);
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let client = GithubClient::new(config()).unwrap();
        assert_eq!(client.backoff(0), Duration::from_secs(1));
        assert_eq!(client.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_debug_output_redacts_the_app_token() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("app-jwt"));
        assert!(rendered.contains("<redacted>"));
    }
}
