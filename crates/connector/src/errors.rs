//! Top-level error and retry-policy types for the connector domain.
//!
//! [`SourceError`] covers failures reported by the GitHub source port (auth,
//! rate limiting, transport, decoding). [`ConnectorError`] is what a
//! [`crate::FindingDefinition`] sync returns; source failures pass through it
//! unmodified.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let the API client decide
/// whether to re-issue a request before surfacing the failure.
///
/// - `Retryable` errors: transport faults, server errors, rate-limit responses.
/// - `NonRetryable` errors: authentication failures, client errors, malformed
///   responses, invalid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from `Retry-After` or `x-ratelimit-reset` response headers).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`crate::CodeScanningSource`] implementation.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The credentials were rejected (HTTP 401) or could not be exchanged for
    /// an installation token.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Description returned by the API or produced locally.
        message: String,
    },

    /// The API signalled that the primary or secondary rate limit was hit.
    #[error("Rate limited by the API (retry after {retry_after:?})")]
    RateLimited {
        /// Delay requested by the API before the next call, when known.
        retry_after: Option<Duration>,
    },

    /// The API answered with a non-success status not covered above.
    #[error("API request failed with status {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connect, timeout).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the underlying transport failure.
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("Could not decode API response: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// The source was constructed with an unusable configuration.
    #[error("Source configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl SourceError {
    /// Classifies this error for the client's retry loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            SourceError::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            SourceError::Transport { .. } => RetryPolicy::Retryable { after: None },
            SourceError::Http { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            SourceError::Http { .. }
            | SourceError::Authentication { .. }
            | SourceError::Decode { .. }
            | SourceError::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Connector-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a finding-definition sync call.
///
/// Nothing is suppressed: the orchestrator resumes from its `since` watermark
/// on the next invocation.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A call to the source port failed. Passed through unmodified.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The connector configuration is invalid.
    ///
    /// Produced at load time; a sync never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}
