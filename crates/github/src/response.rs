//! Interpretation of GitHub REST responses: failure classification and
//! `Link` header pagination.

use std::time::Duration;

use connector::{SourceError, Timestamp};
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use reqwest::StatusCode;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Maps a non-success response onto a [`SourceError`].
///
/// GitHub reports both primary and secondary rate limits as 403 or 429. A
/// primary limit carries `x-ratelimit-remaining: 0` and a reset epoch; a
/// secondary limit carries `retry-after` in seconds.
pub fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
    now: Timestamp,
) -> SourceError {
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        if header_str(headers, RATE_LIMIT_REMAINING) == Some("0") {
            let retry_after = header_str(headers, RATE_LIMIT_RESET)
                .and_then(|v| v.parse::<i64>().ok())
                .map(|reset| {
                    let wait_ms = reset.saturating_mul(1000) - now.as_millis();
                    Duration::from_millis(u64::try_from(wait_ms).unwrap_or(0))
                });
            return SourceError::RateLimited { retry_after };
        }
        if let Some(secs) = header_str(headers, RETRY_AFTER.as_str()).and_then(|v| v.parse().ok()) {
            return SourceError::RateLimited {
                retry_after: Some(Duration::from_secs(secs)),
            };
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return SourceError::RateLimited { retry_after: None };
        }
    }

    if status == StatusCode::UNAUTHORIZED {
        return SourceError::Authentication { message: body };
    }

    SourceError::Http {
        status: status.as_u16(),
        message: body,
    }
}

/// Returns the `rel="next"` URL of a paginated response, if any.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Some(url.to_owned())
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
