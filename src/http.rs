//! Blocking HTTP plumbing shared by the provider clients.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Rejects a blank API key before any request is made.
pub(crate) fn require_key<'a>(
    provider: &'static str,
    api_key: &'a str,
) -> Result<&'a str, ProviderError> {
    let trimmed = api_key.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Auth {
            provider,
            message: "missing API key".to_string(),
        });
    }
    Ok(trimmed)
}

/// Builds a JSON client that sends `auth_header: auth_value` on every request.
pub(crate) fn json_client(
    provider: &'static str,
    auth_header: HeaderName,
    auth_value: &str,
    timeout: Duration,
) -> Result<Client, ProviderError> {
    let mut headers = HeaderMap::new();
    let mut value = HeaderValue::from_str(auth_value).map_err(|_| ProviderError::Auth {
        provider,
        message: "API key contains invalid header characters".to_string(),
    })?;
    value.set_sensitive(true);
    headers.insert(auth_header, value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|err| ProviderError::Unavailable {
            provider,
            message: format!("failed to build HTTP client: {err}"),
        })
}

/// Maps a non-success status to the matching provider error.
pub(crate) fn classify_status(
    provider: &'static str,
    status: StatusCode,
    body: String,
) -> ProviderError {
    let message = format!("{status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Auth { provider, message }
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { provider, message },
        StatusCode::REQUEST_TIMEOUT => ProviderError::Unavailable { provider, message },
        s if s.is_server_error() => ProviderError::Unavailable { provider, message },
        _ => ProviderError::InvalidResponse { provider, message },
    }
}

/// Maps a transport-level failure.
pub(crate) fn classify_transport(provider: &'static str, err: reqwest::Error) -> ProviderError {
    if err.is_decode() {
        return ProviderError::InvalidResponse {
            provider,
            message: err.to_string(),
        };
    }
    ProviderError::Unavailable {
        provider,
        message: err.to_string(),
    }
}

/// Decodes a successful response into `T`, classifying every failure.
pub(crate) fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Result<Response, reqwest::Error>,
) -> Result<T, ProviderError> {
    let response = response.map_err(|err| classify_transport(provider, err))?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        return Err(classify_status(provider, status, body));
    }
    response.json().map_err(|err| ProviderError::InvalidResponse {
        provider,
        message: format!("failed to parse response: {err}"),
    })
}
