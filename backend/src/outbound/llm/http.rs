//! Transport helpers shared by the reqwest-backed providers.
//!
//! Each provider owns its wire format; this module owns client
//! construction, status and transport error mapping, and JSON decoding.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::ports::LlmProviderError;

const PREVIEW_CHAR_LIMIT: usize = 240;

/// Client with a whole-request timeout.
pub(super) fn build_client(timeout: Duration) -> Result<Client, LlmProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| LlmProviderError::config(format!("http client: {error}")))
}

/// Send `request` and decode a successful JSON body as `R`.
pub(super) async fn send_json<R: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
    timeout_secs: u64,
) -> Result<R, LlmProviderError> {
    let response = request
        .send()
        .await
        .map_err(|error| map_transport_error(provider, &error, timeout_secs))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|error| map_transport_error(provider, &error, timeout_secs))?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }
    serde_json::from_slice(body.as_ref()).map_err(|error| {
        debug!(provider, %error, "vendor reply did not decode");
        LlmProviderError::decode(format!("{error}: {}", body_preview(body.as_ref())))
    })
}

fn map_transport_error(
    provider: &'static str,
    error: &reqwest::Error,
    timeout_secs: u64,
) -> LlmProviderError {
    debug!(provider, %error, "provider transport failure");
    if error.is_timeout() {
        LlmProviderError::timeout(timeout_secs)
    } else {
        LlmProviderError::transport(error.to_string())
    }
}

pub(super) fn map_status_error(status: StatusCode, body: &[u8]) -> LlmProviderError {
    LlmProviderError::status(status.as_u16(), body_preview(body))
}

/// Whitespace-collapsed prefix of `body` for error messages.
pub(super) fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
