//! The endpoint resolution wire protocol.
//!
//! Request: GET to the configured endpoint with one query parameter `request` holding
//! the JSON-encoded [`SizeData`]. Response: JSON body, either `{"url": "..."}` or
//! `{"error": "..."}`. Any other shape is a resolution failure.

use serde::Deserialize;

use crate::error::EngineError;
use crate::types::{ElementId, SizeData};

/// Identifies one emitted fetch so a completion can be matched back to its element and
/// checked for staleness (a newer dispatch for the same element supersedes older ones).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchToken {
    pub element: ElementId,
    pub(crate) seq: u64,
}

/// A resolution request the host must perform.
///
/// The host issues a GET for `url` and reports the outcome via
/// [`crate::Engine::complete_fetch`] with this request's `token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: FetchToken,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn request_url(endpoint: &str, data: &SizeData) -> Result<String, EngineError> {
    let payload = serde_json::to_string(data).map_err(|e| EngineError::Encode(e.to_string()))?;
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("request", &payload)
        .finish();
    let joiner = if endpoint.contains('?') { '&' } else { '?' };
    Ok(format!("{endpoint}{joiner}{query}"))
}

pub(crate) fn parse_response(body: &str) -> Result<String, EngineError> {
    let response: FetchResponse =
        serde_json::from_str(body).map_err(|e| EngineError::MalformedResponse(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(EngineError::Server(error));
    }
    response
        .url
        .ok_or_else(|| EngineError::MalformedResponse("missing `url` field".to_owned()))
}
