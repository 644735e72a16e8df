//! HTTP client for the prompt rating API.

use crate::timeline::{Rating, RecordId};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned status {0}")]
    Status(StatusCode),
}

#[derive(Debug, Serialize)]
struct RateRequest {
    prompt_id: RecordId,
    rating: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the API is reachable
    pub fn health(&self) -> Result<(), ApiError> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).timeout(REQUEST_TIMEOUT).send()?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(resp.status()))
        }
    }

    /// Store a rating, or clear it with `None`. The response body is ignored.
    pub fn post_rating(&self, id: RecordId, rating: Option<Rating>) -> Result<(), ApiError> {
        let body = RateRequest {
            prompt_id: id,
            rating: rating.map(Rating::value),
        };
        let resp = self
            .client
            .post(self.rate_url())
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(resp.status()))
        }
    }

    fn rate_url(&self) -> String {
        format!("{}/api/rate", self.base_url)
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://localhost:9000/");
        assert_eq!(api.base_url(), "http://localhost:9000");
        assert_eq!(api.rate_url(), "http://localhost:9000/api/rate");
    }

    #[test]
    fn rate_body_shape() {
        let set = RateRequest {
            prompt_id: 42,
            rating: Rating::new(4).map(Rating::value),
        };
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"{"prompt_id":42,"rating":4}"#);
        let clear = RateRequest {
            prompt_id: 42,
            rating: None,
        };
        assert_eq!(serde_json::to_string(&clear).unwrap(), r#"{"prompt_id":42,"rating":null}"#);
    }

    #[test]
    fn unreachable_service_is_an_error() {
        // Port 9 (discard) is not served on loopback
        let api = ApiClient::new("http://127.0.0.1:9");
        assert!(matches!(api.health(), Err(ApiError::Request(_))));
        assert!(api.post_rating(1, Rating::new(3)).is_err());
    }
}
