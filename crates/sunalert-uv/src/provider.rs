//! OpenUV client: one GET per reading, keyed by coordinates.

use crate::types::{Location, UvError, UvReading};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const OPENUV_API_BASE: &str = "https://api.openuv.io/api/v1";
const API_KEY_HEADER: &str = "x-access-token";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct UvResponse {
    result: UvResult,
}

#[derive(Debug, Deserialize)]
struct UvResult {
    uv: f64,
    uv_max: Option<f64>,
    uv_max_time: Option<String>,
}

impl From<UvResult> for UvReading {
    fn from(r: UvResult) -> Self {
        Self {
            uv: r.uv,
            uv_max: r.uv_max,
            uv_max_time: r.uv_max_time,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UvProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl UvProvider {
    pub fn new(api_key: &str) -> Result<Self, UvError> {
        Self::with_base_url(api_key, OPENUV_API_BASE, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build a provider against a custom endpoint (self-hosted proxy, tests).
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, UvError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch the current UV index for a location.
    ///
    /// Any error means the UV value is unavailable; callers must not
    /// substitute zero.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_uv(&self, location: Location) -> Result<UvReading, UvError> {
        if !location.is_valid() {
            return Err(UvError::InvalidCoordinates {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }

        let url = format!("{}/uv", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("lat", location.latitude), ("lng", location.longitude)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!("UV API rejected the API key ({})", status);
            return Err(UvError::InvalidApiKey);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!("UV API returned status {}: {}", status, message);
            return Err(UvError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: UvResponse =
            serde_json::from_str(&body).map_err(|e| UvError::Parse(e.to_string()))?;

        let reading = UvReading::from(parsed.result);
        tracing::info!(
            "UV index {:.1} at {}, {}",
            reading.uv,
            location.latitude,
            location.longitude
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_without_request() {
        // Unroutable base URL: a request would fail with Network, not InvalidCoordinates
        let provider =
            UvProvider::with_base_url("key", "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let result = provider.fetch_uv(Location::new(120.0, 0.0)).await;
        assert!(matches!(result, Err(UvError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider =
            UvProvider::with_base_url("key", "https://example.com/api/v1/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(provider.base_url, "https://example.com/api/v1");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"result":{"uv":6.2,"uv_max":11.4,"uv_max_time":"2026-10-19T05:12:40.000Z","ozone":280.1}}"#;
        let parsed: UvResponse = serde_json::from_str(json).unwrap();
        let reading = UvReading::from(parsed.result);
        assert_eq!(reading.uv, 6.2);
        assert_eq!(reading.uv_max, Some(11.4));
    }
}
