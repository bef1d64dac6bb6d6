//! Text Generation Client
//!
//! Client for the hosted completion service that writes alert copy.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{AlertPriority, AlertRequest, GeneratedAlert};

use crate::config::TextGenerationConfig;
use crate::error::{AppError, AppResult};

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MODEL: &str = "default";

/// Client for the text generation service
#[derive(Clone)]
pub struct TextGenerationClient {
    api_endpoint: String,
    api_key: Option<String>,
    model: String,
    http_client: Client,
}

/// Request body sent to the service
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
}

/// Response body from the service
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Option<String>,
}

impl From<GenerateResponse> for GeneratedAlert {
    fn from(r: GenerateResponse) -> Self {
        GeneratedAlert {
            title: r.title,
            message: r.message,
            priority: r
                .priority
                .as_deref()
                .and_then(|p| p.parse::<AlertPriority>().ok())
                .unwrap_or_default(),
        }
        .normalized()
    }
}

impl TextGenerationClient {
    /// Build a client from configuration. Returns `None` when no endpoint is set.
    pub fn from_config(config: &TextGenerationConfig) -> AppResult<Option<Self>> {
        let Some(api_endpoint) = config.endpoint.clone().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        let http_client = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Some(Self {
            api_endpoint,
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            http_client,
        }))
    }

    /// Ask the service to write an alert
    pub async fn generate_alert(&self, request: &AlertRequest) -> AppResult<GeneratedAlert> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: request.render_prompt(),
        };

        let mut builder = self
            .http_client
            .post(&self.api_endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalService(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse response: {}", e)))?;

        Ok(result.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_disables_client() {
        let client = TextGenerationClient::from_config(&TextGenerationConfig::default()).unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn configured_endpoint_builds_client() {
        let config = TextGenerationConfig {
            endpoint: Some("http://localhost:9000/generate".to_string()),
            api_key: Some("key".to_string()),
            model: None,
            timeout_seconds: Some(5),
        };
        let client = TextGenerationClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.model, DEFAULT_MODEL);
    }

    #[test]
    fn response_priority_is_parsed_or_defaulted() {
        let parsed: GeneratedAlert = GenerateResponse {
            title: "  Stock low ".to_string(),
            message: "Rice is below threshold".to_string(),
            priority: Some("high".to_string()),
        }
        .into();
        assert_eq!(parsed.title, "Stock low");
        assert_eq!(parsed.priority, AlertPriority::High);

        let defaulted: GeneratedAlert = GenerateResponse {
            title: "t".to_string(),
            message: "m".to_string(),
            priority: Some("urgent!!".to_string()),
        }
        .into();
        assert_eq!(defaulted.priority, AlertPriority::Medium);
    }

    #[test]
    fn priority_is_optional_in_payload() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"title":"Order shipped","message":"On its way"}"#).unwrap();
        assert!(response.priority.is_none());
        let alert: GeneratedAlert = response.into();
        assert_eq!(alert.priority, AlertPriority::Medium);
    }
}
