use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::{AiErrorCode, AppError, AppResult};

pub const FALLBACK_DESCRIPTION: &str = "Failed to generate description.";

/// Produces a short quest description from a title.
#[async_trait]
pub trait DescriptionDrafter: Send + Sync {
    async fn draft(&self, title: &str) -> AppResult<String>;
}

pub fn build_prompt(title: &str) -> String {
    format!(
        "Generate a single direct quest description for the quest titled: '{title}'. \
         Make it brief (2-3 sentences), direct and real-world-based experience, \
         Focus on the challenge and potential rewards. The last 2 sentences should be \
         direct steps that will guide the player on the task"
    )
}

#[derive(Clone)]
pub struct DescriptionService {
    drafter: Option<Arc<dyn DescriptionDrafter>>,
}

impl DescriptionService {
    pub fn new(drafter: Option<Arc<dyn DescriptionDrafter>>) -> Self {
        Self { drafter }
    }

    /// Uses Gemini when an API key is configured, otherwise every suggestion
    /// is the fallback text.
    pub fn from_config(config: &GeminiConfig) -> AppResult<Self> {
        let drafter = match config.api_key.clone() {
            Some(api_key) => {
                let drafter: Arc<dyn DescriptionDrafter> =
                    Arc::new(GeminiDrafter::try_new(config, api_key)?);
                Some(drafter)
            }
            None => {
                warn!(target: "app::ai", "no Gemini API key configured, descriptions disabled");
                None
            }
        };
        Ok(Self::new(drafter))
    }

    pub fn is_enabled(&self) -> bool {
        self.drafter.is_some()
    }

    /// Never fails: any drafting error degrades to [`FALLBACK_DESCRIPTION`].
    pub async fn suggest(&self, title: &str) -> String {
        let Some(drafter) = &self.drafter else {
            return FALLBACK_DESCRIPTION.to_string();
        };

        match drafter.draft(title).await {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    target: "app::ai",
                    error = %err,
                    code = ?err.ai_code(),
                    "description generation failed, using fallback"
                );
                FALLBACK_DESCRIPTION.to_string()
            }
        }
    }
}

pub struct GeminiDrafter {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiDrafter {
    pub fn try_new(config: &GeminiConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|err| AppError::other(format!("failed to build Gemini HTTP client: {err}")))?;

        let base_url = config.base_url.trim_end_matches('/');
        let endpoint = format!("{}/v1beta/models/{}:generateContent", base_url, config.model);

        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    fn build_request_body(title: &str) -> JsonValue {
        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": build_prompt(title) }]
                }
            ],
            "generationConfig": {
                "temperature": 1,
                "topP": 0.75,
                "topK": 44,
                "maxOutputTokens": 254,
                "responseMimeType": "text/plain"
            }
        })
    }

    fn map_http_error(status: StatusCode) -> AppError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::ai(AiErrorCode::MissingApiKey, "Gemini API key rejected")
            }
            StatusCode::TOO_MANY_REQUESTS => {
                AppError::ai(AiErrorCode::RateLimited, "Gemini rate limit reached")
            }
            status if status.is_server_error() => AppError::ai(
                AiErrorCode::Unavailable,
                format!("Gemini unavailable (status {})", status.as_u16()),
            ),
            status => AppError::ai(
                AiErrorCode::Unknown,
                format!("Gemini returned status {}", status.as_u16()),
            ),
        }
    }

    fn error_from_reqwest(err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::ai(AiErrorCode::HttpTimeout, "Gemini request timed out")
        } else if err.is_connect() {
            AppError::ai(AiErrorCode::Unavailable, "Gemini connection failed")
        } else if let Some(status) = err.status() {
            Self::map_http_error(status)
        } else {
            AppError::ai(AiErrorCode::Unknown, format!("Gemini request failed: {err}"))
        }
    }
}

#[async_trait]
impl DescriptionDrafter for GeminiDrafter {
    async fn draft(&self, title: &str) -> AppResult<String> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::build_request_body(title))
            .send()
            .await
            .map_err(Self::error_from_reqwest)?;

        let status = response.status();
        let latency_ms = start.elapsed().as_millis();
        if !status.is_success() {
            warn!(
                target: "app::ai",
                status = status.as_u16(),
                latency_ms,
                "Gemini returned non-success status"
            );
            return Err(Self::map_http_error(status));
        }

        let body: JsonValue = response.json().await.map_err(|err| {
            AppError::ai(
                AiErrorCode::InvalidResponse,
                format!("failed to decode Gemini response: {err}"),
            )
        })?;

        let text = body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                AppError::ai(AiErrorCode::InvalidResponse, "Gemini response has no text")
            })?;

        debug!(target: "app::ai", latency_ms, response_len = text.len(), "Gemini description drafted");
        Ok(text.to_string())
    }
}

pub mod testing {
    use super::*;
    use std::time::Duration as StdDuration;

    /// A service wired to a Gemini-compatible server at `base_url`.
    pub fn service_for(base_url: &str, timeout: StdDuration) -> AppResult<DescriptionService> {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "gemini-exp-1114".to_string(),
            http_timeout: timeout,
        };
        DescriptionService::from_config(&config)
    }

    /// Calls the drafter directly so failures surface as errors.
    pub async fn draft_via_http(
        base_url: &str,
        timeout: StdDuration,
        title: &str,
    ) -> AppResult<String> {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "gemini-exp-1114".to_string(),
            http_timeout: timeout,
        };
        let drafter = GeminiDrafter::try_new(&config, "test-key".to_string())?;
        drafter.draft(title).await
    }

    pub fn map_http_error(status: StatusCode) -> AppError {
        GeminiDrafter::map_http_error(status)
    }
}
