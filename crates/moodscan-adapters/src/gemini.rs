//! Gemini `generateContent` adapter for the chat responder.

use std::time::Duration;

use moodscan_core::chat::ChatError;
use moodscan_core::ports::TextGenerator;
use serde_json::{json, Value};
use tracing::debug;

/// Safety categories blocked at medium probability and above.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Connection settings for the Gemini REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    /// API base, without a trailing slash.
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-pro-exp-03-25".to_string(),
            temperature: 0.95,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Text generator backed by the Gemini API.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Creates a client with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if the key is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> Result<Self, ChatError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ChatError::Config("API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Creates a client reading the API key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] if the variable is unset or empty.
    pub fn from_env(config: GeminiConfig) -> Result<Self, ChatError> {
        let key = std::env::var(&config.api_key_env)
            .map_err(|_| ChatError::Config(format!("{} is not set", config.api_key_env)))?;
        Self::new(config, key)
    }

    #[must_use]
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<Option<String>, ChatError> {
        let body = build_request_body(system, user, self.config.temperature);
        debug!("POST {}", self.url());

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("invalid response body: {e}")))?;
        Ok(extract_text(&payload))
    }
}

/// Builds a `generateContent` request with a single user turn.
#[must_use]
pub fn build_request_body(system: &str, user: &str, temperature: f32) -> Value {
    let safety: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_MEDIUM_AND_ABOVE" }))
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": system }] },
        "contents": [{ "role": "user", "parts": [{ "text": user }] }],
        "generationConfig": {
            "temperature": temperature,
            "responseMimeType": "text/plain",
        },
        "safetySettings": safety,
    })
}

/// Concatenates the text parts of the first candidate.
///
/// Returns `None` when there is no candidate, no parts, or no text at all.
#[must_use]
pub fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    (!text.is_empty()).then_some(text)
}
