//! Google Gemini chat session

use super::config::{ChatConfig, GenerationConfig, SafetySetting};
use super::types::{Part, Role, Turn};
use super::LlmError;
use crate::runtime::ConversationService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Chat session against the Gemini `generateContent` endpoint
///
/// Owns the authoritative history. Each append sends the full history plus
/// the new user text; the history only grows once the reply has arrived.
pub struct GeminiChat {
    client: Client,
    /// `None` in gateway mode, where the gateway authenticates
    api_key: Option<String>,
    base_url: String,
    model_id: String,
    generation: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    history: Mutex<Vec<Turn>>,
}

impl GeminiChat {
    pub fn new(config: &ChatConfig, history: Vec<Turn>) -> Result<Self, LlmError> {
        let base_url = match config.gateway.as_deref() {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{}:generateContent",
                gw.trim_end_matches('/'),
                config.model
            ),
            None => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                config.model
            ),
        };

        let api_key = if config.gateway.is_some() {
            None
        } else {
            Some(
                config
                    .api_key
                    .clone()
                    .ok_or_else(|| LlmError::auth("No Gemini API key configured"))?,
            )
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model_id: config.model.clone(),
            generation: config.generation.clone(),
            safety_settings: config.safety_settings.clone(),
            history: Mutex::new(history),
        })
    }

    fn build_request<'a>(&'a self, history: &'a [Turn], text: &'a str) -> GeminiRequest<'a> {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .filter_map(|turn| {
                // Non-text fragments carry no payload we could resend
                let parts: Vec<GeminiPart> = turn
                    .parts
                    .iter()
                    .filter_map(|part| part.as_text().ok())
                    .map(|text| GeminiPart::Text {
                        text: text.to_string(),
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(GeminiContent {
                        role: Some(turn.role.as_str().to_string()),
                        parts,
                    })
                }
            })
            .collect();

        contents.push(GeminiContent {
            role: Some(Role::User.as_str().to_string()),
            parts: vec![GeminiPart::Text {
                text: text.to_string(),
            }],
        });

        GeminiRequest {
            contents,
            generation_config: &self.generation,
            safety_settings: &self.safety_settings,
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<Turn, LlmError> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::blocked(format!("Prompt blocked: {reason}")));
        }

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

        let parts: Vec<Part> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .map(|part| match part {
                GeminiPart::Text { text } => Part::text(text),
                GeminiPart::Other(fields) => Part::unsupported(
                    fields
                        .keys()
                        .next()
                        .map_or_else(|| "unknown".to_string(), |k| to_snake_case(k)),
                ),
            })
            .collect();

        if parts.is_empty() {
            return Err(match candidate.finish_reason.as_deref() {
                Some("SAFETY") => LlmError::blocked("Reply blocked by safety filters"),
                Some(reason) => LlmError::unknown(format!("Empty reply (finish reason {reason})")),
                None => LlmError::unknown("Empty reply"),
            });
        }

        Ok(Turn {
            role: Role::Model,
            parts,
        })
    }

    fn classify_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(body) {
            let message = error_resp.error.message;
            return match status.as_u16() {
                400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::unknown(format!("HTTP {status}: {message}")),
            };
        }
        LlmError::unknown(format!("HTTP {status} error: {body}"))
    }
}

#[async_trait]
impl ConversationService for GeminiChat {
    async fn append_turn(&self, text: &str) -> Result<Turn, LlmError> {
        let snapshot = self.history.lock().await.clone();
        let request = self.build_request(&snapshot, text);

        // The key travels in a header so it never shows up in a URL
        let mut builder = self.client.post(&self.base_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            if e.is_timeout() {
                LlmError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                LlmError::network(format!("Connection failed: {e}"))
            } else {
                LlmError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| {
                LlmError::network(format!("Failed to read response: {}", e.without_url()))
            })?;

        if !status.is_success() {
            return Err(Self::classify_http_error(status, &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;
        let reply = Self::normalize_response(gemini_response)?;

        let mut history = self.history.lock().await;
        history.push(Turn::user(text));
        history.push(reply.clone());
        Ok(reply)
    }

    async fn list_turns(&self) -> Result<Vec<Turn>, LlmError> {
        Ok(self.history.lock().await.clone())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// `inlineData` -> `inline_data`
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent>,
    generation_config: &'a GenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    Other(serde_json::Map<String, serde_json::Value>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
