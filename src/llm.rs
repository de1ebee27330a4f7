//! Conversation service backed by an LLM provider
//!
//! Provides the turn types shared with the rest of the crate and the
//! Gemini chat collaborator.

mod config;
mod error;
mod gemini;
mod types;

pub use config::ChatConfig;
pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiChat;
pub use types::*;

use crate::runtime::ConversationService;
use async_trait::async_trait;
use std::sync::Arc;

/// Logging wrapper for conversation services
pub struct LoggingService {
    inner: Arc<dyn ConversationService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn ConversationService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ConversationService for LoggingService {
    async fn append_turn(&self, text: &str) -> Result<Turn, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.append_turn(text).await;
        let duration = start.elapsed();

        match &result {
            Ok(turn) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    parts = turn.parts.len(),
                    text_len = turn.text().len(),
                    unsupported = turn.has_unsupported(),
                    "Turn appended"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Turn append failed"
                );
            }
        }

        result
    }

    async fn list_turns(&self) -> Result<Vec<Turn>, LlmError> {
        let result = self.inner.list_turns().await;
        match &result {
            Ok(turns) => tracing::debug!(model = %self.model_id, turns = turns.len(), "History fetched"),
            Err(e) => tracing::error!(model = %self.model_id, error = %e.message, "History fetch failed"),
        }
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
