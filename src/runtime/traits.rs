//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the gate and synchronizer with mock
//! implementations.

use crate::llm::{LlmError, Turn};
use async_trait::async_trait;
use std::sync::Arc;

/// The external turn-taking service that owns the session history
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Submit user text as the next turn and return the model's reply
    async fn append_turn(&self, text: &str) -> Result<Turn, LlmError>;

    /// Full ordered history of the session
    async fn list_turns(&self) -> Result<Vec<Turn>, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationService + ?Sized> ConversationService for Arc<T> {
    async fn append_turn(&self, text: &str) -> Result<Turn, LlmError> {
        (**self).append_turn(text).await
    }

    async fn list_turns(&self) -> Result<Vec<Turn>, LlmError> {
        (**self).list_turns().await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}
