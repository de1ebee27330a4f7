//! API request and response types

use crate::llm::Turn;
use crate::render::{render_turn, render_turns, RenderedTurn};
use crate::runtime::TranscriptView;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// The model's reply to a chat message
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub turn: Turn,
    pub rendered: RenderedTurn,
}

impl ChatResponse {
    pub fn new(turn: Turn) -> Self {
        let rendered = render_turn(&turn);
        Self { turn, rendered }
    }
}

/// Cached transcript, or the loading marker
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptResponse {
    Loading,
    Ready {
        turns: Vec<Turn>,
        rendered: Vec<RenderedTurn>,
    },
}

impl From<&TranscriptView> for TranscriptResponse {
    fn from(view: &TranscriptView) -> Self {
        match view.turns() {
            None => TranscriptResponse::Loading,
            Some(turns) => TranscriptResponse::from(turns),
        }
    }
}

impl From<&[Turn]> for TranscriptResponse {
    fn from(turns: &[Turn]) -> Self {
        TranscriptResponse::Ready {
            turns: turns.to_vec(),
            rendered: render_turns(turns),
        }
    }
}

/// Session state for the input affordances
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub input_disabled: bool,
    pub model: String,
}

/// Version information
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ErrorResponse {
    pub fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}
