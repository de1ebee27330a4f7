//! Common types for conversation turns

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One content fragment of a turn
///
/// Only text is understood. Other modalities returned by the service are
/// kept as `Unsupported` so the rendering layer can decide how to degrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    Unsupported { unsupported: String },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text { text: s.into() }
    }

    pub fn unsupported(kind: impl Into<String>) -> Self {
        Part::Unsupported {
            unsupported: kind.into(),
        }
    }

    /// Text content of the fragment, or the modality it carries instead
    pub fn as_text(&self) -> Result<&str, UnsupportedContent> {
        match self {
            Part::Text { text } => Ok(text),
            Part::Unsupported { unsupported } => Err(UnsupportedContent {
                kind: unsupported.clone(),
            }),
        }
    }
}

/// A fragment that is not plain text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported content: {kind}")]
pub struct UnsupportedContent {
    pub kind: String,
}

/// One exchange unit in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of all text fragments
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.as_text().ok())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Whether any fragment is something other than text
    pub fn has_unsupported(&self) -> bool {
        self.parts.iter().any(|part| part.as_text().is_err())
    }
}
