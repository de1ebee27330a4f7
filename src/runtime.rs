//! Runtime for one conversation
//!
//! Pairs a session gate with a transcript synchronizer over one
//! conversation service. The gate's busy→idle transitions drive the
//! synchronizer's refreshes.

mod gate;
pub mod traits;
mod transcript;

#[cfg(test)]
pub mod testing;

pub use gate::{GateError, SessionGate, TransitionEvent};
pub use traits::*;
pub use transcript::{SyncError, TranscriptSynchronizer, TranscriptView};

use crate::llm::Turn;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Session over a type-erased service (the logged Gemini chat in production)
pub type ProductionSession = ChatSession<Arc<dyn ConversationService>>;

/// Failures surfaced to the presentation layer for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    SubmitFailed { message: String },
    SyncFailed { message: String },
}

/// Gate and synchronizer for exactly one conversation
pub struct ChatSession<S: ConversationService + 'static> {
    service: Arc<S>,
    gate: SessionGate<S>,
    transcript: Arc<TranscriptSynchronizer<S>>,
    notices_tx: broadcast::Sender<SessionNotice>,
    /// Taken by `start`; subscribed at construction so no transition is missed
    transitions_rx: Mutex<Option<broadcast::Receiver<TransitionEvent>>>,
}

impl<S: ConversationService + 'static> ChatSession<S> {
    pub fn new(service: S) -> Self {
        let service = Arc::new(service);
        let gate = SessionGate::new(service.clone());
        let transcript = Arc::new(TranscriptSynchronizer::new(
            service.clone(),
            gate.subscribe_disabled(),
        ));
        let transitions_rx = gate.subscribe_transitions();
        let (notices_tx, _) = broadcast::channel(32);

        Self {
            service,
            gate,
            transcript,
            notices_tx,
            transitions_rx: Mutex::new(Some(transitions_rx)),
        }
    }

    /// Spawn the synchronizer loop; it issues the initial refresh
    ///
    /// Returns `None` if already started.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let transitions = self
            .transitions_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let transcript = Arc::clone(&self.transcript);
        let notices = self.notices_tx.clone();
        Some(tokio::spawn(transcript.run(transitions, notices)))
    }

    /// Submit entry point for the presentation layer
    pub async fn submit(&self, text: &str) -> Result<Turn, GateError> {
        let result = self.gate.try_submit(text).await;
        if let Err(GateError::Service(e)) = &result {
            let _ = self.notices_tx.send(SessionNotice::SubmitFailed {
                message: e.to_string(),
            });
        }
        result
    }

    pub async fn refresh(&self) -> Result<Vec<Turn>, SyncError> {
        self.transcript.refresh().await
    }

    pub fn input_disabled(&self) -> bool {
        self.gate.input_disabled()
    }

    pub fn transcript(&self) -> TranscriptView {
        self.transcript.current()
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    pub fn subscribe_disabled(&self) -> watch::Receiver<bool> {
        self.gate.subscribe_disabled()
    }

    pub fn subscribe_transcript(&self) -> watch::Receiver<TranscriptView> {
        self.transcript.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices_tx.subscribe()
    }
}
