//! Transcript synchronizer: cached copy of the session history

use super::gate::TransitionEvent;
use super::traits::ConversationService;
use super::SessionNotice;
use crate::llm::{LlmError, Turn};
use crate::state_machine::GateTransition;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Failed to fetch history: {0}")]
    Service(#[source] LlmError),
    #[error("A turn is in flight, refresh deferred")]
    GateBusy,
}

/// What the presentation layer can show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptView {
    /// No refresh has succeeded yet
    Loading,
    /// Last successfully fetched history (possibly empty)
    Ready(Arc<Vec<Turn>>),
}

impl TranscriptView {
    pub fn turns(&self) -> Option<&[Turn]> {
        match self {
            TranscriptView::Loading => None,
            TranscriptView::Ready(turns) => Some(turns),
        }
    }
}

/// Keeps a wholesale copy of the service's history
///
/// Refreshes take a ticket when issued. A result is applied only if its
/// ticket is newer than the one behind the current cache, so a slow
/// refresh can never overwrite a newer one.
pub struct TranscriptSynchronizer<S: ConversationService> {
    service: Arc<S>,
    gate_busy: watch::Receiver<bool>,
    next_ticket: AtomicU64,
    applied_ticket: Mutex<u64>,
    cache_tx: watch::Sender<TranscriptView>,
}

impl<S: ConversationService> TranscriptSynchronizer<S> {
    /// `gate_busy` is the gate's input-disabled signal
    pub fn new(service: Arc<S>, gate_busy: watch::Receiver<bool>) -> Self {
        let (cache_tx, _) = watch::channel(TranscriptView::Loading);
        Self {
            service,
            gate_busy,
            next_ticket: AtomicU64::new(0),
            applied_ticket: Mutex::new(0),
            cache_tx,
        }
    }

    /// Last cached history, or `Loading`. Never blocks on I/O.
    pub fn current(&self) -> TranscriptView {
        self.cache_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TranscriptView> {
        self.cache_tx.subscribe()
    }

    /// Fetch the full history and replace the cache
    ///
    /// Refused while a submit is in flight. On failure the cache keeps its
    /// previous value.
    pub async fn refresh(&self) -> Result<Vec<Turn>, SyncError> {
        if *self.gate_busy.borrow() {
            return Err(SyncError::GateBusy);
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let turns = self.service.list_turns().await.map_err(SyncError::Service)?;

        let mut applied = self
            .applied_ticket
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if ticket > *applied {
            *applied = ticket;
            let fresh = TranscriptView::Ready(Arc::new(turns.clone()));
            self.cache_tx.send_if_modified(|view| {
                if *view == fresh {
                    false
                } else {
                    *view = fresh;
                    true
                }
            });
            tracing::debug!(ticket, turns = turns.len(), "Transcript refreshed");
        } else {
            tracing::debug!(ticket, applied = *applied, "Discarding stale refresh");
        }

        Ok(turns)
    }

    /// Refresh at start and after every busy→idle transition of the gate
    ///
    /// Runs until the gate's transition channel closes.
    pub async fn run(
        self: Arc<Self>,
        mut transitions: broadcast::Receiver<TransitionEvent>,
        notices: broadcast::Sender<SessionNotice>,
    ) {
        tracing::info!("Starting transcript synchronizer");
        self.refresh_and_report(&notices).await;

        loop {
            match transitions.recv().await {
                Ok(TransitionEvent {
                    seq,
                    transition: GateTransition::BecameIdle { outcome },
                }) => {
                    tracing::debug!(seq, ?outcome, "Gate idle, refreshing transcript");
                    self.refresh_and_report(&notices).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed gate transitions, refreshing transcript");
                    self.refresh_and_report(&notices).await;
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::info!("Transcript synchronizer stopped");
    }

    async fn refresh_and_report(&self, notices: &broadcast::Sender<SessionNotice>) {
        match self.refresh().await {
            Ok(_) => {}
            // A newer submit started; its own idle transition triggers the refresh
            Err(SyncError::GateBusy) => tracing::debug!("Gate busy again, skipping refresh"),
            Err(e) => {
                tracing::warn!(error = %e, "Transcript refresh failed");
                let _ = notices.send(SessionNotice::SyncFailed {
                    message: e.to_string(),
                });
            }
        }
    }
}
