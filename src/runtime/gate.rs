//! Session gate: one submit in flight at a time

use super::traits::ConversationService;
use crate::llm::{LlmError, Turn};
use crate::state_machine::{transition, Effect, Event, GateState, GateTransition, TransitionError};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::{broadcast, watch};

const TRANSITION_BUFFER: usize = 64;

/// Why a submit was not turned into a model turn
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A turn is already in flight")]
    Busy,
    #[error("Service error: {0}")]
    Service(#[source] LlmError),
    #[error("Invalid gate transition: {0}")]
    InvalidTransition(String),
}

impl From<TransitionError> for GateError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::EmptyInput => GateError::EmptyInput,
            TransitionError::Busy => GateError::Busy,
            TransitionError::InvalidTransition(msg) => GateError::InvalidTransition(msg),
        }
    }
}

/// A published gate transition
///
/// `seq` increases by one per transition, so a subscriber can tell whether
/// it skipped any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub transition: GateTransition,
}

struct GateInner {
    state: GateState,
    seq: u64,
}

/// Serializes user input against the conversation service
pub struct SessionGate<S: ConversationService> {
    service: Arc<S>,
    inner: Mutex<GateInner>,
    disabled_tx: watch::Sender<bool>,
    transitions_tx: broadcast::Sender<TransitionEvent>,
}

impl<S: ConversationService> SessionGate<S> {
    pub fn new(service: Arc<S>) -> Self {
        let (disabled_tx, _) = watch::channel(false);
        let (transitions_tx, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            service,
            inner: Mutex::new(GateInner {
                state: GateState::Idle,
                seq: 0,
            }),
            disabled_tx,
            transitions_tx,
        }
    }

    pub fn state(&self) -> GateState {
        self.lock().state
    }

    /// True exactly while a submit is in flight
    pub fn input_disabled(&self) -> bool {
        self.state().is_busy()
    }

    pub fn subscribe_disabled(&self) -> watch::Receiver<bool> {
        self.disabled_tx.subscribe()
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TransitionEvent> {
        self.transitions_tx.subscribe()
    }

    /// Submit user text as the next turn
    ///
    /// Rejects synchronously with `EmptyInput` or `Busy` without touching
    /// the service. Otherwise the gate is busy until the service call
    /// resolves, and idle again afterwards whatever the outcome.
    pub async fn try_submit(&self, text: &str) -> Result<Turn, GateError> {
        let pending = self.apply(Event::Submit {
            text: text.to_string(),
        })?;

        let in_flight = InFlight {
            gate: self,
            settled: false,
        };

        let mut reply = None;
        for effect in pending {
            match effect {
                Effect::AppendTurn { text } => {
                    reply = Some(self.service.append_turn(&text).await);
                }
                Effect::Publish(_) => {}
            }
        }
        let reply =
            reply.unwrap_or_else(|| Err(LlmError::unknown("Submit produced no service call")));

        in_flight.settle(if reply.is_ok() {
            Event::AppendSucceeded
        } else {
            Event::AppendFailed
        });

        reply.map_err(GateError::Service)
    }

    /// Run one transition and publish its state change
    ///
    /// The state flip and the publication share one critical section, so no
    /// observer sees a state without its transition event. Effects other
    /// than publication are returned to the caller.
    fn apply(&self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let mut inner = self.lock();
        let result = transition(inner.state, event)?;
        let old_state = std::mem::replace(&mut inner.state, result.new_state);

        let mut pending = Vec::new();
        for effect in result.effects {
            match effect {
                Effect::Publish(change) => {
                    inner.seq += 1;
                    tracing::debug!(
                        seq = inner.seq,
                        from = old_state.as_str(),
                        to = result.new_state.as_str(),
                        ?change,
                        "Gate transition"
                    );
                    self.disabled_tx.send_replace(change.target().is_busy());
                    // No subscribers is fine
                    let _ = self.transitions_tx.send(TransitionEvent {
                        seq: inner.seq,
                        transition: change,
                    });
                }
                other => pending.push(other),
            }
        }
        Ok(pending)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the gate to idle if the submitting future is dropped mid-call
///
/// The HTTP layer detaches submits, so only direct callers that drop the
/// future can end a turn as `Abandoned`.
struct InFlight<'a, S: ConversationService> {
    gate: &'a SessionGate<S>,
    settled: bool,
}

impl<S: ConversationService> InFlight<'_, S> {
    fn settle(mut self, event: Event) {
        self.settled = true;
        if let Err(e) = self.gate.apply(event) {
            tracing::error!(error = %e, "Failed to release gate");
        }
    }
}

impl<S: ConversationService> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Submit dropped while in flight, releasing gate");
            if let Err(e) = self.gate.apply(Event::AppendAbandoned) {
                tracing::error!(error = %e, "Failed to release gate");
            }
        }
    }
}
