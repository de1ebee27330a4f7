//! Pure state transition function

use super::{Effect, Event, GateState, GateTransition, IdleOutcome};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: GateState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: GateState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A turn is already in flight")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same state and event it always produces the same outcome and
/// performs no I/O. The runtime executes the returned effects.
pub fn transition(state: GateState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Validation comes first: empty text never reaches the service
        (_, Event::Submit { text }) if text.trim().is_empty() => Err(TransitionError::EmptyInput),

        // Idle + Submit -> Busy
        (GateState::Idle, Event::Submit { text }) => Ok(TransitionResult::new(GateState::Busy)
            .with_effect(Effect::Publish(GateTransition::BecameBusy))
            .with_effect(Effect::AppendTurn { text })),

        // Busy + Submit -> reject, nothing queued
        (GateState::Busy, Event::Submit { .. }) => Err(TransitionError::Busy),

        // Busy + completion of any kind -> Idle
        (GateState::Busy, Event::AppendSucceeded) => Ok(TransitionResult::new(GateState::Idle)
            .with_effect(Effect::became_idle(IdleOutcome::Completed))),

        (GateState::Busy, Event::AppendFailed) => Ok(TransitionResult::new(GateState::Idle)
            .with_effect(Effect::became_idle(IdleOutcome::Failed))),

        (GateState::Busy, Event::AppendAbandoned) => Ok(TransitionResult::new(GateState::Idle)
            .with_effect(Effect::became_idle(IdleOutcome::Abandoned))),

        (GateState::Idle, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while idle"
        ))),
    }
}
