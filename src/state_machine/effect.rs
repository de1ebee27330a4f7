//! Effects produced by state transitions

use super::state::{GateState, IdleOutcome};
use serde::Serialize;

/// Observable change of the gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateTransition {
    BecameBusy,
    BecameIdle { outcome: IdleOutcome },
}

impl GateTransition {
    /// State the gate is in after this transition
    pub fn target(self) -> GateState {
        match self {
            GateTransition::BecameBusy => GateState::Busy,
            GateTransition::BecameIdle { .. } => GateState::Idle,
        }
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Tell observers the gate changed state
    Publish(GateTransition),

    /// Forward user text to the conversation service
    AppendTurn { text: String },
}

impl Effect {
    pub fn became_idle(outcome: IdleOutcome) -> Self {
        Effect::Publish(GateTransition::BecameIdle { outcome })
    }
}
