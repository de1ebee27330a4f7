//! Gate state types

use serde::{Deserialize, Serialize};

/// Whether a submit is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Idle,
    Busy,
}

impl GateState {
    pub fn is_busy(self) -> bool {
        matches!(self, GateState::Busy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateState::Idle => "idle",
            GateState::Busy => "busy",
        }
    }
}

/// How a busy period ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleOutcome {
    /// The service produced a turn
    Completed,
    /// The service call failed
    Failed,
    /// The submitting future was dropped before the call resolved
    Abandoned,
}
