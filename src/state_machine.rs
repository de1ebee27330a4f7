//! Session gate state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, GateTransition};
pub use event::Event;
pub use state::{GateState, IdleOutcome};
pub use transition::{transition, TransitionError};
