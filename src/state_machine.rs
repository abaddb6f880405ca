//! Core teaching state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The runtime feeds events in and carries out the returned effects.

pub mod decision;
mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Notice};
pub use event::{Event, GradeOutcome};
pub use state::{Phase, SessionContext, SessionState, Step};
pub use transition::{transition, TransitionError, COMPLETION_MESSAGE};
