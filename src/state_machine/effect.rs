//! Effects produced by state transitions

use super::state::Step;
use crate::error::StepError;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist the new state as a snapshot and stream it to clients
    PersistState,

    /// Persist the state without recording a snapshot (used on halt)
    PersistHalt,

    /// Run a collaborator step (spawns as background task)
    Invoke { step: Step },

    /// Feed `Event::Proceed` back in without waiting on anything
    Proceed,

    /// Abort the currently running step
    AbortStep,

    /// Notify connected clients
    NotifyClient(Notice),
}

/// Terminal notifications for clients.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Completed,
    Halted { step: Step, error: StepError },
}

impl Effect {
    pub fn invoke(step: Step) -> Self {
        Effect::Invoke { step }
    }

    pub fn notify_completed() -> Self {
        Effect::NotifyClient(Notice::Completed)
    }

    pub fn notify_halted(step: Step, error: StepError) -> Self {
        Effect::NotifyClient(Notice::Halted { step, error })
    }
}
