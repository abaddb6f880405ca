//! Session recovery on startup
//!
//! A step that was in flight when the process stopped has no task left to
//! report back. Such sessions are halted so the learner can resume them.

use crate::db::{Database, DbError, DbResult, Session};
use crate::error::StepError;
use crate::state_machine::{Phase, SessionState};

/// The halted form of a session that was interrupted mid-step, if it was.
pub fn interrupted(state: &SessionState) -> Option<SessionState> {
    let step = state.phase.step()?;
    let mut halted = state.clone();
    halted.phase = Phase::Halted {
        step,
        error: StepError::Cancelled,
    };
    Some(halted)
}

/// Halt every session left mid-step. Returns the ids that were halted.
pub fn recover_interrupted(db: &Database) -> DbResult<Vec<String>> {
    let mut recovered = Vec::new();
    for session in db.list_sessions()? {
        if halt_if_interrupted(db, &session)? {
            recovered.push(session.id);
        }
    }
    Ok(recovered)
}

/// Halt one session if it was left mid-step. Unknown ids are not an error.
pub fn recover_session(db: &Database, session_id: &str) -> DbResult<bool> {
    match db.get_session(session_id) {
        Ok(session) => halt_if_interrupted(db, &session),
        Err(DbError::SessionNotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn halt_if_interrupted(db: &Database, session: &Session) -> DbResult<bool> {
    let Some(halted) = interrupted(&session.state) else {
        return Ok(false);
    };
    db.update_state(&session.id, &halted)?;
    tracing::info!(
        session_id = %session.id,
        phase = session.state.phase.name(),
        "Halted interrupted session"
    );
    Ok(true)
}
