//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::artifacts::{Assignment, Quiz, QuizAnswers};
use crate::db::Database;
use crate::error::StepError;
use crate::state_machine::SessionState;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Storage for session state
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Record a snapshot and make it current. Returns its sequence number.
    async fn save_snapshot(&self, session_id: &str, state: &SessionState) -> Result<i64, String>;

    /// Replace the current state without recording a snapshot
    async fn save_state(&self, session_id: &str, state: &SessionState) -> Result<(), String>;
}

/// What the session is waiting on the learner for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Quiz,
    Assignment,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::Quiz => "quiz",
            InputKind::Assignment => "assignment",
        }
    }
}

/// The person taking the course
#[async_trait]
pub trait Learner: Send + Sync {
    /// Called before the runtime announces that it is waiting, and with
    /// `None` once the wait is over.
    fn set_awaiting(&self, _input: Option<InputKind>) {}

    async fn answer_quiz(&self, quiz: &Quiz) -> Result<QuizAnswers, StepError>;

    async fn submit_assignment(&self, assignment: &Assignment) -> Result<String, StepError>;
}

#[async_trait]
impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    async fn save_snapshot(&self, session_id: &str, state: &SessionState) -> Result<i64, String> {
        (**self).save_snapshot(session_id, state).await
    }

    async fn save_state(&self, session_id: &str, state: &SessionState) -> Result<(), String> {
        (**self).save_state(session_id, state).await
    }
}

#[async_trait]
impl<T: Learner + ?Sized> Learner for Arc<T> {
    fn set_awaiting(&self, input: Option<InputKind>) {
        (**self).set_awaiting(input);
    }

    async fn answer_quiz(&self, quiz: &Quiz) -> Result<QuizAnswers, StepError> {
        (**self).answer_quiz(quiz).await
    }

    async fn submit_assignment(&self, assignment: &Assignment) -> Result<String, StepError> {
        (**self).submit_assignment(assignment).await
    }
}

// ============================================================================
// Production Implementations
// ============================================================================

/// Database-backed snapshot storage
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for DatabaseStore {
    async fn save_snapshot(&self, session_id: &str, state: &SessionState) -> Result<i64, String> {
        self.db
            .save_snapshot(session_id, state)
            .map_err(|e| e.to_string())
    }

    async fn save_state(&self, session_id: &str, state: &SessionState) -> Result<(), String> {
        self.db
            .update_state(session_id, state)
            .map_err(|e| e.to_string())
    }
}

/// Input delivered by a client
#[derive(Debug, Clone)]
pub enum LearnerInput {
    QuizAnswers(QuizAnswers),
    Submission(String),
}

impl LearnerInput {
    pub fn kind(&self) -> InputKind {
        match self {
            LearnerInput::QuizAnswers(_) => InputKind::Quiz,
            LearnerInput::Submission(_) => InputKind::Assignment,
        }
    }
}

/// Why a client's input was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InboxError {
    #[error("session is not waiting for {}", .got.as_str())]
    NotAwaiting { got: InputKind },
    #[error("session is no longer running")]
    Closed,
}

/// Learner fed through a channel by the HTTP API
pub struct ChannelLearner {
    rx: Mutex<mpsc::Receiver<LearnerInput>>,
    awaiting: watch::Sender<Option<InputKind>>,
}

/// Sending half of a [`ChannelLearner`]
#[derive(Clone)]
pub struct LearnerInbox {
    tx: mpsc::Sender<LearnerInput>,
    awaiting: watch::Receiver<Option<InputKind>>,
}

impl ChannelLearner {
    pub fn new() -> (Self, LearnerInbox) {
        let (tx, rx) = mpsc::channel(4);
        let (awaiting_tx, awaiting_rx) = watch::channel(None);
        (
            Self {
                rx: Mutex::new(rx),
                awaiting: awaiting_tx,
            },
            LearnerInbox {
                tx,
                awaiting: awaiting_rx,
            },
        )
    }

    async fn next_input(&self, kind: InputKind) -> Result<LearnerInput, StepError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Some(input) if input.kind() == kind => return Ok(input),
                Some(input) => {
                    tracing::warn!(expected = kind.as_str(), got = input.kind().as_str(), "Dropping unexpected learner input");
                }
                None => return Err(StepError::Cancelled),
            }
        }
    }
}

#[async_trait]
impl Learner for ChannelLearner {
    fn set_awaiting(&self, input: Option<InputKind>) {
        if input.is_some() {
            // Anything left over from an aborted wait is stale
            if let Ok(mut rx) = self.rx.try_lock() {
                while rx.try_recv().is_ok() {}
            }
        }
        self.awaiting.send_replace(input);
    }

    async fn answer_quiz(&self, _quiz: &Quiz) -> Result<QuizAnswers, StepError> {
        match self.next_input(InputKind::Quiz).await? {
            LearnerInput::QuizAnswers(answers) => Ok(answers),
            LearnerInput::Submission(_) => Err(StepError::invariant("expected quiz answers")),
        }
    }

    async fn submit_assignment(&self, _assignment: &Assignment) -> Result<String, StepError> {
        match self.next_input(InputKind::Assignment).await? {
            LearnerInput::Submission(text) => Ok(text),
            LearnerInput::QuizAnswers(_) => Err(StepError::invariant("expected a submission")),
        }
    }
}

impl LearnerInbox {
    /// What the session is currently waiting for, if anything
    pub fn awaiting(&self) -> Option<InputKind> {
        *self.awaiting.borrow()
    }

    /// Hand input to the session. Refused unless the session waits for this kind.
    pub async fn submit(&self, input: LearnerInput) -> Result<(), InboxError> {
        let got = input.kind();
        if self.awaiting() != Some(got) {
            return Err(InboxError::NotAwaiting { got });
        }
        self.tx.send(input).await.map_err(|_| InboxError::Closed)
    }
}
