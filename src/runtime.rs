//! Runtime for executing teaching sessions
//!
//! Each running session owns an event loop task. Clients talk to it through
//! a [`SessionHandle`] and follow it through a broadcast of [`SseEvent`]s.

mod executor;
mod recovery;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use recovery::{recover_interrupted, recover_session};
pub use traits::*;

use crate::artifacts::{Assignment, Quiz, QuizAnswers};
use crate::collaborators::Collaborators;
use crate::config::TeachingConfig;
use crate::db::{Database, DbError, Session};
use crate::error::StepError;
use crate::state_machine::{Event, SessionContext, SessionState, Step};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = SessionRuntime<DatabaseStore, dyn Collaborators, ChannelLearner>;

/// Input the session is waiting for, as sent to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AwaitedInput {
    Quiz { quiz: Quiz },
    Assignment { assignment: Assignment },
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        session: serde_json::Value,
        awaiting: Option<InputKind>,
    },
    Snapshot {
        state: serde_json::Value,
        sequence_id: i64,
    },
    AwaitingInput {
        input: AwaitedInput,
    },
    Completed {
        message: String,
    },
    Halted {
        step: Step,
        error: StepError,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Session {0} is finished")]
    Finished(String),
    #[error("Session {0} is not running")]
    NotRunning(String),
    #[error(transparent)]
    Inbox(#[from] InboxError),
    #[error("Session {0} stopped accepting events")]
    Closed(String),
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pub inbox: LearnerInbox,
    /// Stops the event loop and any running step
    pub shutdown: CancellationToken,
}

/// Manager for all session runtimes
pub struct SessionManager {
    db: Database,
    collaborators: Arc<dyn Collaborators>,
    config: TeachingConfig,
    runtimes: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl SessionManager {
    pub fn new(db: Database, collaborators: Arc<dyn Collaborators>, config: TeachingConfig) -> Self {
        Self {
            db,
            collaborators,
            config,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &TeachingConfig {
        &self.config
    }

    /// Create a session and start planning
    pub async fn start_session(
        &self,
        session_id: Option<String>,
        topic: &str,
        background: &str,
    ) -> Result<Session, RuntimeError> {
        let id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let session = self.db.create_session(&id, &SessionState::new(topic, background))?;
        tracing::info!(session_id = %id, topic = %topic, "Created session");

        let handle = self.get_or_create(&id).await?;
        handle
            .event_tx
            .send(Event::Start)
            .await
            .map_err(|_| RuntimeError::Closed(id))?;
        Ok(session)
    }

    /// Get or create a runtime for a session
    pub async fn get_or_create(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(session_id) {
                return Ok(handle.clone());
            }
        }

        let session = self.db.get_session(session_id)?;
        if session.state.phase.is_done() {
            return Err(RuntimeError::Finished(session_id.to_string()));
        }

        let mut runtimes = self.runtimes.write().await;
        // Another caller may have started it while we read the database
        if let Some(handle) = runtimes.get(session_id) {
            return Ok(handle.clone());
        }

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (learner, inbox) = ChannelLearner::new();
        let shutdown = CancellationToken::new();

        let runtime: ProductionRuntime = SessionRuntime::new(
            SessionContext::new(session_id, &self.config),
            &self.config,
            session.state,
            DatabaseStore::new(self.db.clone()),
            Arc::clone(&self.collaborators),
            Arc::new(learner),
            event_rx,
            event_tx.clone(),
            broadcast_tx.clone(),
        )
        .with_shutdown(shutdown.clone());

        let handle = SessionHandle {
            event_tx,
            broadcast_tx,
            inbox,
            shutdown,
        };
        runtimes.insert(session_id.to_string(), handle.clone());

        let registry = Arc::clone(&self.runtimes);
        let id = session_id.to_string();
        let own_tx = handle.event_tx.clone();
        tokio::spawn(async move {
            runtime.run().await;
            let mut runtimes = registry.write().await;
            // A deleted session may already have been recreated under the same id
            if runtimes
                .get(&id)
                .is_some_and(|h| h.event_tx.same_channel(&own_tx))
            {
                runtimes.remove(&id);
            }
            tracing::info!(session_id = %id, "Session runtime finished");
        });

        Ok(handle)
    }

    /// Handle of a session whose runtime is already up
    async fn running(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        self.runtimes
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotRunning(session_id.to_string()))
    }

    /// Input a running session is waiting for
    pub async fn awaiting(&self, session_id: &str) -> Option<InputKind> {
        self.runtimes
            .read()
            .await
            .get(session_id)
            .and_then(|h| h.inbox.awaiting())
    }

    /// Send an event to a session, starting its runtime if needed
    pub async fn send_event(&self, session_id: &str, event: Event) -> Result<(), RuntimeError> {
        let handle = self.get_or_create(session_id).await?;
        let Err(mpsc::error::SendError(event)) = handle.event_tx.send(event).await else {
            return Ok(());
        };

        // The runtime stopped after the lookup; drop its handle and go again
        {
            let mut runtimes = self.runtimes.write().await;
            if runtimes
                .get(session_id)
                .is_some_and(|h| h.event_tx.is_closed())
            {
                runtimes.remove(session_id);
            }
        }
        let handle = self.get_or_create(session_id).await?;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed(session_id.to_string()))
    }

    /// Subscribe to a session's events.
    ///
    /// Finished sessions have no runtime; they get the stored state and no receiver.
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(SseEvent, Option<broadcast::Receiver<SseEvent>>), RuntimeError> {
        let handle = match self.get_or_create(session_id).await {
            Ok(handle) => Some(handle),
            Err(RuntimeError::Finished(_)) => None,
            Err(e) => return Err(e),
        };
        // Subscribe before reading state so nothing falls in between
        let rx = handle.as_ref().map(|h| h.broadcast_tx.subscribe());
        let session = self.db.get_session(session_id)?;
        let init = SseEvent::Init {
            session: serde_json::to_value(&session).unwrap_or_default(),
            awaiting: handle.as_ref().and_then(|h| h.inbox.awaiting()),
        };
        Ok((init, rx))
    }

    pub async fn submit_quiz(&self, session_id: &str, answers: QuizAnswers) -> Result<(), RuntimeError> {
        let handle = self.running(session_id).await?;
        handle.inbox.submit(LearnerInput::QuizAnswers(answers)).await?;
        Ok(())
    }

    pub async fn submit_assignment(&self, session_id: &str, submission: String) -> Result<(), RuntimeError> {
        let handle = self.running(session_id).await?;
        handle.inbox.submit(LearnerInput::Submission(submission)).await?;
        Ok(())
    }

    pub async fn cancel(&self, session_id: &str) -> Result<(), RuntimeError> {
        self.send_event(session_id, Event::Cancel).await
    }

    pub async fn resume(&self, session_id: &str) -> Result<(), RuntimeError> {
        self.send_event(session_id, Event::Resume).await
    }

    /// Stop a session's runtime, if any, and delete it
    pub async fn delete(&self, session_id: &str) -> Result<(), RuntimeError> {
        if let Some(handle) = self.runtimes.write().await.remove(session_id) {
            handle.shutdown.cancel();
        }
        self.db.delete_session(session_id)?;
        tracing::info!(session_id = %session_id, "Deleted session");
        Ok(())
    }
}
