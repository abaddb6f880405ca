//! Interactive terminal session
//!
//! Runs one course in-process against the same runtime the server uses, with
//! the terminal standing in for the learner. Progress is stored in the same
//! database, so an interrupted course picks up where it stopped.

mod render;
mod terminal;

pub use terminal::TerminalLearner;

use crate::collaborators::Collaborators;
use crate::config::TeachingConfig;
use crate::db::{Database, DbError};
use crate::runtime::{recover_session, DatabaseStore, SessionRuntime, SseEvent};
use crate::state_machine::{Event, Phase, SessionContext, SessionState};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

pub const DEFAULT_SESSION_ID: &str = "cli-session";
const DEFAULT_BACKGROUND: &str = "No background provided";

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("session runtime stopped unexpectedly")]
    RuntimeStopped,
}

#[derive(Debug, Clone)]
pub struct LearnOptions {
    pub topic: Option<String>,
    pub background: Option<String>,
    pub session_id: String,
}

/// Run a course in the terminal until it completes or the learner stops.
pub async fn learn(
    db: Database,
    collaborators: Arc<dyn Collaborators>,
    config: TeachingConfig,
    options: LearnOptions,
) -> Result<(), CliError> {
    let learner = Arc::new(TerminalLearner::stdin());
    // Only this course; other sessions may belong to a running server
    recover_session(&db, &options.session_id)?;

    let Some((state, resumed)) = open_session(&db, &learner, &options).await? else {
        println!("No topic provided. Exiting.");
        return Ok(());
    };

    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, mut broadcast_rx) = broadcast::channel(128);
    let runtime = SessionRuntime::new(
        SessionContext::new(&options.session_id, &config),
        &config,
        state.clone(),
        DatabaseStore::new(db),
        collaborators,
        Arc::clone(&learner),
        event_rx,
        event_tx.clone(),
        broadcast_tx,
    );
    let runtime_task = tokio::spawn(runtime.run());

    let first = if resumed { Event::Resume } else { Event::Start };
    event_tx
        .send(first)
        .await
        .map_err(|_| CliError::RuntimeStopped)?;

    let mut view = View::new(&state, config.passing_threshold);
    loop {
        let event = match broadcast_rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Terminal fell behind the session");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Err(CliError::RuntimeStopped),
        };

        match event {
            SseEvent::Snapshot { state, .. } => match serde_json::from_value(state) {
                Ok(state) => view.show(&state),
                Err(e) => tracing::warn!(error = %e, "Unreadable snapshot"),
            },
            SseEvent::Completed { message } => {
                println!("\n{}", render::boxed(&message, '='));
                break;
            }
            SseEvent::Halted { step, error } => {
                println!("\nThe {step} step failed: {error}");
                let retry = learner.prompt("Retry? (y/n): ").await;
                if retry.is_some_and(|r| r.trim().eq_ignore_ascii_case("y")) {
                    event_tx
                        .send(Event::Resume)
                        .await
                        .map_err(|_| CliError::RuntimeStopped)?;
                } else {
                    println!("Progress saved. Run again with the same session id to continue.");
                    break;
                }
            }
            SseEvent::Error { message } => println!("\nError: {message}"),
            SseEvent::Init { .. } | SseEvent::AwaitingInput { .. } => {}
        }
    }

    drop(event_tx);
    runtime_task.abort();
    Ok(())
}

/// Load the stored session or start a new one. Returns `None` without a topic.
async fn open_session(
    db: &Database,
    learner: &TerminalLearner,
    options: &LearnOptions,
) -> Result<Option<(SessionState, bool)>, CliError> {
    match db.get_session(&options.session_id) {
        Ok(session) if !session.state.phase.is_done() => {
            println!(
                "Resuming \"{}\" ({}).",
                session.state.topic,
                session.state.phase.name()
            );
            let resumed = matches!(session.state.phase, Phase::Halted { .. });
            return Ok(Some((session.state, resumed)));
        }
        Ok(_) => {
            println!("Previous course in {} is complete; starting fresh.", options.session_id);
            db.delete_session(&options.session_id)?;
        }
        Err(DbError::SessionNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let topic = match &options.topic {
        Some(topic) => topic.trim().to_string(),
        None => learner
            .prompt("What would you like to learn? ")
            .await
            .unwrap_or_default()
            .trim()
            .to_string(),
    };
    if topic.is_empty() {
        return Ok(None);
    }

    let background = match &options.background {
        Some(background) => background.trim().to_string(),
        None => learner
            .prompt("Your background (optional, press Enter to skip): ")
            .await
            .unwrap_or_default()
            .trim()
            .to_string(),
    };
    let background = if background.is_empty() {
        DEFAULT_BACKGROUND.to_string()
    } else {
        background
    };

    let state = SessionState::new(&topic, &background);
    db.create_session(&options.session_id, &state)?;
    Ok(Some((state, false)))
}

/// Tracks what the learner has already seen
struct View {
    passing_threshold: u32,
    plan_shown: bool,
    last_message: Option<String>,
    last_phase: Phase,
}

impl View {
    fn new(state: &SessionState, passing_threshold: u32) -> Self {
        Self {
            passing_threshold,
            plan_shown: state.learning_plan.is_some(),
            last_message: state.message.clone(),
            last_phase: state.phase.clone(),
        }
    }

    fn show(&mut self, state: &SessionState) {
        if self.last_phase == state.phase {
            return;
        }
        self.last_phase = state.phase.clone();

        if !self.plan_shown {
            if let Some(plan) = &state.learning_plan {
                println!("{}", render::plan(plan));
                self.plan_shown = true;
            }
        }
        if state.message.is_some() && state.message != self.last_message {
            if let Some(message) = &state.message {
                println!("{}", render::message(message));
            }
            self.last_message.clone_from(&state.message);
        }

        match state.phase {
            Phase::Lecture => {
                if let Some(lesson) = state.current_lesson() {
                    println!(
                        "\nLesson {} of {}: {}",
                        state.current_lesson_idx + 1,
                        state.total_lessons(),
                        lesson.title
                    );
                }
            }
            Phase::Quiz => {
                if let Some(lecture) = &state.lecture_content {
                    println!("{}", render::lecture(lecture));
                }
            }
            Phase::Assignment => {
                println!("\n{}", render::quiz_score(state.quiz_score, self.passing_threshold));
            }
            Phase::Decide => match &state.grading_result {
                Some(result) => println!("{}", render::grading(result)),
                None => println!("{}", render::blank_submission(&state.weak_points)),
            },
            _ => {}
        }
    }
}
