//! Session runtime executor
//!
//! Feeds events through the pure transition function and carries out the
//! effects it returns. Collaborator steps run as background tasks and report
//! back through the event channel, so the loop never blocks on them.

use super::traits::{InputKind, Learner, SnapshotStore};
use super::{AwaitedInput, SseEvent};
use crate::artifacts::{answer_key, validated, Question};
use crate::collaborators::{current_lesson, Collaborators, LectureBrief, Milestone, ProgressReport};
use crate::config::TeachingConfig;
use crate::error::StepError;
use crate::scoring::{pending_evaluations, score_quiz};
use crate::state_machine::{
    transition, Effect, Event, GradeOutcome, Notice, SessionContext, SessionState, Step,
    TransitionError, COMPLETION_MESSAGE,
};
use crate::tools::ToolContext;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

pub struct SessionRuntime<S, C: ?Sized, L: ?Sized>
where
    S: SnapshotStore,
    C: Collaborators + 'static,
    L: Learner + 'static,
{
    context: SessionContext,
    state: SessionState,
    store: S,
    collaborators: Arc<C>,
    learner: Arc<L>,
    step_timeout: Duration,
    learner_timeout: Option<Duration>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    /// Token of the step currently in flight
    step_cancel: Option<CancellationToken>,
    shutdown: CancellationToken,
}

impl<S, C: ?Sized, L: ?Sized> SessionRuntime<S, C, L>
where
    S: SnapshotStore,
    C: Collaborators + 'static,
    L: Learner + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        config: &TeachingConfig,
        state: SessionState,
        store: S,
        collaborators: Arc<C>,
        learner: Arc<L>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
    ) -> Self {
        Self {
            context,
            state,
            store,
            collaborators,
            learner,
            step_timeout: config.step_timeout,
            learner_timeout: config.learner_timeout,
            event_rx,
            event_tx,
            broadcast_tx,
            step_cancel: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop the loop when this token is cancelled
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            phase = self.state.phase.name(),
            "Starting session runtime"
        );

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event).await {
                        tracing::error!(session_id = %self.context.session_id, error = %e, "Error handling event");
                        let _ = self.broadcast_tx.send(SseEvent::Error { message: e });
                    }
                    if self.state.phase.is_done() {
                        break;
                    }
                }
                else => break,
            }
        }

        if let Some(token) = self.step_cancel.take() {
            token.cancel();
        }
        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), String> {
        // Effects can feed events straight back in
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();
            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(TransitionError::Invariant(message)) => {
                    let Some(step) = self.state.phase.step() else {
                        return Err(TransitionError::Invariant(message).to_string());
                    };
                    tracing::error!(
                        session_id = %self.context.session_id,
                        step = %step,
                        error = %message,
                        "State invariant violated"
                    );
                    events_to_process.push(Event::StepFailed {
                        step,
                        error: StepError::invariant(message),
                    });
                    continue;
                }
                Err(e) => return Err(e.to_string()),
            };

            tracing::debug!(
                session_id = %self.context.session_id,
                event = event_name,
                from = self.state.phase.name(),
                to = result.new_state.phase.name(),
                "Transition"
            );
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await? {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Event>, String> {
        match effect {
            Effect::PersistState => {
                let sequence_id = self
                    .store
                    .save_snapshot(&self.context.session_id, &self.state)
                    .await?;
                let _ = self.broadcast_tx.send(SseEvent::Snapshot {
                    state: serde_json::to_value(&self.state).unwrap_or_default(),
                    sequence_id,
                });
                Ok(None)
            }

            Effect::PersistHalt => {
                self.store
                    .save_state(&self.context.session_id, &self.state)
                    .await?;
                Ok(None)
            }

            Effect::Invoke { step } => {
                self.spawn_step(step);
                Ok(None)
            }

            Effect::Proceed => Ok(Some(Event::Proceed)),

            Effect::AbortStep => {
                if let Some(token) = self.step_cancel.take() {
                    token.cancel();
                }
                Ok(None)
            }

            Effect::NotifyClient(notice) => {
                let event = match notice {
                    Notice::Completed => {
                        tracing::info!(session_id = %self.context.session_id, "Session completed");
                        SseEvent::Completed {
                            message: self
                                .state
                                .message
                                .clone()
                                .unwrap_or_else(|| COMPLETION_MESSAGE.to_string()),
                        }
                    }
                    Notice::Halted { step, error } => {
                        tracing::warn!(
                            session_id = %self.context.session_id,
                            step = %step,
                            error = %error,
                            "Session halted"
                        );
                        SseEvent::Halted { step, error }
                    }
                };
                let _ = self.broadcast_tx.send(event);
                Ok(None)
            }
        }
    }

    /// Run a step in the background; its result comes back as an event.
    fn spawn_step(&mut self, step: Step) {
        if let Some(previous) = self.step_cancel.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.step_cancel = Some(cancel.clone());

        let job = StepJob {
            step,
            state: self.state.clone(),
            passing_threshold: self.context.passing_threshold,
            collaborators: Arc::clone(&self.collaborators),
            learner: Arc::clone(&self.learner),
            broadcast_tx: self.broadcast_tx.clone(),
            ctx: ToolContext::new(cancel.child_token(), self.context.session_id.clone()),
            step_timeout: self.step_timeout,
            learner_timeout: self.learner_timeout,
        };
        let learner = Arc::clone(&self.learner);
        let event_tx = self.event_tx.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = job.run() => Some(result),
            };
            learner.set_awaiting(None);

            let Some(result) = result else {
                tracing::info!(session_id = %session_id, step = %step, "Step aborted");
                return;
            };
            let event = match result {
                Ok(event) => {
                    tracing::info!(
                        session_id = %session_id,
                        step = %step,
                        duration_ms = %started.elapsed().as_millis(),
                        "Step finished"
                    );
                    event
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = %session_id,
                        step = %step,
                        duration_ms = %started.elapsed().as_millis(),
                        error = %error,
                        "Step failed"
                    );
                    Event::StepFailed { step, error }
                }
            };
            let _ = event_tx.send(event).await;
        });
    }
}

/// Everything one step needs, detached from the runtime.
struct StepJob<C: ?Sized, L: ?Sized> {
    step: Step,
    state: SessionState,
    passing_threshold: u32,
    collaborators: Arc<C>,
    learner: Arc<L>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    ctx: ToolContext,
    step_timeout: Duration,
    learner_timeout: Option<Duration>,
}

impl<C, L> StepJob<C, L>
where
    C: Collaborators + ?Sized,
    L: Learner + ?Sized,
{
    async fn run(self) -> Result<Event, StepError> {
        let ctx = &self.ctx;
        let collaborators = &*self.collaborators;
        let state = &self.state;

        match self.step {
            Step::Plan => {
                let plan = self
                    .call("plan", collaborators.generate_plan(ctx, &state.topic, &state.background))
                    .await?;
                Ok(Event::PlanReady {
                    plan: validated(plan)?,
                })
            }
            Step::CheckProgress => Ok(Event::Proceed),
            Step::Lecture => {
                let brief = LectureBrief::from_state(state)?;
                let lecture = self
                    .call("lecture", collaborators.deliver_lecture(ctx, &brief))
                    .await?;
                Ok(Event::LectureReady {
                    lecture: validated(lecture)?,
                })
            }
            Step::Quiz => self.quiz().await,
            Step::Assignment => self.assignment().await,
            Step::Grade => self.grade().await,
            Step::Decide => {
                let report = ProgressReport::from_state(state, self.passing_threshold)?;
                let advice = self
                    .call("progress assessment", collaborators.assess_progress(ctx, &report))
                    .await?;
                Ok(Event::ProgressAssessed {
                    advice: validated(advice)?,
                })
            }
            Step::RepeatMessage => {
                let report = ProgressReport::from_state(state, self.passing_threshold)?;
                let message = self
                    .call("repeat message", collaborators.compose_repeat_message(ctx, &report))
                    .await?;
                Ok(Event::MessageComposed {
                    message: validated(message)?.render(),
                })
            }
            Step::AdvanceMessage => {
                let milestone = Milestone::from_state(state)?;
                let message = self
                    .call("advance message", collaborators.compose_advance_message(ctx, &milestone))
                    .await?;
                Ok(Event::MessageComposed {
                    message: validated(message)?.render(),
                })
            }
        }
    }

    async fn quiz(&self) -> Result<Event, StepError> {
        let lesson = current_lesson(&self.state)?;
        let lecture = self
            .state
            .lecture_content
            .as_ref()
            .ok_or_else(|| StepError::invariant("quiz requested before the lecture"))?;

        let quiz = self
            .call("quiz", self.collaborators.create_quiz(&self.ctx, lesson, lecture))
            .await?;
        let quiz = validated(quiz)?;

        let answers = self
            .await_learner(
                InputKind::Quiz,
                AwaitedInput::Quiz { quiz: quiz.clone() },
                self.learner.answer_quiz(&quiz),
            )
            .await?;

        let mut verdicts = BTreeMap::new();
        for idx in pending_evaluations(&quiz, &answers) {
            let Some(Question::ShortAnswer(question)) = quiz.questions.get(idx) else {
                continue;
            };
            let answer = answers.get(&answer_key(idx)).map_or("", String::as_str);
            let evaluation = self
                .call(
                    "short answer evaluation",
                    self.collaborators.evaluate_short_answer(&self.ctx, question, answer),
                )
                .await?;
            verdicts.insert(idx, validated(evaluation)?.is_correct);
        }

        let outcome = score_quiz(quiz, answers, &verdicts);
        tracing::info!(
            session_id = %self.ctx.session_id,
            score = outcome.score,
            correct = outcome.correct,
            "Quiz scored"
        );
        Ok(Event::QuizScored { outcome })
    }

    async fn assignment(&self) -> Result<Event, StepError> {
        let lesson = current_lesson(&self.state)?;
        let assignment = self
            .call(
                "assignment",
                self.collaborators.create_assignment(
                    &self.ctx,
                    lesson,
                    self.state.quiz_score,
                    &self.state.weak_points,
                ),
            )
            .await?;
        let assignment = validated(assignment)?;

        let submission = self
            .await_learner(
                InputKind::Assignment,
                AwaitedInput::Assignment {
                    assignment: assignment.clone(),
                },
                self.learner.submit_assignment(&assignment),
            )
            .await?;

        Ok(Event::AssignmentSubmitted {
            assignment,
            submission,
        })
    }

    async fn grade(&self) -> Result<Event, StepError> {
        let lesson = current_lesson(&self.state)?;
        let (Some(assignment), Some(submission)) = (
            self.state.assignment.as_ref(),
            self.state.assignment_submission.as_ref(),
        ) else {
            return Err(StepError::invariant("grading requested before a submission"));
        };

        if submission.trim().is_empty() {
            return Ok(Event::Graded {
                outcome: GradeOutcome::Blank {
                    weak_points: lesson.key_concepts.clone(),
                },
            });
        }

        let result = self
            .call(
                "grading",
                self.collaborators
                    .grade_submission(&self.ctx, lesson, assignment, submission),
            )
            .await?;
        Ok(Event::Graded {
            outcome: GradeOutcome::Graded(validated(result)?),
        })
    }

    /// One collaborator call, bounded by the step timeout
    async fn call<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, StepError>> + Send,
    ) -> Result<T, StepError> {
        tokio::time::timeout(self.step_timeout, call)
            .await
            .unwrap_or_else(|_| Err(StepError::timeout(what, self.step_timeout)))
    }

    /// Announce what the session waits for, then wait on the learner
    async fn await_learner<T>(
        &self,
        kind: InputKind,
        input: AwaitedInput,
        wait: impl Future<Output = Result<T, StepError>> + Send,
    ) -> Result<T, StepError> {
        self.learner.set_awaiting(Some(kind));
        let _ = self.broadcast_tx.send(SseEvent::AwaitingInput { input });
        tracing::info!(
            session_id = %self.ctx.session_id,
            input = kind.as_str(),
            "Waiting for learner"
        );

        let result = match self.learner_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .unwrap_or_else(|_| Err(StepError::timeout("learner input", limit))),
            None => wait.await,
        };
        self.learner.set_awaiting(None);
        result
    }
}
