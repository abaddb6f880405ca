//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result. All I/O is described by the returned effects.

use super::decision::decide;
use super::event::GradeOutcome;
use super::state::{Phase, SessionContext, SessionState, Step};
use super::{Effect, Event};
use crate::artifacts::{ProgressDecision, ProgressVerdict};
use crate::config::DecisionPolicy;
use crate::error::StepError;
use thiserror::Error;

pub const COMPLETION_MESSAGE: &str = "Course completed successfully!";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session already completed")]
    SessionCompleted,
    #[error("State invariant violated: {0}")]
    Invariant(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &SessionState,
    ctx: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        (Phase::Done, _) => Err(TransitionError::SessionCompleted),

        // ============================================================
        // Planning
        // ============================================================
        (Phase::Plan, Event::Start) if state.learning_plan.is_none() => {
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::PersistState)
                .with_effect(Effect::invoke(Step::Plan)))
        }

        (Phase::Plan, Event::PlanReady { plan }) => {
            if state.learning_plan.is_some() {
                return Err(TransitionError::Invariant(
                    "learning plan is set once per session".to_string(),
                ));
            }
            let mut next = state.clone();
            // An empty course is finished before it starts
            next.completed = plan.is_empty();
            next.learning_plan = Some(plan);
            next.current_lesson_idx = 0;
            next.attempt_count = 0;
            next.weak_points.clear();
            next.phase = Phase::CheckProgress;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::Proceed))
        }

        // ============================================================
        // Lesson progression
        // ============================================================
        (Phase::CheckProgress, Event::Proceed) => {
            let total = plan_len(state)?;
            let mut next = state.clone();
            if state.current_lesson_idx >= total {
                if state.current_lesson_idx > total {
                    return Err(out_of_bounds(state.current_lesson_idx, total));
                }
                next.phase = Phase::Done;
                next.completed = true;
                next.message = Some(COMPLETION_MESSAGE.to_string());
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::PersistState)
                    .with_effect(Effect::notify_completed()))
            } else {
                next.phase = Phase::Lecture;
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::PersistState)
                    .with_effect(Effect::invoke(Step::Lecture)))
            }
        }

        (Phase::Lecture, Event::LectureReady { lecture }) => {
            require_lesson(state)?;
            let mut next = state.clone();
            next.lecture_content = Some(lecture);
            next.phase = Phase::Quiz;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::invoke(Step::Quiz)))
        }

        (Phase::Quiz, Event::QuizScored { outcome }) => {
            require_lesson(state)?;
            if state.lecture_content.is_none() {
                return Err(TransitionError::Invariant(
                    "quiz scored before the lecture was delivered".to_string(),
                ));
            }
            let mut next = state.clone();
            next.quiz_results = Some(outcome.quiz);
            next.quiz_answers = Some(outcome.answers);
            next.quiz_score = outcome.score;
            next.weak_points = outcome.weak_points;
            next.phase = Phase::Assignment;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::invoke(Step::Assignment)))
        }

        (
            Phase::Assignment,
            Event::AssignmentSubmitted {
                assignment,
                submission,
            },
        ) => {
            require_lesson(state)?;
            let mut next = state.clone();
            next.assignment = Some(assignment);
            next.assignment_submission = Some(submission);
            next.phase = Phase::Grade;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::invoke(Step::Grade)))
        }

        (Phase::Grade, Event::Graded { outcome }) => {
            require_lesson(state)?;
            if state.assignment_submission.is_none() {
                return Err(TransitionError::Invariant(
                    "graded before a submission was recorded".to_string(),
                ));
            }
            let mut next = state.clone();
            next.assignment_score = outcome.score();
            match outcome {
                GradeOutcome::Graded(result) => {
                    next.weak_points.clone_from(&result.weak_points);
                    next.grading_result = Some(result);
                }
                GradeOutcome::Blank { weak_points } => {
                    next.weak_points = weak_points;
                    next.grading_result = None;
                }
            }
            next.phase = Phase::Decide;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(decide_effect(ctx)))
        }

        // ============================================================
        // Decision
        // ============================================================
        (Phase::Decide, Event::Proceed) if ctx.decision_policy == DecisionPolicy::Threshold => {
            apply_decision(state, ctx, None)
        }

        (Phase::Decide, Event::ProgressAssessed { advice })
            if ctx.decision_policy == DecisionPolicy::Advisor =>
        {
            apply_decision(state, ctx, Some(&advice))
        }

        (Phase::RepeatMessage, Event::MessageComposed { message }) => {
            let mut next = state.clone();
            next.message = Some(message);
            next.phase = Phase::Lecture;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::invoke(Step::Lecture)))
        }

        (Phase::AdvanceMessage, Event::MessageComposed { message }) => {
            let mut next = state.clone();
            next.message = Some(message);
            next.phase = Phase::CheckProgress;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::Proceed))
        }

        // ============================================================
        // Failure, cancellation, resumption
        // ============================================================
        (phase, Event::StepFailed { step, error }) if phase.step() == Some(step) => {
            Ok(halt(state, step, error))
        }

        (phase, Event::Cancel) => match phase.step() {
            Some(step) => Ok(halt(state, step, StepError::Cancelled)
                .with_effects([Effect::AbortStep])),
            None => Err(TransitionError::InvalidTransition(
                "no step is running".to_string(),
            )),
        },

        (Phase::Halted { step, .. }, Event::Resume) => {
            let step = *step;
            let mut next = state.clone();
            next.phase = step.phase();
            let effect = match step {
                Step::CheckProgress => Effect::Proceed,
                Step::Decide => decide_effect(ctx),
                other => Effect::invoke(other),
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistState)
                .with_effect(effect))
        }

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {}",
            phase.name(),
            event.name()
        ))),
    }
}

fn decide_effect(ctx: &SessionContext) -> Effect {
    match ctx.decision_policy {
        DecisionPolicy::Threshold => Effect::Proceed,
        DecisionPolicy::Advisor => Effect::invoke(Step::Decide),
    }
}

/// Move to `Halted`, leaving every record field as it was.
fn halt(state: &SessionState, step: Step, error: StepError) -> TransitionResult {
    let mut next = state.clone();
    next.phase = Phase::Halted {
        step,
        error: error.clone(),
    };
    TransitionResult::new(next)
        .with_effect(Effect::PersistHalt)
        .with_effect(Effect::notify_halted(step, error))
}

fn apply_decision(
    state: &SessionState,
    ctx: &SessionContext,
    advice: Option<&ProgressDecision>,
) -> Result<TransitionResult, TransitionError> {
    let total = plan_len(state)?;
    require_lesson(state)?;

    let record = decide(state, ctx, advice);
    let mut next = state.clone();

    let step = match record.verdict {
        ProgressVerdict::Advance => {
            next.current_lesson_idx = state.current_lesson_idx + 1;
            next.attempt_count = 0;
            next.clear_attempt();
            next.weak_points.clear();
            next.completed = next.current_lesson_idx >= total;
            Step::AdvanceMessage
        }
        ProgressVerdict::Repeat => {
            next.attempt_count = state.attempt_count + 1;
            next.clear_attempt();
            Step::RepeatMessage
        }
    };
    next.decision = Some(record);
    next.phase = step.phase();

    Ok(TransitionResult::new(next)
        .with_effect(Effect::PersistState)
        .with_effect(Effect::invoke(step)))
}

fn plan_len(state: &SessionState) -> Result<usize, TransitionError> {
    state
        .learning_plan
        .as_ref()
        .map(crate::artifacts::LearningPlan::len)
        .ok_or_else(|| TransitionError::Invariant("no learning plan".to_string()))
}

fn require_lesson(state: &SessionState) -> Result<(), TransitionError> {
    let total = plan_len(state)?;
    if state.current_lesson_idx < total {
        Ok(())
    } else {
        Err(out_of_bounds(state.current_lesson_idx, total))
    }
}

fn out_of_bounds(idx: usize, total: usize) -> TransitionError {
    TransitionError::Invariant(format!(
        "lesson index {idx} out of bounds for a plan of {total} lessons"
    ))
}
