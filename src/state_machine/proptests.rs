//! Property-based tests for the state machine
//!
//! A random learner is driven through whole sessions and the record
//! invariants are checked after every transition.

use super::event::GradeOutcome;
use super::state::*;
use super::transition::*;
use super::*;
use crate::artifacts::{fixtures, ProgressVerdict};
use crate::config::{DecisionPolicy, TeachingConfig};
use crate::error::StepError;
use crate::scoring::QuizOutcome;
use proptest::prelude::*;

/// Upper bound on events fed into one simulated session.
const MAX_EVENTS: usize = 400;

// ============================================================================
// Test Helpers
// ============================================================================

fn context(max_attempts: Option<u32>, policy: DecisionPolicy) -> SessionContext {
    let config = TeachingConfig {
        max_attempts,
        decision_policy: policy,
        ..TeachingConfig::default()
    };
    SessionContext::new("prop-session", &config)
}

/// How the simulated learner and collaborators behave at one step.
#[derive(Debug, Clone)]
struct Turn {
    quiz_score: u32,
    assignment_score: u32,
    blank_submission: bool,
    failure: Option<StepError>,
    cancel: bool,
    advise_advance: bool,
}

fn arb_step_error() -> impl Strategy<Value = StepError> {
    prop_oneof![
        Just(StepError::transport("connection reset")),
        Just(StepError::validation("Lecture", vec!["segments".to_string()])),
        Just(StepError::invariant("index")),
    ]
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    (
        0u32..=100,
        0u32..=100,
        prop::bool::weighted(0.1),
        prop::option::weighted(0.1, arb_step_error()),
        prop::bool::weighted(0.05),
        any::<bool>(),
    )
        .prop_map(
            |(quiz_score, assignment_score, blank_submission, failure, cancel, advise_advance)| {
                Turn {
                    quiz_score,
                    assignment_score,
                    blank_submission,
                    failure,
                    cancel,
                    advise_advance,
                }
            },
        )
}

fn arb_policy() -> impl Strategy<Value = DecisionPolicy> {
    prop_oneof![Just(DecisionPolicy::Threshold), Just(DecisionPolicy::Advisor)]
}

fn lesson_title(state: &SessionState) -> String {
    state
        .current_lesson()
        .map_or_else(|| "?".to_string(), |l| l.title.clone())
}

/// The event a well-behaved runtime would deliver next.
fn next_event(state: &SessionState, lessons: usize, turn: &Turn) -> Option<Event> {
    if turn.cancel && state.phase.step().is_some_and(|s| s != Step::CheckProgress) {
        return Some(Event::Cancel);
    }
    if let Some(step) = state.phase.step() {
        if let Some(error) = &turn.failure {
            if step != Step::CheckProgress {
                return Some(Event::StepFailed {
                    step,
                    error: error.clone(),
                });
            }
        }
    }

    let title = lesson_title(state);
    let event = match &state.phase {
        Phase::Plan if state.learning_plan.is_none() => Event::PlanReady {
            plan: fixtures::plan(lessons),
        },
        Phase::Plan => return None,
        Phase::CheckProgress => Event::Proceed,
        Phase::Lecture => Event::LectureReady {
            lecture: fixtures::lecture(&title),
        },
        Phase::Quiz => Event::QuizScored {
            outcome: QuizOutcome {
                quiz: fixtures::quiz(&title),
                answers: fixtures::correct_answers(),
                correct: 0,
                score: turn.quiz_score,
                weak_points: if turn.quiz_score < 70 {
                    vec!["a missed question".to_string()]
                } else {
                    vec![]
                },
            },
        },
        Phase::Assignment => Event::AssignmentSubmitted {
            assignment: fixtures::assignment(&title),
            submission: if turn.blank_submission {
                String::new()
            } else {
                "my work".to_string()
            },
        },
        Phase::Grade => Event::Graded {
            outcome: if turn.blank_submission {
                GradeOutcome::Blank {
                    weak_points: vec!["concept".to_string()],
                }
            } else {
                GradeOutcome::Graded(fixtures::grading(f64::from(turn.assignment_score)))
            },
        },
        Phase::Decide => Event::ProgressAssessed {
            advice: fixtures::progress(if turn.advise_advance {
                ProgressVerdict::Advance
            } else {
                ProgressVerdict::Repeat
            }),
        },
        Phase::RepeatMessage | Phase::AdvanceMessage => Event::MessageComposed {
            message: "keep going".to_string(),
        },
        Phase::Halted { .. } => Event::Resume,
        Phase::Done => return None,
    };
    Some(event)
}

/// Feed `Proceed` ticks the way the runtime does for `Effect::Proceed`.
fn settle(
    mut result: TransitionResult,
    ctx: &SessionContext,
    mut check: impl FnMut(&SessionState, &SessionState, &TransitionResult) -> Result<(), TestCaseError>,
    before: &SessionState,
) -> Result<SessionState, TestCaseError> {
    check(before, &result.new_state, &result)?;
    while result.effects.contains(&Effect::Proceed) {
        let prev = result.new_state.clone();
        result = transition(&prev, ctx, Event::Proceed)
            .map_err(|e| TestCaseError::fail(format!("proceed rejected: {e}")))?;
        check(&prev, &result.new_state, &result)?;
    }
    Ok(result.new_state)
}

fn is_valid_state(state: &SessionState) -> bool {
    let Some(plan) = &state.learning_plan else {
        return state.current_lesson_idx == 0 && !state.completed;
    };
    state.current_lesson_idx <= plan.len()
        && state.completed == (state.current_lesson_idx == plan.len())
        && (!state.phase.is_done() || state.completed)
}

fn effects_are_valid(effects: &[Effect], state: &SessionState) -> bool {
    effects.iter().all(|effect| match effect {
        Effect::Invoke { step: Step::Quiz } => state.lecture_content.is_some(),
        Effect::Invoke { step: Step::Grade } => state.assignment_submission.is_some(),
        Effect::Invoke { step } => state.phase.step() == Some(*step),
        Effect::AbortStep | Effect::PersistHalt => state.phase.is_halted(),
        _ => true,
    })
}

fn check_step(
    before: &SessionState,
    after: &SessionState,
    result: &TransitionResult,
) -> Result<(), TestCaseError> {
    prop_assert!(is_valid_state(after), "invalid state: {:?}", after);
    prop_assert!(
        effects_are_valid(&result.effects, after),
        "invalid effects for {:?}: {:?}",
        after.phase,
        result.effects
    );

    if before.phase == Phase::Decide {
        match after.phase {
            Phase::AdvanceMessage => {
                prop_assert_eq!(after.current_lesson_idx, before.current_lesson_idx + 1);
                prop_assert_eq!(after.attempt_count, 0);
                prop_assert!(after.lecture_content.is_none());
                prop_assert!(after.quiz_results.is_none());
                prop_assert!(after.assignment.is_none());
                prop_assert!(after.grading_result.is_none());
                prop_assert!(after.weak_points.is_empty());
            }
            Phase::RepeatMessage => {
                prop_assert_eq!(after.current_lesson_idx, before.current_lesson_idx);
                prop_assert_eq!(after.attempt_count, before.attempt_count + 1);
            }
            _ => {}
        }
    }

    if after.current_lesson_idx < before.current_lesson_idx {
        return Err(TestCaseError::fail("lesson index decreased"));
    }

    if after.phase.is_halted() && !before.phase.is_halted() {
        let mut unchanged = after.clone();
        unchanged.phase = before.phase.clone();
        prop_assert_eq!(&unchanged, before, "halting changed the record");
    }
    Ok(())
}

fn run_session(
    lessons: usize,
    ctx: &SessionContext,
    turns: &[Turn],
) -> Result<SessionState, TestCaseError> {
    let start = SessionState::new("Rust", "");
    let mut state = transition(&start, ctx, Event::Start)
        .map_err(|e| TestCaseError::fail(e.to_string()))?
        .new_state;

    for turn in turns.iter().cycle().take(MAX_EVENTS) {
        let Some(event) = next_event(&state, lessons, turn) else {
            break;
        };
        match transition(&state, ctx, event) {
            Ok(result) => state = settle(result, ctx, check_step, &state)?,
            Err(e) => return Err(TestCaseError::fail(format!("rejected: {e} in {:?}", state.phase))),
        }
    }
    Ok(state)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: every reachable record is valid and every transition
    // respects the advance/repeat/halt rules
    #[test]
    fn prop_sessions_preserve_invariants(
        lessons in 0usize..4,
        max_attempts in prop::option::of(1u32..4),
        policy in arb_policy(),
        turns in proptest::collection::vec(arb_turn(), 1..30),
    ) {
        let ctx = context(max_attempts, policy);
        run_session(lessons, &ctx, &turns)?;
    }

    // Invariant 2: with an attempt cap and no failures every session finishes
    #[test]
    fn prop_bounded_attempts_always_finish(
        lessons in 0usize..4,
        max_attempts in 1u32..4,
        policy in arb_policy(),
        scores in proptest::collection::vec((0u32..=100, 0u32..=100, any::<bool>()), 1..10),
    ) {
        let ctx = context(Some(max_attempts), policy);
        let turns: Vec<Turn> = scores
            .into_iter()
            .map(|(quiz_score, assignment_score, advise_advance)| Turn {
                quiz_score,
                assignment_score,
                blank_submission: false,
                failure: None,
                cancel: false,
                advise_advance,
            })
            .collect();
        let state = run_session(lessons, &ctx, &turns)?;
        prop_assert_eq!(&state.phase, &Phase::Done);
        prop_assert!(state.completed);
        prop_assert_eq!(state.current_lesson_idx, lessons);
        prop_assert_eq!(state.attempt_count, 0);
    }

    // Invariant 3: a finished session accepts nothing
    #[test]
    fn prop_done_is_terminal(turn in arb_turn(), lessons in 0usize..3) {
        let ctx = context(Some(3), DecisionPolicy::Threshold);
        let state = SessionState {
            phase: Phase::Done,
            learning_plan: Some(fixtures::plan(lessons)),
            current_lesson_idx: lessons,
            completed: true,
            ..SessionState::new("Rust", "")
        };
        let events = [
            Event::Proceed,
            Event::Cancel,
            Event::Resume,
            Event::MessageComposed { message: "late".to_string() },
            Event::StepFailed {
                step: Step::Lecture,
                error: turn.failure.unwrap_or(StepError::Cancelled),
            },
        ];
        for event in events {
            prop_assert_eq!(
                transition(&state, &ctx, event).unwrap_err(),
                TransitionError::SessionCompleted
            );
        }
    }

    // Invariant 4: resuming a halted step returns to exactly that step
    #[test]
    fn prop_resume_returns_to_failed_step(error in arb_step_error(), idx in 0usize..9) {
        let steps = [
            Step::Plan,
            Step::CheckProgress,
            Step::Lecture,
            Step::Quiz,
            Step::Assignment,
            Step::Grade,
            Step::Decide,
            Step::RepeatMessage,
            Step::AdvanceMessage,
        ];
        let step = steps[idx];
        let ctx = context(Some(3), DecisionPolicy::Advisor);
        let state = SessionState {
            phase: Phase::Halted { step, error },
            learning_plan: Some(fixtures::plan(2)),
            ..SessionState::new("Rust", "")
        };
        let result = transition(&state, &ctx, Event::Resume).unwrap();
        prop_assert_eq!(&result.new_state.phase, &step.phase());
        let resumed = result.effects.iter().any(|e| {
            *e == Effect::Proceed || *e == Effect::Invoke { step }
        });
        prop_assert!(resumed);
    }
}
