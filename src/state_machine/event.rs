//! Events that drive a session

use super::state::Step;
use crate::artifacts::{Assignment, GradingResult, LearningPlan, Lecture, ProgressDecision};
use crate::error::StepError;
use crate::scoring::QuizOutcome;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Begin a fresh session
    Start,
    /// Internal tick for phases that need no collaborator
    Proceed,

    // Step results
    PlanReady {
        plan: LearningPlan,
    },
    LectureReady {
        lecture: Lecture,
    },
    QuizScored {
        outcome: QuizOutcome,
    },
    AssignmentSubmitted {
        assignment: Assignment,
        submission: String,
    },
    Graded {
        outcome: GradeOutcome,
    },
    ProgressAssessed {
        advice: ProgressDecision,
    },
    MessageComposed {
        message: String,
    },
    StepFailed {
        step: Step,
        error: StepError,
    },

    // Client events
    Cancel,
    Resume,
}

/// What GRADE produced for the submission.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    Graded(GradingResult),
    /// Nothing was submitted, so nothing was sent to the evaluator.
    Blank { weak_points: Vec<String> },
}

impl GradeOutcome {
    pub fn score(&self) -> u32 {
        match self {
            GradeOutcome::Graded(result) => result.whole_score(),
            GradeOutcome::Blank { .. } => 0,
        }
    }
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Proceed => "proceed",
            Event::PlanReady { .. } => "plan_ready",
            Event::LectureReady { .. } => "lecture_ready",
            Event::QuizScored { .. } => "quiz_scored",
            Event::AssignmentSubmitted { .. } => "assignment_submitted",
            Event::Graded { .. } => "graded",
            Event::ProgressAssessed { .. } => "progress_assessed",
            Event::MessageComposed { .. } => "message_composed",
            Event::StepFailed { .. } => "step_failed",
            Event::Cancel => "cancel",
            Event::Resume => "resume",
        }
    }
}
