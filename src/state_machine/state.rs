//! Session state types

use crate::artifacts::{
    Assignment, GradingResult, LearningPlan, Lecture, Lesson, ProgressVerdict, Quiz, QuizAnswers,
};
use crate::config::{DecisionPolicy, TeachingConfig};
use crate::error::StepError;
use serde::{Deserialize, Serialize};

/// A unit of work the controller can run, and resume after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Plan,
    CheckProgress,
    Lecture,
    Quiz,
    Assignment,
    Grade,
    Decide,
    RepeatMessage,
    AdvanceMessage,
}

impl Step {
    pub fn phase(self) -> Phase {
        match self {
            Step::Plan => Phase::Plan,
            Step::CheckProgress => Phase::CheckProgress,
            Step::Lecture => Phase::Lecture,
            Step::Quiz => Phase::Quiz,
            Step::Assignment => Phase::Assignment,
            Step::Grade => Phase::Grade,
            Step::Decide => Phase::Decide,
            Step::RepeatMessage => Phase::RepeatMessage,
            Step::AdvanceMessage => Phase::AdvanceMessage,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Plan => "plan",
            Step::CheckProgress => "check_progress",
            Step::Lecture => "lecture",
            Step::Quiz => "quiz",
            Step::Assignment => "assignment",
            Step::Grade => "grade",
            Step::Decide => "decide",
            Step::RepeatMessage => "repeat_message",
            Step::AdvanceMessage => "advance_message",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the controller is in the teaching loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Plan,
    CheckProgress,
    Lecture,
    Quiz,
    Assignment,
    Grade,
    Decide,
    RepeatMessage,
    AdvanceMessage,
    Done,
    /// A step failed or was cancelled; `Resume` runs it again.
    Halted { step: Step, error: StepError },
}

impl Phase {
    /// The step that runs while in this phase.
    pub fn step(&self) -> Option<Step> {
        match self {
            Phase::Plan => Some(Step::Plan),
            Phase::CheckProgress => Some(Step::CheckProgress),
            Phase::Lecture => Some(Step::Lecture),
            Phase::Quiz => Some(Step::Quiz),
            Phase::Assignment => Some(Step::Assignment),
            Phase::Grade => Some(Step::Grade),
            Phase::Decide => Some(Step::Decide),
            Phase::RepeatMessage => Some(Step::RepeatMessage),
            Phase::AdvanceMessage => Some(Step::AdvanceMessage),
            Phase::Done | Phase::Halted { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Done => "done",
            Phase::Halted { .. } => "halted",
            other => other.step().map_or("unknown", Step::as_str),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Phase::Done)
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Phase::Halted { .. })
    }
}

/// Outcome of the last DECIDE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub verdict: ProgressVerdict,
    /// Advanced only because the attempt limit was reached.
    #[serde(default)]
    pub forced: bool,
    pub reasoning: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// The record threaded through every step of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    pub topic: String,
    pub background: String,
    pub learning_plan: Option<LearningPlan>,
    pub current_lesson_idx: usize,
    pub lecture_content: Option<Lecture>,
    pub quiz_results: Option<Quiz>,
    pub quiz_answers: Option<QuizAnswers>,
    pub quiz_score: u32,
    pub assignment: Option<Assignment>,
    pub assignment_submission: Option<String>,
    pub assignment_score: u32,
    pub grading_result: Option<GradingResult>,
    pub weak_points: Vec<String>,
    pub attempt_count: u32,
    pub decision: Option<DecisionRecord>,
    pub message: Option<String>,
    pub completed: bool,
}

impl SessionState {
    pub fn new(topic: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            background: background.into(),
            ..Self::default()
        }
    }

    pub fn total_lessons(&self) -> usize {
        self.learning_plan.as_ref().map_or(0, LearningPlan::len)
    }

    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.learning_plan
            .as_ref()
            .and_then(|plan| plan.lesson(self.current_lesson_idx))
    }

    /// Drop everything produced for the current attempt at a lesson.
    pub(crate) fn clear_attempt(&mut self) {
        self.lecture_content = None;
        self.quiz_results = None;
        self.quiz_answers = None;
        self.assignment = None;
        self.assignment_submission = None;
        self.grading_result = None;
    }
}

/// Immutable per-session settings handed to every transition.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub passing_threshold: u32,
    pub max_attempts: Option<u32>,
    pub decision_policy: DecisionPolicy,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, config: &TeachingConfig) -> Self {
        Self {
            session_id: session_id.into(),
            passing_threshold: config.passing_threshold,
            max_attempts: config.max_attempts,
            decision_policy: config.decision_policy,
        }
    }
}
