use super::Artifact;
use crate::error::{StepError, Violations};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum GradeLevel {
    Exceeds,
    Meets,
    #[serde(rename = "Partially Meets")]
    PartiallyMeets,
    #[serde(rename = "Does Not Meet")]
    DoesNotMeet,
}

/// Feedback on a submitted assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GradingResult {
    pub assignment_title: String,
    /// Score out of 100
    pub score: f64,
    /// Whether the submission passed
    pub passed: bool,
    /// 2-3 things done well
    pub strengths: Vec<String>,
    /// 2-3 areas needing work
    pub improvements: Vec<String>,
    /// Concrete steps for improvement
    pub recommendations: Vec<String>,
    /// Concepts needing reinforcement
    #[serde(default)]
    pub weak_points: Vec<String>,
    /// Overall narrative feedback
    pub detailed_feedback: String,
    pub grade_level: GradeLevel,
}

impl GradingResult {
    /// Whole-number score, clamped to 0-100.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped first
    pub fn whole_score(&self) -> u32 {
        self.score.clamp(0.0, 100.0).floor() as u32
    }
}

impl Artifact for GradingResult {
    const NAME: &'static str = "GradingResult";
    const TOOL_NAME: &'static str = "submit_grade";
    const TOOL_DESCRIPTION: &'static str = "Submit the grade and feedback for the submission.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.check(self.score.is_finite(), || "score must be a number".to_string());
        v.range_in("score", self.score, 0.0, 100.0);
        v.count_in("strengths", self.strengths.len(), 2, 3);
        v.count_in("improvements", self.improvements.len(), 2, 3);
        v.non_empty("detailed_feedback", &self.detailed_feedback);
        v.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressVerdict {
    Advance,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// The evaluator's advice on whether the learner should move on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressDecision {
    pub decision: ProgressVerdict,
    /// Explanation of the decision
    pub reasoning: String,
    /// Areas to focus on, especially when repeating
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub confidence: Confidence,
    /// Current lesson number, starting at 1
    pub current_lesson: u32,
    pub total_lessons: u32,
    pub quiz_score: f64,
    pub assignment_score: f64,
    /// Attempts made at this lesson, starting at 1
    pub attempt_count: u32,
}

impl Artifact for ProgressDecision {
    const NAME: &'static str = "ProgressDecision";
    const TOOL_NAME: &'static str = "submit_progress_decision";
    const TOOL_DESCRIPTION: &'static str = "Submit the advance or repeat decision.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("reasoning", &self.reasoning);
        v.range_in("quiz_score", self.quiz_score, 0.0, 100.0);
        v.range_in("assignment_score", self.assignment_score, 0.0, 100.0);
        v.finish()
    }
}
