//! External collaborators
//!
//! Content generators, the evaluator and the messenger sit behind one
//! capability trait so the controller can run against deterministic fakes.
//! Each method is a single request/response call; the runtime validates
//! whatever comes back before it reaches the session record.

mod llm;
mod prompts;
mod structured;

pub use llm::LlmCollaborators;

use crate::artifacts::{
    AdvanceMessage, Assignment, GradingResult, LearningPlan, Lecture, Lesson, ProgressDecision,
    Quiz, RepeatMessage, ShortAnswerEvaluation, ShortAnswerQuestion,
};
use crate::error::StepError;
use crate::state_machine::{Phase, SessionState};
use crate::tools::ToolContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Everything the lecturer needs for the current lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct LectureBrief {
    pub topic: String,
    pub background: String,
    pub lesson: Lesson,
    /// 1-based
    pub lesson_number: usize,
    pub total_lessons: usize,
    pub weak_points: Vec<String>,
    /// Earlier attempts at this lesson
    pub attempt_count: u32,
}

impl LectureBrief {
    pub fn from_state(state: &SessionState) -> Result<Self, StepError> {
        Ok(Self {
            topic: state.topic.clone(),
            background: state.background.clone(),
            lesson: current_lesson(state)?.clone(),
            lesson_number: state.current_lesson_idx + 1,
            total_lessons: state.total_lessons(),
            weak_points: state.weak_points.clone(),
            attempt_count: state.attempt_count,
        })
    }
}

/// Performance on the current lesson, for the evaluator and the repeat messenger.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub topic: String,
    pub lesson: Lesson,
    /// 1-based
    pub lesson_number: usize,
    pub total_lessons: usize,
    pub quiz_score: u32,
    pub assignment_score: u32,
    /// The attempt just finished, counting from 1
    pub attempt: u32,
    pub weak_points: Vec<String>,
    pub focus_areas: Vec<String>,
    pub passing_threshold: u32,
}

impl ProgressReport {
    pub fn from_state(state: &SessionState, passing_threshold: u32) -> Result<Self, StepError> {
        // After a repeat decision the count already includes the finished attempt
        let attempt = match state.phase {
            Phase::RepeatMessage => state.attempt_count,
            _ => state.attempt_count + 1,
        };
        Ok(Self {
            topic: state.topic.clone(),
            lesson: current_lesson(state)?.clone(),
            lesson_number: state.current_lesson_idx + 1,
            total_lessons: state.total_lessons(),
            quiz_score: state.quiz_score,
            assignment_score: state.assignment_score,
            attempt,
            weak_points: state.weak_points.clone(),
            focus_areas: state
                .decision
                .as_ref()
                .map(|d| d.focus_areas.clone())
                .unwrap_or_default(),
            passing_threshold,
        })
    }
}

/// A lesson just passed, for the advance messenger.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub topic: String,
    pub completed_lesson: Lesson,
    /// `None` when the course is finished
    pub next_lesson: Option<Lesson>,
    /// 1-based number of the completed lesson
    pub lesson_number: usize,
    pub total_lessons: usize,
    pub quiz_score: u32,
    pub assignment_score: u32,
}

impl Milestone {
    /// Built after the advance, so the completed lesson is the one before the index.
    pub fn from_state(state: &SessionState) -> Result<Self, StepError> {
        let plan = state
            .learning_plan
            .as_ref()
            .ok_or_else(|| StepError::invariant("no learning plan"))?;
        let completed_idx = state
            .current_lesson_idx
            .checked_sub(1)
            .ok_or_else(|| StepError::invariant("no lesson has been completed"))?;
        let completed_lesson = plan.lesson(completed_idx).cloned().ok_or_else(|| {
            StepError::invariant(format!(
                "lesson index {completed_idx} out of bounds for a plan of {} lessons",
                plan.len()
            ))
        })?;
        Ok(Self {
            topic: state.topic.clone(),
            completed_lesson,
            next_lesson: plan.lesson(state.current_lesson_idx).cloned(),
            lesson_number: state.current_lesson_idx,
            total_lessons: plan.len(),
            quiz_score: state.quiz_score,
            assignment_score: state.assignment_score,
        })
    }
}

pub(crate) fn current_lesson(state: &SessionState) -> Result<&Lesson, StepError> {
    state.current_lesson().ok_or_else(|| {
        StepError::invariant(format!(
            "lesson index {} out of bounds for a plan of {} lessons",
            state.current_lesson_idx,
            state.total_lessons()
        ))
    })
}

/// The calls the controller makes out to the model.
///
/// `ctx` carries the step's cancellation token and session id down to any
/// tool a collaborator uses along the way.
#[async_trait]
pub trait Collaborators: Send + Sync {
    async fn generate_plan(
        &self,
        ctx: &ToolContext,
        topic: &str,
        background: &str,
    ) -> Result<LearningPlan, StepError>;

    async fn deliver_lecture(
        &self,
        ctx: &ToolContext,
        brief: &LectureBrief,
    ) -> Result<Lecture, StepError>;

    async fn create_quiz(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        lecture: &Lecture,
    ) -> Result<Quiz, StepError>;

    async fn evaluate_short_answer(
        &self,
        ctx: &ToolContext,
        question: &ShortAnswerQuestion,
        answer: &str,
    ) -> Result<ShortAnswerEvaluation, StepError>;

    async fn create_assignment(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        quiz_score: u32,
        weak_points: &[String],
    ) -> Result<Assignment, StepError>;

    async fn grade_submission(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        assignment: &Assignment,
        submission: &str,
    ) -> Result<GradingResult, StepError>;

    async fn assess_progress(
        &self,
        ctx: &ToolContext,
        report: &ProgressReport,
    ) -> Result<ProgressDecision, StepError>;

    async fn compose_repeat_message(
        &self,
        ctx: &ToolContext,
        report: &ProgressReport,
    ) -> Result<RepeatMessage, StepError>;

    async fn compose_advance_message(
        &self,
        ctx: &ToolContext,
        milestone: &Milestone,
    ) -> Result<AdvanceMessage, StepError>;
}

#[async_trait]
impl<T: Collaborators + ?Sized> Collaborators for Arc<T> {
    async fn generate_plan(
        &self,
        ctx: &ToolContext,
        topic: &str,
        background: &str,
    ) -> Result<LearningPlan, StepError> {
        (**self).generate_plan(ctx, topic, background).await
    }

    async fn deliver_lecture(
        &self,
        ctx: &ToolContext,
        brief: &LectureBrief,
    ) -> Result<Lecture, StepError> {
        (**self).deliver_lecture(ctx, brief).await
    }

    async fn create_quiz(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        lecture: &Lecture,
    ) -> Result<Quiz, StepError> {
        (**self).create_quiz(ctx, lesson, lecture).await
    }

    async fn evaluate_short_answer(
        &self,
        ctx: &ToolContext,
        question: &ShortAnswerQuestion,
        answer: &str,
    ) -> Result<ShortAnswerEvaluation, StepError> {
        (**self).evaluate_short_answer(ctx, question, answer).await
    }

    async fn create_assignment(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        quiz_score: u32,
        weak_points: &[String],
    ) -> Result<Assignment, StepError> {
        (**self)
            .create_assignment(ctx, lesson, quiz_score, weak_points)
            .await
    }

    async fn grade_submission(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        assignment: &Assignment,
        submission: &str,
    ) -> Result<GradingResult, StepError> {
        (**self)
            .grade_submission(ctx, lesson, assignment, submission)
            .await
    }

    async fn assess_progress(
        &self,
        ctx: &ToolContext,
        report: &ProgressReport,
    ) -> Result<ProgressDecision, StepError> {
        (**self).assess_progress(ctx, report).await
    }

    async fn compose_repeat_message(
        &self,
        ctx: &ToolContext,
        report: &ProgressReport,
    ) -> Result<RepeatMessage, StepError> {
        (**self).compose_repeat_message(ctx, report).await
    }

    async fn compose_advance_message(
        &self,
        ctx: &ToolContext,
        milestone: &Milestone,
    ) -> Result<AdvanceMessage, StepError> {
        (**self).compose_advance_message(ctx, milestone).await
    }
}
