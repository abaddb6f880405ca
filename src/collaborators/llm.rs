//! Collaborators backed by a language model

use super::prompts::{self, PLANNER_SYSTEM, PROFESSOR_SYSTEM, TUTOR_SYSTEM};
use super::structured::request_artifact;
use super::{Collaborators, LectureBrief, Milestone, ProgressReport};
use crate::artifacts::{
    AdvanceMessage, Assignment, GradingResult, LearningPlan, Lecture, Lesson, ProgressDecision,
    Quiz, RepeatMessage, ShortAnswerEvaluation, ShortAnswerQuestion,
};
use crate::config::SearchConfig;
use crate::error::StepError;
use crate::llm::LlmService;
use crate::tools::{ToolContext, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

pub struct LlmCollaborators {
    llm: Arc<dyn LlmService>,
    /// Offered to the planner and the lecturer only
    research: ToolRegistry,
    none: ToolRegistry,
}

impl LlmCollaborators {
    pub fn new(llm: Arc<dyn LlmService>, search: &SearchConfig) -> Self {
        Self::with_research(llm, ToolRegistry::research(search))
    }

    pub fn with_research(llm: Arc<dyn LlmService>, research: ToolRegistry) -> Self {
        Self {
            llm,
            research,
            none: ToolRegistry::empty(),
        }
    }
}

#[async_trait]
impl Collaborators for LlmCollaborators {
    async fn generate_plan(
        &self,
        ctx: &ToolContext,
        topic: &str,
        background: &str,
    ) -> Result<LearningPlan, StepError> {
        let prompt = prompts::plan(topic, background, !self.research.is_empty());
        request_artifact(&*self.llm, PLANNER_SYSTEM, prompt, &self.research, ctx).await
    }

    async fn deliver_lecture(
        &self,
        ctx: &ToolContext,
        brief: &LectureBrief,
    ) -> Result<Lecture, StepError> {
        let prompt = prompts::lecture(brief, !self.research.is_empty());
        request_artifact(&*self.llm, PROFESSOR_SYSTEM, prompt, &self.research, ctx).await
    }

    async fn create_quiz(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        lecture: &Lecture,
    ) -> Result<Quiz, StepError> {
        let prompt = prompts::quiz(lesson, lecture);
        request_artifact(&*self.llm, PROFESSOR_SYSTEM, prompt, &self.none, ctx).await
    }

    async fn evaluate_short_answer(
        &self,
        ctx: &ToolContext,
        question: &ShortAnswerQuestion,
        answer: &str,
    ) -> Result<ShortAnswerEvaluation, StepError> {
        let prompt = prompts::short_answer(question, answer);
        request_artifact(&*self.llm, TUTOR_SYSTEM, prompt, &self.none, ctx).await
    }

    async fn create_assignment(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        quiz_score: u32,
        weak_points: &[String],
    ) -> Result<Assignment, StepError> {
        let prompt = prompts::assignment(lesson, quiz_score, weak_points);
        request_artifact(&*self.llm, PROFESSOR_SYSTEM, prompt, &self.none, ctx).await
    }

    async fn grade_submission(
        &self,
        ctx: &ToolContext,
        lesson: &Lesson,
        assignment: &Assignment,
        submission: &str,
    ) -> Result<GradingResult, StepError> {
        let prompt = prompts::grading(lesson, assignment, submission);
        request_artifact(&*self.llm, TUTOR_SYSTEM, prompt, &self.none, ctx).await
    }

    async fn assess_progress(
        &self,
        ctx: &ToolContext,
        report: &ProgressReport,
    ) -> Result<ProgressDecision, StepError> {
        let prompt = prompts::progress(report);
        request_artifact(&*self.llm, TUTOR_SYSTEM, prompt, &self.none, ctx).await
    }

    async fn compose_repeat_message(
        &self,
        ctx: &ToolContext,
        report: &ProgressReport,
    ) -> Result<RepeatMessage, StepError> {
        let prompt = prompts::repeat_message(report);
        request_artifact(&*self.llm, TUTOR_SYSTEM, prompt, &self.none, ctx).await
    }

    async fn compose_advance_message(
        &self,
        ctx: &ToolContext,
        milestone: &Milestone,
    ) -> Result<AdvanceMessage, StepError> {
        let prompt = prompts::advance_message(milestone);
        request_artifact(&*self.llm, TUTOR_SYSTEM, prompt, &self.none, ctx).await
    }
}
