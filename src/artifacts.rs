//! Structured artifacts produced by the collaborators
//!
//! Every artifact has a fixed schema. The JSON schema handed to the model is
//! generated from the Rust type, and [`Artifact::validate`] enforces the bounds
//! the type system cannot express. Nothing reaches the session record without
//! passing both.

mod assignment;
mod grading;
mod lecture;
mod messages;
mod plan;
mod quiz;

#[cfg(test)]
pub mod fixtures;

pub use assignment::Assignment;
pub use grading::{GradingResult, ProgressDecision, ProgressVerdict};
pub use lecture::Lecture;
pub use messages::{AdvanceMessage, RepeatMessage};
pub use plan::{LearningPlan, Lesson};
pub use quiz::{
    answer_key, parse_choice, Question, Quiz, QuizAnswers, ShortAnswerEvaluation, ShortAnswerQuestion,
};

use crate::error::StepError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A schema-bound value returned by a collaborator.
pub trait Artifact: Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Name used in validation errors.
    const NAME: &'static str;
    /// Name of the tool the model calls to hand the artifact back.
    const TOOL_NAME: &'static str;
    const TOOL_DESCRIPTION: &'static str;

    /// Check the bounds the schema alone does not enforce.
    fn validate(&self) -> Result<(), StepError>;
}

/// Check an artifact and hand it back on success.
pub fn validated<T: Artifact>(artifact: T) -> Result<T, StepError> {
    artifact.validate()?;
    Ok(artifact)
}
