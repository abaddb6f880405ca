use super::Artifact;
use crate::error::{StepError, Violations};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Encouragement sent before a lesson is taught again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RepeatMessage {
    /// Main encouraging message
    pub message: String,
    /// Positive acknowledgment of effort
    pub acknowledgment: String,
    /// Why repetition helps learning
    pub explanation: String,
    /// 2-3 specific areas to focus on
    pub focus_areas: Vec<String>,
    pub study_tips: Vec<String>,
    /// What to expect in the repeated lesson
    pub expectations: String,
}

impl RepeatMessage {
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\n{}\n\n{}\n", self.message, self.acknowledgment, self.explanation);
        push_list(&mut out, "Focus areas", &self.focus_areas);
        push_list(&mut out, "Study tips", &self.study_tips);
        let _ = write!(out, "\n{}", self.expectations);
        out
    }
}

impl Artifact for RepeatMessage {
    const NAME: &'static str = "RepeatMessage";
    const TOOL_NAME: &'static str = "submit_repeat_message";
    const TOOL_DESCRIPTION: &'static str = "Submit the message for the learner who is repeating the lesson.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("message", &self.message);
        v.count_in("focus_areas", self.focus_areas.len(), 2, 3);
        v.finish()
    }
}

/// Congratulations sent when a lesson is passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AdvanceMessage {
    /// Main congratulatory message
    pub message: String,
    /// Specific celebration of success
    pub celebration: String,
    /// What was mastered
    pub key_achievements: Vec<String>,
    /// What is coming next
    pub next_lesson_preview: String,
    pub motivation: String,
    /// Overall progress through the course
    pub progress_summary: String,
}

impl AdvanceMessage {
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\n{}\n", self.message, self.celebration);
        push_list(&mut out, "Key achievements", &self.key_achievements);
        let _ = write!(
            out,
            "\nNext up: {}\n\n{}\n\n{}",
            self.next_lesson_preview, self.progress_summary, self.motivation
        );
        out
    }
}

impl Artifact for AdvanceMessage {
    const NAME: &'static str = "AdvanceMessage";
    const TOOL_NAME: &'static str = "submit_advance_message";
    const TOOL_DESCRIPTION: &'static str = "Submit the message for the learner who passed the lesson.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("message", &self.message);
        v.finish()
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{heading}:");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}
