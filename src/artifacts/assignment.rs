use super::Artifact;
use crate::error::{StepError, Violations};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentStep {
    pub step_number: u32,
    /// What the learner needs to do
    pub instruction: String,
    /// What should result from this step
    pub expected_outcome: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

/// Hands-on practice for one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assignment {
    pub title: String,
    /// The lesson this assignment belongs to
    pub lesson_title: String,
    /// What the assignment aims to achieve
    pub objective: String,
    /// Context or scenario for the work
    pub background: String,
    /// 5-8 step-by-step instructions
    pub steps: Vec<AssignmentStep>,
    /// What the learner should submit
    pub deliverables: Vec<String>,
    /// How the submission will be evaluated
    pub success_criteria: Vec<String>,
    /// Expected time to complete, 30-60 minutes
    pub estimated_duration_minutes: u32,
    #[serde(default)]
    pub resources: Vec<String>,
    /// Optional extra credit tasks
    #[serde(default)]
    pub bonus_challenges: Vec<String>,
}

impl Artifact for Assignment {
    const NAME: &'static str = "Assignment";
    const TOOL_NAME: &'static str = "submit_assignment";
    const TOOL_DESCRIPTION: &'static str = "Submit the finished practice assignment.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("title", &self.title);
        v.non_empty("objective", &self.objective);
        v.count_in("steps", self.steps.len(), 5, 8);
        v.check(!self.deliverables.is_empty(), || {
            "deliverables must not be empty".to_string()
        });
        v.check(!self.success_criteria.is_empty(), || {
            "success_criteria must not be empty".to_string()
        });
        v.range_in(
            "estimated_duration_minutes",
            self.estimated_duration_minutes,
            30,
            60,
        );
        for (i, step) in self.steps.iter().enumerate() {
            let mut s = Violations::new("AssignmentStep");
            s.non_empty("instruction", &step.instruction);
            v.nested(&format!("steps[{i}]"), s);
        }
        v.finish()
    }
}
