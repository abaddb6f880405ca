use super::Artifact;
use crate::error::{StepError, Violations};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upper bound on lessons in one plan.
pub const MAX_LESSONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// One unit of the curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Lesson {
    /// Sequential lesson number starting at 1
    pub lesson_number: u32,
    /// Descriptive lesson title
    pub title: String,
    /// 3-5 specific, measurable learning objectives
    pub objectives: Vec<String>,
    /// Main concepts covered in this lesson
    pub key_concepts: Vec<String>,
    /// Estimated lesson duration in minutes (15-120)
    pub duration_minutes: u32,
    /// Knowledge required from earlier lessons
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub difficulty: Difficulty,
}

impl Lesson {
    fn violations(&self) -> Violations {
        let mut v = Violations::new("Lesson");
        v.non_empty("title", &self.title);
        v.count_in("objectives", self.objectives.len(), 3, 5);
        v.check(!self.key_concepts.is_empty(), || {
            "key_concepts must not be empty".to_string()
        });
        v.range_in("duration_minutes", self.duration_minutes, 15, 120);
        v
    }
}

/// The ordered curriculum for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LearningPlan {
    /// The main topic being taught
    pub topic: String,
    /// Progressive lessons, simplest first
    pub lessons: Vec<Lesson>,
    /// Total estimated time for all lessons
    pub total_duration_minutes: u32,
    pub overall_difficulty: Difficulty,
}

impl LearningPlan {
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn lesson(&self, idx: usize) -> Option<&Lesson> {
        self.lessons.get(idx)
    }
}

impl Artifact for LearningPlan {
    const NAME: &'static str = "LearningPlan";
    const TOOL_NAME: &'static str = "submit_learning_plan";
    const TOOL_DESCRIPTION: &'static str = "Submit the finished learning plan for the topic.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("topic", &self.topic);
        v.check(self.lessons.len() <= MAX_LESSONS, || {
            format!("lessons must have at most {MAX_LESSONS} items, got {}", self.lessons.len())
        });
        for (i, lesson) in self.lessons.iter().enumerate() {
            v.nested(&format!("lessons[{i}]"), lesson.violations());
        }
        v.finish()
    }
}
