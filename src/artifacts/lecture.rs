use super::Artifact;
use crate::error::{StepError, Violations};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LectureSegment {
    /// Position of this segment in the lecture
    pub segment_number: u32,
    pub title: String,
    /// The lecture content for this segment
    pub content: String,
    /// Duration of this segment in minutes (3-8)
    pub duration_minutes: u32,
    /// Questions or reflection prompts for the learner
    #[serde(default)]
    pub interaction_points: Vec<String>,
}

/// A short lecture covering one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Lecture {
    pub lesson_title: String,
    /// Overview of the lesson and its objectives
    pub introduction: String,
    /// 2-3 main content segments
    pub segments: Vec<LectureSegment>,
    /// Summary and next steps
    pub conclusion: String,
    /// Total lecture duration in minutes (15-20)
    pub total_duration_minutes: u32,
    /// Main points the learner should remember
    pub key_takeaways: Vec<String>,
}

impl Lecture {
    /// Condensed form of the lecture used to ground quiz questions.
    pub fn summary(&self) -> String {
        let mut out = format!("Introduction: {}\n\n", self.introduction);
        for segment in &self.segments {
            let excerpt: String = segment.content.chars().take(200).collect();
            let _ = writeln!(out, "{}: {excerpt}...", segment.title);
        }
        out
    }
}

impl Artifact for Lecture {
    const NAME: &'static str = "Lecture";
    const TOOL_NAME: &'static str = "submit_lecture";
    const TOOL_DESCRIPTION: &'static str = "Submit the finished lecture for the lesson.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("lesson_title", &self.lesson_title);
        v.non_empty("introduction", &self.introduction);
        v.non_empty("conclusion", &self.conclusion);
        v.count_in("segments", self.segments.len(), 2, 3);
        v.range_in("total_duration_minutes", self.total_duration_minutes, 15, 20);
        for (i, segment) in self.segments.iter().enumerate() {
            let mut s = Violations::new("LectureSegment");
            s.non_empty("title", &segment.title);
            s.non_empty("content", &segment.content);
            s.range_in("duration_minutes", segment.duration_minutes, 3, 8);
            v.nested(&format!("segments[{i}]"), s);
        }
        v.finish()
    }
}
