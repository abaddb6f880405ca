use super::Artifact;
use crate::error::{StepError, Violations};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const QUIZ_LENGTH: usize = 5;
pub const CHOICE_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Learner answers keyed by question (`q0`, `q1`, ...).
pub type QuizAnswers = BTreeMap<String, String>;

pub fn answer_key(index: usize) -> String {
    format!("q{index}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    /// Exactly 4 answer options, in A, B, C, D order
    pub options: Vec<String>,
    /// The letter of the correct option: A, B, C or D
    pub correct_answer: String,
    /// Why the answer is correct
    pub explanation: String,
    /// Common wrong assumptions this question probes
    #[serde(default)]
    pub misconceptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrueFalseQuestion {
    pub question: String,
    pub correct_answer: bool,
    pub explanation: String,
    #[serde(default)]
    pub misconceptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShortAnswerQuestion {
    pub question: String,
    /// A model answer
    pub correct_answer: String,
    /// Points a correct answer has to cover
    pub key_points: Vec<String>,
    /// What makes a good answer
    pub explanation: String,
    #[serde(default)]
    pub misconceptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    MultipleChoice(MultipleChoiceQuestion),
    TrueFalse(TrueFalseQuestion),
    ShortAnswer(ShortAnswerQuestion),
}

impl Question {
    pub fn text(&self) -> &str {
        match self {
            Self::MultipleChoice(q) => &q.question,
            Self::TrueFalse(q) => &q.question,
            Self::ShortAnswer(q) => &q.question,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            Self::MultipleChoice(q) => &q.explanation,
            Self::TrueFalse(q) => &q.explanation,
            Self::ShortAnswer(q) => &q.explanation,
        }
    }

    fn violations(&self) -> Violations {
        let mut v = Violations::new("Question");
        v.non_empty("question", self.text());
        match self {
            Self::MultipleChoice(q) => {
                v.count_in("options", q.options.len(), 4, 4);
                v.check(parse_choice(&q.correct_answer).is_some(), || {
                    format!("correct_answer must be one of A-D, got {:?}", q.correct_answer)
                });
            }
            Self::TrueFalse(_) => {}
            Self::ShortAnswer(q) => {
                v.non_empty("correct_answer", &q.correct_answer);
                v.check(!q.key_points.is_empty(), || "key_points must not be empty".to_string());
            }
        }
        v
    }
}

/// Accept `a`, ` B `, `C)` and the like; anything else is not a choice.
pub fn parse_choice(input: &str) -> Option<char> {
    let mut chars = input.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let rest = chars.as_str().trim();
    if !CHOICE_LETTERS.contains(&letter) {
        return None;
    }
    if rest.is_empty() || rest == ")" || rest == "." {
        Some(letter)
    } else {
        None
    }
}

/// Five mixed questions assessing one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quiz {
    /// The lesson this quiz assesses
    pub lesson_title: String,
    /// Exactly 5 questions of mixed types
    pub questions: Vec<Question>,
    /// Minimum score to pass, 0-100
    #[serde(default = "default_passing_score")]
    pub passing_score: u32,
}

fn default_passing_score() -> u32 {
    70
}

impl Artifact for Quiz {
    const NAME: &'static str = "Quiz";
    const TOOL_NAME: &'static str = "submit_quiz";
    const TOOL_DESCRIPTION: &'static str = "Submit the finished quiz for the lesson.";

    fn validate(&self) -> Result<(), StepError> {
        let mut v = Violations::new(Self::NAME);
        v.non_empty("lesson_title", &self.lesson_title);
        v.count_in("questions", self.questions.len(), QUIZ_LENGTH, QUIZ_LENGTH);
        v.range_in("passing_score", self.passing_score, 0, 100);
        for (i, question) in self.questions.iter().enumerate() {
            v.nested(&format!("questions[{i}]"), question.violations());
        }
        v.finish()
    }
}

/// Verdict on a free-text answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ShortAnswerEvaluation {
    /// Whether the answer shows sufficient understanding
    pub is_correct: bool,
    /// Brief explanation of the verdict
    pub reasoning: String,
}

impl Artifact for ShortAnswerEvaluation {
    const NAME: &'static str = "ShortAnswerEvaluation";
    const TOOL_NAME: &'static str = "submit_evaluation";
    const TOOL_DESCRIPTION: &'static str = "Submit the verdict on the learner's answer.";

    fn validate(&self) -> Result<(), StepError> {
        Ok(())
    }
}
