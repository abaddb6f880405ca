//! Quiz scoring
//!
//! Multiple-choice and true/false answers are marked locally. Short answers
//! need an evaluator verdict, which the caller gathers before scoring.

use crate::artifacts::{answer_key, parse_choice, Question, Quiz, QuizAnswers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_WEAK_POINTS: usize = 3;
const WEAK_POINT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marking {
    Correct,
    Incorrect,
    /// Free text that only the evaluator can judge.
    NeedsEvaluation,
}

/// Result of a completed quiz, merged into the session in one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub quiz: Quiz,
    pub answers: QuizAnswers,
    pub correct: usize,
    pub score: u32,
    pub weak_points: Vec<String>,
}

pub fn mark(question: &Question, answer: Option<&str>) -> Marking {
    let Some(answer) = answer.map(str::trim).filter(|a| !a.is_empty()) else {
        return Marking::Incorrect;
    };
    let correct = match question {
        Question::MultipleChoice(q) => {
            parse_choice(answer).is_some_and(|c| Some(c) == parse_choice(&q.correct_answer))
        }
        Question::TrueFalse(q) => answer.eq_ignore_ascii_case("true") == q.correct_answer,
        Question::ShortAnswer(_) => return Marking::NeedsEvaluation,
    };
    if correct {
        Marking::Correct
    } else {
        Marking::Incorrect
    }
}

/// Indices of the questions that need an evaluator verdict.
pub fn pending_evaluations(quiz: &Quiz, answers: &QuizAnswers) -> Vec<usize> {
    quiz.questions
        .iter()
        .enumerate()
        .filter(|(i, q)| {
            mark(q, answers.get(&answer_key(*i)).map(String::as_str)) == Marking::NeedsEvaluation
        })
        .map(|(i, _)| i)
        .collect()
}

/// Score the quiz. Short answers without a verdict count as wrong.
pub fn score_quiz(quiz: Quiz, answers: QuizAnswers, verdicts: &BTreeMap<usize, bool>) -> QuizOutcome {
    let mut correct = 0usize;
    let mut weak_points = Vec::new();

    for (i, question) in quiz.questions.iter().enumerate() {
        let right = match mark(question, answers.get(&answer_key(i)).map(String::as_str)) {
            Marking::Correct => true,
            Marking::Incorrect => false,
            Marking::NeedsEvaluation => verdicts.get(&i).copied().unwrap_or(false),
        };
        if right {
            correct += 1;
        } else if weak_points.len() < MAX_WEAK_POINTS {
            weak_points.push(question.text().chars().take(WEAK_POINT_CHARS).collect());
        }
    }

    let total = quiz.questions.len();
    let score = if total == 0 {
        0
    } else {
        u32::try_from(correct * 100 / total).unwrap_or(0)
    };

    QuizOutcome {
        quiz,
        answers,
        correct,
        score,
        weak_points,
    }
}
