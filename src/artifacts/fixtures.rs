//! Valid artifacts for tests

use super::assignment::AssignmentStep;
use super::grading::{Confidence, GradeLevel};
use super::lecture::LectureSegment;
use super::plan::Difficulty;
use super::quiz::{MultipleChoiceQuestion, TrueFalseQuestion};
use super::*;

pub fn lesson(number: u32) -> Lesson {
    Lesson {
        lesson_number: number,
        title: format!("Lesson {number}"),
        objectives: vec![
            "Explain the idea".to_string(),
            "Apply the idea".to_string(),
            "Spot misuse of the idea".to_string(),
        ],
        key_concepts: vec![
            format!("concept {number}a"),
            format!("concept {number}b"),
            format!("concept {number}c"),
            format!("concept {number}d"),
        ],
        duration_minutes: 45,
        prerequisites: Vec::new(),
        difficulty: Difficulty::Beginner,
    }
}

pub fn plan(lessons: usize) -> LearningPlan {
    let lessons: Vec<Lesson> = (1..=lessons)
        .map(|n| lesson(u32::try_from(n).unwrap_or(u32::MAX)))
        .collect();
    LearningPlan {
        topic: "Rust".to_string(),
        total_duration_minutes: lessons.iter().map(|l| l.duration_minutes).sum(),
        lessons,
        overall_difficulty: Difficulty::Beginner,
    }
}

pub fn lecture(lesson_title: &str) -> Lecture {
    Lecture {
        lesson_title: lesson_title.to_string(),
        introduction: format!("Welcome to {lesson_title}."),
        segments: (1..=2)
            .map(|n| LectureSegment {
                segment_number: n,
                title: format!("Segment {n}"),
                content: format!("Content of segment {n}."),
                duration_minutes: 6,
                interaction_points: vec!["What did you notice?".to_string()],
            })
            .collect(),
        conclusion: "That covers it.".to_string(),
        total_duration_minutes: 18,
        key_takeaways: vec!["Values have one owner".to_string()],
    }
}

pub fn quiz(lesson_title: &str) -> Quiz {
    Quiz {
        lesson_title: lesson_title.to_string(),
        questions: vec![
            Question::MultipleChoice(MultipleChoiceQuestion {
                question: "Which keyword declares an immutable binding?".to_string(),
                options: vec![
                    "mut".to_string(),
                    "let".to_string(),
                    "static".to_string(),
                    "const fn".to_string(),
                ],
                correct_answer: "B".to_string(),
                explanation: "let bindings are immutable by default".to_string(),
                misconceptions: Vec::new(),
            }),
            Question::TrueFalse(TrueFalseQuestion {
                question: "A value can have exactly one owner at a time.".to_string(),
                correct_answer: true,
                explanation: "Ownership is unique".to_string(),
                misconceptions: Vec::new(),
            }),
            Question::MultipleChoice(MultipleChoiceQuestion {
                question: "What happens to a String when it is assigned to another variable?"
                    .to_string(),
                options: vec![
                    "It moves".to_string(),
                    "It is copied".to_string(),
                    "It is cloned".to_string(),
                    "It is dropped".to_string(),
                ],
                correct_answer: "A".to_string(),
                explanation: "String is not Copy".to_string(),
                misconceptions: Vec::new(),
            }),
            Question::TrueFalse(TrueFalseQuestion {
                question: "Rust uses a tracing garbage collector.".to_string(),
                correct_answer: false,
                explanation: "Memory is freed when the owner goes out of scope".to_string(),
                misconceptions: Vec::new(),
            }),
            Question::ShortAnswer(ShortAnswerQuestion {
                question: "Why does the borrow checker reject two mutable references?".to_string(),
                correct_answer: "Aliased mutation could cause data races".to_string(),
                key_points: vec!["aliasing".to_string(), "data races".to_string()],
                explanation: "Exclusive mutable access prevents races".to_string(),
                misconceptions: Vec::new(),
            }),
        ],
        passing_score: 70,
    }
}

/// Answers for [`quiz`]; the short answer still needs an evaluator verdict.
pub fn correct_answers() -> QuizAnswers {
    [
        ("q0", "B"),
        ("q1", "True"),
        ("q2", "a"),
        ("q3", "false"),
        ("q4", "Two writers could race on the same data"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn wrong_answers() -> QuizAnswers {
    [("q0", "D"), ("q1", "False"), ("q2", "C"), ("q3", "true"), ("q4", "")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn assignment(lesson_title: &str) -> Assignment {
    Assignment {
        title: format!("Practice: {lesson_title}"),
        lesson_title: lesson_title.to_string(),
        objective: "Use the idea in a small program".to_string(),
        background: "You are writing a tiny inventory tool.".to_string(),
        steps: (1..=5)
            .map(|n| AssignmentStep {
                step_number: n,
                instruction: format!("Do part {n}"),
                expected_outcome: format!("Part {n} works"),
                hints: Vec::new(),
            })
            .collect(),
        deliverables: vec!["Source file".to_string()],
        success_criteria: vec!["Compiles".to_string(), "No clones".to_string()],
        estimated_duration_minutes: 45,
        resources: Vec::new(),
        bonus_challenges: Vec::new(),
    }
}

pub fn grading(score: f64) -> GradingResult {
    GradingResult {
        assignment_title: "Practice".to_string(),
        score,
        passed: score >= 70.0,
        strengths: vec!["Clear structure".to_string(), "Good naming".to_string()],
        improvements: vec!["More tests".to_string(), "Fewer clones".to_string()],
        recommendations: vec!["Re-read the borrowing chapter".to_string()],
        weak_points: if score >= 70.0 {
            Vec::new()
        } else {
            vec!["borrowing".to_string()]
        },
        detailed_feedback: "Solid first attempt.".to_string(),
        grade_level: if score >= 70.0 {
            GradeLevel::Meets
        } else {
            GradeLevel::PartiallyMeets
        },
    }
}

pub fn progress(decision: ProgressVerdict) -> ProgressDecision {
    ProgressDecision {
        decision,
        reasoning: "Based on both scores".to_string(),
        focus_areas: vec!["borrowing".to_string()],
        confidence: Confidence::Medium,
        current_lesson: 1,
        total_lessons: 1,
        quiz_score: 60.0,
        assignment_score: 60.0,
        attempt_count: 1,
    }
}

pub fn repeat_message() -> RepeatMessage {
    RepeatMessage {
        message: "Let's go over it once more.".to_string(),
        acknowledgment: "You put in real effort.".to_string(),
        explanation: "A second pass makes it stick.".to_string(),
        focus_areas: vec!["borrowing".to_string(), "lifetimes".to_string()],
        study_tips: vec!["Draw the ownership graph".to_string()],
        expectations: "We'll revisit the same lesson with more examples.".to_string(),
    }
}

pub fn advance_message() -> AdvanceMessage {
    AdvanceMessage {
        message: "Well done!".to_string(),
        celebration: "You nailed the assignment.".to_string(),
        key_achievements: vec!["ownership".to_string()],
        next_lesson_preview: "Borrowing".to_string(),
        motivation: "Keep going.".to_string(),
        progress_summary: "One lesson down.".to_string(),
    }
}
