//! Plain-text rendering of artifacts for the terminal

use crate::artifacts::{Assignment, GradingResult, LearningPlan, Lecture, Question, Quiz};
use std::fmt::Write;

const WIDTH: usize = 80;

/// Greedy word wrap. Every line, including the first, starts with `indent`.
pub fn wrap(text: &str, width: usize, indent: &str) -> String {
    let mut out = String::new();
    for paragraph in text.lines() {
        if paragraph.trim().is_empty() {
            out.push('\n');
            continue;
        }
        let mut line = String::from(indent);
        let mut empty = true;
        for word in paragraph.split_whitespace() {
            if !empty && line.chars().count() + 1 + word.chars().count() > width {
                out.push_str(&line);
                out.push('\n');
                line = String::from(indent);
                empty = true;
            }
            if !empty {
                line.push(' ');
            }
            line.push_str(word);
            empty = false;
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Text framed in `border`, one framed row per line.
pub fn boxed(text: &str, border: char) -> String {
    let width = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let rule = border.to_string().repeat(width + 4);
    let mut out = format!("{rule}\n");
    for line in text.lines() {
        let _ = writeln!(out, "{border} {line:<width$} {border}");
    }
    out.push_str(&rule);
    out.push('\n');
    out
}

fn heading(title: &str) -> String {
    let rule = "=".repeat(WIDTH);
    format!("\n{rule}\n{title}\n{rule}\n")
}

fn section(title: &str) -> String {
    format!("{title}\n{}\n", "-".repeat(WIDTH))
}

pub fn plan(plan: &LearningPlan) -> String {
    let mut out = heading(&format!("LEARNING PLAN: {}", plan.topic));
    let _ = writeln!(out, "Total Duration: {} minutes", plan.total_duration_minutes);
    let _ = writeln!(out, "Difficulty: {:?}", plan.overall_difficulty);
    let _ = writeln!(out, "Lessons: {}\n", plan.len());

    for (i, lesson) in plan.lessons.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, lesson.title);
        let _ = writeln!(
            out,
            "   Duration: {} min | Difficulty: {:?}",
            lesson.duration_minutes, lesson.difficulty
        );
        out.push_str("   Objectives:\n");
        for objective in lesson.objectives.iter().take(3) {
            out.push_str(&wrap(&format!("- {objective}"), WIDTH - 6, "     "));
        }
        out.push('\n');
    }
    out
}

pub fn lecture(lecture: &Lecture) -> String {
    let mut out = heading(&format!("LECTURE: {}", lecture.lesson_title));
    out.push_str(&section("INTRODUCTION"));
    out.push_str(&wrap(&lecture.introduction, WIDTH - 2, "  "));

    for (i, segment) in lecture.segments.iter().enumerate() {
        let _ = write!(out, "\n{}", section(&format!("PART {}: {}", i + 1, segment.title)));
        out.push_str(&wrap(&segment.content, WIDTH - 2, "  "));
    }

    out.push_str(&heading("CONCLUSION"));
    out.push_str(&wrap(&lecture.conclusion, WIDTH - 2, "  "));

    if !lecture.key_takeaways.is_empty() {
        out.push_str("\nKEY TAKEAWAYS:\n");
        for (i, takeaway) in lecture.key_takeaways.iter().enumerate() {
            out.push_str(&wrap(&format!("{}. {takeaway}", i + 1), WIDTH - 4, "  "));
        }
    }
    out
}

pub fn quiz_header(quiz: &Quiz) -> String {
    boxed(&format!("QUIZ TIME! (Pass: {}%)", quiz.passing_score), '=')
}

pub fn question(index: usize, question: &Question) -> String {
    let mut out = format!("\n{}\nQuestion {}:\n\n", "-".repeat(WIDTH - 10), index + 1);
    out.push_str(&wrap(question.text(), WIDTH - 12, "  "));
    if let Question::MultipleChoice(q) = question {
        out.push('\n');
        for (letter, option) in ('A'..='D').zip(&q.options) {
            out.push_str(&wrap(&format!("{letter}. {option}"), WIDTH - 16, "  "));
        }
    }
    out
}

pub fn quiz_score(score: u32, passing_threshold: u32) -> String {
    let border = if score >= passing_threshold { '=' } else { '!' };
    boxed(&format!("QUIZ SCORE: {score}%"), border)
}

pub fn assignment(assignment: &Assignment) -> String {
    let mut out = heading(&format!("ASSIGNMENT: {}", assignment.title));
    out.push_str(&section("BACKGROUND"));
    out.push_str(&wrap(&assignment.background, WIDTH - 2, "  "));
    out.push('\n');
    out.push_str(&section("OBJECTIVE"));
    out.push_str(&wrap(&assignment.objective, WIDTH - 2, "  "));
    out.push('\n');

    out.push_str(&section("INSTRUCTIONS"));
    for (i, step) in assignment.steps.iter().enumerate() {
        out.push_str(&wrap(&format!("{}. {}", i + 1, step.instruction), WIDTH - 4, "  "));
    }
    out.push('\n');

    out.push_str(&section("SUCCESS CRITERIA"));
    for criterion in &assignment.success_criteria {
        out.push_str(&wrap(&format!("- {criterion}"), WIDTH - 4, "  "));
    }

    out.push_str(&heading("YOUR SUBMISSION"));
    out.push_str("Type your answer below (press Enter twice when done, or type 'SKIP' to skip)\n");
    out.push_str(&"-".repeat(WIDTH));
    out.push('\n');
    out
}

pub fn grading(result: &GradingResult) -> String {
    let mut out = heading(&format!(
        "ASSIGNMENT GRADED: {}% ({:?})",
        result.whole_score(),
        result.grade_level
    ));
    for (title, items) in [
        ("STRENGTHS", &result.strengths),
        ("AREAS FOR IMPROVEMENT", &result.improvements),
        ("RECOMMENDATIONS", &result.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&section(title));
        for (i, item) in items.iter().enumerate() {
            out.push_str(&wrap(&format!("{}. {item}", i + 1), WIDTH - 4, "  "));
        }
    }
    if !result.detailed_feedback.trim().is_empty() {
        out.push('\n');
        out.push_str(&section("FEEDBACK"));
        out.push_str(&wrap(&result.detailed_feedback, WIDTH - 2, "  "));
    }
    out
}

pub fn blank_submission(weak_points: &[String]) -> String {
    let mut out = heading("ASSIGNMENT GRADED: 0% (no submission)");
    if !weak_points.is_empty() {
        out.push_str("Concepts to revisit:\n");
        for point in weak_points {
            out.push_str(&wrap(&format!("- {point}"), WIDTH - 4, "  "));
        }
    }
    out
}

pub fn message(text: &str) -> String {
    format!("\n{}", wrap(text, WIDTH - 2, "  "))
}
