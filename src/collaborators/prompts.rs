//! Prompt templates for the LLM-backed collaborators

use super::{LectureBrief, Milestone, ProgressReport};
use crate::artifacts::{Assignment, Lecture, Lesson, ShortAnswerQuestion};
use std::fmt::Write as _;

pub(super) const PROFESSOR_SYSTEM: &str = "You are an experienced professor who can teach any subject. \
You explain clearly and patiently, adapt to the learner's background, and care about understanding \
more than memorization. Treat mistakes as part of learning and keep a warm, professional tone.";

pub(super) const TUTOR_SYSTEM: &str = "You are a personal tutor. You find where a learner is struggling, \
give targeted and honest feedback, break hard ideas into small steps and recognise real progress. \
Stay supportive without lowering the bar.";

pub(super) const PLANNER_SYSTEM: &str = "You are an educational consultant who designs curricula. \
You turn a topic into a sequence of lessons that build on one another.";

/// Key concepts listed as achievements in an advance message.
const ACHIEVEMENTS_SHOWN: usize = 3;

const SEARCH_HINT: &str = "You may use web_search first to check current material on the subject. \
When you are done, call the submit tool with the finished result.";

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn lesson_header(lesson: &Lesson) -> String {
    format!(
        "Lesson: {}\nObjectives:\n{}\nKey concepts: {}",
        lesson.title,
        bullets(&lesson.objectives),
        inline(&lesson.key_concepts)
    )
}

pub(super) fn plan(topic: &str, background: &str, can_search: bool) -> String {
    let mut prompt = format!(
        "Topic: {topic}\nLearner background: {background}\n\n\
Design a learning plan for this topic.\n\
- Up to 8 lessons, ordered so each builds on the ones before it.\n\
- 3-5 specific, measurable objectives per lesson.\n\
- Realistic durations between 15 and 120 minutes per lesson.\n\
- List the key concepts and prerequisites of each lesson.\n\
- Rate each lesson Beginner, Intermediate or Advanced.\n\n\
Use the background to pick the starting level, the depth of each concept and the pace. \
Prefer examples that would matter to this learner."
    );
    if can_search {
        let _ = write!(prompt, "\n\n{SEARCH_HINT}");
    }
    prompt
}

pub(super) fn lecture(brief: &LectureBrief, can_search: bool) -> String {
    let mut prompt = format!(
        "{}\nLesson {} of {} in a course on {}\nLearner background: {}\nWeak points to address: {}\n\n\
Write an engaging 15-20 minute lecture for this lesson.\n\
- An introduction that states what the learner will be able to do afterwards.\n\
- 2-3 segments of 3-8 minutes each, simple ideas first. Give every segment a heading, \
concrete examples or analogies, and interaction points where the learner should pause and think.\n\
- A conclusion with the key takeaways.\n\n\
Format segment content as Markdown with headings, lists and fenced code blocks where they help.",
        lesson_header(&brief.lesson),
        brief.lesson_number,
        brief.total_lessons,
        brief.topic,
        brief.background,
        inline(&brief.weak_points),
    );
    if brief.attempt_count > 0 {
        prompt.push_str(
            "\n\nThe learner is repeating this lesson. Spend extra time on the weak points above and explain them differently from the first pass.",
        );
    }
    if can_search {
        let _ = write!(prompt, "\n\n{SEARCH_HINT}");
    }
    prompt
}

pub(super) fn quiz(lesson: &Lesson, lecture: &Lecture) -> String {
    format!(
        "{}\nLecture summary:\n{}\n\n\
Write a quiz of exactly 5 questions on this lecture.\n\
- 2-3 multiple choice questions with exactly 4 options each; correct_answer is the letter A-D.\n\
- 1 true/false question.\n\
- 1-2 short answer questions that ask the learner to apply an idea, with the key points a good answer covers.\n\n\
Every question must be answerable from the lecture. Test understanding rather than recall, \
make wrong options plausible misconceptions, avoid \"all of the above\", and go from easier to harder. \
Explain every answer.",
        lesson_header(lesson),
        lecture.summary(),
    )
}

pub(super) fn short_answer(question: &ShortAnswerQuestion, answer: &str) -> String {
    format!(
        "Question: {}\nModel answer: {}\nKey points:\n{}\n\nLearner answer: {answer}\n\n\
Decide whether the learner's answer is correct. It does not have to match the model answer word \
for word, but it must get the key points right. Give a short reason.",
        question.question,
        question.correct_answer,
        bullets(&question.key_points),
    )
}

pub(super) fn assignment(lesson: &Lesson, quiz_score: u32, weak_points: &[String]) -> String {
    let mut performance = format!("Quiz score: {quiz_score}%");
    if !weak_points.is_empty() {
        let _ = write!(performance, ", Weak areas: {}", weak_points.join(", "));
    }
    format!(
        "{}\n{performance}\n\n\
Design a hands-on assignment that takes 30-60 minutes.\n\
- A title, an objective and a short realistic scenario.\n\
- 5-8 numbered steps with what each should produce, plus hints for the tricky ones.\n\
- Clear deliverables and success criteria that can be checked objectively.\n\
- Optional resources and bonus challenges.\n\n\
Give the weak areas extra practice. Guide the learner without giving the answers away.",
        lesson_header(lesson),
    )
}

pub(super) fn grading(lesson: &Lesson, assignment: &Assignment, submission: &str) -> String {
    let instructions = assignment
        .steps
        .iter()
        .map(|step| format!("{}. {}", step.step_number, step.instruction))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Assignment: {}\nInstructions:\n{instructions}\n\nSuccess criteria:\n{}\n\nObjectives:\n{}\n\n\
Submission:\n{submission}\n\n\
Grade the submission from 0 to 100.\n\
- 90-100 Exceeds: mastery, goes beyond the brief.\n\
- 80-89 Meets: all requirements, minor gaps only.\n\
- 70-79 Partially Meets: most requirements, notable gaps.\n\
- below 70 Does Not Meet: incomplete or fundamentally wrong.\n\n\
Name 2-3 strengths and 2-3 improvements with concrete references to the submission, give \
actionable recommendations, list the lesson concepts that are not yet solid as weak points, \
and write an overall narrative. The submission passes at 70 or above. Be fair and do not inflate.",
        assignment.title,
        bullets(&assignment.success_criteria),
        bullets(&lesson.objectives),
    )
}

pub(super) fn progress(report: &ProgressReport) -> String {
    format!(
        "Course topic: {}\nLesson {} of {}: {}\nQuiz score: {}%\nAssignment score: {}%\n\
Attempt at this lesson: {}\nWeak points: {}\nPassing threshold: {}%\n\n\
Decide whether the learner should advance to the next lesson or repeat this one.\n\
The usual rule is to advance when both scores reach the threshold and no weak point is \
fundamental, and to repeat otherwise. Weigh the trend across attempts, whether the gaps would \
block later lessons, and whether another repeat would help or only frustrate. \
State your confidence and, when repeating, what to focus on.",
        report.topic,
        report.lesson_number,
        report.total_lessons,
        report.lesson.title,
        report.quiz_score,
        report.assignment_score,
        report.attempt,
        inline(&report.weak_points),
        report.passing_threshold,
    )
}

pub(super) fn repeat_message(report: &ProgressReport) -> String {
    format!(
        "The learner will repeat \"{}\".\nQuiz score: {}%\nAssignment score: {}%\nAttempt: {}\n\
Weak points: {}\nObjectives:\n{}\n\n\
Write an encouraging message for them.\n\
- Open warmly and present repetition as a normal part of mastering a subject.\n\
- Acknowledge what went well.\n\
- Explain how another pass will help.\n\
- Give 2-3 concrete focus areas tied to the weak points.\n\
- Suggest study strategies and say what the next attempt will look like.\n\
Be honest and specific, never punitive.",
        report.lesson.title,
        report.quiz_score,
        report.assignment_score,
        report.attempt,
        inline(&report.weak_points),
        bullets(&report.lesson.objectives),
    )
}

pub(super) fn advance_message(milestone: &Milestone) -> String {
    let next = milestone
        .next_lesson
        .as_ref()
        .map_or("Course Completion", |lesson| lesson.title.as_str());
    let achievements: Vec<String> = milestone
        .completed_lesson
        .key_concepts
        .iter()
        .take(ACHIEVEMENTS_SHOWN)
        .cloned()
        .collect();
    format!(
        "Lesson completed: {}\nQuiz score: {}%\nAssignment score: {}%\nNext lesson: {next}\n\
Overall progress: {} of {}\nConcepts mastered: {}\n\n\
Congratulate the learner on finishing this lesson. Celebrate specific achievements, preview \
what comes next and how it builds on what they just learned, and keep the momentum going.",
        milestone.completed_lesson.title,
        milestone.quiz_score,
        milestone.assignment_score,
        milestone.lesson_number,
        milestone.total_lessons,
        inline(&achievements),
    )
}
