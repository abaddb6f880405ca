//! Learner that answers from the terminal

use super::render;
use crate::artifacts::{answer_key, parse_choice, Assignment, Question, Quiz, QuizAnswers};
use crate::error::StepError;
use crate::runtime::Learner;
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Invalid answers allowed before a default is used
const MAX_TRIES: usize = 3;
pub const SKIPPED_SUBMISSION: &str = "Assignment skipped by user";

/// Blocking source of input lines. `None` means end of input.
pub trait LineSource: Send + Sync {
    fn read_line(&self) -> Option<String>;
}

pub struct StdinLines;

impl LineSource for StdinLines {
    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

pub struct TerminalLearner {
    input: Arc<dyn LineSource>,
}

impl TerminalLearner {
    pub fn new(input: Arc<dyn LineSource>) -> Self {
        Self { input }
    }

    pub fn stdin() -> Self {
        Self::new(Arc::new(StdinLines))
    }

    pub async fn read_line(&self) -> Option<String> {
        let input = Arc::clone(&self.input);
        tokio::task::spawn_blocking(move || input.read_line())
            .await
            .ok()
            .flatten()
    }

    pub async fn prompt(&self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = io::stdout().flush();
        self.read_line().await
    }

    /// Ask until `parse` accepts the answer, falling back to `default`
    async fn ask(
        &self,
        prompt: &str,
        hint: &str,
        parse: fn(&str) -> Option<String>,
        default: &str,
    ) -> String {
        for attempt in 1..=MAX_TRIES {
            let Some(line) = self.prompt(prompt).await else {
                println!("\nSkipping question...");
                return default.to_string();
            };
            if let Some(answer) = parse(&line) {
                return answer;
            }
            println!(
                "Invalid input. Please enter {hint}. ({} attempts left)",
                MAX_TRIES - attempt
            );
        }
        println!("Max attempts reached. Using default answer '{default}'.");
        default.to_string()
    }
}

fn choice_answer(line: &str) -> Option<String> {
    parse_choice(line).map(String::from)
}

fn true_false_answer(line: &str) -> Option<String> {
    match line.trim().to_ascii_lowercase().as_str() {
        "true" | "t" => Some("True".to_string()),
        "false" | "f" => Some("False".to_string()),
        _ => None,
    }
}

/// Join submission lines; stops at two consecutive blank lines or at `SKIP`.
pub fn collect_submission(mut next_line: impl FnMut() -> Option<String>) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blanks = 0;
    while let Some(line) = next_line() {
        if line.trim().eq_ignore_ascii_case("skip") {
            return SKIPPED_SUBMISSION.to_string();
        }
        if line.trim().is_empty() {
            blanks += 1;
            if blanks >= 2 {
                break;
            }
        } else {
            blanks = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[async_trait]
impl Learner for TerminalLearner {
    async fn answer_quiz(&self, quiz: &Quiz) -> Result<QuizAnswers, StepError> {
        println!("\n{}", render::quiz_header(quiz));
        let mut answers = QuizAnswers::new();

        for (i, question) in quiz.questions.iter().enumerate() {
            println!("{}", render::question(i, question));
            let answer = match question {
                Question::MultipleChoice(_) => {
                    self.ask("Your answer (A/B/C/D): ", "A, B, C, or D", choice_answer, "A")
                        .await
                }
                Question::TrueFalse(_) => {
                    self.ask("Your answer (True/False): ", "True or False", true_false_answer, "True")
                        .await
                }
                Question::ShortAnswer(_) => self
                    .prompt("Your answer: ")
                    .await
                    .map(|a| a.trim().to_string())
                    .unwrap_or_default(),
            };
            answers.insert(answer_key(i), answer);
        }
        Ok(answers)
    }

    async fn submit_assignment(&self, assignment: &Assignment) -> Result<String, StepError> {
        print!("{}", render::assignment(assignment));
        let _ = io::stdout().flush();

        let input = Arc::clone(&self.input);
        let submission = tokio::task::spawn_blocking(move || collect_submission(|| input.read_line()))
            .await
            .map_err(|e| StepError::transport(format!("reading submission failed: {e}")))?;

        if submission == SKIPPED_SUBMISSION {
            println!("Skipping assignment with placeholder...");
        } else if submission.is_empty() {
            println!("Empty submission.");
        }
        Ok(submission)
    }
}
