//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{SessionRuntime, SseEvent};
use crate::artifacts::{
    fixtures, AdvanceMessage, Assignment, GradingResult, LearningPlan, Lecture, Lesson,
    ProgressDecision, ProgressVerdict, Quiz, QuizAnswers, RepeatMessage, ShortAnswerEvaluation,
    ShortAnswerQuestion,
};
use crate::collaborators::{Collaborators, LectureBrief, Milestone, ProgressReport};
use crate::config::TeachingConfig;
use crate::error::StepError;
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::state_machine::{Event, SessionContext, SessionState};
use crate::tools::ToolContext;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};

// ============================================================================
// Mock LLM
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Scripted collaborators
// ============================================================================

type Script<T> = Mutex<VecDeque<Result<T, StepError>>>;

fn next_or<T>(script: &Script<T>, default: impl FnOnce() -> T) -> Result<T, StepError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(default()))
}

/// Collaborators that answer from queued results, falling back to valid fixtures.
pub struct ScriptedCollaborators {
    lessons: usize,
    plans: Script<LearningPlan>,
    lectures: Script<Lecture>,
    quizzes: Script<Quiz>,
    evaluations: Script<ShortAnswerEvaluation>,
    assignments: Script<Assignment>,
    gradings: Script<GradingResult>,
    assessments: Script<ProgressDecision>,
    repeats: Script<RepeatMessage>,
    advances: Script<AdvanceMessage>,
    delay: Mutex<Option<Duration>>,
    /// Notified whenever a call starts
    pub started: Arc<Notify>,
    /// Method names in call order
    pub calls: Mutex<Vec<&'static str>>,
    pub briefs: Mutex<Vec<LectureBrief>>,
}

impl ScriptedCollaborators {
    /// Plans default to `lessons` lessons
    pub fn new(lessons: usize) -> Self {
        Self {
            lessons,
            plans: Mutex::default(),
            lectures: Mutex::default(),
            quizzes: Mutex::default(),
            evaluations: Mutex::default(),
            assignments: Mutex::default(),
            gradings: Mutex::default(),
            assessments: Mutex::default(),
            repeats: Mutex::default(),
            advances: Mutex::default(),
            delay: Mutex::new(None),
            started: Arc::new(Notify::new()),
            calls: Mutex::new(Vec::new()),
            briefs: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call for `delay` before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(Some(delay));
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn queue_quiz(&self, quiz: Result<Quiz, StepError>) {
        self.quizzes.lock().unwrap().push_back(quiz);
    }

    pub fn queue_grading(&self, grading: Result<GradingResult, StepError>) {
        self.gradings.lock().unwrap().push_back(grading);
    }

    pub fn queue_assessment(&self, assessment: Result<ProgressDecision, StepError>) {
        self.assessments.lock().unwrap().push_back(assessment);
    }

    pub fn queue_plan(&self, plan: Result<LearningPlan, StepError>) {
        self.plans.lock().unwrap().push_back(plan);
    }

    pub fn recorded_calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.recorded_calls().iter().filter(|c| **c == method).count()
    }

    async fn enter(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
        self.started.notify_one();
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Collaborators for ScriptedCollaborators {
    async fn generate_plan(
        &self,
        _ctx: &ToolContext,
        _topic: &str,
        _background: &str,
    ) -> Result<LearningPlan, StepError> {
        self.enter("generate_plan").await;
        next_or(&self.plans, || fixtures::plan(self.lessons))
    }

    async fn deliver_lecture(
        &self,
        _ctx: &ToolContext,
        brief: &LectureBrief,
    ) -> Result<Lecture, StepError> {
        self.enter("deliver_lecture").await;
        self.briefs.lock().unwrap().push(brief.clone());
        next_or(&self.lectures, || fixtures::lecture(&brief.lesson.title))
    }

    async fn create_quiz(
        &self,
        _ctx: &ToolContext,
        lesson: &Lesson,
        _lecture: &Lecture,
    ) -> Result<Quiz, StepError> {
        self.enter("create_quiz").await;
        next_or(&self.quizzes, || fixtures::quiz(&lesson.title))
    }

    async fn evaluate_short_answer(
        &self,
        _ctx: &ToolContext,
        _question: &ShortAnswerQuestion,
        _answer: &str,
    ) -> Result<ShortAnswerEvaluation, StepError> {
        self.enter("evaluate_short_answer").await;
        next_or(&self.evaluations, || ShortAnswerEvaluation {
            is_correct: true,
            reasoning: "Covers the key points".to_string(),
        })
    }

    async fn create_assignment(
        &self,
        _ctx: &ToolContext,
        lesson: &Lesson,
        _quiz_score: u32,
        _weak_points: &[String],
    ) -> Result<Assignment, StepError> {
        self.enter("create_assignment").await;
        next_or(&self.assignments, || fixtures::assignment(&lesson.title))
    }

    async fn grade_submission(
        &self,
        _ctx: &ToolContext,
        _lesson: &Lesson,
        _assignment: &Assignment,
        _submission: &str,
    ) -> Result<GradingResult, StepError> {
        self.enter("grade_submission").await;
        next_or(&self.gradings, || fixtures::grading(90.0))
    }

    async fn assess_progress(
        &self,
        _ctx: &ToolContext,
        _report: &ProgressReport,
    ) -> Result<ProgressDecision, StepError> {
        self.enter("assess_progress").await;
        next_or(&self.assessments, || fixtures::progress(ProgressVerdict::Advance))
    }

    async fn compose_repeat_message(
        &self,
        _ctx: &ToolContext,
        _report: &ProgressReport,
    ) -> Result<RepeatMessage, StepError> {
        self.enter("compose_repeat_message").await;
        next_or(&self.repeats, fixtures::repeat_message)
    }

    async fn compose_advance_message(
        &self,
        _ctx: &ToolContext,
        _milestone: &Milestone,
    ) -> Result<AdvanceMessage, StepError> {
        self.enter("compose_advance_message").await;
        next_or(&self.advances, fixtures::advance_message)
    }
}

// ============================================================================
// Scripted learner
// ============================================================================

/// Learner that replays queued input, answering everything correctly by default.
#[derive(Default)]
pub struct ScriptedLearner {
    answers: Mutex<VecDeque<QuizAnswers>>,
    submissions: Mutex<VecDeque<String>>,
    /// Every input the runtime announced it was waiting for
    pub awaited: Mutex<Vec<InputKind>>,
}

impl ScriptedLearner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_answers(&self, answers: QuizAnswers) {
        self.answers.lock().unwrap().push_back(answers);
    }

    pub fn queue_submission(&self, submission: impl Into<String>) {
        self.submissions.lock().unwrap().push_back(submission.into());
    }
}

#[async_trait]
impl Learner for ScriptedLearner {
    fn set_awaiting(&self, input: Option<InputKind>) {
        if let Some(kind) = input {
            self.awaited.lock().unwrap().push(kind);
        }
    }

    async fn answer_quiz(&self, _quiz: &Quiz) -> Result<QuizAnswers, StepError> {
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(fixtures::correct_answers))
    }

    async fn submit_assignment(&self, _assignment: &Assignment) -> Result<String, StepError> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "fn main() { println!(\"done\"); }".to_string()))
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct InMemoryStore {
    snapshots: Mutex<HashMap<String, Vec<SessionState>>>,
    current: Mutex<HashMap<String, SessionState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self, session_id: &str) -> Vec<SessionState> {
        self.snapshots
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn phases(&self, session_id: &str) -> Vec<&'static str> {
        self.snapshots(session_id)
            .iter()
            .map(|s| s.phase.name())
            .collect()
    }

    pub fn current(&self, session_id: &str) -> Option<SessionState> {
        self.current.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn save_snapshot(&self, session_id: &str, state: &SessionState) -> Result<i64, String> {
        self.current
            .lock()
            .unwrap()
            .insert(session_id.to_string(), state.clone());
        let mut snapshots = self.snapshots.lock().unwrap();
        let trail = snapshots.entry(session_id.to_string()).or_default();
        trail.push(state.clone());
        Ok(i64::try_from(trail.len()).unwrap_or(i64::MAX))
    }

    async fn save_state(&self, session_id: &str, state: &SessionState) -> Result<(), String> {
        self.current
            .lock()
            .unwrap()
            .insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

// ============================================================================
// Test runtime
// ============================================================================

pub const TEST_SESSION: &str = "test-session";

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub store: Arc<InMemoryStore>,
    pub collaborators: Arc<ScriptedCollaborators>,
    pub learner: Arc<ScriptedLearner>,
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_rx: broadcast::Receiver<SseEvent>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

pub struct TestRuntimeBuilder {
    config: TeachingConfig,
    collaborators: ScriptedCollaborators,
    learner: ScriptedLearner,
}

impl TestRuntime {
    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder {
            config: TeachingConfig::default(),
            collaborators: ScriptedCollaborators::new(1),
            learner: ScriptedLearner::new(),
        }
    }
}

impl TestRuntimeBuilder {
    pub fn config(mut self, config: TeachingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn collaborators(mut self, collaborators: ScriptedCollaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn learner(mut self, learner: ScriptedLearner) -> Self {
        self.learner = learner;
        self
    }

    pub fn build(self) -> TestRuntime {
        let store = Arc::new(InMemoryStore::new());
        let collaborators = Arc::new(self.collaborators);
        let learner = Arc::new(self.learner);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(256);

        let runtime = SessionRuntime::new(
            SessionContext::new(TEST_SESSION, &self.config),
            &self.config,
            SessionState::new("Rust", "Python developer"),
            Arc::clone(&store),
            Arc::clone(&collaborators),
            Arc::clone(&learner),
            event_rx,
            event_tx.clone(),
            broadcast_tx,
        );

        let handle = tokio::spawn(async move {
            runtime.run().await;
        });

        TestRuntime {
            store,
            collaborators,
            learner,
            event_tx,
            broadcast_rx,
            _runtime_handle: handle,
        }
    }
}

impl TestRuntime {
    pub async fn send(&self, event: Event) {
        self.event_tx
            .send(event)
            .await
            .expect("Failed to send event");
    }

    /// Collect events until the session completes or halts
    pub async fn wait_for_terminal(&mut self, timeout: Duration) -> Vec<SseEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut seen = Vec::new();
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.broadcast_rx.recv()).await {
                Ok(Ok(event)) => {
                    let terminal = matches!(event, SseEvent::Completed { .. } | SseEvent::Halted { .. });
                    seen.push(event);
                    if terminal {
                        return seen;
                    }
                }
                _ => continue,
            }
        }
        panic!("session did not complete or halt in {timeout:?}; saw {seen:?}");
    }

    pub fn phases(&self) -> Vec<&'static str> {
        self.store.phases(TEST_SESSION)
    }

    pub fn state(&self) -> SessionState {
        self.store
            .current(TEST_SESSION)
            .expect("session state was never stored")
    }

    /// Check `completed == (idx == len)` and index bounds in every stored snapshot
    pub fn assert_snapshots_consistent(&self) {
        let snapshots = self.store.snapshots(TEST_SESSION);
        assert!(!snapshots.is_empty(), "no snapshots stored");
        for snapshot in snapshots.iter().chain(std::iter::once(&self.state())) {
            match &snapshot.learning_plan {
                Some(plan) => {
                    assert!(
                        snapshot.current_lesson_idx <= plan.len(),
                        "index past the plan in {snapshot:?}"
                    );
                    assert_eq!(
                        snapshot.completed,
                        snapshot.current_lesson_idx == plan.len(),
                        "completed flag out of step in {:?} snapshot",
                        snapshot.phase
                    );
                }
                None => {
                    assert_eq!(snapshot.current_lesson_idx, 0);
                    assert!(!snapshot.completed);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecisionPolicy;
    use crate::runtime::AwaitedInput;
    use crate::state_machine::{Phase, Step, COMPLETION_MESSAGE};

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_single_lesson_passes_first_time() {
        let mut rt = TestRuntime::builder().build();
        rt.send(Event::Start).await;

        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert!(matches!(
            events.last(),
            Some(SseEvent::Completed { message }) if message == COMPLETION_MESSAGE
        ));
        assert_eq!(
            rt.phases(),
            vec![
                "plan",
                "check_progress",
                "lecture",
                "quiz",
                "assignment",
                "grade",
                "decide",
                "advance_message",
                "check_progress",
                "done"
            ]
        );

        let state = rt.state();
        assert!(state.completed);
        assert_eq!(state.current_lesson_idx, 1);
        assert_eq!(state.attempt_count, 0);
        assert_eq!(state.quiz_score, 100);
        assert_eq!(state.assignment_score, 90);
        let decision = state.decision.unwrap();
        assert_eq!(decision.verdict, ProgressVerdict::Advance);
        assert!(!decision.forced);

        // Threshold policy never asks the evaluator for a verdict
        assert_eq!(rt.collaborators.count("assess_progress"), 0);
        assert_eq!(rt.collaborators.count("evaluate_short_answer"), 1);
        assert_eq!(
            *rt.learner.awaited.lock().unwrap(),
            vec![InputKind::Quiz, InputKind::Assignment]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            SseEvent::AwaitingInput { input: AwaitedInput::Quiz { .. } }
        )));
    }

    #[tokio::test]
    async fn test_failed_attempt_repeats_then_passes() {
        let learner = ScriptedLearner::new();
        learner.queue_answers(fixtures::wrong_answers());
        let mut rt = TestRuntime::builder().learner(learner).build();
        rt.send(Event::Start).await;

        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert!(matches!(events.last(), Some(SseEvent::Completed { .. })));
        assert_eq!(
            rt.phases(),
            vec![
                "plan",
                "check_progress",
                "lecture",
                "quiz",
                "assignment",
                "grade",
                "decide",
                "repeat_message",
                "lecture",
                "quiz",
                "assignment",
                "grade",
                "decide",
                "advance_message",
                "check_progress",
                "done"
            ]
        );

        let snapshots = rt.store.snapshots(TEST_SESSION);
        let repeat = snapshots
            .iter()
            .find(|s| s.phase == Phase::RepeatMessage)
            .unwrap();
        assert_eq!(repeat.attempt_count, 1);
        assert_eq!(repeat.current_lesson_idx, 0);
        assert!(repeat.lecture_content.is_none());
        assert!(repeat.message.is_none());

        let relecture = snapshots
            .iter()
            .filter(|s| s.phase == Phase::Lecture)
            .nth(1)
            .unwrap();
        assert_eq!(relecture.message.as_deref(), Some(fixtures::repeat_message().render().as_str()));

        let briefs = rt.collaborators.briefs.lock().unwrap().clone();
        assert_eq!(briefs.len(), 2);
        assert_eq!(briefs[0].attempt_count, 0);
        assert_eq!(briefs[1].attempt_count, 1);

        let state = rt.state();
        assert!(state.completed);
        assert_eq!(state.attempt_count, 0);
        // The blank short answer was marked wrong without asking the evaluator
        assert_eq!(rt.collaborators.count("evaluate_short_answer"), 1);
    }

    #[tokio::test]
    async fn test_invalid_quiz_halts_and_keeps_lecture() {
        let collaborators = ScriptedCollaborators::new(1);
        let mut short_quiz = fixtures::quiz("Lesson 1");
        short_quiz.questions.truncate(2);
        collaborators.queue_quiz(Ok(short_quiz));
        let mut rt = TestRuntime::builder().collaborators(collaborators).build();
        rt.send(Event::Start).await;

        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        let Some(SseEvent::Halted { step, error }) = events.last() else {
            panic!("expected a halt, got {events:?}");
        };
        assert_eq!(*step, Step::Quiz);
        assert!(error.is_validation());

        let state = rt.state();
        assert!(matches!(
            &state.phase,
            Phase::Halted { step: Step::Quiz, error } if error.is_validation()
        ));
        assert_eq!(state.lecture_content, Some(fixtures::lecture("Lesson 1")));
        assert!(state.quiz_results.is_none());
        assert!(state.assignment.is_none());
        assert!(!rt.phases().contains(&"assignment"));
        assert!(rt.learner.awaited.lock().unwrap().is_empty());

        // Resume runs the quiz again with a fresh call
        rt.send(Event::Resume).await;
        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert!(matches!(events.last(), Some(SseEvent::Completed { .. })));
        assert_eq!(rt.collaborators.count("create_quiz"), 2);
        assert_eq!(rt.collaborators.count("deliver_lecture"), 1);
    }

    #[tokio::test]
    async fn test_slow_collaborator_times_out() {
        let config = TeachingConfig {
            step_timeout: Duration::from_millis(50),
            ..TeachingConfig::default()
        };
        let collaborators = ScriptedCollaborators::new(1).with_delay(Duration::from_secs(30));
        let mut rt = TestRuntime::builder()
            .config(config)
            .collaborators(collaborators)
            .build();
        rt.send(Event::Start).await;

        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert!(matches!(
            events.last(),
            Some(SseEvent::Halted { step: Step::Plan, error }) if error.is_transport()
        ));
        assert!(rt.state().learning_plan.is_none());
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_step_and_resume_retries() {
        let collaborators = ScriptedCollaborators::new(1).with_delay(Duration::from_secs(30));
        let started = Arc::clone(&collaborators.started);
        let mut rt = TestRuntime::builder().collaborators(collaborators).build();
        rt.send(Event::Start).await;

        tokio::time::timeout(Duration::from_secs(1), started.notified())
            .await
            .expect("plan call should start");
        let begin = tokio::time::Instant::now();
        rt.send(Event::Cancel).await;

        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert!(begin.elapsed() < Duration::from_secs(2));
        assert!(matches!(
            events.last(),
            Some(SseEvent::Halted { step: Step::Plan, error: StepError::Cancelled })
        ));
        assert!(rt.state().phase.is_halted());

        rt.collaborators.set_delay(None);
        rt.send(Event::Resume).await;
        let events = rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert!(matches!(events.last(), Some(SseEvent::Completed { .. })));
        assert_eq!(rt.collaborators.count("generate_plan"), 2);
    }

    #[tokio::test]
    async fn test_blank_submission_is_not_sent_to_grader() {
        let learner = ScriptedLearner::new();
        learner.queue_submission("   ");
        let mut rt = TestRuntime::builder().learner(learner).build();
        rt.send(Event::Start).await;

        rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        let snapshots = rt.store.snapshots(TEST_SESSION);
        let first_decide = snapshots.iter().find(|s| s.phase == Phase::Decide).unwrap();
        assert_eq!(first_decide.assignment_score, 0);
        assert!(first_decide.grading_result.is_none());
        assert_eq!(first_decide.weak_points, fixtures::lesson(1).key_concepts);

        // Only the second attempt reached the grader
        assert_eq!(rt.collaborators.count("grade_submission"), 1);
        assert!(rt.state().completed);
    }

    #[tokio::test]
    async fn test_attempt_limit_forces_advance() {
        let config = TeachingConfig {
            max_attempts: Some(2),
            ..TeachingConfig::default()
        };
        let learner = ScriptedLearner::new();
        learner.queue_answers(fixtures::wrong_answers());
        learner.queue_answers(fixtures::wrong_answers());
        let mut rt = TestRuntime::builder().config(config).learner(learner).build();
        rt.send(Event::Start).await;

        rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        let snapshots = rt.store.snapshots(TEST_SESSION);
        let advance = snapshots
            .iter()
            .find(|s| s.phase == Phase::AdvanceMessage)
            .unwrap();
        let decision = advance.decision.as_ref().unwrap();
        assert_eq!(decision.verdict, ProgressVerdict::Advance);
        assert!(decision.forced);
        assert_eq!(rt.collaborators.count("compose_repeat_message"), 1);
        assert!(rt.state().completed);
    }

    #[tokio::test]
    async fn test_advisor_policy_follows_assessment() {
        let config = TeachingConfig {
            decision_policy: DecisionPolicy::Advisor,
            ..TeachingConfig::default()
        };
        let collaborators = ScriptedCollaborators::new(1);
        collaborators.queue_assessment(Ok(fixtures::progress(ProgressVerdict::Repeat)));
        let mut rt = TestRuntime::builder()
            .config(config)
            .collaborators(collaborators)
            .build();
        rt.send(Event::Start).await;

        rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        // Passing scores, but the first assessment asked for a repeat
        assert_eq!(rt.collaborators.count("assess_progress"), 2);
        assert_eq!(rt.collaborators.count("compose_repeat_message"), 1);
        assert!(rt.state().completed);
    }

    #[tokio::test]
    async fn test_multi_lesson_course_visits_every_lesson() {
        let mut rt = TestRuntime::builder()
            .collaborators(ScriptedCollaborators::new(3))
            .build();
        rt.send(Event::Start).await;

        rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        let titles: Vec<String> = rt
            .collaborators
            .briefs
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.lesson.title.clone())
            .collect();
        assert_eq!(titles, vec!["Lesson 1", "Lesson 2", "Lesson 3"]);

        assert_eq!(rt.state().current_lesson_idx, 3);
    }

    #[tokio::test]
    async fn test_empty_plan_completes_immediately() {
        let collaborators = ScriptedCollaborators::new(0);
        let mut rt = TestRuntime::builder().collaborators(collaborators).build();
        rt.send(Event::Start).await;

        rt.wait_for_terminal(WAIT).await;
        rt.assert_snapshots_consistent();
        assert_eq!(rt.phases(), vec!["plan", "check_progress", "done"]);
        let snapshots = rt.store.snapshots(TEST_SESSION);
        assert!(snapshots[1].learning_plan.as_ref().is_some_and(LearningPlan::is_empty));
        assert!(snapshots[1].completed);
        assert!(rt.state().completed);
    }

    #[tokio::test]
    async fn test_rejected_event_is_reported() {
        let mut rt = TestRuntime::builder().build();
        rt.send(Event::Resume).await;

        let event = tokio::time::timeout(WAIT, rt.broadcast_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SseEvent::Error { message } if message.contains("No transition")));
    }
}
