//! Integration tests for the Brain.
//!
//! A mock executor records every directive it receives, so the full
//! listen → decide → execute → remember cycle runs without real skills.

use anyhow::{bail, Result};
use async_trait::async_trait;
use jarvis_core::{
    Action, ContextState, CustomCommand, Decision, EmotionLabel, ExecutionReport, Executor,
    JarvisConfig, SessionState,
};
use jarvis_memory::{BrainStore, ErrorRecord, MemoryEntry, PatternEntry, SqliteStore};
use jarvis_reasoning::{Brain, BrainError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// Mock Executor
// ============================================================================

struct MockExecutor {
    received: Mutex<Vec<Decision>>,
    fail: AtomicBool,
}

impl MockExecutor {
    fn new() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    fn failing() -> Self {
        let e = Self::new();
        e.fail.store(true, Ordering::SeqCst);
        e
    }

    async fn received(&self) -> Vec<Decision> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, decision: &Decision) -> Result<ExecutionReport> {
        self.received.lock().await.push(decision.clone());
        if self.fail.load(Ordering::SeqCst) {
            bail!("skill crashed");
        }
        Ok(ExecutionReport::ok(format!("done: {}", decision.action_name())))
    }
}

/// Fails with the action name, so no two failures look alike.
struct ActionNameFailure;

#[async_trait]
impl Executor for ActionNameFailure {
    async fn execute(&self, decision: &Decision) -> Result<ExecutionReport> {
        bail!("{}", decision.action_name())
    }
}

// ============================================================================
// Failing store
// ============================================================================

/// Every call fails, as if the database went away.
struct BrokenStore;

#[async_trait]
impl BrainStore for BrokenStore {
    async fn append_short_term(&self, _: &MemoryEntry, _: usize) -> Result<()> {
        bail!("disk full")
    }
    async fn load_short_term(&self) -> Result<Vec<MemoryEntry>> {
        bail!("disk full")
    }
    async fn save_patterns(&self, _: &[PatternEntry]) -> Result<()> {
        bail!("disk full")
    }
    async fn load_patterns(&self) -> Result<Vec<PatternEntry>> {
        bail!("disk full")
    }
    async fn save_context(&self, _: &ContextState) -> Result<()> {
        bail!("disk full")
    }
    async fn load_context(&self) -> Result<Option<ContextState>> {
        bail!("disk full")
    }
    async fn upsert_error(&self, _: &ErrorRecord) -> Result<()> {
        bail!("disk full")
    }
    async fn save_errors(&self, _: &[ErrorRecord]) -> Result<()> {
        bail!("disk full")
    }
    async fn load_errors(&self) -> Result<Vec<ErrorRecord>> {
        bail!("disk full")
    }
}

fn brain() -> Brain {
    Brain::new(JarvisConfig::default()).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_open_chrome() {
    let mut brain = brain();
    let decision = brain.process_utterance("open chrome", None).await.unwrap();
    assert_eq!(
        decision.action,
        Action::OpenApp {
            app_name: Some("chrome".into())
        }
    );
    assert!(!decision.requires_confirmation);
    assert_eq!(brain.session().current(), SessionState::Idle);
}

#[tokio::test]
async fn test_open_cmd_requires_confirmation() {
    let mut brain = brain();
    let decision = brain.process_utterance("open cmd", None).await.unwrap();
    assert_eq!(decision.action_name(), "confirm_dangerous");
    assert!(decision.requires_confirmation);
}

#[tokio::test]
async fn test_dangerous_app_embedded_in_name_requires_confirmation() {
    let mut brain = brain();
    for text in [
        "open powershell7",
        "open windowspowershell",
        "open regedit32",
        "start cmdline tool",
    ] {
        let decision = brain.process_utterance(text, None).await.unwrap();
        assert_eq!(decision.action_name(), "confirm_dangerous", "{text}");
        assert!(decision.requires_confirmation, "{text}");
    }
}

#[tokio::test]
async fn test_message_followup_round_trip() {
    let mut brain = brain();
    let executor = MockExecutor::new();

    let first = brain.handle_turn("message", None, &executor).await.unwrap();
    assert!(first.decision.is_followup_request());
    assert!(!first.executed);
    assert!(first.speak.unwrap().contains("Who should I message"));
    assert_eq!(
        brain.context().state().pending_followup.as_ref().map(|p| p.kind()),
        Some("whatsapp_details")
    );
    assert!(executor.received().await.is_empty());
    assert_eq!(
        brain.decisions().log().last().map(|l| l.action.as_str()),
        Some("ask_followup")
    );

    let second = brain
        .handle_turn("Raj hello there", None, &executor)
        .await
        .unwrap();
    assert!(second.success);
    assert_eq!(
        second.decision.action,
        Action::SendMessage {
            person: Some("raj".into()),
            message: Some("hello there".into()),
            person_found: false,
        }
    );
    assert!(brain.context().state().pending_followup.is_none());
    assert_eq!(executor.received().await.len(), 1);
}

#[tokio::test]
async fn test_happy_emotion_detected() {
    let mut brain = brain();
    let executor = MockExecutor::new();
    let outcome = brain
        .handle_turn("Thanks, that's great!", None, &executor)
        .await
        .unwrap();
    assert_eq!(outcome.emotion.label(), EmotionLabel::Happy);
    assert!(outcome.emotion.mood_score() > 0.0);
    assert!(outcome.speak.unwrap().starts_with("Great! "));
}

#[tokio::test]
async fn test_short_term_evicts_after_capacity() {
    let mut brain = brain();
    let executor = MockExecutor::new();
    for _ in 0..51 {
        brain
            .handle_turn("check battery status", None, &executor)
            .await
            .unwrap();
    }
    assert_eq!(brain.short_term().len(), 50);
    assert!(brain.short_term().get(1).is_none());
    assert!(brain.short_term().get(51).is_some());
    assert_eq!(brain.stats().commands, 51);
    assert_eq!(brain.stats().successes, 51);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_executor_failure_goes_through_learning() {
    let mut brain = brain();
    let executor = MockExecutor::failing();
    let outcome = brain.handle_turn("open chrome", None, &executor).await.unwrap();

    assert!(outcome.executed);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("skill crashed"));
    assert_eq!(brain.session().current(), SessionState::Idle);

    let visited: Vec<SessionState> = brain.session().history().map(|t| t.to).collect();
    assert!(visited.contains(&SessionState::Error));
    assert!(visited.contains(&SessionState::Learning));

    assert_eq!(brain.errors().records().len(), 1);
    assert_eq!(brain.errors().records()[0].error_type, "execution");
    assert_eq!(brain.stats().successes, 0);
    // Failed directives are not learned as patterns.
    assert!(brain.long_term().is_empty());
}

#[tokio::test]
async fn test_store_failures_do_not_stop_the_brain() {
    let mut brain = Brain::with_store(JarvisConfig::default(), Arc::new(BrokenStore))
        .await
        .unwrap();
    let executor = MockExecutor::new();
    let outcome = brain.handle_turn("open chrome", None, &executor).await.unwrap();

    assert!(outcome.success);
    assert_eq!(brain.short_term().len(), 1);
    assert!(brain
        .errors()
        .records()
        .iter()
        .any(|r| r.error_type == "persistence"));
}

#[tokio::test]
async fn test_shutdown_is_terminal() {
    let mut brain = brain();
    brain.shutdown().await;
    assert_eq!(brain.session().current(), SessionState::Shutdown);
    let err = brain.process_utterance("open chrome", None).await.unwrap_err();
    assert!(matches!(err, BrainError::InvalidTransition(_)));
}

// ============================================================================
// Lifecycle and runtime registration
// ============================================================================

#[tokio::test]
async fn test_sleep_and_wake() {
    let mut brain = brain();
    brain.sleep().unwrap();
    assert_eq!(brain.session().current(), SessionState::Sleep);
    brain.wake().unwrap();
    assert_eq!(brain.session().current(), SessionState::Idle);
    assert!(matches!(brain.wake(), Err(BrainError::InvalidTransition(_))));

    // An utterance wakes a sleeping brain.
    brain.sleep().unwrap();
    brain.process_utterance("open chrome", None).await.unwrap();
    assert_eq!(brain.session().current(), SessionState::Idle);
}

#[tokio::test]
async fn test_runtime_custom_command() {
    let mut brain = brain();
    brain.register_custom_command(CustomCommand {
        name: "movie_mode".into(),
        trigger: "movie time".into(),
        actions: vec!["vlc".into(), "netflix".into()],
    });
    let decision = brain
        .process_utterance("It's movie time, open chrome", None)
        .await
        .unwrap();
    assert_eq!(
        decision.action,
        Action::ExecuteCustom {
            command_name: "movie_mode".into(),
            actions: vec!["vlc".into(), "netflix".into()],
        }
    );
}

#[tokio::test]
async fn test_successful_turn_is_learned() {
    let mut brain = brain();
    let executor = MockExecutor::new();
    brain
        .handle_turn("search rust async book", None, &executor)
        .await
        .unwrap();
    brain
        .handle_turn("search rust async tutorials", None, &executor)
        .await
        .unwrap();
    assert_eq!(brain.long_term().len(), 1);
    assert_eq!(brain.long_term().patterns()[0].usage_count, 2);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_state_restored_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("brain.db");
    let executor = MockExecutor::new();

    {
        let store = Arc::new(SqliteStore::new(&path).await.unwrap());
        let mut brain = Brain::with_store(JarvisConfig::default(), store).await.unwrap();
        brain.handle_turn("open chrome", None, &executor).await.unwrap();
        brain
            .handle_turn("search rust tutorials", None, &executor)
            .await
            .unwrap();
        brain.handle_turn("check battery", None, &executor).await.unwrap();
        brain.shutdown().await;
    }

    let store = Arc::new(SqliteStore::new(&path).await.unwrap());
    let brain = Brain::with_store(JarvisConfig::default(), store).await.unwrap();
    assert_eq!(brain.short_term().len(), 3);
    assert_eq!(brain.long_term().len(), 3);
    assert_eq!(brain.context().state().turn_count, 3);
    assert_eq!(brain.context().state().current_topic(), "system");
    assert_eq!(brain.session().current(), SessionState::Idle);
}

#[tokio::test]
async fn test_context_checkpoint_survives_without_shutdown() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("brain.db");
    let executor = MockExecutor::new();

    let saved_stack = {
        let store = Arc::new(SqliteStore::new(&path).await.unwrap());
        let mut brain = Brain::with_store(JarvisConfig::default(), store).await.unwrap();
        for _ in 0..5 {
            brain.handle_turn("open chrome", None, &executor).await.unwrap();
            brain.handle_turn("check battery", None, &executor).await.unwrap();
        }
        assert_eq!(brain.context().state().turn_count, 10);
        // Dropped without shutdown: only the tenth-turn checkpoint persists it.
        brain.context().state().topic_stack.clone()
    };

    let store = Arc::new(SqliteStore::new(&path).await.unwrap());
    let brain = Brain::with_store(JarvisConfig::default(), store).await.unwrap();
    let state = brain.context().state();
    assert_eq!(state.turn_count, 10);
    assert_eq!(state.topic_stack, saved_stack);
    assert_eq!(state.current_topic(), "system");
}

#[tokio::test]
async fn test_cleaned_errors_stay_gone_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("brain.db");
    let mut config = JarvisConfig::default();
    config.memory.long_term_retention_days = -1;

    {
        let store = Arc::new(SqliteStore::new(&path).await.unwrap());
        let mut brain = Brain::with_store(config.clone(), store.clone()).await.unwrap();
        brain
            .handle_turn("open chrome", None, &MockExecutor::failing())
            .await
            .unwrap();
        assert_eq!(brain.errors().records().len(), 1);
        assert_eq!(store.load_errors().await.unwrap().len(), 1);

        brain.maintain().await;
        assert!(brain.errors().records().is_empty());
        assert!(store.load_errors().await.unwrap().is_empty());
    }

    let store = Arc::new(SqliteStore::new(&path).await.unwrap());
    let brain = Brain::with_store(config, store).await.unwrap();
    assert!(brain.errors().records().is_empty());
}

#[tokio::test]
async fn test_error_capacity_trim_reaches_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("brain.db");
    let mut config = JarvisConfig::default();
    config.memory.error_history_capacity = 2;
    let store = Arc::new(SqliteStore::new(&path).await.unwrap());
    let mut brain = Brain::with_store(config, store.clone()).await.unwrap();
    let executor = ActionNameFailure;

    for text in ["open chrome", "check battery", "search rust async book"] {
        brain.handle_turn(text, None, &executor).await.unwrap();
    }
    let stored: Vec<u64> = store.load_errors().await.unwrap().iter().map(|r| r.id).collect();
    let kept: Vec<u64> = brain.errors().records().iter().map(|r| r.id).collect();
    assert_eq!(kept.len(), 2);
    assert_eq!(stored, kept);
}
