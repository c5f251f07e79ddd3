use crate::context::{ContextTracker, TurnInput};
use crate::decision::DecisionEngine;
use crate::entities::EntityExtractor;
use crate::followup;
use crate::intent::IntentClassifier;
use chrono::Utc;
use jarvis_core::{
    normalize, Action, Classification, CustomCommand, Decision, EmotionState, EntityKind,
    ExecutionReport, Executor, InvalidTransition, JarvisConfig, SessionState,
    SessionStateMachine, VoiceFeatures,
};
use jarvis_emotion::EmotionEngine;
use jarvis_memory::{
    BrainStore, ErrorMemory, LongTermMemory, MergeOutcome, MergePolicy, ShortTermMemory,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("Configuration error: {0:#}")]
    Config(anyhow::Error),
}

/// Result of one full listen → decide → execute cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub decision: Decision,
    pub emotion: EmotionState,
    /// The executor was called.
    pub executed: bool,
    pub success: bool,
    /// Text to say aloud, already carrying the response-style prefix.
    pub speak: Option<String>,
    /// Executor failure, if any. Never propagated as an `Err`.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrainStats {
    pub commands: u64,
    pub successes: u64,
}

struct DecidedTurn {
    decision: Decision,
    emotion: EmotionState,
    text: String,
    classification: Classification,
}

/// The orchestrator. One per process; every mutation goes through `&mut self`.
pub struct Brain {
    config: JarvisConfig,
    session: SessionStateMachine,
    classifier: IntentClassifier,
    extractor: EntityExtractor,
    context: ContextTracker,
    emotion: EmotionEngine,
    decisions: DecisionEngine,
    short_term: ShortTermMemory,
    long_term: LongTermMemory,
    errors: ErrorMemory,
    store: Option<Arc<dyn BrainStore>>,
    stats: BrainStats,
}

impl Brain {
    /// In-memory brain with no durable store.
    pub fn new(config: JarvisConfig) -> Result<Self, BrainError> {
        let classifier =
            IntentClassifier::from_config(&config.intents, config.custom_commands.clone())
                .map_err(BrainError::Config)?;

        Ok(Self {
            session: SessionStateMachine::new(),
            classifier,
            extractor: EntityExtractor::new(),
            context: ContextTracker::new(config.context.clone()),
            emotion: EmotionEngine::new(config.emotion.clone()),
            decisions: DecisionEngine::new(&config),
            short_term: ShortTermMemory::new(config.memory.short_term_capacity),
            long_term: LongTermMemory::new(MergePolicy::from_config(&config.memory)),
            errors: ErrorMemory::new(&config.memory),
            store: None,
            stats: BrainStats::default(),
            config,
        })
    }

    /// Brain backed by `store`, restoring whatever it already holds.
    /// A part that fails to load starts empty.
    pub async fn with_store(
        config: JarvisConfig,
        store: Arc<dyn BrainStore>,
    ) -> Result<Self, BrainError> {
        let mut brain = Self::new(config)?;
        let memory = &brain.config.memory;

        match store.load_short_term().await {
            Ok(entries) => {
                brain.short_term = ShortTermMemory::restore(memory.short_term_capacity, entries)
            }
            Err(e) => tracing::warn!("Failed to restore short-term memory: {:#}", e),
        }
        match store.load_patterns().await {
            Ok(patterns) => {
                brain.long_term =
                    LongTermMemory::restore(MergePolicy::from_config(memory), patterns)
            }
            Err(e) => tracing::warn!("Failed to restore long-term patterns: {:#}", e),
        }
        match store.load_context().await {
            Ok(Some(state)) => {
                brain.context = ContextTracker::restore(brain.config.context.clone(), state)
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to restore context snapshot: {:#}", e),
        }
        match store.load_errors().await {
            Ok(records) => brain.errors = ErrorMemory::restore(memory, records),
            Err(e) => tracing::warn!("Failed to restore error memory: {:#}", e),
        }

        tracing::info!(
            short_term = brain.short_term.len(),
            patterns = brain.long_term.len(),
            turns = brain.context.state().turn_count,
            errors = brain.errors.records().len(),
            "Brain restored"
        );
        brain.store = Some(store);
        Ok(brain)
    }

    // ========================================================================
    // Turn handling
    // ========================================================================

    /// Decide what to do with one utterance without executing it.
    pub async fn process_utterance(
        &mut self,
        text: &str,
        voice: Option<VoiceFeatures>,
    ) -> Result<Decision, BrainError> {
        let turn = self.decide_turn(text, voice).await?;
        self.walk(&[SessionState::Speaking, SessionState::Idle])?;
        Ok(turn.decision)
    }

    /// Decide, hand the directive to `executor`, and record the outcome.
    pub async fn handle_turn(
        &mut self,
        text: &str,
        voice: Option<VoiceFeatures>,
        executor: &dyn Executor,
    ) -> Result<TurnOutcome, BrainError> {
        let turn = self.decide_turn(text, voice).await?;
        let DecidedTurn {
            decision,
            emotion,
            text,
            classification,
        } = turn;
        let prefix = decision.style.prefix.clone();

        if let Action::AskFollowup { prompt, .. } = &decision.action {
            let speak = Some(format!("{prefix}{prompt}"));
            self.remember_turn(&decision, &text, true).await;
            self.walk(&[SessionState::Speaking, SessionState::Idle])?;
            return Ok(TurnOutcome {
                decision,
                emotion,
                executed: false,
                success: true,
                speak,
                error: None,
            });
        }

        self.session.transition(SessionState::Executing)?;
        let result = executor.execute(&decision).await;

        let outcome = match result {
            Ok(report) if report.success => {
                self.stats.successes += 1;
                self.remember_turn(&decision, &text, true).await;
                let speak = report.speak.map(|s| format!("{prefix}{s}"));
                if speak.is_some() {
                    self.walk(&[SessionState::Speaking, SessionState::Idle])?;
                } else {
                    self.session.transition(SessionState::Idle)?;
                }
                TurnOutcome {
                    decision,
                    emotion,
                    executed: true,
                    success: true,
                    speak,
                    error: None,
                }
            }
            failed => {
                let message = match failed {
                    Ok(ExecutionReport { details, .. }) => format!("Execution failed: {details}"),
                    Err(e) => format!("{e:#}"),
                };
                tracing::warn!(
                    action = decision.action_name(),
                    intent = %classification.intent,
                    error = %message,
                    "Directive failed"
                );
                self.session.transition(SessionState::Error)?;
                self.record_failure("execution", &message, &text).await;
                self.remember_turn(&decision, &text, false).await;
                self.walk(&[SessionState::Learning, SessionState::Idle])?;
                TurnOutcome {
                    decision,
                    emotion,
                    executed: true,
                    success: false,
                    speak: None,
                    error: Some(message),
                }
            }
        };
        Ok(outcome)
    }

    /// Everything up to the directive. Leaves the session in `Processing`.
    async fn decide_turn(
        &mut self,
        raw: &str,
        voice: Option<VoiceFeatures>,
    ) -> Result<DecidedTurn, BrainError> {
        if self.session.current() != SessionState::Listening {
            self.session.transition(SessionState::Listening)?;
        }
        self.session.transition(SessionState::Processing)?;

        let (rewritten, consumed_followup) = self.context.apply_followup(raw);
        let text = normalize(&rewritten);

        let classification = self.classifier.classify(&text);
        let mut entities = self.extractor.extract(&text, classification.intent);
        if let Some(cmd) = &classification.custom {
            entities.insert(EntityKind::CommandName, cmd.name.clone());
        }
        let emotion = self.emotion.detect(raw, voice);

        let intent_context = self.context.context_for_intent(classification.intent);
        let decision =
            self.decisions
                .decide(&classification, &text, &entities, &intent_context, &emotion);

        let state = self.context.update(TurnInput {
            utterance: &text,
            response: decision.action_name(),
            intent: classification.intent,
            entities: &entities,
            consumed_followup,
        });

        let decision = match &state.pending_followup {
            Some(pending) => {
                let asked = Decision::new(
                    Action::AskFollowup {
                        followup: pending.kind().to_string(),
                        prompt: followup::prompt_for(pending),
                    },
                    classification.confidence,
                    false,
                )
                .with_style(decision.style);
                self.decisions.amend_last(asked.action_name());
                asked
            }
            None => decision,
        };

        if self.context.checkpoint_due() {
            self.persist_context().await;
        }
        self.stats.commands += 1;

        tracing::info!(
            text = %text,
            intent = %classification.intent,
            tier = ?classification.tier,
            action = decision.action_name(),
            emotion = %emotion.label(),
            "Turn decided"
        );
        Ok(DecidedTurn {
            decision,
            emotion,
            text,
            classification,
        })
    }

    fn walk(&mut self, path: &[SessionState]) -> Result<(), BrainError> {
        for state in path {
            self.session.transition(*state)?;
        }
        Ok(())
    }

    // ========================================================================
    // Memory
    // ========================================================================

    async fn remember_turn(&mut self, decision: &Decision, text: &str, success: bool) {
        let details = json!({
            "text": text,
            "params": decision.action,
            "confidence": decision.confidence,
            "success": success,
        });
        let entry = self.short_term.push(decision.action_name(), details);
        let learned = success && !decision.is_followup_request();
        if learned {
            let pattern = format!("{} {}", decision.action_name(), text);
            if let MergeOutcome::Appended { .. } = self.long_term.remember(&pattern, Utc::now()) {
                tracing::debug!(pattern = %pattern, "New pattern learned");
            }
        }

        let Some(store) = self.store.clone() else {
            return;
        };
        if let Err(e) = store
            .append_short_term(&entry, self.short_term.capacity())
            .await
        {
            self.note_store_failure("append_short_term", e);
        }
        if learned {
            if let Err(e) = store.save_patterns(self.long_term.patterns()).await {
                self.note_store_failure("save_patterns", e);
            }
        }
    }

    async fn record_failure(&mut self, error_type: &str, message: &str, context: &str) {
        let before = self.errors.records().len();
        let record = self
            .errors
            .record_error(error_type, message, context, Utc::now());
        // A new record that did not grow the list pushed the oldest out.
        let trimmed = record.occurrence_count == 1 && self.errors.records().len() == before;

        let Some(store) = self.store.clone() else {
            return;
        };
        let (operation, result) = if trimmed {
            ("save_errors", store.save_errors(self.errors.records()).await)
        } else {
            ("upsert_error", store.upsert_error(&record).await)
        };
        if let Err(e) = result {
            self.note_store_failure(operation, e);
        }
    }

    async fn persist_context(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        match store.save_context(self.context.state()).await {
            Ok(()) => tracing::debug!(
                turn = self.context.state().turn_count,
                "Context snapshot saved"
            ),
            Err(e) => self.note_store_failure("save_context", e),
        }
    }

    /// Store failures are kept in memory only.
    fn note_store_failure(&mut self, operation: &str, error: anyhow::Error) {
        let message = format!("{error:#}");
        tracing::warn!(operation, error = %message, "Brain store write failed");
        self.errors
            .record_error("persistence", &message, operation, Utc::now());
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn register_custom_command(&mut self, command: CustomCommand) {
        self.classifier.register_custom_command(command);
    }

    pub fn sleep(&mut self) -> Result<(), BrainError> {
        self.session.transition(SessionState::Sleep)?;
        tracing::info!("Brain sleeping");
        Ok(())
    }

    pub fn wake(&mut self) -> Result<(), BrainError> {
        self.session.transition(SessionState::Idle)?;
        tracing::info!("Brain awake");
        Ok(())
    }

    /// Drop stale long-term patterns and old errors.
    pub async fn maintain(&mut self) {
        let now = Utc::now();
        let days = self.config.memory.long_term_retention_days;
        let patterns = self.long_term.cleanup_older_than(days, now);
        let errors = self.errors.cleanup_older_than(days, now);
        tracing::info!(patterns, errors, "Memory maintenance done");

        let Some(store) = self.store.clone() else {
            return;
        };
        if patterns > 0 {
            if let Err(e) = store.save_patterns(self.long_term.patterns()).await {
                self.note_store_failure("save_patterns", e);
            }
        }
        if errors > 0 {
            if let Err(e) = store.save_errors(self.errors.records()).await {
                self.note_store_failure("save_errors", e);
            }
        }
    }

    /// Persist the final snapshot and stop. Reaches `Shutdown` from any state.
    pub async fn shutdown(&mut self) {
        self.maintain().await;
        self.persist_context().await;
        if self.session.can_transition(SessionState::Shutdown) {
            let _ = self.session.transition(SessionState::Shutdown);
        } else if self.session.current() != SessionState::Shutdown {
            self.session.force(SessionState::Shutdown);
        }
        tracing::info!(
            commands = self.stats.commands,
            successes = self.stats.successes,
            "Brain shut down"
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &JarvisConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn context(&self) -> &ContextTracker {
        &self.context
    }

    pub fn emotion(&self) -> &EmotionEngine {
        &self.emotion
    }

    pub fn decisions(&self) -> &DecisionEngine {
        &self.decisions
    }

    pub fn short_term(&self) -> &ShortTermMemory {
        &self.short_term
    }

    pub fn long_term(&self) -> &LongTermMemory {
        &self.long_term
    }

    pub fn errors(&self) -> &ErrorMemory {
        &self.errors
    }

    pub fn stats(&self) -> BrainStats {
        self.stats
    }
}
