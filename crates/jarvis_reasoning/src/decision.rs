use crate::context::IntentContext;
use chrono::{DateTime, Utc};
use jarvis_core::config::DirectoryConfig;
use jarvis_core::{
    Action, Classification, Decision, EmotionState, EntityKind, EntitySet, Intent, JarvisConfig,
    ResponseStyle, SafetyPolicy, WindowAction,
};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Logged decisions with the same action needed before the familiarity bonus.
const FAMILIARITY_MIN_REPEATS: usize = 3;
const FAMILIARITY_BONUS: f32 = 0.05;

// ============================================================================
// DecisionRule trait
// ============================================================================

/// What a rule gets to look at.
pub struct RuleInput<'a> {
    pub classification: &'a Classification,
    /// Normalized utterance, after any follow-up rewrite.
    pub text: &'a str,
    pub entities: &'a EntitySet,
    pub context: &'a IntentContext,
}

pub trait DecisionRule: Send + Sync {
    /// Build a decision, or None to pass to the next rule.
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision>;

    /// Name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Built-in rules
// ============================================================================

pub struct OpenAppRule;

impl DecisionRule for OpenAppRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        (input.classification.intent == Intent::OpenApp).then(|| {
            let app_name = input.entities.latest(EntityKind::AppName).map(str::to_string);
            Decision::new(Action::OpenApp { app_name }, 0.8, false)
        })
    }

    fn name(&self) -> &str { "open_app" }
}

pub struct OpenWebsiteRule {
    websites: BTreeMap<String, String>,
}

impl OpenWebsiteRule {
    pub fn new(websites: BTreeMap<String, String>) -> Self {
        let websites = websites
            .into_iter()
            .map(|(name, url)| (name.to_lowercase(), url))
            .collect();
        Self { websites }
    }

    /// Known name from the table, else anything that already looks like a host.
    fn resolve(&self, website: &str) -> Option<String> {
        let key = website.to_lowercase();
        if let Some(url) = self.websites.get(&key) {
            return Some(url.clone());
        }
        if key.starts_with("http://") || key.starts_with("https://") {
            Some(key)
        } else if key.contains('.') && !key.contains(' ') {
            Some(format!("https://{key}"))
        } else {
            None
        }
    }
}

impl DecisionRule for OpenWebsiteRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        if input.classification.intent != Intent::OpenWebsite {
            return None;
        }
        let website = input.entities.latest(EntityKind::Website).map(str::to_string);
        let url = website.as_deref().and_then(|w| self.resolve(w));
        Some(Decision::new(Action::OpenWebsite { website, url }, 0.8, false))
    }

    fn name(&self) -> &str { "open_website" }
}

pub struct SearchWebRule;

impl DecisionRule for SearchWebRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        (input.classification.intent == Intent::SearchWeb).then(|| {
            let query = input.entities.latest(EntityKind::Query).map(str::to_string);
            Decision::new(
                Action::SearchWeb {
                    query,
                    engine: "google".to_string(),
                },
                0.9,
                false,
            )
        })
    }

    fn name(&self) -> &str { "search_web" }
}

pub struct SendMessageRule {
    contacts: Vec<String>,
}

impl SendMessageRule {
    pub fn new(contacts: Vec<String>) -> Self {
        Self { contacts }
    }

    /// Canonical contact name: exact case-insensitive match first, then a
    /// contact whose name contains the spoken one.
    fn lookup(&self, person: &str) -> Option<&str> {
        let wanted = person.to_lowercase();
        self.contacts
            .iter()
            .find(|c| c.to_lowercase() == wanted)
            .or_else(|| self.contacts.iter().find(|c| c.to_lowercase().contains(&wanted)))
            .map(String::as_str)
    }
}

impl DecisionRule for SendMessageRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        if input.classification.intent != Intent::SendMessage {
            return None;
        }
        let spoken = input.entities.latest(EntityKind::Person);
        let contact = spoken.and_then(|p| self.lookup(p));
        let person = contact.or(spoken).map(str::to_string);
        let message = input.entities.latest(EntityKind::Message).map(str::to_string);
        let requires_confirmation = message.is_none();

        Some(Decision::new(
            Action::SendMessage {
                person,
                message,
                person_found: contact.is_some(),
            },
            0.7,
            requires_confirmation,
        ))
    }

    fn name(&self) -> &str { "send_message" }
}

pub struct PlayMusicRule;

impl DecisionRule for PlayMusicRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        (input.classification.intent == Intent::PlayMusic).then(|| {
            let song = input.entities.latest(EntityKind::Song).map(str::to_string);
            let platform = input
                .entities
                .latest(EntityKind::Platform)
                .unwrap_or("youtube")
                .to_string();
            Decision::new(Action::PlayMusic { song, platform }, 0.8, false)
        })
    }

    fn name(&self) -> &str { "play_music" }
}

pub struct SystemInfoRule;

impl DecisionRule for SystemInfoRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        (input.classification.intent == Intent::SystemInfo).then(|| {
            let metrics = input.entities.get(EntityKind::SystemMetric);
            let query = if metrics.is_empty() {
                "all".to_string()
            } else {
                metrics.join(",")
            };
            Decision::new(Action::SystemInfo { query }, 0.9, false)
        })
    }

    fn name(&self) -> &str { "system_info" }
}

/// Needs an explicit verb. Without a target it falls back to the last app
/// the user opened, then to the active window.
pub struct ControlWindowRule;

impl DecisionRule for ControlWindowRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        if input.classification.intent != Intent::ControlWindow {
            return None;
        }
        let action = input
            .entities
            .latest(EntityKind::WindowAction)
            .and_then(WindowAction::parse)?;
        let window = input
            .entities
            .latest(EntityKind::WindowTarget)
            .or_else(|| input.context.last_app())
            .unwrap_or("active")
            .to_string();
        let requires_confirmation = action == WindowAction::Close;
        Some(Decision::new(
            Action::ControlWindow { action, window },
            0.9,
            requires_confirmation,
        ))
    }

    fn name(&self) -> &str { "control_window" }
}

pub struct CodeAssistRule;

impl DecisionRule for CodeAssistRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        (input.classification.intent == Intent::CodeAssist).then(|| {
            let query = input
                .entities
                .latest(EntityKind::Query)
                .unwrap_or(input.text)
                .to_string();
            let language = input
                .entities
                .latest(EntityKind::Language)
                .unwrap_or("python")
                .to_string();
            Decision::new(Action::CodeAssist { query, language }, 0.7, false)
        })
    }

    fn name(&self) -> &str { "code_assist" }
}

pub struct CustomCommandRule;

impl DecisionRule for CustomCommandRule {
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Decision> {
        let cmd = input.classification.custom.as_ref()?;
        Some(Decision::new(
            Action::ExecuteCustom {
                command_name: cmd.name.clone(),
                actions: cmd.actions.clone(),
            },
            0.95,
            false,
        ))
    }

    fn name(&self) -> &str { "execute_custom" }
}

fn ai_fallback(input: &RuleInput<'_>) -> Decision {
    Decision::new(
        Action::AiFallback {
            original_intent: input.classification.intent,
            text: input.text.to_string(),
        },
        0.3,
        true,
    )
}

// ============================================================================
// DecisionEngine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionLogEntry {
    pub intent: Intent,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Rules in order, first match wins, then the denylist pass.
/// Anything no rule claims becomes `ai_fallback`.
pub struct DecisionEngine {
    rules: Vec<Box<dyn DecisionRule>>,
    safety: SafetyPolicy,
    log: VecDeque<DecisionLogEntry>,
    log_capacity: usize,
}

impl DecisionEngine {
    pub fn new(config: &JarvisConfig) -> Self {
        let mut engine = Self {
            rules: Vec::new(),
            safety: SafetyPolicy::new(config.safety.clone()),
            log: VecDeque::new(),
            log_capacity: config.context.decision_log_capacity,
        };
        engine.add_default_rules(&config.directory);
        engine
    }

    fn add_default_rules(&mut self, directory: &DirectoryConfig) {
        self.add_rule(Box::new(CustomCommandRule));
        self.add_rule(Box::new(OpenAppRule));
        self.add_rule(Box::new(OpenWebsiteRule::new(directory.websites.clone())));
        self.add_rule(Box::new(SearchWebRule));
        self.add_rule(Box::new(SendMessageRule::new(directory.contacts.clone())));
        self.add_rule(Box::new(PlayMusicRule));
        self.add_rule(Box::new(SystemInfoRule));
        self.add_rule(Box::new(ControlWindowRule));
        self.add_rule(Box::new(CodeAssistRule));
    }

    pub fn add_rule(&mut self, rule: Box<dyn DecisionRule>) {
        self.rules.push(rule);
    }

    pub fn decide(
        &mut self,
        classification: &Classification,
        text: &str,
        entities: &EntitySet,
        context: &IntentContext,
        emotion: &EmotionState,
    ) -> Decision {
        let input = RuleInput {
            classification,
            text,
            entities,
            context,
        };

        let mut decision = None;
        for rule in &self.rules {
            if let Some(d) = rule.evaluate(&input) {
                tracing::debug!(rule = rule.name(), confidence = d.confidence, "Decision rule matched");
                decision = Some(d);
                break;
            }
        }
        let decision = decision.unwrap_or_else(|| ai_fallback(&input));

        let mut decision = self.safety.enforce(decision);
        self.apply_familiarity(&mut decision);
        let decision = decision.with_style(ResponseStyle::for_label(emotion.label()));

        self.record(classification.intent, decision.action_name());
        tracing::info!(
            intent = %classification.intent,
            action = decision.action_name(),
            confidence = decision.confidence,
            requires_confirmation = decision.requires_confirmation,
            "Decision made"
        );
        decision
    }

    fn apply_familiarity(&self, decision: &mut Decision) {
        let repeats = self
            .log
            .iter()
            .filter(|e| e.action == decision.action_name())
            .count();
        if repeats >= FAMILIARITY_MIN_REPEATS {
            decision.set_confidence(decision.confidence + FAMILIARITY_BONUS);
        }
    }

    fn record(&mut self, intent: Intent, action: &str) {
        self.log.push_back(DecisionLogEntry {
            intent,
            action: action.to_string(),
            timestamp: Utc::now(),
        });
        while self.log.len() > self.log_capacity {
            self.log.pop_front();
        }
    }

    /// Replace the action of the latest log entry, for a turn whose
    /// directive was rewritten after the rules ran.
    pub fn amend_last(&mut self, action: &str) {
        if let Some(last) = self.log.back_mut() {
            last.action = action.to_string();
        }
    }

    pub fn log(&self) -> impl Iterator<Item = &DecisionLogEntry> {
        self.log.iter()
    }

    pub fn safety(&self) -> &SafetyPolicy {
        &self.safety
    }
}

// ============================================================================
// Tests
// ============================================================================
