//! Intent classification cascade: custom-command triggers, then the ordered
//! regex table, then single-word keywords, then `unknown`.

use anyhow::{Context, Result};
use jarvis_core::config::IntentRules;
use jarvis_core::{normalize, Classification, CustomCommand, Intent, MatchTier};
use regex::Regex;

struct CompiledRule {
    intent: Intent,
    patterns: Vec<Regex>,
}

pub struct IntentClassifier {
    custom_commands: Vec<CustomCommand>,
    rules: Vec<CompiledRule>,
    keywords: Vec<(String, Intent)>,
}

impl IntentClassifier {
    /// Compile the configured tables. An invalid pattern is a configuration
    /// error and names the offending intent.
    pub fn from_config(rules: &IntentRules, custom_commands: Vec<CustomCommand>) -> Result<Self> {
        let compiled = rules
            .rules
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).with_context(|| {
                            format!("Invalid pattern for intent {}: {}", rule.intent, p)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledRule {
                    intent: rule.intent,
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let keywords = rules
            .keywords
            .iter()
            .map(|k| (k.keyword.to_lowercase(), k.intent))
            .collect();

        let mut classifier = Self {
            custom_commands: Vec::new(),
            rules: compiled,
            keywords,
        };
        for cmd in custom_commands {
            classifier.register_custom_command(cmd);
        }
        Ok(classifier)
    }

    /// Add a trigger at runtime. A command with the same name is replaced.
    /// Blank triggers are ignored since they would match everything.
    pub fn register_custom_command(&mut self, command: CustomCommand) {
        if command.trigger.trim().is_empty() {
            tracing::warn!(name = %command.name, "Ignoring custom command with blank trigger");
            return;
        }
        self.custom_commands.retain(|c| c.name != command.name);
        tracing::info!(name = %command.name, trigger = %command.trigger, "Custom command registered");
        self.custom_commands.push(command);
    }

    pub fn custom_commands(&self) -> &[CustomCommand] {
        &self.custom_commands
    }

    pub fn classify(&self, text: &str) -> Classification {
        let text = normalize(text);

        if let Some(cmd) = self
            .custom_commands
            .iter()
            .find(|c| text.contains(&normalize(&c.trigger)))
        {
            tracing::debug!(name = %cmd.name, "Custom command matched");
            return Classification::custom(cmd.clone());
        }

        for rule in &self.rules {
            if rule.patterns.iter().any(|p| p.is_match(&text)) {
                tracing::debug!(intent = %rule.intent, "Intent pattern matched");
                return Classification::new(rule.intent, MatchTier::Pattern);
            }
        }

        for token in text.split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if let Some((_, intent)) = self.keywords.iter().find(|(k, _)| k == token) {
                tracing::debug!(intent = %intent, keyword = token, "Intent keyword matched");
                return Classification::new(*intent, MatchTier::Keyword);
            }
        }

        Classification::unknown()
    }
}
