use crate::intent::{CustomCommand, Intent};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JarvisConfig {
    pub memory: MemoryConfig,
    pub context: ContextConfig,
    pub safety: SafetyConfig,
    pub intents: IntentRules,
    pub custom_commands: Vec<CustomCommand>,
    pub directory: DirectoryConfig,
    pub emotion: EmotionConfig,
    pub voice: VoiceConfig,
}

impl JarvisConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML config")
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("JARVIS_DB_PATH") {
            self.memory.db_path = v;
        }
        if let Ok(v) = std::env::var("JARVIS_SHORT_TERM_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.memory.short_term_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("JARVIS_ENTITY_TTL_SECS") {
            if let Ok(n) = v.parse() {
                self.context.entity_ttl_secs = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub db_path: String,
    pub short_term_capacity: usize,
    /// Patterns sharing more than this many tokens are merged.
    pub merge_min_shared_tokens: usize,
    /// Jaccard similarity of error messages above which two errors are the same.
    pub error_message_similarity: f32,
    /// Jaccard similarity of error contexts above which two errors are the same.
    pub error_context_similarity: f32,
    pub error_history_capacity: usize,
    pub long_term_retention_days: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: "jarvis.db".to_string(),
            short_term_capacity: 50,
            merge_min_shared_tokens: 2,
            error_message_similarity: 0.6,
            error_context_similarity: 0.7,
            error_history_capacity: 1000,
            long_term_retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub history_capacity: usize,
    pub topic_stack_capacity: usize,
    pub entity_ttl_secs: i64,
    /// Persist a context snapshot every N turns.
    pub snapshot_every_turns: u64,
    pub decision_log_capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            topic_stack_capacity: 10,
            entity_ttl_secs: 3600,
            snapshot_every_turns: 10,
            decision_log_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub dangerous_apps: Vec<String>,
    pub dangerous_websites: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            dangerous_apps: to_strings(&[
                "cmd",
                "powershell",
                "regedit",
                "taskmgr",
                "diskpart",
                "format",
                "shutdown",
                "del",
                "rm",
            ]),
            dangerous_websites: to_strings(&[
                "virus",
                "hack",
                "malware",
                "phishing",
                "scam",
                "fraud",
                "dangerous",
                "unsafe",
            ]),
        }
    }
}

/// One intent with its ordered regex patterns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntentRule {
    pub intent: Intent,
    pub patterns: Vec<String>,
}

/// Single-word fallback entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub intent: Intent,
}

/// Classification tables. `rules` order is the intent priority order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntentRules {
    pub rules: Vec<IntentRule>,
    pub keywords: Vec<KeywordRule>,
}

impl Default for IntentRules {
    fn default() -> Self {
        Self {
            rules: default_intent_rules(),
            keywords: default_keywords(),
        }
    }
}

fn rule(intent: Intent, patterns: &[&str]) -> IntentRule {
    IntentRule {
        intent,
        patterns: to_strings(patterns),
    }
}

fn default_intent_rules() -> Vec<IntentRule> {
    vec![
        rule(
            Intent::OpenWebsite,
            &[
                r"^open (.+) website$",
                r"(.+) website kholo",
                r"^go to (.+)",
                r"^navigate to (.+)",
                r"^visit (.+)",
                r"(.+) par jao",
            ],
        ),
        rule(
            Intent::PlayMusic,
            &[
                r"^play (.+)",
                r"^music (.+)",
                r"^gaana (.+)",
                r"^song (.+)",
                r"^play music$",
                r"gaana chalao",
            ],
        ),
        rule(
            Intent::OpenApp,
            &[
                r"^open (.+)",
                r"(.+) open karo",
                r"^start (.+)",
                r"(.+) chalao",
                r"^launch (.+)",
                r"^run (.+)",
            ],
        ),
        rule(
            Intent::SearchWeb,
            &[
                r"^search (.+)",
                r"^google (.+)",
                r"^find (.+)",
                r"^look up (.+)",
                r"^dhundho (.+)",
                r"(.+) dhundho$",
            ],
        ),
        rule(
            Intent::SendMessage,
            &[
                r"^whatsapp (.+)",
                r"^message (.+)",
                r"^text (.+)",
                r"^send (?:a )?message to (.+)",
                r"(.+) ko message bhejo",
                r"(.+) ko bol do",
            ],
        ),
        rule(
            Intent::ControlWindow,
            &[
                r"^minimize\b",
                r"^maximize\b",
                r"^close\b",
                r"^restore\b",
                r"^window (.+)",
            ],
        ),
        rule(
            Intent::CodeAssist,
            &[
                r"^code (.+)",
                r"^program (.+)",
                r"^python (.+)",
                r"^write (.+) code",
                r"^create (.+) program",
                r"(.+) ka code likho",
            ],
        ),
        rule(
            Intent::SystemInfo,
            &[
                r"^system (.+)",
                r"\bbattery\b",
                r"\bcpu\b",
                r"\bram\b",
                r"^kitna (.+)",
                r"^kya (.+)",
                r"^kaise (.+)",
            ],
        ),
    ]
}

fn default_keywords() -> Vec<KeywordRule> {
    let table: &[(&str, Intent)] = &[
        ("open", Intent::OpenApp),
        ("start", Intent::OpenApp),
        ("launch", Intent::OpenApp),
        ("website", Intent::OpenWebsite),
        ("search", Intent::SearchWeb),
        ("google", Intent::SearchWeb),
        ("find", Intent::SearchWeb),
        ("whatsapp", Intent::SendMessage),
        ("message", Intent::SendMessage),
        ("play", Intent::PlayMusic),
        ("music", Intent::PlayMusic),
        ("song", Intent::PlayMusic),
        ("gaana", Intent::PlayMusic),
        ("system", Intent::SystemInfo),
        ("battery", Intent::SystemInfo),
        ("cpu", Intent::SystemInfo),
        ("ram", Intent::SystemInfo),
        ("minimize", Intent::ControlWindow),
        ("maximize", Intent::ControlWindow),
        ("close", Intent::ControlWindow),
        ("code", Intent::CodeAssist),
        ("program", Intent::CodeAssist),
        ("python", Intent::CodeAssist),
    ];
    table
        .iter()
        .map(|(k, i)| KeywordRule {
            keyword: k.to_string(),
            intent: *i,
        })
        .collect()
}

/// Contacts and known websites used to resolve slot values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub contacts: Vec<String>,
    /// Site name → URL.
    pub websites: BTreeMap<String, String>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        let websites = [
            ("youtube", "https://youtube.com"),
            ("google", "https://google.com"),
            ("github", "https://github.com"),
            ("whatsapp", "https://web.whatsapp.com"),
            ("facebook", "https://facebook.com"),
            ("instagram", "https://instagram.com"),
            ("twitter", "https://twitter.com"),
            ("linkedin", "https://linkedin.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            contacts: Vec::new(),
            websites,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Winning text score below this is reported as neutral.
    pub neutral_floor: f32,
    pub text_weight: f32,
    pub voice_weight: f32,
    pub history_capacity: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            neutral_floor: 0.7,
            text_weight: 0.7,
            voice_weight: 0.3,
            history_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub speech_queue_capacity: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speech_queue_capacity: 16,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Tests
// ============================================================================
