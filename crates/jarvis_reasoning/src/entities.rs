//! Slot extraction for an already-classified utterance.
//!
//! Each intent has an ordered list of slot patterns; the first pattern that
//! yields a usable value fills the slot. Some slots have one extra heuristic
//! that runs only when every pattern missed. Nothing here fails: a slot that
//! cannot be filled is simply absent.

use jarvis_core::{normalize, EntityKind, EntitySet, Intent};
use regex::Regex;
use std::sync::LazyLock;

struct SlotPattern {
    kind: EntityKind,
    regex: Regex,
}

fn slot(kind: EntityKind, pattern: &str) -> SlotPattern {
    SlotPattern {
        kind,
        regex: Regex::new(pattern).unwrap(),
    }
}

static OPEN_APP: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(EntityKind::AppName, r"^(.+?)\s+(?:open karo|chalao)$"),
        slot(EntityKind::AppName, r"\bopen\s+(.+?)\s+(?:app|application)$"),
        slot(EntityKind::AppName, r"\b(?:open|start|launch|run)\s+(.+)$"),
    ]
});

static OPEN_WEBSITE: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(EntityKind::Website, r"\bopen\s+(.+?)\s+website$"),
        slot(EntityKind::Website, r"^(.+?)\s+website\s+kholo$"),
        slot(EntityKind::Website, r"\b(?:go to|navigate to|visit)\s+(.+)$"),
        slot(EntityKind::Website, r"^(.+?)\s+par\s+jao$"),
        slot(EntityKind::Website, r"\bwebsite\s+(.+)$"),
    ]
});

static SEARCH_WEB: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(EntityKind::Query, r"\bsearch(?:\s+for)?\s+(.+)$"),
        slot(EntityKind::Query, r"\bgoogle\s+(.+)$"),
        slot(EntityKind::Query, r"\blook up\s+(.+)$"),
        slot(EntityKind::Query, r"\bfind\s+(.+)$"),
        slot(EntityKind::Query, r"\bdhundho\s+(.+)$"),
        slot(EntityKind::Query, r"^(.+?)\s+dhundho$"),
    ]
});

static SEND_MESSAGE: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(EntityKind::Person, r"\bsend\s+(?:a\s+)?message\s+to\s+(\w+)"),
        slot(EntityKind::Person, r"^whatsapp\s+(\w+)\s+ko\b"),
        slot(EntityKind::Person, r"^(?:whatsapp\s+)?(\w+)\s+ko\s+(?:message|bol)"),
        slot(EntityKind::Person, r"^(?:whatsapp|message|text)\s+(?:to\s+)?(\w+)"),
        slot(EntityKind::Message, r"\bbhejo\s*:\s*(.+)$"),
        slot(EntityKind::Message, r"\b(?:saying|that)\s+(.+)$"),
        slot(EntityKind::Message, r"\bbol do\s+(.+)$"),
        slot(EntityKind::Message, r"\blikh do\s+(.+)$"),
        slot(EntityKind::Message, r"^(?:message|text)\s+(?:to\s+)?\w+\s+(.+)$"),
    ]
});

static PLAY_MUSIC: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(EntityKind::Song, r"^play\s+(.+?)(?:\s+on\s+(?:youtube|spotify))?$"),
        slot(EntityKind::Song, r"^(?:music|gaana|song)\s+(.+?)(?:\s+on\s+(?:youtube|spotify))?$"),
        slot(EntityKind::Song, r"^(.+?)\s+(?:gaana\s+)?(?:bajao|chalao)$"),
        slot(EntityKind::Platform, r"\bon\s+(youtube|spotify)\b"),
    ]
});

static CONTROL_WINDOW: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(EntityKind::WindowAction, r"\b(minimize|maximize|close|restore)\b"),
        slot(EntityKind::WindowTarget, r"\b(?:minimize|maximize|close|restore)\s+(.+)$"),
        slot(EntityKind::WindowTarget, r"^window\s+\w+\s+(.+)$"),
    ]
});

static CODE_ASSIST: LazyLock<Vec<SlotPattern>> = LazyLock::new(|| {
    vec![
        slot(
            EntityKind::Language,
            r"\b(python|rust|javascript|typescript|java|html|css|sql|c\+\+)\b",
        ),
        slot(EntityKind::Query, r"^(?:code|program|python)\s+(.+)$"),
        slot(EntityKind::Query, r"^write\s+(.+?)\s+code$"),
        slot(EntityKind::Query, r"^create\s+(.+?)\s+program$"),
        slot(EntityKind::Query, r"^(.+?)\s+ka code likho$"),
    ]
});

static SYSTEM_METRIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(battery|cpu|ram|disk|memory|network|storage)\b").unwrap()
});

static WINDOW_VERB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^window\s+(minimize|maximize|close|restore)\b").unwrap());

/// Values that carry no information on their own.
const FILLER: &[&str] = &[
    "app", "application", "website", "the", "a", "an", "it", "this", "that", "window",
    "this window", "music", "song", "gaana", "some music", "a song", "something", "kuch", "chalao",
    "bajao",
];

/// Words that are never a recipient.
const NOT_A_PERSON: &[&str] = &[
    "message", "send", "whatsapp", "text", "ko", "to", "a", "the", "bhejo", "me",
];

const TRAILING_NOISE: &[&str] = &[" application", " app", " website", " window"];

fn clean(raw: &str) -> Option<String> {
    let mut value = raw
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '+' && c != '#')
        .trim()
        .to_string();

    if let Some(rest) = value.strip_prefix("the ") {
        value = rest.trim().to_string();
    }
    for suffix in TRAILING_NOISE {
        if let Some(rest) = value.strip_suffix(suffix) {
            value = rest.trim().to_string();
            break;
        }
    }

    if value.is_empty() || FILLER.contains(&value.as_str()) {
        None
    } else {
        Some(value)
    }
}

/// Verb-less fallback: the token right after one of `verbs`.
fn token_after(text: &str, verbs: &[&str]) -> Option<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .iter()
        .position(|t| verbs.contains(t))
        .and_then(|i| tokens.get(i + 1))
        .and_then(|t| clean(t))
}

pub struct EntityExtractor;

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str, intent: Intent) -> EntitySet {
        let text = normalize(text);
        let mut entities = EntitySet::new();

        match intent {
            Intent::OpenApp => {
                apply(&OPEN_APP, &text, &mut entities);
                fallback(&mut entities, EntityKind::AppName, || {
                    token_after(&text, &["open", "start", "launch", "run"])
                });
            }
            Intent::OpenWebsite => {
                apply(&OPEN_WEBSITE, &text, &mut entities);
                fallback(&mut entities, EntityKind::Website, || {
                    token_after(&text, &["open", "visit"])
                });
            }
            Intent::SearchWeb => apply(&SEARCH_WEB, &text, &mut entities),
            Intent::SendMessage => {
                apply(&SEND_MESSAGE, &text, &mut entities);
                fallback(&mut entities, EntityKind::Person, || token_after(&text, &["to"]));
            }
            Intent::PlayMusic => apply(&PLAY_MUSIC, &text, &mut entities),
            Intent::SystemInfo => {
                for cap in SYSTEM_METRIC.captures_iter(&text) {
                    entities.insert(EntityKind::SystemMetric, &cap[1]);
                }
            }
            Intent::ControlWindow => {
                apply(&CONTROL_WINDOW, &text, &mut entities);
                fallback(&mut entities, EntityKind::WindowAction, || {
                    WINDOW_VERB.captures(&text).map(|c| c[1].to_string())
                });
            }
            Intent::CodeAssist => {
                apply(&CODE_ASSIST, &text, &mut entities);
                fallback(&mut entities, EntityKind::Query, || clean(&text));
            }
            Intent::CustomCommand | Intent::Unknown => {}
        }

        tracing::debug!(%intent, slots = entities.len(), "Entities extracted");
        entities
    }
}

fn apply(patterns: &[SlotPattern], text: &str, entities: &mut EntitySet) {
    for p in patterns {
        if entities.contains(p.kind) {
            continue;
        }
        let value = p
            .regex
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str()))
            .filter(|v| p.kind != EntityKind::Person || is_person(v));
        if let Some(value) = value {
            entities.insert(p.kind, value);
        }
    }
}

fn fallback(entities: &mut EntitySet, kind: EntityKind, heuristic: impl FnOnce() -> Option<String>) {
    if entities.contains(kind) {
        return;
    }
    if let Some(value) = heuristic().filter(|v| kind != EntityKind::Person || is_person(v)) {
        entities.insert(kind, value);
    }
}

fn is_person(value: &str) -> bool {
    !NOT_A_PERSON.contains(&value)
}
