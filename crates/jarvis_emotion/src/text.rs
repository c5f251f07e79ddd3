//! Keyword scoring over the utterance text.
//!
//! Hinglish and English keyword tables, matched as lowercase substrings.

use jarvis_core::{EmotionLabel, EmotionState};

const HAPPY: &[&str] = &[
    "happy", "khush", "acha", "badhiya", "maza", "fun", "enjoy", "thanks", "dhanyavad",
    "shukriya", "great", "good", "wow", "awesome", "excellent",
];

const SAD: &[&str] = &[
    "sad", "udaas", "dukhi", "thak", "tired", "bore", "problem", "issue", "error", "galti",
    "sorry", "maaf", "afsoos", "disappoint",
];

const ANGRY: &[&str] = &[
    "angry", "gussa", "naraz", "problem", "wrong", "error", "fail", "nahi hua", "not work",
    "band", "stop", "ruk", "mat karo",
];

const EXCITED: &[&str] = &[
    "excited", "utsahit", "josh", "ready", "let's go", "chalo", "start", "begin", "fast",
    "quick", "now", "immediately", "turant",
];

const CALM: &[&str] = &[
    "calm", "shant", "aram", "slow", "thoda", "please", "kripya", "zara", "wait", "ruk",
    "thoda der", "patience", "sabr",
];

const NEGATIVE: &[&str] = &["nahi", "mat", "rok", "band", "galti", "problem", "error"];

const POSITIVE: &[&str] = &["acha", "shabash", "badhiya", "thanks", "dhanyavad", "great", "good"];

/// Score neutral starts from before any keyword is counted.
pub const NEUTRAL_BASELINE: f32 = 0.5;

/// Raw per-label scores, in `EmotionLabel::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextScores([f32; 6]);

impl TextScores {
    pub fn get(&self, label: EmotionLabel) -> f32 {
        self.0[index(label)]
    }

    fn add(&mut self, label: EmotionLabel, amount: f32) {
        self.0[index(label)] += amount;
    }

    /// Highest-scoring label. Ties go to the label listed first.
    pub fn best(&self) -> (EmotionLabel, f32) {
        let mut best = (EmotionLabel::ALL[0], self.0[0]);
        for (label, score) in EmotionLabel::ALL.iter().zip(self.0.iter()).skip(1) {
            if *score > best.1 {
                best = (*label, *score);
            }
        }
        best
    }
}

fn index(label: EmotionLabel) -> usize {
    EmotionLabel::ALL
        .iter()
        .position(|l| *l == label)
        .unwrap_or(EmotionLabel::ALL.len() - 1)
}

fn keywords(label: EmotionLabel) -> &'static [&'static str] {
    match label {
        EmotionLabel::Happy => HAPPY,
        EmotionLabel::Sad => SAD,
        EmotionLabel::Angry => ANGRY,
        EmotionLabel::Excited => EXCITED,
        EmotionLabel::Calm => CALM,
        EmotionLabel::Neutral => &[],
    }
}

pub fn score_text(text: &str) -> TextScores {
    let lower = text.to_lowercase();
    let mut scores = TextScores([0.0; 6]);
    scores.add(EmotionLabel::Neutral, NEUTRAL_BASELINE);

    for label in EmotionLabel::ALL {
        let hits = keywords(label).iter().filter(|k| lower.contains(*k)).count();
        scores.add(label, hits as f32);
    }

    if text.contains('!') {
        scores.add(EmotionLabel::Excited, 2.0);
    }
    if text.contains('?') {
        scores.add(EmotionLabel::Calm, 1.0);
    }
    for _ in NEGATIVE.iter().filter(|w| lower.contains(*w)) {
        scores.add(EmotionLabel::Sad, 1.0);
        scores.add(EmotionLabel::Angry, 0.5);
    }
    for _ in POSITIVE.iter().filter(|w| lower.contains(*w)) {
        scores.add(EmotionLabel::Happy, 1.0);
        scores.add(EmotionLabel::Excited, 0.5);
    }
    scores
}

/// Text-only emotion. A winning score under `neutral_floor` is reported as
/// neutral; neutral always carries intensity 0.5.
pub fn detect_from_text(text: &str, neutral_floor: f32) -> EmotionState {
    let (label, score) = score_text(text).best();
    if label == EmotionLabel::Neutral || score < neutral_floor {
        return EmotionState::default();
    }
    EmotionState::new(label, (score / 4.0).clamp(0.1, 1.0))
}
