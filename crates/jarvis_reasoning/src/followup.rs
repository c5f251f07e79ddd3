//! One-slot follow-up dialogue.
//!
//! When a directive is missing its required slot the brain parks a
//! [`PendingFollowup`] and asks for it. The next utterance is rewritten into
//! a complete command before classification, then the pending slot is gone
//! whether or not the rewrite helped.

use jarvis_core::{ContextState, EntityKind, EntitySet, Intent, PendingFollowup};

/// Rewrite `text` against the pending follow-up, if any, and clear it.
pub fn handle(text: &str, state: &mut ContextState) -> String {
    let Some(pending) = state.take_pending() else {
        return text.to_string();
    };
    let text = text.trim();

    let rewritten = match &pending {
        PendingFollowup::WhatsappMessage { person } => {
            format!("whatsapp {person} ko message bhejo: {text}")
        }
        PendingFollowup::WhatsappDetails => {
            let (person, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
            format!("whatsapp {} ko message bhejo: {}", person, rest.trim())
        }
        PendingFollowup::AppName => format!("open {text}"),
        PendingFollowup::WebsiteName => format!("open {text} website"),
        PendingFollowup::SearchQuery => format!("search {text}"),
    };

    tracing::debug!(followup = pending.kind(), rewritten = %rewritten, "Follow-up consumed");
    rewritten
}

/// Which slot, if any, is still needed before `intent` can run.
pub fn infer(intent: Intent, entities: &EntitySet) -> Option<PendingFollowup> {
    match intent {
        Intent::SendMessage => {
            let person = entities.latest(EntityKind::Person);
            let has_message = entities.contains(EntityKind::Message);
            match (person, has_message) {
                (Some(_), true) => None,
                (Some(person), false) => Some(PendingFollowup::WhatsappMessage {
                    person: person.to_string(),
                }),
                (None, _) => Some(PendingFollowup::WhatsappDetails),
            }
        }
        Intent::SearchWeb if !entities.contains(EntityKind::Query) => {
            Some(PendingFollowup::SearchQuery)
        }
        Intent::OpenApp if !entities.contains(EntityKind::AppName) => {
            Some(PendingFollowup::AppName)
        }
        Intent::OpenWebsite if !entities.contains(EntityKind::Website) => {
            Some(PendingFollowup::WebsiteName)
        }
        _ => None,
    }
}

/// The question spoken back to the user.
pub fn prompt_for(pending: &PendingFollowup) -> String {
    match pending {
        PendingFollowup::WhatsappDetails => {
            "Who should I message, and what should I say?".to_string()
        }
        PendingFollowup::WhatsappMessage { person } => {
            format!("What message should I send to {person}?")
        }
        PendingFollowup::AppName => "Which app should I open?".to_string(),
        PendingFollowup::WebsiteName => "Which website should I open?".to_string(),
        PendingFollowup::SearchQuery => "What should I search for?".to_string(),
    }
}
