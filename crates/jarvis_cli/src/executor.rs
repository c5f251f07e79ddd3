//! Dry-run executor for the terminal: prints each directive and reports what
//! a real skill runner would have done.

use anyhow::Result;
use async_trait::async_trait;
use jarvis_core::{Action, Decision, ExecutionReport, Executor};

pub struct ConsoleExecutor {
    /// Print the full directive JSON before running it.
    pub verbose: bool,
}

#[async_trait]
impl Executor for ConsoleExecutor {
    async fn execute(&self, decision: &Decision) -> Result<ExecutionReport> {
        if self.verbose {
            println!("  directive: {}", serde_json::to_string(decision)?);
        }
        let mut speak = describe(&decision.action);
        if decision.requires_confirmation {
            speak = format!("Please confirm first. {speak}");
        }
        Ok(ExecutionReport {
            success: true,
            speak: Some(speak),
            details: serde_json::to_value(decision)?,
        })
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("something")
}

pub fn describe(action: &Action) -> String {
    match action {
        Action::OpenApp { app_name } => format!("Opening {}.", or_unknown(app_name)),
        Action::OpenWebsite { website, url } => match url {
            Some(url) => format!("Opening {}.", url),
            None => format!("Opening the {} website.", or_unknown(website)),
        },
        Action::SearchWeb { query, engine } => {
            format!("Searching {} for {}.", engine, or_unknown(query))
        }
        Action::SendMessage {
            person, message, ..
        } => match message {
            Some(m) => format!("Sending \"{}\" to {}.", m, or_unknown(person)),
            None => format!("Opening a chat with {}.", or_unknown(person)),
        },
        Action::PlayMusic { song, platform } => {
            format!("Playing {} on {}.", or_unknown(song), platform)
        }
        Action::SystemInfo { query } => format!("Checking {}.", query.replace(',', " and ")),
        Action::ControlWindow { action, window } => {
            format!("Going to {:?} the {} window.", action, window).to_lowercase()
        }
        Action::CodeAssist { query, language } => {
            format!("Writing {} code for {}.", language, query)
        }
        Action::ExecuteCustom {
            command_name,
            actions,
        } => format!("Running {} ({} steps).", command_name, actions.len()),
        Action::ConfirmDangerous { target, .. } => {
            format!("{} looks dangerous. Are you sure?", target)
        }
        Action::AiFallback { text, .. } => format!("I'm not sure how to handle \"{}\".", text),
        Action::AskFollowup { prompt, .. } => prompt.clone(),
    }
}
