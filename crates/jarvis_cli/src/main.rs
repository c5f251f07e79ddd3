mod executor;
mod typed;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use executor::ConsoleExecutor;
use jarvis_core::{EmotionLabel, JarvisConfig};
use jarvis_memory::SqliteStore;
use jarvis_reasoning::Brain;
use jarvis_voice::{AudioFormat, SpeechQueue, SpeechToText, TextToSpeech};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use typed::TypedSpeech;

#[derive(Parser, Debug)]
#[command(name = "jarvis", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "jarvis.toml")]
    config: String,

    /// Path to the memory database (overrides the config file)
    #[arg(short, long, env = "JARVIS_DB_PATH")]
    db: Option<String>,

    /// Keep everything in memory; nothing is persisted
    #[arg(long)]
    memory_only: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "JARVIS_LOG_JSON")]
    json_logs: bool,

    /// Print every directive before running it
    #[arg(short, long)]
    verbose: bool,
}

/// Speaks by printing to the terminal.
struct ConsoleTts;

#[async_trait]
impl TextToSpeech for ConsoleTts {
    async fn speak(&self, text: &str, _emotion: Option<EmotionLabel>) -> anyhow::Result<()> {
        println!("Jarvis: {}", text);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "console"
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = JarvisConfig::load_or_default(&args.config);
    if let Some(db) = &args.db {
        config.memory.db_path = db.clone();
    }
    let queue_capacity = config.voice.speech_queue_capacity;

    let mut brain = if args.memory_only {
        Brain::new(config)?
    } else {
        info!("Connecting to memory at {}...", config.memory.db_path);
        let store = SqliteStore::new(&config.memory.db_path)
            .await
            .with_context(|| format!("Failed to open memory at {}", config.memory.db_path))?;
        Brain::with_store(config, Arc::new(store)).await?
    };

    let listener = TypedSpeech;
    let speech = SpeechQueue::spawn(Arc::new(ConsoleTts), queue_capacity);
    let executor = ConsoleExecutor {
        verbose: args.verbose,
    };

    println!("Jarvis online. Type 'quit' to exit, 'stats' or 'context' to inspect, 'sleep'/'wake'.");
    println!("Start a line with [pitch=.. speed=.. volume=..] to attach voice features.");
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "quit" | "exit" => break,
            "stats" => {
                let report = serde_json::json!({
                    "turns": brain.stats(),
                    "session": brain.session().stats(),
                    "short_term": brain.short_term().stats(),
                    "patterns": brain.long_term().len(),
                    "emotion_trend": brain.emotion().trend(10),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            "context" => {
                let summary = brain.context().summary();
                println!("{}", serde_json::to_string_pretty(&summary)?);
                if let Some(next) = brain.context().predict_next_action() {
                    println!("Likely next: {}", next);
                }
            }
            "sleep" => match brain.sleep() {
                Ok(()) => println!("Sleeping. Say anything to wake me."),
                Err(e) => println!("[Error]: {}", e),
            },
            "wake" => match brain.wake() {
                Ok(()) => println!("Awake."),
                Err(e) => println!("[Error]: {}", e),
            },
            said => {
                let transcript = match listener
                    .transcribe_with_features(said.as_bytes(), AudioFormat::Text)
                    .await
                {
                    Ok(t) => t,
                    Err(e) => {
                        println!("[Error]: {:#}", e);
                        prompt()?;
                        continue;
                    }
                };
                let text = &transcript.utterance.text;
                match brain.handle_turn(text, transcript.features, &executor).await {
                    Ok(outcome) => {
                        if let Some(speak) = outcome.speak {
                            if let Err(e) = speech.enqueue(speak, Some(outcome.emotion.label())) {
                                warn!("{}", e);
                            }
                        }
                        if let Some(err) = outcome.error {
                            println!("[Failed]: {}", err);
                        }
                    }
                    Err(e) => println!("[Error]: {}", e),
                }
            }
        }
        // Let the speech worker print before the next prompt.
        tokio::task::yield_now().await;
        prompt()?;
    }

    brain.shutdown().await;
    speech.shutdown().await;
    println!("Goodbye.");
    Ok(())
}
