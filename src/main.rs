//! daily-snap-rs: daily photo prompt, judging and narration service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use daily_snap::api::{self, ApiState};
use daily_snap::config::Config;
use daily_snap::gateway::{GeminiGateway, ModelGateway, SpeechGateway};
use daily_snap::judge::PhotoJudge;
use daily_snap::narrator::Narrator;
use daily_snap::photo::Photo;
use daily_snap::prompt::{LocalClock, PromptProvider};
use daily_snap::store::SubmissionStore;
use daily_snap::streak::{compute_streak, SubmissionRecord};

#[derive(Parser, Debug)]
#[command(name = "daily-snap-rs", about = "Daily photo prompt, judging and narration")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Print today's prompt
    Prompt,
    /// Judge a photo against a prompt (today's prompt by default)
    Judge {
        #[arg(long)]
        photo: PathBuf,
        #[arg(long)]
        prompt: Option<String>,
        /// Record a submission when the photo matches
        #[arg(long)]
        record: bool,
    },
    /// Describe a photo for narration
    Describe {
        #[arg(long)]
        photo: PathBuf,
        #[arg(long)]
        prompt: Option<String>,
        /// Also speak the description
        #[arg(long)]
        speak: bool,
    },
    /// Speak text aloud
    Speak { text: String },
    /// Print the current submission streak
    Streak {
        /// Submission store (defaults to store.path from config)
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,rodio=info,hyper=info,reqwest=info")
    } else {
        EnvFilter::new("info,rodio=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(args.config.as_deref());

    let gemini = GeminiGateway::new(&config.gemini);
    if !gemini.has_credential() {
        tracing::warn!("No Gemini API key configured; prompts and judging will degrade");
    }
    let model: Arc<dyn ModelGateway> = Arc::new(gemini);
    let speech = Arc::new(SpeechGateway::from_config(&config));
    let prompts = Arc::new(
        PromptProvider::new(model.clone(), Arc::new(LocalClock)).with_fallback(config.prompts.fallback.clone()),
    );
    let judge = Arc::new(PhotoJudge::new(model.clone()));
    let narrator = Arc::new(Narrator::new(model.clone(), speech.clone()));

    match args.command {
        Command::Serve => {
            let state = ApiState {
                prompts,
                judge,
                narrator,
                speech,
                store: Arc::new(SubmissionStore::new(config.store.path.clone())),
                narration: config.accessibility.narration,
            };
            if !config.api.enabled {
                info!("API disabled in config, nothing to serve");
                return Ok(());
            }
            let Some(server) = api::start_api(state, config.api.port).await else {
                return Err(format!("could not bind API port {}", config.api.port).into());
            };
            tokio::select! {
                _ = server => {}
                _ = tokio::signal::ctrl_c() => info!("Shutting down"),
            }
        }
        Command::Prompt => {
            let prompt = prompts.get_prompt().await;
            println!("{}", prompt.text);
        }
        Command::Judge { photo, prompt, record } => {
            let photo = Photo::from_path(&photo)?;
            let prompt = match prompt {
                Some(p) => p,
                None => prompts.get_prompt().await.text,
            };
            let verdict = judge.judge(&prompt, Some(&photo)).await;
            println!("{}", serde_json::to_string_pretty(&verdict)?);

            if record && verdict.matches {
                let now = chrono::Utc::now();
                let submission = SubmissionRecord::new(format!("sub-{}", now.timestamp_millis()), now)
                    .with_field("prompt", prompt)
                    .with_field("feedback", verdict.feedback);
                SubmissionStore::new(config.store.path.clone()).append(&submission);
            }
        }
        Command::Describe { photo, prompt, speak } => {
            let photo = Photo::from_path(&photo)?;
            let description = if speak {
                narrator.narrate_photo(&photo, prompt.as_deref()).await
            } else {
                narrator.describe_photo(&photo, prompt.as_deref()).await
            };
            println!("{description}");
        }
        Command::Speak { text } => {
            let outcome = narrator.announce(&text).await;
            info!("Speech finished: {outcome:?}");
        }
        Command::Streak { store } => {
            let path = store.unwrap_or(config.store.path);
            let records = SubmissionStore::new(path).load();
            println!("{}", compute_streak(&records));
        }
    }

    Ok(())
}
