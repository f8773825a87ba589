//! persona-studio: voice persona monologues generated and spoken by Gemini.

mod api;
mod audio;
mod catalog;
mod config;
mod conversation;
mod error;
mod gemini;
mod history;
mod orchestrator;
mod prompts;
mod settings;
mod storage;
#[cfg(test)]
mod testing;
mod tools;

use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::RodioBackend;
use crate::catalog::{Catalog, PersonaCategory};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::history::TranscriptArchive;
use crate::orchestrator::{Orchestrator, TriggerOutcome};
use crate::settings::CustomTags;
use crate::storage::KeyValueStore;

#[derive(Parser, Debug)]
#[command(name = "persona-studio", about = "Voice persona studio")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP control API
    Serve,
    /// List the persona catalog
    Personas,
    /// Generate and play a monologue for one persona
    Play {
        persona: String,
        /// Also write the synthesized audio to a WAV file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Insert audio tags into a dialogue
    Enhance { text: String },
    /// Manage the audio-tag vocabulary
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },
    /// Print the transcript report for a day (YYYY-MM-DD)
    Report {
        #[arg(default_value = "today")]
        date: String,
        /// List the days that have records instead
        #[arg(long)]
        list: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TagsAction {
    List,
    Add { tag: String },
    Remove { tag: String },
}

fn build_orchestrator(config: &Config) -> error::Result<Orchestrator> {
    let api_key = config.api.api_key()?;
    let client = GeminiClient::new(&config.api, api_key)?;
    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Arc::new(RodioBackend),
        Arc::new(Catalog::builtin()),
        config,
    );
    Ok(if config.history.enabled {
        orchestrator.with_archive(TranscriptArchive::new(config.history.resolved_dir()))
    } else {
        orchestrator
    })
}

fn open_tags(config: &Config) -> CustomTags {
    let path = config.storage.resolved_path();
    info!("Settings store: {}", path.display());
    CustomTags::load(Arc::new(KeyValueStore::open(path)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging (suppress noisy HTTP internals)
    let filter = if args.verbose {
        EnvFilter::new("debug,reqwest=info,hyper=info,hyper_util=info")
    } else {
        EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(args.config.as_deref());

    match args.command {
        Command::Serve => serve(&config).await?,
        Command::Personas => {
            for persona in Catalog::builtin().personas() {
                let category = match persona.category {
                    PersonaCategory::CustomerService => "csr",
                    PersonaCategory::Showcase => "showcase",
                };
                println!(
                    "{:<8} {:<9} {:<14} {}",
                    persona.id, category, persona.voice_name, persona.tagline
                );
            }
        }
        Command::Play { persona, save } => play(&config, &persona, save).await?,
        Command::Enhance { text } => {
            let orchestrator = build_orchestrator(&config)?;
            let tags = open_tags(&config);
            println!("{}", orchestrator.enhance(tags.tags(), &text).await?);
        }
        Command::Tags { action } => {
            let mut tags = open_tags(&config);
            match action.unwrap_or(TagsAction::List) {
                TagsAction::List => {}
                TagsAction::Add { tag } => {
                    if !tags.add(&tag)? {
                        warn!("Tag {tag:?} is empty or already present");
                    }
                }
                TagsAction::Remove { tag } => {
                    if !tags.remove(&tag)? {
                        warn!("Tag {tag:?} not found");
                    }
                }
            }
            for tag in tags.tags() {
                println!("[{tag}]");
            }
        }
        Command::Report { date, list } => {
            let archive = TranscriptArchive::new(config.history.resolved_dir());
            if list {
                for day in archive.dates() {
                    println!("{day}");
                }
            } else {
                println!("{}", archive.report(&date));
            }
        }
    }

    Ok(())
}

async fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("persona-studio starting");
    let orchestrator = Arc::new(build_orchestrator(config)?);

    let state = api::StudioApiState {
        orchestrator: Arc::clone(&orchestrator),
        tags: Arc::new(Mutex::new(open_tags(config))),
        settings: Arc::new(Mutex::new(settings::Settings::default())),
        tools: Arc::new(Mutex::new(tools::ToolStore::default())),
        conversation: Arc::new(Mutex::new(conversation::ConversationLog::default())),
    };
    api::start_studio_api(state, &config.server.host, config.server.port).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    orchestrator.stop();
    Ok(())
}

async fn play(
    config: &Config,
    persona_id: &str,
    save: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(config)?;

    if orchestrator.trigger(persona_id).await? != TriggerOutcome::Playing {
        return Err(format!("could not play {persona_id}, see log above").into());
    }
    if let Some(transcript) = orchestrator.status().active_transcript {
        println!("{}: {}", transcript.persona_name, transcript.script);
    }
    if let (Some(path), Some(buffer)) = (save, orchestrator.last_audio()) {
        buffer.write_wav(&path)?;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !orchestrator.is_playing() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                orchestrator.stop();
                break;
            }
        }
    }
    Ok(())
}
