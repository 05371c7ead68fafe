//! Command-line interface
//!
//! `savora chat` is the main entry point; `agents`, `threads` and
//! `config-show` are inspection helpers. Frames go to stdout as NDJSON,
//! logs go to stderr so the two never mix.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use savora::config::Config;
use savora::runtime::ChatRuntime;

#[derive(Parser)]
#[command(name = "savora", version, about = "Culinary marketplace assistant runtime")]
struct Cli {
    /// Path to an alternate config file (default: ~/.savora/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the serviceable agents
    Agents,
    /// List stored conversation threads
    Threads,
    /// Send a message to an agent
    Chat {
        /// Agent id (sous, studio or market)
        #[arg(long)]
        agent: String,
        /// Thread id; reuse one to continue a conversation
        #[arg(long)]
        thread: String,
        /// Deliver the reply as a single frame instead of streaming
        #[arg(long)]
        no_stream: bool,
        /// The message to send
        message: String,
    },
    /// Print the resolved configuration with credentials redacted
    ConfigShow,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("savora=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load().context("failed to load config"),
    }
}

fn redact(key: &Option<String>) -> Option<String> {
    key.as_ref().map(|_| "***".to_string())
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Agents => {
            let runtime = ChatRuntime::from_config(&config)?;
            let agents = runtime.agents().list();
            if agents.is_empty() {
                println!("No serviceable agents. Check your API keys.");
                return Ok(());
            }
            for agent in agents {
                println!(
                    "{:<8} {:<8} {} ({} tools)",
                    agent.id,
                    agent.name,
                    agent.description,
                    agent.tools.len()
                );
            }
        }
        Command::Threads => {
            let runtime = ChatRuntime::from_config(&config)?;
            let mut threads = runtime.threads().list().await?;
            threads.sort();
            if threads.is_empty() {
                println!("No stored threads.");
            }
            for thread_id in threads {
                println!("{}", thread_id);
            }
        }
        Command::Chat {
            agent,
            thread,
            no_stream,
            message,
        } => {
            let runtime = ChatRuntime::from_config(&config)?;
            if no_stream {
                let frame = runtime.chat(&agent, &thread, &message).await?;
                println!("{}", serde_json::to_string(&frame)?);
            } else {
                runtime
                    .chat_stream(&agent, &thread, &message, tokio::io::stdout())
                    .await?;
            }
        }
        Command::ConfigShow => {
            let mut shown = config.clone();
            shown.model.api_key = redact(&config.model.api_key);
            shown.generation.api_key = redact(&config.generation.api_key);
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}
