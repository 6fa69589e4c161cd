use std::path::{Path, PathBuf};

use anyhow::Context;
use chatrelay_common::ThreadId;
use chatrelay_config::{AppConfig, ConfigLoader};
use chatrelay_db::{ConversationStore, SqliteConversationStore};
use chatrelay_gateway::GatewayServer;
use chatrelay_security::RedactingWriter;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "Relay Discord conversations to an OpenAI-compatible completion API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML configuration file. Environment variables override its values.
    #[arg(short, long, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and relay messages until interrupted
    Start,
    /// Delete every stored conversation and the instruction
    Reset,
    /// Show the current instruction, or replace it
    Instruction {
        /// New instruction text. Omit to print the current one.
        text: Option<String>,
    },
    /// Print the stored turns of one thread
    History {
        /// Thread identifier (the Discord channel id)
        thread: String,
        /// Only show the newest N turns
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove one stored turn by id
    Delete {
        /// Message id as shown by `history`
        id: i64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr());
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<SqliteConversationStore> {
    let path = &config.database.path;
    SqliteConversationStore::open(path)
        .with_context(|| format!("failed to open conversation store at {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start => {
            let config = ConfigLoader::load(config_path).context("invalid configuration")?;
            GatewayServer::new(config).run().await?;
        }
        Commands::Reset => {
            let store = open_store(&load_offline(config_path)?)?;
            store.reset_all()?;
            println!("Conversation store reset.");
        }
        Commands::Instruction { text } => {
            let store = open_store(&load_offline(config_path)?)?;
            match text {
                Some(text) => {
                    store.set_instruction(text.trim())?;
                    println!("Instruction updated.");
                }
                None => match store.get_instruction()? {
                    Some(current) => println!("{current}"),
                    None => println!("(no instruction set)"),
                },
            }
        }
        Commands::History { thread, limit } => {
            let store = open_store(&load_offline(config_path)?)?;
            let messages = store.list_by_thread(&ThreadId::from_string(thread.clone()))?;
            if messages.is_empty() {
                println!("No stored turns for thread {thread}.");
                return Ok(());
            }
            let skip = limit.map_or(0, |n| messages.len().saturating_sub(n));
            for msg in &messages[skip..] {
                let author = if msg.author.is_empty() { "-" } else { msg.author.as_str() };
                println!(
                    "#{:<5} {} {:<9} {:<12} [{} tok] {}",
                    msg.id,
                    msg.created_at.format("%Y-%m-%d %H:%M:%S"),
                    msg.role.as_str(),
                    author,
                    msg.usage.total_tokens,
                    msg.content
                );
            }
        }
        Commands::Delete { id } => {
            let store = open_store(&load_offline(config_path)?)?;
            if store.delete_message(id)? {
                println!("Deleted message {id}.");
            } else {
                println!("No message with id {id}.");
            }
        }
    }

    Ok(())
}

fn load_offline(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    ConfigLoader::load_unvalidated(path).context("invalid configuration")
}
