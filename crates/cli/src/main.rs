//! Parley CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP API server
//! - `chat`    One-shot exchange, optionally grounded on a local document
//! - `chunk`   Print the chunks of a file
//! - `tokens`  Count tokens under the configured encoding
//! - `doctor`  Diagnose configuration and tokenizer

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use parley_config::AppConfig;
use parley_core::conversation::ConversationMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Parley: conversational backend with document grounding",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.parley/config.toml)
    #[arg(short, long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a single message and print the reply
    Chat {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Ground the reply on this file (.txt, .md, .pdf, .docx)
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Conversation mode (grounded when a document is given)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Split a file into overlapping word chunks
    Chunk {
        path: PathBuf,

        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(long)]
        overlap: Option<usize>,

        /// Print chunks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count tokens in a piece of text
    Tokens {
        text: String,
    },

    /// Diagnose configuration, API key and tokenizer
    Doctor,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    OpenChat,
    GroundedRag,
}

impl From<ModeArg> for ConversationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::OpenChat => ConversationMode::OpenChat,
            ModeArg::GroundedRag => ConversationMode::GroundedRag,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let (verbose, json_logs) = (cli.verbose, cli.json_logs);

    // Every command but doctor needs a valid config before logging starts.
    let load = || -> anyhow::Result<AppConfig> {
        let config = commands::load_config(config_path)?;
        commands::init_tracing(verbose, json_logs, Some(&config.logging));
        Ok(config)
    };

    match cli.command {
        Commands::Serve { port } => commands::serve::run(load()?, port).await?,
        Commands::Chat {
            message,
            document,
            mode,
        } => commands::chat::run(load()?, &message, document.as_deref(), mode.map(Into::into)).await?,
        Commands::Chunk {
            path,
            chunk_size,
            overlap,
            json,
        } => commands::chunk::run(&load()?, &path, chunk_size, overlap, json)?,
        Commands::Tokens { text } => commands::tokens::run(&load()?, &text)?,
        // Doctor reports config problems itself instead of failing on load.
        Commands::Doctor => {
            commands::init_tracing(verbose, json_logs, None);
            commands::doctor::run(config_path).await?
        }
    }

    Ok(())
}
