//! CLI module for MediRAG
//!
//! Provides command-line interface parsing for the medirag-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::rag::indexer::DEFAULT_BATCH_SIZE;

/// MediRAG - Medical Retrieval Augmented Generation Server
///
/// Answers medical questions from an indexed corpus of reference PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "medirag-server",
    version,
    about = "MediRAG - Medical Retrieval Augmented Generation Server",
    long_about = "Answers medical questions over HTTP using passages retrieved from a Pinecone\n\
                  index and a Groq-hosted language model.\n\n\
                  Run without arguments to start the server, or use 'index' to load PDFs into the index.\n\
                  Settings are read from the environment and from a .env file.",
    after_help = "EXAMPLES:\n    \
                  medirag-server                      # Start the server\n    \
                  medirag-server index                # Index PDFs under ./data\n    \
                  medirag-server index --data books   # Index PDFs under ./books"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Chunk, embed and upsert a directory of PDFs into the vector index
    Index {
        /// Directory searched recursively for *.pdf files
        #[arg(short, long, default_value = "data")]
        data: PathBuf,

        /// Number of chunks embedded and upserted per batch
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run, defaulting to `serve`.
    pub fn selected_command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Serve)
    }
}
