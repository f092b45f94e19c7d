//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "coursebot",
    version,
    author = "neur0map",
    about = "Retrieval-augmented support assistant for course platforms",
    long_about = "Coursebot answers customer-support questions from a plain-text knowledge base: \
                  it rewrites each question, retrieves the most similar passages and asks a \
                  chat model to answer from them."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/coursebot/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one or more questions (runs the sample questions when none are given)
    Ask {
        /// Questions to ask, answered in order
        questions: Vec<String>,

        /// Print responses as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how the corpus is split into chunks
    Chunks {
        /// Maximum number of chunks to print
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Print chunks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the knowledge base and show assistant status
    Status,

    /// Serve the chat API for the browser widget
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,

        /// Directory with the chat widget to serve (overrides server.static_dir)
        #[arg(long, value_name = "DIR")]
        static_dir: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
