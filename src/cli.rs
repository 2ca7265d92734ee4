//! Command-line interface definition for chatvault
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, session management, and the
//! saved prompt library.

use clap::{Parser, Subcommand};

/// ChatVault - conversation manager for a remote completion service
///
/// Keeps chat sessions, streams assistant responses, and maintains a
/// library of reusable prompts, all persisted locally.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatvault
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume a session by id (full UUID or unique prefix)
        #[arg(short, long)]
        session: Option<String>,

        /// Request whole responses instead of streaming
        #[arg(long)]
        no_stream: bool,
    },

    /// Inspect and manage stored sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Manage the saved prompt library
    Prompts {
        /// Prompt library subcommand
        #[command(subcommand)]
        command: PromptCommand,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List stored sessions
    List,

    /// Delete a session
    Delete {
        /// Session id (full UUID or unique prefix)
        id: String,
    },

    /// Rename a session
    Rename {
        /// Session id (full UUID or unique prefix)
        id: String,

        /// New title
        title: String,
    },
}

/// Prompt library subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PromptCommand {
    /// List saved prompts
    List,

    /// Save a prompt text to the library
    Save {
        /// Prompt text to save
        text: String,

        /// Optional display title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Remove a prompt by id or by its exact text
    Remove {
        /// Prompt id (full UUID or unique prefix) or the prompt text
        target: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Chat {
                session: None,
                no_stream: false,
            },
        }
    }
}
