//! ChatVault - Conversation manager CLI library
//!
//! This library provides the core functionality for the ChatVault client,
//! including session management, streaming response ingestion, the saved
//! prompt library, and local persistence.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `store`: Conversation sessions, the send lifecycle, and the prompt library
//! - `transport`: Completion service abstraction and the HTTP client
//! - `storage`: Persistent key-value state vault
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatvault::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     // Store construction would go here
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod storage;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChatVaultError, Result};
pub use storage::StateVault;
pub use store::{
    ConversationStore, Message, PromptLibrary, Role, SavedPrompt, SendPhase, Session,
    StoreOptions, StoreSnapshot,
};
pub use transport::{CompletionTransport, HttpCompletionClient, NO_RESPONSE_PLACEHOLDER};
