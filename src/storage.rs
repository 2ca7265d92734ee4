//! Durable state persistence for conversation and prompt collections
//!
//! Stores each collection as a single serialized JSON document in an
//! embedded `sled` database, written under a store-specific namespace key
//! on every mutation and read back once at startup.

use crate::error::{ChatVaultError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;

/// Durable key-value vault for store state
///
/// Each logical store owns one namespace key and serializes its full
/// collection into it. Loading is deliberately infallible: missing or
/// unreadable data degrades to "nothing persisted" so that corrupt state
/// on disk can never prevent the application from starting.
///
/// The vault is cheap to clone; clones share the same underlying database.
#[derive(Clone)]
pub struct StateVault {
    db: Db,
}

impl StateVault {
    /// Open or create a vault at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    ///
    /// # Errors
    ///
    /// Returns `ChatVaultError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::storage::StateVault;
    ///
    /// # fn main() -> chatvault::error::Result<()> {
    /// let vault = StateVault::open("/tmp/chatvault-doc.db")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| ChatVaultError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Open the vault at its default location
    ///
    /// The path is resolved from the `CHATVAULT_STATE_DB` environment
    /// variable when set, otherwise from the platform data directory.
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns `ChatVaultError::Storage` if the data directory cannot be
    /// determined or the database cannot be opened
    pub fn open_default() -> Result<Self> {
        // Allow override of the state DB path via environment variable.
        // This makes it easy to point the binary at a test DB or alternate
        // file without changing the user's application data dir.
        if let Ok(override_path) = std::env::var("CHATVAULT_STATE_DB") {
            return Self::open(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "chatvault", "chatvault")
            .ok_or_else(|| ChatVaultError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ChatVaultError::Storage(e.to_string()))?;

        Self::open(data_dir.join("state.db"))
    }

    /// Load the document stored under a namespace key
    ///
    /// Returns `None` when the key has never been written, and also when
    /// the stored bytes cannot be read or deserialized; the failure is
    /// logged, never surfaced. Callers treat `None` as empty initial state.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.db.get(key.as_bytes()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, "Failed to read persisted state: {}", e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Ignoring corrupt persisted state: {}", e);
                None
            }
        }
    }

    /// Serialize a document and write it under a namespace key
    ///
    /// The write is flushed before returning so that state survives an
    /// immediate process exit.
    ///
    /// # Errors
    ///
    /// Returns `ChatVaultError::Storage` if serialization or the write fails
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ChatVaultError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| ChatVaultError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ChatVaultError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}
