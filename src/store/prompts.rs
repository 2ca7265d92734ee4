//! Saved prompt library
//!
//! An independent collection of reusable prompt texts, deduplicated by
//! trimmed text. The library persists its full collection on every
//! mutation and restores it at construction.

use crate::storage::StateVault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// Namespace key the prompt collection is persisted under
const PROMPTS_KEY: &str = "prompts";

/// A user-curated reusable prompt text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPrompt {
    /// Unique prompt identifier
    pub id: Uuid,
    /// The prompt text, stored trimmed
    pub text: String,
    /// Optional display title
    pub title: Option<String>,
    /// Time the prompt was saved
    pub timestamp: DateTime<Utc>,
}

/// Store for saved prompts
///
/// No two entries share the same normalized (trimmed) text; `save` is a
/// no-op against duplicates so a UI toggle can call it blindly. Newest
/// entries sit at the front.
pub struct PromptLibrary {
    state: Mutex<Vec<SavedPrompt>>,
    vault: StateVault,
    tx: watch::Sender<Vec<SavedPrompt>>,
}

impl PromptLibrary {
    /// Create a library backed by the given vault, restoring any
    /// previously persisted collection
    pub fn new(vault: StateVault) -> Self {
        let prompts: Vec<SavedPrompt> = vault.load(PROMPTS_KEY).unwrap_or_default();
        tracing::debug!(count = prompts.len(), "Restored prompt library");

        let (tx, _) = watch::channel(prompts.clone());
        Self {
            state: Mutex::new(prompts),
            vault,
            tx,
        }
    }

    /// Save a prompt text
    ///
    /// Returns true when a new entry was inserted at the front of the
    /// collection; returns false (and stores nothing) when the trimmed
    /// text is empty or an entry with the same trimmed text exists.
    pub fn save(&self, text: &str, title: Option<&str>) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }

        let mut prompts = self.lock_state();
        if contains_text(&prompts, trimmed) {
            return false;
        }

        prompts.insert(
            0,
            SavedPrompt {
                id: Uuid::new_v4(),
                text: trimmed.to_string(),
                title: title.map(|t| t.to_string()),
                timestamp: Utc::now(),
            },
        );
        tracing::debug!("Saved prompt to library");
        self.publish(&prompts);
        true
    }

    /// Remove the prompt with the given id; no-op if absent
    pub fn delete(&self, id: Uuid) {
        let mut prompts = self.lock_state();
        let before = prompts.len();
        prompts.retain(|p| p.id != id);
        if prompts.len() != before {
            self.publish(&prompts);
        }
    }

    /// Remove any prompt whose trimmed text matches; no-op if absent
    pub fn remove_by_text(&self, text: &str) {
        let normalized = text.trim();
        let mut prompts = self.lock_state();
        let before = prompts.len();
        prompts.retain(|p| p.text.trim() != normalized);
        if prompts.len() != before {
            self.publish(&prompts);
        }
    }

    /// Whether a prompt with the same trimmed text is already saved
    pub fn is_saved(&self, text: &str) -> bool {
        contains_text(&self.lock_state(), text.trim())
    }

    /// Snapshot of the current collection, newest first
    pub fn prompts(&self) -> Vec<SavedPrompt> {
        self.lock_state().clone()
    }

    /// Observe the collection across mutations
    pub fn subscribe(&self) -> watch::Receiver<Vec<SavedPrompt>> {
        self.tx.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, Vec<SavedPrompt>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mirror the collection to observers and durable storage
    ///
    /// Persistence is best-effort: a failed write is logged and the
    /// in-memory mutation stands.
    fn publish(&self, prompts: &[SavedPrompt]) {
        self.tx.send_replace(prompts.to_vec());
        if let Err(e) = self.vault.save(PROMPTS_KEY, &prompts) {
            tracing::warn!("Failed to persist prompt library: {}", e);
        }
    }
}

fn contains_text(prompts: &[SavedPrompt], normalized: &str) -> bool {
    prompts.iter().any(|p| p.text.trim() == normalized)
}
