//! Session and message data model
//!
//! A session is one ordered thread of messages between the user and the
//! assistant. Messages are append-only; the single exception is the content
//! of the assistant message currently being streamed into, which is
//! overwritten in place as chunks arrive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to a session before one is derived or assigned
pub const DEFAULT_SESSION_TITLE: &str = "New chat";

/// Number of leading characters of the first user message used as the title
const TITLE_MAX_CHARS: usize = 30;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message entered by the user
    User,
    /// Message produced by the remote completion service
    Assistant,
}

impl Role {
    /// String form matching the serialized representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier
    pub id: Uuid,
    /// Author of the message
    pub role: Role,
    /// Message text; mutable only for the active streaming target
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::store::{Message, Role};
    ///
    /// let msg = Message::user("Hello there");
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.content, "Hello there");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One conversation thread
///
/// Sessions are created with an empty message list and the default title;
/// the title is derived from the first user message unless the user renames
/// the session first. `updated_at` refreshes on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier, immutable once created
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Messages in strict append order
    pub messages: Vec<Message>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the most recent mutation
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with the default title
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a user message
    ///
    /// Derives the session title from the message when the title is still
    /// the default placeholder.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::store::Session;
    ///
    /// let mut session = Session::new();
    /// session.push_user("Summarize the quarterly report for the board");
    /// assert_eq!(session.title, "Summarize the quarterly report...");
    /// assert_eq!(session.messages.len(), 1);
    /// ```
    pub fn push_user(&mut self, content: impl Into<String>) -> Uuid {
        let message = Message::user(content);
        if self.title == DEFAULT_SESSION_TITLE {
            self.title = derive_title(&message.content);
        }
        let id = message.id;
        self.messages.push(message);
        self.touch();
        id
    }

    /// Append an empty assistant message and return its id
    ///
    /// The returned id identifies the streaming target that incoming
    /// response content is written into.
    pub fn push_assistant_placeholder(&mut self) -> Uuid {
        let message = Message::assistant("");
        let id = message.id;
        self.messages.push(message);
        self.touch();
        id
    }

    /// Overwrite the content of the message with the given id
    ///
    /// Returns false when no such message exists. Only the streaming
    /// target is ever passed here; message order is unaffected.
    pub fn overwrite_content(&mut self, message_id: Uuid, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.content = content.into();
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Set the title to the trimmed form of `title`
    ///
    /// Returns false without mutating when the trimmed title is empty.
    pub fn rename(&mut self, title: &str) -> bool {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.title = trimmed.to_string();
        self.touch();
        true
    }

    /// Refresh the mutation timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a session title from the leading characters of a message
///
/// Counts characters rather than bytes so multi-byte text never splits a
/// code point; titles longer than the limit gain a `...` suffix.
pub fn derive_title(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}
