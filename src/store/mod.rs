//! Conversation store
//!
//! Owns the session collection, the active session pointer, per-session
//! responding state, and the ingestion of assistant responses from the
//! remote completion endpoint. Collaborators are injected at
//! construction: a [`StateVault`] that mirrors every mutation to durable
//! storage, and a [`CompletionTransport`] that performs the network
//! requests.
//!
//! Observers never hold references into the store. Every mutation
//! publishes an immutable [`StoreSnapshot`] through a watch channel;
//! presentation code re-renders from snapshots and tolerates repeated
//! overwrites of the same message id while a response streams in.

pub mod ingest;
pub mod prompts;
pub mod session;

pub use ingest::ChunkAccumulator;
pub use prompts::{PromptLibrary, SavedPrompt};
pub use session::{derive_title, Message, Role, Session, DEFAULT_SESSION_TITLE};

use crate::error::{ChatVaultError, Result};
use crate::storage::StateVault;
use crate::transport::CompletionTransport;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// Namespace key the session collection is persisted under
const SESSIONS_KEY: &str = "sessions";

/// Phase of one in-flight send operation
///
/// A session appears in the responding map only while a send is in
/// flight; both terminal outcomes (finalized and errored) remove the
/// entry, returning the session to idle. A failed send is not retried
/// internally; the caller re-issues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    /// The user message and assistant placeholder are being appended
    SendingUserMessage,
    /// The request is issued and no response content has arrived yet
    AwaitingResponse,
    /// Chunks are arriving and the placeholder is being overwritten
    Streaming,
}

/// Immutable view of store state, published after every mutation
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Sessions in display order, newest created first
    pub sessions: Vec<Session>,
    /// Active session id; always references a present session when set
    pub active_session_id: Option<Uuid>,
    /// In-flight sends by session id; an absent entry means idle
    pub responding: BTreeMap<Uuid, SendPhase>,
    /// Message from the most recent failed send, cleared when a new send
    /// begins
    pub last_error: Option<String>,
}

impl StoreSnapshot {
    /// The session with the given id, if present
    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// The active session's resolved object, if one is selected
    pub fn active_session(&self) -> Option<&Session> {
        self.active_session_id.and_then(|id| self.session(id))
    }

    /// Whether the given session has a send in flight
    pub fn is_responding(&self, id: Uuid) -> bool {
        self.responding.contains_key(&id)
    }

    /// Whether any session has a send in flight
    pub fn any_responding(&self) -> bool {
        !self.responding.is_empty()
    }
}

/// Behavior switches for the conversation store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Request streamed responses when true, single-shot when false
    pub stream: bool,
    /// Create an empty session at construction when none were restored
    pub auto_create_session: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            stream: true,
            auto_create_session: false,
        }
    }
}

/// Durable form of the session collection and active pointer
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSessions {
    sessions: Vec<Session>,
    active_session_id: Option<Uuid>,
}

#[derive(Debug, Default)]
struct StoreState {
    sessions: Vec<Session>,
    active_session_id: Option<Uuid>,
    responding: BTreeMap<Uuid, SendPhase>,
    last_error: Option<String>,
}

impl StoreState {
    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self.sessions.clone(),
            active_session_id: self.active_session_id,
            responding: self.responding.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Store of chat sessions talking to a remote completion service
///
/// All mutation methods take `&self`; the store is intended to live in an
/// [`Arc`] shared between the presentation layer and any background
/// tasks. The internal lock is held only across synchronous mutation
/// sections, never across an await, so mutations are atomic from an
/// observer's point of view while sends to different sessions proceed
/// concurrently.
pub struct ConversationStore {
    state: Mutex<StoreState>,
    vault: StateVault,
    transport: Arc<dyn CompletionTransport>,
    options: StoreOptions,
    tx: watch::Sender<StoreSnapshot>,
}

impl ConversationStore {
    /// Create a store from its collaborators, restoring persisted state
    ///
    /// Missing or unreadable persisted state degrades to an empty
    /// collection. A persisted active pointer that no longer references a
    /// present session is dropped. When `options.auto_create_session` is
    /// set and nothing was restored, one empty session is created.
    pub fn new(
        vault: StateVault,
        transport: Arc<dyn CompletionTransport>,
        options: StoreOptions,
    ) -> Self {
        let state = match vault.load::<PersistedSessions>(SESSIONS_KEY) {
            Some(doc) => {
                let active = doc
                    .active_session_id
                    .filter(|id| doc.sessions.iter().any(|s| s.id == *id));
                StoreState {
                    sessions: doc.sessions,
                    active_session_id: active,
                    ..Default::default()
                }
            }
            None => StoreState::default(),
        };
        tracing::debug!(count = state.sessions.len(), "Restored session collection");

        let (tx, _) = watch::channel(state.snapshot());
        let store = Self {
            state: Mutex::new(state),
            vault,
            transport,
            options,
            tx,
        };

        if store.options.auto_create_session && store.sessions().is_empty() {
            store.create_session();
        }

        store
    }

    /// Create a new empty session, select it, and return its id
    pub fn create_session(&self) -> Uuid {
        self.with_state(|state| {
            let session = Session::new();
            let id = session.id;
            state.sessions.insert(0, session);
            state.active_session_id = Some(id);
            tracing::info!(session_id = %id, "Created session");
            id
        })
    }

    /// Send a user message and ingest the assistant response
    ///
    /// When `session_id` is `None` or references no present session, a
    /// new session is created and used. The user message and an empty
    /// assistant placeholder are appended atomically before the request
    /// is issued; the placeholder is then the exclusive mutation target
    /// until the send resolves.
    ///
    /// Returns `Ok(None)` without touching any session when `content`
    /// trims to empty. Otherwise returns `Ok(Some(id))` of the session
    /// used once the send has resolved, including when the transport
    /// failed; in that case the failure is recorded as `last_error`,
    /// the responding flag is cleared, and any partial content remains
    /// in place.
    ///
    /// # Errors
    ///
    /// Returns `ChatVaultError::SessionBusy` when the target session
    /// already has a send in flight. Transport failures do not surface
    /// as errors here.
    pub async fn send(&self, session_id: Option<Uuid>, content: &str) -> Result<Option<Uuid>> {
        if content.trim().is_empty() {
            tracing::debug!("Ignoring send with empty content");
            return Ok(None);
        }

        let (target, placeholder_id) = self.begin_send(session_id, content)?;

        // Clears the responding entry on every exit path, including the
        // caller dropping this future mid-stream.
        let _guard = RespondingGuard {
            store: self,
            session_id: target,
        };

        let outcome = if self.options.stream {
            self.ingest_streamed(target, placeholder_id, content).await
        } else {
            self.ingest_single(target, placeholder_id, content).await
        };

        if let Err(e) = outcome {
            tracing::warn!(session_id = %target, "Send failed: {}", e);
            self.with_state(|state| {
                state.last_error = Some(e.to_string());
            });
        }

        Ok(Some(target))
    }

    /// Set the active pointer to `id`; no-op when the session is absent
    pub fn select_session(&self, id: Uuid) {
        self.with_state(|state| {
            if state.sessions.iter().any(|s| s.id == id) {
                state.active_session_id = Some(id);
            } else {
                tracing::debug!(session_id = %id, "Ignoring selection of unknown session");
            }
        });
    }

    /// Remove the session with the given id
    ///
    /// Deleting the active session selects the most recently created
    /// remaining session, or clears the pointer when none remain.
    pub fn delete_session(&self, id: Uuid) {
        self.with_state(|state| {
            let before = state.sessions.len();
            state.sessions.retain(|s| s.id != id);
            if state.sessions.len() == before {
                return;
            }

            tracing::info!(session_id = %id, "Deleted session");
            state.responding.remove(&id);
            if state.active_session_id == Some(id) {
                state.active_session_id = state.sessions.first().map(|s| s.id);
            }
        });
    }

    /// Rename a session to the trimmed title
    ///
    /// No-op for unknown ids and for titles that trim to empty.
    pub fn rename_session(&self, id: Uuid, title: &str) {
        self.with_state(|state| {
            if let Some(session) = state.sessions.iter_mut().find(|s| s.id == id) {
                session.rename(title);
            }
        });
    }

    /// Current store snapshot
    pub fn snapshot(&self) -> StoreSnapshot {
        self.tx.borrow().clone()
    }

    /// Observe store snapshots across mutations
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.tx.subscribe()
    }

    /// Sessions in display order, newest created first
    pub fn sessions(&self) -> Vec<Session> {
        self.snapshot().sessions
    }

    /// Id of the active session, if one is selected
    pub fn active_session_id(&self) -> Option<Uuid> {
        self.tx.borrow().active_session_id
    }

    /// Resolved active session, if one is selected
    pub fn active_session(&self) -> Option<Session> {
        self.snapshot().active_session().cloned()
    }

    /// Whether the given session has a send in flight
    pub fn is_responding(&self, id: Uuid) -> bool {
        self.tx.borrow().is_responding(id)
    }

    /// Whether any session has a send in flight
    pub fn any_responding(&self) -> bool {
        self.tx.borrow().any_responding()
    }

    /// Message from the most recent failed send, if any
    pub fn last_error(&self) -> Option<String> {
        self.tx.borrow().last_error.clone()
    }

    /// Resolve the target session, guard against a concurrent send, and
    /// append the user message plus assistant placeholder atomically
    fn begin_send(&self, session_id: Option<Uuid>, content: &str) -> Result<(Uuid, Uuid)> {
        let (target, placeholder_id) = self.with_state(|state| -> Result<(Uuid, Uuid)> {
            let pos = match session_id.and_then(|id| state.sessions.iter().position(|s| s.id == id))
            {
                Some(pos) => pos,
                None => {
                    let session = Session::new();
                    state.active_session_id = Some(session.id);
                    state.sessions.insert(0, session);
                    tracing::info!(session_id = %state.sessions[0].id, "Created session for send");
                    0
                }
            };
            let target = state.sessions[pos].id;

            if state.responding.contains_key(&target) {
                tracing::warn!(session_id = %target, "Rejecting send: session already responding");
                return Err(ChatVaultError::SessionBusy(target).into());
            }

            state.last_error = None;
            state.responding.insert(target, SendPhase::SendingUserMessage);

            let session = &mut state.sessions[pos];
            session.push_user(content);
            let placeholder_id = session.push_assistant_placeholder();
            Ok((target, placeholder_id))
        })?;

        self.with_state(|state| {
            state.responding.insert(target, SendPhase::AwaitingResponse);
        });

        Ok((target, placeholder_id))
    }

    /// Consume a streamed response, overwriting the placeholder with the
    /// trimmed accumulated text after every chunk
    async fn ingest_streamed(
        &self,
        session_id: Uuid,
        placeholder_id: Uuid,
        prompt: &str,
    ) -> Result<()> {
        let mut chunks = self.transport.stream(session_id, prompt).await?;
        let mut accumulator = ChunkAccumulator::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            accumulator.push(&chunk);
            let text = accumulator.trimmed_text();

            let target_alive = self.with_state(|state| {
                match state.sessions.iter_mut().find(|s| s.id == session_id) {
                    Some(session) => {
                        state.responding.insert(session_id, SendPhase::Streaming);
                        session.overwrite_content(placeholder_id, text)
                    }
                    None => false,
                }
            });

            if !target_alive {
                tracing::debug!(session_id = %session_id, "Streaming target gone, dropping remaining chunks");
                break;
            }
        }

        Ok(())
    }

    /// Receive a single-shot response and write it into the placeholder
    async fn ingest_single(
        &self,
        session_id: Uuid,
        placeholder_id: Uuid,
        prompt: &str,
    ) -> Result<()> {
        let content = self.transport.complete(session_id, prompt).await?;

        self.with_state(|state| {
            if let Some(session) = state.sessions.iter_mut().find(|s| s.id == session_id) {
                session.overwrite_content(placeholder_id, content);
            }
        });

        Ok(())
    }

    /// Run a mutation under the lock, then mirror the result to
    /// observers and durable storage
    ///
    /// The closure must not block or await; the lock spans only the
    /// synchronous mutation.
    fn with_state<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.lock_state();
        let result = f(&mut state);
        self.publish(&state);
        result
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mirror state to observers and durable storage
    ///
    /// Persistence is best-effort: a failed write is logged and the
    /// in-memory mutation stands.
    fn publish(&self, state: &StoreState) {
        self.tx.send_replace(state.snapshot());

        let doc = PersistedSessions {
            sessions: state.sessions.clone(),
            active_session_id: state.active_session_id,
        };
        if let Err(e) = self.vault.save(SESSIONS_KEY, &doc) {
            tracing::warn!("Failed to persist session collection: {}", e);
        }
    }
}

/// Removes a session's responding entry when dropped
///
/// Constructed after the responding entry is inserted and held across
/// the whole network exchange, so the entry is cleared on completion, on
/// failure, and when the send future is dropped before resolving.
struct RespondingGuard<'a> {
    store: &'a ConversationStore,
    session_id: Uuid,
}

impl Drop for RespondingGuard<'_> {
    fn drop(&mut self) {
        self.store.with_state(|state| {
            state.responding.remove(&self.session_id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::CompletionChunks;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn temp_vault() -> (StateVault, tempfile::TempDir) {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let vault = StateVault::open(temp_dir.path().join("state.db")).expect("open vault");
        (vault, temp_dir)
    }

    /// Transport answering single-shot requests with a fixed reply
    struct SingleShotTransport {
        reply: String,
    }

    #[async_trait]
    impl CompletionTransport for SingleShotTransport {
        async fn complete(&self, _session_id: Uuid, _prompt: &str) -> Result<String> {
            Ok(self.reply.clone())
        }

        async fn stream(&self, _session_id: Uuid, _prompt: &str) -> Result<CompletionChunks> {
            panic!("single-shot transport received a stream request");
        }
    }

    /// Transport replaying a scripted chunk sequence, optionally failing
    /// after the scripted chunks are exhausted
    struct StreamingTransport {
        chunks: Vec<Bytes>,
        fail_at_end: bool,
    }

    impl StreamingTransport {
        fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
                fail_at_end: false,
            }
        }

        fn failing(chunks: &[&str]) -> Self {
            Self {
                fail_at_end: true,
                ..Self::new(chunks)
            }
        }
    }

    #[async_trait]
    impl CompletionTransport for StreamingTransport {
        async fn complete(&self, _session_id: Uuid, _prompt: &str) -> Result<String> {
            panic!("streaming transport received a single-shot request");
        }

        async fn stream(&self, _session_id: Uuid, _prompt: &str) -> Result<CompletionChunks> {
            let mut items: Vec<Result<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
            if self.fail_at_end {
                items.push(Err(
                    ChatVaultError::Transport("connection reset".to_string()).into()
                ));
            }
            Ok(futures::stream::iter(items).boxed())
        }
    }

    /// Transport failing its first request and answering afterwards
    struct FlakyTransport {
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl CompletionTransport for FlakyTransport {
        async fn complete(&self, _session_id: Uuid, _prompt: &str) -> Result<String> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(ChatVaultError::Transport("first attempt refused".to_string()).into());
            }
            Ok("recovered".to_string())
        }

        async fn stream(&self, _session_id: Uuid, _prompt: &str) -> Result<CompletionChunks> {
            panic!("flaky transport is single-shot only");
        }
    }

    /// Transport that parks until released, for busy and cancellation tests
    struct HangingTransport {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CompletionTransport for HangingTransport {
        async fn complete(&self, _session_id: Uuid, _prompt: &str) -> Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(String::new())
        }

        async fn stream(&self, _session_id: Uuid, _prompt: &str) -> Result<CompletionChunks> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(futures::stream::iter(Vec::<Result<Bytes>>::new()).boxed())
        }
    }

    fn streaming_store(transport: StreamingTransport) -> (ConversationStore, tempfile::TempDir) {
        let (vault, guard) = temp_vault();
        let store = ConversationStore::new(vault, Arc::new(transport), StoreOptions::default());
        (store, guard)
    }

    fn single_shot_store(reply: &str) -> (ConversationStore, tempfile::TempDir) {
        let (vault, guard) = temp_vault();
        let transport = SingleShotTransport {
            reply: reply.to_string(),
        };
        let options = StoreOptions {
            stream: false,
            ..Default::default()
        };
        let store = ConversationStore::new(vault, Arc::new(transport), options);
        (store, guard)
    }

    #[test]
    fn test_create_session_selects_and_front_inserts() {
        let (store, _guard) = single_shot_store("ignored");

        let first = store.create_session();
        let second = store.create_session();

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second);
        assert_eq!(sessions[1].id, first);
        assert_eq!(store.active_session_id(), Some(second));
    }

    #[test]
    fn test_select_session_ignores_unknown_id() {
        let (store, _guard) = single_shot_store("ignored");
        let id = store.create_session();

        store.select_session(Uuid::new_v4());
        assert_eq!(store.active_session_id(), Some(id));
    }

    #[test]
    fn test_select_session_moves_active_pointer() {
        let (store, _guard) = single_shot_store("ignored");
        let first = store.create_session();
        let _second = store.create_session();

        store.select_session(first);
        assert_eq!(store.active_session_id(), Some(first));
    }

    #[test]
    fn test_delete_active_selects_most_recently_created_remaining() {
        let (store, _guard) = single_shot_store("ignored");
        let oldest = store.create_session();
        let middle = store.create_session();
        let newest = store.create_session();

        store.select_session(middle);
        store.delete_session(middle);

        // Remaining collection is [newest, oldest]; the front entry is the
        // most recently created.
        assert_eq!(store.active_session_id(), Some(newest));
        assert!(store.sessions().iter().any(|s| s.id == oldest));
    }

    #[test]
    fn test_delete_only_session_clears_active_pointer() {
        let (store, _guard) = single_shot_store("ignored");
        let id = store.create_session();

        store.delete_session(id);

        assert!(store.sessions().is_empty());
        assert_eq!(store.active_session_id(), None);
    }

    #[test]
    fn test_delete_inactive_session_keeps_active_pointer() {
        let (store, _guard) = single_shot_store("ignored");
        let first = store.create_session();
        let second = store.create_session();

        store.delete_session(first);

        assert_eq!(store.active_session_id(), Some(second));
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn test_rename_session_trims_title() {
        let (store, _guard) = single_shot_store("ignored");
        let id = store.create_session();

        store.rename_session(id, "  fresh title  ");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.session(id).expect("session").title, "fresh title");
    }

    #[test]
    fn test_rename_session_rejects_empty_title() {
        let (store, _guard) = single_shot_store("ignored");
        let id = store.create_session();

        store.rename_session(id, "   ");

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot.session(id).expect("session").title,
            DEFAULT_SESSION_TITLE
        );
    }

    #[tokio::test]
    async fn test_send_empty_content_is_noop() {
        let (store, _guard) = single_shot_store("ignored");
        let id = store.create_session();

        let result = store.send(Some(id), "   \n ").await.expect("send resolves");

        assert_eq!(result, None);
        assert!(store.snapshot().session(id).expect("session").messages.is_empty());
        assert!(!store.any_responding());
    }

    #[tokio::test]
    async fn test_send_creates_session_when_none_supplied() {
        let (store, _guard) = single_shot_store("the reply");

        let id = store
            .send(None, "hello")
            .await
            .expect("send resolves")
            .expect("session created");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.active_session_id, Some(id));
    }

    #[tokio::test]
    async fn test_send_creates_session_when_id_unknown() {
        let (store, _guard) = single_shot_store("the reply");

        let id = store
            .send(Some(Uuid::new_v4()), "hello")
            .await
            .expect("send resolves")
            .expect("session created");

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, id);
    }

    #[tokio::test]
    async fn test_send_single_shot_appends_user_then_assistant() {
        let (store, _guard) = single_shot_store("assistant says hi");

        let id = store
            .send(None, "user says hi")
            .await
            .expect("send resolves")
            .expect("session used");

        let snapshot = store.snapshot();
        let session = snapshot.session(id).expect("session");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "user says hi");
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert_eq!(session.messages[1].content, "assistant says hi");
        assert!(!store.any_responding());
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_send_streamed_accumulates_and_trims_trailing_whitespace() {
        let (store, _guard) = streaming_store(StreamingTransport::new(&["Hel", "lo wor", "ld  "]));

        let id = store
            .send(None, "greet me")
            .await
            .expect("send resolves")
            .expect("session used");

        let snapshot = store.snapshot();
        let session = snapshot.session(id).expect("session");
        assert_eq!(session.messages[1].content, "Hello world");
        assert!(!store.any_responding());
    }

    #[tokio::test]
    async fn test_send_failure_mid_stream_keeps_partial_content() {
        let (store, _guard) = streaming_store(StreamingTransport::failing(&["Hel", "lo"]));

        let id = store
            .send(None, "greet me")
            .await
            .expect("send resolves despite transport failure")
            .expect("session used");

        let snapshot = store.snapshot();
        let session = snapshot.session(id).expect("session");
        assert_eq!(session.messages[1].content, "Hello");
        assert!(!store.any_responding());

        let error = store.last_error().expect("failure recorded");
        assert!(error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_send_failure_before_any_chunk_leaves_empty_placeholder() {
        let (store, _guard) = streaming_store(StreamingTransport::failing(&[]));

        let id = store
            .send(None, "greet me")
            .await
            .expect("send resolves")
            .expect("session used");

        let snapshot = store.snapshot();
        let session = snapshot.session(id).expect("session");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].content, "");
        assert!(store.last_error().is_some());
    }

    #[tokio::test]
    async fn test_next_send_clears_previous_error() {
        let (vault, _guard) = temp_vault();
        let transport = FlakyTransport {
            failed_once: AtomicBool::new(false),
        };
        let options = StoreOptions {
            stream: false,
            ..Default::default()
        };
        let store = ConversationStore::new(vault, Arc::new(transport), options);

        let id = store
            .send(None, "first")
            .await
            .expect("send resolves")
            .expect("session used");
        assert!(store.last_error().is_some());

        store.send(Some(id), "second").await.expect("send resolves");
        assert_eq!(store.last_error(), None);

        let snapshot = store.snapshot();
        let messages = &snapshot.session(id).expect("session").messages;
        assert_eq!(messages[3].content, "recovered");
    }

    #[tokio::test]
    async fn test_concurrent_send_to_same_session_is_rejected() {
        let (vault, _guard) = temp_vault();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = HangingTransport {
            started: started.clone(),
            release: release.clone(),
        };
        let store = Arc::new(ConversationStore::new(
            vault,
            Arc::new(transport),
            StoreOptions::default(),
        ));
        let id = store.create_session();

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.send(Some(id), "first").await })
        };
        started.notified().await;
        assert!(store.is_responding(id));

        let second = store.send(Some(id), "second").await;
        let err = second.expect_err("second send must be rejected");
        match err.downcast_ref::<ChatVaultError>() {
            Some(ChatVaultError::SessionBusy(busy_id)) => assert_eq!(*busy_id, id),
            other => panic!("expected SessionBusy, got {:?}", other),
        }

        release.notify_one();
        first
            .await
            .expect("task joins")
            .expect("first send resolves");
        assert!(!store.is_responding(id));

        // Only the first send appended messages.
        let snapshot = store.snapshot();
        assert_eq!(snapshot.session(id).expect("session").messages.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_sends_to_different_sessions_proceed() {
        let (vault, _guard) = temp_vault();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = HangingTransport {
            started: started.clone(),
            release: release.clone(),
        };
        let store = Arc::new(ConversationStore::new(
            vault,
            Arc::new(transport),
            StoreOptions::default(),
        ));
        let first_session = store.create_session();
        let second_session = store.create_session();

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.send(Some(first_session), "to the first").await })
        };
        started.notified().await;

        let second = {
            let store = store.clone();
            tokio::spawn(async move { store.send(Some(second_session), "to the second").await })
        };
        started.notified().await;
        assert!(store.is_responding(first_session));
        assert!(store.is_responding(second_session));

        release.notify_one();
        release.notify_one();
        first.await.expect("join").expect("first resolves");
        second.await.expect("join").expect("second resolves");
        assert!(!store.any_responding());
    }

    #[tokio::test]
    async fn test_dropping_send_future_clears_responding_flag() {
        let (vault, _guard) = temp_vault();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = HangingTransport {
            started: started.clone(),
            release,
        };
        let store = Arc::new(ConversationStore::new(
            vault,
            Arc::new(transport),
            StoreOptions::default(),
        ));
        let id = store.create_session();

        let send = {
            let store = store.clone();
            tokio::spawn(async move { store.send(Some(id), "never finishes").await })
        };
        started.notified().await;
        assert!(store.is_responding(id));

        send.abort();
        let _ = send.await;

        assert!(!store.is_responding(id));
        // The appended user message and placeholder stay in place.
        let snapshot = store.snapshot();
        assert_eq!(snapshot.session(id).expect("session").messages.len(), 2);
    }

    #[tokio::test]
    async fn test_responding_phase_visible_during_send() {
        let (vault, _guard) = temp_vault();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = HangingTransport {
            started: started.clone(),
            release: release.clone(),
        };
        let store = Arc::new(ConversationStore::new(
            vault,
            Arc::new(transport),
            StoreOptions::default(),
        ));
        let id = store.create_session();

        let send = {
            let store = store.clone();
            tokio::spawn(async move { store.send(Some(id), "phased").await })
        };
        started.notified().await;

        assert_eq!(
            store.snapshot().responding.get(&id),
            Some(&SendPhase::AwaitingResponse)
        );

        release.notify_one();
        send.await.expect("join").expect("send resolves");
        assert_eq!(store.snapshot().responding.get(&id), None);
    }

    #[test]
    fn test_auto_create_session_option() {
        let (vault, _guard) = temp_vault();
        let transport = Arc::new(SingleShotTransport {
            reply: String::new(),
        });
        let options = StoreOptions {
            auto_create_session: true,
            ..Default::default()
        };

        let store = ConversationStore::new(vault, transport, options);

        assert_eq!(store.sessions().len(), 1);
        assert!(store.active_session_id().is_some());
    }

    #[test]
    fn test_auto_create_skipped_when_state_restored() {
        let (vault, _guard) = temp_vault();
        let transport = Arc::new(SingleShotTransport {
            reply: String::new(),
        });

        let existing = {
            let store =
                ConversationStore::new(vault.clone(), transport.clone(), StoreOptions::default());
            store.create_session()
        };

        let options = StoreOptions {
            auto_create_session: true,
            ..Default::default()
        };
        let store = ConversationStore::new(vault, transport, options);

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, existing);
    }

    #[test]
    fn test_restore_drops_dangling_active_pointer() {
        let (vault, _guard) = temp_vault();
        let doc = PersistedSessions {
            sessions: vec![Session::new()],
            active_session_id: Some(Uuid::new_v4()),
        };
        vault.save(SESSIONS_KEY, &doc).expect("seed vault");

        let transport = Arc::new(SingleShotTransport {
            reply: String::new(),
        });
        let store = ConversationStore::new(vault, transport, StoreOptions::default());

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.active_session_id(), None);
    }

    #[tokio::test]
    async fn test_user_message_precedes_assistant_across_sends() {
        let (store, _guard) = single_shot_store("pong");

        let id = store
            .send(None, "ping one")
            .await
            .expect("send resolves")
            .expect("session used");
        store.send(Some(id), "ping two").await.expect("send resolves");
        store.send(Some(id), "ping three").await.expect("send resolves");

        let snapshot = store.snapshot();
        let messages = &snapshot.session(id).expect("session").messages;
        assert_eq!(messages.len(), 6);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }

    #[tokio::test]
    async fn test_first_send_derives_session_title() {
        let (store, _guard) = single_shot_store("reply");

        let id = store
            .send(None, "name this session after me")
            .await
            .expect("send resolves")
            .expect("session used");

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot.session(id).expect("session").title,
            "name this session after me"
        );
    }
}
