use async_trait::async_trait;
use bytes::Bytes;
use chatvault::storage::StateVault;
use chatvault::store::{ConversationStore, StoreOptions};
use chatvault::transport::{CompletionChunks, CompletionTransport};
use chatvault::Result;
use futures::StreamExt;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

#[allow(dead_code)]
pub fn create_temp_vault() -> (StateVault, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("state.db");
    let vault = StateVault::open(&db_path).expect("failed to open state vault");
    (vault, tmp)
}

/// Transport that replays a fixed chunk script for every request
pub struct ScriptedTransport {
    chunks: Vec<Bytes>,
    reply: String,
}

impl ScriptedTransport {
    #[allow(dead_code)]
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
            reply: chunks.concat(),
        }
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn complete(&self, _session_id: Uuid, _prompt: &str) -> Result<String> {
        Ok(self.reply.clone())
    }

    async fn stream(&self, _session_id: Uuid, _prompt: &str) -> Result<CompletionChunks> {
        let chunks: Vec<Result<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(futures::stream::iter(chunks).boxed())
    }
}

#[allow(dead_code)]
pub fn scripted_store(chunks: &[&str]) -> (ConversationStore, TempDir) {
    let (vault, tmp) = create_temp_vault();
    let store = ConversationStore::new(
        vault,
        Arc::new(ScriptedTransport::new(chunks)),
        StoreOptions::default(),
    );
    (store, tmp)
}
