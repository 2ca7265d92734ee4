//! Remote completion transport
//!
//! The conversation store reaches the remote completion endpoint through
//! the `CompletionTransport` trait, injected at store construction. The
//! production implementation speaks HTTP; tests substitute scripted
//! transports with canned chunk sequences and failures.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use uuid::Uuid;

pub mod http;

pub use http::HttpCompletionClient;

/// Fixed text used when a non-streamed envelope carries no assistant content
pub const NO_RESPONSE_PLACEHOLDER: &str = "I don't have a response for that.";

/// Stream of raw response fragments from the remote endpoint
///
/// Fragments are unframed UTF-8 text bytes in arrival order; boundaries
/// carry no meaning.
pub type CompletionChunks = BoxStream<'static, Result<Bytes>>;

/// Network collaborator for the conversation store
///
/// Both request shapes carry the originating session id as a correlation
/// token and the user message as the prompt.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Request the whole response in one shot
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures or a response body that is
    /// not the expected JSON envelope. A well-formed envelope without
    /// content resolves to [`NO_RESPONSE_PLACEHOLDER`] instead of an error.
    async fn complete(&self, session_id: Uuid, prompt: &str) -> Result<String>;

    /// Request a streamed response delivered as unframed text fragments
    ///
    /// # Errors
    ///
    /// Returns an error when the request itself fails; errors after the
    /// stream is established surface as `Err` items in the stream.
    async fn stream(&self, session_id: Uuid, prompt: &str) -> Result<CompletionChunks>;
}
