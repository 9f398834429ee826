//! Language-model gateway abstraction.
//!
//! The dispatch core never talks HTTP directly; it consumes this trait.
//! Everything the engine needs from a model backend is `complete` (one
//! prompt in, one text out) and `stream` (same, chunked). Failures are
//! connection-level ([`GatewayError::Unavailable`]) or deadline-level
//! ([`GatewayError::Timeout`]); response *content* problems are the response
//! parser's business, not the gateway's.

mod ollama;
mod scripted;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::GatewayError;

pub use ollama::OllamaGateway;
pub use scripted::ScriptedGateway;

/// A stream of response text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// Per-call options forwarded to the backend.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Model identifier; empty means the backend's default.
    pub model: String,
    /// Optional system prompt.
    pub system: Option<String>,
    /// Optional sampling temperature.
    pub temperature: Option<f64>,
}

impl CompletionOptions {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

/// The black-box model backend contract.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Complete a prompt, returning the full response text.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, GatewayError>;

    /// Complete a prompt, returning response text as a chunk stream.
    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<TextStream, GatewayError>;
}
