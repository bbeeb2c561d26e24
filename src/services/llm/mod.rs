//! Generative text service abstraction
//!
//! Book analysis only needs "prompt in, text out" from a model server.

use crate::error::AppResult;

pub mod ollama;

pub use ollama::OllamaClient;

/// Trait for generative text backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Runs one non-streaming generation and returns the generated text.
    ///
    /// The text is expected to be a JSON document; implementations ask the
    /// backend for JSON output but do not parse it.
    async fn generate(&self, prompt: &str) -> AppResult<String>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
