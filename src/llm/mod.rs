//! Language-model providers used for prompt extraction

use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiClient;

/// A text-in, text-out completion endpoint
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a single prompt and return the model's raw text
    async fn complete(&self, prompt: &str) -> Result<String>;
}
