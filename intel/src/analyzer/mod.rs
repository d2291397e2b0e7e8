pub mod gemini;

use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::Arc;

pub use gemini::GeminiClient;

/// A remote text-generation backend. One call per attempt; retrying is the
/// executor's job, not the backend's.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }
}
