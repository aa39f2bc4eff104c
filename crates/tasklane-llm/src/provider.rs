//! AI provider trait definition
//!
//! This module defines the trait every generative-AI backend implements.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;

/// Trait for generative-AI providers
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Generate a completion for a single prompt
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
