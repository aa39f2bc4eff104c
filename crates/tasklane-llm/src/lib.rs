//! Tasklane LLM - Generative-AI Provider Abstraction
//!
//! This crate provides the provider side of the Tasklane AI gateway:
//! - Provider: the `AiProvider` trait the gateway calls
//! - Error: provider failures classified as transient or definitive
//! - Gemini: Google Gemini `generateContent` client
//! - Mock: scripted provider for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::MockProvider;
pub use provider::AiProvider;
