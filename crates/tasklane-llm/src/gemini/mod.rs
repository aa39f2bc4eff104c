//! Google Gemini provider
//!
//! Text-only `generateContent` client used for project summaries and
//! question answering.

mod config;
mod provider;
mod types;

pub use config::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use provider::GeminiProvider;
