//! AI provider resolution

use super::config::{ProviderConfig, ProviderKind};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tasklane_llm::{AiProvider, GeminiConfig, GeminiProvider, MockProvider};
use tracing::{info, warn};

/// Build the configured provider. `model` overrides the provider default
/// when non-empty.
pub fn resolve_provider(config: &ProviderConfig, model: &str) -> Result<Arc<dyn AiProvider>> {
    match config.kind {
        ProviderKind::Mock => {
            warn!("Using mock AI provider; responses are canned");
            Ok(Arc::new(MockProvider::new()))
        }
        ProviderKind::Gemini => {
            let mut gemini = GeminiConfig::from_env()
                .context("Gemini selected but GEMINI_API_KEY / GOOGLE_API_KEY is not set")?
                .with_timeout(Duration::from_secs(config.timeout_secs));
            if let Some(base_url) = &config.base_url {
                gemini = gemini.with_base_url(base_url.as_str());
            }
            if !model.is_empty() {
                gemini = gemini.with_model(model);
            }

            let provider = GeminiProvider::new(gemini).context("Failed to create Gemini client")?;
            info!(model = provider.default_model(), "Registered Gemini provider");
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider() {
        let config = ProviderConfig {
            kind: ProviderKind::Mock,
            ..ProviderConfig::default()
        };
        let provider = resolve_provider(&config, "").unwrap();
        assert_eq!(provider.name(), "mock");
    }
}
