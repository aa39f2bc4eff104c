//! CLI command: `tasklane check-config`

use crate::server::load_config;
use anyhow::Context;

/// Load and validate configuration, then print it as TOML.
pub fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;

    println!("# Effective configuration (valid)");
    println!("{rendered}");
    if config.ai.provider.kind == crate::server::config::ProviderKind::Gemini
        && std::env::var("GEMINI_API_KEY").is_err()
        && std::env::var("GOOGLE_API_KEY").is_err()
    {
        println!("# warning: provider is gemini but GEMINI_API_KEY / GOOGLE_API_KEY is not set");
    }
    Ok(())
}
