//! CLI command: `tasklane status`
//!
//! Asks a running gateway for a user's status snapshot.

use crate::server::load_config;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::time::Duration;
use tasklane_core::StatusSnapshot;

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    data: StatusSnapshot,
}

/// Run the status subcommand.
pub async fn run(user: &str, url: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let base = url.unwrap_or_else(|| {
        format!("http://{}:{}", config.server.host, config.server.port)
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")?;
    let response = client
        .get(format!("{}/api/v1/ai/status", base.trim_end_matches('/')))
        .header(config.server.identity_header.as_str(), user)
        .send()
        .await
        .with_context(|| format!("Failed to reach {base}"))?;

    if !response.status().is_success() {
        bail!("Server returned {}", response.status());
    }

    let envelope: StatusEnvelope = response
        .json()
        .await
        .context("Unexpected status response")?;
    let status = envelope.data;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  AI status for {user}");
    println!("  {}", "-".repeat(40));
    println!(
        "  {:<18} {}",
        "Available",
        if status.available { "yes" } else { "no" }
    );
    println!(
        "  {:<18} {}/{}",
        "Quota remaining", status.quota_remaining, status.quota_limit
    );
    println!("  {:<18} {}", "Requests today", status.requests_today);
    println!("  {:<18} {}", "Resets in", format_reset(status.resets_in_secs));
    println!(
        "  {:<18} summaries={} questions={}",
        "Features", status.summaries_enabled, status.questions_enabled
    );
    println!();
    Ok(())
}

fn format_reset(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {}s", secs % 60)
    } else {
        format!("{secs}s")
    }
}
