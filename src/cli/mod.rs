//! CLI module for Tasklane
//!
//! Provides commands:
//! - `serve`: run the HTTP gateway
//! - `status`: query a running gateway for a user's quota and availability
//! - `check-config`: load, validate and print the effective configuration

use clap::{Parser, Subcommand};

pub mod check_config;
pub mod status;

/// Tasklane AI gateway CLI
#[derive(Parser, Debug)]
#[command(name = "tasklane")]
#[command(about = "Quota-bounded AI request gateway for Tasklane")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve,
    /// Show quota and availability for a user from a running server
    Status {
        /// User id sent in the identity header
        #[arg(long, short)]
        user: String,
        /// Server base URL (defaults to the configured host and port)
        #[arg(long)]
        url: Option<String>,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration and print the effective values
    CheckConfig,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Status { user, url, json }) => status::run(&user, url, json).await,
        Some(Commands::CheckConfig) => check_config::run(),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
