//! Server module for Tasklane
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `providers`: AI provider resolution
//! - `init`: Gateway construction, router and run loop

pub mod config;
mod init;
mod loader;
mod providers;

pub use init::{build_router, build_state, run, AppState};
pub use loader::load_config;
