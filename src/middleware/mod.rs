//! Middleware module for the Tasklane HTTP server
//!
//! Provides:
//! - Identity extraction from the trusted upstream header

pub mod identity;
