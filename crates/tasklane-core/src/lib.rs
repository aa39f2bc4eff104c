//! Tasklane Core - AI Request Gateway
//!
//! This crate turns calls to a generative-AI backend into a quota-bounded,
//! cacheable, retry-aware service, including:
//! - Quota: per-user rolling-window request ledger
//! - Rate limiting: per-user token bucket for bursts
//! - Cache: TTL + generation invalidation + request coalescing
//! - Gateway: the validate → limit → cache → quota → provider pipeline
//! - Status: availability and quota snapshot for clients
//! - Events: broadcast of status changes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod gateway;
pub mod health;
pub mod history;
pub mod prompt;
pub mod quota;
pub mod rate_limiter;
pub mod retry;
pub mod status;
pub mod subject;

pub use artifact::{AnswerArtifact, Artifact, ArtifactKind, SummaryArtifact};
pub use cache::{CacheKey, FillSource, ResponseCache};
pub use config::GatewayConfig;
pub use error::{Error, GatewayError, GatewayErrorBody, Result};
pub use event_bus::{EventBus, GatewayEvent};
pub use gateway::{AiGateway, SweepStats};
pub use health::ProviderHealth;
pub use history::QuestionHistory;
pub use quota::{QuotaDecision, QuotaLedger};
pub use rate_limiter::{RateDecision, RateLimiter};
pub use retry::{Exhausted, RetryPolicy, Transient};
pub use status::{StatusReporter, StatusSnapshot};
pub use subject::{InMemorySubjectStore, Subject, SubjectContent, SubjectSource, TaskItem, TaskStatus};
