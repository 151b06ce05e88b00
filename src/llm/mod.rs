//! Chat completion client for OpenAI-compatible endpoints.

pub mod client;
pub mod error;

pub use client::{CompletionClient, FALLBACK_REPLY, Reply, ReplyStatus};
pub use error::{CompletionError, CompletionResult};
