//! Error types for the completion client.

use thiserror::Error;

/// Errors that can occur while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport failure, or a body that is not the expected JSON.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("completion endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response held no choices.
    #[error("completion response contained no choices")]
    EmptyChoices,

    /// The first choice carried no text.
    #[error("completion choice has no content")]
    MissingContent,
}

/// Convenience result alias for completion calls.
pub type CompletionResult<T> = Result<T, CompletionError>;
