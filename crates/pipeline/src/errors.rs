//! Error and retry-policy types for the workflow domain.
//!
//! [`RunError`] covers conditions that abort a run. Each port has its own
//! error type ([`GenerationError`], [`ArtifactError`], [`GitError`],
//! [`HostingError`]) so adapters can report failures without knowing how the
//! run reacts to them.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ProviderKind, RunPhase};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry.
///
/// Returned by infrastructure error types to let the retrying HTTP wrapper
/// decide whether to re-issue a request.
///
/// ## Rules
///
/// - `Retryable` errors: HTTP 429 and 5xx responses.
/// - `NonRetryable` errors: every other non-success status, transport
///   failures, malformed responses, missing credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried on the caller's back-off schedule.
    Retryable,
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Classifies an HTTP status code.
    pub fn for_status(status: u16) -> Self {
        if status == 429 || (500..=599).contains(&status) {
            RetryPolicy::Retryable
        } else {
            RetryPolicy::NonRetryable
        }
    }
}

/// Upper bound on response-body characters kept in an HTTP error.
pub const MAX_ERROR_BODY_CHARS: usize = 2_000;

/// Cuts an error response body to [`MAX_ERROR_BODY_CHARS`] characters,
/// marking the cut with `…`.
pub fn truncate_error_body(text: &str) -> String {
    truncate_chars(text, MAX_ERROR_BODY_CHARS)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Failures while producing content from a provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The API key for the selected provider was not configured.
    #[error("{provider} API key is not configured")]
    MissingCredential { provider: ProviderKind },

    /// The provider answered with a non-success HTTP status.
    #[error("{provider} request failed with HTTP {status}: {body}")]
    Http {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{provider} request could not be completed: {message}")]
    Transport {
        provider: ProviderKind,
        message: String,
    },

    /// The response body did not match the provider's documented schema.
    #[error("{provider} returned a malformed response: {message}")]
    InvalidResponse {
        provider: ProviderKind,
        message: String,
    },

    /// The provider answered successfully but produced no text.
    #[error("{provider} returned empty content")]
    EmptyContent { provider: ProviderKind },
}

impl GenerationError {
    /// Retry classification; only HTTP 429/5xx are transient.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            GenerationError::Http { status, .. } => RetryPolicy::for_status(*status),
            _ => RetryPolicy::NonRetryable,
        }
    }
}

/// Failure to persist the artifact file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to write artifact '{path}': {message}")]
pub struct ArtifactError {
    pub path: String,
    pub message: String,
}

/// A git command exited unsuccessfully or could not be spawned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("git {step} failed: {message}")]
pub struct GitError {
    /// Short name of the failed step (e.g. `"push"`).
    pub step: String,
    /// Captured stderr or spawn error.
    pub message: String,
}

/// Failures talking to the repository hosting API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostingError {
    #[error("GitHub API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("GitHub API request could not be completed: {0}")]
    Transport(String),

    #[error("GitHub API returned a malformed response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a run.
///
/// Pull-request creation and comment posting never produce a [`RunError`]:
/// the former degrades to a compare link, the latter is logged only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The run configuration or trigger event is invalid.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The issue body is empty; no provider is called.
    #[error("issue body is empty")]
    EmptyIssueBody,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Git(#[from] GitError),
}

/// A [`RunError`] together with the phase in which it occurred.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{error} (while {phase})")]
pub struct PhaseError {
    pub phase: RunPhase,
    #[source]
    pub error: RunError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_are_truncated_on_char_boundaries() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語…");

        let long = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let cut = truncate_error_body(&long);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn only_rate_limit_and_server_errors_are_retryable() {
        assert_eq!(RetryPolicy::for_status(429), RetryPolicy::Retryable);
        assert_eq!(RetryPolicy::for_status(500), RetryPolicy::Retryable);
        assert_eq!(RetryPolicy::for_status(503), RetryPolicy::Retryable);
        assert_eq!(RetryPolicy::for_status(599), RetryPolicy::Retryable);
        assert_eq!(RetryPolicy::for_status(400), RetryPolicy::NonRetryable);
        assert_eq!(RetryPolicy::for_status(401), RetryPolicy::NonRetryable);
        assert_eq!(RetryPolicy::for_status(404), RetryPolicy::NonRetryable);
    }

    #[test]
    fn empty_content_message_names_provider() {
        let err = GenerationError::EmptyContent {
            provider: ProviderKind::Anthropic,
        };
        assert_eq!(err.to_string(), "anthropic returned empty content");
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn run_error_is_transparent_over_port_errors() {
        let err: RunError = GitError {
            step: "push".to_string(),
            message: "rejected".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "git push failed: rejected");
    }
}
