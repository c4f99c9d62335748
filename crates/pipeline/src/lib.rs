//! Core domain for issuesmith.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, error type and port trait used by the issue-to-pull-request workflow.
//! Infrastructure crates implement the traits defined here; they never add
//! domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`IssueNumber`, `BranchName`, `ArtifactPath`, etc.) |
//! | [`types`] | Shared value types (`Issue`, `GeneratedContent`, `RunReport`, etc.) |
//! | [`errors`] | Port errors, run errors and the retry policy |
//! | [`ports`] | Traits implemented by the infrastructure crates |
//! | [`render`] | Fixed text templates |

pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod render;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    truncate_error_body, ArtifactError, GenerationError, GitError, HostingError, PhaseError,
    RetryPolicy, RunError, MAX_ERROR_BODY_CHARS,
};
pub use identifiers::{
    ApiKey, ArtifactPath, BranchName, IssueNumber, LabelName, ModelName, PullRequestNumber,
    RepositoryId, RunId,
};
pub use ports::{
    ArtifactStore, CodeRepository, ContentGenerator, GitIdentity, IssueTracker,
    PullRequestManager, PullRequestRequest,
};
pub use types::{
    GeneratedContent, Issue, IssueEvent, ProviderKind, PullRequest, PullRequestOutcome,
    RunPhase, RunReport, Timestamp, TokenCount, TokenUsage,
};
