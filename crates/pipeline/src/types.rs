//! Shared value types for the issue-to-pull-request workflow.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. generated content is never empty,
//! token counts are non-negative integers) and participate in domain decisions.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ArtifactPath, BranchName, IssueNumber, LabelName, ModelName, PullRequestNumber, RunId,
};

// ---------------------------------------------------------------------------
// Token accounting
// ---------------------------------------------------------------------------

/// Number of tokens consumed or budgeted in an LLM API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenCount(u64);

impl TokenCount {
    /// Creates a [`TokenCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this count is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for TokenCount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

/// Token usage reported by a provider for one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt (system prompt plus issue body).
    pub input: TokenCount,
    /// Tokens in the generated completion.
    pub output: TokenCount,
}

impl TokenUsage {
    /// Sum of input and output tokens.
    pub fn total(self) -> TokenCount {
        self.input + self.output
    }
}

// ---------------------------------------------------------------------------
// Issues and trigger events
// ---------------------------------------------------------------------------

/// A GitHub Issue as delivered by the triggering event.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// The issue number.
    pub number: IssueNumber,
    /// Issue title.
    pub title: String,
    /// Free-text issue body. GitHub sends `null` for an empty body; that is
    /// normalised to the empty string.
    pub body: String,
    /// Labels currently attached to the issue.
    pub labels: Vec<LabelName>,
}

impl Issue {
    /// Returns `true` if the body has no non-whitespace content.
    pub fn has_empty_body(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// The triggering `issues` webhook event, reduced to what the workflow needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Webhook action (e.g. `"labeled"`, `"opened"`), if present.
    pub action: Option<String>,
    /// The issue the event refers to.
    pub issue: Issue,
    /// The label just applied, for `labeled` events.
    pub applied_label: Option<LabelName>,
}

impl IssueEvent {
    /// Returns `true` if `label` is attached to the issue or was just applied.
    pub fn carries_label(&self, label: &LabelName) -> bool {
        self.applied_label.as_ref() == Some(label) || self.issue.labels.contains(label)
    }
}

// ---------------------------------------------------------------------------
// Providers and generated content
// ---------------------------------------------------------------------------

/// The content-generation backend selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Deterministic local template; no network call.
    Stub,
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API.
    Openai,
}

impl ProviderKind {
    /// The lowercase selector used in configuration and templates.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Stub => "stub",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Openai => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(ProviderKind::Stub),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::Openai),
            other => Err(format!(
                "unknown provider '{other}' (expected stub, anthropic or openai)"
            )),
        }
    }
}

/// Markdown produced by exactly one provider.
///
/// Never empty: a provider that yields no text fails instead of producing a
/// [`GeneratedContent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    markdown: String,
    usage: Option<TokenUsage>,
}

impl GeneratedContent {
    /// Wraps generated markdown, returning `None` if it is blank.
    pub fn new(markdown: impl Into<String>, usage: Option<TokenUsage>) -> Option<Self> {
        let markdown = markdown.into();
        if markdown.trim().is_empty() {
            None
        } else {
            Some(Self { markdown, usage })
        }
    }

    /// The generated markdown.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Token usage reported by the provider, if any.
    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }
}

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

/// A pull request created by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Number assigned by GitHub.
    pub number: PullRequestNumber,
    /// Browser URL of the pull request.
    pub url: String,
}

/// Result of the best-effort pull-request step.
///
/// Opening a pull request is allowed to fail; the run then continues with a
/// manual compare link instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullRequestOutcome {
    /// The pull request was created.
    Opened {
        /// The created pull request.
        pull_request: PullRequest,
        /// Manual compare link, kept for reference.
        compare_url: String,
    },
    /// Creation failed; the user can open one from `compare_url`.
    Fallback {
        /// Manual compare link for the pushed branch.
        compare_url: String,
        /// Why the pull request could not be created.
        reason: String,
    },
}

impl PullRequestOutcome {
    /// The link to show the user: the PR if opened, else the compare page.
    pub fn link(&self) -> &str {
        match self {
            PullRequestOutcome::Opened { pull_request, .. } => &pull_request.url,
            PullRequestOutcome::Fallback { compare_url, .. } => compare_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Phases of the run-once workflow.
///
/// ```text
/// Idle → Validating → Generating → Writing → Publishing → Notifying → Done
///             └──────────┴───────────┴──────────┴→ Failed → NotifyFailure → Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Nothing has happened yet.
    Idle,
    /// Checking the trigger label and the issue body.
    Validating,
    /// Waiting on the content provider.
    Generating,
    /// Writing the artifact file.
    Writing,
    /// Committing and pushing the issue branch.
    Publishing,
    /// Opening the pull request and posting the success comment.
    Notifying,
    /// A fatal error occurred.
    Failed,
    /// Posting the failure comment.
    NotifyFailure,
    /// Terminal.
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Validating => "validating",
            RunPhase::Generating => "generating",
            RunPhase::Writing => "writing",
            RunPhase::Publishing => "publishing",
            RunPhase::Notifying => "notifying",
            RunPhase::Failed => "failed",
            RunPhase::NotifyFailure => "notify_failure",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Summary of one run, logged at the end and optionally persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Correlates the report with the run's tracing span.
    pub run_id: RunId,
    /// The issue that triggered the run.
    pub issue: IssueNumber,
    /// Provider selected for generation.
    pub provider: ProviderKind,
    /// Model recorded in the artifact header and pull request.
    pub model: ModelName,
    /// Where the artifact is (or would have been) written.
    pub artifact: ArtifactPath,
    /// The issue branch, `issue-<n>-claude`.
    pub branch: BranchName,
    /// Resolved base branch; `None` if the run failed before publishing.
    pub base_branch: Option<BranchName>,
    /// `None` if the run failed before the pull-request step.
    pub pull_request: Option<PullRequestOutcome>,
    /// Provider token counts; `None` for the stub or before generation.
    pub usage: Option<TokenUsage>,
    /// The phase the run was in when it failed, or `Done`.
    pub last_phase: RunPhase,
    /// Message of the fatal error, if any.
    pub error: Option<String>,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the report was built.
    pub finished_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
