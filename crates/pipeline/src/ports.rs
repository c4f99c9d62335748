//! Port traits implemented by infrastructure crates.
//!
//! The run-once workflow only ever sees these traits. Adapters:
//!
//! | Trait | Adapter |
//! |-------|---------|
//! | [`ContentGenerator`] | `llm::StubGenerator`, `llm::AnthropicGenerator`, `llm::OpenAiGenerator` |
//! | [`ArtifactStore`], [`CodeRepository`] | `github::LocalCheckout` |
//! | [`IssueTracker`], [`PullRequestManager`] | `github::GithubClient` |

use async_trait::async_trait;

use crate::{
    ArtifactError, ArtifactPath, BranchName, GenerationError, GeneratedContent, GitError,
    HostingError, Issue, IssueNumber, ModelName, ProviderKind, PullRequest, RepositoryId,
};

/// Produces a markdown document from an issue.
///
/// Exactly one implementation is selected per run. Callers guarantee the
/// issue body is non-empty before calling [`ContentGenerator::generate`].
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Which provider this generator talks to.
    fn provider(&self) -> ProviderKind;

    /// The model identifier recorded in the artifact and PR.
    fn model(&self) -> &ModelName;

    /// Generates the document.
    async fn generate(&self, issue: &Issue) -> Result<GeneratedContent, GenerationError>;
}

/// Persists the artifact file in the working tree.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes `contents` to `path`, creating parent directories and replacing
    /// any existing file.
    async fn write(&self, path: &ArtifactPath, contents: &str) -> Result<(), ArtifactError>;
}

/// A committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

impl GitIdentity {
    /// The identity GitHub Actions uses for bot commits.
    pub fn actions_bot() -> Self {
        Self {
            name: "github-actions[bot]".to_string(),
            email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

/// Opaque git plumbing on the local checkout.
///
/// Every method is a single git operation; sequencing is the caller's job.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Sets `fallback` as committer identity for any part (name, email) that
    /// is not already configured. Existing values are never overwritten.
    async fn ensure_identity(&self, fallback: &GitIdentity) -> Result<(), GitError>;

    /// Creates `branch` at the current commit, resetting it if it exists, and
    /// checks it out.
    async fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Stages `path`, overriding ignore rules.
    async fn stage(&self, path: &ArtifactPath) -> Result<(), GitError>;

    /// Commits the staged changes with `message`.
    async fn commit(&self, message: &str) -> Result<(), GitError>;

    /// Looks up the remote's default branch.
    async fn remote_default_branch(&self) -> Result<BranchName, GitError>;

    /// Pushes `branch` to the remote, creating or overwriting it there.
    async fn push(&self, branch: &BranchName) -> Result<(), GitError>;
}

/// Posts comments on issues.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn post_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), HostingError>;
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRequest {
    pub repository: RepositoryId,
    pub head: BranchName,
    pub base: BranchName,
    pub title: String,
    pub body: String,
}

/// Opens pull requests.
#[async_trait]
pub trait PullRequestManager: Send + Sync {
    async fn open_pull_request(
        &self,
        request: &PullRequestRequest,
    ) -> Result<PullRequest, HostingError>;
}
