//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! an [`IssueNumber`] with a [`PullRequestNumber`] even though both are `u64`
//! under the hood.
//!
//! Names that are *derived* from an issue (the working branch and the artifact
//! path) are produced here and nowhere else, so every component agrees on them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies the GitHub Issue that triggered the run.
    ///
    /// Wraps the issue number assigned by GitHub (positive integer).
    IssueNumber
}

u64_id! {
    /// Identifies a GitHub Pull Request opened for the generated artifact.
    PullRequestNumber
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single invocation of the run-once workflow.
///
/// Generated fresh for every CLI invocation; recorded on the root tracing span
/// and in the run report so all activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (configuration / Git names)
// ---------------------------------------------------------------------------

string_id! {
    /// A Git branch name (e.g. `"main"`, `"issue-42-claude"`).
    BranchName
}

impl BranchName {
    /// The working branch for an issue: `issue-<number>-claude`.
    pub fn for_issue(issue: IssueNumber) -> Self {
        Self(format!("issue-{issue}-claude"))
    }
}

string_id! {
    /// A file-system path relative to the repository root.
    ArtifactPath
}

impl ArtifactPath {
    /// The artifact location for an issue: `artifacts/issue-<number>/output.md`.
    pub fn for_issue(issue: IssueNumber) -> Self {
        Self(format!("artifacts/issue-{issue}/output.md"))
    }
}

string_id! {
    /// A GitHub label name (e.g. `"claude-code"`).
    LabelName
}

string_id! {
    /// A provider-specific model identifier (e.g. `"gpt-4o-mini"`).
    ModelName
}

impl ModelName {
    /// The pseudo-model reported by the stub provider.
    pub fn stub() -> Self {
        Self("stub".to_string())
    }
}

// ---------------------------------------------------------------------------

/// Identifies a GitHub repository by owner and name.
///
/// Parsed from the `"owner/repo"` slug GitHub Actions exposes as
/// `GITHUB_REPOSITORY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    /// Parses an `"owner/repo"` slug.
    ///
    /// Returns `None` unless the slug has exactly two non-empty segments.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Returns the repository owner (user or organisation).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------

/// A secret credential (provider API key or hosting token).
///
/// `Debug` never prints the value, so configuration structs holding one can be
/// logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a credential, returning `None` if it is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.trim().is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Exposes the raw credential for use in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_follow_issue_number() {
        let issue = IssueNumber::new(42);
        assert_eq!(BranchName::for_issue(issue).as_str(), "issue-42-claude");
        assert_eq!(
            ArtifactPath::for_issue(issue).as_str(),
            "artifacts/issue-42/output.md"
        );
    }

    #[test]
    fn repository_slug_requires_owner_and_name() {
        let repo = RepositoryId::parse("octo/widgets").unwrap();
        assert_eq!(repo.owner(), "octo");
        assert_eq!(repo.name(), "widgets");
        assert_eq!(repo.to_string(), "octo/widgets");

        assert!(RepositoryId::parse("octo").is_none());
        assert!(RepositoryId::parse("/widgets").is_none());
        assert!(RepositoryId::parse("octo/").is_none());
        assert!(RepositoryId::parse("octo/widgets/extra").is_none());
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert_eq!(key.expose(), "sk-secret");
        assert!(ApiKey::new("   ").is_none());
    }

    #[test]
    fn string_ids_reject_empty_values() {
        assert!(LabelName::new("").is_none());
        assert_eq!(LabelName::new("claude-code").unwrap().as_str(), "claude-code");
    }
}
