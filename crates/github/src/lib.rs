//! issuesmith GitHub infrastructure adapter.
//!
//! Implements the repository-facing traits defined in the [`pipeline`] crate:
//!
//! - [`GithubClient`]: `IssueTracker` and `PullRequestManager` over the
//!   GitHub REST API.
//! - [`LocalCheckout`]: `ArtifactStore` and `CodeRepository` on the local
//!   working tree, driving the `git` CLI.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Authentication
//! headers, endpoint paths and git command lines are handled here; the
//! [`pipeline`] crate never sees them.

pub mod checkout;
pub mod client;

pub use checkout::{parse_symref_head, LocalCheckout};
pub use client::GithubClient;
