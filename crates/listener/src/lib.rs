//! issuesmith trigger event source.
//!
//! GitHub Actions writes the webhook payload that triggered a workflow to the
//! file named by `GITHUB_EVENT_PATH`. [`EventFile`] reads that file and reduces
//! an `issues` payload to a [`pipeline::IssueEvent`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Payload shapes and deserialisation live here. The
//! [`pipeline`] crate sees only [`pipeline::IssueEvent`].

pub mod event;

pub use event::{parse_issue_event, EventError, EventFile};
