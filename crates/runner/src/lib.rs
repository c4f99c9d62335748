//! issuesmith run-once workflow.
//!
//! [`IssueRunner`] takes one issue event through validation, generation,
//! artifact writing, git publishing and notification, and reports how the run
//! ended as a [`RunOutcome`].
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The runner sequences calls between the templates in
//! [`pipeline::render`] and the port traits in [`pipeline::ports`]. It holds no
//! I/O of its own; every side effect goes through an injected adapter.

pub mod workflow;

pub use workflow::{IssueRunner, Ports, RunOutcome, RunnerSettings};
