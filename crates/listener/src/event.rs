//! GitHub `issues` event payloads.

use std::path::PathBuf;

use pipeline::{Issue, IssueEvent, IssueNumber, LabelName};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Failures reading the event file.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to read event file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("event payload is not an issues event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The event-description file written by the workflow runner.
#[derive(Debug, Clone)]
pub struct EventFile {
    path: PathBuf,
}

impl EventFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads and parses the payload.
    pub async fn load(&self) -> Result<IssueEvent, EventError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| EventError::Read {
                path: self.path.clone(),
                source,
            })?;
        let event = parse_issue_event(&raw)?;
        debug!(
            issue = %event.issue.number,
            action = event.action.as_deref().unwrap_or("-"),
            labels = event.issue.labels.len(),
            "Loaded issue event"
        );
        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// Payload shape (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IssuesPayload {
    #[serde(default)]
    action: Option<String>,
    issue: IssuePayload,
    #[serde(default)]
    label: Option<LabelPayload>,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<LabelPayload>,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

/// Parses an `issues` webhook payload. A `null` body becomes the empty string.
pub fn parse_issue_event(raw: &str) -> Result<IssueEvent, EventError> {
    let payload: IssuesPayload = serde_json::from_str(raw)?;
    Ok(IssueEvent {
        action: payload.action,
        issue: Issue {
            number: IssueNumber::new(payload.issue.number),
            title: payload.issue.title.unwrap_or_default(),
            body: payload.issue.body.unwrap_or_default(),
            labels: payload
                .issue
                .labels
                .into_iter()
                .filter_map(|label| LabelName::new(label.name))
                .collect(),
        },
        applied_label: payload.label.and_then(|label| LabelName::new(label.name)),
    })
}
