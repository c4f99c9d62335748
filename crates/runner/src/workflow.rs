//! The run-once issue workflow.
//!
//! ```text
//! Idle → Validating → Generating → Writing → Publishing → Notifying → Done
//! ```
//!
//! Any error before `Notifying` moves the run to `Failed`, then
//! `NotifyFailure` (one failure comment), then `Done`. There is no retry at
//! this level; only provider HTTP calls retry.

use std::sync::Arc;

use pipeline::{
    render, ArtifactPath, ArtifactStore, BranchName, CodeRepository, ContentGenerator, GitIdentity,
    Issue, IssueEvent, IssueTracker, LabelName, PhaseError, PullRequestManager,
    PullRequestOutcome, PullRequestRequest, RepositoryId, RunError, RunId, RunPhase, RunReport,
    Timestamp, TokenUsage,
};
use tracing::{error, info, info_span, warn, Instrument};

/// Run parameters that do not belong to any single adapter.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub repository: RepositoryId,
    /// Issues without this label are skipped.
    pub trigger_label: LabelName,
    /// Pull request target when the remote's default branch cannot be resolved.
    pub fallback_base_branch: BranchName,
    /// Web host used for the manual compare link (e.g. `https://github.com`).
    pub server_url: String,
    /// Identity applied when the checkout has none.
    pub committer: GitIdentity,
}

/// The adapters a run drives.
#[derive(Clone)]
pub struct Ports {
    pub generator: Arc<dyn ContentGenerator>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub repository: Arc<dyn CodeRepository>,
    pub issues: Arc<dyn IssueTracker>,
    pub pulls: Arc<dyn PullRequestManager>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The trigger label was absent; nothing was done.
    Skipped { reason: String },
    /// Artifact published and success comment attempted.
    Completed(RunReport),
    /// A fatal error occurred; failure comment attempted.
    Failed(RunReport),
}

impl RunOutcome {
    /// Process exit code: 1 for a failed run, 0 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Failed(_) => 1,
            RunOutcome::Skipped { .. } | RunOutcome::Completed(_) => 0,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) | RunOutcome::Failed(report) => Some(report),
            RunOutcome::Skipped { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------

/// Mutable bookkeeping for one run.
#[derive(Debug)]
struct RunState {
    phase: RunPhase,
    usage: Option<TokenUsage>,
    base_branch: Option<BranchName>,
    pull_request: Option<PullRequestOutcome>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            usage: None,
            base_branch: None,
            pull_request: None,
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        info!(from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
    }

    fn fail(&self, error: impl Into<RunError>) -> PhaseError {
        PhaseError {
            phase: self.phase,
            error: error.into(),
        }
    }
}

/// Drives one issue event through generation, publishing and notification.
pub struct IssueRunner {
    run_id: RunId,
    settings: RunnerSettings,
    ports: Ports,
}

impl IssueRunner {
    pub fn new(run_id: RunId, settings: RunnerSettings, ports: Ports) -> Self {
        Self {
            run_id,
            settings,
            ports,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Runs the workflow once for `event`. Never panics on adapter failure;
    /// every fatal error is folded into [`RunOutcome::Failed`].
    pub async fn run(&self, event: &IssueEvent) -> RunOutcome {
        let span = info_span!(
            "run",
            run_id = %self.run_id,
            issue = %event.issue.number,
            provider = %self.ports.generator.provider(),
        );
        self.run_inner(event).instrument(span).await
    }

    async fn run_inner(&self, event: &IssueEvent) -> RunOutcome {
        let started_at = Timestamp::now();
        let issue = &event.issue;
        let mut state = RunState::new();

        state.enter(RunPhase::Validating);
        if !event.carries_label(&self.settings.trigger_label) {
            let reason = format!(
                "issue #{} does not carry the '{}' label",
                issue.number, self.settings.trigger_label
            );
            info!(%reason, "Skipping run");
            return RunOutcome::Skipped { reason };
        }

        match self.execute(issue, &mut state).await {
            Ok(()) => {
                if let Some(outcome) = &state.pull_request {
                    let comment = render::success_comment(
                        &ArtifactPath::for_issue(issue.number),
                        self.ports.generator.provider(),
                        self.ports.generator.model(),
                        outcome,
                    );
                    self.post_comment(issue, &comment).await;
                }
                state.enter(RunPhase::Done);
                let report = self.report(issue, &state, RunPhase::Done, None, started_at);
                info!(link = report.pull_request.as_ref().map(|o| o.link()), "Run completed");
                RunOutcome::Completed(report)
            }
            Err(failure) => {
                error!(phase = %failure.phase, error = %failure.error, "Run failed");
                state.enter(RunPhase::Failed);
                state.enter(RunPhase::NotifyFailure);
                self.post_comment(issue, &render::failure_comment(&failure.error.to_string()))
                    .await;
                state.enter(RunPhase::Done);
                let report = self.report(
                    issue,
                    &state,
                    failure.phase,
                    Some(failure.error.to_string()),
                    started_at,
                );
                RunOutcome::Failed(report)
            }
        }
    }

    /// Everything between validation and the final comment.
    async fn execute(&self, issue: &Issue, state: &mut RunState) -> Result<(), PhaseError> {
        if issue.has_empty_body() {
            return Err(state.fail(RunError::EmptyIssueBody));
        }

        state.enter(RunPhase::Generating);
        let generator = &self.ports.generator;
        let content = generator
            .generate(issue)
            .await
            .map_err(|e| state.fail(e))?;
        state.usage = content.usage();

        state.enter(RunPhase::Writing);
        let artifact = ArtifactPath::for_issue(issue.number);
        let document =
            render::artifact_document(issue, generator.provider(), generator.model(), &content);
        self.ports
            .artifacts
            .write(&artifact, &document)
            .await
            .map_err(|e| state.fail(e))?;

        state.enter(RunPhase::Publishing);
        let branch = BranchName::for_issue(issue.number);
        let base = self
            .publish(issue, &artifact, &branch)
            .await
            .map_err(|e| state.fail(e))?;
        state.base_branch = Some(base.clone());

        state.enter(RunPhase::Notifying);
        state.pull_request = Some(self.open_pull_request(issue, &artifact, &branch, &base).await);
        Ok(())
    }

    /// Commits the artifact on the issue branch and pushes it. Returns the
    /// base branch for the pull request.
    async fn publish(
        &self,
        issue: &Issue,
        artifact: &ArtifactPath,
        branch: &BranchName,
    ) -> Result<BranchName, RunError> {
        let repo = &self.ports.repository;
        repo.ensure_identity(&self.settings.committer).await?;
        repo.checkout_branch(branch).await?;
        repo.stage(artifact).await?;
        repo.commit(&render::commit_message(issue.number)).await?;

        let base = match repo.remote_default_branch().await {
            Ok(base) => base,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %self.settings.fallback_base_branch,
                    "Could not resolve remote default branch; using fallback"
                );
                self.settings.fallback_base_branch.clone()
            }
        };

        repo.push(branch).await?;
        info!(%branch, %base, "Branch pushed");
        Ok(base)
    }

    /// Best-effort: failure degrades to a manual compare link.
    async fn open_pull_request(
        &self,
        issue: &Issue,
        artifact: &ArtifactPath,
        branch: &BranchName,
        base: &BranchName,
    ) -> PullRequestOutcome {
        let generator = &self.ports.generator;
        let compare_url =
            render::compare_url(&self.settings.server_url, &self.settings.repository, base, branch);
        let request = PullRequestRequest {
            repository: self.settings.repository.clone(),
            head: branch.clone(),
            base: base.clone(),
            title: render::pull_request_title(issue),
            body: render::pull_request_body(
                issue.number,
                artifact,
                generator.provider(),
                generator.model(),
            ),
        };

        match self.ports.pulls.open_pull_request(&request).await {
            Ok(pull_request) => {
                info!(number = %pull_request.number, url = %pull_request.url, "Pull request opened");
                PullRequestOutcome::Opened {
                    pull_request,
                    compare_url,
                }
            }
            Err(e) => {
                warn!(error = %e, %compare_url, "Pull request creation failed; using compare link");
                PullRequestOutcome::Fallback {
                    compare_url,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Comment failures are logged and otherwise ignored.
    async fn post_comment(&self, issue: &Issue, body: &str) {
        if let Err(e) = self
            .ports
            .issues
            .post_comment(&self.settings.repository, issue.number, body)
            .await
        {
            error!(error = %e, "Failed to post issue comment");
        }
    }

    fn report(
        &self,
        issue: &Issue,
        state: &RunState,
        last_phase: RunPhase,
        error: Option<String>,
        started_at: Timestamp,
    ) -> RunReport {
        RunReport {
            run_id: self.run_id,
            issue: issue.number,
            provider: self.ports.generator.provider(),
            model: self.ports.generator.model().clone(),
            artifact: ArtifactPath::for_issue(issue.number),
            branch: BranchName::for_issue(issue.number),
            base_branch: state.base_branch.clone(),
            pull_request: state.pull_request.clone(),
            usage: state.usage,
            last_phase,
            error,
            started_at,
            finished_at: Timestamp::now(),
        }
    }
}
