//! `IssueRunner` against in-memory adapters that record every call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use llm::StubGenerator;
use pipeline::{
    ArtifactError, ArtifactPath, ArtifactStore, BranchName, CodeRepository, ContentGenerator,
    GeneratedContent, GenerationError, GitError, GitIdentity, HostingError, Issue, IssueEvent,
    IssueNumber, IssueTracker, LabelName, ModelName, ProviderKind, PullRequest,
    PullRequestManager, PullRequestNumber, PullRequestOutcome, PullRequestRequest, RepositoryId,
    RunId, RunPhase, TokenCount, TokenUsage,
};
use runner::{IssueRunner, Ports, RunOutcome, RunnerSettings};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Ordered record of adapter calls shared by all fakes in one test.
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.entries().iter().any(|e| e.starts_with(prefix))
    }
}

struct ScriptedGenerator {
    journal: Journal,
    model: ModelName,
    reply: Result<GeneratedContent, GenerationError>,
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &ModelName {
        &self.model
    }

    async fn generate(&self, issue: &Issue) -> Result<GeneratedContent, GenerationError> {
        self.journal.push(format!("generate #{}", issue.number));
        self.reply.clone()
    }
}

/// Wraps the stub provider so its calls land in the journal too.
struct JournaledStub {
    journal: Journal,
    inner: StubGenerator,
}

#[async_trait]
impl ContentGenerator for JournaledStub {
    fn provider(&self) -> ProviderKind {
        self.inner.provider()
    }

    fn model(&self) -> &ModelName {
        self.inner.model()
    }

    async fn generate(&self, issue: &Issue) -> Result<GeneratedContent, GenerationError> {
        self.journal.push(format!("generate #{}", issue.number));
        self.inner.generate(issue).await
    }
}

#[derive(Default)]
struct MemoryArtifacts {
    journal: Journal,
    files: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ArtifactStore for MemoryArtifacts {
    async fn write(&self, path: &ArtifactPath, contents: &str) -> Result<(), ArtifactError> {
        self.journal.push(format!("write {path}"));
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }
}

struct FakeRepository {
    journal: Journal,
    fail_step: Option<&'static str>,
    default_branch: Option<&'static str>,
}

impl FakeRepository {
    fn step(&self, step: &'static str, detail: String) -> Result<(), GitError> {
        self.journal.push(format!("git {step} {detail}").trim_end().to_string());
        if self.fail_step == Some(step) {
            return Err(GitError {
                step: step.to_string(),
                message: "remote rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CodeRepository for FakeRepository {
    async fn ensure_identity(&self, fallback: &GitIdentity) -> Result<(), GitError> {
        self.step("identity", fallback.name.clone())
    }

    async fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.step("checkout", branch.to_string())
    }

    async fn stage(&self, path: &ArtifactPath) -> Result<(), GitError> {
        self.step("add", path.to_string())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.step("commit", message.to_string())
    }

    async fn remote_default_branch(&self) -> Result<BranchName, GitError> {
        self.step("ls-remote", String::new())?;
        self.default_branch
            .and_then(BranchName::new)
            .ok_or_else(|| GitError {
                step: "ls-remote".to_string(),
                message: "no HEAD".to_string(),
            })
    }

    async fn push(&self, branch: &BranchName) -> Result<(), GitError> {
        self.step("push", branch.to_string())
    }
}

struct FakeHosting {
    journal: Journal,
    pull_request_fails: bool,
    comment_fails: bool,
    comments: Mutex<Vec<String>>,
    requests: Mutex<Vec<PullRequestRequest>>,
}

#[async_trait]
impl PullRequestManager for FakeHosting {
    async fn open_pull_request(
        &self,
        request: &PullRequestRequest,
    ) -> Result<PullRequest, HostingError> {
        self.journal
            .push(format!("pr {}->{}", request.head, request.base));
        self.requests.lock().unwrap().push(request.clone());
        if self.pull_request_fails {
            return Err(HostingError::Http {
                status: 403,
                body: "Resource not accessible by integration".to_string(),
            });
        }
        Ok(PullRequest {
            number: PullRequestNumber::new(17),
            url: "https://github.com/octo/widgets/pull/17".to_string(),
        })
    }
}

#[async_trait]
impl IssueTracker for FakeHosting {
    async fn post_comment(
        &self,
        _repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), HostingError> {
        self.journal.push(format!("comment #{issue}"));
        self.comments.lock().unwrap().push(body.to_string());
        if self.comment_fails {
            return Err(HostingError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    journal: Journal,
    artifacts: Arc<MemoryArtifacts>,
    hosting: Arc<FakeHosting>,
    generator: Arc<dyn ContentGenerator>,
    repository: Arc<FakeRepository>,
}

impl Harness {
    fn new() -> Self {
        let journal = Journal::default();
        Self {
            artifacts: Arc::new(MemoryArtifacts {
                journal: journal.clone(),
                files: Mutex::default(),
            }),
            hosting: Arc::new(FakeHosting {
                journal: journal.clone(),
                pull_request_fails: false,
                comment_fails: false,
                comments: Mutex::default(),
                requests: Mutex::default(),
            }),
            generator: Arc::new(JournaledStub {
                journal: journal.clone(),
                inner: StubGenerator::new(),
            }),
            repository: Arc::new(FakeRepository {
                journal: journal.clone(),
                fail_step: None,
                default_branch: Some("trunk"),
            }),
            journal,
        }
    }

    fn with_generator_reply(mut self, reply: Result<GeneratedContent, GenerationError>) -> Self {
        self.generator = Arc::new(ScriptedGenerator {
            journal: self.journal.clone(),
            model: ModelName::new("claude-3-5-sonnet-latest").unwrap(),
            reply,
        });
        self
    }

    fn with_repository(
        mut self,
        fail_step: Option<&'static str>,
        default_branch: Option<&'static str>,
    ) -> Self {
        self.repository = Arc::new(FakeRepository {
            journal: self.journal.clone(),
            fail_step,
            default_branch,
        });
        self
    }

    fn with_hosting(mut self, pull_request_fails: bool, comment_fails: bool) -> Self {
        self.hosting = Arc::new(FakeHosting {
            journal: self.journal.clone(),
            pull_request_fails,
            comment_fails,
            comments: Mutex::default(),
            requests: Mutex::default(),
        });
        self
    }

    fn runner(&self) -> IssueRunner {
        IssueRunner::new(
            RunId::new_random(),
            RunnerSettings {
                repository: RepositoryId::parse("octo/widgets").unwrap(),
                trigger_label: LabelName::new("claude-code").unwrap(),
                fallback_base_branch: BranchName::new("main").unwrap(),
                server_url: "https://github.com".to_string(),
                committer: GitIdentity::actions_bot(),
            },
            Ports {
                generator: self.generator.clone(),
                artifacts: self.artifacts.clone(),
                repository: self.repository.clone(),
                issues: self.hosting.clone(),
                pulls: self.hosting.clone(),
            },
        )
    }

    fn artifact(&self, issue: u64) -> Option<String> {
        self.artifacts
            .files
            .lock()
            .unwrap()
            .get(&format!("artifacts/issue-{issue}/output.md"))
            .cloned()
    }

    fn comments(&self) -> Vec<String> {
        self.hosting.comments.lock().unwrap().clone()
    }
}

fn labeled_event(number: u64, body: &str) -> IssueEvent {
    IssueEvent {
        action: Some("labeled".to_string()),
        issue: Issue {
            number: IssueNumber::new(number),
            title: "Widget".to_string(),
            body: body.to_string(),
            labels: vec![LabelName::new("claude-code").unwrap()],
        },
        applied_label: LabelName::new("claude-code"),
    }
}

fn completed(outcome: RunOutcome) -> pipeline::RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        other => panic!("expected a completed run, got {other:?}"),
    }
}

fn failed(outcome: RunOutcome) -> pipeline::RunReport {
    match outcome {
        RunOutcome::Failed(report) => report,
        other => panic!("expected a failed run, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stub_run_publishes_artifact_and_links_pull_request() {
    let harness = Harness::new();
    let event = labeled_event(42, "Build a widget.\nMust support resize.");

    let runner = harness.runner();
    let outcome = runner.run(&event).await;
    assert_eq!(outcome.exit_code(), 0);
    let report = completed(outcome);
    assert_eq!(report.run_id, runner.run_id());

    let artifact = harness.artifact(42).unwrap();
    assert!(artifact.starts_with("# Issue #42: Widget\n"));
    assert!(artifact.contains("provider `stub`"));
    assert!(artifact.contains("- Build a widget.\n- Must support resize.\n"));

    assert_eq!(
        harness.journal.entries(),
        vec![
            "generate #42",
            "write artifacts/issue-42/output.md",
            "git identity github-actions[bot]",
            "git checkout issue-42-claude",
            "git add artifacts/issue-42/output.md",
            "git commit chore: add generated artifact for issue #42",
            "git ls-remote",
            "git push issue-42-claude",
            "pr issue-42-claude->trunk",
            "comment #42",
        ]
    );

    let comments = harness.comments();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].contains("https://github.com/octo/widgets/pull/17"));

    assert_eq!(report.branch.as_str(), "issue-42-claude");
    assert_eq!(report.base_branch.unwrap().as_str(), "trunk");
    assert_eq!(report.provider, ProviderKind::Stub);
    assert_eq!(report.last_phase, RunPhase::Done);
    assert!(report.error.is_none());
    assert!(report.usage.is_none());
}

#[tokio::test]
async fn stub_artifact_is_identical_across_reruns() {
    let harness = Harness::new();
    let event = labeled_event(42, "Build a widget.\nMust support resize.");

    harness.runner().run(&event).await;
    let first = harness.artifact(42).unwrap();
    harness.runner().run(&event).await;
    let second = harness.artifact(42).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn pull_request_names_issue_and_provider() {
    let harness = Harness::new();
    harness
        .runner()
        .run(&labeled_event(42, "Build a widget."))
        .await;

    let requests = harness.hosting.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "Issue #42: Widget");
    assert!(requests[0].body.contains("Automated artifact for #42."));
    assert!(requests[0].body.contains("artifacts/issue-42/output.md"));
    assert!(requests[0].body.contains("`stub`"));
}

#[tokio::test]
async fn missing_label_skips_without_side_effects() {
    let harness = Harness::new();
    let mut event = labeled_event(42, "Build a widget.");
    event.issue.labels = vec![LabelName::new("bug").unwrap()];
    event.applied_label = LabelName::new("bug");

    let outcome = harness.runner().run(&event).await;

    assert!(matches!(outcome, RunOutcome::Skipped { .. }));
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.report().is_none());
    assert!(harness.journal.entries().is_empty());
}

#[tokio::test]
async fn empty_body_fails_before_generation() {
    let harness = Harness::new();

    let outcome = harness.runner().run(&labeled_event(7, "  \n\t")).await;
    assert_eq!(outcome.exit_code(), 1);
    let report = failed(outcome);

    assert_eq!(report.last_phase, RunPhase::Validating);
    assert_eq!(report.error.as_deref(), Some("issue body is empty"));
    assert_eq!(harness.journal.entries(), vec!["comment #7"]);
    assert_eq!(harness.comments(), vec!["Generation failed: issue body is empty\n"]);
    assert!(harness.artifact(7).is_none());
}

#[tokio::test]
async fn empty_provider_content_fails_without_publishing() {
    let harness = Harness::new().with_generator_reply(Err(GenerationError::EmptyContent {
        provider: ProviderKind::Anthropic,
    }));

    let report = failed(harness.runner().run(&labeled_event(8, "Describe it.")).await);

    assert_eq!(report.last_phase, RunPhase::Generating);
    assert!(!harness.journal.contains_prefix("write"));
    assert!(!harness.journal.contains_prefix("git"));
    let comments = harness.comments();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].starts_with("Generation failed: "));
    assert!(comments[0].contains("empty content"));
}

#[tokio::test]
async fn exhausted_provider_retries_surface_in_failure_comment() {
    let harness = Harness::new().with_generator_reply(Err(GenerationError::Http {
        provider: ProviderKind::Anthropic,
        status: 503,
        body: "overloaded".to_string(),
    }));

    let report = failed(harness.runner().run(&labeled_event(9, "Describe it.")).await);

    assert!(report.error.as_deref().unwrap().contains("503"));
    assert!(harness.comments()[0].contains("503"));
}

#[tokio::test]
async fn provider_usage_is_recorded() {
    let usage = TokenUsage {
        input: TokenCount::new(120),
        output: TokenCount::new(48),
    };
    let content = GeneratedContent::new("## Plan\n\nShip it.", Some(usage)).unwrap();
    let harness = Harness::new().with_generator_reply(Ok(content));

    let report = completed(harness.runner().run(&labeled_event(10, "Plan it.")).await);

    assert_eq!(report.usage, Some(usage));
    assert_eq!(report.provider, ProviderKind::Anthropic);
    assert!(harness.artifact(10).unwrap().ends_with("## Plan\n\nShip it.\n"));
}

#[tokio::test]
async fn push_failure_aborts_before_pull_request() {
    let harness = Harness::new().with_repository(Some("push"), Some("trunk"));

    let report = failed(harness.runner().run(&labeled_event(11, "Build it.")).await);

    assert_eq!(report.last_phase, RunPhase::Publishing);
    assert!(report.error.as_deref().unwrap().contains("git push failed"));
    assert!(!harness.journal.contains_prefix("pr "));
    assert!(harness.comments()[0].contains("git push failed: remote rejected"));
}

#[tokio::test]
async fn commit_failure_skips_push() {
    let harness = Harness::new().with_repository(Some("commit"), Some("trunk"));

    failed(harness.runner().run(&labeled_event(12, "Build it.")).await);

    assert!(!harness.journal.contains_prefix("git push"));
    assert!(!harness.journal.contains_prefix("git ls-remote"));
}

#[tokio::test]
async fn unresolved_default_branch_falls_back_to_main() {
    let harness = Harness::new().with_repository(None, None);

    let report = completed(harness.runner().run(&labeled_event(13, "Build it.")).await);

    assert_eq!(report.base_branch.unwrap().as_str(), "main");
    assert!(harness.journal.contains_prefix("pr issue-13-claude->main"));
}

#[tokio::test]
async fn rejected_pull_request_falls_back_to_compare_link() {
    let harness = Harness::new().with_hosting(true, false);

    let outcome = harness.runner().run(&labeled_event(14, "Build it.")).await;
    assert_eq!(outcome.exit_code(), 0);
    let report = completed(outcome);

    let expected = "https://github.com/octo/widgets/compare/trunk...issue-14-claude?expand=1";
    match report.pull_request.unwrap() {
        PullRequestOutcome::Fallback { compare_url, reason } => {
            assert_eq!(compare_url, expected);
            assert!(reason.contains("403"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
    assert!(harness.comments()[0].contains(expected));
}

#[tokio::test]
async fn comment_failure_does_not_change_outcome() {
    let harness = Harness::new().with_hosting(false, true);

    let outcome = harness.runner().run(&labeled_event(15, "Build it.")).await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(harness.comments().len(), 1);
}

#[tokio::test]
async fn failure_comment_failure_still_reports_failed() {
    let harness = Harness::new().with_hosting(false, true);

    let outcome = harness.runner().run(&labeled_event(16, "")).await;

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(harness.comments().len(), 1);
}
