//! Fixed text templates: artifact header, commit message, pull request and
//! issue comments.
//!
//! Everything here is a pure function of its inputs. In particular nothing
//! embeds the current time, so re-running the stub provider on the same issue
//! produces a byte-identical artifact.

use crate::{
    ArtifactPath, BranchName, GeneratedContent, Issue, IssueNumber, ModelName, ProviderKind,
    PullRequestOutcome, RepositoryId,
};

/// Header and generated markdown as written to the artifact file.
pub fn artifact_document(
    issue: &Issue,
    provider: ProviderKind,
    model: &ModelName,
    content: &GeneratedContent,
) -> String {
    let mut document = String::new();
    document.push_str(&format!("# Issue #{}: {}\n\n", issue.number, title_or_untitled(issue)));
    document.push_str(&format!(
        "> Generated from issue #{} by provider `{provider}` (model `{model}`).\n\n",
        issue.number
    ));
    document.push_str(content.markdown().trim_end());
    document.push('\n');
    document
}

pub fn commit_message(issue: IssueNumber) -> String {
    format!("chore: add generated artifact for issue #{issue}")
}

pub fn pull_request_title(issue: &Issue) -> String {
    format!("Issue #{}: {}", issue.number, title_or_untitled(issue))
}

pub fn pull_request_body(
    issue: IssueNumber,
    artifact: &ArtifactPath,
    provider: ProviderKind,
    model: &ModelName,
) -> String {
    format!(
        "Automated artifact for #{issue}.\n\n\
         - Artifact: `{artifact}`\n\
         - Provider: `{provider}`\n\
         - Model: `{model}`\n"
    )
}

/// Browser URL for opening a pull request by hand.
pub fn compare_url(
    server_url: &str,
    repository: &RepositoryId,
    base: &BranchName,
    head: &BranchName,
) -> String {
    format!(
        "{}/{}/{}/compare/{base}...{head}?expand=1",
        server_url.trim_end_matches('/'),
        repository.owner(),
        repository.name()
    )
}

pub fn success_comment(
    artifact: &ArtifactPath,
    provider: ProviderKind,
    model: &ModelName,
    outcome: &PullRequestOutcome,
) -> String {
    let mut comment = format!(
        "Generated `{artifact}` with provider `{provider}` (model `{model}`).\n\n"
    );
    match outcome {
        PullRequestOutcome::Opened { pull_request, .. } => {
            comment.push_str(&format!("Pull request: {}\n", pull_request.url));
        }
        PullRequestOutcome::Fallback { compare_url, .. } => {
            comment.push_str(&format!(
                "The pull request could not be opened automatically. Open it manually: {compare_url}\n"
            ));
        }
    }
    comment
}

pub fn failure_comment(error: &str) -> String {
    format!("Generation failed: {error}\n")
}

fn title_or_untitled(issue: &Issue) -> &str {
    let title = issue.title.trim();
    if title.is_empty() {
        "(untitled)"
    } else {
        title
    }
}
