//! The local git checkout: artifact file writes and git CLI plumbing.
//!
//! Every git operation shells out to the `git` binary in the checkout root.
//! The process is assumed to own the checkout for the whole run; nothing here
//! locks it.

use std::path::PathBuf;

use async_trait::async_trait;
use pipeline::{
    ArtifactError, ArtifactPath, ArtifactStore, BranchName, CodeRepository, GitError, GitIdentity,
};
use tokio::process::Command;
use tracing::{debug, info, instrument};

pub const DEFAULT_REMOTE: &str = "origin";

/// A git working tree on local disk.
#[derive(Debug, Clone)]
pub struct LocalCheckout {
    root: PathBuf,
    remote: String,
    envs: Vec<(String, String)>,
}

impl LocalCheckout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            remote: DEFAULT_REMOTE.to_string(),
            envs: Vec::new(),
        }
    }

    /// Uses `remote` instead of `origin`.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Adds an environment variable to every git invocation.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Runs `git <args>` in the checkout and returns trimmed stdout.
    async fn git(&self, step: &str, args: &[&str]) -> Result<String, GitError> {
        debug!(step, ?args, "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .await
            .map_err(|e| GitError {
                step: step.to_string(),
                message: format!("failed to run git: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError {
                step: step.to_string(),
                message: if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Reads a config value; any failure (missing key, missing git) is `None`.
    async fn config_value(&self, key: &str) -> Option<String> {
        self.git("config", &["config", "--get", key])
            .await
            .ok()
            .filter(|value| !value.is_empty())
    }
}

#[async_trait]
impl ArtifactStore for LocalCheckout {
    async fn write(&self, path: &ArtifactPath, contents: &str) -> Result<(), ArtifactError> {
        let target = self.root.join(path.as_str());
        let to_error = |e: std::io::Error| ArtifactError {
            path: path.to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
        }
        tokio::fs::write(&target, contents).await.map_err(to_error)?;
        info!(path = %path, bytes = contents.len(), "Artifact written");
        Ok(())
    }
}

#[async_trait]
impl CodeRepository for LocalCheckout {
    async fn ensure_identity(&self, fallback: &GitIdentity) -> Result<(), GitError> {
        for (key, value) in [("user.name", &fallback.name), ("user.email", &fallback.email)] {
            if self.config_value(key).await.is_none() {
                info!(key, value = %value, "No committer identity configured; using default");
                self.git("config", &["config", key, value.as_str()]).await?;
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(branch = %branch))]
    async fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.git("checkout", &["checkout", "-B", branch.as_str()])
            .await
            .map(|_| ())
    }

    async fn stage(&self, path: &ArtifactPath) -> Result<(), GitError> {
        self.git("add", &["add", "--force", "--", path.as_str()])
            .await
            .map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.git("commit", &["commit", "-m", message]).await.map(|_| ())
    }

    async fn remote_default_branch(&self) -> Result<BranchName, GitError> {
        let output = self
            .git("ls-remote", &["ls-remote", "--symref", self.remote.as_str(), "HEAD"])
            .await?;
        parse_symref_head(&output).ok_or_else(|| GitError {
            step: "ls-remote".to_string(),
            message: format!("remote '{}' did not report a HEAD branch", self.remote),
        })
    }

    #[instrument(skip_all, fields(branch = %branch, remote = %self.remote))]
    async fn push(&self, branch: &BranchName) -> Result<(), GitError> {
        self.git(
            "push",
            &["push", "--force", "--set-upstream", self.remote.as_str(), branch.as_str()],
        )
        .await
        .map(|_| ())
    }
}

/// Extracts the branch from `git ls-remote --symref <remote> HEAD` output,
/// whose first line reads `ref: refs/heads/<branch>\tHEAD`.
pub fn parse_symref_head(output: &str) -> Option<BranchName> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("ref: "))
        .filter_map(|line| line.strip_suffix("HEAD"))
        .filter_map(|target| target.trim_end().strip_prefix("refs/heads/"))
        .find_map(BranchName::new)
}
