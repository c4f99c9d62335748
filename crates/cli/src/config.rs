//! Command line and environment configuration.
//!
//! Every setting can be given as a flag or through the environment variable
//! GitHub Actions (or the workflow file) provides. [`Cli`] is the raw parse;
//! [`RunConfig`] is the validated form handed to the rest of the program.

use std::path::PathBuf;

use clap::Parser;
use llm::{AnthropicConfig, OpenAiConfig};
use pipeline::{
    ApiKey, BranchName, GitIdentity, LabelName, ModelName, ProviderKind, RepositoryId, RunError,
    TokenCount,
};
use runner::RunnerSettings;

use crate::telemetry::LogFormat;

pub const DEFAULT_TRIGGER_LABEL: &str = "claude-code";
pub const DEFAULT_FALLBACK_BASE_BRANCH: &str = "main";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

#[derive(Debug, Clone, Parser)]
#[command(name = "issuesmith")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate an artifact from a labelled GitHub issue and open a pull request", long_about = None)]
pub struct Cli {
    /// Repository slug (`owner/name`)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Path to the `issues` event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Token for the GitHub REST API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Content provider: stub, anthropic or openai
    #[arg(long, env = "PROVIDER", default_value = "stub")]
    pub provider: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_MODEL", default_value = llm::anthropic::DEFAULT_MODEL)]
    pub anthropic_model: String,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = llm::anthropic::DEFAULT_BASE_URL)]
    pub anthropic_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = llm::openai::DEFAULT_MODEL)]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = llm::openai::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Upper bound on generated tokens per provider call
    #[arg(long, env = "MAX_OUTPUT_TOKENS", default_value_t = 4096)]
    pub max_output_tokens: u64,

    /// Extra attempts for provider calls answered with 429 or 5xx
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    /// Label an issue must carry for the run to proceed
    #[arg(long, env = "TRIGGER_LABEL", default_value = DEFAULT_TRIGGER_LABEL)]
    pub trigger_label: String,

    /// Pull request base when the remote default branch cannot be resolved
    #[arg(long, env = "FALLBACK_BASE_BRANCH", default_value = DEFAULT_FALLBACK_BASE_BRANCH)]
    pub fallback_base_branch: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = github::client::DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Web host used for manual compare links
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub github_server_url: String,

    /// Root of the git checkout
    #[arg(long, env = "ISSUESMITH_WORKDIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Write the JSON run report here
    #[arg(long, env = "ISSUESMITH_REPORT")]
    pub report_path: Option<PathBuf>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; spans are exported only when set
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub repository: RepositoryId,
    pub event_path: PathBuf,
    pub github_token: ApiKey,
    pub provider: ProviderKind,
    pub anthropic: AnthropicConfig,
    pub openai: OpenAiConfig,
    pub max_retries: u32,
    pub trigger_label: LabelName,
    pub fallback_base_branch: BranchName,
    pub github_api_url: String,
    pub github_server_url: String,
    pub workdir: PathBuf,
    pub report_path: Option<PathBuf>,
}

impl RunConfig {
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            repository: self.repository.clone(),
            trigger_label: self.trigger_label.clone(),
            fallback_base_branch: self.fallback_base_branch.clone(),
            server_url: self.github_server_url.clone(),
            committer: GitIdentity::actions_bot(),
        }
    }

    /// Model recorded for the selected provider.
    pub fn model(&self) -> ModelName {
        match self.provider {
            ProviderKind::Stub => ModelName::stub(),
            ProviderKind::Anthropic => self.anthropic.model.clone(),
            ProviderKind::Openai => self.openai.model.clone(),
        }
    }
}

fn configuration(message: impl Into<String>) -> RunError {
    RunError::Configuration {
        message: message.into(),
    }
}

/// Trims and drops blank values; CI systems often export unset secrets as "".
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &str) -> Result<String, RunError> {
    present(value).ok_or_else(|| configuration(format!("{name} is required")))
}

fn non_empty<T>(value: Option<T>, what: &str) -> Result<T, RunError> {
    value.ok_or_else(|| configuration(format!("{what} must not be empty")))
}

impl TryFrom<Cli> for RunConfig {
    type Error = RunError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let slug = required(cli.repository, "GITHUB_REPOSITORY")?;
        let repository = RepositoryId::parse(&slug).ok_or_else(|| {
            configuration(format!("GITHUB_REPOSITORY must be 'owner/name', got '{slug}'"))
        })?;

        let event_path = cli
            .event_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| configuration("GITHUB_EVENT_PATH is required"))?;

        let github_token = ApiKey::new(required(cli.github_token, "GITHUB_TOKEN")?)
            .ok_or_else(|| configuration("GITHUB_TOKEN is required"))?;

        let provider = match present(Some(cli.provider)) {
            None => ProviderKind::Stub,
            Some(raw) => raw.parse::<ProviderKind>().map_err(configuration)?,
        };

        let max_tokens = TokenCount::new(cli.max_output_tokens);
        if max_tokens.is_zero() {
            return Err(configuration("MAX_OUTPUT_TOKENS must be greater than zero"));
        }

        let anthropic = AnthropicConfig {
            api_key: present(cli.anthropic_api_key).and_then(ApiKey::new),
            model: non_empty(ModelName::new(cli.anthropic_model.trim()), "ANTHROPIC_MODEL")?,
            base_url: cli.anthropic_base_url,
            max_tokens,
        };
        let openai = OpenAiConfig {
            api_key: present(cli.openai_api_key).and_then(ApiKey::new),
            model: non_empty(ModelName::new(cli.openai_model.trim()), "OPENAI_MODEL")?,
            base_url: cli.openai_base_url,
            max_tokens,
        };

        Ok(Self {
            repository,
            event_path,
            github_token,
            provider,
            anthropic,
            openai,
            max_retries: cli.max_retries,
            trigger_label: non_empty(LabelName::new(cli.trigger_label.trim()), "TRIGGER_LABEL")?,
            fallback_base_branch: non_empty(
                BranchName::new(cli.fallback_base_branch.trim()),
                "FALLBACK_BASE_BRANCH",
            )?,
            github_api_url: cli.github_api_url,
            github_server_url: cli.github_server_url,
            workdir: cli.workdir,
            report_path: cli.report_path,
        })
    }
}
