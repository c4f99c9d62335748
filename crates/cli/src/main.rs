//! issuesmith CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks, validated into
//!    a [`config::RunConfig`].
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or text layer,
//!    plus an OpenTelemetry OTLP exporter when an endpoint is configured.
//! 3. **Construct infrastructure**: the selected content generator, the local
//!    checkout and the GitHub client, injected into a [`runner::IssueRunner`].
//! 4. **Run once** for the event in `GITHUB_EVENT_PATH` and map the outcome to
//!    the process exit code.

mod config;
mod telemetry;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use github::{GithubClient, LocalCheckout};
use listener::EventFile;
use llm::{AnthropicGenerator, BackoffPolicy, OpenAiGenerator, RetryingClient, StubGenerator};
use pipeline::{ContentGenerator, ProviderKind, RunId, RunReport};
use runner::{IssueRunner, Ports};
use tracing::{error, info};

use crate::config::{Cli, RunConfig};

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        Err(e) => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    let telemetry = match telemetry::init(cli.log_format, cli.otlp_endpoint.as_deref()) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("issuesmith: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Startup failed");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = RunConfig::try_from(cli)?;
    let event = EventFile::new(&config.event_path)
        .load()
        .await
        .context("failed to load issue event")?;

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let checkout = Arc::new(LocalCheckout::new(&config.workdir));
    let github = Arc::new(GithubClient::new(
        http.clone(),
        config.github_api_url.clone(),
        config.github_token.clone(),
    ));
    let ports = Ports {
        generator: build_generator(&config, http),
        artifacts: checkout.clone(),
        repository: checkout,
        issues: github.clone(),
        pulls: github,
    };

    let runner = IssueRunner::new(RunId::new_random(), config.runner_settings(), ports);
    info!(
        run_id = %runner.run_id(),
        repository = %config.repository,
        issue = %event.issue.number,
        provider = %config.provider,
        model = %config.model(),
        "Starting run"
    );

    let outcome = runner.run(&event).await;

    if let Some(report) = outcome.report() {
        info!(
            report = %serde_json::to_string(report).unwrap_or_default(),
            "Run report"
        );
        if let Some(path) = &config.report_path {
            if let Err(e) = write_report(path, report).await {
                error!(error = %format!("{e:#}"), path = %path.display(), "Failed to write run report");
            }
        }
    }

    Ok(ExitCode::from(outcome.exit_code()))
}

fn build_generator(config: &RunConfig, http: reqwest::Client) -> Arc<dyn ContentGenerator> {
    let client = RetryingClient::new(http, BackoffPolicy::with_max_retries(config.max_retries));
    match config.provider {
        ProviderKind::Stub => Arc::new(StubGenerator::new()),
        ProviderKind::Anthropic => {
            Arc::new(AnthropicGenerator::new(client, config.anthropic.clone()))
        }
        ProviderKind::Openai => Arc::new(OpenAiGenerator::new(client, config.openai.clone())),
    }
}

async fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(report).context("failed to serialise run report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}
