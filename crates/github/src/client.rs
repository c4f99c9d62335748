//! GitHub REST client for pull requests and issue comments.

use async_trait::async_trait;
use pipeline::{
    truncate_error_body, ApiKey, HostingError, IssueNumber, IssueTracker, PullRequest,
    PullRequestManager, PullRequestNumber, PullRequestRequest, RepositoryId,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

/// Thin REST client over `reqwest`.
///
/// Calls are made exactly once: the workflow treats every hosting failure as
/// best-effort, so there is no retry here.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: ApiKey,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>, token: ApiKey) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn headers(&self) -> Result<HeaderMap, HostingError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
                .map_err(|e| HostingError::Transport(format!("invalid token header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("issuesmith/", env!("CARGO_PKG_VERSION"))),
        );
        Ok(headers)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, HostingError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.api_url);
        debug!(%url, "POST");
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| HostingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::Http {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| HostingError::InvalidResponse(e.to_string()))
    }
}

#[derive(Serialize)]
struct CreatePull<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

#[derive(Serialize)]
struct CreateComment<'a> {
    body: &'a str,
}

#[async_trait]
impl PullRequestManager for GithubClient {
    #[instrument(skip_all, fields(repository = %request.repository, head = %request.head, base = %request.base))]
    async fn open_pull_request(
        &self,
        request: &PullRequestRequest,
    ) -> Result<PullRequest, HostingError> {
        let path = format!(
            "/repos/{}/{}/pulls",
            request.repository.owner(),
            request.repository.name()
        );
        let created: PullResponse = self
            .post(
                &path,
                &CreatePull {
                    title: &request.title,
                    head: request.head.as_str(),
                    base: request.base.as_str(),
                    body: &request.body,
                },
            )
            .await?;

        Ok(PullRequest {
            number: PullRequestNumber::new(created.number),
            url: created.html_url,
        })
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    #[instrument(skip_all, fields(repository = %repository, issue = %issue))]
    async fn post_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), HostingError> {
        let path = format!(
            "/repos/{}/{}/issues/{issue}/comments",
            repository.owner(),
            repository.name()
        );
        let _: IgnoredAny = self.post(&path, &CreateComment { body }).await?;
        Ok(())
    }
}
