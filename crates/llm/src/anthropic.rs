//! Anthropic Messages API generator.

use async_trait::async_trait;
use pipeline::{
    ApiKey, ContentGenerator, GeneratedContent, GenerationError, Issue, ModelName, ProviderKind,
    TokenCount, TokenUsage,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::retry::RetryingClient;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const API_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a senior software engineer working from a GitHub issue. \
Produce the deliverable the issue asks for as a single, complete markdown document. \
When files are required, include the complete contents of each file in fenced code blocks \
preceded by its path.";

/// Connection settings for [`AnthropicGenerator`].
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// `None` makes every call fail with [`GenerationError::MissingCredential`].
    pub api_key: Option<ApiKey>,
    pub model: ModelName,
    pub base_url: String,
    pub max_tokens: TokenCount,
}

/// Generates the artifact with one Messages API call.
#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    client: RetryingClient,
    config: AnthropicConfig,
}

impl AnthropicGenerator {
    pub fn new(client: RetryingClient, config: AnthropicConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ContentGenerator for AnthropicGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &ModelName {
        &self.config.model
    }

    #[instrument(skip_all, fields(issue = %issue.number, model = %self.config.model))]
    async fn generate(&self, issue: &Issue) -> Result<GeneratedContent, GenerationError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(GenerationError::MissingCredential {
                provider: ProviderKind::Anthropic,
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.expose()).map_err(|_| {
                GenerationError::MissingCredential {
                    provider: ProviderKind::Anthropic,
                }
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let request = MessagesRequest {
            model: self.config.model.as_str(),
            max_tokens: self.config.max_tokens.as_u64(),
            system: SYSTEM_PROMPT,
            messages: vec![RequestMessage {
                role: "user",
                content: &issue.body,
            }],
        };

        let response: MessagesResponse = self
            .client
            .post_json(ProviderKind::Anthropic, &self.endpoint(), headers, &request)
            .await?;

        let content = extract_content(response)?;
        if let Some(usage) = content.usage() {
            info!(
                input_tokens = usage.input.as_u64(),
                output_tokens = usage.output.as_u64(),
                total_tokens = usage.total().as_u64(),
                "Anthropic completion received"
            );
        }
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u64,
    system: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Concatenates the `text` blocks of a response; non-text blocks are ignored.
///
/// Blocks may split mid-sentence (e.g. around citations), so no separator is
/// inserted.
fn extract_content(response: MessagesResponse) -> Result<GeneratedContent, GenerationError> {
    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<String>();

    let usage = response.usage.map(|u| TokenUsage {
        input: TokenCount::new(u.input_tokens),
        output: TokenCount::new(u.output_tokens),
    });

    GeneratedContent::new(text, usage).ok_or(GenerationError::EmptyContent {
        provider: ProviderKind::Anthropic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> MessagesResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_blocks_are_concatenated_and_usage_recorded() {
        let response = parse(json!({
            "id": "msg_1",
            "content": [
                { "type": "text", "text": "# Plan\n\nThe widget must " },
                { "type": "tool_use", "id": "t1", "name": "x", "input": {} },
                { "type": "text", "text": "support resize." }
            ],
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        }));

        let content = extract_content(response).unwrap();
        assert_eq!(
            content.markdown(),
            "# Plan\n\nThe widget must support resize."
        );
        assert_eq!(content.usage().unwrap().total(), TokenCount::new(15));
    }

    #[test]
    fn empty_content_array_is_an_error() {
        let err = extract_content(parse(json!({ "content": [] }))).unwrap_err();
        assert_eq!(
            err,
            GenerationError::EmptyContent {
                provider: ProviderKind::Anthropic
            }
        );
    }

    #[test]
    fn whitespace_only_text_is_an_error() {
        let err = extract_content(parse(json!({
            "content": [{ "type": "text", "text": "  \n" }]
        })))
        .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyContent { .. }));
    }

    #[test]
    fn request_carries_system_prompt_and_issue_body() {
        let request = MessagesRequest {
            model: "claude-test",
            max_tokens: 1024,
            system: SYSTEM_PROMPT,
            messages: vec![RequestMessage {
                role: "user",
                content: "Build a widget.",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "claude-test");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["system"], SYSTEM_PROMPT);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "Build a widget.");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }
}
