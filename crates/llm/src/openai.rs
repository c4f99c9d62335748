//! OpenAI Chat Completions generator.

use async_trait::async_trait;
use pipeline::{
    ApiKey, ContentGenerator, GeneratedContent, GenerationError, Issue, ModelName, ProviderKind,
    TokenCount, TokenUsage,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::retry::RetryingClient;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// Asks for complete file contents in code blocks, answered in Japanese.
const SYSTEM_PROMPT: &str = "あなたは熟練したソフトウェアエンジニアです。\
GitHub Issue の本文を読み、求められている成果物を Markdown ドキュメントとして出力してください。\
ファイルが必要な場合は、各ファイルのパスを示したうえで、その完全な内容をコードブロックで出力してください。\
省略や「以下同様」などの記述はしないでください。";

/// Connection settings for [`OpenAiGenerator`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<ApiKey>,
    pub model: ModelName,
    pub base_url: String,
    pub max_tokens: TokenCount,
}

/// Generates the artifact with one Chat Completions call.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: RetryingClient,
    config: OpenAiConfig,
}

impl OpenAiGenerator {
    pub fn new(client: RetryingClient, config: OpenAiConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Openai
    }

    fn model(&self) -> &ModelName {
        &self.config.model
    }

    #[instrument(skip_all, fields(issue = %issue.number, model = %self.config.model))]
    async fn generate(&self, issue: &Issue) -> Result<GeneratedContent, GenerationError> {
        let missing = || GenerationError::MissingCredential {
            provider: ProviderKind::Openai,
        };
        let api_key = self.config.api_key.as_ref().ok_or_else(missing)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
                .map_err(|_| missing())?,
        );

        let request = ChatRequest {
            model: self.config.model.as_str(),
            max_completion_tokens: self.config.max_tokens.as_u64(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &issue.body,
                },
            ],
        };

        let response: ChatResponse = self
            .client
            .post_json(ProviderKind::Openai, &self.endpoint(), headers, &request)
            .await?;

        let content = extract_content(response)?;
        if let Some(usage) = content.usage() {
            info!(
                input_tokens = usage.input.as_u64(),
                output_tokens = usage.output.as_u64(),
                total_tokens = usage.total().as_u64(),
                "OpenAI completion received"
            );
        }
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_completion_tokens: u64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn extract_content(response: ChatResponse) -> Result<GeneratedContent, GenerationError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    let usage = response.usage.map(|u| TokenUsage {
        input: TokenCount::new(u.prompt_tokens),
        output: TokenCount::new(u.completion_tokens),
    });

    GeneratedContent::new(text, usage).ok_or(GenerationError::EmptyContent {
        provider: ProviderKind::Openai,
    })
}
