//! Deterministic local generator used when no provider is configured.

use async_trait::async_trait;
use pipeline::{ContentGenerator, GeneratedContent, GenerationError, Issue, ModelName, ProviderKind};

/// Characters of the issue body considered for the excerpt.
pub const EXCERPT_CHARS: usize = 400;

/// Maximum bullet lines in the excerpt.
pub const EXCERPT_LINES: usize = 8;

/// Renders issue bodies into a fixed markdown template without any network
/// call. Identical bodies always yield identical output.
#[derive(Debug, Clone)]
pub struct StubGenerator {
    model: ModelName,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            model: ModelName::stub(),
        }
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Stub
    }

    fn model(&self) -> &ModelName {
        &self.model
    }

    async fn generate(&self, issue: &Issue) -> Result<GeneratedContent, GenerationError> {
        GeneratedContent::new(render(&issue.body), None).ok_or(GenerationError::EmptyContent {
            provider: ProviderKind::Stub,
        })
    }
}

/// Builds the stub document: the first [`EXCERPT_LINES`] non-empty lines of
/// the first [`EXCERPT_CHARS`] characters of `body`, as bullets.
pub fn render(body: &str) -> String {
    let excerpt: String = body.chars().take(EXCERPT_CHARS).collect();
    let bullets: Vec<String> = excerpt
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(EXCERPT_LINES)
        .map(|line| format!("- {line}"))
        .collect();

    format!(
        "## Draft\n\n\
         This document was produced by the stub provider; no model was called.\n\n\
         ### Issue excerpt\n\n\
         {}\n\n\
         ### Next steps\n\n\
         Select the `anthropic` or `openai` provider to generate real content.\n",
        bullets.join("\n")
    )
}
