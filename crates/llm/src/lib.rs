//! issuesmith LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::ContentGenerator`] trait three ways:
//!
//! - [`StubGenerator`]: deterministic local template, no network call.
//! - [`AnthropicGenerator`]: Anthropic Messages API.
//! - [`OpenAiGenerator`]: OpenAI Chat Completions API.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response parsing
//! and exponential back-off live here. The [`pipeline`] crate sees only
//! [`pipeline::ContentGenerator`].

pub mod anthropic;
pub mod openai;
pub mod retry;
pub mod stub;

pub use anthropic::{AnthropicConfig, AnthropicGenerator};
pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use retry::{retry_with_backoff, BackoffPolicy, RetryingClient};
pub use stub::StubGenerator;
