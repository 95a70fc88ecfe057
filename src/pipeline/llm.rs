//! Generation client: send one photo + instruction, get one raw reply back.
//!
//! The rest of the pipeline only sees the [`GenerationClient`] trait, so
//! tests can script replies without a network and a server can share one
//! client across sessions. [`LlmClient`] is the production implementation
//! on top of an `edgequake_llm` provider.
//!
//! Exactly one provider call is made per generation. A failed or timed-out
//! call is reported to the caller as-is; regenerating is the user's
//! decision, not ours.

use crate::config::GenerationConfig;
use crate::error::SalonPostError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Everything a client needs for one call.
#[derive(Clone)]
pub struct GenerationRequest {
    /// The photo, already validated and base64-encoded.
    pub image: ImageData,
    /// The composed user instruction.
    pub instruction: String,
    /// Persona + style policy for the system message.
    pub system_prompt: String,
    /// The salon's hashtag; informational for clients that log or fake.
    pub brand_hashtag: String,
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("image_mime", &self.image.mime_type)
            .field("image_b64_len", &self.image.data.len())
            .field("instruction_chars", &self.instruction.chars().count())
            .field("brand_hashtag", &self.brand_hashtag)
            .finish()
    }
}

/// The model's answer, untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl GenerationReply {
    /// A reply with no token accounting.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A black box that turns a request into raw model text.
pub trait GenerationClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<GenerationReply, SalonPostError>>;
}

/// [`GenerationClient`] backed by an `edgequake_llm` provider.
pub struct LlmClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout_secs: u64,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout_secs: config.api_timeout_secs,
        }
    }

    async fn call(&self, request: &GenerationRequest) -> Result<GenerationReply, SalonPostError> {
        let start = Instant::now();

        // System message first, then the instruction with the photo attached.
        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user_with_images(
                request.instruction.as_str(),
                vec![request.image.clone()],
            ),
        ];

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Provider call failed: {}", e);
                return Err(SalonPostError::Provider {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Provider call timed out after {}s", self.timeout_secs);
                return Err(SalonPostError::ApiTimeout {
                    secs: self.timeout_secs,
                });
            }
        };

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(GenerationReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

impl GenerationClient for LlmClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<GenerationReply, SalonPostError>> {
        Box::pin(self.call(request))
    }
}

/// Build `CompletionOptions` from the generation config.
fn build_options(config: &GenerationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = GenerationConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(700));
    }

    #[test]
    fn build_options_follow_builder() {
        let config = GenerationConfig::builder()
            .temperature(0.3)
            .max_tokens(1200)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(1200));
    }

    #[test]
    fn reply_text_has_no_tokens() {
        let reply = GenerationReply::text("▼X用\n本文");
        assert_eq!(reply.content, "▼X用\n本文");
        assert_eq!(reply.prompt_tokens + reply.completion_tokens, 0);
    }
}
