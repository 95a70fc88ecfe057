//! Configuration types for caption generation.
//!
//! Two structs, two lifetimes:
//!
//! * [`BrandProfile`] — who the salon is. Read once (usually from the
//!   `SALON_*` environment variables) and interpolated verbatim into every
//!   prompt. The brand hashtag is derived from it.
//! * [`GenerationConfig`] — how to talk to the model. Built via
//!   [`GenerationConfigBuilder`] so callers set only what they care about.

use crate::error::SalonPostError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

// ── Brand ────────────────────────────────────────────────────────────────

/// Salon identity interpolated into every prompt.
///
/// The fields are opaque strings; no schema validation happens here beyond
/// requiring a non-blank name (the brand hashtag is built from it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandProfile {
    /// Salon name, e.g. "LashRoomMori".
    pub name: String,
    /// Area the salon works in, e.g. "吉祥寺".
    pub area: String,
    /// Concept the salon cares about, e.g. "素まつげを活かすナチュラル美".
    pub concept: String,
    /// Target clientele, e.g. "30〜40代の働く女性".
    pub target: String,
    /// Service description, e.g. "まつげパーマ・眉毛スタイリング".
    pub service: String,
}

impl BrandProfile {
    /// Create a profile with only a name; the other fields are blank and
    /// render as neutral phrases in the prompt.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            area: String::new(),
            concept: String::new(),
            target: String::new(),
            service: String::new(),
        }
    }

    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = area.into();
        self
    }

    pub fn concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = concept.into();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Read `SALON_NAME`, `SALON_AREA`, `SALON_CONCEPT`, `SALON_TARGET` and
    /// `SALON_SERVICE`. Only `SALON_NAME` is required.
    pub fn from_env() -> Result<Self, SalonPostError> {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        let profile = Self {
            name: var("SALON_NAME"),
            area: var("SALON_AREA"),
            concept: var("SALON_CONCEPT"),
            target: var("SALON_TARGET"),
            service: var("SALON_SERVICE"),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), SalonPostError> {
        if self.name.trim().is_empty() {
            return Err(SalonPostError::InvalidConfig(
                "salon name is empty (set SALON_NAME or --salon-name)".into(),
            ));
        }
        Ok(())
    }

    /// The mandatory brand hashtag: `#` followed by the name with all
    /// whitespace removed (hashtags cannot contain spaces).
    pub fn hashtag(&self) -> String {
        let tag: String = self.name.chars().filter(|c| !c.is_whitespace()).collect();
        format!("#{tag}")
    }
}

// ── Generation ───────────────────────────────────────────────────────────

/// Which response shape the prompt asks the model for.
///
/// The segmenter accepts either shape regardless of which one was requested;
/// this only changes the output-format instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// `▼Instagram用` / `▼X用` labelled sections. (default)
    #[default]
    Markers,
    /// A single JSON object keyed by `instagram` / `x`.
    Json,
}

/// Configuration for one or more generation requests.
///
/// # Example
/// ```rust
/// use edgequake_salonpost::{GenerationConfig, ResponseFormat};
///
/// let config = GenerationConfig::builder()
///     .model("gpt-4.1-mini")
///     .response_format(ResponseFormat::Json)
///     .temperature(0.8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 700);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Captions benefit from some variety; transcription-style values near
    /// zero make every regeneration read the same.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 700.
    pub max_tokens: usize,

    /// Per-call timeout for the provider in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for image URLs in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Longest image edge sent to the model, in pixels. Default: 1536.
    ///
    /// Phone photos are routinely 4000 px and larger; anything above this is
    /// downscaled before encoding to keep the request body small.
    pub max_image_edge: u32,

    /// Response shape requested in the prompt. Default: markers.
    pub response_format: ResponseFormat,

    /// Custom system prompt. If None, uses the built-in persona and style
    /// policy. The style policy is still restated in the user instruction.
    pub system_prompt: Option<String>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 700,
            api_timeout_secs: 60,
            download_timeout_secs: 30,
            max_image_edge: 1536,
            response_format: ResponseFormat::default(),
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_image_edge", &self.max_image_edge)
            .field("response_format", &self.response_format)
            .field("system_prompt", &self.system_prompt.as_ref().map(|s| s.len()))
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model that will be requested.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_image_edge(mut self, px: u32) -> Self {
        self.config.max_image_edge = px.max(256);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, SalonPostError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(SalonPostError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(SalonPostError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref prompt) = c.system_prompt {
            if prompt.trim().is_empty() {
                return Err(SalonPostError::InvalidConfig(
                    "custom system prompt is empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}
