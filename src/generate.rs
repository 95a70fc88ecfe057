//! Generation entry points.
//!
//! One call turns one photo into one caption per requested platform:
//!
//! ```text
//! image ─▶ angle ─▶ compose ─▶ client ─▶ segment ─▶ tidy ─▶ validate ─▶ output
//! ```
//!
//! [`generate`] resolves the image and the provider itself. Callers that
//! already hold an encoded image and a client (an interactive loop, a web
//! handler, a test) use [`generate_with_client`] directly.

use crate::attributes::{Platform, PostAttributes};
use crate::config::{BrandProfile, GenerationConfig, DEFAULT_MODEL};
use crate::error::{SalonPostError, SectionError};
use crate::output::{Caption, GenerationOutput, GenerationStats};
use crate::pipeline::llm::{GenerationClient, GenerationRequest, LlmClient};
use crate::pipeline::{encode, input, postprocess, segment, validate};
use crate::prompts::{self, DEFAULT_SYSTEM_PROMPT};
use crate::session::Session;
use crate::variation::AnglePolicy;
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate captions for a local photo or an image URL.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(GenerationOutput)` when at least one requested platform got a
/// caption. Platforms the model left out are listed in `output.missing`.
///
/// # Errors
/// Returns `Err(SalonPostError)` only when no caption could be produced:
/// - image not found, not downloadable, or not a supported still image
/// - provider not configured, failed, or timed out
/// - the reply contained no recognisable section (`ParseFailure`, which
///   carries the raw reply)
pub async fn generate(
    image_input: impl AsRef<str>,
    brand: &BrandProfile,
    attrs: &PostAttributes,
    policy: AnglePolicy,
    session: &mut Session,
    config: &GenerationConfig,
) -> Result<GenerationOutput, SalonPostError> {
    let started = Instant::now();
    let image_input = image_input.as_ref();
    info!("Starting generation: {}", image_input);

    brand.validate()?;
    let image = load_image(image_input, config).await?;
    let client = client_for(config).await?;
    run(&client, image, brand, attrs, policy, session, config, started).await
}

/// Generate again for the same photo, with an angle different from the
/// last one used in `session`.
pub async fn regenerate(
    image_input: impl AsRef<str>,
    brand: &BrandProfile,
    attrs: &PostAttributes,
    session: &mut Session,
    config: &GenerationConfig,
) -> Result<GenerationOutput, SalonPostError> {
    generate(
        image_input,
        brand,
        attrs,
        AnglePolicy::AvoidRepeat,
        session,
        config,
    )
    .await
}

/// Generate captions for a photo already in memory (e.g. a form upload).
pub async fn generate_from_bytes(
    source_name: &str,
    bytes: Vec<u8>,
    brand: &BrandProfile,
    attrs: &PostAttributes,
    policy: AnglePolicy,
    session: &mut Session,
    config: &GenerationConfig,
) -> Result<GenerationOutput, SalonPostError> {
    let started = Instant::now();
    brand.validate()?;
    let image = encode::encode_image(
        &input::ImageInput::from_bytes(source_name, bytes),
        config.max_image_edge,
    )?;
    let client = client_for(config).await?;
    run(&client, image, brand, attrs, policy, session, config, started).await
}

/// Generate captions with an explicit client and an encoded image.
///
/// Makes exactly one client call. On success the angle used is recorded in
/// `session`; on any error the recorded angle and last output stay as they
/// were.
pub async fn generate_with_client(
    client: &dyn GenerationClient,
    image: ImageData,
    brand: &BrandProfile,
    attrs: &PostAttributes,
    policy: AnglePolicy,
    session: &mut Session,
    config: &GenerationConfig,
) -> Result<GenerationOutput, SalonPostError> {
    brand.validate()?;
    run(
        client,
        image,
        brand,
        attrs,
        policy,
        session,
        config,
        Instant::now(),
    )
    .await
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    image_input: impl AsRef<str>,
    brand: &BrandProfile,
    attrs: &PostAttributes,
    policy: AnglePolicy,
    session: &mut Session,
    config: &GenerationConfig,
) -> Result<GenerationOutput, SalonPostError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SalonPostError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(image_input, brand, attrs, policy, session, config))
}

/// Read or download the photo and encode it for the request.
pub async fn load_image(
    image_input: &str,
    config: &GenerationConfig,
) -> Result<ImageData, SalonPostError> {
    let resolved = input::resolve_image(image_input, config.download_timeout_secs).await?;
    encode::encode_image(&resolved, config.max_image_edge)
}

/// Build the production client for `config`.
pub async fn client_for(config: &GenerationConfig) -> Result<LlmClient, SalonPostError> {
    let provider = resolve_provider(config).await?;
    Ok(LlmClient::new(provider, config))
}

/// Write the rendered captions to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_captions(
    output: &GenerationOutput,
    path: impl AsRef<Path>,
) -> Result<(), SalonPostError> {
    write_atomic(path.as_ref(), output.render_text().as_bytes()).await
}

/// Write the full output as pretty-printed JSON to `path`, atomically.
pub async fn write_output_json(
    output: &GenerationOutput,
    path: impl AsRef<Path>,
) -> Result<(), SalonPostError> {
    let json = serde_json::to_vec_pretty(output)
        .map_err(|e| SalonPostError::Internal(format!("JSON encoding failed: {e}")))?;
    write_atomic(path.as_ref(), &json).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn run(
    client: &dyn GenerationClient,
    image: ImageData,
    brand: &BrandProfile,
    attrs: &PostAttributes,
    policy: AnglePolicy,
    session: &mut Session,
    config: &GenerationConfig,
    started: Instant,
) -> Result<GenerationOutput, SalonPostError> {
    let platforms = attrs.platforms();

    // ── Step 1: Choose the angle ─────────────────────────────────────────
    let angle = {
        let (tracker, rng) = session.tracker_and_rng();
        policy.resolve(tracker, rng)
    };
    debug!("Angle policy {:?} → {:?}", policy, angle);

    // ── Step 2: Compose the request ──────────────────────────────────────
    let brand_hashtag = brand.hashtag();
    let request = GenerationRequest {
        image,
        instruction: prompts::compose(brand, attrs, angle, config.response_format),
        system_prompt: config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .to_string(),
        brand_hashtag: brand_hashtag.clone(),
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(&platforms, angle);
    }

    // ── Step 3: One client call ──────────────────────────────────────────
    let llm_start = Instant::now();
    let reply = client.generate(&request).await.inspect_err(|e| {
        report_error(config, e);
    })?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_response(reply.content.chars().count());
    }

    // ── Step 4: Segment ──────────────────────────────────────────────────
    let segmented = segment::segment(&reply.content, &platforms).inspect_err(|e| {
        warn!("{}", e);
        report_error(config, e);
    })?;

    // ── Step 5: Tidy and validate each caption ───────────────────────────
    let captions: Vec<Caption> = segmented
        .sections
        .iter()
        .map(|(&platform, section)| {
            let text = postprocess::clean_caption(section);
            let issues = validate::check_caption(platform, &text, &brand_hashtag);
            for issue in &issues {
                warn!("{}: {}", platform, issue);
            }
            Caption {
                platform,
                text,
                issues,
            }
        })
        .collect();

    let missing: Vec<SectionError> = segmented
        .missing
        .iter()
        .map(|&platform| {
            warn!("{}: section missing from the model response", platform);
            SectionError::Missing { platform }
        })
        .collect();

    let output = GenerationOutput {
        captions,
        missing,
        angle,
        raw: reply.content,
        stats: GenerationStats {
            input_tokens: reply.prompt_tokens as u64,
            output_tokens: reply.completion_tokens as u64,
            total_duration_ms: started.elapsed().as_millis() as u64,
            llm_duration_ms,
        },
    };

    // ── Step 6: Remember what was used ───────────────────────────────────
    session.record_success(&output);

    info!(
        "Generation complete: {} caption(s), {} missing, {}ms total",
        output.captions.len(),
        output.missing.len(),
        output.stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        let produced: Vec<Platform> = output.captions.iter().map(|c| c.platform).collect();
        cb.on_generation_complete(&produced, &segmented.missing);
    }

    Ok(output)
}

fn report_error(config: &GenerationConfig, error: &SalonPostError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_error(&error.to_string());
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), SalonPostError> {
    let write_failed = |e| SalonPostError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;
    Ok(())
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SalonPostError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SalonPostError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    when both are set and non-empty.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, even if other keys are too.
/// 5. **Auto-detect** via [`ProviderFactory::from_env`].
///
/// Steps 2 and 4 use `config.model`, falling back to [`DEFAULT_MODEL`].
async fn resolve_provider(
    config: &GenerationConfig,
) -> Result<Arc<dyn LLMProvider>, SalonPostError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SalonPostError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Default model: {}\n\
                Error: {}",
                DEFAULT_MODEL, e
            ),
        })?;

    Ok(llm_provider)
}
