//! # edgequake-salonpost
//!
//! Turn one salon photo into ready-to-post Instagram and X captions using a
//! vision-capable LLM.
//!
//! ## Why this crate?
//!
//! Small lash and brow salons post almost every day, and writing a calm,
//! on-brand caption with the right hashtags for two platforms takes longer
//! than the treatment photo did. This crate composes a tightly constrained
//! instruction from a handful of selections (post type, audience, menu,
//! emphasis), sends it with the photo, and splits the reply back into one
//! caption per platform, flagging anything that misses the requested shape.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Input     read a local file or download a URL
//!  ├─ 2. Encode    sniff format, downscale large photos, base64 ImageData
//!  ├─ 3. Compose   brand + selections + angle → one instruction
//!  ├─ 4. Generate  one call to gpt-4.1-mini / claude / gemini / …
//!  ├─ 5. Segment   JSON object, else ▼Instagram用 / ▼X用 headings
//!  ├─ 6. Polish    strip Markdown, invisible characters, stray rules
//!  └─ 7. Validate  hashtag counts, length, salon hashtag
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_salonpost::{
//!     generate, AnglePolicy, BrandProfile, GenerationConfig, MenuItem, PostAttributes, Session,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::default();
//!     let brand = BrandProfile::new("SalonName").area("吉祥寺");
//!     let attrs = PostAttributes::builder()
//!         .menu_item(MenuItem::LashLift)
//!         .build()?;
//!     let mut session = Session::new();
//!
//!     let output = generate("lash.jpg", &brand, &attrs, AnglePolicy::Random, &mut session, &config).await?;
//!     print!("{}", output.render_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `salonpost` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-salonpost = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod attributes;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod variation;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use attributes::{
    AgeBand, EmphasisPoint, Gender, MenuItem, Platform, PostAttributes, PostAttributesBuilder,
    PostType,
};
pub use config::{BrandProfile, GenerationConfig, GenerationConfigBuilder, ResponseFormat};
pub use error::{SalonPostError, SectionError};
pub use generate::{
    client_for, generate, generate_from_bytes, generate_sync, generate_with_client, load_image,
    regenerate, write_captions, write_output_json,
};
pub use output::{Caption, GenerationOutput, GenerationStats};
pub use pipeline::llm::{GenerationClient, GenerationReply, GenerationRequest, LlmClient};
pub use pipeline::segment::{segment, Segmented};
pub use pipeline::validate::ShapeIssue;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::Session;
pub use variation::{AnglePolicy, VariationAngle, VariationTracker};
