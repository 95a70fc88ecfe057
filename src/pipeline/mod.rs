//! Pipeline stages for caption generation.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the model-facing part can be swapped for a scripted fake.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ segment ──▶ postprocess ──▶ validate
//! (path/URL) (base64)  (model)  (split)     (tidy)          (shape)
//! ```
//!
//! 1. [`input`]   — read the local photo or download it
//! 2. [`encode`]  — sniff, downscale if needed, base64-wrap for the request
//! 3. [`llm`]     — the only stage with network I/O; one call, no retry
//! 4. [`segment`] — split the reply into one section per platform
//! 5. [`postprocess`] — deterministic cleanup of each section
//! 6. [`validate`] — report shape issues (hashtags, length, brand tag)

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod segment;
pub mod validate;
