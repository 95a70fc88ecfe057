//! Error types for the edgequake-salonpost library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SalonPostError`] — **Fatal**: the request cannot produce any caption
//!   (unreadable image, provider not configured, provider call rejected,
//!   response could not be segmented at all). Returned as
//!   `Err(SalonPostError)` from the top-level `generate*` functions.
//!
//! * [`SectionError`] — **Non-fatal**: one requested platform's section was
//!   absent from an otherwise usable response. Stored inside
//!   [`crate::output::GenerationOutput`] next to the captions that did parse,
//!   so the caller can show the partial result and flag the gap.
//!
//! Nothing in this crate retries automatically; every fatal error ends the
//! current request and a new one has to be started by the user.

use crate::attributes::Platform;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-salonpost library.
#[derive(Debug, Error)]
pub enum SalonPostError {
    // ── Image input errors ────────────────────────────────────────────────
    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    ImageNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes are not a still image this tool can send (video, PDF, …).
    #[error("Unsupported image '{source_name}': {detail}\nUse a PNG, JPEG, WebP or GIF photo.")]
    UnsupportedImage { source_name: String, detail: String },

    // ── Request errors ────────────────────────────────────────────────────
    /// A selection in the post attributes is invalid or unknown.
    #[error("Invalid post attributes: {0}")]
    InvalidAttributes(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider call failed or was rejected (network, quota, content
    /// policy). The provider's message is kept verbatim.
    #[error("LLM provider error: {message}")]
    Provider { message: String },

    /// The provider call exceeded the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    // ── Response errors ───────────────────────────────────────────────────
    /// The response contained neither a usable JSON object nor any known
    /// section marker. `raw` is the untouched response so it can be shown
    /// to the user for manual recovery.
    #[error("Could not find any platform section in the model response ({} chars)", .raw.chars().count())]
    ParseFailure { raw: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or a required setting is missing.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SalonPostError {
    /// The raw model response, when the error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            SalonPostError::ParseFailure { raw } => Some(raw),
            _ => None,
        }
    }
}

/// A non-fatal error for a single platform section.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SectionError {
    /// The platform was requested but its section never appeared in the
    /// response.
    #[error("{platform}: section missing from the model response")]
    Missing { platform: Platform },
}

impl SectionError {
    pub fn platform(&self) -> Platform {
        match self {
            SectionError::Missing { platform } => *platform,
        }
    }
}
