//! Input resolution: turn a user-supplied path or URL into image bytes.
//!
//! The photo is held in memory for the whole request; salon photos are a
//! few megabytes at most, and the encoder needs the full buffer anyway.
//! Existence and permission are checked up front so the user gets a
//! specific message instead of a generic I/O error.

use crate::error::SalonPostError;
use std::path::PathBuf;
use tracing::{debug, info};

/// An image loaded into memory, with a name for error messages.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// File path or URL the bytes came from.
    pub source_name: String,
    /// Raw file bytes, not yet validated as an image.
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Wrap bytes that are already in memory (e.g. a form upload).
    pub fn from_bytes(source_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source_name: source_name.into(),
            bytes,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to image bytes.
///
/// If the input is a URL, download it. If it is a local file, validate it
/// exists and is readable, then read it.
pub async fn resolve_image(input: &str, timeout_secs: u64) -> Result<ImageInput, SalonPostError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Read a local file, mapping I/O errors to specific variants.
async fn read_local(path_str: &str) -> Result<ImageInput, SalonPostError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(SalonPostError::ImageNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SalonPostError::PermissionDenied { path });
        }
        Err(_) => return Err(SalonPostError::ImageNotFound { path }),
    };

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(ImageInput {
        source_name: path.display().to_string(),
        bytes,
    })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageInput, SalonPostError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SalonPostError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SalonPostError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SalonPostError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SalonPostError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            SalonPostError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SalonPostError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(ImageInput {
        source_name: url.to_string(),
        bytes: bytes.to_vec(),
    })
}
