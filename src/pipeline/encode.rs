//! Image encoding: raw upload bytes → base64 payload wrapped in `ImageData`.
//!
//! Uploads arrive as whatever the phone produced. We sniff the real format
//! from the bytes (file extensions lie), decode once to prove the image is
//! readable, and only re-encode when the photo exceeds the configured edge
//! length. Small enough photos are sent byte-for-byte.

use crate::error::SalonPostError;
use crate::pipeline::input::ImageInput;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Formats the vision APIs accept as still images.
const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Validate, downscale if needed, and base64-encode an uploaded photo.
///
/// `detail: "high"` is requested so GPT-4-class models look at the photo in
/// full tiles; lash and brow detail is lost in the single low-detail tile.
pub fn encode_image(input: &ImageInput, max_edge: u32) -> Result<ImageData, SalonPostError> {
    let unsupported = |detail: String| SalonPostError::UnsupportedImage {
        source_name: input.source_name.clone(),
        detail,
    };

    if looks_like_video(&input.bytes) {
        return Err(unsupported(
            "video files are not supported; upload a still photo".into(),
        ));
    }

    let format = image::guess_format(&input.bytes)
        .map_err(|e| unsupported(format!("unrecognised image data ({e})")))?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(unsupported(format!("{format:?} images are not supported")));
    }

    let img = image::load_from_memory_with_format(&input.bytes, format)
        .map_err(|e| unsupported(format!("could not decode {format:?}: {e}")))?;

    let (width, height) = (img.width(), img.height());
    let (bytes, mime) = if width > max_edge || height > max_edge {
        let resized = img.resize(max_edge, max_edge, FilterType::Lanczos3);
        debug!(
            "Downscaled {}x{} → {}x{}",
            width,
            height,
            resized.width(),
            resized.height()
        );
        (to_jpeg(&resized)?, "image/jpeg")
    } else {
        (input.bytes.clone(), format.to_mime_type())
    };

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded image → {} bytes base64 ({})", b64.len(), mime);

    Ok(ImageData::new(b64, mime).with_detail("high"))
}

/// Re-encode as JPEG. Alpha is dropped; JPEG has no alpha channel.
fn to_jpeg(img: &DynamicImage) -> Result<Vec<u8>, SalonPostError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .map_err(|e| SalonPostError::Internal(format!("JPEG encoding failed: {e}")))?;
    Ok(buf)
}

/// ISO base-media (MP4/MOV) files carry `ftyp` at offset 4.
fn looks_like_video(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && !is_heif_brand(&bytes[8..12])
}

/// HEIF/AVIF share the ISO container; they are images, just not ones we
/// decode, so they get the regular "unsupported format" message.
fn is_heif_brand(brand: &[u8]) -> bool {
    matches!(brand, b"heic" | b"heix" | b"mif1" | b"avif")
}
