//! Result types returned by the generation entry points.

use crate::attributes::Platform;
use crate::error::SectionError;
use crate::pipeline::validate::ShapeIssue;
use crate::prompts::section_marker;
use crate::variation::VariationAngle;
use serde::{Deserialize, Serialize};

/// One finished caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub platform: Platform,
    /// Cleaned caption text, ready to paste.
    pub text: String,
    /// Shape problems found in `text`. Empty when the caption looks right.
    pub issues: Vec<ShapeIssue>,
}

/// Token and timing figures for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Wall-clock time from image resolution to the final caption.
    pub total_duration_ms: u64,
    /// Time spent waiting on the provider.
    pub llm_duration_ms: u64,
}

/// Complete result of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Captions in platform order (Instagram, then X).
    pub captions: Vec<Caption>,
    /// Requested platforms whose section the model left out.
    pub missing: Vec<SectionError>,
    /// The opening framing that was requested, if any.
    pub angle: Option<VariationAngle>,
    /// The model's reply before segmentation.
    pub raw: String,
    pub stats: GenerationStats,
}

impl GenerationOutput {
    pub fn caption(&self, platform: Platform) -> Option<&Caption> {
        self.captions.iter().find(|c| c.platform == platform)
    }

    /// Caption text for `platform`, or `None` if it was not produced.
    pub fn text(&self, platform: Platform) -> Option<&str> {
        self.caption(platform).map(|c| c.text.as_str())
    }

    /// `true` when every requested platform has a caption.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// `true` when any caption has a shape issue.
    pub fn has_issues(&self) -> bool {
        self.captions.iter().any(|c| !c.issues.is_empty())
    }

    /// Plain-text rendering: each caption under its section heading, with
    /// missing sections flagged in place.
    pub fn render_text(&self) -> String {
        let mut platforms: Vec<Platform> = self
            .captions
            .iter()
            .map(|c| c.platform)
            .chain(self.missing.iter().map(SectionError::platform))
            .collect();
        platforms.sort();
        platforms.dedup();

        let blocks: Vec<String> = platforms
            .into_iter()
            .map(|p| match self.text(p) {
                Some(text) => format!("{}\n{}", section_marker(p), text),
                None => format!("{}\n（生成されませんでした）", section_marker(p)),
            })
            .collect();

        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }
}
