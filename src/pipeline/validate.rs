//! Shape checks: does a caption look like what the prompt asked for?
//!
//! The prompt requests a hashtag count, a length, and the salon's own
//! hashtag. Models mostly comply, but not always, and a post with the
//! wrong salon tag is worse than no post. Violations are reported as
//! [`ShapeIssue`]s attached to the caption. They never discard a caption;
//! the CLI's `--strict` flag is what turns them into a failure.

use crate::attributes::Platform;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Shape a platform's caption is expected to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRules {
    pub hashtags: RangeInclusive<usize>,
    /// Non-hashtag text lines. `None` means unchecked.
    pub body_lines: Option<RangeInclusive<usize>>,
    pub max_chars: usize,
}

impl ShapeRules {
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Instagram => Self {
                hashtags: 10..=15,
                body_lines: Some(3..=6),
                max_chars: 2200,
            },
            Platform::X => Self {
                hashtags: 2..=3,
                body_lines: None,
                max_chars: 140,
            },
        }
    }
}

/// One way a caption misses its requested shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeIssue {
    #[error("caption is empty")]
    Empty,

    #[error("brand hashtag {tag} is missing")]
    MissingBrandHashtag { tag: String },

    #[error("{found} hashtags (expected {min}–{max})")]
    HashtagCount { found: usize, min: usize, max: usize },

    #[error("{chars} characters (limit {max})")]
    TooLong { chars: usize, max: usize },

    #[error("{found} body lines (expected {min}–{max})")]
    LineCount { found: usize, min: usize, max: usize },
}

// A tag ends at whitespace, the next `#`, or punctuation written straight
// after it (`#SalonName、#まつげパーマ`).
static RE_HASHTAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[#＃][^\s#＃、。，．,.！？!?：:；;「」『』（）()【】\[\]…・]+").unwrap()
});

/// All hashtags in `text`, in order of appearance.
pub fn hashtags(text: &str) -> Vec<&str> {
    RE_HASHTAG.find_iter(text).map(|m| m.as_str()).collect()
}

/// Non-blank lines that are not made up of hashtags alone.
fn body_line_count(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !RE_HASHTAG.replace_all(line, "").trim().is_empty())
        .count()
}

/// Check one caption against its platform's rules.
pub fn check_caption(platform: Platform, text: &str, brand_hashtag: &str) -> Vec<ShapeIssue> {
    if text.trim().is_empty() {
        return vec![ShapeIssue::Empty];
    }

    let rules = ShapeRules::for_platform(platform);
    let tags = hashtags(text);
    let mut issues = Vec::new();

    if !tags.contains(&brand_hashtag) {
        issues.push(ShapeIssue::MissingBrandHashtag {
            tag: brand_hashtag.to_string(),
        });
    }

    if !rules.hashtags.contains(&tags.len()) {
        issues.push(ShapeIssue::HashtagCount {
            found: tags.len(),
            min: *rules.hashtags.start(),
            max: *rules.hashtags.end(),
        });
    }

    let chars = text.chars().count();
    if chars > rules.max_chars {
        issues.push(ShapeIssue::TooLong {
            chars,
            max: rules.max_chars,
        });
    }

    if let Some(range) = &rules.body_lines {
        let found = body_line_count(text);
        if !range.contains(&found) {
            issues.push(ShapeIssue::LineCount {
                found,
                min: *range.start(),
                max: *range.end(),
            });
        }
    }

    issues
}
