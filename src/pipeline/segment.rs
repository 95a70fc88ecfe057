//! Response segmentation: one model response → one caption per platform.
//!
//! The model is asked for a specific shape, but it drifts: JSON wrapped in a
//! code fence, headings written as `【Instagram用】` instead of
//! `▼Instagram用`, an unrequested section added anyway. Segmentation tries
//! each known shape in turn and stops at the first one that yields at least
//! one requested section:
//!
//! 1. **JSON** — the substring from the first `{` to the last `}` parses as
//!    an object with an `instagram` / `x` (or `twitter`) string value.
//! 2. **Markers** — section headings such as `▼Instagram用` and `▼X用`.
//!    Each section runs from the end of its heading to the start of the next
//!    heading. Text before the first heading is dropped.
//!
//! A requested platform that the winning shape does not contain is reported
//! in [`Segmented::missing`]; it is never turned into an empty string. A
//! heading followed by nothing *is* an empty section and is kept as `""`.
//! When no shape matches, the result is [`SalonPostError::ParseFailure`]
//! carrying the raw response. Nothing here panics on any input.

use crate::attributes::Platform;
use crate::error::SalonPostError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Which response shape the sections were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentShape {
    Json,
    Markers,
}

/// Per-platform sections split out of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmented {
    /// Sections that were found, trimmed of surrounding whitespace only.
    pub sections: BTreeMap<Platform, String>,
    /// Requested platforms with no section in the response.
    pub missing: Vec<Platform>,
    /// The shape that matched.
    pub shape: SegmentShape,
}

impl Segmented {
    pub fn get(&self, platform: Platform) -> Option<&str> {
        self.sections.get(&platform).map(String::as_str)
    }

    pub fn is_missing(&self, platform: Platform) -> bool {
        self.missing.contains(&platform)
    }
}

/// Outcome of one extraction strategy.
enum Attempt {
    Found(BTreeMap<Platform, String>),
    Fallthrough(&'static str),
}

type Strategy = fn(&str, &[Platform]) -> Attempt;

/// Strategies in preference order.
const STRATEGIES: [(SegmentShape, Strategy); 2] = [
    (SegmentShape::Json, extract_json),
    (SegmentShape::Markers, extract_markers),
];

/// Split `raw` into one section per requested platform.
pub fn segment(raw: &str, requested: &[Platform]) -> Result<Segmented, SalonPostError> {
    for (shape, strategy) in STRATEGIES {
        match strategy(raw, requested) {
            Attempt::Found(sections) => {
                let mut missing: Vec<Platform> = requested
                    .iter()
                    .copied()
                    .filter(|p| !sections.contains_key(p))
                    .collect();
                missing.sort();
                missing.dedup();
                debug!(
                    "Segmented via {:?}: {} section(s), {} missing",
                    shape,
                    sections.len(),
                    missing.len()
                );
                return Ok(Segmented {
                    sections,
                    missing,
                    shape,
                });
            }
            Attempt::Fallthrough(reason) => {
                debug!("{:?} segmentation skipped: {}", shape, reason);
            }
        }
    }

    Err(SalonPostError::ParseFailure {
        raw: raw.to_string(),
    })
}

// ── Strategy 1: embedded JSON object ─────────────────────────────────────────

fn extract_json(raw: &str, requested: &[Platform]) -> Attempt {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Attempt::Fallthrough("no JSON braces");
    };
    if end <= start {
        return Attempt::Fallthrough("braces out of order");
    }

    let value: Value = match serde_json::from_str(&raw[start..=end]) {
        Ok(v) => v,
        Err(_) => return Attempt::Fallthrough("brace span is not valid JSON"),
    };
    let Value::Object(map) = value else {
        return Attempt::Fallthrough("JSON is not an object");
    };

    let mut sections = BTreeMap::new();
    for (key, value) in &map {
        let Some(platform) = platform_for_key(key) else {
            continue;
        };
        if !requested.contains(&platform) || sections.contains_key(&platform) {
            continue;
        }
        if let Value::String(text) = value {
            sections.insert(platform, text.trim().to_string());
        }
    }

    if sections.is_empty() {
        Attempt::Fallthrough("no requested platform key with a string value")
    } else {
        Attempt::Found(sections)
    }
}

fn platform_for_key(key: &str) -> Option<Platform> {
    let key = key.trim().trim_end_matches('用').to_ascii_lowercase();
    match key.as_str() {
        "instagram" => Some(Platform::Instagram),
        "x" | "twitter" => Some(Platform::X),
        _ => None,
    }
}

// ── Strategy 2: section headings ─────────────────────────────────────────────
//
// A heading is accepted when it has one of:
//   * a symbol lead (▼ ■ ◆ ◇ ●) before the platform name
//   * a 【 lead closed by 】 (so 【X限定】 in running text is not a heading)
//   * no lead, at the start of a line, followed by 用 or a colon
// and the platform name is not followed by an ASCII letter or digit
// (so ▼Xmas is not an X heading). When a platform has several candidates,
// see `find_heading`.

fn marker_regex(names: &str) -> Regex {
    Regex::new(&format!(
        r"(?m)(?P<lead>[▼■◆◇●]|【)?[ \t　]*(?P<name>{names})(?P<tail>[ \t　]*用)?[ \t　]*(?P<close>】)?[ \t　]*(?P<colon>[:：])?(?:[ \t　]*\*\*)?"
    ))
    .unwrap()
}

static INSTAGRAM_MARKER: Lazy<Regex> =
    Lazy::new(|| marker_regex("(?i:instagram)|インスタグラム|インスタ"));
static X_MARKER: Lazy<Regex> = Lazy::new(|| marker_regex("(?i:twitter|x)|Ｘ|ツイッター"));

fn marker_for(platform: Platform) -> &'static Regex {
    match platform {
        Platform::Instagram => &INSTAGRAM_MARKER,
        Platform::X => &X_MARKER,
    }
}

/// A located heading: byte span of the heading itself.
#[derive(Debug, Clone, Copy)]
struct Heading {
    platform: Platform,
    start: usize,
    end: usize,
}

/// How clearly a match reads as a heading. A preamble such as
/// `Instagram用とX用の投稿文です` also starts a line with `Instagram用`, so a
/// marked heading always wins over a bare one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum HeadingKind {
    /// Line start, then the name with `用` or a colon.
    Bare,
    /// `▼Instagram用`, `【X用】` and the like.
    Marked,
}

/// The heading for `platform`: the strongest kind present, and the last
/// one of that kind, since a preamble that mentions the platform comes
/// before the real heading.
fn find_heading(raw: &str, platform: Platform) -> Option<Heading> {
    marker_for(platform)
        .captures_iter(raw)
        .filter_map(|caps| {
            let kind = heading_kind(raw, &caps)?;
            let m = caps.get(0)?;
            Some((kind, m.start(), m.end()))
        })
        .max_by_key(|&(kind, start, _)| (kind, start))
        .map(|(_, start, end)| Heading {
            platform,
            start,
            end,
        })
}

fn heading_kind(raw: &str, caps: &Captures<'_>) -> Option<HeadingKind> {
    let name = caps.name("name")?;
    if raw[name.end()..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    match caps.name("lead").map(|m| m.as_str()) {
        Some("【") => caps.name("close").map(|_| HeadingKind::Marked),
        Some(_) => Some(HeadingKind::Marked),
        None => {
            let line_prefix = raw[..name.start()].rsplit('\n').next().unwrap_or("");
            let bare = line_prefix.trim().is_empty()
                && (caps.name("tail").is_some() || caps.name("colon").is_some());
            bare.then_some(HeadingKind::Bare)
        }
    }
}

fn extract_markers(raw: &str, requested: &[Platform]) -> Attempt {
    // Headings for every platform bound the sections, even for platforms
    // that were not requested; otherwise an unrequested section would be
    // swallowed by the one before it.
    let mut headings: Vec<Heading> = Platform::ALL
        .iter()
        .filter_map(|p| find_heading(raw, *p))
        .collect();
    if headings.is_empty() {
        return Attempt::Fallthrough("no section headings");
    }
    headings.sort_by_key(|h| h.start);

    let mut sections = BTreeMap::new();
    for (i, heading) in headings.iter().enumerate() {
        if !requested.contains(&heading.platform) {
            continue;
        }
        let end = headings
            .get(i + 1)
            .map_or(raw.len(), |next| next.start)
            .max(heading.end);
        sections.insert(heading.platform, raw[heading.end..end].trim().to_string());
    }

    if sections.is_empty() {
        Attempt::Fallthrough("headings only for platforms that were not requested")
    } else {
        Attempt::Found(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: &[Platform] = &[Platform::Instagram, Platform::X];

    #[test]
    fn json_object_is_used_verbatim() {
        let raw = r#"{"instagram": "ふんわり上向きに。\n#SalonName", "x": "軽やかな目元に。 #SalonName"}"#;
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.shape, SegmentShape::Json);
        assert_eq!(seg.get(Platform::Instagram), Some("ふんわり上向きに。\n#SalonName"));
        assert_eq!(seg.get(Platform::X), Some("軽やかな目元に。 #SalonName"));
        assert!(seg.missing.is_empty());
    }

    #[test]
    fn json_inside_fence_with_preamble() {
        let raw = "こちらが投稿文です。\n```json\n{\n  \"instagram\": \"  本文A  \",\n  \"twitter\": \"本文B\"\n}\n```\n";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A"));
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }

    #[test]
    fn json_without_known_keys_falls_through_to_markers() {
        let raw = "{\"caption\": \"???\"}\n▼Instagram用\n本文A\n▼X用\n本文B";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.shape, SegmentShape::Markers);
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }

    #[test]
    fn json_missing_key_is_reported_missing() {
        let raw = r#"{"instagram": "本文A"}"#;
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A"));
        assert_eq!(seg.get(Platform::X), None);
        assert!(seg.is_missing(Platform::X));
    }

    #[test]
    fn markers_split_sections() {
        let raw = "投稿文を作成しました。▼Instagram用  本文A  ▼X用  本文B  ";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.shape, SegmentShape::Markers);
        assert_eq!(seg.get(Platform::Instagram), Some("本文A"));
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }

    #[test]
    fn only_instagram_marker_reports_x_missing() {
        let raw = "▼Instagram用\n自然な仕上がりに。\n#SalonName";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("自然な仕上がりに。\n#SalonName"));
        assert_eq!(seg.missing, vec![Platform::X]);
        assert_eq!(seg.get(Platform::X), None);
    }

    #[test]
    fn empty_section_is_not_missing() {
        let raw = "▼Instagram用\n本文A\n▼X用\n";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::X), Some(""));
        assert!(!seg.is_missing(Platform::X));
    }

    #[test]
    fn malformed_response_is_parse_failure() {
        let raw = "申し訳ありませんが、この画像についてはお手伝いできません。";
        let err = segment(raw, BOTH).unwrap_err();
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn empty_and_brace_only_inputs_do_not_panic() {
        for raw in ["", "{", "}", "}{", "{}", "▼", "【", "x", "▼Ｘ"] {
            let _ = segment(raw, BOTH);
        }
        assert!(segment("}{", BOTH).is_err());
    }

    #[test]
    fn unrequested_section_does_not_leak() {
        let raw = "▼Instagram用\n本文A\n#SalonName\n▼X用\n本文B";
        let seg = segment(raw, &[Platform::Instagram]).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A\n#SalonName"));
        assert_eq!(seg.get(Platform::X), None);
        assert!(seg.missing.is_empty());
    }

    #[test]
    fn sections_in_reverse_order() {
        let raw = "▼X用\n本文B\n▼Instagram用\n本文A";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A"));
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }

    #[test]
    fn bracket_and_colon_headings() {
        let raw = "【Instagram用】\n本文A\n\nX用：本文B";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A"));
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }

    #[test]
    fn bold_headings_leave_no_asterisks() {
        let raw = "**▼Instagram用**\n本文A\n\n**▼X用**\n本文B";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::X), Some("本文B"));
        assert!(seg.get(Platform::Instagram).unwrap().starts_with("本文A"));
    }

    #[test]
    fn platform_names_in_running_text_are_not_headings() {
        let raw = "▼Instagram用\n【X限定】のお知らせもあります。\nXmasのご予約はプロフィールから\n▼X用\n本文B";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(
            seg.get(Platform::Instagram),
            Some("【X限定】のお知らせもあります。\nXmasのご予約はプロフィールから")
        );
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }

    #[test]
    fn headings_only_for_unrequested_platform_is_parse_failure() {
        let raw = "▼X用\n本文B";
        assert!(segment(raw, &[Platform::Instagram]).is_err());
    }

    #[test]
    fn preamble_naming_platforms_is_dropped() {
        let raw = "Instagram用とX用の投稿文を作成しました。\n\n▼Instagram用\n本文A #SalonName\n▼X用\n本文B #SalonName";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A #SalonName"));
        assert_eq!(seg.get(Platform::X), Some("本文B #SalonName"));
    }

    #[test]
    fn bare_headings_after_bare_preamble() {
        let raw = "Instagram用とX用の文章です。\nInstagram用：\n本文A\nX用：\n本文B";
        let seg = segment(raw, BOTH).unwrap();
        assert_eq!(seg.get(Platform::Instagram), Some("本文A"));
        assert_eq!(seg.get(Platform::X), Some("本文B"));
    }
}
