//! Post-processing: deterministic cleanup of one segmented caption.
//!
//! Even well-prompted models add artefacts that are harmless to a reader
//! but annoying once pasted into an app: Markdown bold markers that
//! Instagram shows literally, Windows line endings, zero-width characters
//! copied from training data, trailing spaces. Each rule here is a small
//! pure function so it can be tested on its own.
//!
//! This runs on each caption *after* segmentation. The segmenter itself
//! never rewrites content beyond trimming.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one caption.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 3. Remove Markdown bold/heading markup
/// 4. Drop separator-only lines (`---`, `***`, `━━━`)
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ consecutive blank lines down to 1 blank line
/// 7. Trim the whole caption
pub fn clean_caption(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_markdown_markup(&s);
    let s = drop_separator_lines(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip Markdown markup ────────────────────────────────────────────
//
// `**text**` and `__text__` become `text`; a leading `#` heading marker
// followed by a space is dropped. Hashtags (`#word`, no space) are untouched.

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6} +").unwrap());

fn strip_markdown_markup(input: &str) -> String {
    let s = RE_BOLD.replace_all(input, "$1$2");
    RE_HEADING.replace_all(&s, "").to_string()
}

// ── Rule 4: Drop separator lines ─────────────────────────────────────────────
//
// Models put a rule between sections; after segmentation it ends up as the
// last line of the preceding caption.

fn is_separator(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && t.chars().all(|c| matches!(c, '-' | '*' | '=' | '_' | '━' | '─'))
}

fn drop_separator_lines(input: &str) -> String {
    input
        .lines()
        .filter(|line| !is_separator(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}
