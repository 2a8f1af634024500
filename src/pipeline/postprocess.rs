//! Post-processing: deterministic cleanup of LLM-generated Markdown.
//!
//! Even well-prompted models occasionally wrap the whole answer in
//! ` ```markdown ... ``` ` fences, emit Windows line endings, or leak
//! zero-width characters copied from the template text. These rules fix
//! such artefacts before the text reaches the document builder.
//!
//! Unlike a general Markdown linter, nothing here rewrites table
//! structure: header detection in [`crate::pipeline::builder`] depends on
//! the separator rows exactly as the model wrote them.
//!
//! ## Rule Order
//!
//! Fences are stripped first so the fence regex sees the raw answer, then
//! line endings are normalised before per-line trimming.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the concatenated generation.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences wrapping the entire answer
/// 2. Normalise line endings (CRLF/CR → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 4. Trim trailing whitespace per line
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    trim_trailing_whitespace(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_inner_code_block_untouched() {
        let input = "# Plan\n\n```\ncode\n```\n\nAfter";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_separator_rows_preserved() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |\n| --- | --- |\n| 3 | 4 |";
        assert_eq!(clean_markdown(input), input);
    }

    #[test]
    fn test_clean_markdown_full_pipeline() {
        let input = "```markdown\r\n# Title\r\n\r\nSome text   \r\n| A | B |\r\n```";
        let result = clean_markdown(input);
        assert_eq!(result, "# Title\n\nSome text\n| A | B |");
    }
}
