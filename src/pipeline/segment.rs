//! Local segmentation: raw text → title + insights, without any AI call.
//!
//! This is the deterministic fallback for the summarization stage. It is a
//! pure function of its input: no I/O, no randomness, no shared state, and
//! it never fails. Empty input produces placeholder content so downstream
//! stages always have something to lay out.
//!
//! ## Rules
//!
//! ```text
//! Title line                 ──▶ summary.title
//!                             (blank line)
//! First paragraph …          ──▶ insight 1  title = first 6 words + "..."
//!                             (blank line)   description = paragraph
//! Second paragraph …         ──▶ insight 2
//! ```
//!
//! When the text under the title has no blank lines at all it is read as a
//! list, and every non-empty line becomes an insight with an empty
//! description.

use crate::output::{InsightRecord, SummaryResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Hard upper bound on insights per infographic.
pub const MAX_INSIGHTS: usize = 4;

/// Number of words kept in a paragraph-derived insight title.
pub const TITLE_WORDS: usize = 6;

/// Appended to an insight title cut at [`TITLE_WORDS`].
pub const TRUNCATION_MARKER: &str = "...";

/// Title used when the first line is unusable.
pub const DEFAULT_TITLE: &str = "Key Insights";

/// Title of the placeholder summary returned for empty input.
pub const PLACEHOLDER_TITLE: &str = "Your Title Here";

const PLACEHOLDER_DESCRIPTION: &str = "Describe your key point here.";

const PLACEHOLDER_INSIGHTS: [&str; 3] = [
    "Your First Insight",
    "Your Second Insight",
    "Your Third Insight",
];

/// One or more whitespace-only lines.
static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Segment `text` with the default cap of [`MAX_INSIGHTS`] insights.
pub fn segment(text: &str) -> SummaryResult {
    segment_with_limit(text, MAX_INSIGHTS)
}

/// Segment `text`, keeping at most `max_insights` insights.
///
/// `max_insights` is clamped to `1..=MAX_INSIGHTS`.
pub fn segment_with_limit(text: &str, max_insights: usize) -> SummaryResult {
    let limit = max_insights.clamp(1, MAX_INSIGHTS);
    let normalised = text.replace("\r\n", "\n");
    let trimmed = normalised.trim();

    if trimmed.is_empty() {
        return placeholder(limit);
    }

    // After the outer trim the first line is guaranteed non-empty.
    let (first_line, body) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let title = match first_line.trim() {
        "" => DEFAULT_TITLE.to_string(),
        t => t.to_string(),
    };

    let insights = if has_paragraph_breaks(body) {
        paragraph_insights(body, limit)
    } else {
        line_insights(body, limit)
    };

    SummaryResult { title, insights }
}

/// Placeholder content for empty input: three generic insights.
pub fn placeholder(limit: usize) -> SummaryResult {
    SummaryResult {
        title: PLACEHOLDER_TITLE.to_string(),
        insights: PLACEHOLDER_INSIGHTS
            .iter()
            .take(limit)
            .map(|t| InsightRecord::new(*t, PLACEHOLDER_DESCRIPTION))
            .collect(),
    }
}

fn has_paragraph_breaks(body: &str) -> bool {
    body.lines().any(|l| l.trim().is_empty())
}

fn paragraph_insights(body: &str, limit: usize) -> Vec<InsightRecord> {
    RE_PARAGRAPH_BREAK
        .split(body)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(limit)
        .map(insight_from_paragraph)
        .collect()
}

fn line_insights(body: &str, limit: usize) -> Vec<InsightRecord> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(limit)
        .map(|l| InsightRecord::new(l, ""))
        .collect()
}

fn insight_from_paragraph(paragraph: &str) -> InsightRecord {
    InsightRecord::new(short_title(paragraph), paragraph)
}

/// First [`TITLE_WORDS`] whitespace tokens, plus the marker if any were cut.
pub fn short_title(paragraph: &str) -> String {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    let mut title = words
        .iter()
        .take(TITLE_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > TITLE_WORDS {
        title.push_str(TRUNCATION_MARKER);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_placeholder() {
        for input in ["", "   \n  \n", "\t\r\n \r\n"] {
            let s = segment(input);
            assert_eq!(s.title, PLACEHOLDER_TITLE, "input {input:?}");
            assert_eq!(s.insights.len(), 3);
            for rec in &s.insights {
                assert!(!rec.title.is_empty());
                assert_eq!(rec.description, PLACEHOLDER_DESCRIPTION);
                assert!(rec.keyword.is_empty());
            }
        }
    }

    #[test]
    fn placeholder_respects_lower_limit() {
        assert_eq!(segment_with_limit("", 2).insights.len(), 2);
    }

    #[test]
    fn title_and_two_paragraphs() {
        let s = segment("Title Line\n\nFirst paragraph text.\n\nSecond paragraph text.");
        assert_eq!(s.title, "Title Line");
        assert_eq!(s.insights.len(), 2);
        assert_eq!(s.insights[0].description, "First paragraph text.");
        assert_eq!(s.insights[1].description, "Second paragraph text.");
        assert_eq!(s.insights[0].title, "First paragraph text.");
    }

    #[test]
    fn more_than_four_paragraphs_keeps_first_four() {
        let text = "T\n\np1\n\np2\n\np3\n\np4\n\np5\n\np6";
        let s = segment(text);
        let descs: Vec<&str> = s.insights.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(descs, vec!["p1", "p2", "p3", "p4"]);
        assert_eq!(segment(text), s);
    }

    #[test]
    fn configurable_limit() {
        let s = segment_with_limit("T\n\np1\n\np2\n\np3", 2);
        assert_eq!(s.insights.len(), 2);
        // Out-of-range limits are clamped.
        assert_eq!(segment_with_limit("T\n\na\n\nb\n\nc\n\nd\n\ne", 99).insights.len(), 4);
        assert_eq!(segment_with_limit("T\n\na\n\nb", 0).insights.len(), 1);
    }

    #[test]
    fn six_tokens_not_truncated() {
        let s = segment("T\n\none two three four five six");
        assert_eq!(s.insights[0].title, "one two three four five six");
    }

    #[test]
    fn seven_tokens_truncated() {
        let s = segment("T\n\none two three four five six seven");
        assert_eq!(s.insights[0].title, "one two three four five six...");
        assert_eq!(s.insights[0].description, "one two three four five six seven");
    }

    #[test]
    fn title_collapses_internal_whitespace() {
        assert_eq!(short_title("a\n b\t\tc"), "a b c");
    }

    #[test]
    fn contiguous_lines_fall_back_to_per_line() {
        let s = segment("Title\nLineA\nLineB\nLineC");
        assert_eq!(s.title, "Title");
        assert_eq!(s.insights.len(), 3);
        let titles: Vec<&str> = s.insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["LineA", "LineB", "LineC"]);
        assert!(s.insights.iter().all(|i| i.description.is_empty()));
    }

    #[test]
    fn per_line_fallback_trims_and_caps() {
        let s = segment("Title\n  a  \nb\nc\nd\ne");
        let titles: Vec<&str> = s.insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn title_only() {
        let s = segment("  Just a title  ");
        assert_eq!(s.title, "Just a title");
        assert!(s.insights.is_empty());
    }

    #[test]
    fn multiple_blank_lines_are_one_boundary() {
        let s = segment("T\n\n\n   \n\npara one\nstill one\n\n \t \npara two");
        assert_eq!(s.insights.len(), 2);
        assert_eq!(s.insights[0].description, "para one\nstill one");
        assert_eq!(s.insights[1].description, "para two");
    }

    #[test]
    fn crlf_input() {
        let s = segment("Title\r\n\r\nFirst.\r\n\r\nSecond.\r\n");
        assert_eq!(s.title, "Title");
        assert_eq!(s.insights.len(), 2);
        assert_eq!(s.insights[1].description, "Second.");
    }

    #[test]
    fn keywords_always_empty() {
        let s = segment("T\n\nalpha beta\n\ngamma");
        assert!(s.insights.iter().all(|i| i.keyword.is_empty()));
    }

    #[test]
    fn insight_count_always_in_range() {
        let inputs = [
            "",
            "x",
            "x\ny",
            "x\n\ny",
            "x\n\n\n\n",
            "a\n\nb\n\nc\n\nd\n\ne\n\nf\n\ng",
            "a\nb\nc\nd\ne\nf\ng\nh",
        ];
        for input in inputs {
            let n = segment(input).insights.len();
            assert!(n <= MAX_INSIGHTS, "{input:?} produced {n}");
        }
    }
}
