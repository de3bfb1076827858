//! Layout stage: [`SummaryResult`] + style + icons → SVG render tree.
//!
//! The canvas is a fixed 1080×1920 portrait page. The title sits at the top,
//! centred; each insight is one row with the icon on the left and the
//! headline and description in a text column on the right.
//!
//! ```text
//!   ┌──────────────── 1080 ────────────────┐
//!   │  60                                   │
//!   │            TITLE (wrapped)            │
//!   │  40                                   │
//!   │ 80 ┌──────┐ 40 Headline           80  │
//!   │    │ icon │    Description wraps…     │
//!   │    └──────┘                           │
//!   │  30                                   │
//!   │    ┌──────┐    Headline               │
//!   │    …                                  │
//!   └───────────────────────────────────────┘
//! ```
//!
//! There is no font engine here, so wrapping uses an average glyph width of
//! `0.55 × font-size`. Rows that would run past the bottom padding are
//! clipped by a `clipPath` rather than shrunk.

use crate::output::{IconArtifact, SummaryResult};
use crate::style::{Background, Corner, StylePreset, StyleTheme, TextStyle};
use tracing::debug;

pub const CANVAS_WIDTH: u32 = 1080;
pub const CANVAS_HEIGHT: u32 = 1920;

const PAD_Y: f32 = 60.0;
const PAD_X: f32 = 80.0;
const TITLE_GAP: f32 = 40.0;
const ICON_SIZE: f32 = 128.0;
const ICON_FRAME_PAD: f32 = 20.0;
const ICON_TEXT_GAP: f32 = 40.0;
const ROW_PAD_Y: f32 = 20.0;
const ROW_GAP: f32 = 30.0;
const HEADLINE_GAP: f32 = 8.0;

/// Average advance of one glyph as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.55;

/// Build the complete SVG document for one infographic.
///
/// `icons[i]` is drawn next to `summary.insights[i]`; a missing icon leaves
/// the frame empty.
pub fn render_tree(summary: &SummaryResult, style: StylePreset, icons: &[IconArtifact]) -> String {
    let theme = style.theme();
    let width = CANVAS_WIDTH as f32;
    let height = CANVAS_HEIGHT as f32;
    let content_width = width - 2.0 * PAD_X;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT
    );
    svg.push_str(&defs(theme));

    let fill = match theme.background {
        Background::Solid(color) => escape_xml(color),
        Background::LinearGradient { .. } => "url(#bg)".to_string(),
    };
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{width}" height="{height}" fill="{fill}"/>"#
    ));

    // Title
    let mut cursor = PAD_Y;
    if !summary.title.trim().is_empty() {
        let lines = wrap_text(
            &cased(&summary.title, &theme.title),
            content_width,
            theme.title.size,
            theme.title.letter_spacing,
        );
        let (block, title_height) =
            text_block(width / 2.0, cursor, &lines, &theme.title, theme, "middle");
        svg.push_str(&block);
        cursor += title_height + TITLE_GAP;
    }

    // Rows
    svg.push_str(r#"<g clip-path="url(#content)">"#);
    for (index, insight) in summary.insights.iter().enumerate() {
        let row_x = PAD_X;
        let frame_size = ICON_SIZE + 2.0 * ICON_FRAME_PAD;
        let frame_x = row_x + theme.row.padding_x;
        let text_x = frame_x + frame_size + ICON_TEXT_GAP;
        let text_width = content_width - 2.0 * theme.row.padding_x - frame_size - ICON_TEXT_GAP;

        let headline = wrap_text(
            &cased(&insight.title, &theme.insight_title),
            text_width,
            theme.insight_title.size,
            theme.insight_title.letter_spacing,
        );
        let description = wrap_text(
            &cased(&insight.description, &theme.insight_description),
            text_width,
            theme.insight_description.size,
            theme.insight_description.letter_spacing,
        );

        let headline_height = block_height(headline.len(), &theme.insight_title);
        let description_height = block_height(description.len(), &theme.insight_description);
        let text_height = if description.is_empty() {
            headline_height
        } else {
            headline_height + HEADLINE_GAP + description_height
        };

        let inner_height = frame_size.max(text_height);
        let row_height = inner_height + 2.0 * ROW_PAD_Y;
        let row_top = cursor;

        if let Some(card) = theme.row.fill {
            svg.push_str(&format!(
                r#"<rect x="{row_x}" y="{row_top:.1}" width="{content_width}" height="{row_height:.1}" rx="{r}" fill="{fill}"/>"#,
                r = theme.row.radius,
                fill = escape_xml(card),
            ));
        }
        if let Some(rule) = theme.row.top_rule {
            svg.push_str(&format!(
                r#"<line x1="{row_x}" y1="{row_top:.1}" x2="{x2}" y2="{row_top:.1}" stroke="{c}" stroke-width="{sw}"/>"#,
                x2 = row_x + content_width,
                c = escape_xml(rule.color),
                sw = rule.width,
            ));
        }

        let frame_y = row_top + ROW_PAD_Y + (inner_height - frame_size) / 2.0;
        svg.push_str(&icon_frame(theme, frame_x, frame_y, frame_size));
        if let Some(icon) = icons.get(index) {
            svg.push_str(&format!(
                r#"<image x="{x}" y="{y:.1}" width="{ICON_SIZE}" height="{ICON_SIZE}" preserveAspectRatio="xMidYMid meet" href="{href}"/>"#,
                x = frame_x + ICON_FRAME_PAD,
                y = frame_y + ICON_FRAME_PAD,
                href = icon.to_data_url(),
            ));
        }

        let text_top = row_top + ROW_PAD_Y + (inner_height - text_height) / 2.0;
        let (block, _) = text_block(text_x, text_top, &headline, &theme.insight_title, theme, "start");
        svg.push_str(&block);
        if !description.is_empty() {
            let (block, _) = text_block(
                text_x,
                text_top + headline_height + HEADLINE_GAP,
                &description,
                &theme.insight_description,
                theme,
                "start",
            );
            svg.push_str(&block);
        }

        cursor = row_top + row_height + ROW_GAP;
    }
    svg.push_str("</g></svg>");

    if cursor - ROW_GAP > height - PAD_Y {
        debug!("Layout overflows canvas by {:.0}px; rows clipped", cursor - ROW_GAP - (height - PAD_Y));
    }
    debug!(
        "Rendered {} insights into {} bytes of SVG",
        summary.insights.len(),
        svg.len()
    );
    svg
}

fn defs(theme: &StyleTheme) -> String {
    let mut defs = String::from("<defs>");
    if let Background::LinearGradient { from, to } = theme.background {
        defs.push_str(&format!(
            r#"<linearGradient id="bg" x1="0" y1="0" x2="1" y2="1"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
            escape_xml(from),
            escape_xml(to)
        ));
    }
    if theme.icon_frame.shadow {
        defs.push_str(
            r#"<filter id="shadow" x="-20%" y="-20%" width="140%" height="140%"><feDropShadow dx="0" dy="6" stdDeviation="8" flood-opacity="0.25"/></filter>"#,
        );
    }
    defs.push_str(&format!(
        r#"<clipPath id="content"><rect x="0" y="0" width="{}" height="{}"/></clipPath>"#,
        CANVAS_WIDTH,
        CANVAS_HEIGHT as f32 - PAD_Y
    ));
    defs.push_str("</defs>");
    defs
}

fn icon_frame(theme: &StyleTheme, x: f32, y: f32, size: f32) -> String {
    let frame = theme.icon_frame;
    if frame.fill.is_none() && frame.stroke.is_none() && !frame.shadow {
        return String::new();
    }

    let mut attrs = format!(
        r#" fill="{}""#,
        escape_xml(frame.fill.unwrap_or(if frame.shadow { "#ffffff" } else { "none" }))
    );
    if let Some(stroke) = frame.stroke {
        attrs.push_str(&format!(
            r#" stroke="{}" stroke-width="{}""#,
            escape_xml(stroke.color),
            stroke.width
        ));
    }
    if frame.shadow {
        attrs.push_str(r#" filter="url(#shadow)""#);
    }

    match frame.corner {
        Corner::Circle => format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}"{attrs}/>"#,
            x + size / 2.0,
            y + size / 2.0,
            size / 2.0
        ),
        Corner::Rounded(radius) => format!(
            r#"<rect x="{x:.1}" y="{y:.1}" width="{size}" height="{size}" rx="{radius}"{attrs}/>"#
        ),
    }
}

/// One `<text>` element with a `<tspan>` per line. Returns the markup and
/// the block height.
fn text_block(
    x: f32,
    top: f32,
    lines: &[String],
    style: &TextStyle,
    theme: &StyleTheme,
    anchor: &str,
) -> (String, f32) {
    if lines.is_empty() {
        return (String::new(), 0.0);
    }

    let line_height = style.size * style.line_height;
    let first_baseline = top + (line_height - style.size) / 2.0 + style.size * 0.8;
    let family = style.font_family.unwrap_or(theme.font_family);
    let color = style.color.unwrap_or(theme.text_color);

    let mut out = format!(
        r#"<text x="{x:.1}" y="{first_baseline:.1}" font-family="{}" font-size="{}" font-weight="{}" fill="{}" text-anchor="{anchor}""#,
        escape_xml(family),
        style.size,
        style.weight,
        escape_xml(color),
    );
    if style.letter_spacing != 0.0 {
        out.push_str(&format!(r#" letter-spacing="{}""#, style.letter_spacing));
    }
    if style.opacity < 1.0 {
        out.push_str(&format!(r#" opacity="{}""#, style.opacity));
    }
    out.push('>');

    for (i, line) in lines.iter().enumerate() {
        let dy = if i == 0 { 0.0 } else { line_height };
        out.push_str(&format!(
            r#"<tspan x="{x:.1}" dy="{dy:.1}">{}</tspan>"#,
            escape_xml(line)
        ));
    }
    out.push_str("</text>");

    (out, block_height(lines.len(), style))
}

fn block_height(lines: usize, style: &TextStyle) -> f32 {
    lines as f32 * style.size * style.line_height
}

fn cased(text: &str, style: &TextStyle) -> String {
    if style.uppercase {
        text.to_uppercase()
    } else {
        text.to_string()
    }
}

/// Greedy word wrap against an estimated advance width.
///
/// A single word wider than `max_width` gets a line of its own and is not
/// broken. Whitespace runs collapse to one space.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, letter_spacing: f32) -> Vec<String> {
    let advance = (font_size * GLYPH_WIDTH + letter_spacing).max(1.0);
    let max_chars = ((max_width / advance).floor() as usize).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
