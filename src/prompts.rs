//! Prompts for the AI summarization stage.
//!
//! Every prompt lives here so the wording can change without touching the
//! retry or parsing logic in [`crate::pipeline::summarize`], and so tests
//! can inspect prompts directly without a live model.
//!
//! Icon prompts are per style and live in [`crate::style`].

/// System prompt asking for the infographic JSON structure.
///
/// The key names must match what [`crate::pipeline::summarize::parse_summary_response`]
/// expects.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert content analyst. A user has provided a block of text, likely a transcript from a video or an article.
Your task is to analyze this text and structure it for a vertical infographic.

Based on the provided text, generate:
1. A short, compelling title for the entire text (max 10 words).
2. A list of 3 to 4 of the most important key insights from the text.

For each insight, provide:
- "title": a short, impactful title (3-6 words).
- "description": a brief, one-sentence description summarizing the point.
- "icon_keyword": a single, simple keyword that represents the insight's core concept (e.g. 'idea', 'growth', 'strategy', 'goal') for icon generation.

Respond ONLY with a valid JSON object of this exact shape:
{"sourceData": {"title": "..."}, "insights": [{"title": "...", "description": "...", "icon_keyword": "..."}]}

Do not include any other text, markdown formatting, or explanations."#;

/// Build the user message carrying the text to analyse.
pub fn summary_user_message(text: &str) -> String {
    format!("TEXT TO ANALYZE:\n\n{}", text)
}
