//! Pipeline stages for text-to-infographic generation.
//!
//! Each submodule implements one step, so each can be tested alone and
//! swapped (another image API, another rasterizer) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ summarize ──▶ icons ──▶ layout ──▶ capture ──▶ export
//! (path/URL) (LLM|segment) (Imagen|   (SVG)    (resvg)   (PNG/PDF/SVG)
//!                          built-in)
//! ```
//!
//! 1. [`input`]     — read a file, URL or stdin into a `String`
//! 2. [`summarize`] — LLM summary with retry, or the local [`segment`]er
//! 3. [`icons`]     — one icon per insight; [`encode`] decodes API payloads
//! 4. [`layout`]    — deterministic 1080×1920 SVG render tree
//! 5. [`capture`]   — resvg (or an external program) turns the SVG into pixels
//! 6. [`export`]    — atomic PNG / SVG writes, PDF through pdfium

pub mod capture;
pub mod encode;
pub mod export;
pub mod icons;
pub mod input;
pub mod layout;
pub mod segment;
pub mod summarize;
