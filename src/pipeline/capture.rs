//! Capture stage: SVG render tree → raster image.
//!
//! Two [`Rasterizer`] implementations ship with the crate:
//!
//! * [`ResvgRasterizer`] (default) parses the tree with `usvg` and renders
//!   it in-process with `resvg`. Text uses the system fonts, loaded once per
//!   rasterizer.
//! * [`CommandRasterizer`] shells out to `rsvg-convert` or any program with
//!   the same flags. The SVG is written to a `TempDir`, converted there, and
//!   the PNG decoded back; the directory is removed when it drops.

use crate::error::InfographicError;
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Turns an SVG document into pixels.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    fn name(&self) -> &str;

    /// Render `svg` at `scale` × its intrinsic size.
    async fn rasterize(&self, svg: &str, scale: f32) -> Result<DynamicImage, InfographicError>;
}

// ── resvg ────────────────────────────────────────────────────────────────

/// In-process rasterizer backed by `resvg`.
#[derive(Clone)]
pub struct ResvgRasterizer {
    fontdb: Arc<fontdb::Database>,
}

impl ResvgRasterizer {
    /// Rasterizer using the fonts installed on this machine.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!("resvg: {} font faces loaded", db.len());
        Self::with_fonts(db)
    }

    /// Rasterizer using a caller-supplied font database.
    pub fn with_fonts(db: fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(db),
        }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResvgRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResvgRasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

#[async_trait]
impl Rasterizer for ResvgRasterizer {
    fn name(&self) -> &str {
        "resvg"
    }

    async fn rasterize(&self, svg: &str, scale: f32) -> Result<DynamicImage, InfographicError> {
        let svg = svg.to_string();
        let fontdb = Arc::clone(&self.fontdb);

        let image = tokio::task::spawn_blocking(move || render_svg(&svg, scale, fontdb))
            .await
            .map_err(|e| InfographicError::Internal(format!("Task join error: {e}")))??;

        info!("Captured {}x{} px", image.width(), image.height());
        Ok(image)
    }
}

fn render_svg(
    svg: &str,
    scale: f32,
    fontdb: Arc<fontdb::Database>,
) -> Result<DynamicImage, InfographicError> {
    let options = usvg::Options {
        fontdb,
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| InfographicError::CaptureFailed {
        detail: format!("invalid SVG: {e}"),
    })?;

    let size = tree
        .size()
        .to_int_size()
        .scale_by(scale)
        .ok_or_else(|| InfographicError::CaptureFailed {
            detail: format!("cannot scale canvas by {scale}"),
        })?;
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| InfographicError::CaptureFailed {
            detail: format!("cannot allocate {}x{} pixmap", size.width(), size.height()),
        })?;

    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied RGBA
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let buffer = RgbaImage::from_raw(size.width(), size.height(), rgba).ok_or_else(|| {
        InfographicError::CaptureFailed {
            detail: "pixmap size mismatch".into(),
        }
    })?;
    Ok(DynamicImage::ImageRgba8(buffer))
}

// ── External command ─────────────────────────────────────────────────────

/// Runs `<program> --zoom <scale> --format png --output out.png in.svg`.
///
/// Any program accepting `rsvg-convert`'s flags works.
#[derive(Debug, Clone)]
pub struct CommandRasterizer {
    program: String,
}

impl CommandRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Rasterizer for CommandRasterizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn rasterize(&self, svg: &str, scale: f32) -> Result<DynamicImage, InfographicError> {
        let dir = TempDir::new().map_err(|e| InfographicError::Internal(format!("tempdir: {e}")))?;
        let svg_path = dir.path().join("infographic.svg");
        let png_path = dir.path().join("infographic.png");

        tokio::fs::write(&svg_path, svg)
            .await
            .map_err(|e| InfographicError::Internal(format!("Failed to write temp SVG: {e}")))?;

        debug!("Running {} --zoom {}", self.program, scale);
        let output = Command::new(&self.program)
            .arg("--zoom")
            .arg(format!("{scale}"))
            .arg("--format")
            .arg("png")
            .arg("--output")
            .arg(&png_path)
            .arg(&svg_path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InfographicError::RasterizerNotFound {
                        program: self.program.clone(),
                    }
                } else {
                    InfographicError::CaptureFailed {
                        detail: format!("could not start {}: {e}", self.program),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InfographicError::CaptureFailed {
                detail: format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            });
        }

        let bytes = tokio::fs::read(&png_path)
            .await
            .map_err(|e| InfographicError::CaptureFailed {
                detail: format!("{} produced no image: {e}", self.program),
            })?;
        let image = image::load_from_memory(&bytes).map_err(|e| InfographicError::CaptureFailed {
            detail: format!("unreadable PNG from {}: {e}", self.program),
        })?;

        info!("Captured {}x{} px", image.width(), image.height());
        Ok(image)
    }
}
