//! Export stage: write the finished infographic to disk.
//!
//! | Format | Source            | Writer                                   |
//! |--------|-------------------|------------------------------------------|
//! | PNG    | captured raster   | `image` PNG encoder                       |
//! | PDF    | captured raster   | pdfium: one page, image fills the page    |
//! | SVG    | render tree       | written verbatim, no capture needed       |
//!
//! Every writer goes through a sibling `*.tmp` file and a rename, so a
//! crash never leaves a half-written infographic at the target path.
//!
//! The PDF page is sized 1 px → 1 pt from the captured image, so a 2× capture
//! yields a 2160 × 3840 pt page. pdfium is bound through `pdfium-auto`,
//! which downloads and caches the library on first use.

use crate::error::InfographicError;
use crate::pipeline::encode::encode_png;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// File format of the exported infographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Pdf,
    Svg,
}

impl ExportFormat {
    /// Infer the format from a file extension. Unknown or missing
    /// extensions yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Svg => "svg",
        }
    }

    /// Whether the format needs the captured raster.
    pub fn needs_capture(self) -> bool {
        !matches!(self, ExportFormat::Svg)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "pdf" => Ok(ExportFormat::Pdf),
            "svg" => Ok(ExportFormat::Svg),
            other => Err(format!("unknown format '{other}' (expected png, pdf or svg)")),
        }
    }
}

/// Encode `image` as PNG and write it to `path`.
pub async fn write_png(image: &DynamicImage, path: &Path) -> Result<(), InfographicError> {
    let bytes = encode_png(image).map_err(|e| InfographicError::ExportFailed {
        format: "PNG",
        detail: e.to_string(),
    })?;
    write_atomic(path, &bytes).await?;
    info!("Wrote PNG: {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Write the SVG render tree to `path`.
pub async fn write_svg(svg: &str, path: &Path) -> Result<(), InfographicError> {
    write_atomic(path, svg.as_bytes()).await?;
    info!("Wrote SVG: {} ({} bytes)", path.display(), svg.len());
    Ok(())
}

/// Place `image` on a single PDF page of the same size and write it to
/// `path`. pdfium runs on the blocking pool.
pub async fn write_pdf(image: &DynamicImage, path: &Path) -> Result<(), InfographicError> {
    prepare_parent(path).await?;
    let tmp = tmp_path(path);
    let image = image.clone();
    let tmp_for_task = tmp.clone();

    tokio::task::spawn_blocking(move || write_pdf_blocking(&image, &tmp_for_task))
        .await
        .map_err(|e| InfographicError::Internal(format!("PDF task panicked: {}", e)))??;

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| InfographicError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    info!("Wrote PDF: {}", path.display());
    Ok(())
}

fn write_pdf_blocking(image: &DynamicImage, path: &Path) -> Result<(), InfographicError> {
    let pdfium =
        pdfium_auto::bind_pdfium_silent().map_err(|e| InfographicError::PdfEngine(e.to_string()))?;

    let pdf_error = |e: PdfiumError| InfographicError::ExportFailed {
        format: "PDF",
        detail: format!("{:?}", e),
    };

    let width = PdfPoints::new(image.width() as f32);
    let height = PdfPoints::new(image.height() as f32);

    let mut document = pdfium.create_new_pdf().map_err(pdf_error)?;
    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(width, height))
            .map_err(pdf_error)?;
        page.objects_mut()
            .create_image_object(
                PdfPoints::ZERO,
                PdfPoints::ZERO,
                image,
                Some(width),
                Some(height),
            )
            .map_err(pdf_error)?;
    }

    document.save_to_file(path).map_err(pdf_error)?;
    debug!(
        "PDF page {}x{} pt written to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

/// Atomic write: temp file beside the target, then rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), InfographicError> {
    prepare_parent(path).await?;
    let tmp = tmp_path(path);
    let to_error = |e: std::io::Error| InfographicError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    tokio::fs::write(&tmp, bytes).await.map_err(to_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(to_error)
}

async fn prepare_parent(path: &Path) -> Result<(), InfographicError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InfographicError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.png")), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.PDF")), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::from_path(Path::new("x.svg")), Some(ExportFormat::Svg));
        assert_eq!(ExportFormat::from_path(Path::new("x.jpg")), None);
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn svg_skips_capture() {
        assert!(!ExportFormat::Svg.needs_capture());
        assert!(ExportFormat::Png.needs_capture());
        assert!(ExportFormat::Pdf.needs_capture());
    }

    #[test]
    fn tmp_path_is_sibling() {
        assert_eq!(tmp_path(Path::new("/x/out.png")), PathBuf::from("/x/out.png.tmp"));
    }

    #[tokio::test]
    async fn png_written_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 5, Rgba([1, 2, 3, 255])));

        write_png(&img, &path).await.unwrap();

        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (3, 5));
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn svg_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.svg");
        write_svg("<svg/>", &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
    }

    #[tokio::test]
    async fn pdf_export_e2e() {
        if std::env::var("E2E_ENABLED").is_err() {
            eprintln!("Skipping: set E2E_ENABLED=1 to exercise pdfium");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(108, 192, Rgba([0, 0, 0, 255])));
        write_pdf(&img, &path).await.unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"%PDF");
    }
}
