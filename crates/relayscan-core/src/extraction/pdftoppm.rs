use crate::error::RelayScanError;
use crate::extraction::{PageRaster, PageRasterizer};
use image::ImageFormat;
use std::io::Write;
use std::process::Command;

/// Rasterization backend using pdftoppm (from poppler-utils).
///
/// Renders one page at a time as 8-bit grayscale PGM on stdout.
pub struct PdftoppmRasterizer;

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        PdftoppmRasterizer
    }

    /// Check if pdftoppm is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftoppm")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<PageRaster, RelayScanError> {
        let render_err = |reason: String| RelayScanError::Render {
            page: page_number,
            reason,
        };

        // Each call gets its own temp file so pages can render concurrently.
        let mut tmpfile = tempfile::NamedTempFile::new().map_err(|e| render_err(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| render_err(e.to_string()))?;

        let page_arg = page_number.to_string();
        let output = Command::new("pdftoppm")
            .arg("-gray")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg(tmpfile.path())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RelayScanError::PdftoppmNotFound
                } else {
                    render_err(format!("pdftoppm failed: {e}"))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(render_err(format!(
                "pdftoppm exited with {code}: {}",
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(render_err("pdftoppm produced no image".into()));
        }

        let image = image::load_from_memory_with_format(&output.stdout, ImageFormat::Pnm)
            .map_err(|e| render_err(format!("undecodable raster: {e}")))?
            .into_luma8();

        tracing::debug!(
            page = page_number,
            dpi,
            width = image.width(),
            height = image.height(),
            "rendered page"
        );

        Ok(PageRaster::new(page_number, image, dpi))
    }

    fn backend_name(&self) -> &str {
        "pdftoppm"
    }
}
