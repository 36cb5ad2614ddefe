pub mod pdftoppm;
pub mod pdftotext;

use crate::error::RelayScanError;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in PDF points, origin at the top-left of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        BBox {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }
}

/// One word of the text layer with its box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSpan {
    pub text: String,
    pub bbox: BBox,
}

/// One text line of the text layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub line_index: usize,
    pub text: String,
    pub bbox: BBox,
    pub words: Vec<WordSpan>,
}

/// Text layer content of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub width_pt: f32,
    pub height_pt: f32,
    pub lines: Vec<TextLine>,
}

impl PageText {
    pub fn words(&self) -> impl Iterator<Item = &WordSpan> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }
}

/// Trait for text-layer backends (pixel-accurate boxes, not OCR).
pub trait TextLayer: Send + Sync {
    /// Extract the text layer of every page, in page order.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, RelayScanError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub page_number: usize,
    pub image: GrayImage,
    pub dpi: u32,
}

impl PageRaster {
    pub fn new(page_number: usize, image: GrayImage, dpi: u32) -> Self {
        PageRaster {
            page_number,
            image,
            dpi,
        }
    }

    /// Pixels per PDF point.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Trait for rasterization backends.
pub trait PageRasterizer: Send + Sync {
    /// Render one page (1-based) to grayscale at `dpi`.
    ///
    /// Failures must be reported as [`RelayScanError::Render`] so the
    /// pipeline can isolate them to the page.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<PageRaster, RelayScanError>;

    fn backend_name(&self) -> &str;
}
