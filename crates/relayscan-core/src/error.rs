use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RelayScanError {
    #[error("text layer extraction failed: {0}")]
    TextLayer(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftoppm not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftoppmNotFound,

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("every page failed to render ({pages} page(s))")]
    AllPagesFailed { pages: usize },

    #[error("every document failed ({documents} document(s))")]
    AllDocumentsFailed { documents: usize },

    #[error("failed to parse settings export: {0}")]
    Parse(String),

    #[error("failed to load profile from {path}: {reason}")]
    ProfileLoad { path: PathBuf, reason: String },

    #[error("invalid profile: {0}")]
    ProfileInvalid(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("calibration failed: {0}")]
    Calibration(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayScanError {
    /// True for failures that only invalidate a single page.
    pub fn is_page_scoped(&self) -> bool {
        matches!(self, RelayScanError::Render { .. })
    }
}
