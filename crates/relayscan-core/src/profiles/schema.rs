use crate::model::VendorFamily;
use serde::{Deserialize, Serialize};

/// DPI at which every pixel-valued setting is expressed.
pub const REFERENCE_DPI: u32 = 300;

/// Per vendor/scan-quality configuration passed through the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    /// Grammar of the text layer. `None` detects it per document.
    #[serde(default)]
    pub vendor_family: Option<VendorFamily>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub masking: MaskingConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub parallelism: ParallelismConfig,
}

fn default_dpi() -> u32 {
    REFERENCE_DPI
}

impl ScanProfile {
    /// Scale factor between rendered pixels and PDF points.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }

    /// Convert a length given at [`REFERENCE_DPI`] to pixels at the profile DPI.
    pub fn px(&self, reference_px: f32) -> f32 {
        reference_px * self.dpi as f32 / REFERENCE_DPI as f32
    }

    /// Convert an area given at [`REFERENCE_DPI`] to square pixels at the profile DPI.
    pub fn px_area(&self, reference_area: f32) -> f32 {
        let ratio = self.dpi as f32 / REFERENCE_DPI as f32;
        reference_area * ratio * ratio
    }

    /// Adaptive threshold window in pixels, forced odd and at least 3.
    pub fn block_size(&self) -> u32 {
        let raw = self.px(self.detector.block_size_px as f32).round() as u32;
        let odd = if raw % 2 == 0 { raw + 1 } else { raw };
        odd.max(3)
    }

    pub fn shrink_margin(&self) -> u32 {
        self.px(self.detector.shrink_margin_px as f32).round() as u32
    }
}

impl Default for ScanProfile {
    fn default() -> Self {
        Self {
            name: "default".into(),
            description: None,
            version: "1".into(),
            vendor_family: None,
            dpi: REFERENCE_DPI,
            detector: DetectorConfig::default(),
            masking: MaskingConfig::default(),
            correlation: CorrelationConfig::default(),
            labels: LabelConfig::default(),
            parallelism: ParallelismConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    ContourDensity,
    TemplateMatch,
}

/// Checkbox geometry and classification settings.
///
/// Pixel values are at [`REFERENCE_DPI`] and scaled to the profile DPI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub strategy: StrategyKind,
    pub min_size_px: u32,
    pub max_size_px: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub min_area_px: f32,
    pub shrink_margin_px: u32,
    pub block_size_px: u32,
    pub threshold_c: f32,
    /// Calibrated per scan profile; a box is marked when density is strictly above it.
    pub density_threshold: f32,
    /// Half-width of the band around the threshold reported as ambiguous.
    pub ambiguity_band: f32,
    /// Highest hollow-square score accepted by the template strategy (0 is a perfect outline).
    pub template_max_score: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::ContourDensity,
            min_size_px: 8,
            max_size_px: 40,
            min_aspect: 0.7,
            max_aspect: 1.3,
            min_area_px: 50.0,
            shrink_margin_px: 3,
            block_size_px: 11,
            threshold_c: 2.0,
            density_threshold: 0.37,
            ambiguity_band: 0.03,
            template_max_score: 0.35,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    pub enabled: bool,
    pub padding_px: u32,
    /// Leave spans made only of checkbox glyphs (☐, ☒, …) unmasked.
    pub skip_checkbox_glyphs: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            padding_px: 1,
            skip_checkbox_glyphs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Window for one-code-one-checkbox layouts.
    pub tight_tolerance_pt: f32,
    /// Window for composite sections heading a run of sub-item checkboxes.
    pub wide_tolerance_pt: f32,
    /// How far below the checkbox centre a label line may start and still precede it.
    pub row_slack_pt: f32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            tight_tolerance_pt: 8.0,
            wide_tolerance_pt: 50.0,
            row_slack_pt: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Width of the strip right of a checkbox scanned for its label.
    pub search_width_px: u32,
    pub max_words: usize,
    pub max_chars: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            search_width_px: 200,
            max_words: 4,
            max_chars: 40,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelismConfig {
    /// Worker threads for page/document dispatch. `None` uses one per CPU.
    pub max_threads: Option<usize>,
}
