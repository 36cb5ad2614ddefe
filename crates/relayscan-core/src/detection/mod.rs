//! Checkbox detection on rendered pages.
//!
//! Every strategy shares the same frame: adaptive binarization, candidate
//! regions from the strategy, removal of candidates that overlap masked text
//! or sit inside another candidate, then interior density and classification.

pub mod binarize;
pub mod calibrate;
pub mod contour;
pub mod mask;
pub mod template;

use crate::model::Checkbox;
use crate::profiles::schema::{ScanProfile, StrategyKind};
use binarize::{binarize, ink_fraction, IntegralImage};
use contour::ContourDensity;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use template::TemplateMatch;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The region shrunk by `margin` on every side, if anything is left.
    pub fn shrink(&self, margin: u32) -> Option<Region> {
        let both = margin.saturating_mul(2);
        if self.width <= both || self.height <= both {
            return None;
        }
        Some(Region::new(
            self.x + margin,
            self.y + margin,
            self.width - both,
            self.height - both,
        ))
    }
}

/// Detector settings resolved to pixels at the profile DPI.
#[derive(Debug, Clone)]
pub struct DetectorParams {
    pub min_size: f32,
    pub max_size: f32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    pub min_area: f32,
    pub shrink_margin: u32,
    pub block_size: u32,
    pub threshold_c: f32,
    pub density_threshold: f32,
    pub ambiguity_band: f32,
    pub template_max_score: f32,
}

impl DetectorParams {
    pub fn from_profile(profile: &ScanProfile) -> Self {
        let d = &profile.detector;
        DetectorParams {
            min_size: profile.px(d.min_size_px as f32),
            max_size: profile.px(d.max_size_px as f32),
            min_aspect: d.min_aspect,
            max_aspect: d.max_aspect,
            min_area: profile.px_area(d.min_area_px),
            shrink_margin: profile.shrink_margin(),
            block_size: profile.block_size(),
            threshold_c: d.threshold_c,
            density_threshold: d.density_threshold,
            ambiguity_band: d.ambiguity_band,
            template_max_score: d.template_max_score,
        }
    }

    /// Size and aspect filters shared by all strategies.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let (w, h) = (width as f32, height as f32);
        if w < self.min_size || w > self.max_size || h < self.min_size || h > self.max_size {
            return false;
        }
        let aspect = w / h;
        aspect >= self.min_aspect && aspect <= self.max_aspect
    }

    /// `(is_marked, ambiguous)`; marked only when strictly above the threshold.
    pub fn classify(&self, density: f32) -> (bool, bool) {
        let is_marked = density > self.density_threshold;
        let ambiguous = (density - self.density_threshold).abs() <= self.ambiguity_band;
        (is_marked, ambiguous)
    }

    /// Interior density of `region`, excluding the drawn border.
    pub fn interior_density(&self, ink: &IntegralImage, region: &Region) -> Option<f32> {
        let inner = region.shrink(self.shrink_margin)?;
        ink_fraction(ink, inner.x, inner.y, inner.right(), inner.bottom())
    }

    fn measure(&self, ink: &IntegralImage, region: Region, page: usize) -> Option<Checkbox> {
        let Some(density) = self.interior_density(ink, &region) else {
            tracing::debug!(?region, "candidate has no interior after shrinking");
            return None;
        };
        let (is_marked, ambiguous) = self.classify(density);
        Some(Checkbox {
            x_px: region.x,
            y_px: region.y,
            width_px: region.width,
            height_px: region.height,
            density,
            is_marked,
            ambiguous,
            page,
        })
    }
}

/// Pluggable checkbox detection, selected by the profile.
#[derive(Debug, Clone)]
pub enum DetectionStrategy {
    ContourDensity(ContourDensity),
    TemplateMatch(TemplateMatch),
}

impl DetectionStrategy {
    pub fn from_profile(profile: &ScanProfile) -> Self {
        let params = DetectorParams::from_profile(profile);
        match profile.detector.strategy {
            StrategyKind::ContourDensity => {
                DetectionStrategy::ContourDensity(ContourDensity::new(params))
            }
            StrategyKind::TemplateMatch => {
                DetectionStrategy::TemplateMatch(TemplateMatch::new(params))
            }
        }
    }

    pub fn params(&self) -> &DetectorParams {
        match self {
            DetectionStrategy::ContourDensity(s) => &s.params,
            DetectionStrategy::TemplateMatch(s) => &s.params,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectionStrategy::ContourDensity(_) => "contour_density",
            DetectionStrategy::TemplateMatch(_) => "template_match",
        }
    }

    /// Detect and classify every checkbox candidate on a grayscale page.
    ///
    /// Candidates overlapping `masked` regions are discarded. The result is
    /// ordered top-to-bottom, left-to-right, and is empty (not an error) when
    /// nothing qualifies.
    pub fn detect(&self, gray: &GrayImage, page: usize, masked: &[Region]) -> Vec<Checkbox> {
        let params = self.params();
        let binary = binarize(gray, params.block_size, params.threshold_c);

        let regions = match self {
            DetectionStrategy::ContourDensity(s) => s.candidates(&binary),
            DetectionStrategy::TemplateMatch(s) => s.candidates(&binary),
        };
        let found = regions.len();

        let regions: Vec<Region> = regions
            .into_iter()
            .filter(|r| !masked.iter().any(|m| m.intersects(r)))
            .collect();
        let regions = suppress_nested(regions);

        let ink = IntegralImage::of_ink(&binary);
        let mut boxes: Vec<Checkbox> = regions
            .into_iter()
            .filter_map(|r| params.measure(&ink, r, page))
            .collect();
        boxes.sort_by_key(|b| (b.y_px, b.x_px, b.width_px, b.height_px));

        tracing::debug!(
            page,
            strategy = self.name(),
            candidates = found,
            checkboxes = boxes.len(),
            marked = boxes.iter().filter(|b| b.is_marked).count(),
            "checkbox detection finished"
        );
        boxes
    }
}

/// Drop duplicates and regions lying inside another region.
///
/// The drawn mark inside a box forms its own contour; it is not a second box.
fn suppress_nested(mut regions: Vec<Region>) -> Vec<Region> {
    regions.sort_by(|a, b| b.area().cmp(&a.area()).then(a.cmp(b)));
    let mut kept: Vec<Region> = Vec::with_capacity(regions.len());
    for r in regions {
        if !kept.iter().any(|k| k.contains(&r)) {
            kept.push(r);
        }
    }
    kept
}
