//! Density threshold calibration from labelled samples.
//!
//! Scan quality moves the marked/unmarked boundary, so thresholds are
//! derived per profile from hand-labelled boxes instead of being fixed.

use super::binarize::{binarize, IntegralImage};
use super::{DetectorParams, Region};
use crate::error::RelayScanError;
use image::imageops;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// A measured density with its ground-truth state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub density: f32,
    pub marked: bool,
}

/// A hand-labelled checkbox rectangle on a rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledRegion {
    pub page: usize,
    pub x_px: u32,
    pub y_px: u32,
    pub width_px: u32,
    pub height_px: u32,
    pub marked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub recommended_threshold: f32,
    /// Samples on the wrong side of the recommended threshold.
    pub misclassified: usize,
    pub total: usize,
    pub marked_mean: f32,
    pub unmarked_mean: f32,
    /// Midpoint between the two class means.
    pub midpoint: f32,
    /// Distance from the threshold to the closest sample.
    pub margin: f32,
}

/// Interior density of a labelled region, binarized exactly as detection does.
pub fn measure_region(
    gray: &GrayImage,
    region: &LabeledRegion,
    params: &DetectorParams,
) -> Result<f32, RelayScanError> {
    let (w, h) = gray.dimensions();
    let rect = Region::new(region.x_px, region.y_px, region.width_px, region.height_px);
    if rect.width == 0 || rect.height == 0 || rect.right() > w || rect.bottom() > h {
        return Err(RelayScanError::Calibration(format!(
            "region {}x{} at ({}, {}) on page {} is outside the {}x{} raster",
            rect.width, rect.height, rect.x, rect.y, region.page, w, h
        )));
    }

    // Binarize a neighbourhood large enough that every interior pixel sees a full window.
    let pad = params.block_size / 2 + 1;
    let cx0 = rect.x.saturating_sub(pad);
    let cy0 = rect.y.saturating_sub(pad);
    let cx1 = (rect.right() + pad).min(w);
    let cy1 = (rect.bottom() + pad).min(h);
    let crop = imageops::crop_imm(gray, cx0, cy0, cx1 - cx0, cy1 - cy0).to_image();
    let binary = binarize(&crop, params.block_size, params.threshold_c);
    let ink = IntegralImage::of_ink(&binary);

    let local = Region::new(rect.x - cx0, rect.y - cy0, rect.width, rect.height);
    params.interior_density(&ink, &local).ok_or_else(|| {
        RelayScanError::Calibration(format!(
            "region at ({}, {}) on page {} has no interior after a {} px margin",
            rect.x, rect.y, region.page, params.shrink_margin
        ))
    })
}

/// Pick the density threshold that best separates marked from unmarked samples.
pub fn calibrate(samples: &[LabeledSample]) -> Result<CalibrationReport, RelayScanError> {
    if let Some(bad) = samples
        .iter()
        .find(|s| !s.density.is_finite() || !(0.0..=1.0).contains(&s.density))
    {
        return Err(RelayScanError::Calibration(format!(
            "density {} is outside [0, 1]",
            bad.density
        )));
    }
    let marked: Vec<f32> = samples.iter().filter(|s| s.marked).map(|s| s.density).collect();
    let unmarked: Vec<f32> = samples.iter().filter(|s| !s.marked).map(|s| s.density).collect();
    if marked.is_empty() || unmarked.is_empty() {
        return Err(RelayScanError::Calibration(format!(
            "need at least one marked and one unmarked sample (got {} marked, {} unmarked)",
            marked.len(),
            unmarked.len()
        )));
    }

    let marked_mean = mean(&marked);
    let unmarked_mean = mean(&unmarked);
    let midpoint = (marked_mean + unmarked_mean) / 2.0;

    let mut distinct: Vec<f32> = samples.iter().map(|s| s.density).collect();
    distinct.sort_by(f32::total_cmp);
    distinct.dedup();

    let mut candidates: Vec<f32> = distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    if candidates.is_empty() {
        candidates.push(distinct[0]);
    }

    let errors = |t: f32| {
        samples
            .iter()
            .filter(|s| (s.density > t) != s.marked)
            .count()
    };

    let mut best = (candidates[0], errors(candidates[0]));
    for &t in &candidates[1..] {
        let e = errors(t);
        let closer = (t - midpoint).abs() < (best.0 - midpoint).abs();
        if e < best.1 || (e == best.1 && closer) {
            best = (t, e);
        }
    }
    let (threshold, misclassified) = best;

    let margin = samples
        .iter()
        .map(|s| (s.density - threshold).abs())
        .fold(f32::INFINITY, f32::min);

    tracing::info!(
        threshold,
        misclassified,
        total = samples.len(),
        "calibrated density threshold"
    );

    Ok(CalibrationReport {
        recommended_threshold: threshold,
        misclassified,
        total: samples.len(),
        marked_mean,
        unmarked_mean,
        midpoint,
        margin,
    })
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}
