pub mod builtin;
pub mod schema;

use crate::error::RelayScanError;
use schema::ScanProfile;
use std::path::Path;

/// Load a scan profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<ScanProfile, RelayScanError> {
    let content = std::fs::read_to_string(path).map_err(|e| RelayScanError::ProfileLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_profile(&content, path)
}

/// Parse a scan profile from a JSON string.
pub fn parse_profile(json: &str, source: &Path) -> Result<ScanProfile, RelayScanError> {
    let profile: ScanProfile =
        serde_json::from_str(json).map_err(|e| RelayScanError::ProfileLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_profile(&profile)?;
    Ok(profile)
}

/// Parse a scan profile from a JSON string (no file path context).
pub fn parse_profile_str(json: &str) -> Result<ScanProfile, RelayScanError> {
    let profile: ScanProfile = serde_json::from_str(json).map_err(RelayScanError::Json)?;
    validate_profile(&profile)?;
    Ok(profile)
}

/// Validate that a profile is internally consistent.
pub fn validate_profile(profile: &ScanProfile) -> Result<(), RelayScanError> {
    let invalid = |msg: String| Err(RelayScanError::ProfileInvalid(msg));

    if profile.name.trim().is_empty() {
        return invalid("name must not be empty".into());
    }

    if !(72..=1200).contains(&profile.dpi) {
        return invalid(format!("dpi {} out of range (72..=1200)", profile.dpi));
    }

    let d = &profile.detector;
    if d.min_size_px == 0 || d.min_size_px > d.max_size_px {
        return invalid(format!(
            "checkbox size bounds invalid: min {} max {}",
            d.min_size_px, d.max_size_px
        ));
    }
    if !(d.min_aspect > 0.0 && d.min_aspect <= 1.0 && d.max_aspect >= 1.0) {
        return invalid(format!(
            "aspect bounds must bracket 1.0 (got {}..{})",
            d.min_aspect, d.max_aspect
        ));
    }
    if d.min_area_px < 0.0 {
        return invalid("min_area_px must not be negative".into());
    }
    if d.shrink_margin_px.saturating_mul(2) >= d.min_size_px {
        return invalid(format!(
            "shrink_margin_px {} leaves no interior for boxes of {} px",
            d.shrink_margin_px, d.min_size_px
        ));
    }
    if d.block_size_px < 3 {
        return invalid("block_size_px must be at least 3".into());
    }
    if !(d.density_threshold > 0.0 && d.density_threshold < 1.0) {
        return invalid(format!(
            "density_threshold {} must lie strictly between 0 and 1",
            d.density_threshold
        ));
    }
    if !(0.0..0.5).contains(&d.ambiguity_band) {
        return invalid(format!(
            "ambiguity_band {} must lie in [0, 0.5)",
            d.ambiguity_band
        ));
    }
    if !(d.template_max_score > 0.0 && d.template_max_score <= 1.0) {
        return invalid("template_max_score must lie in (0, 1]".into());
    }

    let c = &profile.correlation;
    if c.tight_tolerance_pt <= 0.0 {
        return invalid("tight_tolerance_pt must be positive".into());
    }
    if c.wide_tolerance_pt < c.tight_tolerance_pt {
        return invalid(format!(
            "wide_tolerance_pt {} is narrower than tight_tolerance_pt {}",
            c.wide_tolerance_pt, c.tight_tolerance_pt
        ));
    }
    if c.row_slack_pt < 0.0 {
        return invalid("row_slack_pt must not be negative".into());
    }

    if profile.labels.max_words == 0 || profile.labels.max_chars == 0 {
        return invalid("label limits must be positive".into());
    }

    if profile.parallelism.max_threads == Some(0) {
        return invalid("max_threads must be at least 1".into());
    }

    Ok(())
}
