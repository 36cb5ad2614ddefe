pub mod calibrate;
pub mod parse;
pub mod profiles;
pub mod scan;

use relayscan_core::error::RelayScanError;
use relayscan_core::profiles::schema::ScanProfile;
use relayscan_core::profiles::{builtin, load_profile};
use std::path::PathBuf;

/// Resolve `--profile-file` over `--profile`.
pub(crate) fn select_profile(
    preset: &str,
    profile_file: Option<PathBuf>,
) -> Result<ScanProfile, RelayScanError> {
    match profile_file {
        Some(path) => load_profile(&path),
        None => builtin::load_preset(preset),
    }
}
