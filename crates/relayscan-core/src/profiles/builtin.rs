use crate::error::RelayScanError;
use crate::profiles::schema::ScanProfile;
use crate::profiles::validate_profile;

const AUTO_JSON: &str = include_str!("../../../../profiles/auto.json");
const DOTTED_JSON: &str = include_str!("../../../../profiles/dotted-decimal.json");
const HEX_JSON: &str = include_str!("../../../../profiles/hex-code.json");
const KEY_VALUE_JSON: &str = include_str!("../../../../profiles/key-value.json");

/// Available predefined profiles.
pub const PRESETS: &[&str] = &["auto", "dotted", "hex", "keyvalue"];

/// Load a predefined profile by name.
pub fn load_preset(name: &str) -> Result<ScanProfile, RelayScanError> {
    let json = match name {
        "auto" => AUTO_JSON,
        "dotted" => DOTTED_JSON,
        "hex" => HEX_JSON,
        "keyvalue" => KEY_VALUE_JSON,
        _ => {
            return Err(RelayScanError::ProfileInvalid(format!(
                "unknown profile '{}'. Available: {}",
                name,
                PRESETS.join(", ")
            )))
        }
    };
    let profile: ScanProfile = serde_json::from_str(json)?;
    validate_profile(&profile)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VendorFamily;

    #[test]
    fn test_all_presets_load_and_validate() {
        for name in PRESETS {
            let p = load_preset(name).unwrap();
            assert_eq!(p.dpi, 300, "{name}");
        }
    }

    #[test]
    fn test_preset_families() {
        assert_eq!(load_preset("auto").unwrap().vendor_family, None);
        assert_eq!(
            load_preset("hex").unwrap().vendor_family,
            Some(VendorFamily::HexCode)
        );
        assert_eq!(
            load_preset("keyvalue").unwrap().vendor_family,
            Some(VendorFamily::KeyValue)
        );
    }

    #[test]
    fn test_presets_carry_distinct_thresholds() {
        let dotted = load_preset("dotted").unwrap();
        let hex = load_preset("hex").unwrap();
        assert_ne!(
            dotted.detector.density_threshold,
            hex.detector.density_threshold
        );
    }

    #[test]
    fn test_unknown_preset() {
        assert!(load_preset("xyz").is_err());
    }
}
