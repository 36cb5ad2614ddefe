use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Manufacturer-specific text layout of a settings export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorFamily {
    /// `NN.NN: Description: Value`
    DottedDecimal,
    /// `0150: Description =: Value` or `0150: Description: Value`
    HexCode,
    /// `key=value`, no checkbox concept.
    KeyValue,
}

impl VendorFamily {
    pub const ALL: [VendorFamily; 3] = [
        VendorFamily::DottedDecimal,
        VendorFamily::HexCode,
        VendorFamily::KeyValue,
    ];

    /// Whether exports of this family encode state with checkboxes at all.
    pub fn uses_checkboxes(&self) -> bool {
        !matches!(self, VendorFamily::KeyValue)
    }

    pub fn from_str_loose(s: &str) -> Option<VendorFamily> {
        let lower = s.trim().to_lowercase().replace(['-', ' '], "_");
        match lower.as_str() {
            "dotted" | "dotted_decimal" => Some(VendorFamily::DottedDecimal),
            "hex" | "hex_code" | "hex4" => Some(VendorFamily::HexCode),
            "keyvalue" | "key_value" | "kv" => Some(VendorFamily::KeyValue),
            _ => None,
        }
    }
}

impl fmt::Display for VendorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorFamily::DottedDecimal => write!(f, "dotted-decimal"),
            VendorFamily::HexCode => write!(f, "hex-code"),
            VendorFamily::KeyValue => write!(f, "key=value"),
        }
    }
}

/// Interpretation of a raw setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettingValue {
    Numeric {
        magnitude: Decimal,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Flag { enabled: bool },
    Text { text: String },
}

impl SettingValue {
    /// `Some(false)` only for an explicit disabled/off token.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SettingValue::Flag { enabled } => Some(*enabled),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Numeric {
                magnitude,
                unit: Some(unit),
            } => write!(f, "{magnitude} {unit}"),
            SettingValue::Numeric {
                magnitude,
                unit: None,
            } => write!(f, "{magnitude}"),
            SettingValue::Flag { enabled: true } => write!(f, "on"),
            SettingValue::Flag { enabled: false } => write!(f, "off"),
            SettingValue::Text { text } => write!(f, "{text}"),
        }
    }
}

/// A description split as `<base> part <n>` or `<base> (<n>/<m>)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPart {
    pub base_name: String,
    pub part_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_total: Option<u32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trailing_suffix: String,
}

/// One parameter parsed from the text layer of a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterLine {
    pub code: String,
    pub description: String,
    pub raw_value: String,
    /// Top of the text line, in PDF points from the top of the page.
    pub y_point: f32,
    /// Left edge of the text line, in PDF points.
    pub x_point: f32,
    pub page: usize,
    pub vendor_family: VendorFamily,
    pub line_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipart: Option<MultiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<SettingValue>,
}

impl ParameterLine {
    pub fn has_value(&self) -> bool {
        !self.raw_value.trim().is_empty()
    }

    /// True when this line continues the multi-part section named `base`.
    pub fn continues(&self, base: &str) -> bool {
        self.multipart
            .as_ref()
            .is_some_and(|mp| mp.part_index > 1 && mp.base_name.eq_ignore_ascii_case(base))
    }
}

/// A near-square glyph region classified as marked or unmarked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkbox {
    pub x_px: u32,
    pub y_px: u32,
    pub width_px: u32,
    pub height_px: u32,
    /// Foreground fraction of the interior, in [0, 1].
    pub density: f32,
    pub is_marked: bool,
    /// Density fell within the ambiguity band around the threshold.
    #[serde(default)]
    pub ambiguous: bool,
    pub page: usize,
}

impl Checkbox {
    /// Vertical centre in PDF points.
    pub fn y_point(&self, scale: f32) -> f32 {
        (self.y_px as f32 + self.height_px as f32 / 2.0) / scale
    }

    /// Horizontal centre in PDF points.
    pub fn x_point(&self, scale: f32) -> f32 {
        (self.x_px as f32 + self.width_px as f32 / 2.0) / scale
    }

    pub fn right_px(&self) -> u32 {
        self.x_px + self.width_px
    }
}

/// Which tolerance window attributed a checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationRegime {
    Tight,
    Wide,
}

/// Checkboxes attributed to one section head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationGroup {
    pub code: String,
    /// Index of the head line in the page's parameter list.
    pub line_index: usize,
    pub regime: CorrelationRegime,
    pub checkboxes: Vec<Checkbox>,
}

/// A checkbox that matched no parameter within tolerance, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnattributedCheckbox {
    pub checkbox: Checkbox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_distance_pt: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    Visual,
    Textual,
    Both,
    None,
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::Visual => write!(f, "visual"),
            Evidence::Textual => write!(f, "textual"),
            Evidence::Both => write!(f, "both"),
            Evidence::None => write!(f, "none"),
        }
    }
}

/// Final activation record for one logical parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSetting {
    pub code: String,
    pub description: String,
    pub value_or_label: String,
    pub is_active: bool,
    pub confidence: f32,
    pub evidence: Evidence,
    pub page: usize,
    /// Codes of every part folded into this record (multi-part sections).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_codes: Vec<String>,
    #[serde(default)]
    pub checkbox_count: usize,
    /// Checkbox state and raw value disagree.
    #[serde(default)]
    pub conflict: bool,
    /// A deciding checkbox sat inside the ambiguity band.
    #[serde(default)]
    pub ambiguous: bool,
}

/// A line that looked like a parameter but could not be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedLine {
    pub page: usize,
    pub line_index: usize,
    pub line_text: String,
    pub reason: String,
}
