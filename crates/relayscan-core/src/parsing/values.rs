use crate::model::SettingValue;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[<>]=?\s*)?([-+]?\d+(?:[.,]\d+)?)\s*(.*)$").expect("numeric pattern")
});

const TRUE_TOKENS: &[&str] = &[
    "on", "yes", "true", "enabled", "enable", "active", "activated", "ein", "ja",
];

const FALSE_TOKENS: &[&str] = &[
    "off", "no", "false", "disabled", "disable", "inactive", "deactivated", "aus", "nein",
    "none",
];

const UNIT_SUFFIXES: &[&str] = &[
    "hz", "s", "ms", "min", "h", "a", "ka", "ma", "v", "kv", "mv", "va", "kva", "mva", "w",
    "kw", "mw", "var", "kvar", "mvar", "%", "ohm", "ohms", "Ω", "°", "deg", "pu", "in", "un",
    "cycles", "km", "mi",
];

/// Parse an explicit boolean token, case-insensitively.
pub fn parse_flag(s: &str) -> Option<bool> {
    let lower = s.trim().to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// An explicit "not set" value: a false token or a bare zero.
pub fn is_false_value(s: &str) -> bool {
    let s = s.trim();
    s == "0" || parse_flag(s) == Some(false)
}

/// True when `s` is a known unit, alone or glued to a number ("60Hz").
fn has_unit_suffix(s: &str) -> bool {
    let last = match s.split_whitespace().last() {
        Some(w) => w.to_lowercase(),
        None => return false,
    };
    let stripped = last.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ',');
    UNIT_SUFFIXES.contains(&stripped)
}

/// Whether a line looks like a setting value rather than prose or a label.
///
/// Accepts a leading digit (optionally signed or comparator-prefixed), a
/// known boolean token, or a trailing known unit.
pub fn is_value_like(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    let first_digit = s
        .trim_start_matches(['<', '>', '=', '-', '+', ' '])
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    first_digit || parse_flag(s).is_some() || has_unit_suffix(s)
}

/// All-caps heading longer than ten characters, e.g. "OVERCURRENT PROTECTION".
pub fn is_section_header(s: &str) -> bool {
    let s = s.trim();
    let has_letter = s.chars().any(|c| c.is_alphabetic());
    has_letter && s.chars().count() > 10 && !s.chars().any(|c| c.is_lowercase())
}

/// Interpret a raw value string.
///
/// Handles formats like:
/// - "60Hz" -> Numeric(60, "Hz")
/// - "0,50 In" -> Numeric(0.50, "In")
/// - "Off" -> Flag(false)
/// - "Definite time" -> Text
///
/// Returns `None` for an empty value.
pub fn parse_setting_value(raw: &str) -> Option<SettingValue> {
    let s = raw.trim();
    if s.is_empty() || s == "-" || s == "*" {
        return None;
    }

    if let Some(enabled) = parse_flag(s) {
        return Some(SettingValue::Flag { enabled });
    }

    if let Some(caps) = NUMERIC.captures(s) {
        let number = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if let Ok(magnitude) = parse_decimal(number) {
            let unit = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            return Some(SettingValue::Numeric { magnitude, unit });
        }
    }

    Some(SettingValue::Text {
        text: s.to_string(),
    })
}

/// Parse a decimal value, accepting a decimal comma.
fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(&s.trim().replace(',', "."))
}
