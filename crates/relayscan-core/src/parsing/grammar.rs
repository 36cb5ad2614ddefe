use crate::model::VendorFamily;
use regex::Regex;
use std::sync::LazyLock;

static DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,3}\.\d{1,3})\s*:\s*(.*)$").expect("dotted pattern"));

static DOTTED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{2,3}\.\d{2,3}\s+\p{L}+\s+\p{L}").expect("dotted prefix"));

static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9A-Fa-f]{4})\s*:\s*(.*)$").expect("hex pattern"));

static HEX_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[0-9A-Fa-f]{4}\s+\p{L}+\s+\p{L}").expect("hex prefix"));

static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_.\-\[\]/]*)\s*=\s*(.*)$").expect("key=value pattern")
});

/// Outcome of matching one text line against a vendor grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    /// A parameter line; `value` is empty when nothing followed the final separator.
    Parameter {
        code: String,
        description: String,
        value: String,
    },
    /// Starts like a parameter of this grammar but cannot be parsed.
    NearMiss { reason: String },
    /// Not a parameter line (heading, prose, value continuation, ...).
    NoMatch,
}

/// Match a line against the grammar of `family`.
pub fn match_line(family: VendorFamily, line: &str) -> LineMatch {
    match family {
        VendorFamily::DottedDecimal => match_dotted(line),
        VendorFamily::HexCode => match_hex(line),
        VendorFamily::KeyValue => match_key_value(line),
    }
}

/// True when the line opens a new parameter in any grammar, including
/// near misses that carry a code token but no separator.
pub fn starts_new_code(line: &str) -> bool {
    DOTTED.is_match(line)
        || HEX.is_match(line)
        || KEY_VALUE.is_match(line)
        || DOTTED_PREFIX.is_match(line)
        || HEX_PREFIX.is_match(line)
}

fn match_dotted(line: &str) -> LineMatch {
    if let Some(caps) = DOTTED.captures(line) {
        let code = caps[1].to_string();
        let rest = caps[2].trim();
        let (description, value) = match rest.rsplit_once(':') {
            Some((d, v)) => (d, v),
            None => (rest, ""),
        };
        return parameter(code, description, value);
    }
    if DOTTED_PREFIX.is_match(line) {
        return LineMatch::NearMiss {
            reason: "dotted code without ':' separator".into(),
        };
    }
    LineMatch::NoMatch
}

fn match_hex(line: &str) -> LineMatch {
    if let Some(caps) = HEX.captures(line) {
        let code = caps[1].to_uppercase();
        let rest = caps[2].trim();
        let (description, value) = match rest.rsplit_once("=:") {
            Some((d, v)) => (d, v),
            None => match rest.rsplit_once(':') {
                Some((d, v)) => (d, v),
                None => (rest, ""),
            },
        };
        return parameter(code, description, value);
    }
    if HEX_PREFIX.is_match(line) {
        return LineMatch::NearMiss {
            reason: "hex code without ':' separator".into(),
        };
    }
    LineMatch::NoMatch
}

fn match_key_value(line: &str) -> LineMatch {
    if let Some(caps) = KEY_VALUE.captures(line) {
        let key = caps[1].to_string();
        let value = caps[2].trim().to_string();
        return LineMatch::Parameter {
            description: key.clone(),
            code: key,
            value,
        };
    }
    if line.trim_start().starts_with('=') {
        return LineMatch::NearMiss {
            reason: "value without key".into(),
        };
    }
    LineMatch::NoMatch
}

fn parameter(code: String, description: &str, value: &str) -> LineMatch {
    let description = clean_description(description);
    if description.is_empty() {
        return LineMatch::NearMiss {
            reason: format!("code {code} has no description"),
        };
    }
    LineMatch::Parameter {
        code,
        description,
        value: value.trim().to_string(),
    }
}

/// Strip leader dots and dangling separators: "Rated frequency ....=" -> "Rated frequency".
fn clean_description(s: &str) -> String {
    s.trim()
        .trim_end_matches(['.', '=', ':', ' ', '\t'])
        .trim()
        .to_string()
}
