use crate::model::MultiPart;
use regex::Regex;
use std::sync::LazyLock;

static PART_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<base>.+?)\s+part\s+(?P<n>\d+)\b(?P<suffix>.*)$").expect("part pattern")
});

static PART_FRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>.+?)\s*\(\s*(?P<n>\d+)\s*/\s*(?P<m>\d+)\s*\)(?P<suffix>.*)$")
        .expect("fraction pattern")
});

/// Split a grouped description into its base name and part index.
///
/// - "Binary input part 2" -> base "Binary input", part 2
/// - "Trip matrix (2/3) LED" -> base "Trip matrix", part 2 of 3, suffix "LED"
pub fn parse_multipart(description: &str) -> Option<MultiPart> {
    let description = description.trim();

    if let Some(caps) = PART_FRACTION.captures(description) {
        let part_index = caps["n"].parse().ok()?;
        let part_total = caps["m"].parse().ok();
        return build(&caps["base"], part_index, part_total, &caps["suffix"]);
    }

    if let Some(caps) = PART_WORD.captures(description) {
        let part_index = caps["n"].parse().ok()?;
        return build(&caps["base"], part_index, None, &caps["suffix"]);
    }

    None
}

fn build(base: &str, part_index: u32, part_total: Option<u32>, suffix: &str) -> Option<MultiPart> {
    let base_name = base.trim().trim_end_matches([':', '-', ',']).trim();
    if base_name.is_empty() || part_index == 0 {
        return None;
    }
    Some(MultiPart {
        base_name: base_name.to_string(),
        part_index,
        part_total,
        trailing_suffix: suffix
            .trim()
            .trim_start_matches([':', '-', ','])
            .trim()
            .to_string(),
    })
}
