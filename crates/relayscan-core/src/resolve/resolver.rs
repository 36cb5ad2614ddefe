use super::correlator::{PageCorrelation, Section};
use super::label::label_right_of;
use super::outcome::NoEvidence;
use crate::extraction::PageText;
use crate::model::{ActiveSetting, Checkbox, Evidence, ParameterLine};
use crate::parsing::values::is_false_value;
use crate::profiles::schema::ScanProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A marked checkbox, or unmarked checkboxes agreeing with the raw value.
pub const CONFIDENCE_VISUAL: f32 = 0.95;
/// Raw value only.
pub const CONFIDENCE_TEXTUAL: f32 = 0.80;
/// Unmarked checkboxes contradicting a raw value.
pub const CONFIDENCE_CONFLICT: f32 = 0.60;
/// Ceiling when a deciding checkbox sat inside the ambiguity band.
pub const CONFIDENCE_AMBIGUOUS: f32 = 0.50;

/// Evidence gathered for one correlation section of a page.
///
/// Sections sharing a multi-part base name are merged across the whole
/// document before a decision is taken, see [`merge_records`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub page: usize,
    /// Code of the first part.
    pub code: String,
    /// Base name for multi-part records, the head description otherwise.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,
    /// Codes of every member line, in document order.
    pub member_codes: Vec<String>,
    /// First non-empty raw value among the members.
    pub raw_value: String,
    /// Checkboxes attributed to the members.
    pub checkboxes: Vec<Checkbox>,
    /// Text to the right of the first marked checkbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Record {
    fn has_marked(&self) -> bool {
        self.checkboxes.iter().any(|b| b.is_marked)
    }

    fn merge_key(&self) -> Option<String> {
        self.base_name.as_ref().map(|b| b.to_lowercase())
    }

    /// Fold a later part into this record.
    pub fn absorb(&mut self, other: Record) {
        if self.raw_value.is_empty() {
            self.raw_value = other.raw_value.clone();
        }
        if !self.has_marked() && other.has_marked() {
            self.label = other.label;
        }
        self.member_codes.extend(other.member_codes);
        self.checkboxes.extend(other.checkboxes);
    }
}

/// Decided settings plus the records that had no evidence.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub settings: Vec<ActiveSetting>,
    pub no_evidence: Vec<NoEvidence>,
}

/// Collect the evidence of every section of one page.
///
/// `scale` is pixels per point of the raster the checkboxes came from.
pub fn resolve(
    lines: &[ParameterLine],
    correlation: &PageCorrelation,
    page: &PageText,
    checkboxes: &[Checkbox],
    profile: &ScanProfile,
    scale: f32,
) -> Vec<Record> {
    correlation
        .sections
        .iter()
        .map(|section| {
            let boxes: &[Checkbox] = correlation
                .group_for(section.head)
                .map(|g| g.checkboxes.as_slice())
                .unwrap_or(&[]);
            section_record(lines, section, boxes, page, checkboxes, profile, scale)
        })
        .collect()
}

fn section_record(
    lines: &[ParameterLine],
    section: &Section,
    boxes: &[Checkbox],
    page: &PageText,
    all_boxes: &[Checkbox],
    profile: &ScanProfile,
    scale: f32,
) -> Record {
    let head = &lines[section.head];
    let raw_value = section
        .members
        .iter()
        .map(|&m| lines[m].raw_value.trim())
        .find(|v| !v.is_empty())
        .unwrap_or("");
    let base_name = head.multipart.as_ref().map(|mp| mp.base_name.clone());
    let label = boxes
        .iter()
        .find(|b| b.is_marked)
        .and_then(|b| label_right_of(b, all_boxes, page, profile, scale));

    Record {
        page: head.page,
        code: head.code.clone(),
        description: base_name.clone().unwrap_or_else(|| head.description.clone()),
        base_name,
        member_codes: section.members.iter().map(|&m| lines[m].code.clone()).collect(),
        raw_value: raw_value.to_string(),
        checkboxes: boxes.to_vec(),
        label,
    }
}

/// Merge multi-part records sharing a base name, wherever they appear.
///
/// The merged record keeps the position, page and code of its first part.
/// Records without a base name pass through untouched.
pub fn merge_records(records: Vec<Record>) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::with_capacity(records.len());
    let mut by_base: HashMap<String, usize> = HashMap::new();
    for record in records {
        match record.merge_key() {
            Some(key) => match by_base.get(&key) {
                Some(&at) => merged[at].absorb(record),
                None => {
                    by_base.insert(key, merged.len());
                    merged.push(record);
                }
            },
            None => merged.push(record),
        }
    }
    merged
}

/// Decide every record, in order.
pub fn decide_all(records: &[Record]) -> Resolution {
    let mut out = Resolution::default();
    for record in records {
        match decide(record) {
            Some(setting) => out.settings.push(setting),
            None => {
                tracing::debug!(page = record.page, code = %record.code, "no evidence for record");
                out.no_evidence.push(NoEvidence {
                    page: record.page,
                    code: record.code.clone(),
                    description: record.description.clone(),
                });
            }
        }
    }
    out
}

/// Turn the evidence of one record into a setting, or `None` without any.
pub fn decide(record: &Record) -> Option<ActiveSetting> {
    let boxes = &record.checkboxes;
    let raw_value = record.raw_value.as_str();
    let has_value = !raw_value.is_empty();
    let explicit_false = has_value && is_false_value(raw_value);

    let (is_active, mut confidence, evidence, conflict, value_or_label) = if boxes.is_empty() {
        if !has_value {
            return None;
        }
        (
            !explicit_false,
            CONFIDENCE_TEXTUAL,
            Evidence::Textual,
            false,
            raw_value.to_string(),
        )
    } else if boxes.iter().any(|b| b.is_marked) {
        let evidence = if has_value { Evidence::Both } else { Evidence::Visual };
        let confidence = if explicit_false {
            CONFIDENCE_CONFLICT
        } else {
            CONFIDENCE_VISUAL
        };
        let value = record.label.clone().unwrap_or_else(|| raw_value.to_string());
        (true, confidence, evidence, explicit_false, value)
    } else if !has_value {
        (false, CONFIDENCE_VISUAL, Evidence::Visual, false, String::new())
    } else if explicit_false {
        (
            false,
            CONFIDENCE_VISUAL,
            Evidence::Both,
            false,
            raw_value.to_string(),
        )
    } else {
        (
            true,
            CONFIDENCE_CONFLICT,
            Evidence::Both,
            true,
            raw_value.to_string(),
        )
    };

    let ambiguous = boxes.iter().any(|b| b.ambiguous);
    if ambiguous {
        confidence = confidence.min(CONFIDENCE_AMBIGUOUS);
        tracing::warn!(
            page = record.page,
            code = %record.code,
            "deciding checkbox density is within the ambiguity band"
        );
    }
    if conflict {
        tracing::warn!(
            page = record.page,
            code = %record.code,
            raw_value,
            "checkbox state contradicts the printed value"
        );
    }

    Some(ActiveSetting {
        code: record.code.clone(),
        description: record.description.clone(),
        value_or_label,
        is_active,
        confidence,
        evidence,
        page: record.page,
        member_codes: if record.member_codes.len() > 1 {
            record.member_codes.clone()
        } else {
            Vec::new()
        },
        checkbox_count: boxes.len(),
        conflict,
        ambiguous,
    })
}
