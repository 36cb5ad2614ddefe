use crate::extraction::PageText;
use crate::model::{ActiveSetting, Checkbox, CorrelationRegime};
use crate::resolve::outcome::{DocumentResult, PageResult};
use serde::{Deserialize, Serialize};

pub const TRACE_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceSeverity {
    Critical,
    Important,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStepType {
    ParseLine,
    DetectCheckbox,
    Correlate,
    Resolve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub step_type: TraceStepType,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    TextLine,
    Checkbox,
}

/// A rectangle on the page backing a decision, in PDF points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub kind: SpanKind,
    pub page_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_index: Option<usize>,
    pub matched_text: String,
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub entry_id: String,
    pub page: usize,
    pub code: String,
    pub is_active: bool,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_spans: Vec<EvidenceSpan>,
    pub steps: Vec<TraceStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceWarning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub message: String,
    pub severity: TraceSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceBundle {
    pub trace_schema_version: String,
    pub entries: Vec<TraceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TraceWarning>,
}

impl Default for TraceBundle {
    fn default() -> Self {
        Self {
            trace_schema_version: TRACE_SCHEMA_VERSION.to_string(),
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Explain every setting of a processed document.
///
/// `texts` is the text layer the document was processed with. Checkbox
/// spans are converted back to points with the scale of their page.
pub fn build_trace(result: &DocumentResult, texts: &[PageText]) -> TraceBundle {
    let mut bundle = TraceBundle::default();

    for (idx, setting) in result.settings.iter().enumerate() {
        bundle.entries.push(build_entry(result, idx, setting, texts));
    }

    let audit = &result.audit;
    for u in &audit.unattributed {
        let cb = &u.checkbox;
        let nearest = match (&u.nearest_code, u.nearest_distance_pt) {
            (Some(code), Some(d)) => format!("; nearest line {code} at {d:.1} pt"),
            _ => "; no line above it".to_string(),
        };
        bundle.warnings.push(TraceWarning {
            page: Some(cb.page),
            message: format!(
                "Checkbox at ({}, {}) px ({}) not attributed{}",
                cb.x_px,
                cb.y_px,
                marked_word(cb),
                nearest
            ),
            severity: TraceSeverity::Important,
        });
    }
    for cb in &audit.ambiguous {
        bundle.warnings.push(TraceWarning {
            page: Some(cb.page),
            message: format!(
                "Checkbox at ({}, {}) px has density {:.3} inside the ambiguity band",
                cb.x_px, cb.y_px, cb.density
            ),
            severity: TraceSeverity::Important,
        });
    }
    for skipped in &audit.skipped_lines {
        bundle.warnings.push(TraceWarning {
            page: Some(skipped.page),
            message: format!(
                "Skipped line {} '{}': {}",
                skipped.line_index, skipped.line_text, skipped.reason
            ),
            severity: TraceSeverity::Info,
        });
    }
    for failure in &audit.page_failures {
        bundle.warnings.push(TraceWarning {
            page: Some(failure.page),
            message: format!("Page not processed: {}", failure.reason),
            severity: TraceSeverity::Critical,
        });
    }

    bundle
}

fn build_entry(
    result: &DocumentResult,
    idx: usize,
    setting: &ActiveSetting,
    texts: &[PageText],
) -> TraceEntry {
    let mut spans = Vec::new();
    let mut steps = Vec::new();

    // Merged parts may span pages; a single line stays on its own page.
    let members: Vec<&str> = if setting.member_codes.is_empty() {
        vec![setting.code.as_str()]
    } else {
        setting.member_codes.iter().map(String::as_str).collect()
    };
    let pages = result
        .pages
        .iter()
        .filter(|p| !setting.member_codes.is_empty() || p.page == setting.page);

    for page in pages {
        let text = texts.iter().find(|t| t.page_number == page.page);
        trace_page(page, &members, text, &mut steps, &mut spans);
    }

    steps.push(TraceStep {
        step_type: TraceStepType::Resolve,
        message: format!(
            "{} '{}' from {} evidence, confidence {:.2}{}{}",
            if setting.is_active { "Active" } else { "Inactive" },
            setting.value_or_label,
            setting.evidence,
            setting.confidence,
            if setting.conflict { ", conflict" } else { "" },
            if setting.ambiguous { ", ambiguous" } else { "" },
        ),
    });

    TraceEntry {
        entry_id: format!("set_{}_{}_{}", setting.page, idx, setting.code),
        page: setting.page,
        code: setting.code.clone(),
        is_active: setting.is_active,
        confidence: setting.confidence,
        evidence_spans: spans,
        steps,
    }
}

/// Parse, detection and correlation steps of the member lines on one page.
fn trace_page(
    page: &PageResult,
    members: &[&str],
    text: Option<&PageText>,
    steps: &mut Vec<TraceStep>,
    spans: &mut Vec<EvidenceSpan>,
) {
    for line in page.parameters.iter().filter(|l| members.contains(&l.code.as_str())) {
        steps.push(TraceStep {
            step_type: TraceStepType::ParseLine,
            message: format!(
                "Parsed {} '{}' with value '{}' on page {} at y={:.1} pt",
                line.code, line.description, line.raw_value, page.page, line.y_point
            ),
        });
        let bbox = text.and_then(|t| {
            t.lines
                .iter()
                .find(|tl| tl.bbox.y_min == line.y_point && tl.bbox.x_min == line.x_point)
        });
        if let Some(tl) = bbox {
            spans.push(EvidenceSpan {
                kind: SpanKind::TextLine,
                page_number: page.page,
                line_index: Some(tl.line_index),
                matched_text: tl.text.clone(),
                x_min: tl.bbox.x_min,
                y_min: tl.bbox.y_min,
                x_max: tl.bbox.x_max,
                y_max: tl.bbox.y_max,
            });
        }
    }

    for group in page.groups.iter().filter(|g| members.contains(&g.code.as_str())) {
        for cb in &group.checkboxes {
            steps.push(TraceStep {
                step_type: TraceStepType::DetectCheckbox,
                message: format!(
                    "Checkbox {}x{} px at ({}, {}) density {:.3} -> {}",
                    cb.width_px,
                    cb.height_px,
                    cb.x_px,
                    cb.y_px,
                    cb.density,
                    marked_word(cb)
                ),
            });
            spans.push(checkbox_span(cb, page.scale));
        }
        let regime = match group.regime {
            CorrelationRegime::Tight => "tight",
            CorrelationRegime::Wide => "wide",
        };
        steps.push(TraceStep {
            step_type: TraceStepType::Correlate,
            message: format!(
                "{} checkbox(es) attributed to {} ({regime} window)",
                group.checkboxes.len(),
                group.code
            ),
        });
    }
}

fn checkbox_span(cb: &Checkbox, scale: f32) -> EvidenceSpan {
    EvidenceSpan {
        kind: SpanKind::Checkbox,
        page_number: cb.page,
        line_index: None,
        matched_text: marked_word(cb).to_string(),
        x_min: cb.x_px as f32 / scale,
        y_min: cb.y_px as f32 / scale,
        x_max: (cb.x_px + cb.width_px) as f32 / scale,
        y_max: (cb.y_px + cb.height_px) as f32 / scale,
    }
}

fn marked_word(cb: &Checkbox) -> &'static str {
    if cb.is_marked {
        "marked"
    } else {
        "unmarked"
    }
}
