pub mod grammar;
pub mod multipart;
pub mod values;

use crate::extraction::PageText;
use crate::model::{ParameterLine, SkippedLine, VendorFamily};
use grammar::{match_line, starts_new_code, LineMatch};
use multipart::parse_multipart;
use serde::{Deserialize, Serialize};
use values::{is_section_header, is_value_like, parse_setting_value};

/// Parameter lines of one page plus the lines that could not be parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedPage {
    pub page: usize,
    pub lines: Vec<ParameterLine>,
    pub skipped_lines: Vec<SkippedLine>,
}

/// Text-only parse of a whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_family: Option<VendorFamily>,
    pub pages: Vec<ParsedPage>,
}

impl ParsedDocument {
    pub fn parameter_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.pages.iter().map(|p| p.skipped_lines.len()).sum()
    }
}

/// Pick the grammar that matches the most lines.
///
/// Ties resolve in [`VendorFamily::ALL`] order. Returns `None` when no line
/// matches any grammar.
pub fn detect_family(pages: &[PageText]) -> Option<VendorFamily> {
    let mut best: Option<(VendorFamily, usize)> = None;
    for family in VendorFamily::ALL {
        let hits = pages
            .iter()
            .flat_map(|p| p.lines.iter())
            .filter(|l| matches!(match_line(family, &l.text), LineMatch::Parameter { .. }))
            .count();
        if hits > 0 && best.is_none_or(|(_, n)| hits > n) {
            best = Some((family, hits));
        }
    }
    best.map(|(family, _)| family)
}

/// Parse every page with one grammar, detecting it when `family` is `None`.
pub fn parse_document(pages: &[PageText], family: Option<VendorFamily>) -> ParsedDocument {
    let family = family.or_else(|| detect_family(pages));
    let pages = match family {
        Some(f) => pages.iter().map(|p| extract_parameters(p, f)).collect(),
        None => {
            tracing::warn!("no vendor grammar matched the text layer");
            pages
                .iter()
                .map(|p| ParsedPage {
                    page: p.page_number,
                    ..ParsedPage::default()
                })
                .collect()
        }
    };
    ParsedDocument {
        vendor_family: family,
        pages,
    }
}

/// Extract parameter lines from one page's text layer.
///
/// A line with nothing after its final separator takes the next line as its
/// value when that line is not a new code, not an all-caps section header
/// and looks like a value. Malformed lines are recorded, never fatal.
pub fn extract_parameters(page: &PageText, family: VendorFamily) -> ParsedPage {
    let mut out = ParsedPage {
        page: page.page_number,
        ..ParsedPage::default()
    };

    let mut i = 0;
    while i < page.lines.len() {
        let line = &page.lines[i];
        i += 1;

        let text = line.text.trim();
        if text.is_empty() {
            continue;
        }

        match match_line(family, text) {
            LineMatch::Parameter {
                code,
                description,
                mut value,
            } => {
                if value.is_empty() && family != VendorFamily::KeyValue {
                    if let Some(next) = page.lines.get(i) {
                        if takes_as_value(&next.text) {
                            value = next.text.trim().to_string();
                            i += 1;
                        }
                    }
                }

                let parsed = parse_setting_value(&value);
                out.lines.push(ParameterLine {
                    multipart: parse_multipart(&description),
                    code,
                    description,
                    raw_value: value,
                    y_point: line.bbox.y_min,
                    x_point: line.bbox.x_min,
                    page: page.page_number,
                    vendor_family: family,
                    line_index: out.lines.len(),
                    value: parsed,
                });
            }
            LineMatch::NearMiss { reason } => {
                tracing::warn!(
                    page = page.page_number,
                    line = line.line_index,
                    reason = %reason,
                    "skipping unparsable parameter line"
                );
                out.skipped_lines.push(SkippedLine {
                    page: page.page_number,
                    line_index: line.line_index,
                    line_text: text.to_string(),
                    reason,
                });
            }
            LineMatch::NoMatch => {
                tracing::trace!(page = page.page_number, line = text, "not a parameter line");
            }
        }
    }

    out
}

fn takes_as_value(next: &str) -> bool {
    let next = next.trim();
    !starts_new_code(next) && !is_section_header(next) && is_value_like(next)
}
