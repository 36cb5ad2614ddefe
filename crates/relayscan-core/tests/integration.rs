//! End-to-end tests for the page/document pipeline.
//!
//! A MockTextLayer returns pre-built PageText and a MockRasterizer draws
//! checkbox outlines on a blank page, so these tests run without poppler.

use image::{GrayImage, Luma};
use relayscan_core::error::RelayScanError;
use relayscan_core::extraction::{
    BBox, PageRaster, PageRasterizer, PageText, TextLayer, TextLine, WordSpan,
};
use relayscan_core::model::{CorrelationRegime, Evidence, VendorFamily};
use relayscan_core::profiles::schema::ScanProfile;
use relayscan_core::{parse_pdf, process_batch, process_document, SourceDocument};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const WIDTH_PX: u32 = 1200;
const HEIGHT_PX: u32 = 1800;

struct MockTextLayer {
    pages: Vec<PageText>,
}

impl TextLayer for MockTextLayer {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageText>, RelayScanError> {
        Ok(self.pages.clone())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

/// A square outline centred at a point position.
#[derive(Clone, Copy)]
struct BoxSpec {
    x_pt: f32,
    y_pt: f32,
    size_px: u32,
    marked: bool,
}

fn checkbox(x_pt: f32, y_pt: f32, marked: bool) -> BoxSpec {
    BoxSpec {
        x_pt,
        y_pt,
        size_px: 20,
        marked,
    }
}

#[derive(Default)]
struct MockRasterizer {
    boxes: HashMap<usize, Vec<BoxSpec>>,
    failing: Vec<usize>,
    calls: AtomicUsize,
    /// Render at this resolution whatever the caller asks for.
    forced_dpi: Option<u32>,
}

impl MockRasterizer {
    fn with_page(mut self, page: usize, boxes: Vec<BoxSpec>) -> Self {
        self.boxes.insert(page, boxes);
        self
    }

    fn failing_on(mut self, page: usize) -> Self {
        self.failing.push(page);
        self
    }

    fn at_dpi(mut self, dpi: u32) -> Self {
        self.forced_dpi = Some(dpi);
        self
    }
}

impl PageRasterizer for MockRasterizer {
    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<PageRaster, RelayScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&page_number) {
            return Err(RelayScanError::Render {
                page: page_number,
                reason: "corrupt content stream".into(),
            });
        }
        let dpi = self.forced_dpi.unwrap_or(dpi);
        let scale = dpi as f32 / 72.0;
        let mut img = GrayImage::from_pixel(WIDTH_PX, HEIGHT_PX, Luma([255]));
        for mark in self.boxes.get(&page_number).into_iter().flatten() {
            let half = mark.size_px as f32 / 2.0;
            let x = (mark.x_pt * scale - half).round() as u32;
            let y = (mark.y_pt * scale - half).round() as u32;
            draw_outline(&mut img, x, y, mark.size_px);
            if mark.marked {
                hatch(&mut img, x, y, mark.size_px);
            }
        }
        Ok(PageRaster::new(page_number, img, dpi))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

fn draw_outline(img: &mut GrayImage, x: u32, y: u32, size: u32) {
    for i in 0..size {
        img.put_pixel(x + i, y, Luma([0]));
        img.put_pixel(x + i, y + size - 1, Luma([0]));
        img.put_pixel(x, y + i, Luma([0]));
        img.put_pixel(x + size - 1, y + i, Luma([0]));
    }
}

fn hatch(img: &mut GrayImage, x: u32, y: u32, size: u32) {
    for yy in (y + 3..y + size - 3).step_by(2) {
        for xx in x + 3..x + size - 3 {
            img.put_pixel(xx, yy, Luma([0]));
        }
    }
}

/// A text line starting at x = 50 pt, words 5 pt per character, 3 pt apart.
fn text_line(line_index: usize, text: &str, y_pt: f32) -> TextLine {
    let mut x = 50.0;
    let mut words = Vec::new();
    for w in text.split_whitespace() {
        let width = 5.0 * w.chars().count() as f32;
        words.push(WordSpan {
            text: w.to_string(),
            bbox: BBox::new(x, y_pt, x + width, y_pt + 10.0),
        });
        x += width + 3.0;
    }
    TextLine {
        line_index,
        text: text.to_string(),
        bbox: BBox::new(50.0, y_pt, x - 3.0, y_pt + 10.0),
        words,
    }
}

fn page(number: usize, lines: &[(&str, f32)]) -> PageText {
    PageText {
        page_number: number,
        width_pt: 288.0,
        height_pt: 432.0,
        lines: lines
            .iter()
            .enumerate()
            .map(|(i, (t, y))| text_line(i, t, *y))
            .collect(),
    }
}

fn hex_profile() -> ScanProfile {
    ScanProfile {
        name: "test-hex".into(),
        vendor_family: Some(VendorFamily::HexCode),
        ..ScanProfile::default()
    }
}

// ---------------------------------------------------------------------------
// Composite head collects a run of sub-item checkboxes
// ---------------------------------------------------------------------------
#[test]
fn composite_section_with_marked_checkbox() {
    let text = MockTextLayer {
        pages: vec![page(1, &[("0150: Binary inputs =:", 300.0)])],
    };
    let raster = MockRasterizer::default().with_page(
        1,
        vec![checkbox(210.0, 305.0, true), checkbox(210.0, 312.0, false)],
    );

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();

    let page = &result.pages[0];
    assert_eq!(page.checkboxes.len(), 2);
    assert!(page.checkboxes[0].is_marked);
    assert!(!page.checkboxes[1].is_marked);
    assert_eq!(page.groups.len(), 1);
    assert_eq!(page.groups[0].code, "0150");
    assert_eq!(page.groups[0].checkboxes.len(), 2);
    assert_eq!(page.groups[0].regime, CorrelationRegime::Wide);

    assert_eq!(result.settings.len(), 1);
    let s = &result.settings[0];
    assert!(s.is_active);
    assert_eq!(s.confidence, 0.95);
    assert_eq!(s.evidence, Evidence::Visual);
    assert!(result.audit.unattributed.is_empty());
}

#[test]
fn composite_section_with_two_marked_checkboxes() {
    let text = MockTextLayer {
        pages: vec![page(1, &[("0150: Binary inputs =:", 300.0)])],
    };
    let raster = MockRasterizer::default().with_page(
        1,
        vec![checkbox(210.0, 305.0, true), checkbox(210.0, 312.0, true)],
    );
    let profile = hex_profile();
    assert_eq!(profile.detector.density_threshold, 0.37);

    let result = process_document(&[], &text, &raster, &profile).unwrap();

    let page = &result.pages[0];
    assert_eq!(page.checkboxes.len(), 2);
    assert!(page.checkboxes.iter().all(|c| c.is_marked));
    assert_eq!(page.groups.len(), 1);
    assert_eq!(page.groups[0].checkboxes.len(), 2);

    assert_eq!(result.settings.len(), 1);
    let s = &result.settings[0];
    assert_eq!(s.code, "0150");
    assert!(s.is_active);
    assert_eq!(s.confidence, 0.95);
    assert_eq!(s.checkbox_count, 2);
}

// ---------------------------------------------------------------------------
// Multi-part records merge by base name across the document
// ---------------------------------------------------------------------------
#[test]
fn multipart_record_spanning_pages_is_one_setting() {
    let text = MockTextLayer {
        pages: vec![
            page(1, &[("0150: Binary input part 1 =: 1", 100.0)]),
            page(2, &[("0151: Binary input part 2 =: 0", 100.0)]),
        ],
    };
    let raster = MockRasterizer::default();

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();

    assert_eq!(result.settings.len(), 1);
    let s = &result.settings[0];
    assert_eq!(s.code, "0150");
    assert_eq!(s.description, "Binary input");
    assert_eq!(s.page, 1);
    assert_eq!(s.member_codes, vec!["0150", "0151"]);
    assert_eq!(s.value_or_label, "1");
    assert!(s.is_active);
    assert_eq!(result.summary.settings_active, 1);

    let trace = result.trace.as_ref().unwrap();
    assert_eq!(trace.entries.len(), 1);
    let parsed_pages: Vec<usize> = trace.entries[0]
        .evidence_spans
        .iter()
        .map(|span| span.page_number)
        .collect();
    assert_eq!(parsed_pages, vec![1, 2]);
}

#[test]
fn multipart_record_interrupted_by_other_line_is_one_setting() {
    let text = MockTextLayer {
        pages: vec![page(
            1,
            &[
                ("0150: Binary input part 1 =: 1", 100.0),
                ("0160: Rated frequency =: 60Hz", 130.0),
                ("0151: Binary input part 2 =: 0", 160.0),
            ],
        )],
    };
    let raster = MockRasterizer::default();

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();

    let codes: Vec<&str> = result.settings.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(codes, vec!["0150", "0160"]);
    let binary: Vec<_> = result
        .settings
        .iter()
        .filter(|s| s.description == "Binary input")
        .collect();
    assert_eq!(binary.len(), 1);
    assert_eq!(binary[0].member_codes, vec!["0150", "0151"]);
}

// ---------------------------------------------------------------------------
// Pixel positions follow the resolution the rasterizer actually used
// ---------------------------------------------------------------------------
#[test]
fn raster_resolution_overrides_profile_dpi() {
    let text = MockTextLayer {
        pages: vec![page(1, &[("0150: BI =:", 100.0)])],
    };
    let raster = MockRasterizer::default()
        .at_dpi(600)
        .with_page(1, vec![checkbox(130.0, 104.0, true)]);
    let profile = hex_profile();
    assert_eq!(profile.dpi, 300);

    let result = process_document(&[], &text, &raster, &profile).unwrap();

    let page = &result.pages[0];
    assert_eq!(page.scale, 600.0 / 72.0);
    assert_eq!(page.checkboxes.len(), 1);
    assert_eq!(page.groups.len(), 1);
    assert!(result.audit.unattributed.is_empty());
    assert!(result.settings[0].is_active);

    let trace = result.trace.as_ref().unwrap();
    let span = trace.entries[0]
        .evidence_spans
        .iter()
        .find(|span| span.matched_text == "marked")
        .unwrap();
    assert!(span.y_min > 100.0 && span.y_min < 106.0);
}

// ---------------------------------------------------------------------------
// Same-line value without a checkbox
// ---------------------------------------------------------------------------
#[test]
fn value_only_parameter_is_textual() {
    let text = MockTextLayer {
        pages: vec![page(1, &[("0162: Rated frequency =: 60Hz", 200.0)])],
    };
    let raster = MockRasterizer::default();

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();

    assert_eq!(result.settings.len(), 1);
    let s = &result.settings[0];
    assert_eq!(s.code, "0162");
    assert_eq!(s.value_or_label, "60Hz");
    assert!(s.is_active);
    assert_eq!(s.confidence, 0.80);
    assert_eq!(s.evidence, Evidence::Textual);
}

// ---------------------------------------------------------------------------
// A box-shaped glyph inside a text span is masked away
// ---------------------------------------------------------------------------
#[test]
fn masked_glyph_is_not_a_checkbox() {
    let mut p = page(1, &[("0150: Binary inputs =:", 300.0)]);
    p.lines.push(TextLine {
        line_index: 1,
        text: "O".into(),
        bbox: BBox::new(250.0, 380.0, 256.0, 386.0),
        words: vec![WordSpan {
            text: "O".into(),
            bbox: BBox::new(250.0, 380.0, 256.0, 386.0),
        }],
    });
    let glyph = BoxSpec {
        x_pt: 253.0,
        y_pt: 383.0,
        size_px: 15,
        marked: false,
    };
    let text = MockTextLayer { pages: vec![p] };

    let raster = MockRasterizer::default().with_page(1, vec![glyph]);
    let masked = process_document(&[], &text, &raster, &hex_profile()).unwrap();
    assert_eq!(masked.summary.checkboxes_detected, 0);
    assert_eq!(masked.pages[0].masked_spans, 5);

    let mut unmasked_profile = hex_profile();
    unmasked_profile.masking.enabled = false;
    let raster = MockRasterizer::default().with_page(1, vec![glyph]);
    let unmasked = process_document(&[], &text, &raster, &unmasked_profile).unwrap();
    assert_eq!(unmasked.summary.checkboxes_detected, 1);
}

// ---------------------------------------------------------------------------
// A checkbox far below every line is kept for audit
// ---------------------------------------------------------------------------
#[test]
fn distant_checkbox_is_unattributed() {
    let text = MockTextLayer {
        pages: vec![page(1, &[("0150: Binary inputs =:", 300.0)])],
    };
    let raster = MockRasterizer::default().with_page(1, vec![checkbox(210.0, 420.0, true)]);
    let mut profile = hex_profile();
    profile.correlation.tight_tolerance_pt = 8.0;

    let result = process_document(&[], &text, &raster, &profile).unwrap();

    assert!(result.pages[0].groups.is_empty());
    assert_eq!(result.audit.unattributed.len(), 1);
    assert_eq!(
        result.audit.unattributed[0].nearest_code.as_deref(),
        Some("0150")
    );
    assert_eq!(result.summary.checkboxes_unattributed, 1);
    assert_eq!(result.summary.checkboxes_detected, 1);
    assert!(result.settings.is_empty());
    assert_eq!(result.summary.no_evidence, 1);

    let trace = result.trace.unwrap();
    assert!(trace
        .warnings
        .iter()
        .any(|w| w.message.contains("not attributed")));
}

// ---------------------------------------------------------------------------
// Accounting: every detected checkbox is attributed or reported
// ---------------------------------------------------------------------------
#[test]
fn every_checkbox_accounted_for() {
    let text = MockTextLayer {
        pages: vec![page(
            1,
            &[
                ("0150: Binary inputs =:", 100.0),
                ("0162: Rated frequency =: 60Hz", 200.0),
                ("0170: Trip outputs =:", 300.0),
            ],
        )],
    };
    let raster = MockRasterizer::default().with_page(
        1,
        vec![
            checkbox(210.0, 50.0, true),
            checkbox(210.0, 104.0, true),
            checkbox(210.0, 130.0, false),
            checkbox(210.0, 230.0, true),
            checkbox(210.0, 304.0, false),
            checkbox(210.0, 400.0, true),
        ],
    );

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();
    let page = &result.pages[0];
    assert_eq!(page.checkboxes.len(), 6);
    assert_eq!(
        page.attributed_count() + page.unattributed.len(),
        page.checkboxes.len()
    );
    // above every line, below a single-valued head, and beyond the wide window
    assert_eq!(page.unattributed.len(), 3);
    assert_eq!(result.summary.settings_active, 2);
    assert_eq!(result.summary.settings_inactive, 1);
}

// ---------------------------------------------------------------------------
// Render failures stay on their page
// ---------------------------------------------------------------------------
#[test]
fn render_failure_is_isolated_to_page() {
    let text = MockTextLayer {
        pages: vec![
            page(1, &[("0162: Rated frequency =: 60Hz", 100.0)]),
            page(2, &[("0150: Binary inputs =:", 100.0)]),
            page(3, &[("0170: Reset delay =: 0.05 s", 100.0)]),
        ],
    };
    let raster = MockRasterizer::default().failing_on(2);

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();

    assert_eq!(result.summary.pages_total, 3);
    assert_eq!(result.summary.pages_failed, 1);
    assert_eq!(result.audit.page_failures[0].page, 2);
    let pages: Vec<usize> = result.pages.iter().map(|p| p.page).collect();
    assert_eq!(pages, vec![1, 3]);
    assert_eq!(result.settings.len(), 2);
}

#[test]
fn all_pages_failing_is_an_error() {
    let text = MockTextLayer {
        pages: vec![
            page(1, &[("0162: Rated frequency =: 60Hz", 100.0)]),
            page(2, &[("0150: Binary inputs =:", 100.0)]),
        ],
    };
    let raster = MockRasterizer::default().failing_on(1).failing_on(2);

    let err = process_document(&[], &text, &raster, &hex_profile()).unwrap_err();
    assert!(matches!(err, RelayScanError::AllPagesFailed { pages: 2 }));
}

// ---------------------------------------------------------------------------
// Key=value exports carry no checkboxes and are never rendered
// ---------------------------------------------------------------------------
#[test]
fn key_value_export_skips_rendering() {
    let text = MockTextLayer {
        pages: vec![page(
            1,
            &[("PROT.OC1.Enable=Off", 100.0), ("PROT.OC1.Pickup=1.5", 112.0)],
        )],
    };
    let raster = MockRasterizer::default();
    let profile = ScanProfile {
        vendor_family: Some(VendorFamily::KeyValue),
        ..ScanProfile::default()
    };

    let result = process_document(&[], &text, &raster, &profile).unwrap();

    assert_eq!(raster.calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.settings.len(), 2);
    assert!(!result.settings[0].is_active);
    assert!(result.settings[1].is_active);
}

// ---------------------------------------------------------------------------
// Family detection and determinism
// ---------------------------------------------------------------------------
#[test]
fn auto_profile_detects_family_and_is_deterministic() {
    let text = MockTextLayer {
        pages: vec![
            page(
                1,
                &[
                    ("10.01: Binary inputs", 100.0),
                    ("10.02: Rated frequency: 50 Hz", 150.0),
                ],
            ),
            page(2, &[("21.10: Trip outputs", 100.0)]),
        ],
    };
    let raster = MockRasterizer::default()
        .with_page(1, vec![checkbox(210.0, 104.0, true)])
        .with_page(2, vec![checkbox(210.0, 104.0, false)]);
    let profile = ScanProfile::default();

    let first = process_document(&[], &text, &raster, &profile).unwrap();
    let second = process_document(&[], &text, &raster, &profile).unwrap();

    assert_eq!(first.vendor_family, Some(VendorFamily::DottedDecimal));
    assert_eq!(
        serde_json::to_string(&first.settings).unwrap(),
        serde_json::to_string(&second.settings).unwrap()
    );
    assert_eq!(first.summary, second.summary);
    let codes: Vec<&str> = first.settings.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(codes, vec!["10.01", "10.02", "21.10"]);
    assert!(!first.settings[2].is_active);
}

#[test]
fn trace_explains_every_setting() {
    let text = MockTextLayer {
        pages: vec![page(
            1,
            &[
                ("0150: Binary inputs =:", 100.0),
                ("0162: Rated frequency =: 60Hz", 200.0),
            ],
        )],
    };
    let raster = MockRasterizer::default().with_page(1, vec![checkbox(210.0, 104.0, true)]);

    let result = process_document(&[], &text, &raster, &hex_profile()).unwrap();
    let trace = result.trace.as_ref().unwrap();

    assert_eq!(trace.trace_schema_version, "1.0");
    assert_eq!(trace.entries.len(), result.settings.len());
    let visual = trace.entries.iter().find(|e| e.code == "0150").unwrap();
    assert_eq!(visual.evidence_spans.len(), 2);
    assert!(visual.steps.len() >= 3);
}

#[test]
fn batch_processes_documents_independently() {
    let text = MockTextLayer {
        pages: vec![page(1, &[("0162: Rated frequency =: 60Hz", 100.0)])],
    };
    let raster = MockRasterizer::default();
    let docs = vec![
        SourceDocument {
            name: "a.pdf".into(),
            pdf_bytes: vec![],
        },
        SourceDocument {
            name: "b.pdf".into(),
            pdf_bytes: vec![],
        },
    ];

    let results = process_batch(&docs, &text, &raster, &hex_profile()).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "a.pdf");
    let first = results[0].1.as_ref().unwrap();
    assert_eq!(first.source.as_deref(), Some("a.pdf"));
    assert_eq!(first.settings.len(), 1);
}

#[test]
fn parse_pdf_text_only() {
    let text = MockTextLayer {
        pages: vec![page(
            1,
            &[
                ("0150: Binary inputs =:", 100.0),
                ("0162 Rated frequency", 112.0),
            ],
        )],
    };
    let parsed = parse_pdf(&[], &text, None).unwrap();
    assert_eq!(parsed.vendor_family, Some(VendorFamily::HexCode));
    assert_eq!(parsed.parameter_count(), 1);
    assert_eq!(parsed.skipped_count(), 1);
}
