use crate::model::{
    ActiveSetting, Checkbox, CorrelationGroup, ParameterLine, SkippedLine, UnattributedCheckbox,
    VendorFamily,
};
use super::resolver::{decide_all, merge_records, Record};
use crate::trace::TraceBundle;
use serde::{Deserialize, Serialize};

/// A logical record with neither a checkbox nor a raw value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoEvidence {
    pub page: usize,
    pub code: String,
    pub description: String,
}

/// Everything produced for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based page number.
    pub page: usize,
    /// Parameter lines parsed from the text layer.
    pub parameters: Vec<ParameterLine>,
    /// Lines that looked like parameters but could not be parsed.
    pub skipped_lines: Vec<SkippedLine>,
    /// Every checkbox detected on the page, in reading order.
    pub checkboxes: Vec<Checkbox>,
    /// Checkboxes attributed to section heads.
    pub groups: Vec<CorrelationGroup>,
    /// Checkboxes outside every tolerance window.
    pub unattributed: Vec<UnattributedCheckbox>,
    /// Evidence per correlation section, in line order. Decided at document level.
    pub records: Vec<Record>,
    /// Text spans painted out before detection.
    pub masked_spans: usize,
    /// Pixels per point of the raster the checkboxes were measured on.
    pub scale: f32,
}

impl PageResult {
    /// Empty result for a page without any parameter line or checkbox.
    pub fn empty(page: usize, scale: f32) -> Self {
        PageResult {
            page,
            parameters: Vec::new(),
            skipped_lines: Vec::new(),
            checkboxes: Vec::new(),
            groups: Vec::new(),
            unattributed: Vec::new(),
            records: Vec::new(),
            masked_spans: 0,
            scale,
        }
    }

    pub fn attributed_count(&self) -> usize {
        self.groups.iter().map(|g| g.checkboxes.len()).sum()
    }
}

/// A page whose rasterization failed; the rest of the document was still processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFailure {
    pub page: usize,
    pub reason: String,
}

/// Items a reviewer should look at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
    pub unattributed: Vec<UnattributedCheckbox>,
    pub ambiguous: Vec<Checkbox>,
    pub skipped_lines: Vec<SkippedLine>,
    pub page_failures: Vec<PageFailure>,
    pub no_evidence: Vec<NoEvidence>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.unattributed.is_empty()
            && self.ambiguous.is_empty()
            && self.skipped_lines.is_empty()
            && self.page_failures.is_empty()
    }
}

/// Document-level counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub pages_total: usize,
    pub pages_failed: usize,
    pub lines_parsed: usize,
    pub lines_unparsed: usize,
    pub checkboxes_detected: usize,
    pub checkboxes_marked: usize,
    pub checkboxes_ambiguous: usize,
    pub checkboxes_unattributed: usize,
    pub settings_active: usize,
    pub settings_inactive: usize,
    pub settings_conflict: usize,
    pub no_evidence: usize,
}

/// Result of processing one settings export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Where the document came from (file path), when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Name of the scan profile used.
    pub profile: String,
    /// Grammar used for the text layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_family: Option<VendorFamily>,
    pub settings: Vec<ActiveSetting>,
    pub audit: AuditReport,
    pub summary: DocumentSummary,
    /// Per-page detail, in page order. Failed pages are absent.
    pub pages: Vec<PageResult>,
    /// Step-by-step explanation of every setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceBundle>,
}

impl DocumentResult {
    /// Assemble the document view from page results and failures.
    ///
    /// Multi-part records are merged by base name across all pages before
    /// they are decided.
    pub fn from_pages(
        profile: &str,
        vendor_family: Option<VendorFamily>,
        pages_total: usize,
        mut pages: Vec<PageResult>,
        mut failures: Vec<PageFailure>,
    ) -> Self {
        pages.sort_by_key(|p| p.page);
        failures.sort_by_key(|f| f.page);

        let mut audit = AuditReport::default();
        let mut summary = DocumentSummary {
            pages_total,
            pages_failed: failures.len(),
            ..DocumentSummary::default()
        };
        let mut records = Vec::new();

        for page in &pages {
            summary.lines_parsed += page.parameters.len();
            summary.lines_unparsed += page.skipped_lines.len();
            summary.checkboxes_detected += page.checkboxes.len();
            summary.checkboxes_marked += page.checkboxes.iter().filter(|c| c.is_marked).count();
            summary.checkboxes_unattributed += page.unattributed.len();

            let ambiguous: Vec<Checkbox> =
                page.checkboxes.iter().filter(|c| c.ambiguous).cloned().collect();
            summary.checkboxes_ambiguous += ambiguous.len();
            audit.ambiguous.extend(ambiguous);

            audit.unattributed.extend(page.unattributed.iter().cloned());
            audit.skipped_lines.extend(page.skipped_lines.iter().cloned());
            records.extend(page.records.iter().cloned());
        }

        let resolution = decide_all(&merge_records(records));
        let settings = resolution.settings;
        summary.no_evidence = resolution.no_evidence.len();
        audit.no_evidence = resolution.no_evidence;

        summary.settings_active = settings.iter().filter(|s| s.is_active).count();
        summary.settings_inactive = settings.len() - summary.settings_active;
        summary.settings_conflict = settings.iter().filter(|s| s.conflict).count();
        audit.page_failures = failures;

        DocumentResult {
            source: None,
            profile: profile.to_string(),
            vendor_family,
            settings,
            audit,
            summary,
            pages,
            trace: None,
        }
    }
}
