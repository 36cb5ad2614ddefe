//! Page and document orchestration.
//!
//! Per page: rasterize, mask text, detect checkboxes, extract parameter
//! lines, correlate and resolve. Pages of a document and documents of a
//! batch run on a local rayon pool; results keep page order.

use crate::detection::mask::mask_text;
use crate::detection::DetectionStrategy;
use crate::error::RelayScanError;
use crate::extraction::{PageRasterizer, PageText, TextLayer};
use crate::model::VendorFamily;
use crate::parsing::{detect_family, extract_parameters, ParsedPage};
use crate::profiles::schema::ScanProfile;
use crate::resolve::outcome::{DocumentResult, PageFailure, PageResult};
use crate::resolve::{correlate, resolve};
use crate::trace::build_trace;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// One input of a batch run.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub pdf_bytes: Vec<u8>,
}

/// Process a single page.
///
/// Only a failing rasterizer can make this fail, and its error is scoped to
/// the page. Families without checkboxes skip rasterization entirely.
pub fn process_page(
    page_text: &PageText,
    rasterizer: &dyn PageRasterizer,
    pdf_bytes: &[u8],
    profile: &ScanProfile,
    family: Option<VendorFamily>,
) -> Result<PageResult, RelayScanError> {
    let page = page_text.page_number;
    let parsed = match family {
        Some(f) => extract_parameters(page_text, f),
        None => ParsedPage {
            page,
            ..ParsedPage::default()
        },
    };

    let mut scale = profile.scale();
    let mut checkboxes = Vec::new();
    let mut masked_spans = 0;

    if family.is_none_or(|f| f.uses_checkboxes()) {
        let raster = rasterizer.render_page(pdf_bytes, page, profile.dpi)?;
        scale = raster.scale();
        if raster.dpi != profile.dpi {
            tracing::debug!(page, dpi = raster.dpi, "raster resolution differs from profile");
        }
        let mut image = raster.image;
        let masked = mask_text(&mut image, page_text, profile, scale);
        masked_spans = masked.len();
        checkboxes = DetectionStrategy::from_profile(profile).detect(&image, page, &masked);
    }

    let correlation = correlate(&parsed.lines, &checkboxes, scale, &profile.correlation);
    let records = resolve(&parsed.lines, &correlation, page_text, &checkboxes, profile, scale);

    let mut result = PageResult::empty(page, scale);
    result.checkboxes = checkboxes;
    result.masked_spans = masked_spans;
    result.groups = correlation.groups;
    result.unattributed = correlation.unattributed;
    result.records = records;
    result.parameters = parsed.lines;
    result.skipped_lines = parsed.skipped_lines;

    tracing::info!(
        page,
        parameters = result.parameters.len(),
        checkboxes = result.checkboxes.len(),
        attributed = result.attributed_count(),
        unattributed = result.unattributed.len(),
        records = result.records.len(),
        "page processed"
    );
    Ok(result)
}

/// Process every page of a settings export.
///
/// Render failures are recorded per page in the audit report; the document
/// only fails when the text layer cannot be read or every page failed.
pub fn process_document(
    pdf_bytes: &[u8],
    text_layer: &dyn TextLayer,
    rasterizer: &dyn PageRasterizer,
    profile: &ScanProfile,
) -> Result<DocumentResult, RelayScanError> {
    let pool = build_pool(profile)?;
    pool.install(|| run_document(pdf_bytes, text_layer, rasterizer, profile))
}

/// Process several exports; each document succeeds or fails on its own.
pub fn process_batch(
    documents: &[SourceDocument],
    text_layer: &dyn TextLayer,
    rasterizer: &dyn PageRasterizer,
    profile: &ScanProfile,
) -> Result<Vec<(String, Result<DocumentResult, RelayScanError>)>, RelayScanError> {
    let pool = build_pool(profile)?;
    Ok(pool.install(|| {
        documents
            .par_iter()
            .map(|doc| {
                let result = run_document(&doc.pdf_bytes, text_layer, rasterizer, profile).map(
                    |mut r| {
                        r.source = Some(doc.name.clone());
                        r
                    },
                );
                if let Err(e) = &result {
                    tracing::warn!(document = %doc.name, error = %e, "document failed");
                }
                (doc.name.clone(), result)
            })
            .collect()
    }))
}

fn run_document(
    pdf_bytes: &[u8],
    text_layer: &dyn TextLayer,
    rasterizer: &dyn PageRasterizer,
    profile: &ScanProfile,
) -> Result<DocumentResult, RelayScanError> {
    let texts = text_layer.extract_pages(pdf_bytes)?;
    let family = profile.vendor_family.or_else(|| detect_family(&texts));
    match family {
        Some(f) => tracing::debug!(family = %f, "using vendor grammar"),
        None => tracing::warn!("no vendor grammar matched; checkboxes will be reported unattributed"),
    }

    let outcomes: Vec<(usize, Result<PageResult, RelayScanError>)> = texts
        .par_iter()
        .map(|t| {
            (
                t.page_number,
                process_page(t, rasterizer, pdf_bytes, profile, family),
            )
        })
        .collect();

    let mut pages = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (page, outcome) in outcomes {
        match outcome {
            Ok(result) => pages.push(result),
            Err(e) if e.is_page_scoped() => {
                tracing::warn!(page, error = %e, "page failed");
                failures.push(PageFailure {
                    page,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    if !texts.is_empty() && pages.is_empty() {
        return Err(RelayScanError::AllPagesFailed {
            pages: failures.len(),
        });
    }

    let mut result =
        DocumentResult::from_pages(&profile.name, family, texts.len(), pages, failures);
    result.trace = Some(build_trace(&result, &texts));

    let s = &result.summary;
    tracing::info!(
        pages = s.pages_total,
        failed = s.pages_failed,
        settings = result.settings.len(),
        active = s.settings_active,
        unattributed = s.checkboxes_unattributed,
        "document processed"
    );
    Ok(result)
}

fn build_pool(profile: &ScanProfile) -> Result<ThreadPool, RelayScanError> {
    let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("relayscan-{i}"));
    if let Some(n) = profile.parallelism.max_threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| RelayScanError::WorkerPool(e.to_string()))
}
