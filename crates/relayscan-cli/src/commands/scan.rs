use relayscan_core::error::RelayScanError;
use relayscan_core::extraction::pdftoppm::PdftoppmRasterizer;
use relayscan_core::extraction::pdftotext::PdftotextLayer;
use relayscan_core::profiles::schema::{ScanProfile, StrategyKind};
use relayscan_core::profiles::validate_profile;
use relayscan_core::{process_batch, process_document, DocumentResult, SourceDocument};
use std::path::PathBuf;

use crate::output;

pub struct ScanArgs {
    pub input_files: Vec<PathBuf>,
    pub preset: String,
    pub profile_file: Option<PathBuf>,
    pub output_format: String,
    pub out: Option<PathBuf>,
    pub trace: bool,
    pub no_mask: bool,
    pub threshold: Option<f32>,
    pub strategy: Option<String>,
    pub threads: Option<usize>,
}

pub fn run(args: ScanArgs) -> Result<(), RelayScanError> {
    let profile = effective_profile(&args)?;
    let text_layer = PdftotextLayer::new();
    let rasterizer = PdftoppmRasterizer::new();

    let mut results: Vec<(String, Result<DocumentResult, RelayScanError>)> =
        if let [single] = args.input_files.as_slice() {
            let pdf_bytes = std::fs::read(single)?;
            let mut result = process_document(&pdf_bytes, &text_layer, &rasterizer, &profile)?;
            result.source = Some(single.display().to_string());
            vec![(single.display().to_string(), Ok(result))]
        } else {
            let mut documents = Vec::with_capacity(args.input_files.len());
            for path in &args.input_files {
                documents.push(SourceDocument {
                    name: path.display().to_string(),
                    pdf_bytes: std::fs::read(path)?,
                });
            }
            process_batch(&documents, &text_layer, &rasterizer, &profile)?
        };

    if !args.trace {
        for (_, result) in results.iter_mut() {
            if let Ok(doc) = result {
                doc.trace = None;
            }
        }
    }

    let succeeded: Vec<&DocumentResult> = results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();

    if let Some(path) = &args.out {
        std::fs::write(path, output::json::to_json(&succeeded)?)?;
        eprintln!(
            "Scanned {} document(s), written to {}",
            succeeded.len(),
            path.display()
        );
    } else {
        match args.output_format.as_str() {
            "json" => output::json::print_documents(&succeeded)?,
            _ => {
                for (i, doc) in succeeded.iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    output::table::print_document(doc);
                }
            }
        }
    }

    let mut failed = 0;
    for (name, result) in &results {
        if let Err(e) = result {
            eprintln!("  {name}: {e}");
            failed += 1;
        }
    }
    if succeeded.is_empty() && failed > 0 {
        return Err(RelayScanError::AllDocumentsFailed { documents: failed });
    }
    Ok(())
}

fn effective_profile(args: &ScanArgs) -> Result<ScanProfile, RelayScanError> {
    let mut profile = super::select_profile(&args.preset, args.profile_file.clone())?;
    if args.no_mask {
        profile.masking.enabled = false;
    }
    if let Some(threshold) = args.threshold {
        profile.detector.density_threshold = threshold;
    }
    if let Some(strategy) = &args.strategy {
        profile.detector.strategy = match strategy.to_lowercase().as_str() {
            "contour" | "contour_density" => StrategyKind::ContourDensity,
            "template" | "template_match" => StrategyKind::TemplateMatch,
            other => {
                return Err(RelayScanError::ProfileInvalid(format!(
                    "unknown strategy '{other}'. Available: contour, template"
                )))
            }
        };
    }
    if args.threads.is_some() {
        profile.parallelism.max_threads = args.threads;
    }
    validate_profile(&profile)?;
    Ok(profile)
}
