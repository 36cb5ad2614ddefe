use relayscan_core::detection::calibrate::{
    calibrate, measure_region, CalibrationReport, LabeledRegion, LabeledSample,
};
use relayscan_core::detection::DetectorParams;
use relayscan_core::error::RelayScanError;
use relayscan_core::extraction::pdftoppm::PdftoppmRasterizer;
use relayscan_core::extraction::PageRasterizer;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn run(
    samples_file: Option<PathBuf>,
    pdf_file: Option<PathBuf>,
    densities_file: Option<PathBuf>,
    preset: &str,
    profile_file: Option<PathBuf>,
    output_format: &str,
) -> Result<(), RelayScanError> {
    let profile = super::select_profile(preset, profile_file)?;

    let samples: Vec<LabeledSample> = match (samples_file, pdf_file, densities_file) {
        (_, _, Some(path)) => serde_json::from_slice(&std::fs::read(path)?)?,
        (Some(samples), Some(pdf), None) => {
            let regions: Vec<LabeledRegion> = serde_json::from_slice(&std::fs::read(samples)?)?;
            let pdf_bytes = std::fs::read(pdf)?;
            let params = DetectorParams::from_profile(&profile);
            let rasterizer = PdftoppmRasterizer::new();

            let mut by_page: BTreeMap<usize, Vec<&LabeledRegion>> = BTreeMap::new();
            for region in &regions {
                by_page.entry(region.page).or_default().push(region);
            }

            let mut measured = Vec::with_capacity(regions.len());
            for (page, regions) in by_page {
                let raster = rasterizer.render_page(&pdf_bytes, page, profile.dpi)?;
                for region in regions {
                    measured.push(LabeledSample {
                        density: measure_region(&raster.image, region, &params)?,
                        marked: region.marked,
                    });
                }
            }
            measured
        }
        _ => {
            return Err(RelayScanError::Calibration(
                "provide --densities, or --samples together with --pdf".into(),
            ))
        }
    };

    let report = calibrate(&samples)?;
    match output_format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_report(&report, profile.detector.density_threshold),
    }
    Ok(())
}

fn print_report(report: &CalibrationReport, current: f32) {
    println!("Calibration over {} sample(s)\n", report.total);
    println!("  Marked mean density:    {:.3}", report.marked_mean);
    println!("  Unmarked mean density:  {:.3}", report.unmarked_mean);
    println!("  Midpoint:               {:.3}", report.midpoint);
    println!();
    println!("  Recommended threshold:  {:.3}", report.recommended_threshold);
    println!("  Current threshold:      {current:.3}");
    println!("  Closest sample margin:  {:.3}", report.margin);
    if report.misclassified > 0 {
        println!(
            "\n  {} sample(s) cannot be separated by any threshold; check their labels.",
            report.misclassified
        );
    }
}
