use relayscan_core::error::RelayScanError;
use relayscan_core::profiles::builtin;
use relayscan_core::profiles::schema::{ScanProfile, StrategyKind};
use std::path::Path;

pub fn list() -> Result<(), RelayScanError> {
    println!("Available predefined profiles:\n");
    for name in builtin::PRESETS {
        let p = builtin::load_preset(name)?;
        let family = match p.vendor_family {
            Some(f) => format!(" [{f}]"),
            None => " [detect]".to_string(),
        };
        println!("  {:<9} {} (v{}){}", name, p.name, p.version, family);
        if let Some(ref desc) = p.description {
            println!("            {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn explain(preset: &str) -> Result<(), RelayScanError> {
    let p = builtin::load_preset(preset)?;
    print_explanation(&p);
    Ok(())
}

fn print_explanation(p: &ScanProfile) {
    println!("{} (version {})\n", p.name, p.version);
    if let Some(ref desc) = p.description {
        println!("{}\n", desc);
    }

    match p.vendor_family {
        Some(f) if !f.uses_checkboxes() => {
            println!("Text grammar: {f}. Pages are not rendered; each value alone");
            println!("decides whether a setting is active.\n");
            return;
        }
        Some(f) => println!("Text grammar: {f}."),
        None => println!("Text grammar: detected from the first lines of each document."),
    }

    let d = &p.detector;
    println!("Pages are rendered at {} dpi (scale {:.3} px/pt).\n", p.dpi, p.scale());

    println!("Checkbox detection:");
    match d.strategy {
        StrategyKind::ContourDensity => {
            println!("  Outer contours of the binarized page are kept when they are")
        }
        StrategyKind::TemplateMatch => {
            println!("  Hollow squares are matched against the binarized page when they are")
        }
    }
    println!(
        "  {:.0}-{:.0} px wide, aspect {}-{}, area at least {:.0} px².",
        p.px(d.min_size_px as f32),
        p.px(d.max_size_px as f32),
        d.min_aspect,
        d.max_aspect,
        p.px_area(d.min_area_px)
    );
    println!(
        "  The interior is measured {} px inside the border; a box is marked",
        p.shrink_margin()
    );
    println!(
        "  when its ink density is above {} (ambiguous within ±{}).\n",
        d.density_threshold, d.ambiguity_band
    );

    if p.masking.enabled {
        println!(
            "Text-layer words are painted out first ({} px padding){}.\n",
            p.px(p.masking.padding_px as f32).round(),
            if p.masking.skip_checkbox_glyphs {
                ", except checkbox glyphs"
            } else {
                ""
            }
        );
    } else {
        println!("Text masking is disabled.\n");
    }

    let c = &p.correlation;
    println!("Correlation:");
    println!(
        "  A checkbox belongs to the nearest preceding parameter line within {} pt;",
        c.tight_tolerance_pt
    );
    println!(
        "  composite sections reach {} pt. Lines up to {} pt below a checkbox",
        c.wide_tolerance_pt, c.row_slack_pt
    );
    println!("  centre still count as its row.\n");

    println!(
        "Labels: up to {} word(s) / {} chars within {:.0} px right of a marked box.\n",
        p.labels.max_words,
        p.labels.max_chars,
        p.px(p.labels.search_width_px as f32)
    );
}

pub fn schema() -> Result<(), RelayScanError> {
    print!(
        r#"JSON Profile Schema
===================

A profile carries everything that depends on the vendor and on scan
quality. Pixel values are given at 300 dpi and scaled to the profile dpi.
Every section is optional and falls back to the defaults shown.

Top-level fields:
  name            (string, required)  Human-readable name
  description     (string, optional)  What this profile is for
  version         (string, required)  Version identifier (e.g., "2026.1")
  vendor_family   (string, optional)  "dotted_decimal", "hex_code" or
                                      "key_value". Omit to detect per document.
  dpi             (number, optional)  Render resolution, 72..=1200. Default 300

detector:
  strategy            "contour_density" (default) or "template_match"
  min_size_px         Smallest checkbox side. Default 8
  max_size_px         Largest checkbox side. Default 40
  min_aspect          Lowest width/height ratio. Default 0.7
  max_aspect          Highest width/height ratio. Default 1.3
  min_area_px         Smallest outline area. Default 50
  shrink_margin_px    Border excluded from the density measure. Default 3
  block_size_px       Adaptive threshold window. Default 11
  threshold_c         Offset below the local mean counted as ink. Default 2
  density_threshold   Marked when density is strictly above. Default 0.37
                      Calibrate per scan quality with `relayscan calibrate`.
  ambiguity_band      Reported ambiguous within this distance. Default 0.03
  template_max_score  Worst hollow-square score accepted. Default 0.35

masking:
  enabled               Paint text-layer words out. Default true
  padding_px            Extra pixels around each word. Default 1
  skip_checkbox_glyphs  Leave ☐/☒ glyph spans visible. Default true

correlation:
  tight_tolerance_pt    One-code-one-checkbox window. Default 8
  wide_tolerance_pt     Composite section window. Default 50
  row_slack_pt          Line may start this far below the box. Default 2

labels:
  search_width_px   Strip right of a marked box. Default 200
  max_words         Default 4
  max_chars         Default 40

parallelism:
  max_threads       Worker threads. Default: one per CPU

Example:
{{
  "name": "Substation B scans",
  "version": "1.0",
  "vendor_family": "hex_code",
  "dpi": 300,
  "detector": {{ "density_threshold": 0.42, "ambiguity_band": 0.04 }},
  "correlation": {{ "wide_tolerance_pt": 60.0 }}
}}
"#
    );
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), RelayScanError> {
    let p = relayscan_core::profiles::load_profile(file)?;

    println!("Profile '{}' (v{}) is valid.", p.name, p.version);
    match p.vendor_family {
        Some(f) => println!("  Grammar: {f}"),
        None => println!("  Grammar: detect per document"),
    }
    println!(
        "  Threshold: {} at {} dpi",
        p.detector.density_threshold, p.dpi
    );

    let mut warnings = Vec::new();
    if p.px(p.detector.min_size_px as f32) < 6.0 {
        warnings.push(format!(
            "min_size_px scales to {:.1} px at {} dpi; text specks may pass",
            p.px(p.detector.min_size_px as f32),
            p.dpi
        ));
    }
    if !p.masking.enabled {
        warnings.push("masking disabled; letters like 'O' may be detected as checkboxes".into());
    }
    if p.correlation.wide_tolerance_pt > 8.0 * p.correlation.tight_tolerance_pt {
        warnings.push(format!(
            "wide_tolerance_pt {} is far above tight_tolerance_pt {}; distant boxes may be attributed",
            p.correlation.wide_tolerance_pt, p.correlation.tight_tolerance_pt
        ));
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }
    Ok(())
}
