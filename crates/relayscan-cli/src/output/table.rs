use relayscan_core::model::ActiveSetting;
use relayscan_core::parsing::ParsedDocument;
use relayscan_core::DocumentResult;

pub fn print_document(result: &DocumentResult) {
    if let Some(ref source) = result.source {
        println!("--- {} ---\n", source);
    }
    let family = match result.vendor_family {
        Some(f) => f.to_string(),
        None => "undetected".to_string(),
    };
    println!("Profile: {}  Grammar: {}\n", result.profile, family);

    let active: Vec<&ActiveSetting> = result.settings.iter().filter(|s| s.is_active).collect();
    if active.is_empty() {
        println!("  No active settings.\n");
    } else {
        print_settings("Active settings", &active);
    }

    let inactive: Vec<&ActiveSetting> = result.settings.iter().filter(|s| !s.is_active).collect();
    if !inactive.is_empty() {
        print_settings("Inactive", &inactive);
    }

    print_audit(result);

    let s = &result.summary;
    println!(
        "  {} page(s), {} failed; {} parameter line(s), {} unparsed",
        s.pages_total, s.pages_failed, s.lines_parsed, s.lines_unparsed
    );
    println!(
        "  {} checkbox(es): {} marked, {} ambiguous, {} unattributed",
        s.checkboxes_detected, s.checkboxes_marked, s.checkboxes_ambiguous, s.checkboxes_unattributed
    );
    println!(
        "  {} active, {} inactive, {} conflicting",
        s.settings_active, s.settings_inactive, s.settings_conflict
    );
}

fn print_settings(title: &str, settings: &[&ActiveSetting]) {
    println!("  {title}:");
    let code_w = settings.iter().map(|s| s.code.len()).max().unwrap_or(4);
    let desc_w = settings
        .iter()
        .map(|s| s.description.chars().count())
        .max()
        .unwrap_or(10)
        .min(40);

    for s in settings {
        let mut flags = Vec::new();
        if s.conflict {
            flags.push("conflict");
        }
        if s.ambiguous {
            flags.push("ambiguous");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("  ({})", flags.join(", "))
        };
        println!(
            "    p{:<3} {:<cw$}  {:<dw$}  {:<20}  {:<7} {:.2}{}",
            s.page,
            s.code,
            truncate(&s.description, desc_w),
            truncate(&s.value_or_label, 20),
            s.evidence.to_string(),
            s.confidence,
            flags,
            cw = code_w,
            dw = desc_w
        );
        if s.member_codes.len() > 1 {
            println!("          parts: {}", s.member_codes.join(", "));
        }
    }
    println!();
}

fn print_audit(result: &DocumentResult) {
    let audit = &result.audit;
    if audit.is_clean() && audit.no_evidence.is_empty() {
        return;
    }
    println!("  Review:");
    for f in &audit.page_failures {
        println!("    page {} not rendered: {}", f.page, f.reason);
    }
    for u in &audit.unattributed {
        let near = match (&u.nearest_code, u.nearest_distance_pt) {
            (Some(code), Some(d)) => format!(" (nearest {code}, {d:.1} pt)"),
            _ => String::new(),
        };
        println!(
            "    page {} checkbox at ({}, {}) px not attributed{}",
            u.checkbox.page, u.checkbox.x_px, u.checkbox.y_px, near
        );
    }
    for c in &audit.ambiguous {
        println!(
            "    page {} checkbox at ({}, {}) px ambiguous, density {:.3}",
            c.page, c.x_px, c.y_px, c.density
        );
    }
    for l in &audit.skipped_lines {
        println!("    page {} line {} skipped: {} [{}]", l.page, l.line_index, l.reason, l.line_text);
    }
    for n in &audit.no_evidence {
        println!("    page {} {} {}: no checkbox or value", n.page, n.code, n.description);
    }
    println!();
}

pub fn format_parsed(parsed: &ParsedDocument) -> String {
    let mut out = String::new();
    let family = match parsed.vendor_family {
        Some(f) => f.to_string(),
        None => "undetected".to_string(),
    };
    out.push_str(&format!(
        "Grammar: {}  ({} parameter line(s), {} skipped)\n\n",
        family,
        parsed.parameter_count(),
        parsed.skipped_count()
    ));

    for page in &parsed.pages {
        if page.lines.is_empty() && page.skipped_lines.is_empty() {
            continue;
        }
        out.push_str(&format!("=== Page {} ===\n\n", page.page));
        let code_w = page.lines.iter().map(|l| l.code.len()).max().unwrap_or(4);
        for line in &page.lines {
            let value = match &line.value {
                Some(v) => v.to_string(),
                None if line.raw_value.is_empty() => "-".to_string(),
                None => line.raw_value.clone(),
            };
            let part = match &line.multipart {
                Some(mp) => match mp.part_total {
                    Some(total) => format!("  [part {}/{}]", mp.part_index, total),
                    None => format!("  [part {}]", mp.part_index),
                },
                None => String::new(),
            };
            out.push_str(&format!(
                "  {:<cw$}  {:<40}  {}{}\n",
                line.code,
                truncate(&line.description, 40),
                value,
                part,
                cw = code_w
            ));
        }
        for skipped in &page.skipped_lines {
            out.push_str(&format!("  ! line {}: {}\n", skipped.line_index, skipped.reason));
        }
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayscan_core::model::{ParameterLine, SkippedLine, VendorFamily};
    use relayscan_core::parsing::multipart::parse_multipart;
    use relayscan_core::parsing::ParsedPage;

    fn parsed() -> ParsedDocument {
        let line = |idx: usize, code: &str, description: &str, value: &str| ParameterLine {
            code: code.into(),
            description: description.into(),
            raw_value: value.into(),
            y_point: 100.0 + 12.0 * idx as f32,
            x_point: 50.0,
            page: 1,
            vendor_family: VendorFamily::HexCode,
            line_index: idx,
            multipart: parse_multipart(description),
            value: None,
        };
        ParsedDocument {
            vendor_family: Some(VendorFamily::HexCode),
            pages: vec![
                ParsedPage {
                    page: 1,
                    lines: vec![
                        line(0, "0150", "Binary input part 1", ""),
                        line(1, "0162", "Rated frequency", "60Hz"),
                    ],
                    skipped_lines: vec![SkippedLine {
                        page: 1,
                        line_index: 2,
                        line_text: "0170 Trip".into(),
                        reason: "hex code without ':' separator".into(),
                    }],
                },
                ParsedPage {
                    page: 2,
                    lines: Vec::new(),
                    skipped_lines: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_format_parsed() {
        let text = format_parsed(&parsed());
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("(2 parameter line(s), 1 skipped)"));
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "=== Page 1 ===");
        assert!(lines[4].starts_with("  0150  Binary input part 1"));
        assert!(lines[4].ends_with("-  [part 1]"));
        assert!(lines[5].ends_with("60Hz"));
        assert_eq!(lines[6], "  ! line 2: hex code without ':' separator");
        assert!(!text.contains("Page 2"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Binary input", 20), "Binary input");
        assert_eq!(truncate("Breaker failure protection", 10), "Breaker f…");
    }
}
