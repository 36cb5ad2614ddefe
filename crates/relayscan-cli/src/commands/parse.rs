use relayscan_core::error::RelayScanError;
use relayscan_core::extraction::pdftotext::PdftotextLayer;
use relayscan_core::model::VendorFamily;
use std::path::PathBuf;

use crate::output;

pub fn run(
    pdf_file: PathBuf,
    family: Option<&str>,
    output_format: &str,
) -> Result<(), RelayScanError> {
    let family = family.map(parse_family).transpose()?;

    let pdf_bytes = std::fs::read(&pdf_file)?;
    let layer = PdftotextLayer::new();
    let parsed = relayscan_core::parse_pdf(&pdf_bytes, &layer, family)?;

    match output_format {
        "json" => println!("{}", serde_json::to_string_pretty(&parsed)?),
        _ => println!("{}", output::table::format_parsed(&parsed)),
    }

    if parsed.skipped_count() > 0 {
        eprintln!("  {} line(s) skipped during parsing", parsed.skipped_count());
    }
    Ok(())
}

fn parse_family(name: &str) -> Result<VendorFamily, RelayScanError> {
    VendorFamily::from_str_loose(name).ok_or_else(|| {
        RelayScanError::ProfileInvalid(format!(
            "unknown family '{name}'. Available: dotted, hex, keyvalue"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_family() {
        assert_eq!(parse_family("hex").unwrap(), VendorFamily::HexCode);
        let err = parse_family("siemens").unwrap_err();
        assert!(matches!(err, RelayScanError::ProfileInvalid(_)));
        assert!(err.to_string().contains("unknown family 'siemens'"));
    }
}
