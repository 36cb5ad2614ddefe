use relayscan_core::error::RelayScanError;
use relayscan_core::DocumentResult;

/// One document serializes as an object, several as an array.
pub fn to_json(results: &[&DocumentResult]) -> Result<String, RelayScanError> {
    Ok(match results {
        [one] => serde_json::to_string_pretty(one)?,
        many => serde_json::to_string_pretty(many)?,
    })
}

pub fn print_documents(results: &[&DocumentResult]) -> Result<(), RelayScanError> {
    println!("{}", to_json(results)?);
    Ok(())
}
