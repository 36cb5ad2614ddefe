pub mod detection;
pub mod error;
pub mod extraction;
pub mod model;
pub mod parsing;
pub mod pipeline;
pub mod profiles;
pub mod resolve;
pub mod trace;

use error::RelayScanError;
use extraction::TextLayer;
use model::VendorFamily;
use parsing::ParsedDocument;

pub use pipeline::{process_batch, process_document, process_page, SourceDocument};
pub use resolve::outcome::{DocumentResult, DocumentSummary};

/// Text-only extraction: parameter lines of every page, no rendering.
///
/// The grammar is detected from the text layer when `family` is `None`.
pub fn parse_pdf(
    pdf_bytes: &[u8],
    text_layer: &dyn TextLayer,
    family: Option<VendorFamily>,
) -> Result<ParsedDocument, RelayScanError> {
    let pages = text_layer.extract_pages(pdf_bytes)?;
    Ok(parsing::parse_document(&pages, family))
}
