//! Correlation of checkboxes with parameter lines and resolution into
//! activation records.

pub mod correlator;
pub mod label;
pub mod outcome;
pub mod resolver;

pub use correlator::{build_sections, correlate, PageCorrelation, Section};
pub use outcome::{
    AuditReport, DocumentResult, DocumentSummary, NoEvidence, PageFailure, PageResult,
};
pub use resolver::{decide, decide_all, merge_records, resolve, Record, Resolution};
