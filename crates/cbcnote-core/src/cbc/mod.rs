//! CBC text extraction and narrative composition.

pub mod narrative;
mod parser;
pub mod rules;

pub use narrative::{NarrativeComposer, NarrativeParagraph};
pub use parser::{LabTextParser, ParseOutcome, RuleBasedParser};

use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Parse pasted lab text with the default rule-based parser.
pub fn parse_lab_text(text: &str) -> Result<ParseOutcome> {
    RuleBasedParser::new().parse(text)
}

/// Parse lab text and compose its narrative paragraph with default phrasing.
pub fn narrate(text: &str) -> Result<String> {
    let outcome = parse_lab_text(text)?;
    Ok(NarrativeComposer::default().compose(&outcome.bundle).text())
}
