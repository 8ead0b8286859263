//! Rule-based lab text parser: runs every extractor over the same text.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::bundle::{DifferentialStatus, ParsedBundle};

use super::rules::{DifferentialClassifier, Extractor, FieldExtractor, MorphologyExtractor};
use super::Result;

/// Result of parsing one block of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Extracted data plus the original text.
    pub bundle: ParsedBundle,
    /// Diagnostic notes about what could not be recognized.
    pub warnings: Vec<String>,
}

/// Trait for lab text parsing.
pub trait LabTextParser {
    /// Parse lab text into a bundle.
    ///
    /// Either a complete bundle or an error is returned, never a partial bundle.
    fn parse(&self, text: &str) -> Result<ParseOutcome>;
}

/// Parser combining the field, differential and morphology extractors.
pub struct RuleBasedParser {
    fields: FieldExtractor,
    differential: DifferentialClassifier,
    morphology: MorphologyExtractor,
}

impl RuleBasedParser {
    /// Create a new parser with the built-in rule tables.
    pub fn new() -> Self {
        Self {
            fields: FieldExtractor::new(),
            differential: DifferentialClassifier::new(),
            morphology: MorphologyExtractor::new(),
        }
    }

    fn extract_bundle(&self, text: &str) -> ParsedBundle {
        ParsedBundle {
            labs: self.fields.extract(text),
            differential: self.differential.extract(text),
            morphology: self.morphology.extract(text),
            raw_text: text.to_string(),
        }
    }

    fn warnings_for(bundle: &ParsedBundle) -> Vec<String> {
        let mut warnings = Vec::new();

        if bundle.raw_text.trim().is_empty() {
            warnings.push("Input text is empty".to_string());
            return warnings;
        }

        if !bundle.has_numeric_labs() {
            warnings.push("No lab values recognized".to_string());
        }

        match bundle.differential.status {
            DifferentialStatus::NotPerformed => {
                warnings.push("Differential declared not performed".to_string());
            }
            _ if bundle.differential.entries.is_empty() => {
                warnings.push("No differential percentages recognized".to_string());
            }
            _ => {}
        }

        warnings
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LabTextParser for RuleBasedParser {
    fn parse(&self, text: &str) -> Result<ParseOutcome> {
        info!("Parsing lab text from {} characters", text.len());

        let bundle = run_guarded(|| self.extract_bundle(text))?;
        let warnings = Self::warnings_for(&bundle);

        debug!(
            "Extracted {} lab values, {} differential entries, {} morphology findings",
            bundle.labs.len(),
            bundle.differential.entries.len(),
            bundle.morphology.len()
        );

        Ok(ParseOutcome { bundle, warnings })
    }
}

/// Run an extraction pass, converting a panic into `ExtractionError::Internal`.
pub(crate) fn run_guarded<F>(extract: F) -> Result<ParsedBundle>
where
    F: FnOnce() -> ParsedBundle,
{
    panic::catch_unwind(AssertUnwindSafe(extract)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        warn!("Lab text parsing failed: {}", message);
        ExtractionError::Internal(message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown error".to_string()
    }
}
