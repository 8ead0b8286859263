//! Rule-based extractors for pasted CBC text.

pub mod differential;
pub mod fields;
pub mod morphology;
pub mod patterns;
pub mod synonyms;

pub use differential::{classify_differential, DifferentialClassifier};
pub use fields::{extract_lab_values, FieldExtractor};
pub use morphology::{extract_morphology, MorphologyExtractor};
pub use patterns::*;
pub use synonyms::{canonical_cell_type, normalize_label};

use std::str::FromStr;

use rust_decimal::Decimal;

/// Trait for rule-based extractors.
///
/// Extractors never fail: labels that do not match, or whose capture cannot be
/// coerced, are omitted from the output. When a label occurs more than once in
/// the text only the first occurrence is used; later occurrences are not
/// consulted even if the first one was malformed.
pub trait Extractor {
    /// The structured output of this extractor.
    type Output;

    /// Extract from text.
    fn extract(&self, text: &str) -> Self::Output;
}

/// A captured label/value pair before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Label text as written.
    pub label: String,
    /// Captured value text.
    pub raw: String,
    /// Full source line.
    pub line: String,
    /// 1-based line number.
    pub line_number: usize,
}

impl RawMatch {
    pub fn new(label: impl Into<String>, raw: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            raw: raw.into(),
            line: line.into(),
            line_number: 0,
        }
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }
}

/// Parse a captured number, dropping trailing sentence periods and
/// normalizing trailing zeros (`7.20` becomes `7.2`).
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok().map(|d| d.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("7.20"), Some(Decimal::new(72, 1)));
        assert_eq!(parse_decimal("13.1."), Some(Decimal::new(131, 1)));
        assert_eq!(parse_decimal("250"), Some(Decimal::new(250, 0)));
        assert_eq!(parse_decimal("7.2.1"), None);
        assert_eq!(parse_decimal("."), None);
        assert_eq!(parse_decimal(""), None);
    }
}
