//! Differential classification.
//!
//! Source systems frequently report the same cell type more than once: an
//! instrument value, a manual override, a bare label next to a `(%)`-qualified
//! one. Lines are scanned one at a time, labels are normalized through the
//! synonym table, and each canonical cell type keeps exactly one entry:
//!
//! 1. lines carrying an absolute-count marker are skipped;
//! 2. `label: number` lines are captured, unknown labels discarded;
//! 3. each entry is ranked by how its label is qualified (`(%)` > `(other)` > bare);
//! 4. the highest rank wins, and on equal rank the earliest line wins.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::models::bundle::{
    CellType, DifferentialEntry, DifferentialResult, DifferentialStatus, Priority,
};

use super::patterns::{
    ABSOLUTE_MARKER, DIFFERENTIAL_LINE, DIFFERENTIAL_METHOD, NOT_PERFORMED, PAREN_QUALIFIER,
    PERCENT_QUALIFIER,
};
use super::synonyms::canonical_cell_type;
use super::{parse_decimal, Extractor, RawMatch};

/// Differential classifier.
pub struct DifferentialClassifier;

impl DifferentialClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Capture `label: number` pairs line by line, skipping absolute counts.
    pub fn scan(&self, text: &str) -> Vec<RawMatch> {
        let mut matches = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if ABSOLUTE_MARKER.is_match(line) {
                trace!("Skipping absolute count line {}", index + 1);
                continue;
            }

            let Some(caps) = DIFFERENTIAL_LINE.captures(line) else {
                continue;
            };

            // A `Label: qualifier: value` line is treated like `Label (qualifier): value`
            let label = match caps.get(2) {
                Some(qualifier) => format!("{} ({})", &caps[1], qualifier.as_str()),
                None => caps[1].to_string(),
            };

            matches.push(
                RawMatch::new(label, &caps[3], line.trim()).with_line_number(index + 1),
            );
        }

        matches
    }

    /// Normalize one captured pair into a ranked entry.
    pub fn classify(&self, raw: &RawMatch) -> Option<DifferentialEntry> {
        let Some(cell_type) = canonical_cell_type(&raw.label) else {
            trace!("No canonical cell type for {:?}", raw.label);
            return None;
        };

        let percent = parse_decimal(&raw.raw)?;
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            debug!(
                "Dropping out-of-range {} percentage {} on line {}",
                cell_type.key(),
                percent,
                raw.line_number
            );
            return None;
        }

        Some(DifferentialEntry {
            cell_type,
            percent,
            priority: priority_of(&raw.label),
            source_line: raw.line.clone(),
        })
    }

    /// Keep one entry per cell type: strictly higher priority replaces,
    /// equal priority keeps the earlier entry.
    pub fn resolve<I>(&self, entries: I) -> BTreeMap<CellType, DifferentialEntry>
    where
        I: IntoIterator<Item = DifferentialEntry>,
    {
        let mut resolved = BTreeMap::new();

        for entry in entries {
            match resolved.entry(entry.cell_type) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    if entry.priority > slot.get().priority {
                        debug!(
                            "{}: {:?} replaces {:?}",
                            entry.cell_type.key(),
                            entry.source_line,
                            slot.get().source_line
                        );
                        slot.insert(entry);
                    } else {
                        debug!(
                            "{}: keeping {:?} over {:?}",
                            entry.cell_type.key(),
                            slot.get().source_line,
                            entry.source_line
                        );
                    }
                }
            }
        }

        resolved
    }

    /// Declared differential method, if a method line is present.
    pub fn detect_method(&self, text: &str) -> Option<String> {
        DIFFERENTIAL_METHOD
            .captures(text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|method| !method.is_empty())
    }
}

impl Default for DifferentialClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for DifferentialClassifier {
    type Output = DifferentialResult;

    fn extract(&self, text: &str) -> Self::Output {
        let method = self.detect_method(text);

        if let Some(method) = &method {
            if is_not_performed(method) {
                debug!("Differential declared not performed: {:?}", method);
                return DifferentialResult::not_performed(method.clone());
            }
        }

        let status = if method.is_some() {
            DifferentialStatus::Performed
        } else {
            DifferentialStatus::NotDeclared
        };

        let raw_matches = self.scan(text);
        let entries = self.resolve(raw_matches.iter().filter_map(|m| self.classify(m)));

        DifferentialResult {
            method,
            status,
            entries,
        }
    }
}

/// Rank a label by its qualifier.
pub fn priority_of(label: &str) -> Priority {
    if PERCENT_QUALIFIER.is_match(label) {
        Priority::PercentQualified
    } else if PAREN_QUALIFIER.is_match(label) {
        Priority::Qualified
    } else {
        Priority::Bare
    }
}

/// Whether a method value declares the differential was not performed.
pub fn is_not_performed(method: &str) -> bool {
    NOT_PERFORMED.is_match(method)
}

/// Classify the differential in text.
pub fn classify_differential(text: &str) -> DifferentialResult {
    DifferentialClassifier::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_percent_qualifier_beats_bare() {
        let result = classify_differential("Lymphs: 40\nLymphs (%): 42");
        assert_eq!(result.get(CellType::Lymphocytes), Some(dec("42")));

        // Order does not matter for strictly higher priority
        let result = classify_differential("Lymphs (%): 42\nLymphs: 40");
        assert_eq!(result.get(CellType::Lymphocytes), Some(dec("42")));
    }

    #[test]
    fn test_percent_beats_other_qualifier() {
        let text = "Neutrophils (auto): 58\nNeutrophils (%): 61\nPolys: 50";
        let result = classify_differential(text);
        assert_eq!(result.get(CellType::Neutrophils), Some(dec("61")));
        assert_eq!(
            result.entries[&CellType::Neutrophils].priority,
            Priority::PercentQualified
        );
    }

    #[test]
    fn test_worded_percent_qualifier_beats_other_qualifier() {
        let result = classify_differential("Lymphs (auto): 28\nLymphs (% of WBC): 31");
        assert_eq!(result.get(CellType::Lymphocytes), Some(dec("31")));
        assert_eq!(
            result.entries[&CellType::Lymphocytes].priority,
            Priority::PercentQualified
        );
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let result = classify_differential("Polys: 50\nNeutrophils: 55");
        assert_eq!(result.get(CellType::Neutrophils), Some(dec("50")));
        assert_eq!(result.entries[&CellType::Neutrophils].source_line, "Polys: 50");
    }

    #[test]
    fn test_colon_qualifier_ranks_as_qualified() {
        let result = classify_differential("Lymphs: 30\nLymphs: Manual: 33");
        assert_eq!(result.get(CellType::Lymphocytes), Some(dec("33")));
        assert_eq!(result.entries[&CellType::Lymphocytes].priority, Priority::Qualified);
    }

    #[test]
    fn test_absolute_counts_excluded() {
        let text = "Neutrophils #: 4.2\nLymphs, Absolute: 2.1\nMonocytes: 0.5 x10^3/uL\nEos: 3";
        let result = classify_differential(text);
        assert_eq!(result.get(CellType::Neutrophils), None);
        assert_eq!(result.get(CellType::Lymphocytes), None);
        assert_eq!(result.get(CellType::Monocytes), None);
        assert_eq!(result.get(CellType::Eosinophils), Some(dec("3")));
    }

    #[test]
    fn test_canonical_uniqueness() {
        let text = "Segs: 50\nPolys: 51\nNeutrophils: 52\nNeut (auto): 53\nNeutrophils (%): 54\nNeutrophils, Segmented: 55";
        let result = classify_differential(text);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.get(CellType::Neutrophils), Some(dec("54")));
    }

    #[test]
    fn test_atypical_reactive_label() {
        let text = "Lymphs, atypical/reactive (auto): 4\nLymphs: 30";
        let result = classify_differential(text);
        assert_eq!(result.get(CellType::AtypicalLymphocytes), Some(dec("4")));
        assert_eq!(result.get(CellType::Lymphocytes), Some(dec("30")));
    }

    #[test]
    fn test_unknown_and_out_of_range_dropped() {
        let text = "Widgets: 12\nBlasts: 140\nBasos: 1";
        let result = classify_differential(text);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.get(CellType::Basophils), Some(dec("1")));
    }

    #[test]
    fn test_not_performed_short_circuits() {
        let text = "Differential Method: Not Performed\nNeutrophils: 55\nLymphs: 30";
        let result = classify_differential(text);
        assert_eq!(result.status, DifferentialStatus::NotPerformed);
        assert_eq!(result.method.as_deref(), Some("Not Performed"));
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_method_declared() {
        let result = classify_differential("Diff Type: Manual\nBands: 8");
        assert_eq!(result.status, DifferentialStatus::Performed);
        assert_eq!(result.method.as_deref(), Some("Manual"));
        assert_eq!(result.get(CellType::Bands), Some(dec("8")));

        let result = classify_differential("Bands: 8");
        assert_eq!(result.status, DifferentialStatus::NotDeclared);
        assert_eq!(result.method, None);
    }

    #[test]
    fn test_priority_of() {
        assert_eq!(priority_of("Lymphs (%)"), Priority::PercentQualified);
        assert_eq!(priority_of("Lymphs ( % )"), Priority::PercentQualified);
        assert_eq!(priority_of("Lymphs (% of WBC)"), Priority::PercentQualified);
        assert_eq!(priority_of("Lymphs (Manual %)"), Priority::PercentQualified);
        assert_eq!(priority_of("Lymphs (auto)"), Priority::Qualified);
        assert_eq!(priority_of("NRBC%"), Priority::Bare);
        assert_eq!(priority_of("Lymphs"), Priority::Bare);
    }

    #[test]
    fn test_scan_records_line_numbers() {
        let matches = DifferentialClassifier::new().scan("WBC: 7.2\n\nMonos: 6");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].label, "Monos");
        assert_eq!(matches[1].raw, "6");
        assert_eq!(matches[1].line_number, 3);
    }
}
