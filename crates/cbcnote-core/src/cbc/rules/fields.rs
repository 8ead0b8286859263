//! Lab value extraction (CBC indices and collection date).

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::models::bundle::{LabLabel, LabValue, LabValueKind};

use super::patterns::{COLLECTED_AT, LAB_VALUE_PATTERNS};
use super::{parse_decimal, Extractor};

/// Lab value extractor over the fixed label table.
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_label(&self, label: LabLabel, text: &str) -> Option<LabValue> {
        let caps = match label {
            LabLabel::CollectedAt => COLLECTED_AT.captures(text)?,
            _ => LAB_VALUE_PATTERNS
                .iter()
                .find(|p| p.label == label)?
                .regex
                .captures(text)?,
        };
        let raw = &caps[1];

        match label.kind() {
            LabValueKind::Literal => Some(LabValue::Literal(raw.to_string())),
            LabValueKind::Numeric => match parse_decimal(raw) {
                Some(value) => Some(LabValue::Number(value)),
                None => {
                    debug!("Dropping malformed {} value {:?}", label, raw);
                    None
                }
            },
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for FieldExtractor {
    type Output = BTreeMap<LabLabel, LabValue>;

    fn extract(&self, text: &str) -> Self::Output {
        let mut values = BTreeMap::new();
        if text.trim().is_empty() {
            return values;
        }

        for label in LabLabel::ALL {
            if let Some(value) = self.extract_label(label, text) {
                trace!("Matched {} = {}", label, value);
                values.insert(label, value);
            }
        }

        values
    }
}

/// Extract all lab values from text.
pub fn extract_lab_values(text: &str) -> BTreeMap<LabLabel, LabValue> {
    FieldExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn num(s: &str) -> LabValue {
        LabValue::Number(s.parse::<Decimal>().unwrap())
    }

    #[test]
    fn test_extract_basic_panel() {
        let text = r#"
            Collected: 03/12/2024 08:15
            WBC: 7.2 K/uL
            RBC: 4.51 M/uL
            Hemoglobin: 13.1 g/dL
            HCT: 39.8 %
            MCV: 88.2
            MCH: 29.0
            MCHC: 32.9
            RDW-CV: 13.4
            Platelets: 250
            MPV: 9.8
        "#;

        let values = extract_lab_values(text);

        assert_eq!(values.get(&LabLabel::Wbc), Some(&num("7.2")));
        assert_eq!(values.get(&LabLabel::Rbc), Some(&num("4.51")));
        assert_eq!(values.get(&LabLabel::Hgb), Some(&num("13.1")));
        assert_eq!(values.get(&LabLabel::Hct), Some(&num("39.8")));
        assert_eq!(values.get(&LabLabel::Mch), Some(&num("29")));
        assert_eq!(values.get(&LabLabel::Mchc), Some(&num("32.9")));
        assert_eq!(values.get(&LabLabel::Rdw), Some(&num("13.4")));
        assert_eq!(values.get(&LabLabel::Plt), Some(&num("250")));
        assert_eq!(
            values.get(&LabLabel::CollectedAt),
            Some(&LabValue::Literal("03/12/2024 08:15".to_string()))
        );
        assert!(!values.contains_key(&LabLabel::Retic));
    }

    #[test]
    fn test_first_match_wins() {
        let values = extract_lab_values("WBC: 7.2\nWBC: 9.9");
        assert_eq!(values.get(&LabLabel::Wbc), Some(&num("7.2")));
    }

    #[test]
    fn test_malformed_first_match_is_dropped() {
        let values = extract_lab_values("WBC: 7.2.1\nWBC: 9.9\nHGB: 13");
        assert!(!values.contains_key(&LabLabel::Wbc));
        assert_eq!(values.get(&LabLabel::Hgb), Some(&num("13")));
    }

    #[test]
    fn test_case_insensitive() {
        let values = extract_lab_values("wbc 5.5\nhgb: 12");
        assert_eq!(values.get(&LabLabel::Wbc), Some(&num("5.5")));
        assert_eq!(values.get(&LabLabel::Hgb), Some(&num("12")));
    }

    #[test]
    fn test_prose_after_label_is_not_a_value() {
        let values = extract_lab_values("HGB: see note 1\nWBC: Auto: 6.4\nPLT: clumped, estimate 2");
        assert!(!values.contains_key(&LabLabel::Hgb));
        assert!(!values.contains_key(&LabLabel::Plt));
        assert_eq!(values.get(&LabLabel::Wbc), Some(&num("6.4")));
    }

    #[test]
    fn test_missing_labels_are_omitted() {
        assert!(extract_lab_values("").is_empty());
        assert!(extract_lab_values("   \n  ").is_empty());
        assert!(extract_lab_values("Patient seen in clinic today.").is_empty());
    }
}
