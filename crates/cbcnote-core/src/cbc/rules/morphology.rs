//! Morphology finding extraction.

use std::borrow::Cow;
use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::trace;

use crate::models::bundle::{FindingValue, MorphologyFinding, MorphologyKind, MorphologyLabel};

use super::patterns::{
    ABSOLUTE_MARKER, ATYPICAL_LYMPH_PERCENT, MORPHOLOGY_PATTERNS, NRBC_PERCENT, PER_100_WBC,
};
use super::{parse_decimal, Extractor};

const PRESENT_TOKENS: &[&str] = &[
    "present", "positive", "pos", "seen", "noted", "yes", "identified", "+",
];

const ABSENT_TOKENS: &[&str] = &[
    "absent", "negative", "neg", "none", "none seen", "not seen", "not present",
    "not identified", "no", "-",
];

/// Morphology extractor.
pub struct MorphologyExtractor;

impl MorphologyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First percentage matched by `regex` on a line without an absolute-count marker.
    fn first_percent(&self, regex: &Regex, text: &str, strip_denominator: bool) -> Option<(Decimal, String)> {
        for line in text.lines() {
            if ABSOLUTE_MARKER.is_match(line) {
                continue;
            }

            let line: Cow<'_, str> = if strip_denominator {
                PER_100_WBC.replace_all(line, "")
            } else {
                Cow::Borrowed(line)
            };

            if let Some(caps) = regex.captures(&line) {
                let raw = caps[1].trim().to_string();
                return parse_decimal(&raw).map(|value| (value, raw));
            }
        }

        None
    }
}

impl Default for MorphologyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for MorphologyExtractor {
    type Output = BTreeMap<MorphologyLabel, MorphologyFinding>;

    fn extract(&self, text: &str) -> Self::Output {
        let mut findings = BTreeMap::new();
        if text.trim().is_empty() {
            return findings;
        }

        for pattern in MORPHOLOGY_PATTERNS.iter() {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };
            let raw = caps[1].trim();
            if raw.is_empty() {
                continue;
            }

            trace!("Morphology {:?} = {:?}", pattern.label, raw);
            findings.insert(
                pattern.label,
                MorphologyFinding {
                    label: pattern.label,
                    value: classify_value(pattern.label, raw),
                    raw: raw.to_string(),
                },
            );
        }

        let percent_rules = [
            (MorphologyLabel::AtypicalLymphocytes, &*ATYPICAL_LYMPH_PERCENT, false),
            (MorphologyLabel::Nrbc, &*NRBC_PERCENT, true),
        ];
        for (label, regex, strip_denominator) in percent_rules {
            if let Some((value, raw)) = self.first_percent(regex, text, strip_denominator) {
                findings.insert(
                    label,
                    MorphologyFinding {
                        label,
                        value: FindingValue::Percent(value),
                        raw,
                    },
                );
            }
        }

        findings
    }
}

/// Classify a trimmed morphology value for its label.
pub fn classify_value(label: MorphologyLabel, raw: &str) -> FindingValue {
    match label.kind() {
        MorphologyKind::Category => FindingValue::Category(raw.to_string()),
        MorphologyKind::Percent => match parse_decimal(raw.trim_end_matches('%')) {
            Some(value) => FindingValue::Percent(value),
            None => FindingValue::Category(raw.to_string()),
        },
        MorphologyKind::Flag => {
            let token = raw.trim_end_matches('.').trim().to_lowercase();
            if PRESENT_TOKENS.contains(&token.as_str()) {
                FindingValue::Presence(true)
            } else if ABSENT_TOKENS.contains(&token.as_str()) {
                FindingValue::Presence(false)
            } else {
                FindingValue::Category(raw.to_string())
            }
        }
    }
}

/// Extract all morphology findings from text.
pub fn extract_morphology(text: &str) -> BTreeMap<MorphologyLabel, MorphologyFinding> {
    MorphologyExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value_of(
        findings: &BTreeMap<MorphologyLabel, MorphologyFinding>,
        label: MorphologyLabel,
    ) -> Option<FindingValue> {
        findings.get(&label).map(|f| f.value.clone())
    }

    #[test]
    fn test_flags_and_categories() {
        let text = r#"
            Toxic Granulation: Present
            Giant Platelets:   Absent
            Schistocytes: Few
            RBC Morphology:  Microcytic, hypochromic
            Smear Review: Completed
        "#;

        let findings = extract_morphology(text);

        assert_eq!(
            value_of(&findings, MorphologyLabel::ToxicGranulation),
            Some(FindingValue::Presence(true))
        );
        assert_eq!(
            value_of(&findings, MorphologyLabel::GiantPlatelets),
            Some(FindingValue::Presence(false))
        );
        assert_eq!(
            value_of(&findings, MorphologyLabel::Schistocytes),
            Some(FindingValue::Category("Few".to_string()))
        );
        assert_eq!(
            findings[&MorphologyLabel::RbcMorphology].raw,
            "Microcytic, hypochromic"
        );
        assert_eq!(
            value_of(&findings, MorphologyLabel::SmearReview),
            Some(FindingValue::Category("Completed".to_string()))
        );
        assert!(!findings.contains_key(&MorphologyLabel::DohleBodies));
    }

    #[test]
    fn test_nrbc_permissive_label() {
        for text in ["NRBC%: 2", "nRBC/100 WBC: 2", "Nucleated RBC 2", "NRBC (per 100 WBC): 2"] {
            let findings = extract_morphology(text);
            assert_eq!(
                value_of(&findings, MorphologyLabel::Nrbc),
                Some(FindingValue::Percent(Decimal::new(2, 0))),
                "text: {text}"
            );
        }
    }

    #[test]
    fn test_nrbc_mention_in_other_label_is_ignored() {
        let findings = extract_morphology("WBC (corrected for nRBC): 7.2\nNeutrophils: 60");
        assert!(!findings.contains_key(&MorphologyLabel::Nrbc));

        let findings = extract_morphology("WBC (corrected for nRBC): 7.2\nNRBC: 3");
        assert_eq!(
            value_of(&findings, MorphologyLabel::Nrbc),
            Some(FindingValue::Percent(Decimal::new(3, 0)))
        );
    }

    #[test]
    fn test_nrbc_skips_absolute_count() {
        let findings = extract_morphology("NRBC #: 0.01\nNRBC: 1.5");
        assert_eq!(
            value_of(&findings, MorphologyLabel::Nrbc),
            Some(FindingValue::Percent(Decimal::new(15, 1)))
        );
    }

    #[test]
    fn test_atypical_lymph_percent() {
        let findings = extract_morphology("Reactive Lymphs: 6 %");
        assert_eq!(
            value_of(&findings, MorphologyLabel::AtypicalLymphocytes),
            Some(FindingValue::Percent(Decimal::new(6, 0)))
        );
    }

    #[test]
    fn test_absent_findings_are_omitted() {
        assert!(extract_morphology("").is_empty());
        assert!(extract_morphology("WBC: 7.2\nHGB: 13.1").is_empty());
    }
}
