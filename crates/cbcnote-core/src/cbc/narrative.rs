//! Narrative paragraph composition from a parsed bundle.
//!
//! Sections are emitted in a fixed order: lab values, differential (or the
//! not-performed sentence), then findings. A section with nothing to report
//! contributes nothing; the paragraph is rebuilt from scratch on every call.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::bundle::{
    CellType, DifferentialStatus, FindingValue, LabLabel, MorphologyFinding, MorphologyKind,
    MorphologyLabel, ParsedBundle,
};
use crate::models::config::NarrativeConfig;

const UNREMARKABLE_VALUES: &[&str] = &[
    "negative", "neg", "normal", "wnl", "within normal limits", "unremarkable", "completed",
    "complete", "none", "none seen", "absent", "not seen", "not present", "not identified", "no",
    "n/a", "normocytic, normochromic", "normochromic, normocytic", "not performed", "not done",
    "pending", "cancelled", "canceled",
];

// Method words that only report status and say nothing about how the count was made
const METHOD_STATUS_WORDS: &[&str] = &[
    "performed", "done", "yes", "y", "complete", "completed", "reviewed", "resulted", "final",
    "verified", "reported",
];

/// A composed paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeParagraph {
    sentences: Vec<String>,
}

impl NarrativeParagraph {
    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Sentences joined with single spaces.
    pub fn text(&self) -> String {
        self.sentences.join(" ")
    }
}

impl fmt::Display for NarrativeParagraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Builds narrative paragraphs.
#[derive(Debug, Clone, Default)]
pub struct NarrativeComposer {
    config: NarrativeConfig,
}

impl NarrativeComposer {
    pub fn new(config: NarrativeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NarrativeConfig {
        &self.config
    }

    /// Compose the paragraph for a bundle.
    pub fn compose(&self, bundle: &ParsedBundle) -> NarrativeParagraph {
        let mut sentences = Vec::new();

        if let Some(sentence) = self.lab_sentence(bundle) {
            sentences.push(sentence);
        }

        let mut open_clause = None;
        if bundle.differential.is_not_performed() {
            sentences.push(self.config.not_performed_sentence.clone());
        } else {
            open_clause = self.differential_clause(bundle);
        }

        let findings = self.findings(bundle);
        match (open_clause, findings.is_empty()) {
            (Some(clause), true) => sentences.push(format!("{}.", clause)),
            (Some(clause), false) => {
                sentences.push(format!("{} with {}.", clause, join_natural(&findings)))
            }
            (None, false) => sentences.push(format!(
                "{} {}.",
                self.config.findings_lead_in,
                join_natural(&findings)
            )),
            (None, true) => {}
        }

        NarrativeParagraph { sentences }
    }

    fn lab_sentence(&self, bundle: &ParsedBundle) -> Option<String> {
        let items: Vec<String> = LabLabel::ALL
            .iter()
            .filter_map(|label| {
                let value = bundle.lab_number(*label)?;
                Some(format_lab(*label, value))
            })
            .collect();

        if items.is_empty() {
            return None;
        }

        let lead_in = match bundle.collected_at() {
            Some(date) => format!("{} results from {} are as follows:", self.config.panel_name, date),
            None => format!("{} results are as follows:", self.config.panel_name),
        };

        Some(format!("{} {}.", lead_in, items.join(", ")))
    }

    // Left open (no period) so findings can continue it
    fn differential_clause(&self, bundle: &ParsedBundle) -> Option<String> {
        let items: Vec<String> = bundle
            .differential
            .entries
            .values()
            .filter(|entry| entry.cell_type.in_differential_clause())
            .map(|entry| format_percent(entry.percent, entry.cell_type.noun()))
            .collect();

        if items.is_empty() {
            return None;
        }

        let subject = match (&bundle.differential.method, bundle.differential.status) {
            (Some(method), DifferentialStatus::Performed) => match method_adjective(method) {
                Some(adjective) => format!("{} differential", adjective),
                None => "Differential".to_string(),
            },
            _ => "Differential".to_string(),
        };

        Some(format!(
            "{} {} {}",
            subject,
            self.config.differential_verb,
            items.join(", ")
        ))
    }

    fn findings(&self, bundle: &ParsedBundle) -> Vec<String> {
        let mut findings = Vec::new();

        if let Some(ig) = bundle.differential.get(CellType::ImmatureGranulocytes) {
            findings.push(format_percent(ig, CellType::ImmatureGranulocytes.noun()));
        }

        if let Some(nrbc) = bundle.nrbc_percent() {
            findings.push(format_percent(nrbc, CellType::Nrbc.noun()));
        }

        if bundle.differential.get(CellType::AtypicalLymphocytes).is_none() {
            if let Some(MorphologyFinding { value: FindingValue::Percent(p), .. }) =
                bundle.morphology.get(&MorphologyLabel::AtypicalLymphocytes)
            {
                findings.push(format_percent(*p, MorphologyLabel::AtypicalLymphocytes.noun()));
            }
        }

        findings.extend(
            bundle
                .morphology
                .values()
                .filter(|finding| finding.label.kind() != MorphologyKind::Percent)
                .filter_map(describe_finding),
        );

        findings
    }
}

/// Describe a qualitative finding, or `None` if its value is unremarkable.
fn describe_finding(finding: &MorphologyFinding) -> Option<String> {
    let noun = finding.label.noun();
    match &finding.value {
        FindingValue::Presence(true) => Some(noun.to_string()),
        FindingValue::Presence(false) => None,
        FindingValue::Category(value) if is_unremarkable(value) => None,
        FindingValue::Category(value) => match finding.label.kind() {
            MorphologyKind::Flag => Some(format!("{} {}", lower_first(value), noun)),
            _ => Some(format!("{} ({})", noun, lower_first(value))),
        },
        FindingValue::Percent(p) => Some(format_percent(*p, noun)),
    }
}

/// Whether a morphology value reads as negative, normal or completed.
pub fn is_unremarkable(value: &str) -> bool {
    let token = value.trim().trim_end_matches('.').trim().to_lowercase();
    token.starts_with("normal") || UNREMARKABLE_VALUES.contains(&token.as_str())
}

/// Method text as an adjective: "Manual Diff" -> "Manual".
///
/// Status-only words ("Performed", "Done") are dropped; if nothing is left
/// the differential has no adjective.
fn method_adjective(method: &str) -> Option<String> {
    let words: Vec<&str> = method.split_whitespace().collect();
    let end = words
        .iter()
        .position(|w| {
            let w = w.to_lowercase();
            w.starts_with("diff") || w == "count"
        })
        .unwrap_or(words.len());

    let adjective = words[..end]
        .iter()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty() && !METHOD_STATUS_WORDS.contains(&w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let mut chars = adjective.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

fn format_lab(label: LabLabel, value: Decimal) -> String {
    match label.unit() {
        Some("%") => format!("{} {}%", label.display_name(), value),
        Some(unit) => format!("{} {} {}", label.display_name(), value, unit),
        None => format!("{} {}", label.display_name(), value),
    }
}

fn format_percent(value: Decimal, noun: &str) -> String {
    format!("{}% {}", value, noun)
}

// Keeps acronyms such as "RBC" intact
fn lower_first(value: &str) -> String {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(_), Some(second)) if second.is_uppercase() => value.to_string(),
        (Some(first), _) => first.to_lowercase().chain(value.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

/// "a", "a and b", "a, b and c".
fn join_natural(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbc::parse_lab_text;
    use pretty_assertions::assert_eq;

    fn compose(text: &str) -> String {
        let bundle = parse_lab_text(text).unwrap().bundle;
        NarrativeComposer::default().compose(&bundle).text()
    }

    #[test]
    fn test_end_to_end_paragraph() {
        let text = "WBC: 7.2\nHGB: 13.1\nNeutrophils (%): 55\nLymphs: 30\nNRBC%: 2";
        assert_eq!(
            compose(text),
            "CBC results are as follows: WBC 7.2 K/μL, HGB 13.1 g/dL. \
             Differential shows 55% neutrophils, 30% lymphocytes with 2% NRBCs."
        );
    }

    #[test]
    fn test_dated_lead_in_and_canonical_order() {
        let text = "PLT: 250\nCollected: 03/12/2024\nHCT: 39.8\nWBC: 11";
        assert_eq!(
            compose(text),
            "CBC results from 03/12/2024 are as follows: WBC 11 K/μL, HCT 39.8%, PLT 250 K/μL."
        );
    }

    #[test]
    fn test_status_only_method_has_no_adjective() {
        for method in ["Performed", "Done", "Yes", "Completed."] {
            let text = format!("Differential: {method}\nNeutrophils: 60");
            assert_eq!(compose(&text), "Differential shows 60% neutrophils.", "method: {method}");
        }

        let text = "Differential: Manual, Performed\nNeutrophils: 60";
        assert_eq!(compose(text), "Manual differential shows 60% neutrophils.");
    }

    #[test]
    fn test_unperformed_category_findings_are_suppressed() {
        assert_eq!(compose("Smear Review: Not performed"), "");
        assert_eq!(compose("Smear Review: Pending"), "");
        assert_eq!(
            compose("Smear Review: Not done\nToxic Granulation: Present"),
            "Peripheral smear shows toxic granulation."
        );
    }

    #[test]
    fn test_corrected_wbc_is_not_an_nrbc_finding() {
        let text = "WBC (corrected for nRBC): 7.2\nNeutrophils: 60";
        assert_eq!(
            compose(text),
            "CBC results are as follows: WBC 7.2 K/μL. Differential shows 60% neutrophils."
        );
    }

    #[test]
    fn test_not_performed_sentence() {
        let text = "WBC: 4.1\nDifferential: Not performed\nLymphs: 40";
        assert_eq!(
            compose(text),
            "CBC results are as follows: WBC 4.1 K/μL. A differential was not performed."
        );
    }

    #[test]
    fn test_method_attributed_clause_closes_without_findings() {
        let text = "Differential Method: Manual Diff\nMonos: 8\nBands: 3\nSegs: 60";
        assert_eq!(
            compose(text),
            "Manual differential shows 60% neutrophils, 3% bands, 8% monocytes."
        );
    }

    #[test]
    fn test_findings_as_new_sentence_with_suppression() {
        let text = r#"
            Toxic Granulation: Present
            Giant Platelets: Negative
            Schistocytes: Few
            Smear Review: Completed
            RBC Morphology: Normal
            Dohle Bodies: Seen
        "#;
        assert_eq!(
            compose(text),
            "Peripheral smear shows toxic granulation, Dohle bodies and few schistocytes."
        );
    }

    #[test]
    fn test_immature_granulocytes_continue_differential() {
        let text = "Neutrophils: 70\nIG (%): 1.2\nReactive Lymphs: 6 %\nRBC Morphology: Anisocytosis";
        assert_eq!(
            compose(text),
            "Differential shows 70% neutrophils, 6% atypical lymphocytes \
             with 1.2% immature granulocytes and RBC morphology (anisocytosis)."
        );
    }

    #[test]
    fn test_morphology_atypicals_without_differential() {
        let text = "Atypical lymphocytes 6%\nToxic granulation: present";
        assert_eq!(
            compose(text),
            "Peripheral smear shows 6% atypical lymphocytes and toxic granulation."
        );
    }

    #[test]
    fn test_differential_atypicals_suppress_morphology_percent() {
        let text = "Atypical Lymphs: 5";
        assert_eq!(compose(text), "Differential shows 5% atypical lymphocytes.");
    }

    #[test]
    fn test_empty_bundle_gives_empty_paragraph() {
        let paragraph = NarrativeComposer::default().compose(&ParsedBundle::default());
        assert!(paragraph.is_empty());
        assert_eq!(paragraph.text(), "");
    }

    #[test]
    fn test_date_without_values_has_no_lead_in() {
        assert_eq!(compose("Collected: 03/12/2024"), "");
    }

    #[test]
    fn test_custom_phrasing() {
        let config = NarrativeConfig {
            panel_name: "Hemogram".to_string(),
            differential_verb: "demonstrates".to_string(),
            ..NarrativeConfig::default()
        };
        let bundle = parse_lab_text("WBC: 5\nLymphs: 30").unwrap().bundle;
        assert_eq!(
            NarrativeComposer::new(config).compose(&bundle).text(),
            "Hemogram results are as follows: WBC 5 K/μL. Differential demonstrates 30% lymphocytes."
        );
    }

    #[test]
    fn test_helpers() {
        assert_eq!(join_natural(&["a".into()]), "a");
        assert_eq!(join_natural(&["a".into(), "b".into()]), "a and b");
        assert_eq!(join_natural(&["a".into(), "b".into(), "c".into()]), "a, b and c");
        assert_eq!(method_adjective("automated"), Some("Automated".to_string()));
        assert_eq!(method_adjective("Differential"), None);
        assert_eq!(method_adjective("Performed"), None);
        assert_eq!(method_adjective("Automated, verified"), Some("Automated".to_string()));
        assert!(is_unremarkable(" Normal. "));
        assert!(is_unremarkable("WNL"));
        assert!(!is_unremarkable("Few"));
    }
}
