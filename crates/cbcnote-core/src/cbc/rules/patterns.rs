//! Regex patterns for CBC text extraction.
//!
//! All patterns are case-insensitive. Lab and morphology labels are anchored
//! at the start of a line so that free-text comments do not produce matches.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::bundle::{LabLabel, MorphologyLabel};

/// A labeled recognition rule for one lab value.
pub struct LabValuePattern {
    pub label: LabLabel,
    pub regex: Regex,
}

/// A labeled recognition rule for one morphology finding.
pub struct MorphologyPattern {
    pub label: MorphologyLabel,
    pub regex: Regex,
}

// Label, then optional `%`, optional `(qualifier)`, then either `: qualifier words:`,
// a bare colon or nothing, then the value. Qualifier words must be closed by a
// colon so prose after a label never reaches a later digit.
// Capture group 1 is the raw value.
fn numeric_rule(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?im)^[ \t]*(?:{label})\b[ \t]*%?(?:[ \t]*\([^)\n]*\))?(?:[ \t]*:[ \t]*[A-Za-z][A-Za-z ]*?[ \t]*:|[ \t]*:)?[ \t]*([\d.]+)"
    ))
    .unwrap()
}

// Label, optional `:`/`-`/`=`, then the rest of the line.
fn finding_rule(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?im)^[ \t]*(?:{label})\b[ \t]*(?:[:=\-][ \t]*)?([^\n]*\S)"
    ))
    .unwrap()
}

lazy_static! {
    // Collection date, optionally with a time; kept verbatim
    pub static ref COLLECTED_AT: Regex = Regex::new(
        r"(?im)^[ \t]*(?:collected|collection\s+date(?:\s*/\s*time)?|collection\s+time|date\s+collected|specimen\s+collected|drawn)\b[ \t]*(?:on)?[ \t]*:?[ \t]*((?:\d{1,2}/\d{1,2}/\d{2,4}|\d{4}-\d{2}-\d{2})(?:[ \t]+\d{1,2}:\d{2}(?:[ \t]*[AaPp][Mm])?)?)"
    ).unwrap();

    /// Lab value rules, one per label, in canonical order.
    pub static ref LAB_VALUE_PATTERNS: Vec<LabValuePattern> = vec![
        LabValuePattern { label: LabLabel::Wbc, regex: numeric_rule(r"(?:WBC|white\s+blood\s+cells?|leukocytes)(?:\s+count)?") },
        LabValuePattern { label: LabLabel::Rbc, regex: numeric_rule(r"(?:RBC|red\s+blood\s+cells?|erythrocytes)(?:\s+count)?") },
        LabValuePattern { label: LabLabel::Hgb, regex: numeric_rule(r"HGB|HB|hemoglobin|haemoglobin") },
        LabValuePattern { label: LabLabel::Hct, regex: numeric_rule(r"HCT|hematocrit|haematocrit") },
        LabValuePattern { label: LabLabel::Mcv, regex: numeric_rule(r"MCV") },
        LabValuePattern { label: LabLabel::Mch, regex: numeric_rule(r"MCH") },
        LabValuePattern { label: LabLabel::Mchc, regex: numeric_rule(r"MCHC") },
        LabValuePattern { label: LabLabel::Rdw, regex: numeric_rule(r"RDW(?:[\s-]*CV)?") },
        LabValuePattern { label: LabLabel::Plt, regex: numeric_rule(r"(?:PLT|platelets?)(?:\s+count)?") },
        LabValuePattern { label: LabLabel::Mpv, regex: numeric_rule(r"MPV") },
        LabValuePattern { label: LabLabel::Retic, regex: numeric_rule(r"retic(?:ulocytes?)?(?:\s+count)?") },
    ];

    // Absolute counts (e.g. "Neutrophils #", "Lymphs Abs", "x10^3/uL")
    pub static ref ABSOLUTE_MARKER: Regex = Regex::new(
        r"(?i)#|\babs(?:olute)?\b|x\s?10\b"
    ).unwrap();

    // Optional label (up to the first colon), optional `: qualifier`, colon, number
    pub static ref DIFFERENTIAL_LINE: Regex = Regex::new(
        r"^\s*([^:]*?)\s*(?::\s*([A-Za-z][^:]*?)\s*)?:\s*(\d+(?:\.\d+)?)"
    ).unwrap();

    pub static ref PERCENT_QUALIFIER: Regex = Regex::new(
        r"\([^)]*%[^)]*\)"
    ).unwrap();

    pub static ref PAREN_QUALIFIER: Regex = Regex::new(
        r"\([^)]*\)"
    ).unwrap();

    // Differential method declaration
    pub static ref DIFFERENTIAL_METHOD: Regex = Regex::new(
        r"(?im)^[ \t]*(?:diff(?:erential)?(?:[ \t]+(?:method|type))?|method[ \t]+of[ \t]+differential)[ \t]*:[ \t]*([A-Za-z][^\n]*)"
    ).unwrap();

    pub static ref NOT_PERFORMED: Regex = Regex::new(
        r"(?i)\bnot\s+(?:performed|done|indicated)\b|\bnone\s+performed\b|\bcancell?ed\b|^\s*n/?a\s*$"
    ).unwrap();

    /// Morphology rules, one per label.
    pub static ref MORPHOLOGY_PATTERNS: Vec<MorphologyPattern> = vec![
        MorphologyPattern { label: MorphologyLabel::ToxicGranulation, regex: finding_rule(r"toxic\s+gran\w*") },
        MorphologyPattern { label: MorphologyLabel::DohleBodies, regex: finding_rule(r"d[oö]hle\s+bod(?:y|ies)") },
        MorphologyPattern { label: MorphologyLabel::Vacuolization, regex: finding_rule(r"(?:toxic\s+)?vacuol\w*") },
        MorphologyPattern { label: MorphologyLabel::HypersegmentedNeutrophils, regex: finding_rule(r"hyperseg\w*(?:\s+(?:neutrophils?|polys|pmns?))?") },
        MorphologyPattern { label: MorphologyLabel::SmudgeCells, regex: finding_rule(r"smudge\s+cells?") },
        MorphologyPattern { label: MorphologyLabel::GiantPlatelets, regex: finding_rule(r"giant\s+platelets?|large\s+platelets?|macrothrombocytes") },
        MorphologyPattern { label: MorphologyLabel::PlateletClumps, regex: finding_rule(r"platelet\s+clump\w*|clumped\s+platelets") },
        MorphologyPattern { label: MorphologyLabel::Schistocytes, regex: finding_rule(r"schistocytes?|schistos?") },
        MorphologyPattern { label: MorphologyLabel::Spherocytes, regex: finding_rule(r"spherocytes?") },
        MorphologyPattern { label: MorphologyLabel::TargetCells, regex: finding_rule(r"target\s+cells?|codocytes") },
        MorphologyPattern { label: MorphologyLabel::RbcMorphology, regex: finding_rule(r"rbc\s+morph\w*|red\s+(?:blood\s+)?cell\s+morph\w*") },
        MorphologyPattern { label: MorphologyLabel::WbcMorphology, regex: finding_rule(r"wbc\s+morph\w*|white\s+(?:blood\s+)?cell\s+morph\w*") },
        MorphologyPattern { label: MorphologyLabel::PlateletMorphology, regex: finding_rule(r"plt\s+morph\w*|platelet\s+morph\w*") },
        MorphologyPattern { label: MorphologyLabel::SmearReview, regex: finding_rule(r"smear\s+review|path(?:ologist)?\s+review|manual\s+review") },
    ];

    // Atypical lymphocytes reported as a percentage, matched per line
    pub static ref ATYPICAL_LYMPH_PERCENT: Regex = Regex::new(
        r"(?i)^\s*(?:(?:atypical|reactive|variant)\s+lymph\w*|lymph\w*\s*,\s*(?:atypical|reactive)\S*)[^\d\n]{0,24}?(\d+(?:\.\d+)?)"
    ).unwrap();

    // NRBC percentage as the line's own label: optional `%`, `(qualifier)` and
    // `: qualifier:` before the value. Matched per line after `/100 WBC` is removed.
    pub static ref NRBC_PERCENT: Regex = Regex::new(
        r"(?i)^\s*(?:n(?:ucleated)?\s*rbcs?|nucleated\s+red\s+(?:blood\s+)?cells?)\b\s*%?(?:\s*\([^)\n]*\))?(?:\s*:\s*[A-Za-z][A-Za-z ]*?\s*:|\s*[:=\-])?\s*(\d+(?:\.\d+)?)"
    ).unwrap();

    // "/100 WBC" and "per 100 WBCs" denominators, removed before NRBC matching
    pub static ref PER_100_WBC: Regex = Regex::new(
        r"(?i)(?:/|\bper)\s*100\s*wbcs?\b"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab_rule(label: LabLabel) -> &'static Regex {
        &LAB_VALUE_PATTERNS
            .iter()
            .find(|p| p.label == label)
            .unwrap()
            .regex
    }

    #[test]
    fn test_numeric_rule_line_shapes() {
        let wbc = lab_rule(LabLabel::Wbc);
        for line in ["WBC: 7.2", "WBC 7.2", "wbc (auto): 7.2", "WBC: Auto: 7.2", "  WBC:7.2 K/uL"] {
            let caps = wbc.captures(line).unwrap_or_else(|| panic!("no match: {line}"));
            assert_eq!(&caps[1], "7.2", "line: {line}");
        }
    }

    #[test]
    fn test_numeric_rule_word_boundaries() {
        assert!(lab_rule(LabLabel::Mch).captures("MCHC: 33.1").is_none());
        assert!(lab_rule(LabLabel::Rbc).captures("NRBC: 2").is_none());
        assert!(lab_rule(LabLabel::Hgb).captures("Hemoglobin A1c: 6.1").is_none());
        assert!(lab_rule(LabLabel::Rbc).captures("RBC Morphology: normal").is_none());
        assert_eq!(&lab_rule(LabLabel::Retic).captures("Retic %: 1.2").unwrap()[1], "1.2");
    }

    #[test]
    fn test_collected_at() {
        let caps = COLLECTED_AT.captures("Collected: 03/12/2024 08:15\nWBC: 7").unwrap();
        assert_eq!(&caps[1], "03/12/2024 08:15");
        let caps = COLLECTED_AT.captures("Collection Date/Time: 2024-03-12").unwrap();
        assert_eq!(&caps[1], "2024-03-12");
    }

    #[test]
    fn test_absolute_marker() {
        assert!(ABSOLUTE_MARKER.is_match("Neutrophils #: 4.2"));
        assert!(ABSOLUTE_MARKER.is_match("Lymphs, Absolute: 2.1"));
        assert!(ABSOLUTE_MARKER.is_match("Abs Neut: 4.2"));
        assert!(ABSOLUTE_MARKER.is_match("Monocytes: 0.5 x10^3/uL"));
        assert!(!ABSOLUTE_MARKER.is_match("Neutrophils (%): 55"));
        assert!(!ABSOLUTE_MARKER.is_match("Basophils: 1"));
    }

    #[test]
    fn test_differential_line() {
        let caps = DIFFERENTIAL_LINE.captures("Neutrophils (%): 55").unwrap();
        assert_eq!(&caps[1], "Neutrophils (%)");
        assert_eq!(&caps[3], "55");

        let caps = DIFFERENTIAL_LINE.captures("Neutrophils: Manual: 61.5 H").unwrap();
        assert_eq!(&caps[1], "Neutrophils");
        assert_eq!(&caps[2], "Manual");
        assert_eq!(&caps[3], "61.5");

        assert!(DIFFERENTIAL_LINE.captures("Toxic granulation: present").is_none());
    }

    #[test]
    fn test_nrbc_percent_variants() {
        for line in ["NRBC%: 2", "nRBC 2", "Nucleated RBC: 2", "Nucleated red blood cells: 2"] {
            let caps = NRBC_PERCENT.captures(line).unwrap_or_else(|| panic!("no match: {line}"));
            assert_eq!(&caps[1], "2", "line: {line}");
        }
        let stripped = PER_100_WBC.replace_all("nRBC/100 WBC: 3", "");
        assert_eq!(&NRBC_PERCENT.captures(&stripped).unwrap()[1], "3");
        assert_eq!(&NRBC_PERCENT.captures("NRBC % (auto): Manual: 1.5").unwrap()[1], "1.5");
    }

    #[test]
    fn test_nrbc_percent_requires_own_label() {
        for line in [
            "WBC (corrected for nRBC): 7.2",
            "Corrected WBC for NRBC 7.2",
            "Comment: nucleated RBCs present, WBC corrected 7.2",
        ] {
            assert!(NRBC_PERCENT.captures(line).is_none(), "line: {line}");
        }
    }

    #[test]
    fn test_numeric_rule_rejects_prose() {
        for line in ["HGB: see note 1", "HGB pending, see comment 2", "WBC: Auto result in 2 hours"] {
            let label = if line.starts_with("HGB") { LabLabel::Hgb } else { LabLabel::Wbc };
            assert!(lab_rule(label).captures(line).is_none(), "line: {line}");
        }
    }

    #[test]
    fn test_percent_qualifier() {
        for label in ["Lymphs (%)", "Lymphs ( % )", "Lymphs (% of WBC)", "Lymphs (Manual %)"] {
            assert!(PERCENT_QUALIFIER.is_match(label), "label: {label}");
        }
        assert!(!PERCENT_QUALIFIER.is_match("Lymphs (auto)"));
        assert!(!PERCENT_QUALIFIER.is_match("NRBC%"));
    }
}
