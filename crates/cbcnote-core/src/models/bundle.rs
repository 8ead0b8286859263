//! Structured results of a lab text parse.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recognized lab value label.
///
/// Declaration order is the canonical order used when listing values in the
/// narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabLabel {
    /// Specimen collection date/time, kept as a literal.
    CollectedAt,
    /// White blood cell count.
    Wbc,
    /// Red blood cell count.
    Rbc,
    /// Hemoglobin.
    Hgb,
    /// Hematocrit.
    Hct,
    /// Mean corpuscular volume.
    Mcv,
    /// Mean corpuscular hemoglobin.
    Mch,
    /// Mean corpuscular hemoglobin concentration.
    Mchc,
    /// Red cell distribution width.
    Rdw,
    /// Platelet count.
    Plt,
    /// Mean platelet volume.
    Mpv,
    /// Reticulocyte percentage.
    Retic,
}

/// How a lab label's capture is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabValueKind {
    /// Parsed as a decimal number; malformed captures are dropped.
    Numeric,
    /// Kept as the matched string.
    Literal,
}

impl LabLabel {
    /// All labels in canonical order.
    pub const ALL: [LabLabel; 12] = [
        LabLabel::CollectedAt,
        LabLabel::Wbc,
        LabLabel::Rbc,
        LabLabel::Hgb,
        LabLabel::Hct,
        LabLabel::Mcv,
        LabLabel::Mch,
        LabLabel::Mchc,
        LabLabel::Rdw,
        LabLabel::Plt,
        LabLabel::Mpv,
        LabLabel::Retic,
    ];

    /// Name used in the narrative and in CSV headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            LabLabel::CollectedAt => "Collected",
            LabLabel::Wbc => "WBC",
            LabLabel::Rbc => "RBC",
            LabLabel::Hgb => "HGB",
            LabLabel::Hct => "HCT",
            LabLabel::Mcv => "MCV",
            LabLabel::Mch => "MCH",
            LabLabel::Mchc => "MCHC",
            LabLabel::Rdw => "RDW",
            LabLabel::Plt => "PLT",
            LabLabel::Mpv => "MPV",
            LabLabel::Retic => "Retic",
        }
    }

    /// Stable machine key (matches the serde name).
    pub fn key(&self) -> &'static str {
        match self {
            LabLabel::CollectedAt => "collected_at",
            LabLabel::Wbc => "wbc",
            LabLabel::Rbc => "rbc",
            LabLabel::Hgb => "hgb",
            LabLabel::Hct => "hct",
            LabLabel::Mcv => "mcv",
            LabLabel::Mch => "mch",
            LabLabel::Mchc => "mchc",
            LabLabel::Rdw => "rdw",
            LabLabel::Plt => "plt",
            LabLabel::Mpv => "mpv",
            LabLabel::Retic => "retic",
        }
    }

    /// Unit of measure, if the label is numeric.
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            LabLabel::CollectedAt => None,
            LabLabel::Wbc | LabLabel::Plt => Some("K/μL"),
            LabLabel::Rbc => Some("M/μL"),
            LabLabel::Hgb | LabLabel::Mchc => Some("g/dL"),
            LabLabel::Hct | LabLabel::Rdw | LabLabel::Retic => Some("%"),
            LabLabel::Mcv | LabLabel::Mpv => Some("fL"),
            LabLabel::Mch => Some("pg"),
        }
    }

    pub fn kind(&self) -> LabValueKind {
        match self {
            LabLabel::CollectedAt => LabValueKind::Literal,
            _ => LabValueKind::Numeric,
        }
    }
}

impl fmt::Display for LabLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// An extracted lab value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabValue {
    Number(Decimal),
    Literal(String),
}

impl LabValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            LabValue::Number(n) => Some(*n),
            LabValue::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            LabValue::Literal(s) => Some(s),
            LabValue::Number(_) => None,
        }
    }
}

impl fmt::Display for LabValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabValue::Number(n) => write!(f, "{}", n),
            LabValue::Literal(s) => f.write_str(s),
        }
    }
}

/// Canonical white-cell (and related) type reported in a differential.
///
/// Declaration order is the canonical narrative order; the last two types
/// are reported as findings rather than in the differential clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Neutrophils,
    Bands,
    Lymphocytes,
    AtypicalLymphocytes,
    Monocytes,
    Eosinophils,
    Basophils,
    Metamyelocytes,
    Myelocytes,
    Promyelocytes,
    Blasts,
    Other,
    ImmatureGranulocytes,
    Nrbc,
}

impl CellType {
    /// All cell types in canonical order.
    pub const ALL: [CellType; 14] = [
        CellType::Neutrophils,
        CellType::Bands,
        CellType::Lymphocytes,
        CellType::AtypicalLymphocytes,
        CellType::Monocytes,
        CellType::Eosinophils,
        CellType::Basophils,
        CellType::Metamyelocytes,
        CellType::Myelocytes,
        CellType::Promyelocytes,
        CellType::Blasts,
        CellType::Other,
        CellType::ImmatureGranulocytes,
        CellType::Nrbc,
    ];

    /// Noun used after the percentage in the narrative.
    pub fn noun(&self) -> &'static str {
        match self {
            CellType::Neutrophils => "neutrophils",
            CellType::Bands => "bands",
            CellType::Lymphocytes => "lymphocytes",
            CellType::AtypicalLymphocytes => "atypical lymphocytes",
            CellType::Monocytes => "monocytes",
            CellType::Eosinophils => "eosinophils",
            CellType::Basophils => "basophils",
            CellType::Metamyelocytes => "metamyelocytes",
            CellType::Myelocytes => "myelocytes",
            CellType::Promyelocytes => "promyelocytes",
            CellType::Blasts => "blasts",
            CellType::Other => "other",
            CellType::ImmatureGranulocytes => "immature granulocytes",
            CellType::Nrbc => "NRBCs",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CellType::Neutrophils => "neutrophils",
            CellType::Bands => "bands",
            CellType::Lymphocytes => "lymphocytes",
            CellType::AtypicalLymphocytes => "atypical_lymphocytes",
            CellType::Monocytes => "monocytes",
            CellType::Eosinophils => "eosinophils",
            CellType::Basophils => "basophils",
            CellType::Metamyelocytes => "metamyelocytes",
            CellType::Myelocytes => "myelocytes",
            CellType::Promyelocytes => "promyelocytes",
            CellType::Blasts => "blasts",
            CellType::Other => "other",
            CellType::ImmatureGranulocytes => "immature_granulocytes",
            CellType::Nrbc => "nrbc",
        }
    }

    /// Whether the type belongs in the "differential shows" clause.
    pub fn in_differential_clause(&self) -> bool {
        !matches!(self, CellType::ImmatureGranulocytes | CellType::Nrbc)
    }
}

/// Priority of a differential line, derived from how its label is qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Bare label, e.g. `Lymphs: 30`.
    Bare = 1,
    /// Parenthesized qualifier other than a percent sign, e.g. `Lymphs (auto): 30`.
    Qualified = 2,
    /// Explicit percent qualifier, e.g. `Lymphs (%): 30`.
    PercentQualified = 3,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// A resolved differential percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialEntry {
    /// Canonical cell type.
    pub cell_type: CellType,
    /// Percentage (0 - 100).
    pub percent: Decimal,
    /// Priority of the winning line.
    pub priority: Priority,
    /// Source line the value came from.
    pub source_line: String,
}

/// Whether the source text declared a differential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentialStatus {
    /// No method line was found.
    #[default]
    NotDeclared,
    /// A method line declared a performed differential.
    Performed,
    /// A method line declared the differential was not performed.
    NotPerformed,
}

/// Differential classification result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferentialResult {
    /// Declared method (e.g. "Manual", "Automated").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Declared status.
    pub status: DifferentialStatus,

    /// At most one entry per canonical cell type.
    #[serde(default)]
    pub entries: BTreeMap<CellType, DifferentialEntry>,
}

impl DifferentialResult {
    /// Result for a differential declared as not performed.
    pub fn not_performed(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            status: DifferentialStatus::NotPerformed,
            entries: BTreeMap::new(),
        }
    }

    pub fn is_not_performed(&self) -> bool {
        self.status == DifferentialStatus::NotPerformed
    }

    pub fn get(&self, cell_type: CellType) -> Option<Decimal> {
        self.entries.get(&cell_type).map(|e| e.percent)
    }

    /// Canonical type to percentage mapping.
    pub fn percentages(&self) -> BTreeMap<CellType, Decimal> {
        self.entries
            .iter()
            .map(|(cell_type, entry)| (*cell_type, entry.percent))
            .collect()
    }
}

/// A morphology finding label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphologyLabel {
    ToxicGranulation,
    DohleBodies,
    Vacuolization,
    HypersegmentedNeutrophils,
    SmudgeCells,
    GiantPlatelets,
    PlateletClumps,
    Schistocytes,
    Spherocytes,
    TargetCells,
    RbcMorphology,
    WbcMorphology,
    PlateletMorphology,
    SmearReview,
    AtypicalLymphocytes,
    Nrbc,
}

/// Shape of a morphology finding's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologyKind {
    /// Presence/absence flag, optionally graded ("few", "2+").
    Flag,
    /// Free-text descriptive category.
    Category,
    /// Decimal percentage.
    Percent,
}

impl MorphologyLabel {
    pub fn noun(&self) -> &'static str {
        match self {
            MorphologyLabel::ToxicGranulation => "toxic granulation",
            MorphologyLabel::DohleBodies => "Dohle bodies",
            MorphologyLabel::Vacuolization => "vacuolization",
            MorphologyLabel::HypersegmentedNeutrophils => "hypersegmented neutrophils",
            MorphologyLabel::SmudgeCells => "smudge cells",
            MorphologyLabel::GiantPlatelets => "giant platelets",
            MorphologyLabel::PlateletClumps => "platelet clumps",
            MorphologyLabel::Schistocytes => "schistocytes",
            MorphologyLabel::Spherocytes => "spherocytes",
            MorphologyLabel::TargetCells => "target cells",
            MorphologyLabel::RbcMorphology => "RBC morphology",
            MorphologyLabel::WbcMorphology => "WBC morphology",
            MorphologyLabel::PlateletMorphology => "platelet morphology",
            MorphologyLabel::SmearReview => "smear review",
            MorphologyLabel::AtypicalLymphocytes => "atypical lymphocytes",
            MorphologyLabel::Nrbc => "NRBCs",
        }
    }

    pub fn kind(&self) -> MorphologyKind {
        match self {
            MorphologyLabel::RbcMorphology
            | MorphologyLabel::WbcMorphology
            | MorphologyLabel::PlateletMorphology
            | MorphologyLabel::SmearReview => MorphologyKind::Category,
            MorphologyLabel::AtypicalLymphocytes | MorphologyLabel::Nrbc => MorphologyKind::Percent,
            _ => MorphologyKind::Flag,
        }
    }
}

/// Value of a morphology finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FindingValue {
    Presence(bool),
    Category(String),
    Percent(Decimal),
}

/// A qualitative or percentage morphology finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphologyFinding {
    pub label: MorphologyLabel,
    pub value: FindingValue,
    /// Matched value text, trimmed.
    pub raw: String,
}

/// Everything extracted from one block of pasted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBundle {
    /// Lab label to value; unmatched labels are absent.
    #[serde(default)]
    pub labs: BTreeMap<LabLabel, LabValue>,

    /// Differential classification.
    #[serde(default)]
    pub differential: DifferentialResult,

    /// Morphology label to finding; unmatched labels are absent.
    #[serde(default)]
    pub morphology: BTreeMap<MorphologyLabel, MorphologyFinding>,

    /// Original input, verbatim.
    pub raw_text: String,
}

impl ParsedBundle {
    pub fn lab(&self, label: LabLabel) -> Option<&LabValue> {
        self.labs.get(&label)
    }

    pub fn lab_number(&self, label: LabLabel) -> Option<Decimal> {
        self.labs.get(&label).and_then(LabValue::as_number)
    }

    /// Collection date/time literal, if one was found.
    pub fn collected_at(&self) -> Option<&str> {
        self.labs.get(&LabLabel::CollectedAt).and_then(LabValue::as_literal)
    }

    /// Whether any numeric lab value was found.
    pub fn has_numeric_labs(&self) -> bool {
        self.labs.values().any(|v| v.as_number().is_some())
    }

    /// NRBC percentage, preferring the differential over the morphology section.
    pub fn nrbc_percent(&self) -> Option<Decimal> {
        self.differential.get(CellType::Nrbc).or_else(|| {
            match self.morphology.get(&MorphologyLabel::Nrbc).map(|f| &f.value) {
                Some(FindingValue::Percent(p)) => Some(*p),
                _ => None,
            }
        })
    }

    /// True when nothing at all was recognized.
    pub fn is_empty(&self) -> bool {
        self.labs.is_empty()
            && self.differential.entries.is_empty()
            && self.differential.status == DifferentialStatus::NotDeclared
            && self.morphology.is_empty()
    }
}
