//! Synonym table mapping differential labels to canonical cell types.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::models::bundle::CellType;

use super::patterns::PAREN_QUALIFIER;

const SYNONYMS: &[(&str, CellType)] = &[
    // Neutrophils
    ("neutrophil", CellType::Neutrophils),
    ("neutrophils", CellType::Neutrophils),
    ("neut", CellType::Neutrophils),
    ("neuts", CellType::Neutrophils),
    ("neutrophils, segmented", CellType::Neutrophils),
    ("segmented neutrophils", CellType::Neutrophils),
    ("seg neutrophils", CellType::Neutrophils),
    ("segs", CellType::Neutrophils),
    ("polys", CellType::Neutrophils),
    ("pmn", CellType::Neutrophils),
    ("pmns", CellType::Neutrophils),
    // Bands
    ("band", CellType::Bands),
    ("bands", CellType::Bands),
    ("band neutrophils", CellType::Bands),
    ("neutrophils, band", CellType::Bands),
    ("stabs", CellType::Bands),
    // Lymphocytes
    ("lymph", CellType::Lymphocytes),
    ("lymphs", CellType::Lymphocytes),
    ("lymphocyte", CellType::Lymphocytes),
    ("lymphocytes", CellType::Lymphocytes),
    // Atypical lymphocytes
    ("atypical lymphs", CellType::AtypicalLymphocytes),
    ("atypical lymphocytes", CellType::AtypicalLymphocytes),
    ("reactive lymphs", CellType::AtypicalLymphocytes),
    ("reactive lymphocytes", CellType::AtypicalLymphocytes),
    ("variant lymphocytes", CellType::AtypicalLymphocytes),
    ("lymphs, atypical", CellType::AtypicalLymphocytes),
    ("lymphs, reactive", CellType::AtypicalLymphocytes),
    ("lymphs, atypical/reactive", CellType::AtypicalLymphocytes),
    ("lymphs, atypical/reactive (auto)", CellType::AtypicalLymphocytes),
    ("lymphocytes, atypical", CellType::AtypicalLymphocytes),
    // Monocytes
    ("mono", CellType::Monocytes),
    ("monos", CellType::Monocytes),
    ("monocyte", CellType::Monocytes),
    ("monocytes", CellType::Monocytes),
    // Eosinophils
    ("eos", CellType::Eosinophils),
    ("eosin", CellType::Eosinophils),
    ("eosinophil", CellType::Eosinophils),
    ("eosinophils", CellType::Eosinophils),
    // Basophils
    ("baso", CellType::Basophils),
    ("basos", CellType::Basophils),
    ("basophil", CellType::Basophils),
    ("basophils", CellType::Basophils),
    // Immature myeloid forms
    ("meta", CellType::Metamyelocytes),
    ("metas", CellType::Metamyelocytes),
    ("metamyelocyte", CellType::Metamyelocytes),
    ("metamyelocytes", CellType::Metamyelocytes),
    ("myelo", CellType::Myelocytes),
    ("myelos", CellType::Myelocytes),
    ("myelocyte", CellType::Myelocytes),
    ("myelocytes", CellType::Myelocytes),
    ("pro", CellType::Promyelocytes),
    ("promyelo", CellType::Promyelocytes),
    ("promyelos", CellType::Promyelocytes),
    ("promyelocyte", CellType::Promyelocytes),
    ("promyelocytes", CellType::Promyelocytes),
    ("blast", CellType::Blasts),
    ("blasts", CellType::Blasts),
    // Other
    ("other", CellType::Other),
    ("others", CellType::Other),
    ("other cells", CellType::Other),
    // Immature granulocytes
    ("ig", CellType::ImmatureGranulocytes),
    ("igs", CellType::ImmatureGranulocytes),
    ("imm gran", CellType::ImmatureGranulocytes),
    ("immature grans", CellType::ImmatureGranulocytes),
    ("immature granulocyte", CellType::ImmatureGranulocytes),
    ("immature granulocytes", CellType::ImmatureGranulocytes),
    // Nucleated red cells
    ("nrbc", CellType::Nrbc),
    ("nrbcs", CellType::Nrbc),
    ("nucleated rbc", CellType::Nrbc),
    ("nucleated rbcs", CellType::Nrbc),
    ("nucleated red cells", CellType::Nrbc),
    ("nucleated red blood cells", CellType::Nrbc),
    ("nrbc/100 wbc", CellType::Nrbc),
];

lazy_static! {
    static ref SYNONYM_TABLE: HashMap<&'static str, CellType> = SYNONYMS.iter().copied().collect();
}

/// Lowercase, collapse whitespace, and drop surrounding `%` signs and periods.
pub fn normalize_label(label: &str) -> String {
    let collapsed = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_matches(|c: char| c == '%' || c == '.' || c.is_whitespace())
        .to_string()
}

/// Map a differential label to its canonical cell type.
///
/// The full label is tried first so that table entries carrying a qualifier
/// win; otherwise parenthesized qualifiers are stripped and the lookup is
/// retried. Returns `None` for labels not in the table.
pub fn canonical_cell_type(label: &str) -> Option<CellType> {
    let key = normalize_label(label);
    if let Some(cell_type) = SYNONYM_TABLE.get(key.as_str()) {
        return Some(*cell_type);
    }

    let stripped = normalize_label(&PAREN_QUALIFIER.replace_all(&key, " "));
    if stripped != key {
        return SYNONYM_TABLE.get(stripped.as_str()).copied();
    }

    None
}
