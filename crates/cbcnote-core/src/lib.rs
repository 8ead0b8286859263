//! Core library for CBC lab text extraction.
//!
//! This crate provides:
//! - Lab value extraction (CBC indices, collection date) from pasted text
//! - Differential classification with synonym normalization and priority resolution
//! - Morphology flag extraction (toxic granulation, giant platelets, NRBCs, ...)
//! - Narrative paragraph composition for downstream report assembly

pub mod error;
pub mod models;
pub mod cbc;

pub use error::{CbcnoteError, ExtractionError, Result};
pub use models::bundle::{
    CellType, DifferentialEntry, DifferentialResult, DifferentialStatus, FindingValue, LabLabel,
    LabValue, MorphologyFinding, MorphologyLabel, ParsedBundle, Priority,
};
pub use models::config::{CbcnoteConfig, NarrativeConfig, OutputConfig};
pub use cbc::{
    narrate, parse_lab_text, LabTextParser, NarrativeComposer, NarrativeParagraph, ParseOutcome,
    RuleBasedParser,
};
