//! Configuration structures for parsing and narrative output.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for cbcnote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CbcnoteConfig {
    /// Narrative phrasing.
    pub narrative: NarrativeConfig,

    /// Output settings for the CLI.
    pub output: OutputConfig,
}

/// Phrasing used by the narrative composer.
///
/// Only wording is configurable; section order and suppression rules are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Name of the panel in the lead-in sentence.
    pub panel_name: String,

    /// Sentence emitted when the differential was not performed.
    pub not_performed_sentence: String,

    /// Lead-in for findings when no differential sentence is open.
    pub findings_lead_in: String,

    /// Verb used in the differential clause.
    pub differential_verb: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            panel_name: "CBC".to_string(),
            not_performed_sentence: "A differential was not performed.".to_string(),
            findings_lead_in: "Peripheral smear shows".to_string(),
            differential_verb: "shows".to_string(),
        }
    }
}

/// CLI output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output.
    pub pretty_json: bool,

    /// Include the original text in JSON output.
    pub include_raw_text: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty_json: false,
            include_raw_text: true,
        }
    }
}

impl CbcnoteConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            crate::CbcnoteError::Config(format!("{}: {}", path.display(), e))
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: CbcnoteConfig =
            serde_json::from_str(r#"{"narrative": {"panel_name": "Hemogram"}}"#).unwrap();
        assert_eq!(config.narrative.panel_name, "Hemogram");
        assert_eq!(config.narrative.differential_verb, "shows");
        assert!(config.output.include_raw_text);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = CbcnoteConfig::default();
        config.output.pretty_json = true;
        config.save(&path).unwrap();

        let loaded = CbcnoteConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = CbcnoteConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, crate::CbcnoteError::Config(_)));
    }
}
