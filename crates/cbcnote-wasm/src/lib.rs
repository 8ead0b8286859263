//! WASM bindings for CBC lab text extraction.
//!
//! This crate exposes the parser and narrative composer to the browser form.
//! Maps are serialized as plain JS objects.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use cbcnote_core::models::config::NarrativeConfig;
use cbcnote_core::{LabTextParser, NarrativeComposer, ParsedBundle, RuleBasedParser};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_bundle(parser: &RuleBasedParser, text: Option<String>) -> Result<ParsedBundle, JsValue> {
    // `null`/`undefined` from the form is treated as empty text
    let text = text.unwrap_or_default();

    parser
        .parse(&text)
        .map(|outcome| outcome.bundle)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Extract lab values, differential and morphology from pasted text.
#[wasm_bindgen]
pub fn parse_lab_text(text: Option<String>) -> Result<JsValue, JsValue> {
    let bundle = parse_bundle(&RuleBasedParser::new(), text)?;
    to_js(&bundle)
}

/// Compose the narrative paragraph for pasted text with default phrasing.
#[wasm_bindgen]
pub fn narrate(text: Option<String>) -> Result<String, JsValue> {
    let bundle = parse_bundle(&RuleBasedParser::new(), text)?;
    Ok(NarrativeComposer::default().compose(&bundle).text())
}

/// Lab text extractor class for browser use.
#[wasm_bindgen]
pub struct LabTextExtractor {
    parser: RuleBasedParser,
    narrative: NarrativeConfig,
}

#[wasm_bindgen]
impl LabTextExtractor {
    /// Create a new extractor with default phrasing.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: RuleBasedParser::new(),
            narrative: NarrativeConfig::default(),
        }
    }

    /// Set the lead-in used when findings start their own sentence.
    #[wasm_bindgen]
    pub fn set_lead_in(&mut self, lead_in: &str) {
        self.narrative.findings_lead_in = lead_in.to_string();
    }

    /// Set the panel name used in the lab values sentence.
    #[wasm_bindgen]
    pub fn set_panel_name(&mut self, panel_name: &str) {
        self.narrative.panel_name = panel_name.to_string();
    }

    /// Set the sentence used when the differential was not performed.
    #[wasm_bindgen]
    pub fn set_not_performed_sentence(&mut self, sentence: &str) {
        self.narrative.not_performed_sentence = sentence.to_string();
    }

    /// Extract the bundle from text.
    #[wasm_bindgen]
    pub fn parse(&self, text: Option<String>) -> Result<JsValue, JsValue> {
        let bundle = parse_bundle(&self.parser, text)?;
        to_js(&bundle)
    }

    /// Compose the narrative paragraph for text.
    #[wasm_bindgen]
    pub fn narrate(&self, text: Option<String>) -> Result<String, JsValue> {
        let bundle = parse_bundle(&self.parser, text)?;
        Ok(self.composer().compose(&bundle).text())
    }

    /// Get the bundle together with its paragraph and parser warnings.
    #[wasm_bindgen]
    pub fn parse_with_narrative(&self, text: Option<String>) -> Result<JsValue, JsValue> {
        let text = text.unwrap_or_default();
        let outcome = self
            .parser
            .parse(&text)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        #[derive(Serialize)]
        struct ParseWithNarrative {
            bundle: ParsedBundle,
            narrative: String,
            sentences: Vec<String>,
            warnings: Vec<String>,
        }

        let paragraph = self.composer().compose(&outcome.bundle);
        let output = ParseWithNarrative {
            narrative: paragraph.text(),
            sentences: paragraph.sentences().to_vec(),
            bundle: outcome.bundle,
            warnings: outcome.warnings,
        };

        to_js(&output)
    }

    fn composer(&self) -> NarrativeComposer {
        NarrativeComposer::new(self.narrative.clone())
    }
}

impl Default for LabTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}
