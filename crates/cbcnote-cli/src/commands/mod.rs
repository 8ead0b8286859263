//! Subcommands of the `cbcnote` binary and the helpers they share.

pub mod batch;
pub mod config;
pub mod narrate;
pub mod parse;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use cbcnote_core::models::config::{CbcnoteConfig, OutputConfig};
use cbcnote_core::ParsedBundle;

/// Load the `--config` file, else the default config file if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<CbcnoteConfig> {
    if let Some(path) = config_path {
        return Ok(CbcnoteConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(CbcnoteConfig::from_file(&default_path)?)
    } else {
        Ok(CbcnoteConfig::default())
    }
}

/// Read lab text from a file, or from stdin when the input is `-`.
pub fn read_input(input: &Path) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }

    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    Ok(fs::read_to_string(input)?)
}

/// Write command output to a file, or to stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            println!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }

    Ok(())
}

/// Bundle as a JSON value, honoring the output settings.
pub fn bundle_json(bundle: &ParsedBundle, output: &OutputConfig) -> anyhow::Result<serde_json::Value> {
    let mut json = serde_json::to_value(bundle)?;

    if !output.include_raw_text {
        if let Some(obj) = json.as_object_mut() {
            obj.remove("raw_text");
        }
    }

    Ok(json)
}

pub fn to_json_string(value: &serde_json::Value, pretty: bool) -> anyhow::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}
