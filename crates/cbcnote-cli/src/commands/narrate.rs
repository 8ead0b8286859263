//! Narrate command - write the narrative paragraph for a lab text file.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use cbcnote_core::{LabTextParser, NarrativeComposer, RuleBasedParser};

use super::{load_config, read_input, write_output};

/// Arguments for the narrate command.
#[derive(Args)]
pub struct NarrateArgs {
    /// Input text file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: NarrateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let text = read_input(&args.input)?;

    info!("Composing narrative for {}", args.input.display());

    let outcome = RuleBasedParser::new().parse(&text)?;
    let paragraph = NarrativeComposer::new(config.narrative).compose(&outcome.bundle);

    if paragraph.is_empty() {
        eprintln!(
            "{} Nothing reportable was recognized in the input.",
            style("ℹ").blue()
        );
    }

    write_output(args.output.as_ref(), &paragraph.text())
}
