//! Parse command - extract structured data from a single lab text file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use cbcnote_core::models::config::CbcnoteConfig;
use cbcnote_core::{CellType, FindingValue, LabLabel, LabTextParser, ParsedBundle, RuleBasedParser};

use super::{bundle_json, load_config, read_input, to_json_string, write_output};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input text file, or `-` for stdin
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Print parser warnings to stderr
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let text = read_input(&args.input)?;

    info!("Parsing {}", args.input.display());

    let outcome = RuleBasedParser::new().parse(&text)?;

    if args.show_warnings && !outcome.warnings.is_empty() {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &outcome.warnings {
            eprintln!("  - {}", warning);
        }
    }

    let output = format_bundle(&outcome.bundle, args.format, args.pretty, &config)?;
    write_output(args.output.as_ref(), &output)?;

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_bundle(
    bundle: &ParsedBundle,
    format: OutputFormat,
    pretty: bool,
    config: &CbcnoteConfig,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let json = bundle_json(bundle, &config.output)?;
            to_json_string(&json, pretty || config.output.pretty_json)
        }
        OutputFormat::Csv => format_csv(bundle),
        OutputFormat::Text => Ok(format_text(bundle)),
    }
}

/// Header row: lab labels, then cell types.
pub fn csv_header() -> Vec<&'static str> {
    LabLabel::ALL
        .iter()
        .map(|label| label.key())
        .chain(CellType::ALL.iter().map(|cell_type| cell_type.key()))
        .collect()
}

/// One row matching `csv_header`; missing values are empty cells.
pub fn csv_row(bundle: &ParsedBundle) -> Vec<String> {
    let labs = LabLabel::ALL.iter().map(|label| {
        bundle
            .lab(*label)
            .map(|value| value.to_string())
            .unwrap_or_default()
    });
    let differential = CellType::ALL.iter().map(|cell_type| {
        bundle
            .differential
            .get(*cell_type)
            .map(|percent| percent.to_string())
            .unwrap_or_default()
    });

    labs.chain(differential).collect()
}

fn format_csv(bundle: &ParsedBundle) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(csv_header())?;
    wtr.write_record(csv_row(bundle))?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(bundle: &ParsedBundle) -> String {
    let mut output = String::new();

    output.push_str("Lab values:\n");
    if bundle.labs.is_empty() {
        output.push_str("  (none)\n");
    }
    for (label, value) in &bundle.labs {
        match label.unit() {
            Some(unit) => output.push_str(&format!("  {:<10} {} {}\n", label.display_name(), value, unit)),
            None => output.push_str(&format!("  {:<10} {}\n", label.display_name(), value)),
        }
    }
    output.push('\n');

    output.push_str("Differential:\n");
    if let Some(method) = &bundle.differential.method {
        output.push_str(&format!("  Method: {}\n", method));
    }
    if bundle.differential.is_not_performed() {
        output.push_str("  Not performed\n");
    } else if bundle.differential.entries.is_empty() {
        output.push_str("  (none)\n");
    }
    for (cell_type, entry) in &bundle.differential.entries {
        output.push_str(&format!("  {:<22} {}%\n", cell_type.noun(), entry.percent));
    }
    output.push('\n');

    output.push_str("Morphology:\n");
    if bundle.morphology.is_empty() {
        output.push_str("  (none)\n");
    }
    for (label, finding) in &bundle.morphology {
        let value = match &finding.value {
            FindingValue::Presence(true) => "present".to_string(),
            FindingValue::Presence(false) => "absent".to_string(),
            FindingValue::Category(category) => category.clone(),
            FindingValue::Percent(percent) => format!("{}%", percent),
        };
        output.push_str(&format!("  {:<28} {}\n", label.noun(), value));
    }

    output
}
