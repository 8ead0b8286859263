//! Batch processing command for multiple lab text files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, warn};

use cbcnote_core::models::config::CbcnoteConfig;
use cbcnote_core::{LabTextParser, NarrativeComposer, ParsedBundle, RuleBasedParser};

use super::parse::{csv_header, csv_row};
use super::{bundle_json, load_config, to_json_string};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching `.txt` input files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file JSON reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Per-file report written as `<stem>.json`.
#[derive(Serialize)]
struct FileReport {
    bundle: serde_json::Value,
    narrative: String,
    warnings: Vec<String>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    bundle: Option<ParsedBundle>,
    narrative: Option<String>,
    warnings: Vec<String>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("txt")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = RuleBasedParser::new();
    let composer = NarrativeComposer::new(config.narrative.clone());
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = process_single_file(&path, &parser, &composer);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok((bundle, narrative, warnings)) => {
                results.push(ProcessResult {
                    path,
                    bundle: Some(bundle),
                    narrative: Some(narrative),
                    warnings,
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        bundle: None,
                        narrative: None,
                        warnings: Vec::new(),
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.bundle.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    match &args.output_dir {
        Some(output_dir) => {
            for result in &successful {
                write_report(output_dir, result, &config)?;
            }
        }
        None => {
            for result in &successful {
                println!(
                    "{}: {}",
                    file_name(&result.path),
                    result.narrative.as_deref().unwrap_or("")
                );
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    parser: &RuleBasedParser,
    composer: &NarrativeComposer,
) -> anyhow::Result<(ParsedBundle, String, Vec<String>)> {
    let text = fs::read_to_string(path)?;
    let outcome = parser.parse(&text)?;
    let narrative = composer.compose(&outcome.bundle).text();

    Ok((outcome.bundle, narrative, outcome.warnings))
}

fn write_report(output_dir: &Path, result: &ProcessResult, config: &CbcnoteConfig) -> anyhow::Result<()> {
    let Some(bundle) = &result.bundle else {
        return Ok(());
    };

    let output_name = result
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let output_path = output_dir.join(format!("{}.json", output_name));

    let report = FileReport {
        bundle: bundle_json(bundle, &config.output)?,
        narrative: result.narrative.clone().unwrap_or_default(),
        warnings: result.warnings.clone(),
    };
    let content = to_json_string(&serde_json::to_value(&report)?, config.output.pretty_json)?;

    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status"];
    header.extend(csv_header());
    header.extend(["processing_time_ms", "error"]);
    wtr.write_record(&header)?;

    let empty_columns = csv_header().len();

    for result in results {
        let mut record = vec![file_name(&result.path).to_string()];

        match &result.bundle {
            Some(bundle) => {
                record.push("success".to_string());
                record.extend(csv_row(bundle));
            }
            None => {
                record.push("error".to_string());
                record.extend(std::iter::repeat_n(String::new(), empty_columns));
            }
        }

        record.push(result.processing_time_ms.to_string());
        record.push(result.error.clone().unwrap_or_default());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}
