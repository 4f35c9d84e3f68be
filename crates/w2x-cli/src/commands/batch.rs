//! Batch command - extract fields from many PDFs concurrently.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use w2x_core::{ExtractionResult, W2Extractor};

use super::{build_extractor, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output directory for one JSON file per input and `summary.json`
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Number of files processed at once
    #[arg(short, long, default_value_t = 4)]
    jobs: usize,

    /// Keep going when a file cannot be read
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of one file.
#[derive(Serialize)]
struct FileReport {
    file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Name of the per-file JSON written to the output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No PDF files match: {}", args.inputs.join(" "));
    }

    eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let extractor = Arc::new(build_extractor(config, args.model_dir.clone())?);
    let permits = Arc::new(Semaphore::new(args.jobs.max(1)));

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let extractor = Arc::clone(&extractor);
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                let _permit = permits.acquire_owned().await?;
                let report = tokio::task::spawn_blocking(move || process_file(&extractor, path)).await?;
                anyhow::Ok(report)
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle.await??;
        progress.inc(1);

        if let Some(error) = &report.error {
            if !args.continue_on_error {
                progress.abandon();
                anyhow::bail!("Failed to process {}: {}", report.file.display(), error);
            }
            warn!("Failed to process {}: {}", report.file.display(), error);
        }
        reports.push(report);
    }
    progress.finish_and_clear();

    write_reports(&mut reports, args.output_dir.as_deref())?;

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    eprintln!(
        "{} Processed {} files in {:?} ({} failed)",
        style("✓").green(),
        reports.len(),
        start.elapsed(),
        failed
    );

    Ok(())
}

/// Expand glob patterns into a sorted, de-duplicated list of PDF paths.
fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        for entry in glob(pattern)? {
            match entry {
                Ok(path) if is_pdf(&path) => files.push(path),
                Ok(path) => debug!("Skipping non-PDF {}", path.display()),
                Err(e) => warn!("{}", e),
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn process_file(extractor: &W2Extractor, path: PathBuf) -> FileReport {
    let start = Instant::now();
    let outcome = fs::read(&path)
        .map_err(|e| e.to_string())
        .and_then(|data| extractor.extract(&data).map_err(|e| e.to_string()));

    let (result, error) = match outcome {
        Ok(result) => (Some(result), None),
        Err(e) => (None, Some(e)),
    };

    FileReport {
        file: path,
        result,
        error,
        output: None,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}

/// Write one JSON file per input plus `summary.json`, or JSON lines to stdout.
fn write_reports(reports: &mut [FileReport], output_dir: Option<&Path>) -> anyhow::Result<()> {
    let Some(output_dir) = output_dir else {
        for report in reports.iter() {
            println!("{}", serde_json::to_string(report)?);
        }
        return Ok(());
    };

    let files: Vec<PathBuf> = reports.iter().map(|r| r.file.clone()).collect();
    for (report, name) in reports.iter_mut().zip(output_names(&files)) {
        if let Some(result) = &report.result {
            let output_path = output_dir.join(&name);
            fs::write(&output_path, result.to_json()?)?;
            debug!("Wrote {}", output_path.display());
            report.output = Some(name);
        }
    }

    let summary_path = output_dir.join(SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string_pretty(&*reports)?)?;
    eprintln!(
        "{} Summary written to {}",
        style("✓").green(),
        summary_path.display()
    );

    Ok(())
}

const SUMMARY_FILE: &str = "summary.json";

/// One distinct `<stem>.json` name per input, in input order.
///
/// Inputs from different directories may share a stem; later ones get a
/// `-2`, `-3`, ... suffix. Names are compared case-insensitively and never
/// shadow `summary.json`.
fn output_names(files: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::from([SUMMARY_FILE.to_string()]);

    files
        .iter()
        .map(|file| {
            let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("w2");
            let mut name = format!("{}.json", stem);
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{}-{}.json", stem, n);
                n += 1;
            }
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_do_not_collide() {
        let files: Vec<PathBuf> = ["a/w2.pdf", "b/w2.pdf", "c/W2.PDF", "d/other.pdf", "e/summary.pdf"]
            .iter()
            .map(PathBuf::from)
            .collect();

        assert_eq!(
            output_names(&files),
            vec!["w2.json", "w2-2.json", "W2-3.json", "other.json", "summary-2.json"]
        );
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("x/form.PDF")));
        assert!(!is_pdf(Path::new("x/form.json")));
    }
}
