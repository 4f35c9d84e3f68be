//! Extract command - pull W-2 fields out of one PDF.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use w2x_core::ExtractionResult;

use super::{build_extractor, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip the OCR fallback
    #[arg(long)]
    no_ocr: bool,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,

    /// Print per-field confidence and source to stderr
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.no_ocr {
        config.ocr.enabled = false;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting {}", args.input.display());
    let data = fs::read(&args.input)?;
    let extractor = build_extractor(config, args.model_dir.clone())?;
    let result = tokio::task::spawn_blocking(move || extractor.extract(&data)).await??;

    let output = if args.pretty {
        result.to_json_pretty()?
    } else {
        result.to_json()?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        print_confidence(&result);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_confidence(result: &ExtractionResult) {
    eprintln!();
    eprintln!("{} Method: {}", style("ℹ").blue(), result.method);

    if result.is_empty() {
        eprintln!("{} No fields found", style("!").yellow());
        return;
    }

    for field in result.fields.values() {
        eprintln!(
            "  {:<28} {:>14}  {:>5.1}%  page {} line {}  {:?}",
            field.field,
            field.value.to_string(),
            field.confidence * 100.0,
            field.source.page_index + 1,
            field.source.line_index + 1,
            field.raw
        );
    }
}
