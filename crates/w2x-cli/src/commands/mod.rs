//! Subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use w2x_core::{PureOcrEngine, W2Config, W2Extractor};

/// Load the configuration from `path`, the default location, or defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<W2Config> {
    if let Some(path) = path {
        return Ok(W2Config::from_file(path)?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        info!("Using config {}", default_path.display());
        Ok(W2Config::from_file(&default_path)?)
    } else {
        Ok(W2Config::default())
    }
}

/// Build an extractor, attaching the OCR engine when its models are present.
///
/// Missing models are not fatal: scanned pages then produce empty results.
pub fn build_extractor(mut config: W2Config, model_dir: Option<PathBuf>) -> anyhow::Result<W2Extractor> {
    if let Some(dir) = model_dir {
        config.ocr.model_dir = dir;
    }

    let ocr = if config.ocr.enabled {
        match PureOcrEngine::from_config(&config.ocr) {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!("OCR fallback disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let extractor = W2Extractor::new(config)?;
    Ok(match ocr {
        Some(engine) => extractor.with_ocr_backend(Arc::new(engine)),
        None => extractor,
    })
}
