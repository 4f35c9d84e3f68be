//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the w2x pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct W2Config {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Native-vs-OCR decision thresholds.
    pub quality: QualityConfig,

    /// Line assembly configuration.
    pub layout: LayoutConfig,

    /// Label matching configuration.
    pub matching: MatchingConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI pages are rasterized at before OCR.
    pub raster_dpi: u32,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,

    /// Largest page raster in pixels (0 = unlimited).
    pub max_raster_pixels: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            raster_dpi: 300,
            max_pages: 10,
            max_raster_pixels: 50_000_000,
        }
    }
}

/// Thresholds deciding whether native text is trustworthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Minimum non-whitespace characters per page, averaged over the document.
    pub min_chars_per_page: usize,

    /// Largest tolerated fraction of pages without any text.
    pub max_blank_page_ratio: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_chars_per_page: 20,
            max_blank_page_ratio: 0.5,
        }
    }
}

/// Line assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Fraction of the smaller token height two tokens must share vertically
    /// to sit on the same line.
    pub line_overlap_ratio: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_overlap_ratio: 0.5,
        }
    }
}

/// Label matching configuration. Distances are in PDF points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// How far below a label a value line may start.
    pub max_vertical_distance: f32,

    /// How far right of a label a value line may start.
    pub max_horizontal_distance: f32,

    /// Slack added on both sides of a label when selecting tokens in its column.
    pub column_tolerance: f32,

    /// Restrict matching to pages that look like a W-2 when any page does.
    pub w2_page_filter: bool,

    /// JSON label table replacing the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_file: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_vertical_distance: 40.0,
            max_horizontal_distance: 220.0,
            column_tolerance: 8.0,
            w2_page_filter: true,
            labels_file: None,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Allow the OCR fallback at all.
    pub enabled: bool,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` markers emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models"),
            keep_unk: false,
        }
    }
}

impl W2Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: W2Config =
            serde_json::from_str(r#"{"quality": {"min_chars_per_page": 5}}"#).unwrap();

        assert_eq!(config.quality.min_chars_per_page, 5);
        assert_eq!(config.quality.max_blank_page_ratio, 0.5);
        assert_eq!(config.pdf.raster_dpi, 300);
        assert!(config.matching.w2_page_filter);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("w2x-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = W2Config::default();
        config.pdf.raster_dpi = 150;
        config.save(&path).unwrap();

        let loaded = W2Config::from_file(&path).unwrap();
        assert_eq!(loaded.pdf.raster_dpi, 150);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
