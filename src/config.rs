//
// config.rs
// Ecg-Dicom-Prep
//
// Immutable run configuration: rendering/quality thresholds, redaction region, AI canvas and output layout.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pixel layout of the AI artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ColorMode {
    #[serde(rename = "RGB", alias = "rgb")]
    #[value(name = "rgb")]
    Rgb,
    #[serde(rename = "L", alias = "l")]
    #[value(name = "l")]
    L,
}

/// Rasterization backends, listed in preference order in [`PipelineConfig::backends`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Pdfium,
    Pdftoppm,
}

/// Text drawn inside the redacted rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub title: String,
    pub subtitle: String,
    pub items: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            title: "DADOS ANONIMIZADOS".to_string(),
            subtitle: "Conforme LGPD".to_string(),
            items: vec![
                "• ID Paciente".to_string(),
                "• Nome".to_string(),
                "• Dados Clínicos".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    pub width_fraction: f32,
    pub height_fraction: f32,
    /// `None` paints the rectangle without any text.
    pub label: Option<LabelConfig>,
    pub font_path: Option<PathBuf>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            width_fraction: 0.20,
            height_fraction: 0.25,
            label: Some(LabelConfig::default()),
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub size: (u32, u32),
    pub color_mode: ColorMode,
    pub normalize: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            size: (224, 224),
            color_mode: ColorMode::Rgb,
            normalize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizationConfig {
    /// Replacement for non-date, non-time identifying attributes.
    pub placeholder: String,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            placeholder: "ANONYMIZED".to_string(),
        }
    }
}

/// Folder names under the output root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub anonymized_dir: String,
    pub for_ai_dir: String,
    pub originals_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            anonymized_dir: "ecgs_anonimizados".to_string(),
            for_ai_dir: "preprocessed_for_ai".to_string(),
            originals_dir: "images_ecg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub recursive: bool,
    pub render_dpi: u32,
    pub min_dpi: u32,
    /// Absolute pixel floor (8 x 6 inches at 200 DPI).
    pub min_size: (u32, u32),
    pub save_dicom: bool,
    pub backends: Vec<Backend>,
    pub redaction: RedactionConfig,
    pub ai: AiConfig,
    pub anonymization: AnonymizationConfig,
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            render_dpi: 200,
            min_dpi: 200,
            min_size: (1600, 1200),
            save_dicom: true,
            backends: vec![Backend::Pdfium, Backend::Pdftoppm],
            redaction: RedactionConfig::default(),
            ai: AiConfig::default(),
            anonymization: AnonymizationConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let unreadable = |message: String| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let config: PipelineConfig =
            serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("redaction.width_fraction", self.redaction.width_fraction)?;
        check_fraction("redaction.height_fraction", self.redaction.height_fraction)?;
        if self.render_dpi == 0 {
            return Err(ConfigError::Zero("render_dpi"));
        }
        if self.min_dpi == 0 {
            return Err(ConfigError::Zero("min_dpi"));
        }
        if self.ai.size.0 == 0 || self.ai.size.1 == 0 {
            return Err(ConfigError::Zero("ai.size"));
        }
        if self.backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        Ok(())
    }
}

fn check_fraction(name: &'static str, value: f32) -> Result<(), ConfigError> {
    // NaN fails both comparisons and is rejected too.
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { name, value })
    }
}
