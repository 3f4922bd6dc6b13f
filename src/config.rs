//! Configuration loader and validator for the badge intake console.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::capture::{CaptureOptions, Facing};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub capture: Capture,
    pub sheets: Sheets,
    #[serde(default)]
    pub notes: Notes,
}

/// Capture settings handed to the external decoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capture {
    pub frame_rate: u32,
    pub detection_box: u32,
}

/// Spreadsheet endpoint settings. The deployment URL is environment-specific
/// and must come from configuration, never a source literal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sheets {
    pub endpoint_url: String,
}

/// Quick-note shortcuts offered to the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notes {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Config {
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            facing: Facing::Rear,
            frame_rate: self.capture.frame_rate,
            detection_box: self.capture.detection_box,
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.capture.frame_rate == 0 {
        return Err(ConfigError::Invalid("capture.frame_rate must be > 0"));
    }
    if cfg.capture.detection_box == 0 {
        return Err(ConfigError::Invalid("capture.detection_box must be > 0"));
    }
    if cfg.sheets.endpoint_url.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.endpoint_url must be non-empty"));
    }
    if !cfg.sheets.endpoint_url.starts_with("http") {
        return Err(ConfigError::Invalid("sheets.endpoint_url must be an http(s) URL"));
    }
    Ok(())
}

/// Example YAML configuration, also used by tests.
pub fn example() -> &'static str {
    r#"capture:
  frame_rate: 10
  detection_box: 250

sheets:
  endpoint_url: "https://script.google.com/macros/s/YOUR_DEPLOYMENT_ID/exec"

notes:
  suggestions:
    - "Demande fiche technique"
    - "Liste des prix"
    - "Besoin de devis"
    - "Rendez-vous de suivi"
    - "Appel de rappel"
    - "Documentation technique"
    - "Démonstration produit"
    - "Réunion commerciale"
    - "Projet en cours"
"#
}
