//! Desired-state documents on disk.
//!
//! The format follows the file extension: `.json`, `.yaml`/`.yml`, or
//! `.toml`. Parsing yields the raw document; validation into a
//! [`DesiredState`] reports every problem at once.

use std::path::Path;

use mistly_core::{DesiredState, DesiredStateDocument};

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Read, parse and validate a desired-state file.
pub fn load(path: &Path) -> Result<DesiredState, CliError> {
    let document_err = |reason: String| CliError::Document {
        path: path.display().to_string(),
        reason,
    };

    let format = Format::from_path(path).ok_or_else(|| {
        document_err("unrecognized extension; use .json, .yaml, .yml or .toml".into())
    })?;
    let text = std::fs::read_to_string(path).map_err(|e| document_err(e.to_string()))?;

    let document = parse(format, &text).map_err(document_err)?;
    Ok(DesiredState::try_from(document)?)
}

fn parse(format: Format, text: &str) -> Result<DesiredStateDocument, String> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
    }
}
