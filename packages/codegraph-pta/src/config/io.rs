//! Configuration I/O (YAML loading)
//!
//! Schema v1:
//! ```yaml
//! version: 1
//! preset: balanced
//! pta:
//!   context: object
//!   k: 2
//!   reflection_inference: string-constant
//! ```

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::pta_options::{PtaOptions, PtaOptionsPatch};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pta: Option<PtaOptionsPatch>,
}

impl PtaOptions {
    /// Load and validate options from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        // Version check
        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = match export.preset.as_deref() {
            Some(name) => name.parse::<Preset>()?,
            None => Preset::default(),
        };

        let base = PtaOptions::from_preset(preset);
        let options = match export.pta {
            Some(patch) => patch.apply(base),
            None => base,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(1),
            preset: None,
            pta: Some(PtaOptionsPatch::from_options(self)),
        };
        Ok(serde_yaml::to_string(&export)?)
    }
}
