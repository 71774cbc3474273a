//! Analysis configuration
//!
//! Two levels:
//! - Preset: `PtaOptions::from_preset(Preset::Thorough)`
//! - Builder / YAML overrides on top of a preset
//!
//! ```rust,ignore
//! use codegraph_pta::config::{ContextStrategy, PtaOptions};
//!
//! let options = PtaOptions::default()
//!     .context(ContextStrategy::Object, 2)
//!     .reflection_inference("string-constant");
//! options.validate()?;
//!
//! let options = PtaOptions::from_yaml("pta.yaml")?;
//! ```

pub mod error;
pub mod io;
pub mod preset;
pub mod pta_options;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use io::ConfigExportV1;
pub use preset::Preset;
pub use pta_options::{ContextStrategy, PtaOptions, PtaOptionsPatch, ReflectionInference};
