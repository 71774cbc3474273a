//! Error types for codegraph-pta
//!
//! Any `Err` returned from a plugin callback aborts the analysis run.

use crate::config::ConfigError;
use crate::features::points_to::domain::MethodHandleKind;
use thiserror::Error;

/// Main error type for points-to analysis
#[derive(Debug, Error)]
pub enum PtaError {
    /// Method handle kind the lambda resolver cannot model (field handles)
    #[error("Unsupported method handle kind {kind} for target {target}")]
    UnsupportedMethodHandle {
        kind: MethodHandleKind,
        target: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed reflection log line
    #[error("Reflection log error at line {line}: {reason}")]
    ReflectionLog { line: usize, reason: String },

    /// Entry method signature not present in the program
    #[error("Unknown entry method: {0}")]
    UnknownEntry(String),

    /// Work budget exhausted before reaching a fixpoint
    #[error("Work budget of {limit} items exhausted before fixpoint")]
    Budget { limit: usize },

    /// Malformed program IR
    #[error("Program error: {0}")]
    Program(String),

    /// More entities of one kind than a 32-bit id can address
    #[error("Too many {what} for 32-bit ids")]
    Capacity { what: &'static str },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PtaError {
    /// Create a reflection log error
    pub fn reflection_log(line: usize, reason: impl Into<String>) -> Self {
        PtaError::ReflectionLog {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias for points-to operations
pub type PtaResult<T> = std::result::Result<T, PtaError>;

/// Index of the next entry in a table currently holding `len` entries
pub(crate) fn next_index(len: usize, what: &'static str) -> PtaResult<u32> {
    u32::try_from(len).map_err(|_| PtaError::Capacity { what })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PtaError::UnsupportedMethodHandle {
            kind: MethodHandleKind::GetField,
            target: "<A: int f>".into(),
        };
        assert!(err.to_string().contains("REF_getField"));

        let err = PtaError::reflection_log(3, "expected 4 fields");
        assert_eq!(
            err.to_string(),
            "Reflection log error at line 3: expected 4 fields"
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_next_index_bounds() {
        assert_eq!(next_index(0, "objects").unwrap(), 0);
        assert_eq!(next_index(u32::MAX as usize, "objects").unwrap(), u32::MAX);

        let err = next_index(u32::MAX as usize + 1, "objects").unwrap_err();
        assert!(matches!(err, PtaError::Capacity { what: "objects" }));
        assert!(err.to_string().starts_with("Too many objects"));
    }

    #[test]
    fn test_config_conversion() {
        let err: PtaError = ConfigError::MissingVersion.into();
        assert!(matches!(err, PtaError::Config(ConfigError::MissingVersion)));
    }
}
