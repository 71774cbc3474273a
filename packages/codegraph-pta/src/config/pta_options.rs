//! Points-to analysis options

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Context sensitivity strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    /// Context-insensitive (baseline)
    Insensitive,

    /// k-limiting call-string sensitivity (k-CFA)
    #[default]
    CallSite,

    /// k-object sensitivity: receiver allocation sites
    Object,

    /// k-type sensitivity: classes containing the receiver allocation sites
    Type,
}

impl ContextStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insensitive => "insensitive",
            Self::CallSite => "call_site",
            Self::Object => "object",
            Self::Type => "type",
        }
    }
}

/// How reflective targets are inferred without a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReflectionInference {
    #[default]
    Disabled,
    /// Resolve `Class.forName("C")` and `getMethod("m")` from string constants
    StringConstant,
}

impl ReflectionInference {
    pub const VALID: [&'static str; 2] = ["disabled", "string-constant"];

    /// Absent means disabled; anything else must name a supported mode
    pub fn parse(value: Option<&str>) -> ConfigResult<Self> {
        match value {
            None | Some("disabled") => Ok(Self::Disabled),
            Some("string-constant") => Ok(Self::StringConstant),
            Some(other) => Err(ConfigError::unknown_inference(other, &Self::VALID)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::StringConstant => "string-constant",
        }
    }
}

/// Options for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PtaOptions {
    /// Context abstraction
    pub context: ContextStrategy,

    /// Context length limit
    pub k: usize,

    /// Heap context length limit
    pub heap_depth: usize,

    /// Execution log of reflective calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_log: Option<PathBuf>,

    /// `disabled` or `string-constant`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_inference: Option<String>,

    /// Enable lambda / method reference resolution
    pub lambda: bool,

    /// Enable reflective call resolution
    pub reflection: bool,

    /// Abort with an error after this many work items (None=unlimited)
    pub max_work_items: Option<usize>,

    /// Entry method signatures, e.g. `<Main: void main(java.lang.String[])>`
    pub entry_methods: Vec<String>,
}

impl PtaOptions {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.context != ContextStrategy::Insensitive {
            if self.k < 1 || self.k > 4 {
                return Err(ConfigError::range_with_hint(
                    "k",
                    self.k,
                    1,
                    4,
                    "Context depth must be at least 1 for context-sensitive strategies",
                ));
            }
            if self.heap_depth > self.k {
                return Err(ConfigError::range_with_hint(
                    "heap_depth",
                    self.heap_depth,
                    0,
                    self.k,
                    "Heap context cannot be longer than method context",
                ));
            }
        }

        if let Some(n) = self.max_work_items {
            if n == 0 {
                return Err(ConfigError::range_with_hint(
                    "max_work_items",
                    n,
                    1,
                    usize::MAX,
                    "Use None for unlimited",
                ));
            }
        }

        let inference = self.inference()?;
        if let Some(log) = &self.reflection_log {
            if inference == ReflectionInference::StringConstant {
                return Err(ConfigError::ConflictingReflectionModels {
                    log: log.display().to_string(),
                    inference: inference.as_str().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Parsed reflection inference mode
    pub fn inference(&self) -> ConfigResult<ReflectionInference> {
        ReflectionInference::parse(self.reflection_inference.as_deref())
    }

    /// Builder: Set context strategy and depth
    pub fn context(mut self, strategy: ContextStrategy, k: usize) -> Self {
        self.context = strategy;
        self.k = k;
        self.heap_depth = self.heap_depth.min(k.saturating_sub(1));
        self
    }

    /// Builder: Set heap_depth
    pub fn heap_depth(mut self, v: usize) -> Self {
        self.heap_depth = v;
        self
    }

    /// Builder: Set reflection_log
    pub fn reflection_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.reflection_log = Some(path.into());
        self
    }

    /// Builder: Set reflection_inference
    pub fn reflection_inference(mut self, v: impl Into<String>) -> Self {
        self.reflection_inference = Some(v.into());
        self
    }

    /// Builder: Set lambda
    pub fn lambda(mut self, v: bool) -> Self {
        self.lambda = v;
        self
    }

    /// Builder: Set reflection
    pub fn reflection(mut self, v: bool) -> Self {
        self.reflection = v;
        self
    }

    /// Builder: Set max_work_items
    pub fn max_work_items(mut self, v: Option<usize>) -> Self {
        self.max_work_items = v;
        self
    }

    /// Builder: Add an entry method signature
    pub fn entry(mut self, signature: impl Into<String>) -> Self {
        self.entry_methods.push(signature.into());
        self
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                context: ContextStrategy::Insensitive,
                k: 0,
                heap_depth: 0,
                reflection_log: None,
                reflection_inference: None,
                lambda: true,
                reflection: false,
                max_work_items: Some(1_000_000),
                entry_methods: Vec::new(),
            },
            Preset::Balanced => Self {
                context: ContextStrategy::CallSite,
                k: 1,
                heap_depth: 0,
                reflection_log: None,
                reflection_inference: None,
                lambda: true,
                reflection: true,
                max_work_items: None,
                entry_methods: Vec::new(),
            },
            Preset::Thorough => Self {
                context: ContextStrategy::Object,
                k: 2,
                heap_depth: 1,
                reflection_log: None,
                reflection_inference: Some(ReflectionInference::StringConstant.as_str().into()),
                lambda: true,
                reflection: true,
                max_work_items: None,
                entry_methods: Vec::new(),
            },
        }
    }
}

impl Default for PtaOptions {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

/// Patch type for PtaOptions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PtaOptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_log: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_inference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_work_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_methods: Option<Vec<String>>,
}

impl PtaOptionsPatch {
    /// Overlay every field set in the patch onto `base`
    pub fn apply(self, mut base: PtaOptions) -> PtaOptions {
        if let Some(v) = self.context {
            base.context = v;
        }
        if let Some(v) = self.k {
            base.k = v;
        }
        if let Some(v) = self.heap_depth {
            base.heap_depth = v;
        }
        if let Some(v) = self.reflection_log {
            base.reflection_log = Some(v);
        }
        if let Some(v) = self.reflection_inference {
            base.reflection_inference = Some(v);
        }
        if let Some(v) = self.lambda {
            base.lambda = v;
        }
        if let Some(v) = self.reflection {
            base.reflection = v;
        }
        if let Some(v) = self.max_work_items {
            base.max_work_items = Some(v);
        }
        if let Some(v) = self.entry_methods {
            base.entry_methods = v;
        }
        base
    }

    /// Patch reproducing `options` exactly
    pub fn from_options(options: &PtaOptions) -> Self {
        Self {
            context: Some(options.context),
            k: Some(options.k),
            heap_depth: Some(options.heap_depth),
            reflection_log: options.reflection_log.clone(),
            reflection_inference: options.reflection_inference.clone(),
            lambda: Some(options.lambda),
            reflection: Some(options.reflection),
            max_work_items: options.max_work_items,
            entry_methods: Some(options.entry_methods.clone()),
        }
    }
}
