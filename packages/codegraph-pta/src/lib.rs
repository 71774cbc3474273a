/*
 * Codegraph PTA - Context-Sensitive Points-to Analysis
 *
 * Feature-First Hexagonal Architecture:
 * - config/    : PtaOptions, presets, YAML loading
 * - features/  : points_to (domain → ports → infrastructure → plugins → application)
 * - errors     : PtaError
 *
 * Dynamic call edges:
 * - LambdaPlugin     : invokedynamic / LambdaMetafactory
 * - ReflectionPlugin : Class.forName, newInstance, Method.invoke
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Solver callbacks carry full call-site context
#![allow(clippy::type_complexity)] // Nested dedup tables
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration system (options, presets, YAML)
pub mod config;
/// Error types
pub mod errors;
/// Feature modules
pub mod features;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ContextStrategy, PtaOptions};
pub use errors::{PtaError, PtaResult};
pub use features::points_to::{PointerAnalysis, PointerAnalysisResult};
