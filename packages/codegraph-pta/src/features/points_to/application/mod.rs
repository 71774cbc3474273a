//! Application layer for Points-to Analysis
//!
//! - **PointerAnalysis**: options → solver with plugins → fixpoint
//! - **PointerAnalysisResult**: points-to, alias and call-graph queries

pub mod analyzer;

pub use analyzer::{PointerAnalysis, PointerAnalysisResult};
