//! # Context-Sensitive Points-to Analysis with Dynamic Call Edges
//!
//! Inclusion-based pointer analysis over a JVM-level IR, driven by a work
//! queue, with plugins that resolve the call edges ordinary dispatch cannot:
//! - **Lambdas**: `invokedynamic` sites bootstrapped by `LambdaMetafactory`
//! - **Reflection**: `Class.forName`, `newInstance`, `Method.invoke` and the
//!   meta-object APIs in between
//!
//! ## Layout
//! - `domain`: IR, heap objects, contexts, pointers, call edges
//! - `ports`: class hierarchy, context selection, solver services, plugins
//! - `infrastructure`: the solver and reference implementations of the ports
//! - `plugins`: lambda and reflection resolvers
//! - `application`: [`PointerAnalysis`] entry point
//!
//! ## Usage
//! ```text
//! use codegraph_pta::config::PtaOptions;
//! use codegraph_pta::features::points_to::PointerAnalysis;
//!
//! let options = PtaOptions::default().entry("<Main: void main(java.lang.String[])>");
//! let result = PointerAnalysis::new(options)?.analyze(program)?;
//! assert!(result.may_alias(x, y));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
pub mod ports;

// Re-exports for public API
pub use application::{PointerAnalysis, PointerAnalysisResult};
pub use domain::{CallEdge, CallKind, Program, ProgramBuilder};
pub use plugins::{LambdaPlugin, ReflectionPlugin};
pub use ports::{ClassHierarchy, ContextSelector, Plugin, SolverServices};
// Re-export infrastructure (internal use - prefer application layer)
#[doc(hidden)]
pub use infrastructure::{Solver, SolverState};
