//! Infrastructure layer: reference implementations of the ports
//!
//! - ProgramHierarchy: class hierarchy over a built program
//! - StrategySelector: call-site / object / type context selection
//! - HeapModel, PointerFlowGraph, CallGraph: monotone solver storage
//! - Solver: worklist driver implementing `SolverServices`
//! - CompositePlugin: fan-out of solver events

pub mod call_graph;
pub mod composite_plugin;
pub mod context_selector;
pub mod heap_model;
pub mod hierarchy;
pub mod pointer_flow_graph;
pub mod solver;

pub use call_graph::CallGraph;
pub use composite_plugin::CompositePlugin;
pub use context_selector::StrategySelector;
pub use heap_model::HeapModel;
pub use hierarchy::ProgramHierarchy;
pub use pointer_flow_graph::PointerFlowGraph;
pub use solver::{Solver, SolverState, SolverStats};
