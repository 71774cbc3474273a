//! High-Level Points-to Analyzer
//!
//! Builds the solver from [`PtaOptions`], registers the dynamic-call plugins
//! the options enable and runs to fixpoint from the entry methods.
//!
//! # Usage
//! ```text
//! use codegraph_pta::config::PtaOptions;
//! use codegraph_pta::features::points_to::PointerAnalysis;
//!
//! let options = PtaOptions::default().entry("<Main: void main(java.lang.String[])>");
//! let result = PointerAnalysis::new(options)?.analyze(program)?;
//!
//! for callee in result.callees_of(invoke) { /* ... */ }
//! ```

use crate::config::{ContextStrategy, PtaOptions};
use crate::errors::{PtaError, PtaResult};
use crate::features::points_to::domain::{
    CSVar, CallEdge, ContextId, ContextTable, InvokeId, MethodId, Obj, ObjId, PointsToSet,
    Program, VarId,
};
use crate::features::points_to::infrastructure::{
    CallGraph, ProgramHierarchy, Solver, SolverState, SolverStats, StrategySelector,
};
use crate::features::points_to::plugins::{LambdaPlugin, ReflectionPlugin};
use crate::features::points_to::ports::Plugin;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Configured analysis, ready to run on a program
pub struct PointerAnalysis {
    options: PtaOptions,
    extra_plugins: Vec<Box<dyn Plugin>>,
}

impl PointerAnalysis {
    /// Validates `options` eagerly
    pub fn new(options: PtaOptions) -> PtaResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            extra_plugins: Vec::new(),
        })
    }

    /// Register an additional plugin, run after the built-in ones
    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.extra_plugins.push(plugin);
        self
    }

    pub fn options(&self) -> &PtaOptions {
        &self.options
    }

    /// Run from the entry methods named in the options
    pub fn analyze(self, program: impl Into<Arc<Program>>) -> PtaResult<PointerAnalysisResult> {
        let program = program.into();
        let entries = self
            .options
            .entry_methods
            .iter()
            .map(|sig| {
                program
                    .method_by_signature(sig)
                    .ok_or_else(|| PtaError::UnknownEntry(sig.clone()))
            })
            .collect::<PtaResult<Vec<_>>>()?;
        self.analyze_from(program, &entries)
    }

    /// Run from explicit entry methods, ignoring `entry_methods`
    pub fn analyze_from(
        self,
        program: impl Into<Arc<Program>>,
        entries: &[MethodId],
    ) -> PtaResult<PointerAnalysisResult> {
        let start = Instant::now();
        let program = program.into();
        let hierarchy = Arc::new(ProgramHierarchy::new(Arc::clone(&program)));
        let selector = Box::new(StrategySelector::from_options(&self.options));

        let mut solver = Solver::new(
            Arc::clone(&program),
            hierarchy,
            selector,
            self.options.clone(),
        );
        if self.options.lambda {
            solver.add_plugin(Box::new(LambdaPlugin::new()));
        }
        if self.options.reflection {
            solver.add_plugin(Box::new(ReflectionPlugin::new(&self.options, &program)?));
        }
        for plugin in self.extra_plugins {
            solver.add_plugin(plugin);
        }

        solver.solve(entries)?;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            context = self.options.context.as_str(),
            duration_ms, "pointer analysis complete"
        );
        Ok(PointerAnalysisResult {
            state: solver.into_state(),
            strategy: self.options.context,
            duration_ms,
        })
    }
}

/// Fixpoint of one analysis run
pub struct PointerAnalysisResult {
    state: SolverState,
    strategy: ContextStrategy,
    duration_ms: f64,
}

impl PointerAnalysisResult {
    // ═══════════════════════════════════════════════════════════════════════
    // Points-to queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Objects `var` may point to under any context, sorted by id
    pub fn points_to(&self, var: VarId) -> Vec<ObjId> {
        let mut objs: Vec<ObjId> = self
            .state
            .points_to()
            .iter()
            .filter_map(|(pointer, pts)| match pointer.as_var() {
                Some(cs) if cs.var == var => Some(pts),
                _ => None,
            })
            .flat_map(|pts| pts.iter().map(|o| o.obj))
            .collect();
        objs.sort_unstable();
        objs.dedup();
        objs
    }

    pub fn cs_points_to(&self, context: ContextId, var: VarId) -> PointsToSet {
        self.state
            .points_to()
            .get(&CSVar::new(context, var).into())
            .cloned()
            .unwrap_or_default()
    }

    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        let pa = self.points_to(a);
        self.points_to(b).iter().any(|o| pa.binary_search(o).is_ok())
    }

    pub fn obj(&self, id: ObjId) -> &Obj {
        self.state.heap().get(id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Call graph queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn call_graph(&self) -> &CallGraph {
        self.state.call_graph()
    }

    /// Targets of `invoke` under any context, sorted by id
    pub fn callees_of(&self, invoke: InvokeId) -> Vec<MethodId> {
        self.state.call_graph().callees_of(invoke)
    }

    pub fn call_edges(&self) -> impl Iterator<Item = &CallEdge> {
        self.state.call_graph().edges().iter()
    }

    pub fn is_reachable(&self, method: MethodId) -> bool {
        self.state.call_graph().is_reachable(method)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Run metadata
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stats(&self) -> SolverStats {
        self.state.stats()
    }

    pub fn contexts(&self) -> &ContextTable {
        self.state.contexts()
    }

    pub fn strategy(&self) -> ContextStrategy {
        self.strategy
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::features::points_to::domain::{ClassDecl, JType, MethodDecl, ProgramBuilder, Stmt};

    #[test]
    fn test_invalid_options_rejected_up_front() {
        let options = PtaOptions::default().reflection_inference("string");
        let err = PointerAnalysis::new(options).err().unwrap();
        assert!(matches!(
            err,
            PtaError::Config(ConfigError::UnknownReflectionInference { .. })
        ));
    }

    #[test]
    fn test_unknown_entry_signature() {
        let program = ProgramBuilder::new().build().unwrap();
        let options = PtaOptions::default().entry("<Main: void main()>");
        let err = PointerAnalysis::new(options).unwrap().analyze(program).err().unwrap();
        assert!(matches!(err, PtaError::UnknownEntry(sig) if sig == "<Main: void main()>"));
    }

    #[test]
    fn test_entry_by_signature() {
        let mut b = ProgramBuilder::new();
        b.add_class(ClassDecl::new("Main"));
        let main = b.add_method(MethodDecl::new("Main", "main").static_method());
        let x = b.new_var(main, "x", JType::object());
        b.push_stmt(
            main,
            Stmt::New {
                lhs: x,
                ty: JType::object(),
            },
        );
        let program = b.build().unwrap();

        let options = PtaOptions::default().entry("<Main: void main()>");
        let result = PointerAnalysis::new(options).unwrap().analyze(program).unwrap();
        assert!(result.is_reachable(main));
        assert_eq!(result.points_to(x).len(), 1);
        assert_eq!(result.strategy(), ContextStrategy::CallSite);
    }
}
