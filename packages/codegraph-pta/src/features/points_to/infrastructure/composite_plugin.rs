//! Fan-out of solver events to registered plugins
//!
//! Plugins are notified in registration order. The first error stops the
//! fan-out and is returned to the solver.

use crate::errors::PtaResult;
use crate::features::points_to::domain::{
    CSMethod, CSObj, CSVar, CallEdge, ContextId, InvokeId, MethodId, PointsToSet,
};
use crate::features::points_to::ports::{Plugin, SolverServices};

#[derive(Default)]
pub struct CompositePlugin {
    plugins: Vec<Box<dyn Plugin>>,
}

impl CompositePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        tracing::debug!(plugin = plugin.name(), "registered plugin");
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

impl Plugin for CompositePlugin {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn on_start(&mut self, solver: &mut dyn SolverServices) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_start(solver)?;
        }
        Ok(())
    }

    fn on_finish(&mut self, solver: &mut dyn SolverServices) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_finish(solver)?;
        }
        Ok(())
    }

    fn on_new_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: MethodId,
    ) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_new_method(solver, method)?;
        }
        Ok(())
    }

    fn on_new_cs_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: CSMethod,
    ) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_new_cs_method(solver, method)?;
        }
        Ok(())
    }

    fn on_unresolved_call(
        &mut self,
        solver: &mut dyn SolverServices,
        recv: CSObj,
        context: ContextId,
        invoke: InvokeId,
    ) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_unresolved_call(solver, recv, context, invoke)?;
        }
        Ok(())
    }

    fn on_new_call_edge(
        &mut self,
        solver: &mut dyn SolverServices,
        edge: &CallEdge,
    ) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_new_call_edge(solver, edge)?;
        }
        Ok(())
    }

    fn on_new_points_to_set(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
    ) -> PtaResult<()> {
        for plugin in &mut self.plugins {
            plugin.on_new_points_to_set(solver, var, delta)?;
        }
        Ok(())
    }
}
