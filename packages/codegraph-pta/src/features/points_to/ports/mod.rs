//! Ports (Interfaces) for Points-to Analysis
//!
//! - [`ClassHierarchy`]: subtype queries and method dispatch
//! - [`ContextSelector`]: context policy for callees and heap objects
//! - [`SolverServices`]: what a plugin may read from and assert into the solver
//! - [`Plugin`]: solver events a plugin observes
//!
//! Plugins never call back into each other or into the solver recursively:
//! every fact asserted through [`SolverServices`] is queued and processed by
//! the solver's driver loop after the callback returns.

use crate::config::PtaOptions;
use crate::errors::PtaResult;
use crate::features::points_to::domain::{
    CSCallSite, CSMethod, CSObj, CSVar, CallEdge, ContextId, ContextTable, FlowKind, InvokeId,
    JType, MethodId, MethodRef, MockObj, Obj, ObjId, Pointer, PointsToSet, Program, VarId,
};
use std::sync::Arc;

// ============================================================================
// Class hierarchy
// ============================================================================

pub trait ClassHierarchy: Send + Sync {
    /// Virtual dispatch of `method_ref` on an object of type `recv_type`.
    /// Abstract methods are never returned.
    fn dispatch(&self, recv_type: &JType, method_ref: &MethodRef) -> Option<MethodId>;

    /// Resolve a statically bound reference (static / special calls),
    /// searching the declaring class and then its superclasses
    fn resolve_method(&self, method_ref: &MethodRef) -> Option<MethodId>;

    fn is_subtype(&self, sub: &JType, sup: &JType) -> bool;

    /// Constructors declared by `class_name`
    fn constructors(&self, class_name: &str) -> Vec<MethodId>;

    /// Methods called `name` in `class_name`; `inherited` also walks superclasses
    fn methods_named(
        &self,
        class_name: &str,
        name: &str,
        public_only: bool,
        inherited: bool,
    ) -> Vec<MethodId>;

    fn has_class(&self, class_name: &str) -> bool;

    /// `<init>()` of `class_name`, if declared
    fn no_arg_constructor(&self, class_name: &str) -> Option<MethodId>;
}

// ============================================================================
// Context selection
// ============================================================================

/// Solver state a selector may consult while choosing a context
pub struct SelectorEnv<'a> {
    pub contexts: &'a mut ContextTable,
    pub objs: &'a [Obj],
    pub program: &'a Program,
}

pub trait ContextSelector: Send + Sync {
    /// Context for `callee` invoked at `call_site`, with `recv` as receiver
    /// for instance calls
    fn select_context(
        &self,
        env: &mut SelectorEnv<'_>,
        call_site: CSCallSite,
        recv: Option<CSObj>,
        callee: MethodId,
    ) -> PtaResult<ContextId>;

    /// Heap context of `obj` allocated in `method`
    fn select_heap_context(
        &self,
        env: &mut SelectorEnv<'_>,
        method: CSMethod,
        obj: ObjId,
    ) -> PtaResult<ContextId>;

    fn name(&self) -> &'static str;
}

// ============================================================================
// Solver services
// ============================================================================

/// Handle passed into every plugin callback
pub trait SolverServices {
    fn program(&self) -> Arc<Program>;

    fn hierarchy(&self) -> Arc<dyn ClassHierarchy>;

    fn options(&self) -> &PtaOptions;

    fn obj(&self, id: ObjId) -> &Obj;

    /// Register a synthetic object; equal requests yield the same id
    fn add_mock_obj(&mut self, mock: MockObj) -> PtaResult<ObjId>;

    fn select_context(
        &mut self,
        call_site: CSCallSite,
        recv: Option<CSObj>,
        callee: MethodId,
    ) -> PtaResult<ContextId>;

    fn select_heap_context(&mut self, method: CSMethod, obj: ObjId) -> PtaResult<ContextId>;

    /// Current points-to set of any pointer (a snapshot)
    fn points_to_set_of(&self, pointer: &Pointer) -> PointsToSet;

    fn var_points_to(&self, var: CSVar) -> PointsToSet {
        self.points_to_set_of(&Pointer::Var(var))
    }

    fn add_points_to(&mut self, pointer: Pointer, pts: PointsToSet);

    /// `pts(context:var) ∋ heap_context:obj`
    fn add_var_points_to(
        &mut self,
        context: ContextId,
        var: VarId,
        heap_context: ContextId,
        obj: ObjId,
    ) {
        let pointer = Pointer::Var(CSVar::new(context, var));
        self.add_points_to(pointer, PointsToSet::singleton(CSObj::new(heap_context, obj)));
    }

    fn add_pfg_edge(
        &mut self,
        source: Pointer,
        target: Pointer,
        kind: FlowKind,
        type_filter: Option<JType>,
    );

    fn add_call_edge(&mut self, edge: CallEdge);
}

// ============================================================================
// Plugin protocol
// ============================================================================

/// Observer of solver events
///
/// All callbacks default to no-ops. Returning `Err` aborts the run.
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn on_start(&mut self, _solver: &mut dyn SolverServices) -> PtaResult<()> {
        Ok(())
    }

    fn on_finish(&mut self, _solver: &mut dyn SolverServices) -> PtaResult<()> {
        Ok(())
    }

    /// Once per newly reachable method, regardless of context
    fn on_new_method(
        &mut self,
        _solver: &mut dyn SolverServices,
        _method: MethodId,
    ) -> PtaResult<()> {
        Ok(())
    }

    /// Once per reachable (context, method)
    fn on_new_cs_method(
        &mut self,
        _solver: &mut dyn SolverServices,
        _method: CSMethod,
    ) -> PtaResult<()> {
        Ok(())
    }

    /// `recv` reached an instance call whose dispatch found no concrete target
    fn on_unresolved_call(
        &mut self,
        _solver: &mut dyn SolverServices,
        _recv: CSObj,
        _context: ContextId,
        _invoke: InvokeId,
    ) -> PtaResult<()> {
        Ok(())
    }

    /// Once per edge added to the call graph, plugin edges included
    fn on_new_call_edge(
        &mut self,
        _solver: &mut dyn SolverServices,
        _edge: &CallEdge,
    ) -> PtaResult<()> {
        Ok(())
    }

    /// `delta` holds only the objects new to `var`
    fn on_new_points_to_set(
        &mut self,
        _solver: &mut dyn SolverServices,
        _var: CSVar,
        _delta: &PointsToSet,
    ) -> PtaResult<()> {
        Ok(())
    }
}
