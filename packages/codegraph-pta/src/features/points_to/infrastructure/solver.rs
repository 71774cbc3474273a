//! Worklist solver
//!
//! Inclusion-based, context-sensitive, on-the-fly call graph construction:
//! - New reachable methods contribute allocations, copies and static calls
//! - Growth of a variable's points-to set triggers field/array accesses and
//!   virtual dispatch for the instance calls using it as base
//! - Call edges wire arguments to parameters and returns to results
//!
//! Facts asserted by plugins through [`SolverServices`] land on the same
//! work queue as the solver's own facts, so plugin callbacks are never
//! re-entered.

use crate::config::PtaOptions;
use crate::errors::{next_index, PtaError, PtaResult};
use crate::features::points_to::domain::{
    CSCallSite, CSMethod, CSObj, CSVar, CallEdge, CallKind, ContextId, ContextTable, FlowKind,
    InvokeId, InvokeKind, JType, Literal, MethodId, MockObj, Obj, ObjId, Pointer,
    PointerFlowEdge, PointsToSet, Program, Stmt, VarId,
};
use crate::features::points_to::ports::{
    ClassHierarchy, ContextSelector, Plugin, SelectorEnv, SolverServices,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, trace};

use super::call_graph::CallGraph;
use super::composite_plugin::CompositePlugin;
use super::heap_model::HeapModel;
use super::pointer_flow_graph::PointerFlowGraph;

#[derive(Debug)]
enum WorkItem {
    PointsTo(Pointer, PointsToSet),
    CallEdge(CallEdge),
}

/// Statistics about one solver run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    pub work_items: usize,
    pub reachable_methods: usize,
    pub cs_methods: usize,
    pub call_edges: usize,
    pub pfg_edges: usize,
    pub objects: usize,
    pub contexts: usize,
    pub pointers: usize,
}

/// Everything the solver knows; this is what plugins see as [`SolverServices`]
pub struct SolverState {
    program: Arc<Program>,
    hierarchy: Arc<dyn ClassHierarchy>,
    selector: Box<dyn ContextSelector>,
    options: PtaOptions,
    contexts: ContextTable,
    heap: HeapModel,
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    points_to: FxHashMap<Pointer, PointsToSet>,
    work: VecDeque<WorkItem>,
    processed: usize,
}

impl SolverState {
    fn new(
        program: Arc<Program>,
        hierarchy: Arc<dyn ClassHierarchy>,
        selector: Box<dyn ContextSelector>,
        options: PtaOptions,
    ) -> Self {
        Self {
            program,
            hierarchy,
            selector,
            options,
            contexts: ContextTable::new(),
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            points_to: FxHashMap::default(),
            work: VecDeque::new(),
            processed: 0,
        }
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.contexts
    }

    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    pub fn pfg(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn points_to(&self) -> &FxHashMap<Pointer, PointsToSet> {
        &self.points_to
    }

    pub fn stats(&self) -> SolverStats {
        SolverStats {
            work_items: self.processed,
            reachable_methods: self.call_graph.reachable_methods().len(),
            cs_methods: self.call_graph.cs_method_count(),
            call_edges: self.call_graph.edge_count(),
            pfg_edges: self.pfg.edge_count(),
            objects: self.heap.len(),
            contexts: self.contexts.len(),
            pointers: self.points_to.len(),
        }
    }

    /// Objects of `pts` that may pass through an edge filtered by `filter`
    fn filter(&self, pts: &PointsToSet, filter: Option<&JType>) -> PointsToSet {
        match filter {
            None => pts.clone(),
            Some(ty) => pts
                .iter()
                .filter(|o| self.hierarchy.is_subtype(&self.heap.get(o.obj).ty, ty))
                .collect(),
        }
    }

    /// Merge `pts` into `pointer` and forward the new objects along PFG edges
    fn propagate(&mut self, pointer: Pointer, pts: &PointsToSet) -> PointsToSet {
        let delta = self.points_to.entry(pointer).or_default().add_all(pts);
        if delta.is_empty() {
            return delta;
        }
        trace!(%pointer, new = delta.len(), "points-to grew");
        let edges: Vec<PointerFlowEdge> = self.pfg.outgoing(&pointer).to_vec();
        for edge in edges {
            let flowing = self.filter(&delta, edge.type_filter.as_ref());
            if !flowing.is_empty() {
                self.work.push_back(WorkItem::PointsTo(edge.target, flowing));
            }
        }
        delta
    }

    fn check_budget(&mut self) -> PtaResult<()> {
        self.processed += 1;
        match self.options.max_work_items {
            Some(limit) if self.processed > limit => Err(PtaError::Budget { limit }),
            _ => Ok(()),
        }
    }

    fn var_pointer(context: ContextId, var: VarId) -> Pointer {
        Pointer::Var(CSVar::new(context, var))
    }

    /// Statement effects that depend only on the method becoming reachable
    fn process_stmts(&mut self, cs_method: CSMethod) -> PtaResult<()> {
        let program = Arc::clone(&self.program);
        let method = program.method(cs_method.method);
        let ctx = cs_method.context;

        for (index, stmt) in method.stmts.iter().enumerate() {
            match stmt {
                Stmt::New { lhs, ty } => {
                    let stmt = next_index(index, "statements")?;
                    let obj = self.heap.alloc_obj(method.id, stmt, ty.clone())?;
                    let heap_ctx = self.select_heap_context(cs_method, obj)?;
                    self.add_var_points_to(ctx, *lhs, heap_ctx, obj);
                }
                Stmt::AssignLiteral { lhs, literal } => {
                    let obj = match literal {
                        Literal::Str(s) => self.heap.string_constant(s)?,
                        Literal::Class(ty) => self.heap.class_constant(ty.clone())?,
                        Literal::Null => continue,
                    };
                    self.add_var_points_to(ctx, *lhs, ContextId::EMPTY, obj);
                }
                Stmt::Copy { lhs, rhs } => self.add_pfg_edge(
                    Self::var_pointer(ctx, *rhs),
                    Self::var_pointer(ctx, *lhs),
                    FlowKind::LocalAssign,
                    None,
                ),
                Stmt::Cast { lhs, rhs, ty } => self.add_pfg_edge(
                    Self::var_pointer(ctx, *rhs),
                    Self::var_pointer(ctx, *lhs),
                    FlowKind::Cast,
                    ty.is_reference().then(|| ty.clone()),
                ),
                Stmt::LoadStatic { lhs, field } => self.add_pfg_edge(
                    Pointer::StaticField(*field),
                    Self::var_pointer(ctx, *lhs),
                    FlowKind::StaticLoad,
                    None,
                ),
                Stmt::StoreStatic { field, rhs } => self.add_pfg_edge(
                    Self::var_pointer(ctx, *rhs),
                    Pointer::StaticField(*field),
                    FlowKind::StaticStore,
                    None,
                ),
                Stmt::Invoke(id) => {
                    let invoke = program.invoke(*id);
                    if invoke.kind != InvokeKind::Static {
                        continue;
                    }
                    let Some(callee) = self.hierarchy.resolve_method(&invoke.method_ref) else {
                        debug!(invoke = %invoke.method_ref, "unresolved static call");
                        continue;
                    };
                    if program.method(callee).is_abstract {
                        continue;
                    }
                    let site = CSCallSite::new(ctx, *id);
                    let callee_ctx = self.select_context(site, None, callee)?;
                    self.add_call_edge(CallEdge::new(
                        site,
                        CSMethod::new(callee_ctx, callee),
                        CallKind::Static,
                    ));
                }
                Stmt::LoadField { .. }
                | Stmt::StoreField { .. }
                | Stmt::LoadArray { .. }
                | Stmt::StoreArray { .. }
                | Stmt::Return(_) => {}
            }
        }
        Ok(())
    }

    /// Field and array accesses through `var`, whose points-to set gained `delta`
    fn process_field_accesses(&mut self, var: CSVar, delta: &PointsToSet) {
        let program = Arc::clone(&self.program);
        let uses = &program.var(var.var).uses;
        let ctx = var.context;

        for obj in delta.iter() {
            for (lhs, field) in &uses.load_fields {
                self.add_pfg_edge(
                    Pointer::InstanceField(obj, *field),
                    Self::var_pointer(ctx, *lhs),
                    FlowKind::InstanceLoad,
                    None,
                );
            }
            for (field, rhs) in &uses.store_fields {
                self.add_pfg_edge(
                    Self::var_pointer(ctx, *rhs),
                    Pointer::InstanceField(obj, *field),
                    FlowKind::InstanceStore,
                    None,
                );
            }
            for lhs in &uses.load_arrays {
                self.add_pfg_edge(
                    Pointer::ArrayIndex(obj),
                    Self::var_pointer(ctx, *lhs),
                    FlowKind::ArrayLoad,
                    None,
                );
            }
            if !uses.store_arrays.is_empty() {
                let filter = self
                    .heap
                    .get(obj.obj)
                    .ty
                    .element_type()
                    .filter(|t| t.is_reference())
                    .cloned();
                for rhs in &uses.store_arrays {
                    self.add_pfg_edge(
                        Self::var_pointer(ctx, *rhs),
                        Pointer::ArrayIndex(obj),
                        FlowKind::ArrayStore,
                        filter.clone(),
                    );
                }
            }
        }
    }

    /// Ordinary dispatch of `invoke` on `recv`; `false` when no concrete target exists
    fn dispatch(&mut self, context: ContextId, invoke: InvokeId, recv: CSObj) -> PtaResult<bool> {
        let program = Arc::clone(&self.program);
        let call = program.invoke(invoke);
        let callee = match call.kind {
            InvokeKind::Special => self.hierarchy.resolve_method(&call.method_ref),
            _ => {
                let ty = self.heap.get(recv.obj).ty.clone();
                self.hierarchy.dispatch(&ty, &call.method_ref)
            }
        }
        .filter(|m| !program.method(*m).is_abstract);
        let (Some(callee), Some(kind)) = (callee, CallKind::from_invoke(call.kind)) else {
            return Ok(false);
        };

        let site = CSCallSite::new(context, invoke);
        let callee_ctx = self.select_context(site, Some(recv), callee)?;
        if let Some(this) = program.method(callee).this {
            self.add_points_to(Self::var_pointer(callee_ctx, this), PointsToSet::singleton(recv));
        }
        self.add_call_edge(CallEdge::new(site, CSMethod::new(callee_ctx, callee), kind));
        Ok(true)
    }

    /// Argument and return wiring for ordinary call edges
    fn wire_ordinary_edge(&mut self, edge: &CallEdge) {
        let program = Arc::clone(&self.program);
        let invoke = program.invoke(edge.call_site.invoke);
        let callee = program.method(edge.callee.method);
        let caller_ctx = edge.call_site.context;
        let callee_ctx = edge.callee.context;

        for (arg, (param, ty)) in invoke
            .args
            .iter()
            .zip(callee.params.iter().zip(&callee.param_types))
        {
            if ty.is_reference() {
                self.add_pfg_edge(
                    Self::var_pointer(caller_ctx, *arg),
                    Self::var_pointer(callee_ctx, *param),
                    FlowKind::ParameterPassing,
                    None,
                );
            }
        }
        if let Some(result) = invoke.result {
            for ret in &callee.return_vars {
                self.add_pfg_edge(
                    Self::var_pointer(callee_ctx, *ret),
                    Self::var_pointer(caller_ctx, result),
                    FlowKind::Return,
                    None,
                );
            }
        }
    }
}

impl SolverServices for SolverState {
    fn program(&self) -> Arc<Program> {
        Arc::clone(&self.program)
    }

    fn hierarchy(&self) -> Arc<dyn ClassHierarchy> {
        Arc::clone(&self.hierarchy)
    }

    fn options(&self) -> &PtaOptions {
        &self.options
    }

    fn obj(&self, id: ObjId) -> &Obj {
        self.heap.get(id)
    }

    fn add_mock_obj(&mut self, mock: MockObj) -> PtaResult<ObjId> {
        self.heap.mock(mock)
    }

    fn select_context(
        &mut self,
        call_site: CSCallSite,
        recv: Option<CSObj>,
        callee: MethodId,
    ) -> PtaResult<ContextId> {
        let mut env = SelectorEnv {
            contexts: &mut self.contexts,
            objs: self.heap.objects(),
            program: &self.program,
        };
        self.selector.select_context(&mut env, call_site, recv, callee)
    }

    fn select_heap_context(&mut self, method: CSMethod, obj: ObjId) -> PtaResult<ContextId> {
        let mut env = SelectorEnv {
            contexts: &mut self.contexts,
            objs: self.heap.objects(),
            program: &self.program,
        };
        self.selector.select_heap_context(&mut env, method, obj)
    }

    fn points_to_set_of(&self, pointer: &Pointer) -> PointsToSet {
        self.points_to.get(pointer).cloned().unwrap_or_default()
    }

    fn add_points_to(&mut self, pointer: Pointer, pts: PointsToSet) {
        if !pts.is_empty() {
            self.work.push_back(WorkItem::PointsTo(pointer, pts));
        }
    }

    fn add_pfg_edge(
        &mut self,
        source: Pointer,
        target: Pointer,
        kind: FlowKind,
        type_filter: Option<JType>,
    ) {
        let edge = PointerFlowEdge::new(source, target, kind).with_filter(type_filter);
        if !self.pfg.add_edge(edge.clone()) {
            return;
        }
        trace!(%edge, "new PFG edge");
        if let Some(pts) = self.points_to.get(&source) {
            let flowing = self.filter(pts, edge.type_filter.as_ref());
            if !flowing.is_empty() {
                self.work.push_back(WorkItem::PointsTo(target, flowing));
            }
        }
    }

    fn add_call_edge(&mut self, edge: CallEdge) {
        self.work.push_back(WorkItem::CallEdge(edge));
    }
}

/// Solver driver: owns the state and the plugins observing it
pub struct Solver {
    state: SolverState,
    plugin: CompositePlugin,
}

impl Solver {
    pub fn new(
        program: Arc<Program>,
        hierarchy: Arc<dyn ClassHierarchy>,
        selector: Box<dyn ContextSelector>,
        options: PtaOptions,
    ) -> Self {
        Self {
            state: SolverState::new(program, hierarchy, selector, options),
            plugin: CompositePlugin::new(),
        }
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugin.add(plugin);
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    pub fn into_state(self) -> SolverState {
        self.state
    }

    /// Run to fixpoint from `entries` (analyzed under the empty context)
    pub fn solve(&mut self, entries: &[MethodId]) -> PtaResult<()> {
        info!(
            entries = entries.len(),
            selector = self.state.selector.name(),
            plugins = ?self.plugin.names(),
            "points-to analysis started"
        );

        self.plugin.on_start(&mut self.state)?;
        for entry in entries {
            self.add_reachable(CSMethod::new(ContextId::EMPTY, *entry))?;
        }
        self.drain()?;
        self.plugin.on_finish(&mut self.state)?;
        self.drain()?;

        let stats = self.state.stats();
        info!(
            work_items = stats.work_items,
            reachable_methods = stats.reachable_methods,
            cs_methods = stats.cs_methods,
            call_edges = stats.call_edges,
            pfg_edges = stats.pfg_edges,
            objects = stats.objects,
            "points-to analysis finished"
        );
        Ok(())
    }

    fn drain(&mut self) -> PtaResult<()> {
        while let Some(item) = self.state.work.pop_front() {
            self.state.check_budget()?;
            match item {
                WorkItem::PointsTo(pointer, pts) => {
                    let delta = self.state.propagate(pointer, &pts);
                    if let Pointer::Var(var) = pointer {
                        if !delta.is_empty() {
                            self.process_var_growth(var, &delta)?;
                        }
                    }
                }
                WorkItem::CallEdge(edge) => self.process_call_edge(edge)?,
            }
        }
        Ok(())
    }

    fn add_reachable(&mut self, cs_method: CSMethod) -> PtaResult<()> {
        if !self.state.call_graph.add_reachable(cs_method) {
            return Ok(());
        }
        if self.state.call_graph.add_reachable_method(cs_method.method) {
            debug!(method = %self.state.program.method(cs_method.method), "new reachable method");
            self.plugin.on_new_method(&mut self.state, cs_method.method)?;
        }
        self.state.process_stmts(cs_method)?;
        self.plugin.on_new_cs_method(&mut self.state, cs_method)
    }

    fn process_var_growth(&mut self, var: CSVar, delta: &PointsToSet) -> PtaResult<()> {
        self.state.process_field_accesses(var, delta);

        let program = self.state.program();
        for invoke in &program.var(var.var).uses.invokes {
            for recv in delta.iter() {
                if !self.state.dispatch(var.context, *invoke, recv)? {
                    trace!(%recv, invoke = %invoke, "no ordinary target");
                    self.plugin
                        .on_unresolved_call(&mut self.state, recv, var.context, *invoke)?;
                }
            }
        }

        self.plugin.on_new_points_to_set(&mut self.state, var, delta)
    }

    fn process_call_edge(&mut self, edge: CallEdge) -> PtaResult<()> {
        if !self.state.call_graph.add_edge(edge.clone()) {
            return Ok(());
        }
        debug!(%edge, "new call edge");
        self.add_reachable(edge.callee)?;
        if edge.kind.is_ordinary() {
            self.state.wire_ordinary_edge(&edge);
        }
        self.plugin.on_new_call_edge(&mut self.state, &edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextStrategy;
    use crate::features::points_to::domain::{ClassDecl, MethodDecl, MethodRef, ProgramBuilder};
    use crate::features::points_to::infrastructure::{ProgramHierarchy, StrategySelector};

    fn solver_for(program: Program, options: PtaOptions) -> Solver {
        let program = Arc::new(program);
        let hierarchy = Arc::new(ProgramHierarchy::new(Arc::clone(&program)));
        let selector = Box::new(StrategySelector::from_options(&options));
        Solver::new(program, hierarchy, selector, options)
    }

    fn objs_of(solver: &Solver, ctx: ContextId, var: VarId) -> Vec<ObjId> {
        solver
            .state()
            .var_points_to(CSVar::new(ctx, var))
            .iter()
            .map(|o| o.obj)
            .collect()
    }

    #[test]
    fn test_field_flow_and_virtual_call() {
        // main: a = new A; b = new B; a.f = b; c = a.f; d = a.get()
        let mut b = ProgramBuilder::new();
        b.add_class(ClassDecl::new("A"));
        b.add_class(ClassDecl::new("B"));
        let f = b.add_field("A", "f", JType::class("B"), false);
        let get = b.add_method(MethodDecl::new("A", "get").returns(JType::class("B")));
        let this = b.this_var(get).unwrap();
        let r = b.new_var(get, "r", JType::class("B"));
        b.push_stmt(get, Stmt::LoadField { lhs: r, base: this, field: f });
        b.push_stmt(get, Stmt::Return(Some(r)));

        let main = b.add_method(MethodDecl::new("A", "main").static_method());
        let va = b.new_var(main, "a", JType::class("A"));
        let vb = b.new_var(main, "b", JType::class("B"));
        let vc = b.new_var(main, "c", JType::class("B"));
        let vd = b.new_var(main, "d", JType::class("B"));
        b.push_stmt(main, Stmt::New { lhs: va, ty: JType::class("A") });
        b.push_stmt(main, Stmt::New { lhs: vb, ty: JType::class("B") });
        b.push_stmt(main, Stmt::StoreField { base: va, field: f, rhs: vb });
        b.push_stmt(main, Stmt::LoadField { lhs: vc, base: va, field: f });
        b.add_invoke(
            main,
            InvokeKind::Virtual,
            MethodRef::new("A", "get", vec![], JType::class("B")),
            Some(va),
            vec![],
            Some(vd),
        );
        let program = b.build().unwrap();

        let options = PtaOptions::default().context(ContextStrategy::Insensitive, 0);
        let mut solver = solver_for(program, options);
        solver.solve(&[main]).unwrap();

        let b_objs = objs_of(&solver, ContextId::EMPTY, vb);
        assert_eq!(b_objs.len(), 1);
        assert_eq!(objs_of(&solver, ContextId::EMPTY, vc), b_objs);
        assert_eq!(objs_of(&solver, ContextId::EMPTY, vd), b_objs);
        assert_eq!(solver.state().call_graph().edge_count(), 1);
        assert!(solver.state().call_graph().is_reachable(get));
    }

    #[test]
    fn test_array_store_filtered_by_element_type() {
        let mut b = ProgramBuilder::new();
        b.add_class(ClassDecl::new("A"));
        b.add_class(ClassDecl::new("B"));
        let main = b.add_method(MethodDecl::new("A", "main").static_method());
        let arr = b.new_var(main, "arr", JType::array(JType::class("A")));
        let va = b.new_var(main, "a", JType::object());
        let vb = b.new_var(main, "b", JType::object());
        let out = b.new_var(main, "out", JType::object());
        b.push_stmt(main, Stmt::New { lhs: arr, ty: JType::array(JType::class("A")) });
        b.push_stmt(main, Stmt::New { lhs: va, ty: JType::class("A") });
        b.push_stmt(main, Stmt::New { lhs: vb, ty: JType::class("B") });
        b.push_stmt(main, Stmt::StoreArray { base: arr, rhs: va });
        b.push_stmt(main, Stmt::StoreArray { base: arr, rhs: vb });
        b.push_stmt(main, Stmt::LoadArray { lhs: out, base: arr });
        let program = b.build().unwrap();

        let mut solver = solver_for(program, PtaOptions::default());
        solver.solve(&[main]).unwrap();
        assert_eq!(
            objs_of(&solver, ContextId::EMPTY, out),
            objs_of(&solver, ContextId::EMPTY, va)
        );
    }

    #[test]
    fn test_budget_exhaustion_is_an_error() {
        let mut b = ProgramBuilder::new();
        b.add_class(ClassDecl::new("A"));
        let main = b.add_method(MethodDecl::new("A", "main").static_method());
        for i in 0..4 {
            let v = b.new_var(main, format!("v{}", i), JType::class("A"));
            b.push_stmt(main, Stmt::New { lhs: v, ty: JType::class("A") });
        }
        let program = b.build().unwrap();

        let mut solver = solver_for(program, PtaOptions::default().max_work_items(Some(2)));
        assert!(matches!(
            solver.solve(&[main]),
            Err(PtaError::Budget { limit: 2 })
        ));
    }

    #[test]
    fn test_call_site_sensitivity_separates_callers() {
        // id(p) { return p; }  x = id(a); y = id(b)
        let mut b = ProgramBuilder::new();
        b.add_class(ClassDecl::new("A"));
        let id = b.add_method(
            MethodDecl::new("A", "id")
                .static_method()
                .params(vec![JType::object()])
                .returns(JType::object()),
        );
        let p = b.param(id, 0).unwrap();
        b.push_stmt(id, Stmt::Return(Some(p)));
        let main = b.add_method(MethodDecl::new("A", "main").static_method());
        let va = b.new_var(main, "a", JType::object());
        let vb = b.new_var(main, "b", JType::object());
        let vx = b.new_var(main, "x", JType::object());
        let vy = b.new_var(main, "y", JType::object());
        b.push_stmt(main, Stmt::New { lhs: va, ty: JType::class("A") });
        b.push_stmt(main, Stmt::New { lhs: vb, ty: JType::class("A") });
        let id_ref = MethodRef::new("A", "id", vec![JType::object()], JType::object());
        b.add_invoke(main, InvokeKind::Static, id_ref.clone(), None, vec![va], Some(vx));
        b.add_invoke(main, InvokeKind::Static, id_ref, None, vec![vb], Some(vy));
        let program = b.build().unwrap();

        let options = PtaOptions::default().context(ContextStrategy::CallSite, 1);
        let mut solver = solver_for(program, options);
        solver.solve(&[main]).unwrap();
        assert_eq!(objs_of(&solver, ContextId::EMPTY, vx), objs_of(&solver, ContextId::EMPTY, va));
        assert_eq!(objs_of(&solver, ContextId::EMPTY, vy), objs_of(&solver, ContextId::EMPTY, vb));
        assert_eq!(solver.state().stats().cs_methods, 3);
    }
}
