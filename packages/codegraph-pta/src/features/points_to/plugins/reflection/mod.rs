//! Reflective call edges
//!
//! Reflection is resolved by a set of models, each claiming the API call
//! sites it understands and reacting to growth of the variables those call
//! sites read:
//!
//! | Model | Active | APIs |
//! |-------|--------|------|
//! | [`LogModel`] | `reflection_log` set | logged `forName` / `newInstance` / `invoke` |
//! | [`ClassModel`] | always | `getClass`, `getConstructor`, `getDeclaredConstructor` |
//! | [`StringModel`] | `string-constant` inference | `forName`, `loadClass`, `getMethod`, `getDeclaredMethod` |
//! | [`ActionModel`] | always | `Class.newInstance`, `Constructor.newInstance`, `Method.invoke` |
//!
//! Call sites claimed by the log model are not offered to the others.
//!
//! The plugin itself wires every `REFLECTIVE` edge: elements of the
//! `Object[]` argument flow into the callee's reference parameters and
//! return values flow back to the call result.

pub mod action_model;
pub mod api;
pub mod class_model;
pub mod log_model;
pub mod meta;
pub mod string_model;

pub use action_model::ActionModel;
pub use api::Api;
pub use class_model::ClassModel;
pub use log_model::{LogEntry, LogModel};
pub use meta::MetaObjHelper;
pub use string_model::StringModel;

use crate::config::{PtaOptions, ReflectionInference};
use crate::errors::PtaResult;
use crate::features::points_to::domain::{
    AllocSite, CSCallSite, CSMethod, CSObj, CSVar, CallEdge, CallKind, FlowKind, Invoke,
    InvokeId, JType, MethodId, Pointer, PointsToSet, Program, ReflectiveApi, ReflectiveCallInfo,
    VarId,
};
use crate::features::points_to::ports::{Plugin, SolverServices};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use super::waitlist::Waitlist;
use super::MockObjTable;

/// One way of modelling reflective API calls
pub trait ReflectionModel {
    fn name(&self) -> &'static str;

    /// Offer a call site of a newly reachable method; `true` if claimed
    fn handle_new_invoke(&mut self, program: &Program, invoke: &Invoke) -> bool;

    fn is_relevant_var(&self, var: VarId) -> bool;

    /// `var` is relevant and gained `delta`
    fn handle_new_points_to_set(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
    ) -> PtaResult<()>;

    fn handle_new_cs_method(
        &mut self,
        _solver: &mut dyn SolverServices,
        _method: CSMethod,
    ) -> PtaResult<()> {
        Ok(())
    }
}

/// Variables read by claimed call sites, with the sites reading them
#[derive(Debug)]
pub(crate) struct RelevantVars<T> {
    uses: FxHashMap<VarId, Vec<(InvokeId, T)>>,
}

impl<T> Default for RelevantVars<T> {
    fn default() -> Self {
        Self {
            uses: FxHashMap::default(),
        }
    }
}

impl<T: Clone + PartialEq> RelevantVars<T> {
    pub(crate) fn add(&mut self, var: VarId, invoke: InvokeId, tag: T) {
        let uses = self.uses.entry(var).or_default();
        if !uses.iter().any(|(i, t)| *i == invoke && *t == tag) {
            uses.push((invoke, tag));
        }
    }

    pub(crate) fn contains(&self, var: VarId) -> bool {
        self.uses.contains_key(&var)
    }

    pub(crate) fn uses_of(&self, var: VarId) -> Vec<(InvokeId, T)> {
        self.uses.get(&var).cloned().unwrap_or_default()
    }
}

/// Points-to set of `var` in the changed variable's context: the delta for
/// the changed variable itself, the full current set otherwise
pub(crate) fn pts_in_context(
    solver: &dyn SolverServices,
    changed: CSVar,
    delta: &PointsToSet,
    var: VarId,
) -> PointsToSet {
    if var == changed.var {
        delta.clone()
    } else {
        solver.var_points_to(CSVar::new(changed.context, var))
    }
}

/// Reflective allocation of `ty` at `site`, optionally followed by a
/// constructor call on the new object
pub(crate) fn new_instance(
    solver: &mut dyn SolverServices,
    objs: &mut MockObjTable,
    site: CSCallSite,
    ty: JType,
    ctor: Option<MethodId>,
    info: ReflectiveCallInfo,
) -> PtaResult<()> {
    let program = solver.program();
    let call = program.invoke(site.invoke);
    let obj =
        objs.get_or_create(solver, AllocSite::Invoke(site.invoke), ty, Some(call.container))?;
    let heap_ctx = solver.select_heap_context(CSMethod::new(site.context, call.container), obj)?;
    if let Some(result) = call.result {
        solver.add_var_points_to(site.context, result, heap_ctx, obj);
    }
    let Some(ctor) = ctor else {
        return Ok(());
    };
    let recv = CSObj::new(heap_ctx, obj);
    let callee_ctx = solver.select_context(site, Some(recv), ctor)?;
    if let Some(this) = program.method(ctor).this {
        solver.add_var_points_to(callee_ctx, this, heap_ctx, obj);
    }
    let edge = CallEdge::new(site, CSMethod::new(callee_ctx, ctor), CallKind::Reflective(info));
    debug!(%edge, "reflective constructor edge");
    solver.add_call_edge(edge);
    Ok(())
}

/// `Method.invoke` of `target`: a direct edge for static targets, one edge
/// per receiver object (after dispatch) otherwise
pub(crate) fn invoke_method(
    solver: &mut dyn SolverServices,
    site: CSCallSite,
    target: MethodId,
    receivers: &PointsToSet,
    args: Option<VarId>,
) -> PtaResult<()> {
    let program = solver.program();
    let hierarchy = solver.hierarchy();
    let method = program.method(target);
    let info = ReflectiveCallInfo {
        api: ReflectiveApi::MethodInvoke,
        args,
    };

    if method.is_constructor() {
        return Ok(());
    }
    if method.is_static {
        let callee_ctx = solver.select_context(site, None, target)?;
        let callee = CSMethod::new(callee_ctx, target);
        let edge = CallEdge::new(site, callee, CallKind::Reflective(info));
        debug!(%edge, "reflective static edge");
        solver.add_call_edge(edge);
        return Ok(());
    }

    let declaring = method.declaring_type();
    let target_ref = method.method_ref();
    for recv in receivers.iter() {
        let recv_ty = solver.obj(recv.obj).ty.clone();
        if !hierarchy.is_subtype(&recv_ty, &declaring) {
            continue;
        }
        // Non-virtual targets (private methods) are not found by dispatch
        let callee = hierarchy.dispatch(&recv_ty, &target_ref).unwrap_or(target);
        if program.method(callee).is_abstract {
            trace!(%recv, target = %method, "no reflective target for receiver");
            continue;
        }
        let callee_ctx = solver.select_context(site, Some(recv), callee)?;
        if let Some(this) = program.method(callee).this {
            solver.add_var_points_to(callee_ctx, this, recv.context, recv.obj);
        }
        let edge = CallEdge::new(
            site,
            CSMethod::new(callee_ctx, callee),
            CallKind::Reflective(info.clone()),
        );
        debug!(%edge, "reflective instance edge");
        solver.add_call_edge(edge);
    }
    Ok(())
}

pub struct ReflectionPlugin {
    log: Option<LogModel>,
    models: Vec<Box<dyn ReflectionModel>>,
    /// `Object[]` argument variables of reflective edges, per callee
    arg_waitlist: Waitlist<CSVar, CSMethod>,
    forwarded: FxHashSet<(CSObj, CSMethod)>,
}

impl ReflectionPlugin {
    /// Fails eagerly on invalid reflection settings or an unreadable log
    pub fn new(options: &PtaOptions, program: &Program) -> PtaResult<Self> {
        options.validate()?;
        let log = match &options.reflection_log {
            Some(path) => Some(LogModel::from_file(path, program)?),
            None => None,
        };

        let mut models: Vec<Box<dyn ReflectionModel>> = vec![Box::new(ClassModel::new())];
        if options.inference()? == ReflectionInference::StringConstant {
            models.push(Box::new(StringModel::new()));
        }
        models.push(Box::new(ActionModel::new()));

        debug!(
            log = log.is_some(),
            models = ?models.iter().map(|m| m.name()).collect::<Vec<_>>(),
            "reflection models"
        );
        Ok(Self {
            log,
            models,
            arg_waitlist: Waitlist::new(),
            forwarded: FxHashSet::default(),
        })
    }

    /// Feed array elements of `arrays` into the reference parameters of `callee`
    fn forward_arrays(
        &mut self,
        solver: &mut dyn SolverServices,
        arrays: &PointsToSet,
        callee: CSMethod,
    ) {
        let program = solver.program();
        let method = program.method(callee.method);
        for array in arrays.iter() {
            if !matches!(solver.obj(array.obj).ty, JType::Array(_)) {
                continue;
            }
            if !self.forwarded.insert((array, callee)) {
                continue;
            }
            for (param, ty) in method.params.iter().zip(&method.param_types) {
                if !ty.is_reference() {
                    continue;
                }
                solver.add_pfg_edge(
                    Pointer::ArrayIndex(array),
                    Pointer::Var(CSVar::new(callee.context, *param)),
                    FlowKind::ParameterPassing,
                    Some(ty.clone()),
                );
            }
        }
    }
}

impl Plugin for ReflectionPlugin {
    fn name(&self) -> &'static str {
        "reflection"
    }

    fn on_new_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: MethodId,
    ) -> PtaResult<()> {
        let program = solver.program();
        for invoke in program.invokes_in(method) {
            if let Some(log) = self.log.as_mut() {
                if log.handle_new_invoke(&program, invoke) {
                    continue;
                }
            }
            for model in self.models.iter_mut() {
                if model.handle_new_invoke(&program, invoke) {
                    trace!(model = model.name(), invoke = %invoke.id, "reflective call site");
                }
            }
        }
        Ok(())
    }

    fn on_new_cs_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: CSMethod,
    ) -> PtaResult<()> {
        if let Some(log) = self.log.as_mut() {
            log.handle_new_cs_method(solver, method)?;
        }
        for model in self.models.iter_mut() {
            model.handle_new_cs_method(solver, method)?;
        }
        Ok(())
    }

    fn on_new_call_edge(
        &mut self,
        solver: &mut dyn SolverServices,
        edge: &CallEdge,
    ) -> PtaResult<()> {
        let CallKind::Reflective(info) = &edge.kind else {
            return Ok(());
        };
        let caller_ctx = edge.call_site.context;

        if let Some(args) = info.args {
            let args = CSVar::new(caller_ctx, args);
            if self.arg_waitlist.register(args, edge.callee) {
                let arrays = solver.var_points_to(args);
                self.forward_arrays(solver, &arrays, edge.callee);
            }
        }

        let program = solver.program();
        let callee = program.method(edge.callee.method);
        if let Some(result) = program.invoke(edge.call_site.invoke).result {
            if callee.ret.is_reference() {
                for ret in &callee.return_vars {
                    solver.add_pfg_edge(
                        Pointer::Var(CSVar::new(edge.callee.context, *ret)),
                        Pointer::Var(CSVar::new(caller_ctx, result)),
                        FlowKind::Return,
                        None,
                    );
                }
            }
        }
        Ok(())
    }

    fn on_new_points_to_set(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
    ) -> PtaResult<()> {
        let callees = self.arg_waitlist.get(&var).to_vec();
        if !callees.is_empty() {
            trace!(%var, callees = callees.len(), "reflective args waitlist fired");
            let arrays = solver.var_points_to(var);
            for callee in callees {
                self.forward_arrays(solver, &arrays, callee);
            }
        }

        if let Some(log) = self.log.as_mut() {
            if log.is_relevant_var(var.var) {
                log.handle_new_points_to_set(solver, var, delta)?;
            }
        }
        for model in self.models.iter_mut() {
            if model.is_relevant_var(var.var) {
                model.handle_new_points_to_set(solver, var, delta)?;
            }
        }
        Ok(())
    }
}
