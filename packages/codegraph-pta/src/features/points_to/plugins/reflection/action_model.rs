//! Reflective actions driven by meta objects
//!
//! - `Class.newInstance()`: a mock object of each class reaching the base,
//!   plus an edge to that class's no-arg constructor
//! - `Constructor.newInstance(Object[])`: a mock object of the declaring
//!   class, plus an edge to the constructor carrying the argument array
//! - `Method.invoke(Object, Object[])`: an edge to each method reaching the
//!   base, dispatched on every receiver object for instance methods

use crate::errors::PtaResult;
use crate::features::points_to::domain::{
    CSCallSite, CSVar, Invoke, MockDesc, PointsToSet, Program, ReflectiveApi, ReflectiveCallInfo,
    VarId,
};
use crate::features::points_to::plugins::MockObjTable;
use crate::features::points_to::ports::SolverServices;
use tracing::trace;

use super::api::Api;
use super::meta::MetaObjHelper;
use super::{invoke_method, new_instance, pts_in_context, ReflectionModel, RelevantVars};

#[derive(Debug)]
pub struct ActionModel {
    relevant: RelevantVars<Api>,
    objs: MockObjTable,
}

impl Default for ActionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionModel {
    pub fn new() -> Self {
        Self {
            relevant: RelevantVars::default(),
            objs: MockObjTable::new(MockDesc::ReflectiveObj),
        }
    }

    fn class_new_instance(
        &mut self,
        solver: &mut dyn SolverServices,
        site: CSCallSite,
        metas: &PointsToSet,
    ) -> PtaResult<()> {
        let hierarchy = solver.hierarchy();
        for meta in metas.iter() {
            let Some(ty) = MetaObjHelper::class_of(solver.obj(meta.obj)).cloned() else {
                continue;
            };
            let Some(class_name) = ty.class_name().filter(|c| hierarchy.has_class(c)) else {
                trace!(%ty, "newInstance of unknown class");
                continue;
            };
            let ctor = hierarchy.no_arg_constructor(class_name);
            let info = ReflectiveCallInfo {
                api: ReflectiveApi::ClassNewInstance,
                args: None,
            };
            new_instance(solver, &mut self.objs, site, ty.clone(), ctor, info)?;
        }
        Ok(())
    }

    fn constructor_new_instance(
        &mut self,
        solver: &mut dyn SolverServices,
        site: CSCallSite,
        metas: &PointsToSet,
    ) -> PtaResult<()> {
        let program = solver.program();
        let args = program.invoke(site.invoke).args.first().copied();
        for meta in metas.iter() {
            let Some(ctor) = MetaObjHelper::constructor_of(solver.obj(meta.obj)) else {
                continue;
            };
            let info = ReflectiveCallInfo {
                api: ReflectiveApi::ConstructorNewInstance,
                args,
            };
            let ty = program.method(ctor).declaring_type();
            new_instance(solver, &mut self.objs, site, ty, Some(ctor), info)?;
        }
        Ok(())
    }

    fn method_invoke(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
        call: &Invoke,
    ) -> PtaResult<()> {
        let Some(base) = call.base else {
            return Ok(());
        };
        let site = CSCallSite::new(var.context, call.id);
        let (metas, receivers) = match call.args.first() {
            // Base doubling as receiver: only full sets cover new × old pairs
            Some(recv) if *recv == base => {
                let all = solver.var_points_to(var);
                (all.clone(), all)
            }
            Some(recv) => (
                pts_in_context(solver, var, delta, base),
                pts_in_context(solver, var, delta, *recv),
            ),
            None => (pts_in_context(solver, var, delta, base), PointsToSet::new()),
        };
        for meta in metas.iter() {
            let Some(target) = MetaObjHelper::method_of(solver.obj(meta.obj)) else {
                continue;
            };
            invoke_method(solver, site, target, &receivers, call.args.get(1).copied())?;
        }
        Ok(())
    }
}

impl ReflectionModel for ActionModel {
    fn name(&self) -> &'static str {
        "action"
    }

    fn handle_new_invoke(&mut self, _program: &Program, invoke: &Invoke) -> bool {
        let Some(api) = Api::classify(&invoke.method_ref) else {
            return false;
        };
        let Some(base) = invoke.base else {
            return false;
        };
        match api {
            Api::ClassNewInstance | Api::ConstructorNewInstance => {
                self.relevant.add(base, invoke.id, api);
                true
            }
            Api::MethodInvoke => {
                self.relevant.add(base, invoke.id, api);
                if let Some(recv) = invoke.args.first() {
                    self.relevant.add(*recv, invoke.id, api);
                }
                true
            }
            _ => false,
        }
    }

    fn is_relevant_var(&self, var: VarId) -> bool {
        self.relevant.contains(var)
    }

    fn handle_new_points_to_set(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
    ) -> PtaResult<()> {
        let program = solver.program();
        for (invoke, api) in self.relevant.uses_of(var.var) {
            let call = program.invoke(invoke);
            let site = CSCallSite::new(var.context, invoke);
            match api {
                Api::ClassNewInstance => self.class_new_instance(solver, site, delta)?,
                Api::ConstructorNewInstance => self.constructor_new_instance(solver, site, delta)?,
                _ => self.method_invoke(solver, var, delta, call)?,
            }
        }
        Ok(())
    }
}
