//! String-constant inference for class and method lookups
//!
//! `Class.forName("com.acme.Impl")` yields the class meta object of
//! `com.acme.Impl` when the argument points to that string constant and the
//! class exists. Non-constant names resolve to nothing.

use crate::errors::PtaResult;
use crate::features::points_to::domain::{
    CSVar, ContextId, Invoke, InvokeId, JType, PointsToSet, Program, VarId,
};
use crate::features::points_to::ports::SolverServices;
use tracing::{debug, trace};

use super::api::Api;
use super::meta::MetaObjHelper;
use super::{pts_in_context, ReflectionModel, RelevantVars};

#[derive(Debug, Default)]
pub struct StringModel {
    relevant: RelevantVars<Api>,
}

impl StringModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn class_by_name(
        &self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        invoke: InvokeId,
        names: &PointsToSet,
    ) -> PtaResult<()> {
        let program = solver.program();
        let hierarchy = solver.hierarchy();
        let Some(result) = program.invoke(invoke).result else {
            return Ok(());
        };
        for name in names.iter() {
            let Some(class_name) = solver.obj(name.obj).string_value().map(str::to_string) else {
                continue;
            };
            if !hierarchy.has_class(&class_name) {
                trace!(%class_name, "forName of unknown class");
                continue;
            }
            let meta = MetaObjHelper::class_meta(solver, &JType::class(class_name.as_str()))?;
            debug!(invoke = %invoke, %class_name, "class inferred from string constant");
            solver.add_var_points_to(var.context, result, ContextId::EMPTY, meta);
        }
        Ok(())
    }

    fn method_by_name(
        &self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
        invoke: InvokeId,
        api: Api,
    ) -> PtaResult<()> {
        let program = solver.program();
        let hierarchy = solver.hierarchy();
        let call = program.invoke(invoke);
        let (Some(base), Some(name_var), Some(result)) = (call.base, call.args.first(), call.result)
        else {
            return Ok(());
        };
        let classes = if base == var.var && *name_var == var.var {
            solver.var_points_to(var)
        } else {
            pts_in_context(solver, var, delta, base)
        };
        let names = pts_in_context(solver, var, delta, *name_var);

        let public = api == Api::GetMethod;
        for class in classes.iter() {
            let Some(class_name) = MetaObjHelper::class_of(solver.obj(class.obj))
                .and_then(|ty| ty.class_name())
                .map(str::to_string)
            else {
                continue;
            };
            for name in names.iter() {
                let Some(method_name) = solver.obj(name.obj).string_value().map(str::to_string)
                else {
                    continue;
                };
                for method in hierarchy.methods_named(&class_name, &method_name, public, public) {
                    let meta = MetaObjHelper::method_meta(solver, method)?;
                    debug!(
                        invoke = %invoke,
                        method = %program.method(method),
                        "method inferred from string constant"
                    );
                    solver.add_var_points_to(var.context, result, ContextId::EMPTY, meta);
                }
            }
        }
        Ok(())
    }
}

impl ReflectionModel for StringModel {
    fn name(&self) -> &'static str {
        "string-constant"
    }

    fn handle_new_invoke(&mut self, _program: &Program, invoke: &Invoke) -> bool {
        let Some(api) = Api::classify(&invoke.method_ref) else {
            return false;
        };
        match api {
            Api::ForName | Api::LoadClass => match invoke.args.first() {
                Some(name) => {
                    self.relevant.add(*name, invoke.id, api);
                    true
                }
                None => false,
            },
            Api::GetMethod | Api::GetDeclaredMethod => match (invoke.base, invoke.args.first()) {
                (Some(base), Some(name)) => {
                    self.relevant.add(base, invoke.id, api);
                    self.relevant.add(*name, invoke.id, api);
                    true
                }
                _ => false,
            },
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
        for (invoke, api) in self.relevant.uses_of(var.var) {
            match api {
                Api::ForName | Api::LoadClass => self.class_by_name(solver, var, invoke, delta)?,
                _ => self.method_by_name(solver, var, delta, invoke, api)?,
            }
        }
        Ok(())
    }
}
