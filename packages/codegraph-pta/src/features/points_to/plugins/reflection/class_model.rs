//! `getClass` and constructor lookups on `Class` values

use crate::errors::PtaResult;
use crate::features::points_to::domain::{CSVar, ContextId, Invoke, PointsToSet, Program, VarId};
use crate::features::points_to::ports::SolverServices;
use tracing::debug;

use super::api::Api;
use super::meta::MetaObjHelper;
use super::{ReflectionModel, RelevantVars};

#[derive(Debug, Default)]
pub struct ClassModel {
    relevant: RelevantVars<Api>,
}

impl ClassModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReflectionModel for ClassModel {
    fn name(&self) -> &'static str {
        "class"
    }

    fn handle_new_invoke(&mut self, _program: &Program, invoke: &Invoke) -> bool {
        let Some(api) = Api::classify(&invoke.method_ref) else {
            return false;
        };
        if !matches!(
            api,
            Api::GetClass | Api::GetConstructor | Api::GetDeclaredConstructor
        ) {
            return false;
        }
        match (invoke.base, invoke.result) {
            (Some(base), Some(_)) => {
                self.relevant.add(base, invoke.id, api);
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
        let hierarchy = solver.hierarchy();
        for (invoke, api) in self.relevant.uses_of(var.var) {
            let Some(result) = program.invoke(invoke).result else {
                continue;
            };
            for obj in delta.iter() {
                let metas = match api {
                    Api::GetClass => {
                        let ty = solver.obj(obj.obj).ty.clone();
                        vec![MetaObjHelper::class_meta(solver, &ty)?]
                    }
                    _ => {
                        let Some(class_name) = MetaObjHelper::class_of(solver.obj(obj.obj))
                            .and_then(|ty| ty.class_name())
                            .map(str::to_string)
                        else {
                            continue;
                        };
                        let public_only = api == Api::GetConstructor;
                        hierarchy
                            .constructors(&class_name)
                            .into_iter()
                            .filter(|c| !public_only || program.method(*c).is_public)
                            .map(|c| MetaObjHelper::constructor_meta(solver, c))
                            .collect::<PtaResult<Vec<_>>>()?
                    }
                };
                for meta in metas {
                    debug!(invoke = %invoke, obj = %solver.obj(meta), "class model meta object");
                    solver.add_var_points_to(var.context, result, ContextId::EMPTY, meta);
                }
            }
        }
        Ok(())
    }
}
