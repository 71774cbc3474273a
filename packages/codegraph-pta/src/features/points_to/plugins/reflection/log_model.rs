//! Reflection resolved from an execution log
//!
//! Each log line records one observed reflective call:
//!
//! ```text
//! # api;target;caller;line
//! Class.forName;com.acme.Impl;<com.acme.Main: void main(java.lang.String[])>;12
//! Method.invoke;<com.acme.Impl: void run()>;<com.acme.Main: void main(java.lang.String[])>;14
//! ```
//!
//! `target` is a class name for `Class.forName` / `Class.newInstance` and a
//! method signature for `Constructor.newInstance` / `Method.invoke`. The line
//! column may be left empty to match every call of that API in the caller.

use crate::errors::{PtaError, PtaResult};
use crate::features::points_to::domain::{
    CSCallSite, CSMethod, CSVar, ContextId, Invoke, InvokeId, JType, MethodId, MockDesc,
    PointsToSet, Program, ReflectiveApi, ReflectiveCallInfo, VarId,
};
use crate::features::points_to::ports::SolverServices;
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::api::Api;
use super::meta::MetaObjHelper;
use super::{invoke_method, new_instance, ReflectionModel, RelevantVars};
use crate::features::points_to::plugins::MockObjTable;

/// One parsed log line, before resolution against the program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub api: Api,
    pub target: String,
    pub caller: String,
    pub line: Option<u32>,
}

impl LogEntry {
    /// `None` for blank and comment lines
    pub fn parse(line_no: usize, raw: &str) -> PtaResult<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return Ok(None);
        }
        let fields: Vec<&str> = raw.split(';').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(PtaError::reflection_log(
                line_no,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        }
        let api = Api::from_log_name(fields[0]).ok_or_else(|| {
            PtaError::reflection_log(line_no, format!("unknown reflective API '{}'", fields[0]))
        })?;
        if fields[1].is_empty() || fields[2].is_empty() {
            return Err(PtaError::reflection_log(line_no, "empty target or caller"));
        }
        let line = match fields[3] {
            "" | "-1" => None,
            n => Some(n.parse::<u32>().map_err(|_| {
                PtaError::reflection_log(line_no, format!("invalid line number '{}'", n))
            })?),
        };
        Ok(Some(Self {
            api,
            target: fields[1].to_string(),
            caller: fields[2].to_string(),
            line,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Class(JType),
    Method(MethodId),
}

#[derive(Debug, Clone)]
struct ResolvedEntry {
    api: Api,
    target: LogTarget,
    line: Option<u32>,
}

#[derive(Debug)]
pub struct LogModel {
    /// Entries per caller method
    entries: FxHashMap<MethodId, Vec<ResolvedEntry>>,
    /// Claimed call sites per caller method
    claimed: FxHashMap<MethodId, Vec<(InvokeId, Api, LogTarget)>>,
    /// `Method.invoke` receivers waiting for objects
    receivers: RelevantVars<MethodId>,
    objs: MockObjTable,
}

impl LogModel {
    pub fn from_file(path: impl AsRef<Path>, program: &Program) -> PtaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let model = Self::from_log_str(&content, program)?;
        info!(path = %path.display(), entries = model.len(), "reflection log loaded");
        Ok(model)
    }

    pub fn from_log_str(content: &str, program: &Program) -> PtaResult<Self> {
        let mut model = Self {
            entries: FxHashMap::default(),
            claimed: FxHashMap::default(),
            receivers: RelevantVars::default(),
            objs: MockObjTable::new(MockDesc::ReflectiveObj),
        };
        for (i, raw) in content.lines().enumerate() {
            let Some(entry) = LogEntry::parse(i + 1, raw)? else {
                continue;
            };
            let Some(caller) = program.method_by_signature(&entry.caller) else {
                warn!(
                    line = i + 1,
                    caller = %entry.caller,
                    "reflection log: unknown caller, skipped"
                );
                continue;
            };
            let Some(target) = Self::resolve_target(program, &entry) else {
                warn!(
                    line = i + 1,
                    target = %entry.target,
                    "reflection log: unknown target, skipped"
                );
                continue;
            };
            model.entries.entry(caller).or_default().push(ResolvedEntry {
                api: entry.api,
                target,
                line: entry.line,
            });
        }
        Ok(model)
    }

    fn resolve_target(program: &Program, entry: &LogEntry) -> Option<LogTarget> {
        match entry.api {
            Api::ForName | Api::ClassNewInstance => program
                .class_named(&entry.target)
                .map(|c| LogTarget::Class(JType::class(c.name.as_str()))),
            _ => program.method_by_signature(&entry.target).map(LogTarget::Method),
        }
    }

    /// Number of resolved entries
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve(
        &mut self,
        solver: &mut dyn SolverServices,
        method: CSMethod,
        invoke: &Invoke,
        api: Api,
        target: &LogTarget,
    ) -> PtaResult<()> {
        let site = CSCallSite::new(method.context, invoke.id);
        let hierarchy = solver.hierarchy();
        match (api, target) {
            (Api::ForName, LogTarget::Class(ty)) => {
                if let Some(result) = invoke.result {
                    let meta = MetaObjHelper::class_meta(solver, ty)?;
                    solver.add_var_points_to(method.context, result, ContextId::EMPTY, meta);
                }
            }
            (Api::ClassNewInstance, LogTarget::Class(ty)) => {
                let ctor = ty.class_name().and_then(|c| hierarchy.no_arg_constructor(c));
                let info = ReflectiveCallInfo {
                    api: ReflectiveApi::ClassNewInstance,
                    args: None,
                };
                new_instance(solver, &mut self.objs, site, ty.clone(), ctor, info)?;
            }
            (Api::ConstructorNewInstance, LogTarget::Method(ctor)) => {
                let ty = solver.program().method(*ctor).declaring_type();
                let info = ReflectiveCallInfo {
                    api: ReflectiveApi::ConstructorNewInstance,
                    args: invoke.args.first().copied(),
                };
                new_instance(solver, &mut self.objs, site, ty, Some(*ctor), info)?;
            }
            (Api::MethodInvoke, LogTarget::Method(target)) => {
                let receivers = match invoke.args.first() {
                    Some(recv) => {
                        self.receivers.add(*recv, invoke.id, *target);
                        solver.var_points_to(CSVar::new(method.context, *recv))
                    }
                    None => PointsToSet::new(),
                };
                invoke_method(solver, site, *target, &receivers, invoke.args.get(1).copied())?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl ReflectionModel for LogModel {
    fn name(&self) -> &'static str {
        "log"
    }

    fn handle_new_invoke(&mut self, _program: &Program, invoke: &Invoke) -> bool {
        let Some(api) = Api::classify(&invoke.method_ref) else {
            return false;
        };
        let Some(entries) = self.entries.get(&invoke.container) else {
            return false;
        };
        let matching: Vec<_> = entries
            .iter()
            .filter(|e| e.api == api && (e.line.is_none() || e.line == invoke.line))
            .map(|e| (invoke.id, api, e.target.clone()))
            .collect();
        if matching.is_empty() {
            return false;
        }
        debug!(
            invoke = %invoke.id,
            targets = matching.len(),
            "call site covered by reflection log"
        );
        self.claimed.entry(invoke.container).or_default().extend(matching);
        true
    }

    fn is_relevant_var(&self, var: VarId) -> bool {
        self.receivers.contains(var)
    }

    fn handle_new_points_to_set(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
    ) -> PtaResult<()> {
        let program = solver.program();
        for (invoke, target) in self.receivers.uses_of(var.var) {
            let site = CSCallSite::new(var.context, invoke);
            let args = program.invoke(invoke).args.get(1).copied();
            invoke_method(solver, site, target, delta, args)?;
        }
        Ok(())
    }

    fn handle_new_cs_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: CSMethod,
    ) -> PtaResult<()> {
        let Some(claimed) = self.claimed.get(&method.method).cloned() else {
            return Ok(());
        };
        let program = solver.program();
        for (invoke, api, target) in &claimed {
            self.resolve(solver, method, program.invoke(*invoke), *api, target)?;
        }
        Ok(())
    }
}
