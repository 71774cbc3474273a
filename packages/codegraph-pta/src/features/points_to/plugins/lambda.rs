//! Lambda and method-reference call edges
//!
//! An `invokedynamic` bootstrapped by `LambdaMetafactory` produces a
//! functional-interface object whose single abstract method forwards to the
//! method handle in the bootstrap arguments. The solver sees calls on such an
//! object as unresolved (interfaces have no concrete target), and this plugin
//! supplies the edge:
//!
//! ```text
//! Function<A, R> f = a::m;        // indy, captured = [a]
//! R r = f.apply(x);               // unresolved → LAMBDA edge to A.m (or an override)
//! ```
//!
//! Edge wiring depends on how captured values and actual arguments line up
//! with the target's receiver and parameters; see [`LambdaShift`].

use crate::errors::{PtaError, PtaResult};
use crate::features::points_to::domain::{
    AllocSite, CSCallSite, CSMethod, CSObj, CSVar, CallEdge, CallKind, ContextId, FlowKind,
    InvokeId, JType, LambdaCallInfo, MethodHandleKind, MethodId, MethodRef, MockDesc, MockObj,
    ObjId, Pointer, PointsToSet, Program,
};
use crate::features::points_to::ports::{Plugin, SolverServices};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::waitlist::Waitlist;
use super::MockObjTable;

pub const LAMBDA_METAFACTORY: &str = "<java.lang.invoke.LambdaMetafactory: java.lang.invoke.CallSite metafactory(java.lang.invoke.MethodHandles$Lookup,java.lang.String,java.lang.invoke.MethodType,java.lang.invoke.MethodType,java.lang.invoke.MethodHandle,java.lang.invoke.MethodType)>";

pub const LAMBDA_ALTMETAFACTORY: &str = "<java.lang.invoke.LambdaMetafactory: java.lang.invoke.CallSite altMetafactory(java.lang.invoke.MethodHandles$Lookup,java.lang.String,java.lang.invoke.MethodType,java.lang.Object[])>";

/// Bootstrap argument holding the implementation method handle
const IMPL_HANDLE_INDEX: usize = 1;

/// `LambdaMetafactory.metafactory` as a method reference
pub fn metafactory_ref() -> MethodRef {
    let invoke = |name: &str| JType::class(format!("java.lang.invoke.{}", name));
    MethodRef::new(
        "java.lang.invoke.LambdaMetafactory",
        "metafactory",
        vec![
            invoke("MethodHandles$Lookup"),
            JType::string(),
            invoke("MethodType"),
            invoke("MethodType"),
            invoke("MethodHandle"),
            invoke("MethodType"),
        ],
        invoke("CallSite"),
    )
}

pub fn is_lambda_metafactory(bootstrap: &MethodRef) -> bool {
    let signature = bootstrap.signature();
    signature == LAMBDA_METAFACTORY || signature == LAMBDA_ALTMETAFACTORY
}

/// Alignment of captured values and actual arguments with target parameters
///
/// With `c` captured values, for an instance target that is not a
/// constructor:
/// - `c > 0`: the first captured value is the receiver (`shift_k = 1`)
/// - `c == 0`: the first actual argument is the receiver (`shift_n = 1`)
///
/// Static targets and constructors take no receiver from either list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LambdaShift {
    pub captured: usize,
    pub shift_k: usize,
    pub shift_n: usize,
}

impl LambdaShift {
    pub fn compute(captured: usize, is_static: bool, is_constructor: bool) -> Self {
        let (shift_k, shift_n) = if is_static || is_constructor {
            (0, 0)
        } else if captured > 0 {
            (1, 0)
        } else {
            (0, 1)
        };
        Self {
            captured,
            shift_k,
            shift_n,
        }
    }

    /// Parameter index receiving captured value `i`; `None` for the receiver
    pub fn captured_param(&self, i: usize) -> Option<usize> {
        i.checked_sub(self.shift_k)
    }

    /// Parameter index receiving actual argument `i`; `None` for the receiver
    pub fn actual_param(&self, i: usize) -> Option<usize> {
        (self.captured + i).checked_sub(self.shift_k + self.shift_n)
    }

    #[inline]
    pub fn captured_receiver(&self) -> bool {
        self.shift_k == 1
    }

    #[inline]
    pub fn actual_receiver(&self) -> bool {
        self.shift_n == 1
    }
}

/// Instance-method handle waiting on its receiver variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingLambdaCall {
    call_site: CSCallSite,
    kind: MethodHandleKind,
    target: MethodRef,
    info: LambdaCallInfo,
}

#[derive(Debug)]
pub struct LambdaPlugin {
    /// Lambda objects created by indy sites of each method
    lambda_objs: FxHashMap<MethodId, Vec<(InvokeId, ObjId)>>,
    constructed: MockObjTable,
    pending: Waitlist<CSVar, PendingLambdaCall>,
}

impl Default for LambdaPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl LambdaPlugin {
    pub fn new() -> Self {
        Self {
            lambda_objs: FxHashMap::default(),
            constructed: MockObjTable::new(MockDesc::LambdaConstructedObj),
            pending: Waitlist::new(),
        }
    }

    fn resolve_pending(
        solver: &mut dyn SolverServices,
        record: &PendingLambdaCall,
        receivers: &PointsToSet,
    ) -> PtaResult<()> {
        let program = solver.program();
        let hierarchy = solver.hierarchy();
        for recv in receivers.iter() {
            let target = match record.kind {
                MethodHandleKind::InvokeSpecial => hierarchy.resolve_method(&record.target),
                _ => hierarchy.dispatch(&solver.obj(recv.obj).ty, &record.target),
            };
            let Some(target) = target.filter(|m| !program.method(*m).is_abstract) else {
                trace!(%recv, target = %record.target, "lambda receiver has no target");
                continue;
            };
            let callee_ctx = solver.select_context(record.call_site, Some(recv), target)?;
            let edge = CallEdge::new(
                record.call_site,
                CSMethod::new(callee_ctx, target),
                CallKind::Lambda(record.info.clone()),
            );
            debug!(%edge, "lambda instance-method edge");
            solver.add_call_edge(edge);
        }
        Ok(())
    }

    fn handle_constructor_ref(
        &mut self,
        solver: &mut dyn SolverServices,
        program: &Program,
        indy: InvokeId,
        call_site: CSCallSite,
        target: &MethodRef,
        info: LambdaCallInfo,
    ) -> PtaResult<()> {
        let Some(ctor) = solver.hierarchy().resolve_method(target) else {
            debug!(target = %target, "constructor reference to unknown class");
            return Ok(());
        };
        let ctx = call_site.context;
        let ty = JType::class(target.class_name.clone());
        let container = program.invoke(indy).container;
        let obj = self.constructed.get_or_create(
            solver,
            AllocSite::Invoke(indy),
            ty,
            Some(container),
        )?;
        if let Some(result) = program.invoke(call_site.invoke).result {
            solver.add_var_points_to(ctx, result, ctx, obj);
        }
        let new_obj = CSObj::new(ctx, obj);
        let callee_ctx = solver.select_context(call_site, Some(new_obj), ctor)?;
        if let Some(this) = program.method(ctor).this {
            solver.add_var_points_to(callee_ctx, this, ctx, obj);
        }
        let edge = CallEdge::new(
            call_site,
            CSMethod::new(callee_ctx, ctor),
            CallKind::Lambda(info),
        );
        debug!(%edge, "lambda constructor edge");
        solver.add_call_edge(edge);
        Ok(())
    }
}

impl Plugin for LambdaPlugin {
    fn name(&self) -> &'static str {
        "lambda"
    }

    fn on_new_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: MethodId,
    ) -> PtaResult<()> {
        let program = solver.program();
        for invoke in program.invokes_in(method) {
            let Some(indy) = &invoke.dynamic else {
                continue;
            };
            if !is_lambda_metafactory(&indy.bootstrap) {
                continue;
            }
            let obj = solver.add_mock_obj(MockObj::new(
                MockDesc::LambdaObj,
                AllocSite::Invoke(invoke.id),
                indy.method_type.ret.clone(),
                Some(method),
            ))?;
            debug!(invoke = %invoke.id, ty = %indy.method_type.ret, "lambda object");
            self.lambda_objs.entry(method).or_default().push((invoke.id, obj));
        }
        Ok(())
    }

    fn on_new_cs_method(
        &mut self,
        solver: &mut dyn SolverServices,
        method: CSMethod,
    ) -> PtaResult<()> {
        let Some(objs) = self.lambda_objs.get(&method.method) else {
            return Ok(());
        };
        let program = solver.program();
        for (invoke, obj) in objs {
            if let Some(result) = program.invoke(*invoke).result {
                solver.add_var_points_to(method.context, result, method.context, *obj);
            }
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
        let lambda = solver.obj(recv.obj);
        if !lambda.is_mock(MockDesc::LambdaObj) {
            return Ok(());
        }
        let Some(AllocSite::Invoke(indy_id)) = lambda.alloc_site().cloned() else {
            return Ok(());
        };

        let program = solver.program();
        let indy_invoke = program.invoke(indy_id);
        let call = program.invoke(invoke);
        let Some(indy) = &indy_invoke.dynamic else {
            return Ok(());
        };
        // Only the functional method forwards to the implementation
        if call.method_ref.name != indy.method_name {
            return Ok(());
        }
        let Some(handle) = indy.method_handle(IMPL_HANDLE_INDEX) else {
            return Ok(());
        };

        let call_site = CSCallSite::new(context, invoke);
        let info = LambdaCallInfo {
            captured: indy_invoke.args.clone(),
            lambda_context: recv.context,
            invoke_result: call.result,
        };

        match handle.kind {
            MethodHandleKind::NewInvokeSpecial => {
                self.handle_constructor_ref(
                    solver,
                    &program,
                    indy_id,
                    call_site,
                    &handle.method_ref,
                    info,
                )?;
            }
            MethodHandleKind::InvokeVirtual
            | MethodHandleKind::InvokeInterface
            | MethodHandleKind::InvokeSpecial => {
                let receiver = match (indy_invoke.args.first(), call.args.first()) {
                    (Some(captured), _) => CSVar::new(recv.context, *captured),
                    (None, Some(actual)) => CSVar::new(context, *actual),
                    (None, None) => {
                        debug!(
                            target = %handle.method_ref,
                            "instance method reference without receiver"
                        );
                        return Ok(());
                    }
                };
                let record = PendingLambdaCall {
                    call_site,
                    kind: handle.kind,
                    target: handle.method_ref.clone(),
                    info,
                };
                if self.pending.register(receiver, record.clone()) {
                    let receivers = solver.var_points_to(receiver);
                    Self::resolve_pending(solver, &record, &receivers)?;
                }
            }
            MethodHandleKind::InvokeStatic => {
                let Some(target) = solver.hierarchy().resolve_method(&handle.method_ref) else {
                    debug!(
                        target = %handle.method_ref,
                        "static method reference to unknown method"
                    );
                    return Ok(());
                };
                let callee_ctx = solver.select_context(call_site, None, target)?;
                let edge = CallEdge::new(
                    call_site,
                    CSMethod::new(callee_ctx, target),
                    CallKind::Lambda(info),
                );
                debug!(%edge, "lambda static edge");
                solver.add_call_edge(edge);
            }
            kind => {
                return Err(PtaError::UnsupportedMethodHandle {
                    kind,
                    target: handle.method_ref.signature(),
                });
            }
        }
        Ok(())
    }

    fn on_new_points_to_set(
        &mut self,
        solver: &mut dyn SolverServices,
        var: CSVar,
        _delta: &PointsToSet,
    ) -> PtaResult<()> {
        let records = self.pending.get(&var);
        if records.is_empty() {
            return Ok(());
        }
        trace!(%var, records = records.len(), "lambda waitlist fired");
        let receivers = solver.var_points_to(var);
        for record in records {
            Self::resolve_pending(solver, record, &receivers)?;
        }
        Ok(())
    }

    fn on_new_call_edge(
        &mut self,
        solver: &mut dyn SolverServices,
        edge: &CallEdge,
    ) -> PtaResult<()> {
        let CallKind::Lambda(info) = &edge.kind else {
            return Ok(());
        };
        let program = solver.program();
        let call = program.invoke(edge.call_site.invoke);
        let target = program.method(edge.callee.method);
        let caller_ctx = edge.call_site.context;
        let callee_ctx = edge.callee.context;
        let shift = LambdaShift::compute(
            info.captured.len(),
            target.is_static,
            target.is_constructor(),
        );
        let param = |i: usize| Pointer::Var(CSVar::new(callee_ctx, target.params[i]));

        for (i, captured) in info.captured.iter().enumerate() {
            if let Some(p) = shift.captured_param(i).filter(|p| *p < target.params.len()) {
                solver.add_pfg_edge(
                    Pointer::Var(CSVar::new(info.lambda_context, *captured)),
                    param(p),
                    FlowKind::ParameterPassing,
                    None,
                );
            }
        }
        for (i, actual) in call.args.iter().enumerate() {
            let Some(p) = shift.actual_param(i) else {
                continue;
            };
            if p >= target.params.len() {
                break;
            }
            solver.add_pfg_edge(
                Pointer::Var(CSVar::new(caller_ctx, *actual)),
                param(p),
                FlowKind::ParameterPassing,
                None,
            );
        }

        if let Some(this) = target.this {
            let this = Pointer::Var(CSVar::new(callee_ctx, this));
            let receiver = if shift.captured_receiver() {
                info.captured.first().map(|v| CSVar::new(info.lambda_context, *v))
            } else if shift.actual_receiver() {
                call.args.first().map(|v| CSVar::new(caller_ctx, *v))
            } else {
                None
            };
            if let Some(receiver) = receiver {
                solver.add_pfg_edge(Pointer::Var(receiver), this, FlowKind::LocalAssign, None);
            }
        }

        if let Some(result) = info.invoke_result {
            let result = Pointer::Var(CSVar::new(caller_ctx, result));
            for ret in &target.return_vars {
                solver.add_pfg_edge(
                    Pointer::Var(CSVar::new(callee_ctx, *ret)),
                    result,
                    FlowKind::Return,
                    None,
                );
            }
        }
        Ok(())
    }
}
