//! Custom assertions for test verification

use codegraph_pta::features::points_to::domain::{
    CallEdge, CallKind, FlowKind, InvokeId, MethodId, Pointer, PointerFlowEdge, VarId,
};
use codegraph_pta::features::points_to::PointerAnalysisResult;

pub fn edges_of_kind<'a>(
    result: &'a PointerAnalysisResult,
    kind: &'static str,
) -> Vec<&'a CallEdge> {
    result
        .call_edges()
        .filter(|e| e.kind.as_str() == kind)
        .collect()
}

pub fn lambda_edges(result: &PointerAnalysisResult) -> Vec<&CallEdge> {
    edges_of_kind(result, "LAMBDA")
}

pub fn reflective_edges(result: &PointerAnalysisResult) -> Vec<&CallEdge> {
    edges_of_kind(result, "REFLECTIVE")
}

/// Callees of `invoke` reached through edges matching `pred`, sorted
pub fn callees_where(
    result: &PointerAnalysisResult,
    invoke: InvokeId,
    pred: impl Fn(&CallKind) -> bool,
) -> Vec<MethodId> {
    let mut callees: Vec<MethodId> = result
        .call_edges()
        .filter(|e| e.call_site.invoke == invoke && pred(&e.kind))
        .map(|e| e.callee.method)
        .collect();
    callees.sort_unstable();
    callees.dedup();
    callees
}

/// PFG edges of `kind` between the two variables, under any contexts
pub fn var_flow_edges(
    result: &PointerAnalysisResult,
    source: VarId,
    target: VarId,
    kind: FlowKind,
) -> Vec<PointerFlowEdge> {
    result
        .state()
        .pfg()
        .edges()
        .filter(|e| {
            e.kind == kind
                && matches!(e.source, Pointer::Var(v) if v.var == source)
                && matches!(e.target, Pointer::Var(v) if v.var == target)
        })
        .cloned()
        .collect()
}

/// PFG edges flowing into `target` from array-element locations
pub fn array_flow_edges_into(result: &PointerAnalysisResult, target: VarId) -> Vec<PointerFlowEdge> {
    result
        .state()
        .pfg()
        .edges()
        .filter(|e| {
            matches!(e.source, Pointer::ArrayIndex(_))
                && matches!(e.target, Pointer::Var(v) if v.var == target)
        })
        .cloned()
        .collect()
}

pub fn assert_points_to_count(result: &PointerAnalysisResult, var: VarId, expected: usize) {
    let objs = result.points_to(var);
    assert_eq!(
        objs.len(),
        expected,
        "Expected {expected} objects for {var}, got {:?}",
        objs.iter().map(|o| result.obj(*o).to_string()).collect::<Vec<_>>()
    );
}
