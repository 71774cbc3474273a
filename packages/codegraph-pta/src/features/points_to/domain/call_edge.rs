//! Call-graph edges
//!
//! Ordinary edges come straight from the call instruction. Edges produced by
//! plugins carry the payload their wiring needs in the [`CallKind`] variant,
//! so consumers pattern-match instead of downcasting.

use super::context::ContextId;
use super::cs_element::{CSCallSite, CSMethod};
use super::ir::{InvokeKind, VarId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reflective entry point that produced an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReflectiveApi {
    ClassNewInstance,
    ConstructorNewInstance,
    MethodInvoke,
}

impl ReflectiveApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectiveApi::ClassNewInstance => "Class.newInstance",
            ReflectiveApi::ConstructorNewInstance => "Constructor.newInstance",
            ReflectiveApi::MethodInvoke => "Method.invoke",
        }
    }
}

/// Payload of an edge created for a call on a lambda object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LambdaCallInfo {
    /// Values captured at the `invokedynamic` site, read under `lambda_context`
    pub captured: Vec<VarId>,
    /// Heap context of the lambda object
    pub lambda_context: ContextId,
    /// Result variable of the call on the lambda object
    pub invoke_result: Option<VarId>,
}

/// Payload of an edge created for a reflective call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReflectiveCallInfo {
    pub api: ReflectiveApi,
    /// `Object[]` argument of the reflective call, if any
    pub args: Option<VarId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Virtual,
    Interface,
    Special,
    Lambda(LambdaCallInfo),
    Reflective(ReflectiveCallInfo),
}

impl CallKind {
    /// Edge kind for an ordinary call instruction
    pub fn from_invoke(kind: InvokeKind) -> Option<Self> {
        match kind {
            InvokeKind::Static => Some(CallKind::Static),
            InvokeKind::Virtual => Some(CallKind::Virtual),
            InvokeKind::Interface => Some(CallKind::Interface),
            InvokeKind::Special => Some(CallKind::Special),
            InvokeKind::Dynamic => None,
        }
    }

    /// Ordinary edges get argument and return wiring from the solver itself
    #[inline]
    pub fn is_ordinary(&self) -> bool {
        !matches!(self, CallKind::Lambda(_) | CallKind::Reflective(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Static => "STATIC",
            CallKind::Virtual => "VIRTUAL",
            CallKind::Interface => "INTERFACE",
            CallKind::Special => "SPECIAL",
            CallKind::Lambda(_) => "LAMBDA",
            CallKind::Reflective(_) => "REFLECTIVE",
        }
    }
}

/// Edge from a context-qualified call site to a context-qualified method
///
/// Identity covers the payload: two lambda objects with different captures
/// reaching the same target from the same call site are two edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub call_site: CSCallSite,
    pub callee: CSMethod,
    pub kind: CallKind,
}

impl CallEdge {
    pub fn new(call_site: CSCallSite, callee: CSMethod, kind: CallKind) -> Self {
        Self {
            call_site,
            callee,
            kind,
        }
    }
}

impl fmt::Display for CallEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --{}--> {}",
            self.call_site,
            self.kind.as_str(),
            self.callee
        )
    }
}
