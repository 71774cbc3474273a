//! Pointers and pointer-flow edges
//!
//! Pointer kinds of the pointer flow graph (PFG):
//! - Var:           context-qualified local variable
//! - InstanceField: `o.f` for a context-qualified heap object `o`
//! - StaticField:   `C.f`
//! - ArrayIndex:    `o[*]`, one summary location for all elements of `o`
//!
//! An edge `s → t` means `pts(t) ⊇ pts(s)`, optionally restricted to objects
//! whose type is a subtype of the edge's type filter.

use super::cs_element::{CSObj, CSVar};
use super::ir::{FieldId, JType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pointer {
    Var(CSVar),
    InstanceField(CSObj, FieldId),
    StaticField(FieldId),
    ArrayIndex(CSObj),
}

impl Pointer {
    pub fn as_var(&self) -> Option<CSVar> {
        match self {
            Pointer::Var(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<CSVar> for Pointer {
    fn from(var: CSVar) -> Self {
        Pointer::Var(var)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Var(v) => write!(f, "{}", v),
            Pointer::InstanceField(o, field) => write!(f, "{}.{}", o, field),
            Pointer::StaticField(field) => write!(f, "static.{}", field),
            Pointer::ArrayIndex(o) => write!(f, "{}[*]", o),
        }
    }
}

/// Why a pointer-flow edge exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    /// x = y
    LocalAssign,
    /// x = (T) y
    Cast,
    /// x = y.f
    InstanceLoad,
    /// x.f = y
    InstanceStore,
    StaticLoad,
    StaticStore,
    /// x = y[i]
    ArrayLoad,
    /// x[i] = y
    ArrayStore,
    /// actual argument → formal parameter
    ParameterPassing,
    /// callee return variable → call result
    Return,
    Other,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::LocalAssign => "LOCAL_ASSIGN",
            FlowKind::Cast => "CAST",
            FlowKind::InstanceLoad => "INSTANCE_LOAD",
            FlowKind::InstanceStore => "INSTANCE_STORE",
            FlowKind::StaticLoad => "STATIC_LOAD",
            FlowKind::StaticStore => "STATIC_STORE",
            FlowKind::ArrayLoad => "ARRAY_LOAD",
            FlowKind::ArrayStore => "ARRAY_STORE",
            FlowKind::ParameterPassing => "PARAMETER_PASSING",
            FlowKind::Return => "RETURN",
            FlowKind::Other => "OTHER",
        }
    }
}

/// A single edge of the pointer flow graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerFlowEdge {
    pub source: Pointer,
    pub target: Pointer,
    pub kind: FlowKind,
    /// Only objects whose type is a subtype of this pass along the edge
    pub type_filter: Option<JType>,
}

impl PointerFlowEdge {
    #[inline]
    pub fn new(source: Pointer, target: Pointer, kind: FlowKind) -> Self {
        Self {
            source,
            target,
            kind,
            type_filter: None,
        }
    }

    #[inline]
    pub fn with_filter(mut self, filter: Option<JType>) -> Self {
        self.type_filter = filter;
        self
    }
}

impl fmt::Display for PointerFlowEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.source, self.kind.as_str(), self.target)?;
        if let Some(filter) = &self.type_filter {
            write!(f, " [{}]", filter)?;
        }
        Ok(())
    }
}
