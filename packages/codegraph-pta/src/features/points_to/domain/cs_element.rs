//! Context-sensitive elements
//!
//! Each handle is a `(ContextId, raw id)` pair. Because contexts are
//! interned, two handles built from equal contexts and equal elements compare
//! equal and hash identically.

use super::context::ContextId;
use super::heap::ObjId;
use super::ir::{InvokeId, MethodId, VarId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contextualized variable: (context, variable) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CSVar {
    pub context: ContextId,
    pub var: VarId,
}

impl CSVar {
    #[inline]
    pub fn new(context: ContextId, var: VarId) -> Self {
        Self { context, var }
    }
}

/// Heap object with its heap context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CSObj {
    pub context: ContextId,
    pub obj: ObjId,
}

impl CSObj {
    #[inline]
    pub fn new(context: ContextId, obj: ObjId) -> Self {
        Self { context, obj }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CSMethod {
    pub context: ContextId,
    pub method: MethodId,
}

impl CSMethod {
    #[inline]
    pub fn new(context: ContextId, method: MethodId) -> Self {
        Self { context, method }
    }
}

/// Call site under the caller's context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CSCallSite {
    pub context: ContextId,
    pub invoke: InvokeId,
}

impl CSCallSite {
    #[inline]
    pub fn new(context: ContextId, invoke: InvokeId) -> Self {
        Self { context, invoke }
    }
}

macro_rules! cs_display {
    ($ty:ident, $field:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.context, self.$field)
            }
        }
    };
}

cs_display!(CSVar, var);
cs_display!(CSObj, obj);
cs_display!(CSMethod, method);
cs_display!(CSCallSite, invoke);
