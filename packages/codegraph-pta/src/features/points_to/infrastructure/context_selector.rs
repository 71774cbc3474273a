//! Context selectors
//!
//! Context abstractions:
//! - **Call-string (k-CFA)**: k most recent call sites
//! - **Object sensitivity**: allocation sites of the receiver chain
//! - **Type sensitivity**: classes containing the receiver allocation sites
//!
//! Static calls have no receiver; object and type sensitivity reuse the
//! caller's context for them. Heap contexts are the allocating method's
//! context truncated to `heap_depth`.
//!
//! # References
//! - Milanova et al. "Parameterized Object Sensitivity" (TOSEM 2005)
//! - Smaragdakis et al. "Pick Your Contexts Well" (POPL 2011)

use crate::config::{ContextStrategy, PtaOptions};
use crate::errors::PtaResult;
use crate::features::points_to::domain::{
    CSCallSite, CSMethod, CSObj, ContextId, MethodId, ObjId, ObjKind,
};
use crate::features::points_to::ports::{ContextSelector, SelectorEnv};

/// Selector driven by a [`ContextStrategy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySelector {
    strategy: ContextStrategy,
    k: usize,
    heap_depth: usize,
}

impl StrategySelector {
    pub fn new(strategy: ContextStrategy, k: usize, heap_depth: usize) -> Self {
        Self {
            strategy,
            k,
            heap_depth,
        }
    }

    pub fn from_options(options: &PtaOptions) -> Self {
        Self::new(options.context, options.k, options.heap_depth)
    }

    /// Context element standing for the type of a receiver object
    fn type_element(env: &SelectorEnv<'_>, obj: ObjId) -> u32 {
        let obj = &env.objs[obj.index()];
        let container = match &obj.kind {
            ObjKind::Alloc { method, .. } => Some(*method),
            _ => obj.container,
        };
        let class_name = match container {
            Some(m) => Some(env.program.method(m).class_name.as_str()),
            None => obj.ty.class_name(),
        };
        class_name
            .and_then(|name| env.program.class_id(name))
            .map(|id| id.0)
            .unwrap_or(u32::MAX)
    }

    fn extend(
        env: &mut SelectorEnv<'_>,
        base: ContextId,
        element: u32,
        limit: usize,
    ) -> PtaResult<ContextId> {
        let context = env.contexts.get(base).push(element, limit);
        env.contexts.intern(context)
    }
}

impl ContextSelector for StrategySelector {
    fn select_context(
        &self,
        env: &mut SelectorEnv<'_>,
        call_site: CSCallSite,
        recv: Option<CSObj>,
        _callee: MethodId,
    ) -> PtaResult<ContextId> {
        match (self.strategy, recv) {
            (ContextStrategy::Insensitive, _) => Ok(ContextId::EMPTY),

            (ContextStrategy::CallSite, _) => {
                Self::extend(env, call_site.context, call_site.invoke.0, self.k)
            }

            (ContextStrategy::Object, Some(recv)) => {
                Self::extend(env, recv.context, recv.obj.0, self.k)
            }

            (ContextStrategy::Type, Some(recv)) => {
                let element = Self::type_element(env, recv.obj);
                Self::extend(env, recv.context, element, self.k)
            }

            (ContextStrategy::Object | ContextStrategy::Type, None) => Ok(call_site.context),
        }
    }

    fn select_heap_context(
        &self,
        env: &mut SelectorEnv<'_>,
        method: CSMethod,
        _obj: ObjId,
    ) -> PtaResult<ContextId> {
        if self.strategy == ContextStrategy::Insensitive || self.heap_depth == 0 {
            return Ok(ContextId::EMPTY);
        }
        let context = env.contexts.get(method.context).truncate(self.heap_depth);
        env.contexts.intern(context)
    }

    fn name(&self) -> &'static str {
        self.strategy.as_str()
    }
}
