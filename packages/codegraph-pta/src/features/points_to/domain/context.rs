//! Calling contexts
//!
//! A context is a k-limited sequence of context elements (call sites,
//! allocation sites or types, depending on the selector). Contexts are
//! interned into [`ContextId`]s so context-sensitive handles stay `Copy`.

use crate::errors::{next_index, PtaResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call context representation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    elements: Vec<u32>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_element(element: u32) -> Self {
        Self {
            elements: vec![element],
        }
    }

    /// Append an element, keeping only the last `limit` elements (k-limiting)
    pub fn push(&self, element: u32, limit: usize) -> Self {
        let mut elements = self.elements.clone();
        elements.push(element);
        if elements.len() > limit {
            let excess = elements.len() - limit;
            elements.drain(..excess);
        }
        Self { elements }
    }

    /// Keep only the last `limit` elements
    pub fn truncate(&self, limit: usize) -> Self {
        let skip = self.elements.len().saturating_sub(limit);
        Self {
            elements: self.elements[skip..].to_vec(),
        }
    }

    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[u32] {
        &self.elements
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "]")
    }
}

/// Interned context handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u32);

impl ContextId {
    /// The empty context is always interned first
    pub const EMPTY: ContextId = ContextId(0);
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// Context interner, owned by the solver for one analysis run
#[derive(Debug)]
pub struct ContextTable {
    contexts: Vec<Context>,
    index: FxHashMap<Context, ContextId>,
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTable {
    pub fn new() -> Self {
        let mut index = FxHashMap::default();
        index.insert(Context::empty(), ContextId::EMPTY);
        Self {
            contexts: vec![Context::empty()],
            index,
        }
    }

    pub fn intern(&mut self, context: Context) -> PtaResult<ContextId> {
        if let Some(id) = self.index.get(&context) {
            return Ok(*id);
        }
        let id = ContextId(next_index(self.contexts.len(), "contexts")?);
        self.index.insert(context.clone(), id);
        self.contexts.push(context);
        Ok(id)
    }

    pub fn get(&self, id: ContextId) -> &Context {
        &self.contexts[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
