//! Solver plugins resolving dynamic call edges
//!
//! - [`LambdaPlugin`]: `invokedynamic` lambda metafactory call sites
//! - [`ReflectionPlugin`]: `Class.newInstance`, `Constructor.newInstance`,
//!   `Method.invoke` and the meta-object APIs feeding them
//!
//! Both keep their dedup tables and waitlists for the lifetime of one run.

pub mod lambda;
pub mod reflection;
pub mod waitlist;

pub use lambda::{LambdaPlugin, LambdaShift};
pub use reflection::ReflectionPlugin;
pub use waitlist::Waitlist;

use crate::errors::PtaResult;
use crate::features::points_to::domain::{AllocSite, JType, MethodId, MockDesc, MockObj, ObjId};
use crate::features::points_to::ports::SolverServices;
use rustc_hash::FxHashMap;

/// Per-plugin mock object table: one object per (allocation site, type)
#[derive(Debug)]
pub struct MockObjTable {
    desc: MockDesc,
    objs: FxHashMap<(AllocSite, JType), ObjId>,
}

impl MockObjTable {
    pub fn new(desc: MockDesc) -> Self {
        Self {
            desc,
            objs: FxHashMap::default(),
        }
    }

    pub fn get_or_create(
        &mut self,
        solver: &mut dyn SolverServices,
        alloc: AllocSite,
        ty: JType,
        container: Option<MethodId>,
    ) -> PtaResult<ObjId> {
        let key = (alloc.clone(), ty.clone());
        if let Some(id) = self.objs.get(&key) {
            return Ok(*id);
        }
        let id = solver.add_mock_obj(MockObj::new(self.desc, alloc, ty, container))?;
        self.objs.insert(key, id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}
