//! Allocation-site heap model
//!
//! Objects are interned by value: the same allocation site, constant or mock
//! request always yields the same [`ObjId`].

use crate::errors::{next_index, PtaResult};
use crate::features::points_to::domain::ir::CLASS;
use crate::features::points_to::domain::{JType, MethodId, MockObj, Obj, ObjId, ObjKind};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct HeapModel {
    objs: Vec<Obj>,
    index: FxHashMap<Obj, ObjId>,
}

impl HeapModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, obj: Obj) -> PtaResult<ObjId> {
        if let Some(id) = self.index.get(&obj) {
            return Ok(*id);
        }
        let id = ObjId(next_index(self.objs.len(), "heap objects")?);
        self.index.insert(obj.clone(), id);
        self.objs.push(obj);
        Ok(id)
    }

    /// `new ty` at statement `stmt` of `method`
    pub fn alloc_obj(&mut self, method: MethodId, stmt: u32, ty: JType) -> PtaResult<ObjId> {
        self.intern(Obj {
            kind: ObjKind::Alloc { method, stmt },
            ty,
            container: Some(method),
        })
    }

    pub fn string_constant(&mut self, value: &str) -> PtaResult<ObjId> {
        self.intern(Obj {
            kind: ObjKind::StringConstant(value.to_string()),
            ty: JType::string(),
            container: None,
        })
    }

    /// `ty.class`
    pub fn class_constant(&mut self, ty: JType) -> PtaResult<ObjId> {
        self.intern(Obj {
            kind: ObjKind::ClassConstant(ty),
            ty: JType::class(CLASS),
            container: None,
        })
    }

    pub fn mock(&mut self, mock: MockObj) -> PtaResult<ObjId> {
        self.intern(mock.into())
    }

    #[inline]
    pub fn get(&self, id: ObjId) -> &Obj {
        &self.objs[id.index()]
    }

    pub fn objects(&self) -> &[Obj] {
        &self.objs
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}
