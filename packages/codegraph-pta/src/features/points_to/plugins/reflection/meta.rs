//! Reflective meta objects: `Class`, `Method` and `Constructor` values
//!
//! Meta objects are interned by the heap, so asking twice for the meta object
//! of the same type or method yields the same [`ObjId`]. They always live
//! under the empty heap context.

use crate::errors::PtaResult;
use crate::features::points_to::domain::ir::CLASS;
use crate::features::points_to::domain::{
    AllocSite, JType, MethodId, MockDesc, MockObj, Obj, ObjId, ObjKind,
};
use crate::features::points_to::ports::SolverServices;

const METHOD_CLASS: &str = "java.lang.reflect.Method";
const CONSTRUCTOR_CLASS: &str = "java.lang.reflect.Constructor";

pub struct MetaObjHelper;

impl MetaObjHelper {
    pub fn class_meta(solver: &mut dyn SolverServices, ty: &JType) -> PtaResult<ObjId> {
        solver.add_mock_obj(MockObj::new(
            MockDesc::ClassMetaObj,
            AllocSite::Type(ty.clone()),
            JType::class(CLASS),
            None,
        ))
    }

    pub fn method_meta(solver: &mut dyn SolverServices, method: MethodId) -> PtaResult<ObjId> {
        solver.add_mock_obj(MockObj::new(
            MockDesc::MethodMetaObj,
            AllocSite::Method(method),
            JType::class(METHOD_CLASS),
            None,
        ))
    }

    pub fn constructor_meta(solver: &mut dyn SolverServices, ctor: MethodId) -> PtaResult<ObjId> {
        solver.add_mock_obj(MockObj::new(
            MockDesc::ConstructorMetaObj,
            AllocSite::Method(ctor),
            JType::class(CONSTRUCTOR_CLASS),
            None,
        ))
    }

    /// Type denoted by a `Class` value: a class literal or a class meta object
    pub fn class_of(obj: &Obj) -> Option<&JType> {
        match &obj.kind {
            ObjKind::ClassConstant(ty) => Some(ty),
            ObjKind::Mock {
                desc: MockDesc::ClassMetaObj,
                alloc: AllocSite::Type(ty),
            } => Some(ty),
            _ => None,
        }
    }

    pub fn method_of(obj: &Obj) -> Option<MethodId> {
        match &obj.kind {
            ObjKind::Mock {
                desc: MockDesc::MethodMetaObj,
                alloc: AllocSite::Method(m),
            } => Some(*m),
            _ => None,
        }
    }

    pub fn constructor_of(obj: &Obj) -> Option<MethodId> {
        match &obj.kind {
            ObjKind::Mock {
                desc: MockDesc::ConstructorMetaObj,
                alloc: AllocSite::Method(m),
            } => Some(*m),
            _ => None,
        }
    }
}
