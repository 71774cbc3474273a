//! Abstract heap objects
//!
//! Concrete heap addresses are abstracted to allocation sites. Besides
//! ordinary `new` sites the heap holds constant objects (string and class
//! literals) and mock objects synthesized by plugins for allocations that do
//! not appear as `new` in the program text.

use super::ir::{InvokeId, JType, MethodId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for abstract objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub u32);

impl ObjId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// Description tag of a mock object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MockDesc {
    /// Functional object produced by a lambda metafactory call site
    LambdaObj,
    /// Object created through a constructor reference (`Foo::new`)
    LambdaConstructedObj,
    /// Object created by `Class.newInstance` / `Constructor.newInstance`
    ReflectiveObj,
    ClassMetaObj,
    MethodMetaObj,
    ConstructorMetaObj,
}

impl MockDesc {
    pub fn as_str(&self) -> &'static str {
        match self {
            MockDesc::LambdaObj => "LambdaObj",
            MockDesc::LambdaConstructedObj => "LambdaConstructedObj",
            MockDesc::ReflectiveObj => "ReflectiveObj",
            MockDesc::ClassMetaObj => "ClassMetaObj",
            MockDesc::MethodMetaObj => "MethodMetaObj",
            MockDesc::ConstructorMetaObj => "ConstructorMetaObj",
        }
    }
}

/// Where a mock object is "allocated"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocSite {
    Invoke(InvokeId),
    /// Meta object standing for a type (`Class` values)
    Type(JType),
    /// Meta object standing for a method or constructor
    Method(MethodId),
}

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocSite::Invoke(i) => write!(f, "{}", i),
            AllocSite::Type(t) => write!(f, "{}", t),
            AllocSite::Method(m) => write!(f, "{}", m),
        }
    }
}

/// Synthetic heap object request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MockObj {
    pub desc: MockDesc,
    pub alloc: AllocSite,
    pub ty: JType,
    pub container: Option<MethodId>,
}

impl MockObj {
    pub fn new(desc: MockDesc, alloc: AllocSite, ty: JType, container: Option<MethodId>) -> Self {
        Self {
            desc,
            alloc,
            ty,
            container,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjKind {
    /// `new T` at statement `stmt` of `method`
    Alloc { method: MethodId, stmt: u32 },
    StringConstant(String),
    /// `T.class`
    ClassConstant(JType),
    Mock { desc: MockDesc, alloc: AllocSite },
}

/// Abstract representation of a heap object
///
/// Identity is structural: the heap model interns objects, so equal
/// `(kind, ty, container)` triples always map to the same [`ObjId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obj {
    pub kind: ObjKind,
    pub ty: JType,
    pub container: Option<MethodId>,
}

impl Obj {
    pub fn mock_desc(&self) -> Option<MockDesc> {
        match &self.kind {
            ObjKind::Mock { desc, .. } => Some(*desc),
            _ => None,
        }
    }

    #[inline]
    pub fn is_mock(&self, desc: MockDesc) -> bool {
        self.mock_desc() == Some(desc)
    }

    pub fn alloc_site(&self) -> Option<&AllocSite> {
        match &self.kind {
            ObjKind::Mock { alloc, .. } => Some(alloc),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.kind {
            ObjKind::StringConstant(s) => Some(s),
            _ => None,
        }
    }
}

impl From<MockObj> for Obj {
    fn from(mock: MockObj) -> Self {
        Obj {
            kind: ObjKind::Mock {
                desc: mock.desc,
                alloc: mock.alloc,
            },
            ty: mock.ty,
            container: mock.container,
        }
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ObjKind::Alloc { method, stmt } => write!(f, "alloc:{}:{}:{}", method, stmt, self.ty),
            ObjKind::StringConstant(s) => write!(f, "\"{}\"", s),
            ObjKind::ClassConstant(t) => write!(f, "{}.class", t),
            ObjKind::Mock { desc, alloc } => write!(f, "{}:{}:{}", desc.as_str(), alloc, self.ty),
        }
    }
}
