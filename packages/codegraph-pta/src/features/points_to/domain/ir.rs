//! Program IR consumed by the points-to analysis
//!
//! JVM-level facts the solver and its plugins read:
//! - Typed variables, fields and methods
//! - Statements relevant to pointer flow (allocation, copy, field/array access)
//! - Call sites, including `invokedynamic` bootstrap data

use serde::{Deserialize, Serialize};
use std::fmt;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const CLONEABLE: &str = "java.lang.Cloneable";
pub const SERIALIZABLE: &str = "java.io.Serializable";
pub const CONSTRUCTOR_NAME: &str = "<init>";

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Variable handle (index into `Program::vars`)
    VarId,
    "v"
);
id_type!(
    /// Method handle (index into `Program::methods`)
    MethodId,
    "m"
);
id_type!(
    /// Call site handle (index into `Program::invokes`)
    InvokeId,
    "i"
);
id_type!(
    /// Field handle (index into `Program::fields`)
    FieldId,
    "f"
);
id_type!(
    /// Class handle (index into `Program::classes`)
    ClassId,
    "c"
);

/// JVM primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

/// Static type of a variable, field, parameter or heap object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JType {
    Void,
    Primitive(PrimitiveType),
    Class(String),
    Array(Box<JType>),
    /// Type of the `null` literal
    Null,
}

impl JType {
    #[inline]
    pub fn class(name: impl Into<String>) -> Self {
        JType::Class(name.into())
    }

    #[inline]
    pub fn array(element: JType) -> Self {
        JType::Array(Box::new(element))
    }

    #[inline]
    pub fn object() -> Self {
        JType::class(OBJECT)
    }

    #[inline]
    pub fn string() -> Self {
        JType::class(STRING)
    }

    #[inline]
    pub fn int() -> Self {
        JType::Primitive(PrimitiveType::Int)
    }

    /// Reference and array types are the only ones inside the points-to domain
    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, JType::Class(_) | JType::Array(_) | JType::Null)
    }

    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(self, JType::Primitive(_))
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            JType::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&JType> {
        match self {
            JType::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JType::Void => write!(f, "void"),
            JType::Primitive(p) => write!(f, "{}", p.as_str()),
            JType::Class(name) => write!(f, "{}", name),
            JType::Array(elem) => write!(f, "{}[]", elem),
            JType::Null => write!(f, "null"),
        }
    }
}

/// Unbound reference to a method: declaring class plus subsignature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class_name: String,
    pub name: String,
    pub params: Vec<JType>,
    pub ret: JType,
}

impl MethodRef {
    pub fn new(
        class_name: impl Into<String>,
        name: impl Into<String>,
        params: Vec<JType>,
        ret: JType,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            params,
            ret,
        }
    }

    /// `ret name(p1,p2)`
    pub fn subsignature(&self) -> String {
        format!("{} {}({})", self.ret, self.name, join_types(&self.params))
    }

    /// `<class: ret name(p1,p2)>`
    pub fn signature(&self) -> String {
        format!("<{}: {}>", self.class_name, self.subsignature())
    }

    /// Key used for dispatch: name and parameter types, return type excluded
    pub fn dispatch_key(&self) -> String {
        format!("{}({})", self.name, join_types(&self.params))
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

fn join_types(types: &[JType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Local variable (or parameter / `this`) of a method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    pub id: VarId,
    pub name: String,
    pub ty: JType,
    pub method: MethodId,
    /// Statements using this variable as a base, filled in by the builder
    #[serde(skip)]
    pub uses: VarUses,
}

/// Statements that must be revisited when a base variable's points-to set grows
#[derive(Debug, Clone, Default)]
pub struct VarUses {
    /// `lhs = this.f`
    pub load_fields: Vec<(VarId, FieldId)>,
    /// `this.f = rhs`
    pub store_fields: Vec<(FieldId, VarId)>,
    /// `lhs = this[*]`
    pub load_arrays: Vec<VarId>,
    /// `this[*] = rhs`
    pub store_arrays: Vec<VarId>,
    /// instance calls with this variable as receiver
    pub invokes: Vec<InvokeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub class_name: String,
    pub name: String,
    pub ty: JType,
    pub is_static: bool,
}

/// Constant values that produce heap objects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Str(String),
    /// `Foo.class`
    Class(JType),
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    New { lhs: VarId, ty: JType },
    Copy { lhs: VarId, rhs: VarId },
    Cast { lhs: VarId, rhs: VarId, ty: JType },
    AssignLiteral { lhs: VarId, literal: Literal },
    LoadField { lhs: VarId, base: VarId, field: FieldId },
    StoreField { base: VarId, field: FieldId, rhs: VarId },
    LoadStatic { lhs: VarId, field: FieldId },
    StoreStatic { field: FieldId, rhs: VarId },
    LoadArray { lhs: VarId, base: VarId },
    StoreArray { base: VarId, rhs: VarId },
    Invoke(InvokeId),
    Return(Option<VarId>),
}

/// Static call-site kind (the bytecode instruction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Static,
    Virtual,
    Interface,
    Special,
    Dynamic,
}

/// Dispatch kind of a constant-pool method handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodHandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl fmt::Display for MethodHandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MethodHandleKind::GetField => "REF_getField",
            MethodHandleKind::GetStatic => "REF_getStatic",
            MethodHandleKind::PutField => "REF_putField",
            MethodHandleKind::PutStatic => "REF_putStatic",
            MethodHandleKind::InvokeVirtual => "REF_invokeVirtual",
            MethodHandleKind::InvokeStatic => "REF_invokeStatic",
            MethodHandleKind::InvokeSpecial => "REF_invokeSpecial",
            MethodHandleKind::NewInvokeSpecial => "REF_newInvokeSpecial",
            MethodHandleKind::InvokeInterface => "REF_invokeInterface",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodHandle {
    pub kind: MethodHandleKind,
    pub method_ref: MethodRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodType {
    pub params: Vec<JType>,
    pub ret: JType,
}

/// Static bootstrap argument of an `invokedynamic`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BootstrapArg {
    MethodType(MethodType),
    MethodHandle(MethodHandle),
    Str(String),
    Int(i64),
    Class(JType),
}

/// `invokedynamic` payload; the invoke's `args` are the captured values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvokeDynamic {
    pub bootstrap: MethodRef,
    pub method_name: String,
    pub method_type: MethodType,
    pub bootstrap_args: Vec<BootstrapArg>,
}

impl InvokeDynamic {
    /// Method handle at bootstrap argument `index`, if that argument is one
    pub fn method_handle(&self, index: usize) -> Option<&MethodHandle> {
        match self.bootstrap_args.get(index) {
            Some(BootstrapArg::MethodHandle(mh)) => Some(mh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoke {
    pub id: InvokeId,
    pub container: MethodId,
    pub kind: InvokeKind,
    pub method_ref: MethodRef,
    pub base: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
    pub line: Option<u32>,
    pub dynamic: Option<InvokeDynamic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub class_name: String,
    pub name: String,
    pub param_types: Vec<JType>,
    pub ret: JType,
    pub params: Vec<VarId>,
    pub this: Option<VarId>,
    pub return_vars: Vec<VarId>,
    pub stmts: Vec<Stmt>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_public: bool,
}

impl Method {
    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn method_ref(&self) -> MethodRef {
        MethodRef::new(
            self.class_name.clone(),
            self.name.clone(),
            self.param_types.clone(),
            self.ret.clone(),
        )
    }

    pub fn signature(&self) -> String {
        self.method_ref().signature()
    }

    pub fn dispatch_key(&self) -> String {
        format!("{}({})", self.name, join_types(&self.param_types))
    }

    pub fn declaring_type(&self) -> JType {
        JType::class(self.class_name.clone())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
}
