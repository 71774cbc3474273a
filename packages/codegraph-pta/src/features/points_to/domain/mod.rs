//! Domain models for Points-to Analysis
//!
//! Core abstractions independent of the solver:
//! - ir / program: the analyzed program
//! - context / cs_element: interned contexts and context-qualified handles
//! - heap: abstract and mock objects
//! - flow / points_to_set: pointer flow graph vocabulary
//! - call_edge: call-graph edges with plugin payloads

pub mod call_edge;
pub mod context;
pub mod cs_element;
pub mod flow;
pub mod heap;
pub mod ir;
pub mod points_to_set;
pub mod program;

pub use call_edge::{CallEdge, CallKind, LambdaCallInfo, ReflectiveApi, ReflectiveCallInfo};
pub use context::{Context, ContextId, ContextTable};
pub use cs_element::{CSCallSite, CSMethod, CSObj, CSVar};
pub use flow::{FlowKind, Pointer, PointerFlowEdge};
pub use heap::{AllocSite, MockDesc, MockObj, Obj, ObjId, ObjKind};
pub use ir::{
    BootstrapArg, Class, ClassId, Field, FieldId, Invoke, InvokeDynamic, InvokeId, InvokeKind,
    JType, Literal, Method, MethodHandle, MethodHandleKind, MethodId, MethodRef, MethodType,
    PrimitiveType, Stmt, Var, VarId,
};
pub use points_to_set::PointsToSet;
pub use program::{ClassDecl, MethodDecl, Program, ProgramBuilder};
