//! Test fixture generators
//!
//! Small JVM-shaped programs built with `ProgramBuilder`.

use codegraph_pta::config::{ContextStrategy, PtaOptions};
use codegraph_pta::features::points_to::domain::{
    BootstrapArg, ClassDecl, InvokeDynamic, JType, MethodDecl, MethodHandle, MethodHandleKind,
    MethodId, MethodRef, MethodType, Program, ProgramBuilder,
};
use codegraph_pta::features::points_to::plugins::lambda::metafactory_ref;
use codegraph_pta::features::points_to::{PointerAnalysis, PointerAnalysisResult};

pub const FUNCTION: &str = "java.util.function.Function";
pub const SUPPLIER: &str = "java.util.function.Supplier";
pub const METHOD: &str = "java.lang.reflect.Method";
pub const CONSTRUCTOR: &str = "java.lang.reflect.Constructor";

pub fn obj() -> JType {
    JType::object()
}

pub fn class(name: &str) -> JType {
    JType::class(name)
}

pub fn object_array() -> JType {
    JType::array(JType::object())
}

pub fn mref(class_name: &str, name: &str, params: Vec<JType>, ret: JType) -> MethodRef {
    MethodRef::new(class_name, name, params, ret)
}

/// `java.util.function.Function` with its abstract `apply`
pub fn add_function_iface(b: &mut ProgramBuilder) -> MethodRef {
    b.add_class(ClassDecl::interface(FUNCTION));
    b.add_method(
        MethodDecl::new(FUNCTION, "apply")
            .params(vec![obj()])
            .returns(obj())
            .abstract_method(),
    );
    mref(FUNCTION, "apply", vec![obj()], obj())
}

/// `java.util.function.Supplier` with its abstract `get`
pub fn add_supplier_iface(b: &mut ProgramBuilder) -> MethodRef {
    b.add_class(ClassDecl::interface(SUPPLIER));
    b.add_method(
        MethodDecl::new(SUPPLIER, "get")
            .returns(obj())
            .abstract_method(),
    );
    mref(SUPPLIER, "get", vec![], obj())
}

/// `LambdaMetafactory.metafactory` call site producing `iface` with
/// functional method `sam`, forwarding to `handle`
pub fn lambda_indy(
    iface: &str,
    sam: &MethodRef,
    captured: Vec<JType>,
    kind: MethodHandleKind,
    target: MethodRef,
) -> InvokeDynamic {
    let sam_type = MethodType {
        params: sam.params.clone(),
        ret: sam.ret.clone(),
    };
    InvokeDynamic {
        bootstrap: metafactory_ref(),
        method_name: sam.name.clone(),
        method_type: MethodType {
            params: captured,
            ret: JType::class(iface),
        },
        bootstrap_args: vec![
            BootstrapArg::MethodType(sam_type.clone()),
            BootstrapArg::MethodHandle(MethodHandle {
                kind,
                method_ref: target,
            }),
            BootstrapArg::MethodType(sam_type),
        ],
    }
}

/// Reflection classes whose methods the reflective APIs are called on
pub fn add_reflection_classes(b: &mut ProgramBuilder) {
    b.add_class(ClassDecl::new("java.lang.Class"));
    b.add_class(ClassDecl::new("java.lang.ClassLoader"));
    b.add_class(ClassDecl::new(METHOD));
    b.add_class(ClassDecl::new(CONSTRUCTOR));
}

pub fn method_invoke_ref() -> MethodRef {
    mref(METHOD, "invoke", vec![obj(), object_array()], obj())
}

pub fn for_name_ref() -> MethodRef {
    mref("java.lang.Class", "forName", vec![JType::string()], class("java.lang.Class"))
}

pub fn class_new_instance_ref() -> MethodRef {
    mref("java.lang.Class", "newInstance", vec![], obj())
}

pub fn get_method_ref() -> MethodRef {
    mref(
        "java.lang.Class",
        "getMethod",
        vec![JType::string(), JType::array(class("java.lang.Class"))],
        class(METHOD),
    )
}

pub fn options() -> PtaOptions {
    PtaOptions::default()
}

pub fn insensitive_options() -> PtaOptions {
    PtaOptions::default().context(ContextStrategy::Insensitive, 0)
}

pub fn run(program: Program, options: PtaOptions, entries: &[MethodId]) -> PointerAnalysisResult {
    PointerAnalysis::new(options)
        .expect("valid options")
        .analyze_from(program, entries)
        .expect("analysis reaches a fixpoint")
}
