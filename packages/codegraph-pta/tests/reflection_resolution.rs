//! Reflective call edges: string-constant inference, meta-object actions
//! and log-driven resolution

mod common;

use codegraph_pta::config::ConfigError;
use codegraph_pta::errors::PtaError;
use codegraph_pta::features::points_to::domain::{
    CallKind, ClassDecl, InvokeId, InvokeKind, JType, Literal, MethodDecl, MethodId, MethodRef,
    MockDesc, Program, ProgramBuilder, ReflectiveApi, Stmt, VarId,
};
use codegraph_pta::features::points_to::PointerAnalysis;
use common::*;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn is_reflective(kind: &CallKind) -> bool {
    matches!(kind, CallKind::Reflective(_))
}

fn get_class_ref() -> MethodRef {
    mref("java.lang.Object", "getClass", vec![], class("java.lang.Class"))
}

fn get_constructor_ref() -> MethodRef {
    mref(
        "java.lang.Class",
        "getConstructor",
        vec![JType::array(class("java.lang.Class"))],
        class(CONSTRUCTOR),
    )
}

fn constructor_new_instance_ref() -> MethodRef {
    mref(CONSTRUCTOR, "newInstance", vec![object_array()], obj())
}

#[test]
fn test_method_invoke_decouples_argument_array() {
    init_tracing();
    // T.class.getMethod("run").invoke(t, new Object[]{ e, s })
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("T"));
    let run_m = b.add_method(
        MethodDecl::new("T", "run").params(vec![obj(), JType::int(), JType::string()]),
    );
    let (p0, p1, p2) = (
        b.param(run_m, 0).unwrap(),
        b.param(run_m, 1).unwrap(),
        b.param(run_m, 2).unwrap(),
    );
    let run_this = b.this_var(run_m).unwrap();

    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let t = b.new_var(main, "t", class("T"));
    let c = b.new_var(main, "c", class("java.lang.Class"));
    let name = b.new_var(main, "name", JType::string());
    let types = b.new_var(main, "types", JType::array(class("java.lang.Class")));
    let m = b.new_var(main, "m", class(METHOD));
    let arr = b.new_var(main, "arr", object_array());
    let e = b.new_var(main, "e", obj());
    let s = b.new_var(main, "s", JType::string());
    b.push_stmt(main, Stmt::New { lhs: t, ty: class("T") });
    b.push_stmt(
        main,
        Stmt::AssignLiteral {
            lhs: c,
            literal: Literal::Class(class("T")),
        },
    );
    b.push_stmt(
        main,
        Stmt::AssignLiteral {
            lhs: name,
            literal: Literal::Str("run".into()),
        },
    );
    b.add_invoke(main, InvokeKind::Virtual, get_method_ref(), Some(c), vec![name, types], Some(m));
    b.push_stmt(main, Stmt::New { lhs: arr, ty: object_array() });
    b.push_stmt(main, Stmt::New { lhs: e, ty: obj() });
    b.push_stmt(main, Stmt::New { lhs: s, ty: JType::string() });
    b.push_stmt(main, Stmt::StoreArray { base: arr, rhs: e });
    b.push_stmt(main, Stmt::StoreArray { base: arr, rhs: s });
    let call = b.add_invoke(
        main,
        InvokeKind::Virtual,
        method_invoke_ref(),
        Some(m),
        vec![t, arr],
        None,
    );
    let program = b.build().unwrap();

    let options = options().reflection_inference("string-constant");
    let result = run(program, options, &[main]);

    assert_eq!(callees_where(&result, call, is_reflective), vec![run_m]);
    let edge = reflective_edges(&result)[0];
    let CallKind::Reflective(info) = &edge.kind else {
        unreachable!()
    };
    assert_eq!(info.api, ReflectiveApi::MethodInvoke);
    assert_eq!(info.args, Some(arr));

    assert_eq!(array_flow_edges_into(&result, p0).len(), 1);
    assert!(array_flow_edges_into(&result, p1).is_empty());
    assert_eq!(array_flow_edges_into(&result, p2).len(), 1);
    // The String parameter only admits the String element
    assert_points_to_count(&result, p0, 2);
    assert_points_to_count(&result, p2, 1);
    assert_eq!(result.points_to(p2), result.points_to(s));
    assert_eq!(result.points_to(run_this), result.points_to(t));
}

fn for_name_program() -> (Program, Ids) {
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("com.acme.Impl"));
    let ctor = b.add_method(MethodDecl::constructor("com.acme.Impl"));
    let ctor_this = b.this_var(ctor).unwrap();

    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let name = b.new_var(main, "name", JType::string());
    let c = b.new_var(main, "c", class("java.lang.Class"));
    let o = b.new_var(main, "o", obj());
    b.push_stmt(
        main,
        Stmt::AssignLiteral {
            lhs: name,
            literal: Literal::Str("com.acme.Impl".into()),
        },
    );
    b.add_invoke(main, InvokeKind::Static, for_name_ref(), None, vec![name], Some(c));
    let call = b.add_invoke(
        main,
        InvokeKind::Virtual,
        class_new_instance_ref(),
        Some(c),
        vec![],
        Some(o),
    );
    let program = b.build().unwrap();
    (
        program,
        Ids {
            main,
            ctor,
            ctor_this,
            c,
            o,
            call,
        },
    )
}

struct Ids {
    main: MethodId,
    ctor: MethodId,
    ctor_this: VarId,
    c: VarId,
    o: VarId,
    call: InvokeId,
}

#[test]
fn test_for_name_from_string_constant() {
    let (program, ids) = for_name_program();
    let options = options().reflection_inference("string-constant");
    let result = run(program, options, &[ids.main]);

    let metas = result.points_to(ids.c);
    assert_eq!(metas.len(), 1);
    assert!(result.obj(metas[0]).is_mock(MockDesc::ClassMetaObj));

    let created = result.points_to(ids.o);
    assert_eq!(created.len(), 1);
    let obj = result.obj(created[0]);
    assert!(obj.is_mock(MockDesc::ReflectiveObj));
    assert_eq!(obj.ty, class("com.acme.Impl"));

    assert_eq!(callees_where(&result, ids.call, is_reflective), vec![ids.ctor]);
    assert!(result.is_reachable(ids.ctor));
    assert_eq!(result.points_to(ids.ctor_this), created);
}

#[test]
fn test_for_name_without_inference_resolves_nothing() {
    let (program, ids) = for_name_program();
    let result = run(program, options(), &[ids.main]);

    assert!(result.points_to(ids.c).is_empty());
    assert!(result.points_to(ids.o).is_empty());
    assert!(reflective_edges(&result).is_empty());
    assert!(!result.is_reachable(ids.ctor));
}

#[test]
fn test_for_name_of_unknown_class_is_dropped() {
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let name = b.new_var(main, "name", JType::string());
    let c = b.new_var(main, "c", class("java.lang.Class"));
    b.push_stmt(
        main,
        Stmt::AssignLiteral {
            lhs: name,
            literal: Literal::Str("com.acme.Missing".into()),
        },
    );
    b.add_invoke(main, InvokeKind::Static, for_name_ref(), None, vec![name], Some(c));
    let program = b.build().unwrap();

    let options = options().reflection_inference("string-constant");
    let result = run(program, options, &[main]);
    assert!(result.points_to(c).is_empty());
}

#[test]
fn test_class_literal_new_instance() {
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("Widget"));
    let ctor = b.add_method(MethodDecl::constructor("Widget"));
    // Only the no-arg constructor backs Class.newInstance
    let other = b.add_method(MethodDecl::constructor("Widget").params(vec![obj()]));

    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let c = b.new_var(main, "c", class("java.lang.Class"));
    let o = b.new_var(main, "o", obj());
    b.push_stmt(
        main,
        Stmt::AssignLiteral {
            lhs: c,
            literal: Literal::Class(class("Widget")),
        },
    );
    let call = b.add_invoke(
        main,
        InvokeKind::Virtual,
        class_new_instance_ref(),
        Some(c),
        vec![],
        Some(o),
    );
    let program = b.build().unwrap();

    let result = run(program, options(), &[main]);

    assert_eq!(callees_where(&result, call, is_reflective), vec![ctor]);
    assert!(!result.is_reachable(other));
    assert_points_to_count(&result, o, 1);
}

#[test]
fn test_get_class_then_constructor_new_instance() {
    // x.getClass().getConstructor(types).newInstance(new Object[]{ e })
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("Impl"));
    let no_arg = b.add_method(MethodDecl::constructor("Impl"));
    let one_arg = b.add_method(MethodDecl::constructor("Impl").params(vec![obj()]));
    let one_arg_p0 = b.param(one_arg, 0).unwrap();

    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let x = b.new_var(main, "x", class("Impl"));
    let k = b.new_var(main, "k", class("java.lang.Class"));
    let types = b.new_var(main, "types", JType::array(class("java.lang.Class")));
    let ctor = b.new_var(main, "ctor", class(CONSTRUCTOR));
    let arr = b.new_var(main, "arr", object_array());
    let e = b.new_var(main, "e", obj());
    let y = b.new_var(main, "y", obj());
    b.push_stmt(main, Stmt::New { lhs: x, ty: class("Impl") });
    b.add_invoke(main, InvokeKind::Virtual, get_class_ref(), Some(x), vec![], Some(k));
    b.add_invoke(
        main,
        InvokeKind::Virtual,
        get_constructor_ref(),
        Some(k),
        vec![types],
        Some(ctor),
    );
    b.push_stmt(main, Stmt::New { lhs: arr, ty: object_array() });
    b.push_stmt(main, Stmt::New { lhs: e, ty: obj() });
    b.push_stmt(main, Stmt::StoreArray { base: arr, rhs: e });
    let call = b.add_invoke(
        main,
        InvokeKind::Virtual,
        constructor_new_instance_ref(),
        Some(ctor),
        vec![arr],
        Some(y),
    );
    let program = b.build().unwrap();

    let result = run(program, options(), &[main]);

    let mut expected = vec![no_arg, one_arg];
    expected.sort_unstable();
    assert_eq!(callees_where(&result, call, is_reflective), expected);
    assert_points_to_count(&result, ctor, 2);
    // One mock object per call site and type, shared by both constructors
    let created = result.points_to(y);
    assert_eq!(created.len(), 1);
    assert!(result.obj(created[0]).is_mock(MockDesc::ReflectiveObj));
    assert_eq!(result.points_to(one_arg_p0), result.points_to(e));
}

#[test]
fn test_log_driven_resolution() {
    init_tracing();
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("com.acme.Plugin"));
    let plugin_run = b.add_method(
        MethodDecl::new("com.acme.Plugin", "run")
            .params(vec![obj()])
            .returns(obj()),
    );
    let run_p0 = b.param(plugin_run, 0).unwrap();
    b.push_stmt(plugin_run, Stmt::Return(Some(run_p0)));
    let run_this = b.this_var(plugin_run).unwrap();

    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let n = b.new_var(main, "n", JType::string());
    let c = b.new_var(main, "c", class("java.lang.Class"));
    let m = b.new_var(main, "m", class(METHOD));
    let p = b.new_var(main, "p", class("com.acme.Plugin"));
    let arr = b.new_var(main, "arr", object_array());
    let e = b.new_var(main, "e", obj());
    let r = b.new_var(main, "r", obj());
    let for_name = b.add_invoke(main, InvokeKind::Static, for_name_ref(), None, vec![n], Some(c));
    b.set_line(for_name, 10);
    b.push_stmt(main, Stmt::New { lhs: p, ty: class("com.acme.Plugin") });
    b.push_stmt(main, Stmt::New { lhs: arr, ty: object_array() });
    b.push_stmt(main, Stmt::New { lhs: e, ty: obj() });
    b.push_stmt(main, Stmt::StoreArray { base: arr, rhs: e });
    let call = b.add_invoke(
        main,
        InvokeKind::Virtual,
        method_invoke_ref(),
        Some(m),
        vec![p, arr],
        Some(r),
    );
    b.set_line(call, 12);
    let program = b.build().unwrap();

    let mut log = NamedTempFile::new().unwrap();
    write!(
        log,
        "# api;target;caller;line\n\
         Class.forName;com.acme.Plugin;<Main: void main()>;10\n\
         Class.forName;com.acme.Missing;<Main: void main()>;11\n\
         Method.invoke;<com.acme.Plugin: java.lang.Object run(java.lang.Object)>;<Main: void main()>;12\n"
    )
    .unwrap();

    let options = options().reflection_log(log.path());
    let result = run(program, options, &[main]);

    let metas = result.points_to(c);
    assert_eq!(metas.len(), 1);
    assert!(result.obj(metas[0]).is_mock(MockDesc::ClassMetaObj));

    assert_eq!(callees_where(&result, call, is_reflective), vec![plugin_run]);
    assert_eq!(result.points_to(run_this), result.points_to(p));
    assert_eq!(result.points_to(r), result.points_to(e));
}

#[test]
fn test_log_line_mismatch_leaves_call_unresolved() {
    let mut b = ProgramBuilder::new();
    add_reflection_classes(&mut b);
    b.add_class(ClassDecl::new("com.acme.Plugin"));
    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let n = b.new_var(main, "n", JType::string());
    let c = b.new_var(main, "c", class("java.lang.Class"));
    let for_name = b.add_invoke(main, InvokeKind::Static, for_name_ref(), None, vec![n], Some(c));
    b.set_line(for_name, 3);
    let program = b.build().unwrap();

    let mut log = NamedTempFile::new().unwrap();
    writeln!(log, "Class.forName;com.acme.Plugin;<Main: void main()>;4").unwrap();

    let result = run(program, options().reflection_log(log.path()), &[main]);
    assert!(result.points_to(c).is_empty());
}

#[test]
fn test_malformed_log_fails_analysis() {
    let mut b = ProgramBuilder::new();
    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let program = b.build().unwrap();

    let mut log = NamedTempFile::new().unwrap();
    writeln!(log, "Class.forName;com.acme.Plugin").unwrap();

    let err = PointerAnalysis::new(options().reflection_log(log.path()))
        .unwrap()
        .analyze_from(program, &[main])
        .err()
        .unwrap();
    assert!(matches!(err, PtaError::ReflectionLog { line: 1, .. }));
}

#[test]
fn test_unknown_inference_rejected_eagerly() {
    let err = PointerAnalysis::new(options().reflection_inference("string-constants"))
        .err()
        .unwrap();
    match err {
        PtaError::Config(ConfigError::UnknownReflectionInference { value, suggestion }) => {
            assert_eq!(value, "string-constants");
            assert!(suggestion.contains("string-constant"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_log_and_string_inference_conflict() {
    let err = PointerAnalysis::new(
        options()
            .reflection_log("reflection.log")
            .reflection_inference("string-constant"),
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        PtaError::Config(ConfigError::ConflictingReflectionModels { .. })
    ));
}

#[test]
fn test_reflection_disabled() {
    let (program, ids) = for_name_program();
    let options = options()
        .reflection(false)
        .reflection_inference("string-constant");
    let result = run(program, options, &[ids.main]);
    assert!(result.points_to(ids.c).is_empty());
    assert!(reflective_edges(&result).is_empty());
}
