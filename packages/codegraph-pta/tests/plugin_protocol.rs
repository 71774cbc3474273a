//! Plugin event delivery through the solver

mod common;

use codegraph_pta::errors::{PtaError, PtaResult};
use codegraph_pta::features::points_to::domain::{
    CSMethod, CSVar, CallEdge, ClassDecl, InvokeKind, MethodDecl, MethodId, PointsToSet,
    Program, ProgramBuilder, Stmt, VarId,
};
use codegraph_pta::features::points_to::{PointerAnalysis, Plugin, SolverServices};
use common::*;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Start(&'static str),
    Finish(&'static str),
    NewMethod(&'static str, MethodId),
    NewCsMethod(&'static str, CSMethod),
    NewCallEdge(&'static str),
    NewPointsTo(&'static str, CSVar, usize),
}

type Log = Arc<Mutex<Vec<Event>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn boxed(name: &'static str, log: &Log) -> Box<dyn Plugin> {
        Box::new(Self {
            name,
            log: Arc::clone(log),
        })
    }

    fn push(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl Plugin for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_start(&mut self, _solver: &mut dyn SolverServices) -> PtaResult<()> {
        self.push(Event::Start(self.name));
        Ok(())
    }

    fn on_finish(&mut self, _solver: &mut dyn SolverServices) -> PtaResult<()> {
        self.push(Event::Finish(self.name));
        Ok(())
    }

    fn on_new_method(
        &mut self,
        _solver: &mut dyn SolverServices,
        method: MethodId,
    ) -> PtaResult<()> {
        self.push(Event::NewMethod(self.name, method));
        Ok(())
    }

    fn on_new_cs_method(
        &mut self,
        _solver: &mut dyn SolverServices,
        method: CSMethod,
    ) -> PtaResult<()> {
        self.push(Event::NewCsMethod(self.name, method));
        Ok(())
    }

    fn on_new_call_edge(
        &mut self,
        _solver: &mut dyn SolverServices,
        _edge: &CallEdge,
    ) -> PtaResult<()> {
        self.push(Event::NewCallEdge(self.name));
        Ok(())
    }

    fn on_new_points_to_set(
        &mut self,
        _solver: &mut dyn SolverServices,
        var: CSVar,
        delta: &PointsToSet,
    ) -> PtaResult<()> {
        self.push(Event::NewPointsTo(self.name, var, delta.len()));
        Ok(())
    }
}

struct FailOnCsMethod;

impl Plugin for FailOnCsMethod {
    fn name(&self) -> &'static str {
        "fail"
    }

    fn on_new_cs_method(
        &mut self,
        _solver: &mut dyn SolverServices,
        _method: CSMethod,
    ) -> PtaResult<()> {
        Err(PtaError::Program("plugin refused method".into()))
    }
}

struct Ids {
    main: MethodId,
    make: MethodId,
    r1: VarId,
    r2: VarId,
}

/// `main` calls the static factory `Util.make()` from two call sites
fn factory_program() -> (Program, Ids) {
    let mut b = ProgramBuilder::new();
    b.add_class(ClassDecl::new("Util"));
    let make = b.add_method(MethodDecl::new("Util", "make").static_method().returns(obj()));
    let o = b.new_var(make, "o", obj());
    b.push_stmt(make, Stmt::New { lhs: o, ty: obj() });
    b.push_stmt(make, Stmt::Return(Some(o)));

    b.add_class(ClassDecl::new("Main"));
    let main = b.add_method(MethodDecl::new("Main", "main").static_method());
    let r1 = b.new_var(main, "r1", obj());
    let r2 = b.new_var(main, "r2", obj());
    let make_ref = mref("Util", "make", vec![], obj());
    b.add_invoke(main, InvokeKind::Static, make_ref.clone(), None, vec![], Some(r1));
    b.add_invoke(main, InvokeKind::Static, make_ref, None, vec![], Some(r2));
    (b.build().unwrap(), Ids { main, make, r1, r2 })
}

fn events_of(log: &Log, name: &str) -> Vec<Event> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| match e {
            Event::Start(n)
            | Event::Finish(n)
            | Event::NewMethod(n, _)
            | Event::NewCsMethod(n, _)
            | Event::NewCallEdge(n)
            | Event::NewPointsTo(n, _, _) => *n == name,
        })
        .cloned()
        .collect()
}

#[test]
fn test_lifecycle_and_method_events() {
    let (program, ids) = factory_program();
    let log = Log::default();
    let analysis = PointerAnalysis::new(options().lambda(false).reflection(false))
        .unwrap()
        .with_plugin(Recorder::boxed("rec", &log));
    let result = analysis.analyze_from(program, &[ids.main]).unwrap();

    let events = events_of(&log, "rec");
    assert_eq!(events.first(), Some(&Event::Start("rec")));
    assert_eq!(events.last(), Some(&Event::Finish("rec")));

    // One new-method event per method, one cs-method event per call-site context
    let new_methods: Vec<MethodId> = events
        .iter()
        .filter_map(|e| match e {
            Event::NewMethod(_, m) => Some(*m),
            _ => None,
        })
        .collect();
    assert_eq!(new_methods, vec![ids.main, ids.make]);
    let make_contexts = events
        .iter()
        .filter(|e| matches!(e, Event::NewCsMethod(_, m) if m.method == ids.make))
        .count();
    assert_eq!(make_contexts, 2);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Event::NewCallEdge(_)))
            .count(),
        result.call_graph().edges().len()
    );
    assert_eq!(result.call_graph().edges().len(), 2);
}

#[test]
fn test_deltas_hold_only_new_objects() {
    let (program, ids) = factory_program();
    let log = Log::default();
    let result = PointerAnalysis::new(insensitive_options())
        .unwrap()
        .with_plugin(Recorder::boxed("rec", &log))
        .analyze_from(program, &[ids.main])
        .unwrap();

    for var in [ids.r1, ids.r2] {
        let delivered: usize = events_of(&log, "rec")
            .iter()
            .filter_map(|e| match e {
                Event::NewPointsTo(_, v, n) if v.var == var => Some(*n),
                _ => None,
            })
            .sum();
        assert_eq!(delivered, result.points_to(var).len());
        assert_eq!(delivered, 1);
    }
}

#[test]
fn test_plugins_notified_in_registration_order() {
    let (program, ids) = factory_program();
    let log = Log::default();
    PointerAnalysis::new(options())
        .unwrap()
        .with_plugin(Recorder::boxed("first", &log))
        .with_plugin(Recorder::boxed("second", &log))
        .analyze_from(program, &[ids.main])
        .unwrap();

    let events = log.lock().unwrap().clone();
    assert_eq!(events.len() % 2, 0);
    for pair in events.chunks(2) {
        match (&pair[0], &pair[1]) {
            (Event::Start(a), Event::Start(b)) | (Event::Finish(a), Event::Finish(b)) => {
                assert_eq!((*a, *b), ("first", "second"));
            }
            (Event::NewMethod(a, m1), Event::NewMethod(b, m2)) => {
                assert_eq!((*a, *b), ("first", "second"));
                assert_eq!(m1, m2);
            }
            (Event::NewCsMethod(a, m1), Event::NewCsMethod(b, m2)) => {
                assert_eq!((*a, *b), ("first", "second"));
                assert_eq!(m1, m2);
            }
            (Event::NewCallEdge(a), Event::NewCallEdge(b)) => {
                assert_eq!((*a, *b), ("first", "second"));
            }
            (Event::NewPointsTo(a, v1, n1), Event::NewPointsTo(b, v2, n2)) => {
                assert_eq!((*a, *b), ("first", "second"));
                assert_eq!((v1, n1), (v2, n2));
            }
            other => panic!("events out of step: {other:?}"),
        }
    }
}

#[test]
fn test_plugin_error_aborts_run() {
    let (program, ids) = factory_program();
    let log = Log::default();
    let err = PointerAnalysis::new(options())
        .unwrap()
        .with_plugin(Box::new(FailOnCsMethod))
        .with_plugin(Recorder::boxed("rec", &log))
        .analyze_from(program, &[ids.main])
        .err()
        .unwrap();

    assert!(matches!(err, PtaError::Program(ref msg) if msg == "plugin refused method"));
    // The failing plugin runs first, so the recorder never sees a cs-method event
    let events = events_of(&log, "rec");
    assert!(!events.iter().any(|e| matches!(e, Event::NewCsMethod(..))));
    assert!(!events.iter().any(|e| matches!(e, Event::Finish(_))));
}
