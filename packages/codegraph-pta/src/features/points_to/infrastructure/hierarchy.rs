//! Class hierarchy over a built [`Program`]
//!
//! Classes missing from the program (library code that was not loaded) are
//! treated as leaves: dispatch through them fails and they are subtypes of
//! `java.lang.Object` only.

use crate::features::points_to::domain::ir::{CLONEABLE, OBJECT, SERIALIZABLE};
use crate::features::points_to::domain::{JType, MethodId, MethodRef, Program};
use crate::features::points_to::ports::ClassHierarchy;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct ProgramHierarchy {
    program: Arc<Program>,
}

impl ProgramHierarchy {
    pub fn new(program: Arc<Program>) -> Self {
        Self { program }
    }

    /// `class_name` followed by its superclasses, nearest first
    fn superclass_chain<'a>(&'a self, class_name: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(class_name);
        while let Some(name) = current {
            if !seen.insert(name) {
                break;
            }
            chain.push(name);
            current = self
                .program
                .class_named(name)
                .and_then(|c| c.super_class.as_deref());
        }
        chain
    }

    fn declared_method(&self, class_name: &str, key: &str) -> Option<MethodId> {
        let class = self.program.class_named(class_name)?;
        class
            .methods
            .iter()
            .copied()
            .find(|m| self.program.method(*m).dispatch_key() == key)
    }

    /// Superinterfaces reachable from the classes of `chain`, breadth-first
    fn interfaces_of(&self, chain: &[&str]) -> Vec<String> {
        let mut queue: VecDeque<String> = VecDeque::new();
        for name in chain {
            if let Some(class) = self.program.class_named(name) {
                queue.extend(class.interfaces.iter().cloned());
            }
        }
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        while let Some(iface) = queue.pop_front() {
            if !seen.insert(iface.clone()) {
                continue;
            }
            if let Some(class) = self.program.class_named(&iface) {
                queue.extend(class.interfaces.iter().cloned());
            }
            result.push(iface);
        }
        result
    }

    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        let chain = self.superclass_chain(sub);
        if chain.iter().any(|c| *c == sup) {
            return true;
        }
        self.interfaces_of(&chain).iter().any(|i| i == sup)
    }
}

impl ClassHierarchy for ProgramHierarchy {
    fn dispatch(&self, recv_type: &JType, method_ref: &MethodRef) -> Option<MethodId> {
        let class_name = match recv_type {
            JType::Class(name) => name.as_str(),
            JType::Array(_) => OBJECT,
            _ => return None,
        };
        let key = method_ref.dispatch_key();
        let chain = self.superclass_chain(class_name);

        for name in &chain {
            if let Some(m) = self.declared_method(name, &key) {
                let method = self.program.method(m);
                if method.is_static {
                    continue;
                }
                // An abstract redeclaration hides inherited implementations
                return if method.is_abstract { None } else { Some(m) };
            }
        }

        // Default methods
        self.interfaces_of(&chain)
            .iter()
            .filter_map(|iface| self.declared_method(iface, &key))
            .find(|m| !self.program.method(*m).is_abstract)
    }

    fn resolve_method(&self, method_ref: &MethodRef) -> Option<MethodId> {
        let key = method_ref.dispatch_key();
        if method_ref.is_constructor() {
            return self.declared_method(&method_ref.class_name, &key);
        }
        let chain = self.superclass_chain(&method_ref.class_name);
        chain
            .iter()
            .find_map(|name| self.declared_method(name, &key))
            .or_else(|| {
                self.interfaces_of(&chain)
                    .iter()
                    .find_map(|iface| self.declared_method(iface, &key))
            })
    }

    fn is_subtype(&self, sub: &JType, sup: &JType) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (JType::Null, s) => s.is_reference(),
            (s, JType::Class(name)) if name == OBJECT => s.is_reference(),
            (JType::Array(_), JType::Class(name)) => name == CLONEABLE || name == SERIALIZABLE,
            (JType::Array(a), JType::Array(b)) => {
                if a.is_reference() && b.is_reference() {
                    self.is_subtype(a, b)
                } else {
                    a == b
                }
            }
            (JType::Class(a), JType::Class(b)) => self.is_subclass(a, b),
            _ => false,
        }
    }

    fn constructors(&self, class_name: &str) -> Vec<MethodId> {
        self.program
            .class_named(class_name)
            .map(|class| {
                class
                    .methods
                    .iter()
                    .copied()
                    .filter(|m| self.program.method(*m).is_constructor())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn methods_named(
        &self,
        class_name: &str,
        name: &str,
        public_only: bool,
        inherited: bool,
    ) -> Vec<MethodId> {
        let chain = if inherited {
            self.superclass_chain(class_name)
        } else {
            vec![class_name]
        };
        let mut seen_keys = FxHashSet::default();
        let mut result = Vec::new();
        for class in chain {
            let Some(class) = self.program.class_named(class) else {
                continue;
            };
            for m in &class.methods {
                let method = self.program.method(*m);
                if method.name != name || (public_only && !method.is_public) {
                    continue;
                }
                // Overriding methods shadow the ones further up
                if seen_keys.insert(method.dispatch_key()) {
                    result.push(*m);
                }
            }
        }
        result
    }

    fn has_class(&self, class_name: &str) -> bool {
        self.program.class_id(class_name).is_some()
    }

    fn no_arg_constructor(&self, class_name: &str) -> Option<MethodId> {
        self.constructors(class_name)
            .into_iter()
            .find(|m| self.program.method(*m).param_types.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::points_to::domain::{ClassDecl, MethodDecl, ProgramBuilder};

    struct Fixture {
        hierarchy: ProgramHierarchy,
        a_run: MethodId,
        b_run: MethodId,
        greet_default: MethodId,
    }

    fn fixture() -> Fixture {
        let mut b = ProgramBuilder::new();
        b.add_class(ClassDecl::interface("Greeter"));
        b.add_class(ClassDecl::new("A").implements("Greeter"));
        b.add_class(ClassDecl::new("B").extends("A"));
        b.add_class(ClassDecl::new("C").extends("A").abstract_class());
        let greet_default = b.add_method(MethodDecl::new("Greeter", "greet"));
        let a_run = b.add_method(MethodDecl::new("A", "run"));
        let b_run = b.add_method(MethodDecl::new("B", "run"));
        b.add_method(MethodDecl::new("C", "run").abstract_method());
        b.add_method(MethodDecl::constructor("A"));
        b.add_method(MethodDecl::constructor("A").params(vec![JType::string()]));
        let program = Arc::new(b.build().unwrap());
        Fixture {
            hierarchy: ProgramHierarchy::new(program),
            a_run,
            b_run,
            greet_default,
        }
    }

    fn run_ref(class: &str) -> MethodRef {
        MethodRef::new(class, "run", vec![], JType::Void)
    }

    #[test]
    fn test_dispatch_prefers_override() {
        let f = fixture();
        assert_eq!(f.hierarchy.dispatch(&JType::class("B"), &run_ref("A")), Some(f.b_run));
        assert_eq!(f.hierarchy.dispatch(&JType::class("A"), &run_ref("A")), Some(f.a_run));
    }

    #[test]
    fn test_abstract_redeclaration_is_unresolved() {
        let f = fixture();
        assert_eq!(f.hierarchy.dispatch(&JType::class("C"), &run_ref("A")), None);
    }

    #[test]
    fn test_default_method_dispatch() {
        let f = fixture();
        let greet = MethodRef::new("Greeter", "greet", vec![], JType::Void);
        assert_eq!(f.hierarchy.dispatch(&JType::class("B"), &greet), Some(f.greet_default));
    }

    #[test]
    fn test_unknown_class_dispatch() {
        let f = fixture();
        assert_eq!(f.hierarchy.dispatch(&JType::class("Missing"), &run_ref("A")), None);
        assert!(!f.hierarchy.has_class("Missing"));
    }

    #[test]
    fn test_subtyping() {
        let f = fixture();
        let h = &f.hierarchy;
        assert!(h.is_subtype(&JType::class("B"), &JType::class("Greeter")));
        assert!(h.is_subtype(&JType::class("B"), &JType::object()));
        assert!(!h.is_subtype(&JType::class("A"), &JType::class("B")));
        assert!(h.is_subtype(&JType::array(JType::class("B")), &JType::array(JType::class("A"))));
        assert!(h.is_subtype(&JType::array(JType::int()), &JType::object()));
        assert!(!h.is_subtype(&JType::array(JType::int()), &JType::array(JType::object())));
        assert!(h.is_subtype(&JType::Null, &JType::class("A")));
    }

    #[test]
    fn test_constructors() {
        let f = fixture();
        assert_eq!(f.hierarchy.constructors("A").len(), 2);
        let no_arg = f.hierarchy.no_arg_constructor("A").unwrap();
        assert!(f.hierarchy.program.method(no_arg).param_types.is_empty());
        assert!(f.hierarchy.no_arg_constructor("B").is_none());
    }

    #[test]
    fn test_methods_named_shadowing() {
        let f = fixture();
        assert_eq!(f.hierarchy.methods_named("B", "run", true, true), vec![f.b_run]);
        assert_eq!(f.hierarchy.methods_named("B", "run", true, false), vec![f.b_run]);
        assert!(f.hierarchy.methods_named("B", "greet", true, false).is_empty());
    }
}
