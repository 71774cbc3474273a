//! Whole-program IR container and its builder
//!
//! `Program` is immutable once built and shared (`Arc`) between the solver,
//! the class hierarchy and plugins. `ProgramBuilder` is how front ends (and
//! tests) assemble one.

use super::ir::*;
use crate::errors::{next_index, PtaError, PtaResult};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    invokes: Vec<Invoke>,
    fields: Vec<Field>,
    class_index: FxHashMap<String, ClassId>,
    signature_index: FxHashMap<String, MethodId>,
}

impl Program {
    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn invoke(&self, id: InvokeId) -> &Invoke {
        &self.invokes[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    pub fn class_named(&self, name: &str) -> Option<&Class> {
        self.class_id(name).map(|id| self.class(id))
    }

    /// Look up a method by its full `<class: ret name(params)>` signature
    pub fn method_by_signature(&self, signature: &str) -> Option<MethodId> {
        self.signature_index.get(signature).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    /// Call sites in a method body, in statement order
    pub fn invokes_in(&self, method: MethodId) -> impl Iterator<Item = &Invoke> {
        self.method(method).stmts.iter().filter_map(move |stmt| match stmt {
            Stmt::Invoke(id) => Some(self.invoke(*id)),
            _ => None,
        })
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }
}

/// Method declaration handed to [`ProgramBuilder::add_method`]
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub class_name: String,
    pub name: String,
    pub param_types: Vec<JType>,
    pub ret: JType,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_public: bool,
}

impl MethodDecl {
    pub fn new(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            param_types: Vec::new(),
            ret: JType::Void,
            is_static: false,
            is_abstract: false,
            is_public: true,
        }
    }

    pub fn constructor(class_name: impl Into<String>) -> Self {
        Self::new(class_name, CONSTRUCTOR_NAME)
    }

    pub fn params(mut self, params: Vec<JType>) -> Self {
        self.param_types = params;
        self
    }

    pub fn returns(mut self, ret: JType) -> Self {
        self.ret = ret;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }
}

/// Class declaration handed to [`ProgramBuilder::add_class`]
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
    pub is_abstract: bool,
}

impl ClassDecl {
    /// A concrete class extending `java.lang.Object`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let super_class = if name == OBJECT {
            None
        } else {
            Some(OBJECT.to_string())
        };
        Self {
            name,
            super_class,
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        let mut decl = Self::new(name);
        decl.is_interface = true;
        decl.is_abstract = true;
        decl
    }

    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.super_class = Some(super_class.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// Incremental IR construction
///
/// # Example
/// ```
/// use codegraph_pta::features::points_to::domain::{ClassDecl, JType, MethodDecl, ProgramBuilder, Stmt};
///
/// let mut b = ProgramBuilder::new();
/// b.add_class(ClassDecl::new("A"));
/// let main = b.add_method(MethodDecl::new("A", "main").static_method());
/// let x = b.new_var(main, "x", JType::class("A"));
/// b.push_stmt(main, Stmt::New { lhs: x, ty: JType::class("A") });
/// let program = b.build().unwrap();
/// assert_eq!(program.method_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    /// First id overflow, reported by `build`
    overflow: Option<PtaError>,
}

impl ProgramBuilder {
    /// Start a program containing `java.lang.Object`
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.add_class(ClassDecl::new(OBJECT));
        builder
    }

    /// Add a class; re-adding an existing name returns the existing id
    pub fn add_class(&mut self, decl: ClassDecl) -> ClassId {
        if let Some(id) = self.program.class_id(&decl.name) {
            return id;
        }
        let id = ClassId(self.next_id(self.program.classes.len(), "classes"));
        self.program.class_index.insert(decl.name.clone(), id);
        self.program.classes.push(Class {
            id,
            name: decl.name,
            super_class: decl.super_class,
            interfaces: decl.interfaces,
            is_interface: decl.is_interface,
            is_abstract: decl.is_abstract,
            methods: Vec::new(),
            fields: Vec::new(),
        });
        id
    }

    pub fn add_field(
        &mut self,
        class_name: &str,
        name: impl Into<String>,
        ty: JType,
        is_static: bool,
    ) -> FieldId {
        let id = FieldId(self.next_id(self.program.fields.len(), "fields"));
        self.program.fields.push(Field {
            id,
            class_name: class_name.to_string(),
            name: name.into(),
            ty,
            is_static,
        });
        if let Some(class_id) = self.program.class_id(class_name) {
            self.program.classes[class_id.index()].fields.push(id);
        }
        id
    }

    /// Add a method, creating its `this` (instance methods) and parameter variables
    pub fn add_method(&mut self, decl: MethodDecl) -> MethodId {
        let id = MethodId(self.next_id(self.program.methods.len(), "methods"));
        let this = if decl.is_static {
            None
        } else {
            Some(self.alloc_var(id, "this", JType::class(decl.class_name.clone())))
        };
        let params = decl
            .param_types
            .iter()
            .enumerate()
            .map(|(i, ty)| self.alloc_var(id, format!("p{}", i), ty.clone()))
            .collect();
        let method = Method {
            id,
            class_name: decl.class_name,
            name: decl.name,
            param_types: decl.param_types,
            ret: decl.ret,
            params,
            this,
            return_vars: Vec::new(),
            stmts: Vec::new(),
            is_static: decl.is_static,
            is_abstract: decl.is_abstract,
            is_public: decl.is_public,
        };
        self.program
            .signature_index
            .insert(method.signature(), id);
        if let Some(class_id) = self.program.class_id(&method.class_name) {
            self.program.classes[class_id.index()].methods.push(id);
        }
        self.program.methods.push(method);
        id
    }

    pub fn this_var(&self, method: MethodId) -> Option<VarId> {
        self.program.method(method).this
    }

    pub fn param(&self, method: MethodId, index: usize) -> Option<VarId> {
        self.program.method(method).params.get(index).copied()
    }

    pub fn new_var(&mut self, method: MethodId, name: impl Into<String>, ty: JType) -> VarId {
        self.alloc_var(method, name, ty)
    }

    fn alloc_var(&mut self, method: MethodId, name: impl Into<String>, ty: JType) -> VarId {
        let id = VarId(self.next_id(self.program.vars.len(), "variables"));
        self.program.vars.push(Var {
            id,
            name: name.into(),
            ty,
            method,
            uses: VarUses::default(),
        });
        id
    }

    pub fn push_stmt(&mut self, method: MethodId, stmt: Stmt) {
        self.program.methods[method.index()].stmts.push(stmt);
    }

    /// Append an ordinary (non-dynamic) call site and its `Invoke` statement
    pub fn add_invoke(
        &mut self,
        method: MethodId,
        kind: InvokeKind,
        method_ref: MethodRef,
        base: Option<VarId>,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> InvokeId {
        self.push_invoke(method, kind, method_ref, base, args, result, None)
    }

    /// Append an `invokedynamic` call site; `captured` are its dynamic arguments
    pub fn add_invoke_dynamic(
        &mut self,
        method: MethodId,
        indy: InvokeDynamic,
        captured: Vec<VarId>,
        result: Option<VarId>,
    ) -> InvokeId {
        let method_ref = MethodRef::new(
            indy.bootstrap.class_name.clone(),
            indy.method_name.clone(),
            indy.method_type.params.clone(),
            indy.method_type.ret.clone(),
        );
        self.push_invoke(
            method,
            InvokeKind::Dynamic,
            method_ref,
            None,
            captured,
            result,
            Some(indy),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_invoke(
        &mut self,
        method: MethodId,
        kind: InvokeKind,
        method_ref: MethodRef,
        base: Option<VarId>,
        args: Vec<VarId>,
        result: Option<VarId>,
        dynamic: Option<InvokeDynamic>,
    ) -> InvokeId {
        let id = InvokeId(self.next_id(self.program.invokes.len(), "call sites"));
        self.program.invokes.push(Invoke {
            id,
            container: method,
            kind,
            method_ref,
            base,
            args,
            result,
            line: None,
            dynamic,
        });
        self.push_stmt(method, Stmt::Invoke(id));
        id
    }

    pub fn set_line(&mut self, invoke: InvokeId, line: u32) {
        self.program.invokes[invoke.index()].line = Some(line);
    }

    /// Id for the next entry of a table holding `len` entries. Past the id
    /// space the id saturates and `build` fails.
    fn next_id(&mut self, len: usize, what: &'static str) -> u32 {
        match next_index(len, what) {
            Ok(index) => index,
            Err(err) => {
                self.overflow.get_or_insert(err);
                u32::MAX
            }
        }
    }

    /// Validate cross references and index variable uses
    pub fn build(mut self) -> PtaResult<Program> {
        if let Some(err) = self.overflow.take() {
            return Err(err);
        }
        let var_count = self.program.vars.len();
        let check = |v: VarId| -> PtaResult<()> {
            if v.index() < var_count {
                Ok(())
            } else {
                Err(PtaError::Program(format!("dangling variable {}", v)))
            }
        };

        let mut uses: Vec<VarUses> = vec![VarUses::default(); var_count];
        for method in &mut self.program.methods {
            let mut return_vars = Vec::new();
            for stmt in &method.stmts {
                match stmt {
                    Stmt::LoadField { lhs, base, field } => {
                        check(*lhs)?;
                        check(*base)?;
                        uses[base.index()].load_fields.push((*lhs, *field));
                    }
                    Stmt::StoreField { base, field, rhs } => {
                        check(*base)?;
                        check(*rhs)?;
                        uses[base.index()].store_fields.push((*field, *rhs));
                    }
                    Stmt::LoadArray { lhs, base } => {
                        check(*lhs)?;
                        check(*base)?;
                        uses[base.index()].load_arrays.push(*lhs);
                    }
                    Stmt::StoreArray { base, rhs } => {
                        check(*base)?;
                        check(*rhs)?;
                        uses[base.index()].store_arrays.push(*rhs);
                    }
                    Stmt::Invoke(id) => {
                        let invoke = &self.program.invokes[id.index()];
                        for arg in &invoke.args {
                            check(*arg)?;
                        }
                        if let Some(base) = invoke.base {
                            check(base)?;
                            if !matches!(invoke.kind, InvokeKind::Static | InvokeKind::Dynamic) {
                                uses[base.index()].invokes.push(*id);
                            }
                        }
                        if let Some(result) = invoke.result {
                            check(result)?;
                        }
                    }
                    Stmt::Return(Some(v)) => {
                        check(*v)?;
                        if !return_vars.contains(v) {
                            return_vars.push(*v);
                        }
                    }
                    Stmt::New { lhs, .. }
                    | Stmt::AssignLiteral { lhs, .. }
                    | Stmt::LoadStatic { lhs, .. } => {
                        check(*lhs)?;
                    }
                    Stmt::Copy { lhs, rhs } | Stmt::Cast { lhs, rhs, .. } => {
                        check(*lhs)?;
                        check(*rhs)?;
                    }
                    Stmt::StoreStatic { rhs, .. } => check(*rhs)?,
                    Stmt::Return(None) => {}
                }
            }
            method.return_vars = return_vars;
        }
        for (var, var_uses) in self.program.vars.iter_mut().zip(uses) {
            var.uses = var_uses;
        }
        Ok(self.program)
    }
}
