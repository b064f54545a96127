use std::collections::HashMap;

use crate::ast::span::Span;
use crate::ast::types::{TypeAnn, TypeAnnKind};
use crate::ast::{self, LongIdent};
use crate::interner::{self, Symbol};
use crate::typechecker::error::{ErrorKind, NameKind, TypeError};
use crate::typechecker::types::{
    CtorArgsInfo, CtorInfo, DeclBody, DeclId, FieldDecl, TypeDecl, TypeId, TypeKind,
};
use crate::typechecker::unify::TypeTable;

/// One lexical scope. The scope at the top of the environment's stack is the
/// one definitions land in; `opens` holds copies of opened module scopes,
/// consulted by lookups after the scope's own mappings.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub(crate) names: HashMap<Symbol, TypeId>,
    pub(crate) type_decls: HashMap<Symbol, DeclId>,
    pub(crate) fields: HashMap<Symbol, (DeclId, usize)>,
    pub(crate) ctors: HashMap<Symbol, (DeclId, usize)>,
    pub(crate) instances: Vec<(Symbol, TypeId)>,
    pub(crate) modules: HashMap<Symbol, Scope>,
    pub(crate) type_vars: HashMap<Symbol, TypeId>,
    pub(crate) opens: Vec<Scope>,
}

impl Scope {
    /// The first non-value declaration this scope carries, if any. Patterns
    /// may only bind values.
    pub(crate) fn non_value_declaration(&self) -> Option<(NameKind, Symbol)> {
        if let Some(name) = self.type_decls.keys().next() {
            return Some((NameKind::Type, *name));
        }
        if let Some(name) = self.fields.keys().next() {
            return Some((NameKind::Field, *name));
        }
        if let Some(name) = self.ctors.keys().next() {
            return Some((NameKind::Ctor, *name));
        }
        if let Some(name) = self.modules.keys().next() {
            return Some((NameKind::Module, *name));
        }
        None
    }
}

/// The checker's environment: a stack of scopes over the type table that owns
/// every allocated type expression, declaration, and the instance
/// substitution. The stack height is the current scope depth; fresh
/// unification variables record it so generalization can tell a binding's own
/// variables from escaping ones.
#[derive(Debug)]
pub struct Env {
    pub table: TypeTable,
    scopes: Vec<Scope>,
    int_decl: DeclId,
}

impl Env {
    /// The seed environment: one toplevel scope with the built-in `int` type
    /// registered.
    pub fn new() -> Self {
        let mut table = TypeTable::new();
        let int_sym = interner::intern("int");
        let int_decl = table.add_decl(|id| TypeDecl {
            ident: int_sym,
            params: Vec::new(),
            id,
            body: DeclBody::Abstract,
        });
        let mut toplevel = Scope::default();
        toplevel.type_decls.insert(int_sym, int_decl);
        Env {
            table,
            scopes: vec![toplevel],
            int_decl,
        }
    }

    // ===== Scopes =====

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn close_scope(&mut self) -> Scope {
        self.scopes.pop().expect("scope stack underflow")
    }

    fn current_scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack underflow")
    }

    /// Merge value bindings and type variables of a detached scope into the
    /// current scope. Used when the right arm of an `or`-pattern becomes the
    /// live scope.
    pub(crate) fn absorb_scope(&mut self, scope: Scope) {
        let current = self.current_scope();
        current.names.extend(scope.names);
        current.type_vars.extend(scope.type_vars);
    }

    // ===== Allocation helpers =====

    pub fn fresh_var(&mut self, name: Option<Symbol>, span: Span) -> TypeId {
        let depth = self.depth();
        self.table.fresh_var(name, depth, span)
    }

    pub fn type_int(&mut self, span: Span) -> TypeId {
        self.table.alloc(
            TypeKind::Ctor {
                name: interner::intern("int"),
                params: Vec::new(),
                decl: self.int_decl,
            },
            span,
        )
    }

    pub fn type_unit(&mut self, span: Span) -> TypeId {
        self.table.unit(span)
    }

    // ===== Name resolution =====

    fn search<T>(&self, lookup: impl Fn(&Scope) -> Option<T>) -> Option<T> {
        for scope in self.scopes.iter().rev() {
            if let Some(found) = lookup(scope) {
                return Some(found);
            }
            for opened in scope.opens.iter().rev() {
                if let Some(found) = lookup(opened) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn in_module<T>(scope: &Scope, lookup: impl Fn(&Scope) -> Option<T>) -> Option<T> {
        lookup(scope).or_else(|| scope.opens.iter().rev().find_map(|s| lookup(s)))
    }

    fn resolve<T>(
        &self,
        path: &LongIdent,
        kind: NameKind,
        lookup: impl Fn(&Scope, Symbol) -> Option<T>,
    ) -> Result<T, TypeError> {
        match path {
            LongIdent::Bare(id) => self
                .search(|scope| lookup(scope, id.name))
                .ok_or_else(|| unbound(kind, path)),
            LongIdent::Dotted(prefix, id) => {
                let module = self.find_module(prefix)?;
                Self::in_module(module, |scope| lookup(scope, id.name))
                    .ok_or_else(|| unbound(kind, path))
            }
            LongIdent::Applied(_, _) => Err(unsupported_path(path)),
        }
    }

    pub fn find_name(&self, path: &LongIdent) -> Result<TypeId, TypeError> {
        self.resolve(path, NameKind::Value, |scope, name| {
            scope.names.get(&name).copied()
        })
    }

    pub fn find_type_decl(&self, path: &LongIdent) -> Result<DeclId, TypeError> {
        self.resolve(path, NameKind::Type, |scope, name| {
            scope.type_decls.get(&name).copied()
        })
    }

    pub fn find_field(&self, path: &LongIdent) -> Result<(DeclId, usize), TypeError> {
        self.resolve(path, NameKind::Field, |scope, name| {
            scope.fields.get(&name).copied()
        })
    }

    pub fn find_ctor(&self, path: &LongIdent) -> Result<(DeclId, usize), TypeError> {
        self.resolve(path, NameKind::Ctor, |scope, name| {
            scope.ctors.get(&name).copied()
        })
    }

    pub fn find_module(&self, path: &LongIdent) -> Result<&Scope, TypeError> {
        match path {
            LongIdent::Bare(id) => self
                .search_module(id.name)
                .ok_or_else(|| unbound(NameKind::Module, path)),
            LongIdent::Dotted(prefix, id) => {
                let outer = self.find_module(prefix)?;
                if let Some(found) = outer.modules.get(&id.name) {
                    return Ok(found);
                }
                for opened in outer.opens.iter().rev() {
                    if let Some(found) = opened.modules.get(&id.name) {
                        return Ok(found);
                    }
                }
                Err(unbound(NameKind::Module, path))
            }
            LongIdent::Applied(_, _) => Err(unsupported_path(path)),
        }
    }

    fn search_module(&self, name: Symbol) -> Option<&Scope> {
        for scope in self.scopes.iter().rev() {
            if let Some(found) = scope.modules.get(&name) {
                return Some(found);
            }
            for opened in scope.opens.iter().rev() {
                if let Some(found) = opened.modules.get(&name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Convenience lookup of an unqualified value name; used by embedders and
    /// tests to inspect the result of a run.
    pub fn type_of(&self, name: &str) -> Option<TypeId> {
        let sym = interner::intern(name);
        self.search(|scope| scope.names.get(&sym).copied())
    }

    // ===== Definitions =====

    pub fn add_name(&mut self, name: Symbol, ty: TypeId) {
        self.current_scope().names.insert(name, ty);
    }

    pub fn add_instance(&mut self, name: Symbol, ty: TypeId) {
        self.current_scope().instances.push((name, ty));
    }

    pub fn add_module(&mut self, name: Symbol, scope: Scope) {
        self.current_scope().modules.insert(name, scope);
    }

    /// `open`: push a copy of the module's scope onto the current scope's
    /// search path. Later definitions still land in the current scope.
    pub fn open_module(&mut self, path: &LongIdent) -> Result<(), TypeError> {
        let opened = self.find_module(path)?.clone();
        log::debug!("open {}", path);
        self.current_scope().opens.push(opened);
        Ok(())
    }

    /// All implicit instances reachable from the current position.
    pub fn instances_in_scope(&self) -> Vec<(Symbol, TypeId)> {
        let mut out = Vec::new();
        for scope in self.scopes.iter().rev() {
            out.extend(scope.instances.iter().copied());
            for opened in scope.opens.iter().rev() {
                out.extend(opened.instances.iter().copied());
            }
        }
        out
    }

    // ===== Declaration instantiation =====

    /// Build a fresh application of `decl` to new unification variables.
    /// Returns the constructor type and the formal-to-fresh substitution, for
    /// instantiating field and constructor-argument types of the same
    /// declaration consistently.
    pub fn instantiate_decl(
        &mut self,
        decl: DeclId,
        span: Span,
    ) -> (TypeId, HashMap<TypeId, TypeId>) {
        let (name, formals) = {
            let d = self.table.decl(decl);
            (d.ident, d.params.clone())
        };
        let depth = self.depth();
        let mut map = HashMap::new();
        let fresh: Vec<TypeId> = formals
            .iter()
            .map(|formal| {
                let var_name = match self.table.kind(*formal) {
                    TypeKind::Var { name, .. } => *name,
                    _ => None,
                };
                let fv = self.table.fresh_var(var_name, depth, span);
                map.insert(*formal, fv);
                fv
            })
            .collect();
        let ty = self.table.alloc(
            TypeKind::Ctor {
                name,
                params: fresh,
                decl,
            },
            span,
        );
        (ty, map)
    }

    /// Look up a field by name within a record declaration. Returns the
    /// field's index and its declared (uninstantiated) type.
    pub fn field_in_decl(&self, decl: DeclId, name: Symbol) -> Option<(usize, TypeId)> {
        match &self.table.decl(decl).body {
            DeclBody::Record(fields) => fields
                .iter()
                .enumerate()
                .find(|(_, f)| f.name == name)
                .map(|(i, f)| (i, f.ty)),
            _ => None,
        }
    }

    /// The number of fields of a record declaration, and their names.
    pub fn record_fields(&self, decl: DeclId) -> Option<Vec<Symbol>> {
        match &self.table.decl(decl).body {
            DeclBody::Record(fields) => Some(fields.iter().map(|f| f.name).collect()),
            _ => None,
        }
    }

    /// Instantiate constructor `index` of a variant declaration: fresh
    /// parameters, then the constructor's return type (the declared type
    /// unless it carries an explicit one) and its argument type.
    pub fn instantiate_ctor(
        &mut self,
        decl: DeclId,
        index: usize,
        span: Span,
    ) -> Result<(TypeId, TypeId), TypeError> {
        let ctor = match &self.table.decl(decl).body {
            DeclBody::Variant(ctors) => match ctors.get(index) {
                Some(ctor) => ctor.clone(),
                None => {
                    return Err(TypeError::new(
                        span,
                        ErrorKind::WrongTypeDescription("constructor index".into()),
                    ))
                }
            },
            _ => {
                return Err(TypeError::new(
                    span,
                    ErrorKind::WrongTypeDescription("variant declaration".into()),
                ))
            }
        };
        let (decl_ty, mut map) = self.instantiate_decl(decl, span);
        let depth = self.depth();
        let ret = match ctor.ret {
            Some(ret) => self.table.copy(ret, &mut map, depth),
            None => decl_ty,
        };
        let arg = match ctor.args {
            CtorArgsInfo::Tuple(arg) => self.table.copy(arg, &mut map, depth),
            CtorArgsInfo::Record(record_decl) => {
                let (record_name, formals) = {
                    let d = self.table.decl(record_decl);
                    (d.ident, d.params.clone())
                };
                let params: Vec<TypeId> = formals
                    .iter()
                    .map(|formal| self.table.copy(*formal, &mut map, depth))
                    .collect();
                self.table.alloc(
                    TypeKind::Ctor {
                        name: record_name,
                        params,
                        decl: record_decl,
                    },
                    span,
                )
            }
        };
        Ok((ret, arg))
    }

    // ===== Surface type import =====

    fn find_type_var(&self, name: Symbol) -> Option<TypeId> {
        self.search(|scope| scope.type_vars.get(&name).copied())
    }

    /// Import a surface annotation, allocating fresh ids for its free type
    /// variables. A named variable seen earlier in the same scope resolves to
    /// the same id, so repeated `'a` annotations agree.
    pub fn import_type(&mut self, ann: &TypeAnn) -> Result<TypeId, TypeError> {
        match &ann.kind {
            TypeAnnKind::Var(id) => match self.find_type_var(id.name) {
                Some(existing) => Ok(existing),
                None => {
                    let fresh = self.fresh_var(Some(id.name), ann.span);
                    self.current_scope().type_vars.insert(id.name, fresh);
                    Ok(fresh)
                }
            },
            TypeAnnKind::Arrow(dom, cod, mode) => {
                let dom = self.import_type(dom)?;
                let cod = self.import_type(cod)?;
                Ok(self.table.arrow(dom, cod, *mode, ann.span))
            }
            TypeAnnKind::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| self.import_type(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.table.tuple(elems, ann.span))
            }
            TypeAnnKind::Ctor(path, params) => {
                let decl = self.find_type_decl(path)?;
                let name = match path.last() {
                    Some(id) => id.name,
                    None => return Err(unsupported_path(path)),
                };
                let params = params
                    .iter()
                    .map(|p| self.import_type(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self
                    .table
                    .alloc(TypeKind::Ctor { name, params, decl }, ann.span))
            }
            TypeAnnKind::Poly(vars, body) => {
                let (fresh, saved) = self.bind_type_params(vars, ann.span);
                let body = self.import_type(body);
                self.restore_type_params(saved);
                let body = body?;
                Ok(self.table.alloc(TypeKind::Poly { vars: fresh, body }, ann.span))
            }
        }
    }

    fn bind_type_params(
        &mut self,
        vars: &[ast::Ident],
        span: Span,
    ) -> (Vec<TypeId>, Vec<(Symbol, Option<TypeId>)>) {
        let mut fresh = Vec::new();
        let mut saved = Vec::new();
        for var in vars {
            let fv = self.fresh_var(Some(var.name), span);
            let previous = self.current_scope().type_vars.insert(var.name, fv);
            saved.push((var.name, previous));
            fresh.push(fv);
        }
        (fresh, saved)
    }

    fn restore_type_params(&mut self, saved: Vec<(Symbol, Option<TypeId>)>) {
        for (name, previous) in saved.into_iter().rev() {
            match previous {
                Some(ty) => {
                    self.current_scope().type_vars.insert(name, ty);
                }
                None => {
                    self.current_scope().type_vars.remove(&name);
                }
            }
        }
    }

    // ===== Type declaration import =====

    /// Import a surface type declaration: allocate a fresh declaration id,
    /// freshen its parameters, and register the declaration together with its
    /// field and constructor indices. The name is registered before the body
    /// is imported so recursive declarations resolve themselves.
    pub fn import_type_decl(&mut self, decl: &ast::TypeDecl) -> Result<DeclId, TypeError> {
        let name = decl.name.name;
        let params: Vec<TypeId> = decl
            .params
            .iter()
            .map(|p| self.fresh_var(Some(p.name), p.span))
            .collect();
        let id = self.table.add_decl(|id| TypeDecl {
            ident: name,
            params: params.clone(),
            id,
            body: DeclBody::Abstract,
        });
        self.current_scope().type_decls.insert(name, id);

        let saved = {
            let mut saved = Vec::new();
            for (param, fresh) in decl.params.iter().zip(params.iter()) {
                let previous = self.current_scope().type_vars.insert(param.name, *fresh);
                saved.push((param.name, previous));
            }
            saved
        };
        let body = self.import_decl_body(&decl.body, name, &params);
        self.restore_type_params(saved);
        let body = body?;

        match &body {
            DeclBody::Record(fields) => {
                for (index, field) in fields.iter().enumerate() {
                    self.current_scope().fields.insert(field.name, (id, index));
                }
            }
            DeclBody::Variant(ctors) => {
                for (index, ctor) in ctors.iter().enumerate() {
                    self.current_scope().ctors.insert(ctor.name, (id, index));
                }
            }
            DeclBody::Alias(_) | DeclBody::Abstract => {}
        }
        self.table.set_decl_body(id, body);
        Ok(id)
    }

    fn import_decl_body(
        &mut self,
        body: &ast::TypeDeclBody,
        name: Symbol,
        params: &[TypeId],
    ) -> Result<DeclBody, TypeError> {
        match body {
            ast::TypeDeclBody::Abstract => Ok(DeclBody::Abstract),
            ast::TypeDeclBody::Alias(ann) => Ok(DeclBody::Alias(self.import_type(ann)?)),
            ast::TypeDeclBody::Record(fields) => {
                Ok(DeclBody::Record(self.import_fields(fields)?))
            }
            ast::TypeDeclBody::Variant(ctors) => {
                let mut imported: Vec<CtorInfo> = Vec::new();
                for ctor in ctors {
                    let args = match &ctor.args {
                        ast::CtorArgs::Tuple(anns) => {
                            let elems = anns
                                .iter()
                                .map(|a| self.import_type(a))
                                .collect::<Result<Vec<_>, _>>()?;
                            CtorArgsInfo::Tuple(self.table.tuple(elems, ctor.name.span))
                        }
                        ast::CtorArgs::Record(fields) => {
                            let fields = self.import_fields(fields)?;
                            let record_name = interner::intern(&format!(
                                "{}.{}",
                                interner::resolve(name),
                                interner::resolve(ctor.name.name)
                            ));
                            let params = params.to_vec();
                            let record_id = self.table.add_decl(|id| TypeDecl {
                                ident: record_name,
                                params,
                                id,
                                body: DeclBody::Record(fields),
                            });
                            CtorArgsInfo::Record(record_id)
                        }
                    };
                    let ret = match &ctor.ret {
                        Some(ann) => Some(self.import_type(ann)?),
                        None => None,
                    };
                    imported.push(CtorInfo {
                        name: ctor.name.name,
                        args,
                        ret,
                    });
                }
                Ok(DeclBody::Variant(imported))
            }
        }
    }

    fn import_fields(
        &mut self,
        fields: &[(ast::Ident, TypeAnn)],
    ) -> Result<Vec<FieldDecl>, TypeError> {
        fields
            .iter()
            .map(|(ident, ann)| {
                Ok(FieldDecl {
                    name: ident.name,
                    ty: self.import_type(ann)?,
                })
            })
            .collect()
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

fn unbound(kind: NameKind, path: &LongIdent) -> TypeError {
    TypeError::new(
        path.span(),
        ErrorKind::Unbound {
            kind,
            name: path.to_string(),
        },
    )
}

fn unsupported_path(path: &LongIdent) -> TypeError {
    TypeError::new(path.span(), ErrorKind::UnsupportedPath(path.to_string()))
}
