use std::collections::{HashMap, HashSet};

use crate::ast::span::Span;
use crate::ast::types::Explicitness;
use crate::interner::{self, Symbol};
use crate::typechecker::error::{ErrorKind, TypeError};
use crate::typechecker::types::{DeclBody, DeclId, TypeDecl, TypeExpr, TypeId, TypeKind};

/// Owner of every type expression of a checker run.
///
/// Type expressions are allocated once and referenced by [`TypeId`]; the
/// current unification substitution is the `instances` side array, kept
/// acyclic by the unifier. Resolution is deferred to lookup ([`repr`]) rather
/// than eagerly rewriting the arena.
///
/// [`repr`]: TypeTable::repr
#[derive(Debug)]
pub struct TypeTable {
    exprs: Vec<TypeExpr>,
    instances: Vec<Option<TypeId>>,
    decls: Vec<TypeDecl>,
}

/// Saved substitution state for tentative unification. Rolling back undoes
/// instance assignments and depth lowering; expressions allocated in between
/// stay in the arena, unreachable.
pub struct Snapshot {
    instances: Vec<Option<TypeId>>,
    var_depths: Vec<(TypeId, usize)>,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable {
            exprs: Vec::new(),
            instances: Vec::new(),
            decls: Vec::new(),
        }
    }

    // ===== Allocation =====

    pub fn alloc(&mut self, kind: TypeKind, span: Span) -> TypeId {
        let id = TypeId(self.exprs.len() as u32);
        self.exprs.push(TypeExpr { id, span, kind });
        self.instances.push(None);
        id
    }

    pub fn fresh_var(&mut self, name: Option<Symbol>, depth: usize, span: Span) -> TypeId {
        self.alloc(TypeKind::Var { name, depth }, span)
    }

    /// Allocate a tuple type. 1-tuples fold to their element: a constructor
    /// declared over a single argument accepts that argument directly.
    pub fn tuple(&mut self, mut elems: Vec<TypeId>, span: Span) -> TypeId {
        if elems.len() == 1 {
            elems.pop().unwrap()
        } else {
            self.alloc(TypeKind::Tuple(elems), span)
        }
    }

    pub fn unit(&mut self, span: Span) -> TypeId {
        self.alloc(TypeKind::Tuple(Vec::new()), span)
    }

    pub fn arrow(&mut self, dom: TypeId, cod: TypeId, mode: Explicitness, span: Span) -> TypeId {
        self.alloc(TypeKind::Arrow { dom, cod, mode }, span)
    }

    pub fn expr(&self, id: TypeId) -> &TypeExpr {
        &self.exprs[id.0 as usize]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.exprs[id.0 as usize].kind
    }

    pub fn span_of(&self, id: TypeId) -> Span {
        self.exprs[id.0 as usize].span
    }

    // ===== Declarations =====

    pub fn add_decl(&mut self, build: impl FnOnce(DeclId) -> TypeDecl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        let decl = build(id);
        self.decls.push(decl);
        id
    }

    pub fn decl(&self, id: DeclId) -> &TypeDecl {
        &self.decls[id.0 as usize]
    }

    /// Replace a declaration's body. Recursive declarations are registered
    /// with an abstract body first so their own import can resolve them.
    pub(super) fn set_decl_body(&mut self, id: DeclId, body: DeclBody) {
        self.decls[id.0 as usize].body = body;
    }

    // ===== The instance substitution =====

    pub fn instance(&self, id: TypeId) -> Option<TypeId> {
        self.instances[id.0 as usize]
    }

    fn set_instance(&mut self, id: TypeId, target: TypeId) {
        log::trace!(
            "instance {} := {}",
            id.0,
            self.show(target)
        );
        self.instances[id.0 as usize] = Some(target);
    }

    fn clear_instance(&mut self, id: TypeId) -> Option<TypeId> {
        self.instances[id.0 as usize].take()
    }

    /// Follow variable instances to the representative of `id`.
    pub fn repr(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.kind(id) {
                TypeKind::Var { .. } => match self.instance(id) {
                    Some(next) => id = next,
                    None => return id,
                },
                _ => return id,
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let var_depths = self
            .exprs
            .iter()
            .filter_map(|e| match e.kind {
                TypeKind::Var { depth, .. } => Some((e.id, depth)),
                _ => None,
            })
            .collect();
        Snapshot {
            instances: self.instances.clone(),
            var_depths,
        }
    }

    pub fn rollback(&mut self, snap: &Snapshot) {
        for (i, slot) in self.instances.iter_mut().enumerate() {
            *slot = snap.instances.get(i).copied().flatten();
        }
        for &(id, depth) in &snap.var_depths {
            if let TypeKind::Var { depth: d, .. } = &mut self.exprs[id.0 as usize].kind {
                *d = depth;
            }
        }
    }

    // ===== Structural walks =====

    /// Materialize the substitution over `ty`: every instance-bearing
    /// variable is replaced by its resolved body, recursively. Uninstantiated
    /// variables are shared, so a flattened type still unifies in step with
    /// the graph it came from. Bindings flatten before generalizing; the
    /// resulting scheme body carries no hidden instances for `copy` to miss.
    pub fn flatten(&mut self, ty: TypeId) -> TypeId {
        let ty = self.repr(ty);
        let span = self.span_of(ty);
        match self.kind(ty).clone() {
            TypeKind::Var { .. } => ty,
            TypeKind::Poly { vars, body } => {
                let flat = self.flatten(body);
                if flat == body {
                    ty
                } else {
                    self.alloc(TypeKind::Poly { vars, body: flat }, span)
                }
            }
            TypeKind::Arrow { dom, cod, mode } => {
                let d = self.flatten(dom);
                let c = self.flatten(cod);
                if d == dom && c == cod {
                    ty
                } else {
                    self.alloc(TypeKind::Arrow { dom: d, cod: c, mode }, span)
                }
            }
            TypeKind::Tuple(elems) => {
                let flat: Vec<TypeId> = elems.iter().map(|e| self.flatten(*e)).collect();
                if flat == elems {
                    ty
                } else {
                    self.alloc(TypeKind::Tuple(flat), span)
                }
            }
            TypeKind::Ctor { name, params, decl } => {
                let flat: Vec<TypeId> = params.iter().map(|p| self.flatten(*p)).collect();
                if flat == params {
                    ty
                } else {
                    self.alloc(
                        TypeKind::Ctor {
                            name,
                            params: flat,
                            decl,
                        },
                        span,
                    )
                }
            }
        }
    }

    /// Check whether the uninstantiated variable `var` occurs in `ty`,
    /// following instances.
    pub fn occurs_in(&self, var: TypeId, ty: TypeId) -> bool {
        let ty = self.repr(ty);
        if ty == var {
            return true;
        }
        match self.kind(ty) {
            TypeKind::Var { .. } => false,
            TypeKind::Poly { body, .. } => self.occurs_in(var, *body),
            TypeKind::Arrow { dom, cod, .. } => {
                self.occurs_in(var, *dom) || self.occurs_in(var, *cod)
            }
            TypeKind::Tuple(elems) => elems.iter().any(|e| self.occurs_in(var, *e)),
            TypeKind::Ctor { params, .. } => params.iter().any(|p| self.occurs_in(var, *p)),
        }
    }

    /// Lower the depth of every free variable of `ty` to at most `limit`.
    /// Assigning `v := t` calls this with `v`'s depth, so an instance never
    /// references a variable that outlives it, preserving the generalization invariant.
    fn update_depths(&mut self, limit: usize, ty: TypeId) {
        let ty = self.repr(ty);
        match self.kind(ty).clone() {
            TypeKind::Var { .. } => {
                if let TypeKind::Var { depth, .. } = &mut self.exprs[ty.0 as usize].kind {
                    if *depth > limit {
                        *depth = limit;
                    }
                }
            }
            TypeKind::Poly { body, .. } => self.update_depths(limit, body),
            TypeKind::Arrow { dom, cod, .. } => {
                self.update_depths(limit, dom);
                self.update_depths(limit, cod);
            }
            TypeKind::Tuple(elems) => {
                for e in elems {
                    self.update_depths(limit, e);
                }
            }
            TypeKind::Ctor { params, .. } => {
                for p in params {
                    self.update_depths(limit, p);
                }
            }
        }
    }

    /// Collect the free variables of `ty` at depth `min_depth` or deeper, in
    /// first-visit order. Variables bound by a `Poly` along the way are not
    /// free.
    pub fn free_vars_at_depth(&self, ty: TypeId, min_depth: usize) -> Vec<TypeId> {
        let mut out = Vec::new();
        let mut bound = HashSet::new();
        self.collect_free_vars(ty, min_depth, &mut bound, &mut out);
        out
    }

    fn collect_free_vars(
        &self,
        ty: TypeId,
        min_depth: usize,
        bound: &mut HashSet<TypeId>,
        out: &mut Vec<TypeId>,
    ) {
        let ty = self.repr(ty);
        match self.kind(ty) {
            TypeKind::Var { depth, .. } => {
                if *depth >= min_depth && !bound.contains(&ty) && !out.contains(&ty) {
                    out.push(ty);
                }
            }
            TypeKind::Poly { vars, body } => {
                let added: Vec<TypeId> =
                    vars.iter().filter(|v| bound.insert(**v)).copied().collect();
                self.collect_free_vars(*body, min_depth, bound, out);
                for v in added {
                    bound.remove(&v);
                }
            }
            TypeKind::Arrow { dom, cod, .. } => {
                self.collect_free_vars(*dom, min_depth, bound, out);
                self.collect_free_vars(*cod, min_depth, bound, out);
            }
            TypeKind::Tuple(elems) => {
                for e in elems {
                    self.collect_free_vars(*e, min_depth, bound, out);
                }
            }
            TypeKind::Ctor { params, .. } => {
                for p in params {
                    self.collect_free_vars(*p, min_depth, bound, out);
                }
            }
        }
    }

    // ===== Copying =====

    /// Copy `ty`, rebuilding every node whose subtree hits `map` and sharing
    /// everything else. Variables bound by a `Poly` are replaced with fresh
    /// variables at `depth`, so each use of a polymorphic value unifies
    /// independently.
    pub fn copy(&mut self, ty: TypeId, map: &mut HashMap<TypeId, TypeId>, depth: usize) -> TypeId {
        if let Some(mapped) = map.get(&ty) {
            return *mapped;
        }
        let span = self.span_of(ty);
        match self.kind(ty).clone() {
            TypeKind::Var { .. } => ty,
            TypeKind::Poly { vars, body } => {
                let fresh: Vec<TypeId> = vars
                    .iter()
                    .map(|v| {
                        let name = match self.kind(*v) {
                            TypeKind::Var { name, .. } => *name,
                            _ => None,
                        };
                        let nv = self.fresh_var(name, depth, span);
                        map.insert(*v, nv);
                        nv
                    })
                    .collect();
                let body = self.copy(body, map, depth);
                self.alloc(
                    TypeKind::Poly {
                        vars: fresh,
                        body,
                    },
                    span,
                )
            }
            TypeKind::Arrow { dom, cod, mode } => {
                let d = self.copy(dom, map, depth);
                let c = self.copy(cod, map, depth);
                if d == dom && c == cod {
                    ty
                } else {
                    self.alloc(TypeKind::Arrow { dom: d, cod: c, mode }, span)
                }
            }
            TypeKind::Tuple(elems) => {
                let copied: Vec<TypeId> = elems.iter().map(|e| self.copy(*e, map, depth)).collect();
                if copied == elems {
                    ty
                } else {
                    self.alloc(TypeKind::Tuple(copied), span)
                }
            }
            TypeKind::Ctor { name, params, decl } => {
                let copied: Vec<TypeId> =
                    params.iter().map(|p| self.copy(*p, map, depth)).collect();
                if copied == params {
                    ty
                } else {
                    self.alloc(
                        TypeKind::Ctor {
                            name,
                            params: copied,
                            decl,
                        },
                        span,
                    )
                }
            }
        }
    }

    /// Instantiate a stored scheme: fresh variables for anything `Poly`-bound,
    /// shared structure for everything else.
    pub fn instantiate(&mut self, ty: TypeId, depth: usize) -> TypeId {
        let mut map = HashMap::new();
        self.copy(ty, &mut map, depth)
    }

    // ===== Unification =====

    /// Unify two types, mutating the instance substitution. A failure is
    /// wrapped once here so the error carries the outermost expected/actual
    /// pair along with the innermost mismatch.
    pub fn unify(&mut self, span: Span, expected: TypeId, actual: TypeId) -> Result<(), TypeError> {
        self.unify_inner(expected, actual).map_err(|inner| {
            TypeError::new(
                span,
                ErrorKind::CheckFailed {
                    expected: self.show(expected),
                    actual: self.show(actual),
                    inner: Box::new(inner),
                },
            )
        })
    }

    /// Unify tentatively: commit the substitution on success, roll back on
    /// failure. Used for implicit-instance candidate matching.
    pub fn try_unify(&mut self, a: TypeId, b: TypeId) -> bool {
        let snap = self.snapshot();
        match self.unify_inner(a, b) {
            Ok(()) => true,
            Err(_) => {
                self.rollback(&snap);
                false
            }
        }
    }

    fn cannot_unify(&self, a: TypeId, b: TypeId) -> ErrorKind {
        ErrorKind::CannotUnify(self.show(a), self.show(b))
    }

    fn unify_inner(&mut self, a: TypeId, b: TypeId) -> Result<(), ErrorKind> {
        if a == b {
            return Ok(());
        }
        let ka = self.kind(a).clone();
        let kb = self.kind(b).clone();
        match (ka, kb) {
            // A quantifier on either side is a compatibility check against
            // its body; callers instantiate at lookup.
            (TypeKind::Poly { body, .. }, _) => self.unify_inner(body, b),
            (_, TypeKind::Poly { body, .. }) => self.unify_inner(a, body),

            (
                TypeKind::Var { depth: da, .. },
                TypeKind::Var { depth: db, .. },
            ) => match (self.instance(a), self.instance(b)) {
                (Some(ia), _) => self.unify_without_instance(a, ia, b, true),
                (None, Some(ib)) => self.unify_without_instance(b, ib, a, false),
                (None, None) => {
                    // The deeper variable receives the instance, so instances
                    // always point from deeper to shallower scopes. Ties
                    // break on the larger id.
                    let (assignee, target) = if da > db {
                        (a, b)
                    } else if db > da {
                        (b, a)
                    } else if a > b {
                        (a, b)
                    } else {
                        (b, a)
                    };
                    self.set_instance(assignee, target);
                    Ok(())
                }
            },

            (TypeKind::Var { depth, .. }, _) => match self.instance(a) {
                None => self.assign(a, depth, b),
                Some(ia) => self.unify_without_instance(a, ia, b, true),
            },
            (_, TypeKind::Var { depth, .. }) => match self.instance(b) {
                None => self.assign(b, depth, a),
                Some(ib) => self.unify_without_instance(b, ib, a, false),
            },

            (TypeKind::Tuple(ts), TypeKind::Tuple(us)) => {
                if ts.len() != us.len() {
                    return Err(self.cannot_unify(a, b));
                }
                for (t, u) in ts.iter().zip(us.iter()) {
                    self.unify_inner(*t, *u)?;
                }
                Ok(())
            }

            (
                TypeKind::Arrow { dom: d1, cod: c1, mode: m1 },
                TypeKind::Arrow { dom: d2, cod: c2, mode: m2 },
            ) => {
                if m1 != m2 {
                    return Err(self.cannot_unify(a, b));
                }
                self.unify_inner(d1, d2)?;
                self.unify_inner(c1, c2)
            }

            (
                TypeKind::Ctor { decl: i, params: p, .. },
                TypeKind::Ctor { decl: j, params: q, .. },
            ) => {
                if i == j {
                    if p.len() != q.len() {
                        return Err(self.cannot_unify(a, b));
                    }
                    for (x, y) in p.iter().zip(q.iter()) {
                        self.unify_inner(*x, *y)?;
                    }
                    Ok(())
                } else {
                    // Unfold the older declaration first: newer types are
                    // typically aliases for older ones.
                    let (first, second) = if i < j {
                        ((a, i, p.clone()), (b, j, q.clone()))
                    } else {
                        ((b, j, q.clone()), (a, i, p.clone()))
                    };
                    for (side, decl, params) in [first, second] {
                        if let Some(unfolded) = self.unfold_alias(decl, &params) {
                            return if side == a {
                                self.unify_inner(unfolded, b)
                            } else {
                                self.unify_inner(a, unfolded)
                            };
                        }
                    }
                    Err(self.cannot_unify(a, b))
                }
            }

            _ => Err(self.cannot_unify(a, b)),
        }
    }

    /// Assign an instance to the uninstantiated variable `var`.
    fn assign(&mut self, var: TypeId, var_depth: usize, ty: TypeId) -> Result<(), ErrorKind> {
        if self.occurs_in(var, ty) {
            return Err(ErrorKind::RecursiveVariable(self.show(var)));
        }
        self.update_depths(var_depth, ty);
        self.set_instance(var, ty);
        Ok(())
    }

    /// Recurse on a variable's instance with the instance temporarily
    /// removed, restoring it on success. If the variable picked up a new
    /// instance during the recursion, the substitution would become cyclic.
    fn unify_without_instance(
        &mut self,
        var: TypeId,
        inst: TypeId,
        other: TypeId,
        var_on_left: bool,
    ) -> Result<(), ErrorKind> {
        self.clear_instance(var);
        if var_on_left {
            self.unify_inner(inst, other)?;
        } else {
            self.unify_inner(other, inst)?;
        }
        if self.instance(var).is_some() {
            return Err(ErrorKind::RecursiveVariable(self.show(var)));
        }
        self.set_instance(var, inst);
        Ok(())
    }

    /// Expand a constructor application through transparent aliases until a
    /// non-alias form is reached.
    pub fn unalias(&mut self, ty: TypeId) -> TypeId {
        let mut ty = self.repr(ty);
        loop {
            match self.kind(ty).clone() {
                TypeKind::Ctor { decl, params, .. } => match self.unfold_alias(decl, &params) {
                    Some(next) => ty = self.repr(next),
                    None => return ty,
                },
                _ => return ty,
            }
        }
    }

    /// If `decl` is a transparent alias, instantiate its body at the given
    /// actual parameters.
    fn unfold_alias(&mut self, decl: DeclId, params: &[TypeId]) -> Option<TypeId> {
        let (formals, body) = match &self.decl(decl).body {
            DeclBody::Alias(body) => (self.decl(decl).params.clone(), *body),
            _ => return None,
        };
        let mut map: HashMap<TypeId, TypeId> =
            formals.iter().copied().zip(params.iter().copied()).collect();
        // An alias body is prenex-free, so the copy depth is never consulted.
        Some(self.copy(body, &mut map, 0))
    }

    // ===== Pretty-printing =====

    /// Render a type for error messages and diagnostics. Anonymous variables
    /// are lettered in first-visit order.
    pub fn show(&self, ty: TypeId) -> String {
        let mut names: HashMap<TypeId, String> = HashMap::new();
        self.show_inner(ty, &mut names)
    }

    fn var_name(&self, var: TypeId, names: &mut HashMap<TypeId, String>) -> String {
        if let Some(existing) = names.get(&var) {
            return existing.clone();
        }
        let rendered = match self.kind(var) {
            TypeKind::Var { name: Some(n), .. } => format!("'{}", interner::resolve(*n)),
            _ => {
                let n = names.len();
                if n < 26 {
                    format!("'{}", (b'a' + n as u8) as char)
                } else {
                    format!("'a{}", n - 26)
                }
            }
        };
        names.insert(var, rendered.clone());
        rendered
    }

    fn show_inner(&self, ty: TypeId, names: &mut HashMap<TypeId, String>) -> String {
        let ty = self.repr(ty);
        match self.kind(ty).clone() {
            TypeKind::Var { .. } => self.var_name(ty, names),
            TypeKind::Poly { vars, body } => {
                let vars: Vec<String> = vars.iter().map(|v| self.var_name(*v, names)).collect();
                format!("forall {}. {}", vars.join(" "), self.show_inner(body, names))
            }
            TypeKind::Arrow { dom, cod, mode } => {
                let dom_str = self.show_atomic(dom, names);
                let cod_str = self.show_inner(cod, names);
                match mode {
                    Explicitness::Explicit => format!("{} -> {}", dom_str, cod_str),
                    Explicitness::Implicit => format!("{{{}}} -> {}", dom_str, cod_str),
                }
            }
            TypeKind::Tuple(elems) => {
                if elems.is_empty() {
                    "()".to_string()
                } else {
                    let parts: Vec<String> =
                        elems.iter().map(|e| self.show_inner(*e, names)).collect();
                    format!("({})", parts.join(", "))
                }
            }
            TypeKind::Ctor { name, params, .. } => {
                let name = interner::resolve(name);
                match params.len() {
                    0 => name,
                    1 => format!("{} {}", self.show_atomic(params[0], names), name),
                    _ => {
                        let parts: Vec<String> =
                            params.iter().map(|p| self.show_inner(*p, names)).collect();
                        format!("({}) {}", parts.join(", "), name)
                    }
                }
            }
        }
    }

    /// Like `show_inner`, parenthesizing arrows and quantifiers.
    fn show_atomic(&self, ty: TypeId, names: &mut HashMap<TypeId, String>) -> String {
        let resolved = self.repr(ty);
        let inner = self.show_inner(resolved, names);
        match self.kind(resolved) {
            TypeKind::Arrow { .. } | TypeKind::Poly { .. } => format!("({})", inner),
            _ => inner,
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
