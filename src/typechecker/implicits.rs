//! Generalization and implicit-argument resolution at binding sites.

use std::collections::HashMap;

use crate::ast::expr::Expr;
use crate::ast::pattern::{Pattern, PatternKind};
use crate::ast::typed::{TypedExpr, TypedExprKind, TypedPattern, TypedPatternKind};
use crate::ast::types::Explicitness;
use crate::ast::{Ident, LongIdent};
use crate::interner;
use crate::typechecker::error::{ErrorKind, TypeError};
use crate::typechecker::infer::{Checker, PendingImplicit};
use crate::typechecker::pattern::{check_pattern, BindMode};
use crate::typechecker::types::{ImplicitId, TypeKind};

impl Checker {
    /// Check the right-hand side of a binding in a scope of its own, then
    /// close the binding: resolve or abstract the implicit holes it produced,
    /// generalize, and bind the pattern's names.
    pub(crate) fn check_binding(
        &mut self,
        pat: &Pattern,
        expr: &Expr,
        toplevel: bool,
    ) -> Result<(TypedPattern, TypedExpr), TypeError> {
        let mark = self.pending.len();
        self.env.open_scope();
        let binding_depth = self.env.depth();
        let expected = self.env.fresh_var(None, expr.span);
        let mut typed = self.check_expr(expected, expr)?;
        self.env.close_scope();

        // Split this binding's holes into the ones whose types live entirely
        // at this binding's depth and the ones mentioning enclosing-scope
        // variables; the latter float out to the enclosing binding.
        let created = self.pending.split_off(mark);
        let (local, deferred): (Vec<PendingImplicit>, Vec<PendingImplicit>) =
            created.into_iter().partition(|hole| {
                self.env
                    .table
                    .free_vars_at_depth(hole.ty, 0)
                    .iter()
                    .all(|var| match self.env.table.kind(*var) {
                        TypeKind::Var { depth, .. } => *depth >= binding_depth,
                        _ => false,
                    })
            });
        self.pending.extend(deferred);

        let mut substitution: HashMap<ImplicitId, TypedExprKind> = HashMap::new();
        for hole in local {
            typed = self.resolve_implicit(hole, typed, toplevel, &mut substitution)?;
        }
        substitute_implicits(&mut typed, &substitution);

        // Generalize: a single-variable binding with leftover variables of
        // its own depth closes over them. The type is flattened first so the
        // scheme's body carries no instance-bearing variables.
        let flat = self.env.table.flatten(typed.ty);
        let free = self.env.table.free_vars_at_depth(flat, binding_depth);
        let typed_pat = match &pat.kind {
            PatternKind::Var(ident) if !free.is_empty() => {
                let scheme = self.env.table.alloc(
                    TypeKind::Poly {
                        vars: free,
                        body: flat,
                    },
                    typed.span,
                );
                log::debug!(
                    "bind {} : {}",
                    interner::resolve(ident.name),
                    self.env.table.show(scheme)
                );
                self.env.add_name(ident.name, scheme);
                TypedPattern {
                    span: pat.span,
                    ty: scheme,
                    kind: TypedPatternKind::Var(*ident),
                }
            }
            _ => check_pattern(&mut self.env, flat, pat, BindMode::Poly)?,
        };
        Ok((typed_pat, typed))
    }

    /// Resolve one implicit hole against the instances in scope. A unique
    /// match is committed; several matches are no unique instance at all; no
    /// match fails at toplevel and is abstracted over below it.
    fn resolve_implicit(
        &mut self,
        hole: PendingImplicit,
        typed: TypedExpr,
        toplevel: bool,
        substitution: &mut HashMap<ImplicitId, TypedExprKind>,
    ) -> Result<TypedExpr, TypeError> {
        let depth = self.env.depth();
        let mut matches = Vec::new();
        for (name, instance_ty) in self.env.instances_in_scope() {
            let snap = self.env.table.snapshot();
            let candidate = self.env.table.instantiate(instance_ty, depth);
            let unifies = self.env.table.try_unify(hole.ty, candidate);
            self.env.table.rollback(&snap);
            if unifies {
                matches.push((name, instance_ty));
            }
        }

        match matches.as_slice() {
            [(name, instance_ty)] => {
                let candidate = self.env.table.instantiate(*instance_ty, depth);
                self.env.table.unify(hole.span, hole.ty, candidate)?;
                log::debug!(
                    "implicit {} resolved to {}",
                    self.env.table.show(hole.ty),
                    interner::resolve(*name)
                );
                let reference = LongIdent::Bare(Ident::with_span(*name, hole.span));
                substitution.insert(hole.id, TypedExprKind::Var(reference));
                Ok(typed)
            }
            [] if toplevel => Err(TypeError::new(
                hole.span,
                ErrorKind::NoInstance(self.env.table.show(hole.ty)),
            )),
            [] => {
                // No instance yet: abstract over the hole so callers supply it.
                let param_name = interner::intern(&format!("__implicit{}", hole.id.0));
                let param = Ident::with_span(param_name, hole.span);
                substitution.insert(
                    hole.id,
                    TypedExprKind::Var(LongIdent::Bare(param)),
                );
                let fun_ty = self.env.table.arrow(
                    hole.ty,
                    typed.ty,
                    Explicitness::Implicit,
                    typed.span,
                );
                let span = typed.span;
                Ok(TypedExpr {
                    span,
                    ty: fun_ty,
                    kind: TypedExprKind::Fun(
                        TypedPattern {
                            span: hole.span,
                            ty: hole.ty,
                            kind: TypedPatternKind::Var(param),
                        },
                        Box::new(typed),
                        Explicitness::Implicit,
                    ),
                })
            }
            _ => Err(TypeError::new(
                hole.span,
                ErrorKind::NoInstance(self.env.table.show(hole.ty)),
            )),
        }
    }
}

/// Rewrite resolved implicit holes to their variable references. Holes absent
/// from the substitution were deferred to an enclosing binding and stay put.
fn substitute_implicits(expr: &mut TypedExpr, subst: &HashMap<ImplicitId, TypedExprKind>) {
    if let TypedExprKind::Implicit(id) = expr.kind {
        if let Some(replacement) = subst.get(&id) {
            expr.kind = replacement.clone();
        }
        return;
    }
    match &mut expr.kind {
        TypedExprKind::Implicit(_) | TypedExprKind::Var(_) | TypedExprKind::Int(_) => {}
        TypedExprKind::Fun(_, body, _) => substitute_implicits(body, subst),
        TypedExprKind::Apply(func, args) => {
            substitute_implicits(func, subst);
            for arg in args {
                substitute_implicits(arg, subst);
            }
        }
        TypedExprKind::Seq(first, second) => {
            substitute_implicits(first, subst);
            substitute_implicits(second, subst);
        }
        TypedExprKind::Let(_, value, body) => {
            substitute_implicits(value, subst);
            substitute_implicits(body, subst);
        }
        TypedExprKind::Tuple(elems) => {
            for elem in elems {
                substitute_implicits(elem, subst);
            }
        }
        TypedExprKind::Match(scrutinee, arms) => {
            substitute_implicits(scrutinee, subst);
            for (_, body) in arms {
                substitute_implicits(body, subst);
            }
        }
        TypedExprKind::Field(inner, _) => substitute_implicits(inner, subst),
        TypedExprKind::Record(fields, ext) => {
            for (_, value) in fields {
                substitute_implicits(value, subst);
            }
            if let Some(ext) = ext {
                substitute_implicits(ext, subst);
            }
        }
        TypedExprKind::Ctor(_, arg) => {
            if let Some(arg) = arg {
                substitute_implicits(arg, subst);
            }
        }
    }
}
