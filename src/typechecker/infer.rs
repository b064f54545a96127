use crate::ast::expr::{Expr, ExprKind};
use crate::ast::span::Span;
use crate::ast::typed::{TypedExpr, TypedExprKind};
use crate::ast::types::Explicitness;
use crate::typechecker::env::Env;
use crate::typechecker::error::{ErrorKind, TypeError};
use crate::typechecker::pattern::{check_pattern, resolve_record_decl, wrong_field, BindMode};
use crate::typechecker::types::{ImplicitId, TypeId, TypeKind};

/// An implicit-argument hole materialized at a variable occurrence, waiting
/// for the enclosing binding to resolve or abstract it.
#[derive(Debug, Clone, Copy)]
pub(super) struct PendingImplicit {
    pub id: ImplicitId,
    pub span: Span,
    pub ty: TypeId,
}

/// The expression checker. Holds the environment and the pending implicit
/// holes recorded since the innermost binding started.
pub struct Checker {
    pub env: Env,
    pub(super) pending: Vec<PendingImplicit>,
    next_implicit: u32,
}

impl Checker {
    pub fn new() -> Self {
        Self::with_env(Env::new())
    }

    pub fn with_env(env: Env) -> Self {
        Checker {
            env,
            pending: Vec::new(),
            next_implicit: 0,
        }
    }

    pub fn into_env(self) -> Env {
        self.env
    }

    fn fresh_implicit(&mut self, ty: TypeId, span: Span) -> ImplicitId {
        let id = ImplicitId(self.next_implicit);
        self.next_implicit += 1;
        self.pending.push(PendingImplicit { id, span, ty });
        id
    }

    /// Check an expression against an expected type, elaborating as we go.
    /// Children are visited left to right; the first offending subterm is the
    /// one reported.
    pub fn check_expr(&mut self, expected: TypeId, expr: &Expr) -> Result<TypedExpr, TypeError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Var(path) => self.check_var(expected, span, path),

            ExprKind::Int(value) => {
                let int = self.env.type_int(span);
                self.env.table.unify(span, expected, int)?;
                Ok(typed(span, expected, TypedExprKind::Int(*value)))
            }

            ExprKind::Apply(func, args) => {
                let func_var = self.env.fresh_var(None, func.span);
                let typed_func = self.check_expr(func_var, func)?;
                let mut current = func_var;
                let mut typed_args = Vec::new();
                for arg in args {
                    let arg_var = self.env.fresh_var(None, arg.span);
                    let res_var = self.env.fresh_var(None, span);
                    let arrow =
                        self.env
                            .table
                            .arrow(arg_var, res_var, Explicitness::Explicit, span);
                    self.env.table.unify(span, current, arrow)?;
                    typed_args.push(self.check_expr(arg_var, arg)?);
                    current = res_var;
                }
                self.env.table.unify(span, expected, current)?;
                Ok(typed(
                    span,
                    expected,
                    TypedExprKind::Apply(Box::new(typed_func), typed_args),
                ))
            }

            ExprKind::Fun(param, body, mode) => {
                self.env.open_scope();
                let param_var = self.env.fresh_var(None, param.span);
                let body_var = self.env.fresh_var(None, body.span);
                let arrow = self.env.table.arrow(param_var, body_var, *mode, span);
                self.env.table.unify(span, expected, arrow)?;
                let typed_param = check_pattern(&mut self.env, param_var, param, BindMode::Mono)?;
                let typed_body = self.check_expr(body_var, body)?;
                self.env.close_scope();
                Ok(typed(
                    span,
                    expected,
                    TypedExprKind::Fun(typed_param, Box::new(typed_body), *mode),
                ))
            }

            ExprKind::Seq(first, second) => {
                let unit = self.env.type_unit(first.span);
                let typed_first = self.check_expr(unit, first)?;
                let typed_second = self.check_expr(expected, second)?;
                Ok(typed(
                    span,
                    expected,
                    TypedExprKind::Seq(Box::new(typed_first), Box::new(typed_second)),
                ))
            }

            ExprKind::Let(pat, value, body) => {
                self.env.open_scope();
                let (typed_pat, typed_value) = self.check_binding(pat, value, false)?;
                let typed_body = self.check_expr(expected, body)?;
                self.env.close_scope();
                Ok(typed(
                    span,
                    expected,
                    TypedExprKind::Let(typed_pat, Box::new(typed_value), Box::new(typed_body)),
                ))
            }

            ExprKind::Constraint(inner, ann) => {
                let annotated = self.env.import_type(ann)?;
                self.env.table.unify(span, expected, annotated)?;
                let typed_inner = self.check_expr(annotated, inner)?;
                // Re-unify so the constraint also constrains the context when
                // checking refined `expected` in between.
                self.env.table.unify(span, expected, annotated)?;
                Ok(typed_inner)
            }

            ExprKind::Tuple(elems) => {
                let vars: Vec<TypeId> = elems
                    .iter()
                    .map(|e| self.env.fresh_var(None, e.span))
                    .collect();
                let tuple_ty = self.env.table.tuple(vars.clone(), span);
                self.env.table.unify(span, expected, tuple_ty)?;
                let elems = elems
                    .iter()
                    .zip(vars.iter())
                    .map(|(e, var)| self.check_expr(*var, e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(typed(span, expected, TypedExprKind::Tuple(elems)))
            }

            ExprKind::Match(scrutinee, arms) => {
                let scrutinee_var = self.env.fresh_var(None, scrutinee.span);
                let typed_scrutinee = self.check_expr(scrutinee_var, scrutinee)?;
                let mut typed_arms = Vec::new();
                for (pat, body) in arms {
                    self.env.open_scope();
                    let typed_pat =
                        check_pattern(&mut self.env, scrutinee_var, pat, BindMode::Poly)?;
                    let typed_body = self.check_expr(expected, body)?;
                    self.env.close_scope();
                    typed_arms.push((typed_pat, typed_body));
                }
                Ok(typed(
                    span,
                    expected,
                    TypedExprKind::Match(Box::new(typed_scrutinee), typed_arms),
                ))
            }

            ExprKind::Field(inner, field) => self.check_field(expected, span, inner, field),

            ExprKind::Record(fields, extension) => {
                self.check_record(expected, span, fields, extension.as_deref())
            }

            ExprKind::Ctor(path, arg) => {
                let (decl, index) = self.env.find_ctor(path)?;
                let (ret_ty, arg_ty) = self.env.instantiate_ctor(decl, index, span)?;
                self.env.table.unify(span, expected, ret_ty)?;
                let arg = match arg {
                    Some(value) => Some(Box::new(self.check_expr(arg_ty, value)?)),
                    None => {
                        let unit = self.env.type_unit(span);
                        self.env.table.unify(span, arg_ty, unit).map_err(|_| {
                            TypeError::new(span, ErrorKind::ArgumentExpected(path.to_string()))
                        })?;
                        None
                    }
                };
                Ok(typed(span, expected, TypedExprKind::Ctor(path.clone(), arg)))
            }
        }
    }

    /// A variable occurrence. The stored scheme is instantiated, then every
    /// leading implicit arrow is applied to a fresh hole; only the resulting
    /// head type meets `expected`. This is the sole place implicit arguments
    /// come into existence.
    fn check_var(
        &mut self,
        expected: TypeId,
        span: Span,
        path: &crate::ast::LongIdent,
    ) -> Result<TypedExpr, TypeError> {
        let stored = self.env.find_name(path)?;
        let depth = self.env.depth();
        let mut ty = self.env.table.instantiate(stored, depth);
        let mut result = typed(span, ty, TypedExprKind::Var(path.clone()));
        loop {
            let head = self.env.table.repr(ty);
            match self.env.table.kind(head).clone() {
                TypeKind::Poly { body, .. } => ty = body,
                TypeKind::Arrow {
                    dom,
                    cod,
                    mode: Explicitness::Implicit,
                } => {
                    let hole = self.fresh_implicit(dom, span);
                    let hole_expr = typed(span, dom, TypedExprKind::Implicit(hole));
                    result = typed(
                        span,
                        cod,
                        TypedExprKind::Apply(Box::new(result), vec![hole_expr]),
                    );
                    ty = cod;
                }
                _ => break,
            }
        }
        self.env.table.unify(span, expected, ty)?;
        Ok(result)
    }

    fn check_field(
        &mut self,
        expected: TypeId,
        span: Span,
        inner: &Expr,
        field: &crate::ast::LongIdent,
    ) -> Result<TypedExpr, TypeError> {
        let inner_var = self.env.fresh_var(None, inner.span);
        let typed_inner = self.check_expr(inner_var, inner)?;

        // A module-qualified field picks its declaration directly; a bare
        // field first consults the inferred type of the expression.
        let (decl, field_name) = match field {
            crate::ast::LongIdent::Bare(ident) => {
                let resolved = self.env.table.unalias(inner_var);
                let decl = match self.env.table.kind(resolved) {
                    TypeKind::Ctor { decl, .. } => *decl,
                    TypeKind::Var { .. } => self.env.find_field(field)?.0,
                    _ => return Err(wrong_field(&self.env, *ident, resolved)),
                };
                (decl, *ident)
            }
            _ => {
                let (decl, _) = self.env.find_field(field)?;
                let ident = field
                    .last()
                    .ok_or_else(|| {
                        TypeError::new(span, ErrorKind::UnsupportedPath(field.to_string()))
                    })?;
                (decl, ident)
            }
        };

        let (record_ty, mut map) = self.env.instantiate_decl(decl, span);
        self.env.table.unify(span, inner_var, record_ty)?;
        let (_, field_ty) = self
            .env
            .field_in_decl(decl, field_name.name)
            .ok_or_else(|| wrong_field(&self.env, field_name, record_ty))?;
        let depth = self.env.depth();
        let field_ty = self.env.table.copy(field_ty, &mut map, depth);
        self.env.table.unify(span, expected, field_ty)?;
        Ok(typed(
            span,
            expected,
            TypedExprKind::Field(Box::new(typed_inner), field.clone()),
        ))
    }

    fn check_record(
        &mut self,
        expected: TypeId,
        span: Span,
        fields: &[(crate::ast::Ident, Expr)],
        extension: Option<&Expr>,
    ) -> Result<TypedExpr, TypeError> {
        if fields.is_empty() {
            return Err(TypeError::new(span, ErrorKind::EmptyRecord));
        }
        // An extended literal has the extension's type; checking the
        // extension against `expected` funnels both cases into one type.
        let typed_ext = match extension {
            Some(ext) => Some(Box::new(self.check_expr(expected, ext)?)),
            None => None,
        };
        let decl = resolve_record_decl(&mut self.env, expected, &fields[0].0)?;
        let (record_ty, mut map) = self.env.instantiate_decl(decl, span);
        self.env.table.unify(span, expected, record_ty)?;

        let declared = self.env.record_fields(decl).ok_or_else(|| {
            wrong_field(&self.env, fields[0].0, record_ty)
        })?;
        let mut filled = vec![false; declared.len()];
        let depth = self.env.depth();
        let mut typed_fields = Vec::new();
        for (ident, value) in fields {
            let (index, field_ty) = self
                .env
                .field_in_decl(decl, ident.name)
                .ok_or_else(|| wrong_field(&self.env, *ident, record_ty))?;
            if filled[index] {
                return Err(TypeError::new(
                    ident.span,
                    ErrorKind::RepeatedField(crate::interner::resolve(ident.name)),
                ));
            }
            filled[index] = true;
            let field_ty = self.env.table.copy(field_ty, &mut map, depth);
            typed_fields.push((*ident, self.check_expr(field_ty, value)?));
        }
        if typed_ext.is_none() {
            let missing: Vec<String> = declared
                .iter()
                .zip(filled.iter())
                .filter(|(_, filled)| !**filled)
                .map(|(name, _)| crate::interner::resolve(*name))
                .collect();
            if !missing.is_empty() {
                return Err(TypeError::new(span, ErrorKind::MissingFields(missing)));
            }
        }
        Ok(typed(
            span,
            expected,
            TypedExprKind::Record(typed_fields, typed_ext),
        ))
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

fn typed(span: Span, ty: TypeId, kind: TypedExprKind) -> TypedExpr {
    TypedExpr { span, ty, kind }
}
