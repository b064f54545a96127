use crate::ast::pattern::{Pattern, PatternKind};
use crate::ast::span::Span;
use crate::ast::typed::{TypedPattern, TypedPatternKind};
use crate::ast::{Ident, LongIdent};
use crate::typechecker::env::Env;
use crate::typechecker::error::{ErrorKind, TypeError};
use crate::typechecker::types::{DeclId, TypeId, TypeKind};

/// How `check_pattern` binds the names a pattern introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Bind at a monomorphic type: a scheme is instantiated before binding.
    /// Function parameters bind this way.
    Mono,
    /// Bind the type unchanged, quantifiers included. Let and match-arm
    /// bindings bind this way.
    Poly,
}

/// Check a pattern against an expected type, binding the names it introduces
/// into the current scope.
pub fn check_pattern(
    env: &mut Env,
    expected: TypeId,
    pat: &Pattern,
    mode: BindMode,
) -> Result<TypedPattern, TypeError> {
    match &pat.kind {
        PatternKind::Any => Ok(typed(pat.span, expected, TypedPatternKind::Any)),

        PatternKind::Var(ident) => {
            bind(env, *ident, expected, mode);
            Ok(typed(pat.span, expected, TypedPatternKind::Var(*ident)))
        }

        PatternKind::Constraint(inner, ann) => {
            let annotated = env.import_type(ann)?;
            env.table.unify(pat.span, expected, annotated)?;
            check_pattern(env, annotated, inner, mode)
        }

        PatternKind::Tuple(elems) => {
            let vars: Vec<TypeId> = elems
                .iter()
                .map(|e| env.fresh_var(None, e.span))
                .collect();
            let tuple_ty = env.table.tuple(vars.clone(), pat.span);
            env.table.unify(pat.span, expected, tuple_ty)?;
            let elems = elems
                .iter()
                .zip(vars.iter())
                .map(|(sub, var)| check_pattern(env, *var, sub, mode))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(typed(pat.span, expected, TypedPatternKind::Tuple(elems)))
        }

        PatternKind::Or(left, right) => check_or_pattern(env, expected, pat.span, left, right, mode),

        PatternKind::Int(value) => {
            let int = env.type_int(pat.span);
            env.table.unify(pat.span, expected, int)?;
            Ok(typed(pat.span, expected, TypedPatternKind::Int(*value)))
        }

        PatternKind::Record(fields) => {
            if fields.is_empty() {
                return Err(TypeError::new(pat.span, ErrorKind::EmptyRecord));
            }
            let decl = resolve_record_decl(env, expected, &fields[0].0)?;
            let (record_ty, mut map) = env.instantiate_decl(decl, pat.span);
            env.table.unify(pat.span, expected, record_ty)?;
            let depth = env.depth();
            let mut elems = Vec::new();
            for (ident, sub) in fields {
                let (_, field_ty) = env.field_in_decl(decl, ident.name).ok_or_else(|| {
                    wrong_field(env, *ident, record_ty)
                })?;
                let field_ty = env.table.copy(field_ty, &mut map, depth);
                elems.push((*ident, check_pattern(env, field_ty, sub, mode)?));
            }
            Ok(typed(pat.span, expected, TypedPatternKind::Record(elems)))
        }

        PatternKind::Ctor(path, arg) => {
            let (decl, index) = env.find_ctor(path)?;
            let (ret_ty, arg_ty) = env.instantiate_ctor(decl, index, pat.span)?;
            env.table.unify(pat.span, expected, ret_ty)?;
            let arg = match arg {
                Some(sub) => Some(Box::new(check_pattern(env, arg_ty, sub, mode)?)),
                None => {
                    let unit = env.type_unit(pat.span);
                    env.table.unify(pat.span, arg_ty, unit).map_err(|_| {
                        TypeError::new(pat.span, ErrorKind::ArgumentExpected(path.to_string()))
                    })?;
                    None
                }
            };
            Ok(typed(
                pat.span,
                expected,
                TypedPatternKind::Ctor(path.clone(), arg),
            ))
        }
    }
}

fn typed(span: Span, ty: TypeId, kind: TypedPatternKind) -> TypedPattern {
    TypedPattern { span, ty, kind }
}

fn bind(env: &mut Env, ident: Ident, ty: TypeId, mode: BindMode) {
    let bound = match mode {
        BindMode::Mono => {
            let depth = env.depth();
            env.table.instantiate(ty, depth)
        }
        BindMode::Poly => ty,
    };
    env.add_name(ident.name, bound);
}

/// Check both arms of an `or`-pattern in scopes of their own, then verify the
/// two arms bind exactly the same names at unifiable types. The right arm's
/// bindings become the live ones.
fn check_or_pattern(
    env: &mut Env,
    expected: TypeId,
    span: Span,
    left: &Pattern,
    right: &Pattern,
    mode: BindMode,
) -> Result<TypedPattern, TypeError> {
    env.open_scope();
    let typed_left = check_pattern(env, expected, left, mode)?;
    let left_scope = env.close_scope();
    env.open_scope();
    let typed_right = check_pattern(env, expected, right, mode)?;
    let right_scope = env.close_scope();

    for scope in [&left_scope, &right_scope] {
        if let Some((kind, name)) = scope.non_value_declaration() {
            return Err(TypeError::new(
                span,
                ErrorKind::PatternDeclaration {
                    kind,
                    name: crate::interner::resolve(name),
                },
            ));
        }
    }

    for (name, left_ty) in &left_scope.names {
        match right_scope.names.get(name) {
            Some(right_ty) => env.table.unify(span, *left_ty, *right_ty)?,
            None => {
                return Err(TypeError::new(
                    span,
                    ErrorKind::VariableOnOneSide(crate::interner::resolve(*name)),
                ))
            }
        }
    }
    for name in right_scope.names.keys() {
        if !left_scope.names.contains_key(name) {
            return Err(TypeError::new(
                span,
                ErrorKind::VariableOnOneSide(crate::interner::resolve(*name)),
            ));
        }
    }

    env.absorb_scope(right_scope);
    Ok(typed(
        span,
        expected,
        TypedPatternKind::Or(Box::new(typed_left), Box::new(typed_right)),
    ))
}

/// Discover the record declaration a record pattern or literal refers to:
/// unalias the expected type if it is already constrained, otherwise look the
/// first mentioned field up in the environment.
pub(super) fn resolve_record_decl(
    env: &mut Env,
    expected: TypeId,
    first_field: &Ident,
) -> Result<DeclId, TypeError> {
    let resolved = env.table.unalias(expected);
    match env.table.kind(resolved) {
        TypeKind::Ctor { decl, .. } => Ok(*decl),
        TypeKind::Var { .. } => {
            let path = LongIdent::Bare(*first_field);
            Ok(env.find_field(&path)?.0)
        }
        _ => Err(wrong_field(env, *first_field, resolved)),
    }
}

pub(super) fn wrong_field(env: &Env, field: Ident, ty: TypeId) -> TypeError {
    TypeError::new(
        field.span,
        ErrorKind::WrongRecordField {
            field: crate::interner::resolve(field.name),
            ty: env.table.show(ty),
        },
    )
}
