use crate::ast::pattern::Pattern;
use crate::ast::span::Span;
use crate::ast::types::{Explicitness, TypeAnn};
use crate::ast::{Ident, LongIdent};

/// A surface expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Variable or value reference, possibly module-qualified
    Var(LongIdent),
    /// Integer literal
    Int(i64),
    /// Single-parameter function; implicit parameters are written `fun {p} -> e`
    Fun(Pattern, Box<Expr>, Explicitness),
    /// Application to one or more explicit arguments, left to right
    Apply(Box<Expr>, Vec<Expr>),
    /// Sequencing: `e1; e2`: `e1` must have the unit type
    Seq(Box<Expr>, Box<Expr>),
    /// `let p = e1 in e2`
    Let(Pattern, Box<Expr>, Box<Expr>),
    /// Type constraint: `(e : t)`
    Constraint(Box<Expr>, TypeAnn),
    /// Tuple literal; `()` is the unit value
    Tuple(Vec<Expr>),
    /// `match e with p1 -> e1 | ...`
    Match(Box<Expr>, Vec<(Pattern, Expr)>),
    /// Field projection `e.f`; the field name may be module-qualified
    Field(Box<Expr>, LongIdent),
    /// Record literal `{f = e; ...}` with optional extension `{e with f = ...}`
    Record(Vec<(Ident, Expr)>, Option<Box<Expr>>),
    /// Variant constructor application
    Ctor(LongIdent, Option<Box<Expr>>),
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Expr {
            span: Span::default(),
            kind,
        }
    }

    pub fn var(name: &str) -> Self {
        Self::new(ExprKind::Var(LongIdent::bare(name)))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Int(value))
    }

    pub fn fun(param: Pattern, body: Expr) -> Self {
        Self::new(ExprKind::Fun(param, Box::new(body), Explicitness::Explicit))
    }

    pub fn fun_implicit(param: Pattern, body: Expr) -> Self {
        Self::new(ExprKind::Fun(param, Box::new(body), Explicitness::Implicit))
    }

    pub fn apply(f: Expr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Apply(Box::new(f), args))
    }

    pub fn seq(first: Expr, second: Expr) -> Self {
        Self::new(ExprKind::Seq(Box::new(first), Box::new(second)))
    }

    pub fn let_in(pat: Pattern, value: Expr, body: Expr) -> Self {
        Self::new(ExprKind::Let(pat, Box::new(value), Box::new(body)))
    }

    pub fn constraint(expr: Expr, ann: TypeAnn) -> Self {
        Self::new(ExprKind::Constraint(Box::new(expr), ann))
    }

    pub fn tuple(elems: Vec<Expr>) -> Self {
        Self::new(ExprKind::Tuple(elems))
    }

    pub fn unit() -> Self {
        Self::tuple(vec![])
    }

    pub fn match_with(scrutinee: Expr, arms: Vec<(Pattern, Expr)>) -> Self {
        Self::new(ExprKind::Match(Box::new(scrutinee), arms))
    }

    pub fn field(expr: Expr, name: &str) -> Self {
        Self::new(ExprKind::Field(Box::new(expr), LongIdent::bare(name)))
    }

    pub fn record(fields: Vec<(&str, Expr)>, ext: Option<Expr>) -> Self {
        Self::new(ExprKind::Record(
            fields
                .into_iter()
                .map(|(name, e)| (Ident::new(name), e))
                .collect(),
            ext.map(Box::new),
        ))
    }

    pub fn ctor(name: &str, arg: Option<Expr>) -> Self {
        Self::new(ExprKind::Ctor(LongIdent::bare(name), arg.map(Box::new)))
    }
}
