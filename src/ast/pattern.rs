use crate::ast::span::Span;
use crate::ast::types::TypeAnn;
use crate::ast::{Ident, LongIdent};

/// A surface pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub span: Span,
    pub kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// Wildcard `_`
    Any,
    /// Name binding
    Var(Ident),
    /// Constrained pattern `(p : t)`
    Constraint(Box<Pattern>, TypeAnn),
    /// Tuple pattern; `()` matches the unit value
    Tuple(Vec<Pattern>),
    /// Alternative `p1 | p2`; both arms must bind the same names
    Or(Box<Pattern>, Box<Pattern>),
    /// Integer literal pattern
    Int(i64),
    /// Record pattern `{f = p; ...}`; unmentioned fields are ignored
    Record(Vec<(Ident, Pattern)>),
    /// Variant constructor pattern
    Ctor(LongIdent, Option<Box<Pattern>>),
}

impl Pattern {
    fn new(kind: PatternKind) -> Self {
        Pattern {
            span: Span::default(),
            kind,
        }
    }

    pub fn any() -> Self {
        Self::new(PatternKind::Any)
    }

    pub fn var(name: &str) -> Self {
        Self::new(PatternKind::Var(Ident::new(name)))
    }

    pub fn constraint(pat: Pattern, ann: TypeAnn) -> Self {
        Self::new(PatternKind::Constraint(Box::new(pat), ann))
    }

    pub fn tuple(elems: Vec<Pattern>) -> Self {
        Self::new(PatternKind::Tuple(elems))
    }

    pub fn or(left: Pattern, right: Pattern) -> Self {
        Self::new(PatternKind::Or(Box::new(left), Box::new(right)))
    }

    pub fn int(value: i64) -> Self {
        Self::new(PatternKind::Int(value))
    }

    pub fn record(fields: Vec<(&str, Pattern)>) -> Self {
        Self::new(PatternKind::Record(
            fields
                .into_iter()
                .map(|(name, p)| (Ident::new(name), p))
                .collect(),
        ))
    }

    pub fn ctor(name: &str, arg: Option<Pattern>) -> Self {
        Self::new(PatternKind::Ctor(LongIdent::bare(name), arg.map(Box::new)))
    }
}
