use crate::ast::span::Span;
use crate::ast::{Ident, LongIdent};

/// Whether a function argument is passed explicitly at call sites or supplied
/// by implicit-instance lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Explicitness {
    Explicit,
    Implicit,
}

/// A surface type annotation, as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnn {
    pub span: Span,
    pub kind: TypeAnnKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnKind {
    /// A named type variable: `'a`
    Var(Ident),
    /// Function type; implicit domains are written `{t} -> u`
    Arrow(Box<TypeAnn>, Box<TypeAnn>, Explicitness),
    /// Ordered tuple; `()` is the unit type
    Tuple(Vec<TypeAnn>),
    /// Named type constructor applied to parameters: `int`, `'a list`
    Ctor(LongIdent, Vec<TypeAnn>),
    /// Prenex quantifier: `forall 'a 'b. t`
    Poly(Vec<Ident>, Box<TypeAnn>),
}

impl TypeAnn {
    fn new(kind: TypeAnnKind) -> Self {
        TypeAnn {
            span: Span::default(),
            kind,
        }
    }

    pub fn var(name: &str) -> Self {
        Self::new(TypeAnnKind::Var(Ident::new(name)))
    }

    pub fn arrow(dom: TypeAnn, cod: TypeAnn) -> Self {
        Self::new(TypeAnnKind::Arrow(
            Box::new(dom),
            Box::new(cod),
            Explicitness::Explicit,
        ))
    }

    pub fn implicit_arrow(dom: TypeAnn, cod: TypeAnn) -> Self {
        Self::new(TypeAnnKind::Arrow(
            Box::new(dom),
            Box::new(cod),
            Explicitness::Implicit,
        ))
    }

    pub fn tuple(elems: Vec<TypeAnn>) -> Self {
        Self::new(TypeAnnKind::Tuple(elems))
    }

    pub fn unit() -> Self {
        Self::tuple(vec![])
    }

    pub fn ctor(name: &str, params: Vec<TypeAnn>) -> Self {
        Self::new(TypeAnnKind::Ctor(LongIdent::bare(name), params))
    }

    pub fn int() -> Self {
        Self::ctor("int", vec![])
    }

    pub fn poly(vars: Vec<&str>, body: TypeAnn) -> Self {
        Self::new(TypeAnnKind::Poly(
            vars.into_iter().map(Ident::new).collect(),
            Box::new(body),
        ))
    }
}
