//! Surface syntax tree for Verdin.
//!
//! This is what the parser hands to the typechecker: every node carries the
//! exact source span it was parsed from, and all identifier text is interned.
//! The typechecker never re-reads source text; spans exist for error
//! reporting only.

pub mod expr;
pub mod pattern;
pub mod span;
pub mod statement;
pub mod typed;
pub mod types;

use std::fmt;

use crate::interner::{self, Symbol};

pub use expr::{Expr, ExprKind};
pub use pattern::{Pattern, PatternKind};
pub use span::{Span, Spanned};
pub use statement::{
    CtorArgs, CtorDecl, ModuleExpr, Statement, StatementKind, TypeDecl, TypeDeclBody,
};
pub use typed::{TypedExpr, TypedExprKind, TypedPattern, TypedPatternKind, TypedStatement};
pub use types::{Explicitness, TypeAnn, TypeAnnKind};

/// A simple identifier: a non-empty interned name with its source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident {
    pub name: Symbol,
    pub span: Span,
}

impl Ident {
    pub fn new(name: &str) -> Self {
        Ident {
            name: interner::intern(name),
            span: Span::default(),
        }
    }

    pub fn with_span(name: Symbol, span: Span) -> Self {
        Ident { name, span }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", interner::resolve(self.name))
    }
}

/// A module-qualified identifier chain.
///
/// `Applied` is admitted by the grammar for functor-style paths but is not
/// supported by the checker; it raises a hard error when resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LongIdent {
    Bare(Ident),
    Dotted(Box<LongIdent>, Ident),
    Applied(Box<LongIdent>, Box<LongIdent>),
}

impl LongIdent {
    pub fn bare(name: &str) -> Self {
        LongIdent::Bare(Ident::new(name))
    }

    pub fn dotted(path: LongIdent, name: &str) -> Self {
        LongIdent::Dotted(Box::new(path), Ident::new(name))
    }

    /// The rightmost simple identifier of the chain, if the chain is not
    /// `Applied`.
    pub fn last(&self) -> Option<Ident> {
        match self {
            LongIdent::Bare(id) => Some(*id),
            LongIdent::Dotted(_, id) => Some(*id),
            LongIdent::Applied(_, _) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LongIdent::Bare(id) => id.span,
            LongIdent::Dotted(path, id) => path.span().merge(id.span),
            LongIdent::Applied(path, arg) => path.span().merge(arg.span()),
        }
    }
}

impl fmt::Display for LongIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LongIdent::Bare(id) => write!(f, "{}", id),
            LongIdent::Dotted(path, id) => write!(f, "{}.{}", path, id),
            LongIdent::Applied(path, arg) => write!(f, "{}({})", path, arg),
        }
    }
}
