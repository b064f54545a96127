use crate::ast::span::Span;
use crate::ast::types::Explicitness;
use crate::interner::Symbol;

/// Unique identifier of an allocated type expression.
/// The expression itself lives in the [`TypeTable`](super::unify::TypeTable)
/// arena; any instance a variable acquires is stored in the table's side
/// array, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

/// Unique identifier of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

/// Identifier of a pending implicit-argument hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplicitId(pub u32);

/// An allocated type expression. Two expressions with the same `id` are
/// identical; equality up to substitution is the unifier's business.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: TypeId,
    pub span: Span,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Unification variable. `depth` is the scope depth it was introduced at;
    /// generalization quantifies exactly the variables deeper than the
    /// binding's enclosing scope.
    Var { name: Option<Symbol>, depth: usize },

    /// Prenex quantifier. `vars` are `Var` expressions; a `Poly` never nests
    /// inside another `Poly`, an arrow, a tuple, or constructor parameters.
    Poly { vars: Vec<TypeId>, body: TypeId },

    /// Function type
    Arrow {
        dom: TypeId,
        cod: TypeId,
        mode: Explicitness,
    },

    /// Ordered tuple; the empty tuple is the unit type. 1-tuples do not
    /// exist: [`TypeTable::tuple`](super::unify::TypeTable::tuple) folds them
    /// to their element.
    Tuple(Vec<TypeId>),

    /// Named type constructor applied to parameters
    Ctor {
        name: Symbol,
        params: Vec<TypeId>,
        decl: DeclId,
    },
}

/// A registered type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub ident: Symbol,
    /// Formal parameters, as `Var` expressions. Instantiation copies the body
    /// with these mapped to fresh variables.
    pub params: Vec<TypeId>,
    pub id: DeclId,
    pub body: DeclBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclBody {
    /// No body; only equal to itself
    Abstract,
    /// Transparent alias, unfolded during unification
    Alias(TypeId),
    /// Ordered fields; a field's index is its position
    Record(Vec<FieldDecl>),
    Variant(Vec<CtorInfo>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Symbol,
    pub ty: TypeId,
}

/// One constructor of a variant declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct CtorInfo {
    pub name: Symbol,
    pub args: CtorArgsInfo,
    /// Explicit return type; `None` means the declared type applied to its
    /// own parameters.
    pub ret: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CtorArgsInfo {
    /// Argument type; the unit type for nullary constructors, the element
    /// itself for single-argument constructors.
    Tuple(TypeId),
    /// Inline record argument, registered as its own declaration sharing the
    /// variant's parameters.
    Record(DeclId),
}
