use crate::ast::expr::Expr;
use crate::ast::pattern::Pattern;
use crate::ast::span::Span;
use crate::ast::types::TypeAnn;
use crate::ast::{Ident, LongIdent};

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `let p = e`
    Value(Pattern, Expr),
    /// `instance name = e`: a value binding also registered for
    /// implicit-argument lookup
    Instance(Ident, Expr),
    /// `type ('a, ...) name = ...`
    TypeDecl(TypeDecl),
    /// `module Name = struct ... end` or `module Name = Other`
    Module(Ident, ModuleExpr),
    /// `open Path`
    Open(LongIdent),
}

/// The right-hand side of a module binding.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleExpr {
    Structure(Vec<Statement>),
    Name(LongIdent),
}

/// A surface type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: TypeDeclBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclBody {
    /// Declared with no body: `type t`
    Abstract,
    /// Transparent alias: `type t = u`
    Alias(TypeAnn),
    /// Record: `type t = {f : u; ...}`: field order is significant
    Record(Vec<(Ident, TypeAnn)>),
    /// Variant: `type t = A of u | B | ...`
    Variant(Vec<CtorDecl>),
}

/// One constructor of a variant declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct CtorDecl {
    pub name: Ident,
    pub args: CtorArgs,
    /// Explicit return type, for constructors whose result refines the
    /// declared type's parameters
    pub ret: Option<TypeAnn>,
}

/// A constructor's argument shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CtorArgs {
    /// Zero or more positional arguments; a single argument is carried
    /// directly rather than as a 1-tuple
    Tuple(Vec<TypeAnn>),
    /// Inline record argument: `A of {f : t; ...}`
    Record(Vec<(Ident, TypeAnn)>),
}

impl Statement {
    fn new(kind: StatementKind) -> Self {
        Statement {
            span: Span::default(),
            kind,
        }
    }

    pub fn value(pat: Pattern, expr: Expr) -> Self {
        Self::new(StatementKind::Value(pat, expr))
    }

    pub fn instance(name: &str, expr: Expr) -> Self {
        Self::new(StatementKind::Instance(Ident::new(name), expr))
    }

    pub fn type_decl(name: &str, params: Vec<&str>, body: TypeDeclBody) -> Self {
        Self::new(StatementKind::TypeDecl(TypeDecl {
            name: Ident::new(name),
            params: params.into_iter().map(Ident::new).collect(),
            body,
        }))
    }

    pub fn module(name: &str, body: Vec<Statement>) -> Self {
        Self::new(StatementKind::Module(
            Ident::new(name),
            ModuleExpr::Structure(body),
        ))
    }

    pub fn module_alias(name: &str, target: LongIdent) -> Self {
        Self::new(StatementKind::Module(
            Ident::new(name),
            ModuleExpr::Name(target),
        ))
    }

    pub fn open(path: LongIdent) -> Self {
        Self::new(StatementKind::Open(path))
    }
}

impl CtorDecl {
    pub fn new(name: &str, args: Vec<TypeAnn>) -> Self {
        CtorDecl {
            name: Ident::new(name),
            args: CtorArgs::Tuple(args),
            ret: None,
        }
    }
}
