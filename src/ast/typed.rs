//! The elaborated tree produced by the typechecker.
//!
//! Mirrors the surface tree, with every expression and pattern node annotated
//! with the [`TypeId`] the checker inferred for it. Annotations are arena
//! indices; render them through the environment's type table.

use crate::ast::span::Span;
use crate::ast::types::Explicitness;
use crate::ast::{Ident, LongIdent};
use crate::typechecker::types::{DeclId, ImplicitId, TypeId};

#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub span: Span,
    pub ty: TypeId,
    pub kind: TypedExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    Var(LongIdent),
    Int(i64),
    Fun(TypedPattern, Box<TypedExpr>, Explicitness),
    Apply(Box<TypedExpr>, Vec<TypedExpr>),
    Seq(Box<TypedExpr>, Box<TypedExpr>),
    Let(TypedPattern, Box<TypedExpr>, Box<TypedExpr>),
    Tuple(Vec<TypedExpr>),
    Match(Box<TypedExpr>, Vec<(TypedPattern, TypedExpr)>),
    Field(Box<TypedExpr>, LongIdent),
    Record(Vec<(Ident, TypedExpr)>, Option<Box<TypedExpr>>),
    Ctor(LongIdent, Option<Box<TypedExpr>>),
    /// An implicit-argument hole. These only exist while a binding is being
    /// checked; the implicit resolver rewrites every hole to a variable
    /// reference (or an abstracted parameter) before the binding completes.
    Implicit(ImplicitId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedPattern {
    pub span: Span,
    pub ty: TypeId,
    pub kind: TypedPatternKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedPatternKind {
    Any,
    Var(Ident),
    Tuple(Vec<TypedPattern>),
    Or(Box<TypedPattern>, Box<TypedPattern>),
    Int(i64),
    Record(Vec<(Ident, TypedPattern)>),
    Ctor(LongIdent, Option<Box<TypedPattern>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedStatement {
    pub span: Span,
    pub kind: TypedStatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStatementKind {
    Value(TypedPattern, TypedExpr),
    Instance(Ident, TypedExpr),
    TypeDecl(Ident, DeclId),
    Module(Ident, Vec<TypedStatement>),
    ModuleAlias(Ident, LongIdent),
    Open(LongIdent),
}
