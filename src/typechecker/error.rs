use std::fmt;

use thiserror::Error;

use crate::ast::span::Span;

/// What namespace an unbound or misplaced name was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Value,
    Field,
    Ctor,
    Module,
    Type,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameKind::Value => "value",
            NameKind::Field => "record field",
            NameKind::Ctor => "constructor",
            NameKind::Module => "module",
            NameKind::Type => "type",
        };
        write!(f, "{}", s)
    }
}

/// Type checking error kinds. Variants carry pretty-printed types so an error
/// stays displayable after the checker run that produced it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ErrorKind {
    /// Wrapper attached at the outermost unification call site, preserving
    /// the expected/actual pair the caller asked about.
    #[error("could not match type {expected} with {actual}: {inner}")]
    CheckFailed {
        expected: String,
        actual: String,
        inner: Box<ErrorKind>,
    },

    /// Structural mismatch
    #[error("cannot unify {0} with {1}")]
    CannotUnify(String, String),

    /// Occurs check failure
    #[error("the type variable {0} occurs within its own instance")]
    RecursiveVariable(String),

    /// Unknown identifier
    #[error("unbound {kind} {name}")]
    Unbound { kind: NameKind, name: String },

    /// `or`-pattern bind-set mismatch
    #[error("variable {0} must appear on both sides of this pattern")]
    VariableOnOneSide(String),

    /// Declaration inside a pattern
    #[error("{kind} {name} may not be declared within a pattern")]
    PatternDeclaration { kind: NameKind, name: String },

    /// Empty record literal or pattern
    #[error("record must contain at least one field")]
    EmptyRecord,

    /// Field does not belong to the expected record type
    #[error("field {field} does not belong to the type {ty}")]
    WrongRecordField { field: String, ty: String },

    /// Same field assigned twice in a record literal
    #[error("field {0} is assigned more than once")]
    RepeatedField(String),

    /// Record literal without extension leaves fields unassigned
    #[error("record is missing the fields {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// No unique implicit instance matches at a toplevel binding
    #[error("no instance found for {0}")]
    NoInstance(String),

    /// Argument-taking constructor used without an argument
    #[error("constructor {0} expects an argument")]
    ArgumentExpected(String),

    /// Applicative paths come out of the grammar but are not supported
    #[error("applicative path {0} is not supported")]
    UnsupportedPath(String),

    // The remaining variants indicate a checker bug, not a user error.
    #[error("internal error: elaborated expression still contains an implicit hole")]
    UnifiableExpr,

    #[error("internal error: no implicit hole to substitute")]
    NoUnifiableExpr,

    #[error("internal error: unexpected type description for {0}")]
    WrongTypeDescription(String),
}

/// A located type error. The first error raised aborts the check; there is no
/// recovery or multi-error reporting.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind}")]
pub struct TypeError {
    pub span: Span,
    pub kind: ErrorKind,
}

impl TypeError {
    pub fn new(span: Span, kind: ErrorKind) -> Self {
        TypeError { span, kind }
    }
}
