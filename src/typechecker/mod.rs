pub mod types;
pub mod error;
pub mod unify;
pub mod env;
pub mod pattern;
pub mod infer;
pub mod implicits;
pub mod check;

use crate::ast::expr::Expr;
use crate::ast::statement::Statement;
use crate::ast::typed::{TypedExpr, TypedStatement};
use crate::typechecker::env::Env;
use crate::typechecker::error::TypeError;
use crate::typechecker::infer::Checker;

/// The result of a successful run: the elaborated statements and the
/// environment enriched with every top-level binding, type declaration, and
/// implicit instance.
#[derive(Debug)]
pub struct Checked {
    pub statements: Vec<TypedStatement>,
    pub env: Env,
}

/// Typecheck a whole program against the seed environment.
pub fn check_statements(statements: &[Statement]) -> Result<Checked, TypeError> {
    check_with_env(Env::new(), statements)
}

/// Typecheck a whole program against a pre-populated environment.
pub fn check_with_env(env: Env, statements: &[Statement]) -> Result<Checked, TypeError> {
    let mut checker = Checker::with_env(env);
    let statements = checker.check_statements(statements)?;
    Ok(Checked {
        statements,
        env: checker.into_env(),
    })
}

/// Infer the type of a single expression in the seed environment. Implicit
/// holes the expression produces are left pending; use a binding statement
/// to have them resolved.
pub fn infer_expr(expr: &Expr) -> Result<(TypedExpr, Env), TypeError> {
    let mut checker = Checker::new();
    let expected = checker.env.fresh_var(None, expr.span);
    let typed = checker.check_expr(expected, expr)?;
    Ok((typed, checker.into_env()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::statement::{CtorDecl, TypeDeclBody};
    use crate::ast::typed::{TypedExprKind, TypedStatementKind};
    use crate::ast::types::TypeAnn;
    use crate::ast::{Expr, LongIdent, Pattern, Statement};
    use crate::typechecker::error::ErrorKind;

    // ===== Helpers =====

    fn assert_top_type(statements: Vec<Statement>, name: &str, expected: &str) {
        match check_statements(&statements) {
            Ok(checked) => {
                let ty = checked
                    .env
                    .type_of(name)
                    .unwrap_or_else(|| panic!("name '{}' not bound after checking", name));
                assert_eq!(checked.env.table.show(ty), expected, "for name '{}'", name);
            }
            Err(e) => panic!("type error: {}", e),
        }
    }

    fn check_error(statements: Vec<Statement>) -> ErrorKind {
        match check_statements(&statements) {
            Ok(_) => panic!("expected a type error"),
            Err(e) => e.kind,
        }
    }

    /// Unwrap the `CheckFailed` wrapper down to the innermost cause.
    fn innermost(kind: ErrorKind) -> ErrorKind {
        match kind {
            ErrorKind::CheckFailed { inner, .. } => innermost(*inner),
            other => other,
        }
    }

    fn either_decl() -> Statement {
        Statement::type_decl(
            "either",
            vec![],
            TypeDeclBody::Variant(vec![
                CtorDecl::new("A", vec![TypeAnn::int()]),
                CtorDecl::new("B", vec![TypeAnn::int()]),
            ]),
        )
    }

    fn point_decl() -> Statement {
        Statement::type_decl(
            "point",
            vec![],
            TypeDeclBody::Record(vec![
                (crate::ast::Ident::new("x"), TypeAnn::int()),
                (crate::ast::Ident::new("y"), TypeAnn::int()),
            ]),
        )
    }

    /// `type 'a show = { impl : 'a -> int }` plus `let show = fun {d} -> fun x -> d.impl x`,
    /// giving `show : forall 'a. {'a show} -> 'a -> int`.
    fn show_prelude() -> Vec<Statement> {
        vec![
            Statement::type_decl(
                "show",
                vec!["a"],
                TypeDeclBody::Record(vec![(
                    crate::ast::Ident::new("impl"),
                    TypeAnn::arrow(TypeAnn::var("a"), TypeAnn::int()),
                )]),
            ),
            Statement::value(
                Pattern::var("show"),
                Expr::fun_implicit(
                    Pattern::var("d"),
                    Expr::fun(
                        Pattern::var("x"),
                        Expr::apply(Expr::field(Expr::var("d"), "impl"), vec![Expr::var("x")]),
                    ),
                ),
            ),
        ]
    }

    fn show_int_instance() -> Statement {
        Statement::instance(
            "show_int",
            Expr::record(
                vec![("impl", Expr::fun(Pattern::var("x"), Expr::var("x")))],
                None,
            ),
        )
    }

    // ===== Literals and simple bindings =====

    #[test]
    fn test_int_literal() {
        assert_top_type(
            vec![Statement::value(Pattern::var("n"), Expr::int(42))],
            "n",
            "int",
        );
    }

    #[test]
    fn test_unit_literal() {
        assert_top_type(
            vec![Statement::value(Pattern::var("u"), Expr::unit())],
            "u",
            "()",
        );
    }

    #[test]
    fn test_tuple_literal() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("t"),
                Expr::tuple(vec![Expr::int(1), Expr::tuple(vec![Expr::int(2), Expr::int(3)])]),
            )],
            "t",
            "(int, (int, int))",
        );
    }

    #[test]
    fn test_tuple_pattern_binding() {
        assert_top_type(
            vec![Statement::value(
                Pattern::tuple(vec![Pattern::var("a"), Pattern::var("b")]),
                Expr::tuple(vec![Expr::int(1), Expr::unit()]),
            )],
            "b",
            "()",
        );
    }

    // ===== Functions and generalization =====

    #[test]
    fn test_identity_generalizes() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("id"),
                Expr::fun(Pattern::var("x"), Expr::var("x")),
            )],
            "id",
            "forall 'a. 'a -> 'a",
        );
    }

    #[test]
    fn test_pair_constructor() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("pair"),
                Expr::fun(
                    Pattern::var("x"),
                    Expr::fun(
                        Pattern::var("y"),
                        Expr::tuple(vec![Expr::var("x"), Expr::var("y")]),
                    ),
                ),
            )],
            "pair",
            "forall 'a 'b. 'a -> 'b -> ('a, 'b)",
        );
    }

    #[test]
    fn test_apply_polymorphic_function() {
        assert_top_type(
            vec![
                Statement::value(
                    Pattern::var("id"),
                    Expr::fun(Pattern::var("x"), Expr::var("x")),
                ),
                Statement::value(
                    Pattern::var("n"),
                    Expr::apply(Expr::var("id"), vec![Expr::int(1)]),
                ),
            ],
            "n",
            "int",
        );
    }

    #[test]
    fn test_let_polymorphism_two_uses() {
        // let f = fun x -> let id = fun y -> y in (id x, id 1)
        assert_top_type(
            vec![Statement::value(
                Pattern::var("f"),
                Expr::fun(
                    Pattern::var("x"),
                    Expr::let_in(
                        Pattern::var("id"),
                        Expr::fun(Pattern::var("y"), Expr::var("y")),
                        Expr::tuple(vec![
                            Expr::apply(Expr::var("id"), vec![Expr::var("x")]),
                            Expr::apply(Expr::var("id"), vec![Expr::int(1)]),
                        ]),
                    ),
                ),
            )],
            "f",
            "forall 'a. 'a -> ('a, int)",
        );
    }

    #[test]
    fn test_lambda_parameter_stays_monomorphic() {
        // fun f -> (f 1, f ()) must fail: f is a lambda parameter
        let err = check_error(vec![Statement::value(
            Pattern::var("g"),
            Expr::fun(
                Pattern::var("f"),
                Expr::tuple(vec![
                    Expr::apply(Expr::var("f"), vec![Expr::int(1)]),
                    Expr::apply(Expr::var("f"), vec![Expr::unit()]),
                ]),
            ),
        )]);
        assert!(matches!(innermost(err), ErrorKind::CannotUnify(_, _)));
    }

    #[test]
    fn test_occurs_check() {
        let err = check_error(vec![Statement::value(
            Pattern::var("f"),
            Expr::fun(
                Pattern::var("x"),
                Expr::apply(Expr::var("x"), vec![Expr::var("x")]),
            ),
        )]);
        assert!(matches!(innermost(err), ErrorKind::RecursiveVariable(_)));
    }

    #[test]
    fn test_apply_non_function() {
        let err = check_error(vec![Statement::value(
            Pattern::var("n"),
            Expr::apply(Expr::int(1), vec![Expr::int(2)]),
        )]);
        assert!(matches!(innermost(err), ErrorKind::CannotUnify(_, _)));
    }

    #[test]
    fn test_unbound_variable() {
        let err = check_error(vec![Statement::value(Pattern::var("x"), Expr::var("nope"))]);
        assert!(matches!(err, ErrorKind::Unbound { .. }));
    }

    // ===== Sequencing =====

    #[test]
    fn test_seq_unit_then_value() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("n"),
                Expr::seq(Expr::unit(), Expr::int(1)),
            )],
            "n",
            "int",
        );
    }

    #[test]
    fn test_seq_non_unit_first() {
        let err = check_error(vec![Statement::value(
            Pattern::var("n"),
            Expr::seq(Expr::int(1), Expr::int(2)),
        )]);
        assert!(matches!(innermost(err), ErrorKind::CannotUnify(_, _)));
    }

    // ===== Constraints =====

    #[test]
    fn test_constraint_int() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("n"),
                Expr::constraint(Expr::int(1), TypeAnn::int()),
            )],
            "n",
            "int",
        );
    }

    #[test]
    fn test_constraint_mismatch() {
        let err = check_error(vec![Statement::value(
            Pattern::var("n"),
            Expr::constraint(Expr::int(1), TypeAnn::unit()),
        )]);
        assert!(matches!(innermost(err), ErrorKind::CannotUnify(_, _)));
    }

    #[test]
    fn test_polymorphic_annotation() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("id"),
                Expr::constraint(
                    Expr::fun(Pattern::var("x"), Expr::var("x")),
                    TypeAnn::poly(vec!["a"], TypeAnn::arrow(TypeAnn::var("a"), TypeAnn::var("a"))),
                ),
            )],
            "id",
            "forall 'a. 'a -> 'a",
        );
    }

    #[test]
    fn test_shared_annotation_variables() {
        // fun (x : 'a) -> fun (y : 'a) -> x forces both parameters to agree
        let err = check_error(vec![Statement::value(
            Pattern::var("f"),
            Expr::fun(
                Pattern::constraint(Pattern::var("x"), TypeAnn::var("a")),
                Expr::fun(
                    Pattern::constraint(Pattern::var("y"), TypeAnn::var("a")),
                    Expr::seq(
                        Expr::constraint(Expr::var("x"), TypeAnn::unit()),
                        Expr::constraint(Expr::var("y"), TypeAnn::int()),
                    ),
                ),
            ),
        )]);
        assert!(matches!(innermost(err), ErrorKind::CannotUnify(_, _)));
    }

    // ===== Type declarations, aliases =====

    #[test]
    fn test_alias_unfolds_against_target() {
        assert_top_type(
            vec![
                Statement::type_decl("ints", vec![], TypeDeclBody::Alias(TypeAnn::int())),
                Statement::value(
                    Pattern::var("n"),
                    Expr::constraint(Expr::int(1), TypeAnn::ctor("ints", vec![])),
                ),
            ],
            "n",
            "ints",
        );
    }

    #[test]
    fn test_alias_chain() {
        assert_top_type(
            vec![
                Statement::type_decl("ints", vec![], TypeDeclBody::Alias(TypeAnn::int())),
                Statement::type_decl(
                    "nums",
                    vec![],
                    TypeDeclBody::Alias(TypeAnn::ctor("ints", vec![])),
                ),
                Statement::value(
                    Pattern::var("f"),
                    Expr::fun(
                        Pattern::constraint(Pattern::var("x"), TypeAnn::ctor("nums", vec![])),
                        Expr::constraint(Expr::var("x"), TypeAnn::int()),
                    ),
                ),
            ],
            "f",
            "nums -> int",
        );
    }

    #[test]
    fn test_unbound_type() {
        let err = check_error(vec![Statement::value(
            Pattern::var("n"),
            Expr::constraint(Expr::int(1), TypeAnn::ctor("mystery", vec![])),
        )]);
        assert!(matches!(
            err,
            ErrorKind::Unbound {
                kind: crate::typechecker::error::NameKind::Type,
                ..
            }
        ));
    }

    // ===== Variants =====

    #[test]
    fn test_constructor_application() {
        assert_top_type(
            vec![
                Statement::type_decl(
                    "option",
                    vec!["a"],
                    TypeDeclBody::Variant(vec![
                        CtorDecl::new("None_", vec![]),
                        CtorDecl::new("Some", vec![TypeAnn::var("a")]),
                    ]),
                ),
                Statement::value(Pattern::var("s"), Expr::ctor("Some", Some(Expr::int(1)))),
            ],
            "s",
            "int option",
        );
    }

    #[test]
    fn test_nullary_constructor_generalizes() {
        assert_top_type(
            vec![
                Statement::type_decl(
                    "option",
                    vec!["a"],
                    TypeDeclBody::Variant(vec![
                        CtorDecl::new("None_", vec![]),
                        CtorDecl::new("Some", vec![TypeAnn::var("a")]),
                    ]),
                ),
                Statement::value(Pattern::var("n"), Expr::ctor("None_", None)),
            ],
            "n",
            "forall 'a. 'a option",
        );
    }

    #[test]
    fn test_constructor_missing_argument() {
        let err = check_error(vec![
            either_decl(),
            Statement::value(Pattern::var("a"), Expr::ctor("A", None)),
        ]);
        assert!(matches!(err, ErrorKind::ArgumentExpected(name) if name == "A"));
    }

    #[test]
    fn test_unbound_constructor() {
        let err = check_error(vec![Statement::value(
            Pattern::var("x"),
            Expr::ctor("Ghost", None),
        )]);
        assert!(matches!(
            err,
            ErrorKind::Unbound {
                kind: crate::typechecker::error::NameKind::Ctor,
                ..
            }
        ));
    }

    #[test]
    fn test_recursive_variant() {
        // type 'a list = Nil | Cons of ('a, 'a list)
        let list_decl = Statement::type_decl(
            "list",
            vec!["a"],
            TypeDeclBody::Variant(vec![
                CtorDecl::new("Nil", vec![]),
                CtorDecl::new(
                    "Cons",
                    vec![TypeAnn::tuple(vec![
                        TypeAnn::var("a"),
                        TypeAnn::ctor("list", vec![TypeAnn::var("a")]),
                    ])],
                ),
            ]),
        );
        assert_top_type(
            vec![
                list_decl,
                Statement::value(
                    Pattern::var("l"),
                    Expr::ctor(
                        "Cons",
                        Some(Expr::tuple(vec![
                            Expr::int(1),
                            Expr::ctor("Cons", Some(Expr::tuple(vec![
                                Expr::int(2),
                                Expr::ctor("Nil", None),
                            ]))),
                        ])),
                    ),
                ),
            ],
            "l",
            "int list",
        );
    }

    #[test]
    fn test_single_argument_constructor_takes_element() {
        // A `Cons of ('a)` style declaration folds to its element type, so
        // the constructor checks against the element directly.
        assert_top_type(
            vec![
                Statement::type_decl(
                    "wrap",
                    vec![],
                    TypeDeclBody::Variant(vec![CtorDecl::new("Wrap", vec![TypeAnn::int()])]),
                ),
                Statement::value(Pattern::var("w"), Expr::ctor("Wrap", Some(Expr::int(7)))),
            ],
            "w",
            "wrap",
        );
    }

    // ===== Match and or-patterns =====

    #[test]
    fn test_match_on_variant() {
        assert_top_type(
            vec![
                either_decl(),
                Statement::value(
                    Pattern::var("get"),
                    Expr::fun(
                        Pattern::var("e"),
                        Expr::match_with(
                            Expr::var("e"),
                            vec![(
                                Pattern::or(
                                    Pattern::ctor("A", Some(Pattern::var("n"))),
                                    Pattern::ctor("B", Some(Pattern::var("n"))),
                                ),
                                Expr::var("n"),
                            )],
                        ),
                    ),
                ),
            ],
            "get",
            "either -> int",
        );
    }

    #[test]
    fn test_or_pattern_variable_on_one_side() {
        let err = check_error(vec![
            either_decl(),
            Statement::value(
                Pattern::var("get"),
                Expr::fun(
                    Pattern::var("e"),
                    Expr::match_with(
                        Expr::var("e"),
                        vec![(
                            Pattern::or(
                                Pattern::ctor("A", Some(Pattern::var("n"))),
                                Pattern::ctor("B", Some(Pattern::any())),
                            ),
                            Expr::int(0),
                        )],
                    ),
                ),
            ),
        ]);
        assert!(matches!(err, ErrorKind::VariableOnOneSide(name) if name == "n"));
    }

    #[test]
    fn test_or_pattern_conflicting_types() {
        // C carries int, D carries (int, int): binding n at both fails
        let err = check_error(vec![
            Statement::type_decl(
                "mix",
                vec![],
                TypeDeclBody::Variant(vec![
                    CtorDecl::new("C", vec![TypeAnn::int()]),
                    CtorDecl::new(
                        "D",
                        vec![TypeAnn::tuple(vec![TypeAnn::int(), TypeAnn::int()])],
                    ),
                ]),
            ),
            Statement::value(
                Pattern::var("get"),
                Expr::fun(
                    Pattern::var("e"),
                    Expr::match_with(
                        Expr::var("e"),
                        vec![(
                            Pattern::or(
                                Pattern::ctor("C", Some(Pattern::var("n"))),
                                Pattern::ctor("D", Some(Pattern::var("n"))),
                            ),
                            Expr::var("n"),
                        )],
                    ),
                ),
            ),
        ]);
        assert!(matches!(innermost(err), ErrorKind::CannotUnify(_, _)));
    }

    #[test]
    fn test_int_pattern() {
        assert_top_type(
            vec![Statement::value(
                Pattern::var("f"),
                Expr::fun(
                    Pattern::var("n"),
                    Expr::match_with(
                        Expr::var("n"),
                        vec![
                            (Pattern::int(0), Expr::int(1)),
                            (Pattern::any(), Expr::int(0)),
                        ],
                    ),
                ),
            )],
            "f",
            "int -> int",
        );
    }

    // ===== Records =====

    #[test]
    fn test_record_literal() {
        assert_top_type(
            vec![
                point_decl(),
                Statement::value(
                    Pattern::var("p"),
                    Expr::record(vec![("x", Expr::int(1)), ("y", Expr::int(2))], None),
                ),
            ],
            "p",
            "point",
        );
    }

    #[test]
    fn test_record_field_projection() {
        assert_top_type(
            vec![
                point_decl(),
                Statement::value(
                    Pattern::var("f"),
                    Expr::fun(Pattern::var("r"), Expr::field(Expr::var("r"), "x")),
                ),
            ],
            "f",
            "point -> int",
        );
    }

    #[test]
    fn test_record_missing_field() {
        let err = check_error(vec![
            point_decl(),
            Statement::value(
                Pattern::var("p"),
                Expr::record(vec![("x", Expr::int(1))], None),
            ),
        ]);
        assert!(matches!(err, ErrorKind::MissingFields(names) if names == vec!["y"]));
    }

    #[test]
    fn test_record_extension_fills_missing() {
        assert_top_type(
            vec![
                point_decl(),
                Statement::value(
                    Pattern::var("p"),
                    Expr::record(vec![("x", Expr::int(1)), ("y", Expr::int(2))], None),
                ),
                Statement::value(
                    Pattern::var("q"),
                    Expr::record(vec![("x", Expr::int(3))], Some(Expr::var("p"))),
                ),
            ],
            "q",
            "point",
        );
    }

    #[test]
    fn test_record_repeated_field() {
        let err = check_error(vec![
            point_decl(),
            Statement::value(
                Pattern::var("p"),
                Expr::record(
                    vec![("x", Expr::int(1)), ("x", Expr::int(2)), ("y", Expr::int(3))],
                    None,
                ),
            ),
        ]);
        assert!(matches!(err, ErrorKind::RepeatedField(name) if name == "x"));
    }

    #[test]
    fn test_record_unknown_field() {
        let err = check_error(vec![
            point_decl(),
            Statement::value(
                Pattern::var("p"),
                Expr::record(vec![("x", Expr::int(1)), ("z", Expr::int(2))], None),
            ),
        ]);
        assert!(matches!(err, ErrorKind::WrongRecordField { field, .. } if field == "z"));
    }

    #[test]
    fn test_empty_record() {
        let err = check_error(vec![Statement::value(
            Pattern::var("p"),
            Expr::record(vec![], None),
        )]);
        assert!(matches!(err, ErrorKind::EmptyRecord));
    }

    #[test]
    fn test_record_pattern() {
        assert_top_type(
            vec![
                point_decl(),
                Statement::value(
                    Pattern::var("f"),
                    Expr::fun(
                        Pattern::record(vec![("x", Pattern::var("n"))]),
                        Expr::var("n"),
                    ),
                ),
            ],
            "f",
            "point -> int",
        );
    }

    #[test]
    fn test_parameterized_record() {
        // type 'a box = { contents : 'a }
        assert_top_type(
            vec![
                Statement::type_decl(
                    "box",
                    vec!["a"],
                    TypeDeclBody::Record(vec![(
                        crate::ast::Ident::new("contents"),
                        TypeAnn::var("a"),
                    )]),
                ),
                Statement::value(
                    Pattern::var("b"),
                    Expr::record(vec![("contents", Expr::int(5))], None),
                ),
                Statement::value(
                    Pattern::var("unbox"),
                    Expr::fun(Pattern::var("r"), Expr::field(Expr::var("r"), "contents")),
                ),
            ],
            "unbox",
            "forall 'a. 'a box -> 'a",
        );
    }

    // ===== Modules =====

    #[test]
    fn test_module_qualified_value() {
        assert_top_type(
            vec![
                Statement::module("M", vec![Statement::value(Pattern::var("x"), Expr::int(1))]),
                Statement::value(
                    Pattern::var("y"),
                    Expr {
                        span: Default::default(),
                        kind: crate::ast::ExprKind::Var(LongIdent::dotted(
                            LongIdent::bare("M"),
                            "x",
                        )),
                    },
                ),
            ],
            "y",
            "int",
        );
    }

    #[test]
    fn test_open_module() {
        assert_top_type(
            vec![
                Statement::module("M", vec![Statement::value(Pattern::var("x"), Expr::int(1))]),
                Statement::open(LongIdent::bare("M")),
                Statement::value(Pattern::var("y"), Expr::var("x")),
            ],
            "y",
            "int",
        );
    }

    #[test]
    fn test_module_alias() {
        assert_top_type(
            vec![
                Statement::module("M", vec![Statement::value(Pattern::var("x"), Expr::int(1))]),
                Statement::module_alias("N", LongIdent::bare("M")),
                Statement::value(
                    Pattern::var("y"),
                    Expr {
                        span: Default::default(),
                        kind: crate::ast::ExprKind::Var(LongIdent::dotted(
                            LongIdent::bare("N"),
                            "x",
                        )),
                    },
                ),
            ],
            "y",
            "int",
        );
    }

    #[test]
    fn test_nested_modules() {
        assert_top_type(
            vec![
                Statement::module(
                    "A",
                    vec![Statement::module(
                        "B",
                        vec![Statement::value(Pattern::var("v"), Expr::int(2))],
                    )],
                ),
                Statement::value(
                    Pattern::var("w"),
                    Expr {
                        span: Default::default(),
                        kind: crate::ast::ExprKind::Var(LongIdent::dotted(
                            LongIdent::dotted(LongIdent::bare("A"), "B"),
                            "v",
                        )),
                    },
                ),
            ],
            "w",
            "int",
        );
    }

    #[test]
    fn test_unbound_module() {
        let err = check_error(vec![Statement::open(LongIdent::bare("Nowhere"))]);
        assert!(matches!(
            err,
            ErrorKind::Unbound {
                kind: crate::typechecker::error::NameKind::Module,
                ..
            }
        ));
    }

    #[test]
    fn test_applied_path_rejected() {
        let path = LongIdent::Applied(
            Box::new(LongIdent::bare("F")),
            Box::new(LongIdent::bare("X")),
        );
        let err = check_error(vec![Statement::value(
            Pattern::var("x"),
            Expr {
                span: Default::default(),
                kind: crate::ast::ExprKind::Var(path),
            },
        )]);
        assert!(matches!(err, ErrorKind::UnsupportedPath(_)));
    }

    // ===== Implicit arguments =====

    #[test]
    fn test_implicit_function_type() {
        let statements = show_prelude();
        let checked = check_statements(&statements).expect("checking failed");
        let show_ty = checked.env.type_of("show").expect("show not bound");
        assert_eq!(
            checked.env.table.show(show_ty),
            "forall 'a. {'a show} -> 'a -> int"
        );
    }

    #[test]
    fn test_implicit_resolution_toplevel() {
        let mut statements = show_prelude();
        statements.push(show_int_instance());
        statements.push(Statement::value(
            Pattern::var("p"),
            Expr::apply(Expr::var("show"), vec![Expr::int(1)]),
        ));
        let checked = check_statements(&statements).expect("checking failed");
        let p_ty = checked.env.type_of("p").expect("p not bound");
        assert_eq!(checked.env.table.show(p_ty), "int");

        // The elaborated binding applies show to the chosen instance first.
        let last = checked.statements.last().expect("no statements");
        let value = match &last.kind {
            TypedStatementKind::Value(_, value) => value,
            other => panic!("expected a value statement, got {:?}", other),
        };
        fn mentions_instance(expr: &crate::ast::TypedExpr) -> bool {
            match &expr.kind {
                TypedExprKind::Var(LongIdent::Bare(ident)) => {
                    crate::interner::resolve(ident.name) == "show_int"
                }
                TypedExprKind::Apply(func, args) => {
                    mentions_instance(func) || args.iter().any(mentions_instance)
                }
                _ => false,
            }
        }
        assert!(
            mentions_instance(value),
            "elaborated binding should reference show_int: {:?}",
            value
        );
    }

    #[test]
    fn test_implicit_resolution_failure() {
        let mut statements = show_prelude();
        statements.push(Statement::value(
            Pattern::var("p"),
            Expr::apply(Expr::var("show"), vec![Expr::int(1)]),
        ));
        let err = check_error(statements);
        assert!(matches!(err, ErrorKind::NoInstance(ty) if ty == "int show"));
    }

    #[test]
    fn test_implicit_ambiguity_is_no_instance() {
        let mut statements = show_prelude();
        statements.push(show_int_instance());
        statements.push(Statement::instance(
            "show_int_again",
            Expr::record(
                vec![("impl", Expr::fun(Pattern::var("x"), Expr::var("x")))],
                None,
            ),
        ));
        statements.push(Statement::value(
            Pattern::var("p"),
            Expr::apply(Expr::var("show"), vec![Expr::int(1)]),
        ));
        let err = check_error(statements);
        assert!(matches!(err, ErrorKind::NoInstance(_)));
    }

    #[test]
    fn test_implicit_abstraction_below_toplevel() {
        // With no instance in scope, an inner binding abstracts over the hole
        // instead of failing.
        let mut statements = show_prelude();
        statements.push(Statement::value(
            Pattern::var("f"),
            Expr::fun(
                Pattern::var("x"),
                Expr::let_in(
                    Pattern::var("g"),
                    Expr::apply(Expr::var("show"), vec![Expr::int(1)]),
                    Expr::int(0),
                ),
            ),
        ));
        let checked = check_statements(&statements).expect("checking failed");
        let f_ty = checked.env.type_of("f").expect("f not bound");
        assert_eq!(checked.env.table.show(f_ty), "forall 'a. 'a -> int");

        // The inner binding's value became an implicit function.
        let last = checked.statements.last().expect("no statements");
        let value = match &last.kind {
            TypedStatementKind::Value(_, value) => value,
            other => panic!("expected a value statement, got {:?}", other),
        };
        fn has_implicit_fun(expr: &crate::ast::TypedExpr) -> bool {
            match &expr.kind {
                TypedExprKind::Fun(_, _, crate::ast::Explicitness::Implicit) => true,
                TypedExprKind::Fun(_, body, _) => has_implicit_fun(body),
                TypedExprKind::Let(_, value, body) => {
                    has_implicit_fun(value) || has_implicit_fun(body)
                }
                TypedExprKind::Apply(func, args) => {
                    has_implicit_fun(func) || args.iter().any(has_implicit_fun)
                }
                _ => false,
            }
        }
        assert!(
            has_implicit_fun(value),
            "inner binding should abstract over the unresolved implicit: {:?}",
            value
        );
    }

    #[test]
    fn test_instance_registration() {
        let mut statements = show_prelude();
        statements.push(show_int_instance());
        let checked = check_statements(&statements).expect("checking failed");
        let ty = checked.env.type_of("show_int").expect("instance not bound");
        assert_eq!(checked.env.table.show(ty), "int show");
    }

    // ===== infer_expr =====

    #[test]
    fn test_infer_expr_int() {
        let (typed, env) = infer_expr(&Expr::int(1)).expect("inference failed");
        assert_eq!(env.table.show(typed.ty), "int");
    }

    #[test]
    fn test_infer_expr_identity() {
        let (typed, env) =
            infer_expr(&Expr::fun(Pattern::var("x"), Expr::var("x"))).expect("inference failed");
        assert_eq!(env.table.show(typed.ty), "'a -> 'a");
    }
}
