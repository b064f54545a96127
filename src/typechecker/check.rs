use crate::ast::pattern::{Pattern, PatternKind};
use crate::ast::statement::{ModuleExpr, Statement, StatementKind};
use crate::ast::typed::{TypedStatement, TypedStatementKind};
use crate::interner;
use crate::typechecker::error::{ErrorKind, TypeError};
use crate::typechecker::infer::Checker;

impl Checker {
    /// Fold a sequence of top-level statements, threading the environment.
    pub fn check_statements(
        &mut self,
        statements: &[Statement],
    ) -> Result<Vec<TypedStatement>, TypeError> {
        statements
            .iter()
            .map(|statement| self.check_statement(statement))
            .collect()
    }

    fn check_statement(&mut self, statement: &Statement) -> Result<TypedStatement, TypeError> {
        let span = statement.span;
        let kind = match &statement.kind {
            StatementKind::Value(pat, expr) => {
                let (typed_pat, typed_expr) = self.check_binding(pat, expr, true)?;
                self.ensure_no_pending(span)?;
                TypedStatementKind::Value(typed_pat, typed_expr)
            }

            StatementKind::Instance(name, expr) => {
                let pat = Pattern {
                    span: name.span,
                    kind: PatternKind::Var(*name),
                };
                let (typed_pat, typed_expr) = self.check_binding(&pat, expr, true)?;
                self.ensure_no_pending(span)?;
                log::debug!(
                    "instance {} : {}",
                    interner::resolve(name.name),
                    self.env.table.show(typed_pat.ty)
                );
                self.env.add_instance(name.name, typed_pat.ty);
                TypedStatementKind::Instance(*name, typed_expr)
            }

            StatementKind::TypeDecl(decl) => {
                let id = self.env.import_type_decl(decl)?;
                TypedStatementKind::TypeDecl(decl.name, id)
            }

            StatementKind::Module(name, ModuleExpr::Structure(body)) => {
                self.env.open_scope();
                let typed_body = self.check_statements(body)?;
                let scope = self.env.close_scope();
                self.env.add_module(name.name, scope);
                TypedStatementKind::Module(*name, typed_body)
            }

            StatementKind::Module(name, ModuleExpr::Name(path)) => {
                let scope = self.env.find_module(path)?.clone();
                self.env.add_module(name.name, scope);
                TypedStatementKind::ModuleAlias(*name, path.clone())
            }

            StatementKind::Open(path) => {
                self.env.open_module(path)?;
                TypedStatementKind::Open(path.clone())
            }
        };
        Ok(TypedStatement { span, kind })
    }

    /// A hole that floats past a top-level binding has nowhere left to be
    /// resolved; its presence is a checker bug, not a user error.
    fn ensure_no_pending(&self, span: crate::ast::Span) -> Result<(), TypeError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(TypeError::new(span, ErrorKind::UnifiableExpr))
        }
    }
}
