use plume_common::error::{Diagnostics, ErrorS, ResolutionError};
use plume_common::stack::ensure_sufficient_stack;
use plume_common::types::Span;
use plume_syntax::ast::{Expr, ExprVariable, Program, Stmt, StmtBlock, StmtDefine};
use plume_syntax::token::Token;
use rustc_hash::FxHashMap;

/// Scope distance of every variable reference, keyed by the span of the
/// referencing name token.
pub type Locals = FxHashMap<Span, usize>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FunctionKind {
    None,
    Function,
}

/// Static scope analysis.
///
/// Mirrors the interpreter's frames exactly: one scope per block, one per
/// function call (parameters and body share it), and the global scope at the
/// bottom, which is never popped.
#[derive(Debug)]
pub struct Resolver {
    /// `false` while a variable's initializer is being resolved.
    scopes: Vec<FxHashMap<String, bool>>,
    locals: Locals,
    function: FunctionKind,
    errors: Vec<ErrorS>,
}

impl Resolver {
    /// `globals` are the names already bound in the global frame.
    pub fn new(globals: impl IntoIterator<Item = String>) -> Self {
        let globals = globals.into_iter().map(|name| (name, true)).collect();
        Self {
            scopes: vec![globals],
            locals: Locals::default(),
            function: FunctionKind::None,
            errors: Vec::new(),
        }
    }

    pub fn resolve(mut self, program: &Program, diagnostics: &mut Diagnostics) -> Locals {
        for stmt in &program.stmts {
            self.resolve_stmt(stmt);
        }
        tracing::debug!(
            references = self.locals.len(),
            errors = self.errors.len(),
            "resolved program"
        );
        for e in self.errors {
            diagnostics.push(e);
        }
        self.locals
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| match stmt {
            Stmt::Block(block) => self.resolve_block(block),
            Stmt::Change(change) => {
                self.resolve_expr(&change.value);
                self.access(&change.target);
            }
            Stmt::Create(create) => {
                self.declare(&create.name);
                self.resolve_expr(&create.value);
                self.define(&create.name.lexeme);
            }
            Stmt::Define(define) => {
                self.declare_define(&define.name);
                self.resolve_function(define);
            }
            Stmt::Expr(expr) => self.resolve_expr(&expr.value),
            Stmt::If(if_) => {
                self.resolve_expr(&if_.cond);
                self.resolve_block(&if_.then);
                for else_if in &if_.else_ifs {
                    self.resolve_expr(&else_if.cond);
                    self.resolve_block(&else_if.then);
                }
                if let Some(else_) = &if_.else_ {
                    self.resolve_block(else_);
                }
            }
            Stmt::RepeatTimes(repeat) => {
                self.resolve_expr(&repeat.count);
                self.resolve_block(&repeat.body);
            }
            Stmt::RepeatWhile(repeat) => {
                self.resolve_expr(&repeat.cond);
                self.resolve_block(&repeat.body);
            }
            Stmt::Return(return_) => self.check_return(&return_.token),
            Stmt::ReturnWith(return_) => {
                self.check_return(&return_.token);
                self.resolve_expr(&return_.value);
            }
        })
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| match expr {
            Expr::Binary(binary) => {
                self.resolve_expr(&binary.lt);
                self.resolve_expr(&binary.rt);
            }
            Expr::Call(call) => {
                self.resolve_expr(&call.callee);
                for arg in &call.args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Grouping(grouping) => self.resolve_expr(&grouping.expr),
            Expr::Literal(_) => {}
            Expr::Logical(logical) => {
                self.resolve_expr(&logical.lt);
                self.resolve_expr(&logical.rt);
            }
            Expr::Unary(unary) => self.resolve_expr(&unary.rt),
            Expr::Variable(var) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(var.name()) == Some(&false) {
                        let name = var.name().to_string();
                        self.error(&var.name, ResolutionError::AccessInsideInitializer { name });
                    }
                }
                self.access(var);
            }
        })
    }

    fn resolve_block(&mut self, block: &StmtBlock) {
        self.begin_scope();
        for stmt in &block.stmts {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
    }

    fn resolve_function(&mut self, define: &StmtDefine) {
        let enclosing = std::mem::replace(&mut self.function, FunctionKind::Function);
        self.begin_scope();
        for param in &define.params {
            self.declare_define(param);
        }
        // The body shares the call frame with the parameters.
        for stmt in &define.body.stmts {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
        self.function = enclosing;
    }

    fn check_return(&mut self, token: &Token) {
        if self.function == FunctionKind::None {
            self.error(token, ResolutionError::ReturnOutsideFunction);
        }
    }

    fn declare_define(&mut self, name: &Token) {
        self.declare(name);
        self.define(&name.lexeme);
    }

    fn declare(&mut self, name: &Token) {
        let already_defined = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.clone(), false).is_some(),
            None => false,
        };
        if already_defined {
            let e = ResolutionError::AlreadyDefined { name: name.lexeme.clone() };
            self.error(name, e);
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn access(&mut self, var: &ExprVariable) {
        let depth = self.scopes.iter().rev().position(|scope| scope.contains_key(var.name()));
        match depth {
            Some(depth) => {
                self.locals.insert(var.name.span.clone(), depth);
            }
            None => {
                let name = var.name().to_string();
                self.error(&var.name, ResolutionError::NotDefined { name });
            }
        }
    }

    fn error(&mut self, token: &Token, error: ResolutionError) {
        self.errors.push(token.error(error));
    }

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn end_scope(&mut self) {
        // The global scope stays at the bottom.
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}
