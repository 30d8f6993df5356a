use crate::env::Env;
use crate::object::{Function, Object};
use crate::resolver::Locals;

use plume_common::error::{FileId, Result, RuntimeError};
use plume_common::stack::ensure_sufficient_stack;
use plume_syntax::ast::{
    Expr, ExprLiteral, ExprVariable, OpBinary, OpLogical, OpUnary, Program, Stmt, StmtBlock,
};
use plume_syntax::token::Token;

use std::io::Write;
use std::rc::Rc;

/// Interpreted calls deeper than this fault instead of exhausting the host.
pub const MAX_CALL_DEPTH: usize = 4096;

/// How a statement completed.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    /// Unwinding towards the nearest call boundary.
    Return(Object),
}

pub struct Interpreter<'a> {
    globals: Env,
    locals: Rc<Locals>,
    /// The source unit the running code was read from.
    file: FileId,
    stdout: &'a mut dyn Write,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(globals: Env, locals: Locals, file: FileId, stdout: &'a mut dyn Write) -> Self {
        Self { globals, locals: Rc::new(locals), file, stdout, depth: 0 }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(stmts = program.stmts.len()))]
    pub fn interpret(&mut self, program: &Program) -> Result<()> {
        let globals = self.globals.clone();
        let file = self.file;
        for stmt in &program.stmts {
            // `return` at the top level is rejected during resolution.
            self.run_stmt(&globals, stmt).map_err(|e| e.in_file(file))?;
        }
        Ok(())
    }

    pub fn stdout(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.stdout
    }

    /// Runs a function body in its call frame, with the scope distances and
    /// source unit of the run that defined the function. Faults raised in the
    /// body belong to that source unit; `paren` belongs to the caller's.
    pub(crate) fn run_call(&mut self, function: &Function, env: &Env, paren: &Token) -> Result<Flow> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(paren.error(RuntimeError::StackOverflow));
        }
        let caller_locals = std::mem::replace(&mut self.locals, Rc::clone(&function.locals));
        let caller_file = std::mem::replace(&mut self.file, function.file);
        self.depth += 1;
        let flow = self.run_stmts(env, function.stmts()).map_err(|e| e.in_file(function.file));
        self.depth -= 1;
        self.file = caller_file;
        self.locals = caller_locals;
        flow
    }

    fn run_stmts(&mut self, env: &Env, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            if let Flow::Return(object) = self.run_stmt(env, stmt)? {
                return Ok(Flow::Return(object));
            }
        }
        Ok(Flow::Normal)
    }

    /// Every block gets exactly one frame of its own.
    fn run_block(&mut self, env: &Env, block: &StmtBlock) -> Result<Flow> {
        let env = Env::with_parent(env);
        self.run_stmts(&env, &block.stmts)
    }

    fn run_stmt(&mut self, env: &Env, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| match stmt {
            Stmt::Block(block) => self.run_block(env, block),
            Stmt::Change(change) => {
                let value = self.run_expr(env, &change.value)?;
                self.set_var(env, &change.target, value)?;
                Ok(Flow::Normal)
            }
            Stmt::Create(create) => {
                let value = self.run_expr(env, &create.value)?;
                self.define_var(env, &create.name, value)?;
                Ok(Flow::Normal)
            }
            Stmt::Define(define) => {
                let function = Function::new(define, env, &self.locals, self.file);
                self.define_var(env, &define.name, Object::Function(function))?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.run_expr(env, &expr.value)?;
                Ok(Flow::Normal)
            }
            Stmt::If(if_) => {
                if self.run_cond(env, &if_.cond, &if_.token)? {
                    return self.run_block(env, &if_.then);
                }
                for else_if in &if_.else_ifs {
                    if self.run_cond(env, &else_if.cond, &else_if.token)? {
                        return self.run_block(env, &else_if.then);
                    }
                }
                match &if_.else_ {
                    Some(else_) => self.run_block(env, else_),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::RepeatTimes(repeat) => {
                let count = match self.run_expr(env, &repeat.count)? {
                    Object::Number(count) if count > 0.0 && count.fract() == 0.0 => count,
                    _ => return Err(repeat.token.error(RuntimeError::InvalidRepeatCount)),
                };
                let mut done = 0.0;
                while done < count {
                    if let Flow::Return(object) = self.run_block(env, &repeat.body)? {
                        return Ok(Flow::Return(object));
                    }
                    done += 1.0;
                }
                Ok(Flow::Normal)
            }
            Stmt::RepeatWhile(repeat) => {
                while self.run_cond(env, &repeat.cond, &repeat.token)? {
                    if let Flow::Return(object) = self.run_block(env, &repeat.body)? {
                        return Ok(Flow::Return(object));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(_) => Ok(Flow::Return(Object::Empty)),
            Stmt::ReturnWith(return_) => {
                let object = self.run_expr(env, &return_.value)?;
                Ok(Flow::Return(object))
            }
        })
    }

    fn run_cond(&mut self, env: &Env, cond: &Expr, token: &Token) -> Result<bool> {
        match self.run_expr(env, cond)? {
            Object::Bool(bool) => Ok(bool),
            _ => Err(token.error(RuntimeError::InvalidCondition)),
        }
    }

    fn run_expr(&mut self, env: &Env, expr: &Expr) -> Result<Object> {
        ensure_sufficient_stack(|| match expr {
            Expr::Binary(binary) => {
                let lt = self.run_expr(env, &binary.lt)?;
                let rt = self.run_expr(env, &binary.rt)?;
                let op = binary.op;
                match (op, lt, rt) {
                    (OpBinary::Add, Object::Number(a), Object::Number(b)) => Ok(Object::Number(a + b)),
                    (OpBinary::Add, Object::Text(ref a), Object::Text(ref b)) => Ok(Object::Text(a.clone() + b)),
                    (OpBinary::Add, _, _) => Err(binary
                        .token
                        .error(RuntimeError::OperandsNotNumbersOrTexts { op: op.to_string() })),
                    (OpBinary::Subtract, Object::Number(a), Object::Number(b)) => {
                        Ok(Object::Number(a - b))
                    }
                    (OpBinary::Multiply, Object::Number(a), Object::Number(b)) => {
                        Ok(Object::Number(a * b))
                    }
                    (OpBinary::Divide, Object::Number(_), Object::Number(b)) if b == 0.0 => {
                        Err(binary.token.error(RuntimeError::DivisionByZero))
                    }
                    (OpBinary::Divide, Object::Number(a), Object::Number(b)) => {
                        Ok(Object::Number(a / b))
                    }
                    (OpBinary::Less, Object::Number(a), Object::Number(b)) => Ok(Object::Bool(a < b)),
                    (OpBinary::LessEqual, Object::Number(a), Object::Number(b)) => {
                        Ok(Object::Bool(a <= b))
                    }
                    (OpBinary::Greater, Object::Number(a), Object::Number(b)) => {
                        Ok(Object::Bool(a > b))
                    }
                    (OpBinary::GreaterEqual, Object::Number(a), Object::Number(b)) => {
                        Ok(Object::Bool(a >= b))
                    }
                    (OpBinary::Equal, a, b) => Ok(Object::Bool(a == b)),
                    (OpBinary::NotEqual, a, b) => Ok(Object::Bool(a != b)),
                    (op, _, _) => {
                        Err(binary.token.error(RuntimeError::OperandsNotNumbers { op: op.to_string() }))
                    }
                }
            }
            Expr::Call(call) => {
                let callee = self.run_expr(env, &call.callee)?;
                let args =
                    call.args.iter().map(|arg| self.run_expr(env, arg)).collect::<Result<Vec<_>>>()?;
                callee.call(self, args, &call.paren)
            }
            Expr::Grouping(grouping) => self.run_expr(env, &grouping.expr),
            Expr::Literal(literal) => Ok(match literal {
                ExprLiteral::Bool(bool) => Object::Bool(*bool),
                ExprLiteral::Empty => Object::Empty,
                ExprLiteral::Number(number) => Object::Number(*number),
                ExprLiteral::Text(text) => Object::Text(text.clone()),
            }),
            Expr::Logical(logical) => {
                let not_booleans =
                    || logical.token.error(RuntimeError::OperandsNotBooleans { op: logical.op.to_string() });
                let lt = match self.run_expr(env, &logical.lt)? {
                    Object::Bool(lt) => lt,
                    _ => return Err(not_booleans()),
                };
                match (logical.op, lt) {
                    (OpLogical::And, false) => return Ok(Object::Bool(false)),
                    (OpLogical::Or, true) => return Ok(Object::Bool(true)),
                    _ => {}
                }
                match self.run_expr(env, &logical.rt)? {
                    Object::Bool(rt) => Ok(Object::Bool(rt)),
                    _ => Err(not_booleans()),
                }
            }
            Expr::Unary(unary) => {
                let rt = self.run_expr(env, &unary.rt)?;
                let op = unary.op.to_string();
                match (unary.op, rt) {
                    (OpUnary::Negate, Object::Number(number)) => Ok(Object::Number(-number)),
                    (OpUnary::Negate, _) => Err(unary.token.error(RuntimeError::OperandNotNumber { op })),
                    (OpUnary::Not, Object::Bool(bool)) => Ok(Object::Bool(!bool)),
                    (OpUnary::Not, _) => Err(unary.token.error(RuntimeError::OperandNotBoolean { op })),
                }
            }
            Expr::Variable(var) => self.get_var(env, var),
        })
    }

    fn define_var(&mut self, env: &Env, name: &Token, value: Object) -> Result<()> {
        env.define(&name.lexeme, value).map_err(|()| {
            name.error(RuntimeError::AlreadyDefined { name: name.lexeme.clone() })
        })
    }

    fn get_var(&mut self, env: &Env, var: &ExprVariable) -> Result<Object> {
        self.locals
            .get(&var.name.span)
            .and_then(|depth| env.get_at(var.name(), *depth))
            .ok_or_else(|| var.name.error(RuntimeError::NotDefined { name: var.name().to_string() }))
    }

    fn set_var(&mut self, env: &Env, var: &ExprVariable, value: Object) -> Result<()> {
        let not_defined =
            || var.name.error(RuntimeError::NotDefined { name: var.name().to_string() });
        let depth = *self.locals.get(&var.name.span).ok_or_else(not_defined)?;
        env.set_at(var.name(), value, depth).map_err(|()| not_defined())
    }
}
