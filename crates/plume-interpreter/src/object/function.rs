use crate::env::Env;
use crate::interpreter::{Flow, Interpreter};
use crate::object::{Callable, Object};
use crate::resolver::Locals;

use gc::{Finalize, Gc, Trace};
use plume_common::error::{FileId, Result};
use plume_syntax::ast::{Stmt, StmtDefine};
use plume_syntax::token::Token;

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::Deref;
use std::rc::Rc;

/// A user-defined function: its definition paired with the frame it was
/// defined in. The scope distances and source unit of its body come from the
/// run that defined it, which may not be the run that calls it.
#[derive(Clone, Finalize, Trace)]
pub struct Function(Gc<FunctionImpl>);

impl Function {
    pub fn new(decl: &Rc<StmtDefine>, env: &Env, locals: &Rc<Locals>, file: FileId) -> Self {
        Function(Gc::new(FunctionImpl {
            decl: Rc::clone(decl),
            env: env.clone(),
            locals: Rc::clone(locals),
            file,
        }))
    }

    pub fn params(&self) -> &[Token] {
        &self.decl.params
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.decl.body.stmts
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.decl.params.len()
    }

    fn name(&self) -> &str {
        &self.decl.name.lexeme
    }

    fn call_unchecked(
        &self,
        interpreter: &mut Interpreter<'_>,
        args: Vec<Object>,
        paren: &Token,
    ) -> Result<Object> {
        // The call frame hangs off the closure, not the caller.
        let env = Env::with_parent(&self.env);
        for (param, arg) in self.params().iter().zip(args) {
            env.insert_unchecked(&param.lexeme, arg);
        }
        match interpreter.run_call(self, &env, paren)? {
            Flow::Return(object) => Ok(object),
            Flow::Normal => Ok(Object::Empty),
        }
    }
}

impl Debug for Function {
    // The closure frame usually holds the function itself.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name()).finish_non_exhaustive()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name())
    }
}

impl Deref for Function {
    type Target = FunctionImpl;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Eq for Function {}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Gc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Finalize, Trace)]
pub struct FunctionImpl {
    #[unsafe_ignore_trace]
    pub decl: Rc<StmtDefine>,
    pub env: Env,
    #[unsafe_ignore_trace]
    pub locals: Rc<Locals>,
    pub file: FileId,
}
