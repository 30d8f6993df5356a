use plume_common::error::{Result, RuntimeError};
use plume_syntax::token::Token;

use crate::interpreter::Interpreter;
use crate::object::Object;

pub trait Callable {
    fn arity(&self) -> usize;

    fn name(&self) -> &str;

    fn call_unchecked(
        &self,
        interpreter: &mut Interpreter<'_>,
        args: Vec<Object>,
        paren: &Token,
    ) -> Result<Object>;

    /// Calls with an exact arity check. Faults are reported at `paren`, the
    /// closing parenthesis of the call site.
    fn call(&self, interpreter: &mut Interpreter<'_>, args: Vec<Object>, paren: &Token) -> Result<Object> {
        let exp_args = self.arity();
        let got_args = args.len();
        if exp_args != got_args {
            return Err(paren.error(RuntimeError::ArityMismatch { exp_args, got_args }));
        }
        self.call_unchecked(interpreter, args, paren)
    }
}
