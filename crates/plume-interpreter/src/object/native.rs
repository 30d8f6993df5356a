use crate::interpreter::Interpreter;
use crate::object::{Callable, Object};

use gc::{Finalize, Trace};
use plume_common::error::{IoError, Result};
use plume_syntax::token::Token;

use std::fmt::{self, Display, Formatter};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Built-in functions bound in every global scope.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Native {
    Display,
    Time,
}

// The `Trace` derive adds a `Drop` impl, which a `Copy` type cannot have.
impl Finalize for Native {}

unsafe impl Trace for Native {
    gc::unsafe_empty_trace!();
}

impl Native {
    pub const ALL: [Native; 2] = [Native::Display, Native::Time];
}

impl Callable for Native {
    fn arity(&self) -> usize {
        match self {
            Native::Display => 1,
            Native::Time => 0,
        }
    }

    fn name(&self) -> &str {
        match self {
            Native::Display => "display",
            Native::Time => "time",
        }
    }

    fn call_unchecked(
        &self,
        interpreter: &mut Interpreter<'_>,
        args: Vec<Object>,
        paren: &Token,
    ) -> Result<Object> {
        match self {
            Native::Display => {
                for value in &args {
                    writeln!(interpreter.stdout(), "{value}").map_err(|_| {
                        paren.error(IoError::WriteError { file: "stdout".to_string() })
                    })?;
                }
                Ok(Object::Empty)
            }
            Native::Time => {
                let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
                Ok(Object::Number(now.as_millis() as f64))
            }
        }
    }
}

impl Display for Native {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::Session;

    use plume_common::error::{Error, IoError};
    use pretty_assertions::assert_eq;

    use std::io::{self, Write};

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn display_to_closed_stdout_faults() {
        let mut session = Session::default();
        let errors = session.run("create x = 1\ndisplay(x)\n", &mut ClosedPipe).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error,
            Error::IoError(IoError::WriteError { file: "stdout".to_string() })
        );
        assert!(errors[0].error.is_runtime());
        assert_eq!(errors[0].to_string(), "[line 2] IOError at ')': Unable to write to stdout.");
    }

    #[test]
    fn time_is_a_number() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        session.run("display(time() > 0)\n", &mut stdout).unwrap();
        assert_eq!(String::from_utf8(stdout).unwrap(), "true\n");
    }
}
