mod callable;
mod function;
mod native;

use std::fmt::{self, Display, Formatter};

pub use callable::Callable;
pub use function::Function;
use gc::{Finalize, Trace};
pub use native::Native;
use plume_common::error::{Result, RuntimeError};
use plume_syntax::token::Token;

use crate::interpreter::Interpreter;

#[derive(Clone, Debug, Finalize, Trace)]
pub enum Object {
    Bool(bool),
    Empty,
    Function(Function),
    Native(Native),
    Number(f64),
    Text(String),
}

impl Object {
    pub fn call(&self, interpreter: &mut Interpreter<'_>, args: Vec<Object>, paren: &Token) -> Result<Object> {
        match &self {
            Object::Function(function) => function.call(interpreter, args, paren),
            Object::Native(native) => native.call(interpreter, args, paren),
            _ => Err(paren.error(RuntimeError::NotCallable)),
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Object::Bool(bool) => write!(f, "{bool}"),
            Object::Empty => write!(f, "empty"),
            Object::Function(function) => write!(f, "{function}"),
            Object::Native(native) => write!(f, "{native}"),
            Object::Number(number) if number.is_nan() => write!(f, "nan"),
            Object::Number(number) if number.is_infinite() => {
                write!(f, "{}infinity", if number.is_sign_negative() { "-" } else { "" })
            }
            // Integral values print without a fractional part.
            Object::Number(number) => write!(f, "{number}"),
            Object::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Values of different kinds are never equal.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Bool(b1), Object::Bool(b2)) => b1 == b2,
            (Object::Empty, Object::Empty) => true,
            (Object::Function(f1), Object::Function(f2)) => f1 == f2,
            (Object::Native(n1), Object::Native(n2)) => n1 == n2,
            (Object::Number(n1), Object::Number(n2)) => n1 == n2,
            (Object::Text(t1), Object::Text(t2)) => t1 == t2,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn display_values() {
        assert_eq!(Object::Number(12.0).to_string(), "12");
        assert_eq!(Object::Number(3.5).to_string(), "3.5");
        assert_eq!(Object::Number(-0.25).to_string(), "-0.25");
        assert_eq!(Object::Bool(false).to_string(), "false");
        assert_eq!(Object::Empty.to_string(), "empty");
        assert_eq!(Object::Text("hi".to_string()).to_string(), "hi");
        assert_eq!(Object::Native(Native::Display).to_string(), "<native display>");
    }

    #[test]
    fn display_non_finite_numbers() {
        assert_eq!(Object::Number(f64::MAX * 2.0).to_string(), "infinity");
        assert_eq!(Object::Number(f64::MIN * 2.0).to_string(), "-infinity");
        assert_eq!(Object::Number(f64::INFINITY - f64::INFINITY).to_string(), "nan");
        assert_eq!(Object::Number(1e21).to_string(), "1000000000000000000000");
    }

    #[test]
    fn equality_across_kinds() {
        let values = [
            Object::Bool(true),
            Object::Empty,
            Object::Native(Native::Time),
            Object::Number(1.0),
            Object::Text("1".to_string()),
        ];
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                assert_eq!(a == b, i == j, "{a} vs {b}");
            }
        }
        assert_ne!(Object::Native(Native::Time), Object::Native(Native::Display));
        assert_eq!(Object::Text("ab".to_string()), Object::Text("ab".to_string()));
    }
}
