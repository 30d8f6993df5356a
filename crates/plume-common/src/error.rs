use crate::types::Span;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::{self, Files, SimpleFiles};
use codespan_reporting::term;
use termcolor::WriteColor;
use thiserror::Error;

use std::fmt::{self, Display, Formatter};
use std::io::Write;

pub type Result<T, E = ErrorS> = std::result::Result<T, E>;

/// Index of one unit of source text in a [`SourceFiles`] set.
pub type FileId = usize;
/// Every unit of source text a session has run, in order.
pub type SourceFiles = SimpleFiles<String, String>;

#[remain::sorted]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("IOError: {0}")]
    IoError(#[from] IoError),
    #[error("LexicalError: {0}")]
    LexicalError(#[from] LexicalError),
    #[error("ResolutionError: {0}")]
    ResolutionError(#[from] ResolutionError),
    #[error("RuntimeError: {0}")]
    RuntimeError(#[from] RuntimeError),
    #[error("SyntaxError: {0}")]
    SyntaxError(#[from] SyntaxError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::IoError(_) => "IOError",
            Error::LexicalError(_) => "LexicalError",
            Error::ResolutionError(_) => "ResolutionError",
            Error::RuntimeError(_) => "RuntimeError",
            Error::SyntaxError(_) => "SyntaxError",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::IoError(e) => e.to_string(),
            Error::LexicalError(e) => e.to_string(),
            Error::ResolutionError(e) => e.to_string(),
            Error::RuntimeError(e) => e.to_string(),
            Error::SyntaxError(e) => e.to_string(),
        }
    }

    /// Errors raised while executing, as opposed to while scanning, parsing,
    /// or resolving.
    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::IoError(_) | Error::RuntimeError(_))
    }
}

#[remain::sorted]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum IoError {
    #[error("Unable to write to {file}.")]
    WriteError { file: String },
}

#[remain::sorted]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LexicalError {
    #[error("Inconsistent use of tabs and spaces in indentation.")]
    InconsistentIndentation,
    #[error("Too many levels of indentation (the maximum is {max}).")]
    IndentationTooDeep { max: usize },
    #[error("File must end with a newline at no indentation.")]
    MissingFinalNewline,
    #[error("Unexpected character.")]
    UnexpectedCharacter,
    #[error("Indentation matches no previous level.")]
    UnmatchedIndentation,
    #[error("Unterminated text.")]
    UnterminatedText,
}

#[remain::sorted]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolutionError {
    #[error("Cannot read variable '{name}' in its own initializer.")]
    AccessInsideInitializer { name: String },
    #[error("Variable '{name}' is already defined in this scope.")]
    AlreadyDefined { name: String },
    #[error("Undefined variable '{name}'.")]
    NotDefined { name: String },
    #[error("Cannot return from outside a function.")]
    ReturnOutsideFunction,
}

#[remain::sorted]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RuntimeError {
    #[error("Variable '{name}' is already defined in this scope.")]
    AlreadyDefined { name: String },
    #[error("Expected {exp_args} arguments but got {got_args}.")]
    ArityMismatch { exp_args: usize, got_args: usize },
    #[error("Division by zero is not allowed.")]
    DivisionByZero,
    #[error("Condition must be a boolean.")]
    InvalidCondition,
    #[error("The number of repetitions must be a positive integer.")]
    InvalidRepeatCount,
    #[error("Only functions can be called.")]
    NotCallable,
    #[error("Undefined variable '{name}'.")]
    NotDefined { name: String },
    #[error("Operand of '{op}' must be a boolean.")]
    OperandNotBoolean { op: String },
    #[error("Operand of '{op}' must be a number.")]
    OperandNotNumber { op: String },
    #[error("Operands of '{op}' must be booleans.")]
    OperandsNotBooleans { op: String },
    #[error("Operands of '{op}' must be numbers.")]
    OperandsNotNumbers { op: String },
    #[error("Operands of '{op}' must be only numbers or only texts.")]
    OperandsNotNumbersOrTexts { op: String },
    #[error("Maximum recursion depth exceeded.")]
    StackOverflow,
}

#[remain::sorted]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SyntaxError {
    #[error("A block must contain at least one statement.")]
    EmptyBlock,
    #[error("Expected {expected}.")]
    Expected { expected: String },
    #[error("Expected an indented block.")]
    ExpectedBlock,
    #[error("Expected an expression.")]
    ExpectedExpression,
    #[error("Invalid target for 'change'; expected a variable name.")]
    InvalidChangeTarget,
    #[error("Unexpected '='. Did you mean 'create {name} = ...' or 'change {name} = ...'?")]
    MissingCreateOrChange { name: String },
    #[error("Cannot have more than {max} arguments.")]
    TooManyArguments { max: usize },
    #[error("Cannot have more than {max} parameters.")]
    TooManyParameters { max: usize },
    #[error("Unexpected indentation.")]
    UnexpectedIndent,
}

/// Where on its line a diagnostic points.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Location {
    Dedent,
    EndOfFile,
    EndOfLine,
    Indent,
    Lexeme(String),
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Location::Dedent => write!(f, "at the end of the block"),
            Location::EndOfFile => write!(f, "at the end of the file"),
            Location::EndOfLine => write!(f, "at the end of the line"),
            Location::Indent => write!(f, "at the indentation"),
            Location::Lexeme(lexeme) => write!(f, "at '{lexeme}'"),
        }
    }
}

/// A diagnostic record: one error pinned to a line, a location on that line,
/// and the byte span it covers in the source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorS {
    pub error: Error,
    pub line: usize,
    pub location: Location,
    pub span: Span,
    /// The source unit `line` and `span` refer to, once it is known.
    pub file: Option<FileId>,
}

impl ErrorS {
    pub fn new(error: impl Into<Error>, line: usize, location: Location, span: Span) -> Self {
        Self { error: error.into(), line, location, span, file: None }
    }

    /// Attributes the error to `file`, unless it already belongs to one.
    pub fn in_file(mut self, file: FileId) -> Self {
        self.file.get_or_insert(file);
        self
    }

    fn as_diagnostic(&self, file: FileId) -> Diagnostic<FileId> {
        Diagnostic::error()
            .with_code(self.error.code())
            .with_message(self.error.message())
            .with_labels(vec![Label::primary(file, self.span.clone())])
            .with_notes(vec![format!("line {}, {}", self.line, self.location)])
    }
}

impl Display for ErrorS {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] {} {}: {}", self.line, self.error.code(), self.location, self.error.message())
    }
}

impl std::error::Error for ErrorS {}

/// Collects the diagnostics of one pass. Passes never stop at the first
/// error; the driver checks [`Diagnostics::has_errors`] before starting the
/// next pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<ErrorS>,
}

impl Diagnostics {
    pub fn push(&mut self, error: ErrorS) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ErrorS] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ErrorS> {
        self.errors
    }
}

/// Renders `errors` against the sources they were raised in. An error whose
/// span lies outside its source falls back to its one-line form.
pub fn report_err<'a>(
    writer: &mut dyn WriteColor,
    files: &'a impl Files<'a, FileId = FileId>,
    errors: &[ErrorS],
) -> Result<(), files::Error> {
    let mut errors = errors.iter().collect::<Vec<_>>();
    errors.sort_by_key(|e| (e.file, e.span.start, e.span.end));

    let config = term::Config::default();
    for e in errors {
        let file = e.file.unwrap_or_default();
        let fits = files.source(file).map_or(false, |source| e.span.end <= source.as_ref().len());
        if fits {
            term::emit(writer, &config, files, &e.as_diagnostic(file))?;
        } else {
            writeln!(writer, "{e}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn display_runtime_error() {
        let e = ErrorS::new(
            RuntimeError::DivisionByZero,
            1,
            Location::Lexeme("/".to_string()),
            9..10,
        );
        assert_eq!(e.to_string(), "[line 1] RuntimeError at '/': Division by zero is not allowed.");
        assert!(e.error.is_runtime());
    }

    #[test]
    fn display_end_of_file() {
        let e = ErrorS::new(SyntaxError::ExpectedExpression, 3, Location::EndOfFile, 20..20);
        assert_eq!(e.to_string(), "[line 3] SyntaxError at the end of the file: Expected an expression.");
        assert!(!e.error.is_runtime());
    }

    #[test]
    fn report_sorts_by_position() {
        let source = "create x = 1\ncreate x = 2\n";
        let errors = vec![
            ErrorS::new(
                ResolutionError::AlreadyDefined { name: "x".to_string() },
                2,
                Location::Lexeme("x".to_string()),
                20..21,
            ),
            ErrorS::new(LexicalError::UnexpectedCharacter, 1, Location::Lexeme("c".to_string()), 0..1),
        ];
        let mut files = SourceFiles::new();
        files.add("<script>".to_string(), source.to_string());
        let mut output = termcolor::NoColor::new(Vec::new());
        report_err(&mut output, &files, &errors).unwrap();
        let output = String::from_utf8(output.into_inner()).unwrap();
        let lexical = output.find("LexicalError").unwrap();
        let resolution = output.find("ResolutionError").unwrap();
        assert!(lexical < resolution);
    }

    #[test]
    fn report_against_the_owning_source() {
        let mut files = SourceFiles::new();
        files.add("<script>".to_string(), "define f(accept n)\n  return with 1 / n\n".to_string());
        files.add("<script>".to_string(), "f(0)\n".to_string());
        let e = ErrorS::new(RuntimeError::DivisionByZero, 2, Location::Lexeme("/".to_string()), 35..36)
            .in_file(0)
            .in_file(1);
        assert_eq!(e.file, Some(0));

        let mut output = termcolor::NoColor::new(Vec::new());
        report_err(&mut output, &files, &[e]).unwrap();
        let output = String::from_utf8(output.into_inner()).unwrap();
        assert!(output.contains("return with 1 / n"), "{output}");
    }

    #[test]
    fn report_span_outside_its_source() {
        let mut files = SourceFiles::new();
        files.add("<script>".to_string(), "f(0)\n".to_string());
        let e = ErrorS::new(RuntimeError::DivisionByZero, 3, Location::Lexeme("/".to_string()), 56..57)
            .in_file(0);
        let mut output = termcolor::NoColor::new(Vec::new());
        report_err(&mut output, &files, &[e]).unwrap();
        assert_eq!(
            String::from_utf8(output.into_inner()).unwrap(),
            "[line 3] RuntimeError at '/': Division by zero is not allowed.\n"
        );
    }
}
