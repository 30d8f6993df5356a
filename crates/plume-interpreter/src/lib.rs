mod env;
mod interpreter;
mod object;
mod resolver;

pub use crate::interpreter::{Interpreter, MAX_CALL_DEPTH};
pub use crate::resolver::{Locals, Resolver};

use crate::env::Env;
use crate::object::{Callable, Native, Object};

use plume_common::error::{Diagnostics, ErrorS, FileId, SourceFiles};
use plume_syntax::lexer::normalize_newlines;

use std::io::Write;

/// A long-lived interpreter whose globals persist from one run to the next.
///
/// Every run's source is kept, since functions defined by one run may fault
/// in a later one.
#[derive(Debug)]
pub struct Session {
    globals: Env,
    files: SourceFiles,
}

impl Default for Session {
    fn default() -> Self {
        let globals = Env::default();
        for native in Native::ALL {
            globals.insert_unchecked(native.name(), Object::Native(native));
        }
        Self { globals, files: SourceFiles::new() }
    }
}

impl Session {
    /// Scans, parses, resolves and runs one unit of source text. Compile-time
    /// errors are all returned together and nothing runs; a runtime fault is
    /// returned alone and stops the run where it happened. Every returned
    /// error names the source unit it points into, see [`Session::files`].
    pub fn run(&mut self, source: &str, stdout: &mut dyn Write) -> Result<(), Vec<ErrorS>> {
        let source = normalize_newlines(source);
        let file = self.files.add("<script>".to_string(), source.to_string());
        self.run_file(&source, file, stdout)
            .map_err(|errors| errors.into_iter().map(|e| e.in_file(file)).collect())
    }

    /// The sources of every run so far, for rendering diagnostics.
    pub fn files(&self) -> &SourceFiles {
        &self.files
    }

    fn run_file(&mut self, source: &str, file: FileId, stdout: &mut dyn Write) -> Result<(), Vec<ErrorS>> {
        let program = plume_syntax::parse(source)?;

        let mut diagnostics = Diagnostics::default();
        let locals = Resolver::new(self.globals.names()).resolve(&program, &mut diagnostics);
        if diagnostics.has_errors() {
            return Err(diagnostics.into_errors());
        }

        let mut interpreter = Interpreter::new(self.globals.clone(), locals, file, stdout);
        interpreter.interpret(&program).map_err(|e| {
            tracing::debug!(error = %e, "run stopped by a runtime fault");
            vec![e]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use plume_common::error::report_err;
    use pretty_assertions::assert_eq;

    #[test]
    fn globals_persist_between_runs() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        session.run("create x = 1\ndefine bump()\n  change x = x + 1\n  return with x\n", &mut stdout).unwrap();
        session.run("bump()\n", &mut stdout).unwrap();
        session.run("display(bump())\n", &mut stdout).unwrap();
        assert_eq!(String::from_utf8(stdout).unwrap(), "3\n");
    }

    #[test]
    fn failed_create_leaves_no_binding() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        let errors = session.run("create y = 1 / 0\n", &mut stdout).unwrap_err();
        assert!(errors[0].error.is_runtime());

        let errors = session.run("display(y)\n", &mut stdout).unwrap_err();
        assert_eq!(errors[0].to_string(), "[line 1] ResolutionError at 'y': Undefined variable 'y'.");
        session.run("create y = 2\ndisplay(y)\n", &mut stdout).unwrap();
        assert_eq!(String::from_utf8(stdout).unwrap(), "2\n");
    }

    #[test]
    fn compile_errors_are_collected() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        let errors = session.run("display(a)\ndisplay(b)\nreturn\n", &mut stdout).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| !e.error.is_runtime()));
        assert!(stdout.is_empty());
    }

    #[test]
    fn fault_points_into_the_defining_entry() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        let define = "define f(accept n)\n  create padding = 1\n  return with 1 / n\n";
        session.run(define, &mut stdout).unwrap();
        session.run("display(2)\n", &mut stdout).unwrap();

        let errors = session.run("f(0)\n", &mut stdout).unwrap_err();
        assert_eq!(errors[0].to_string(), "[line 3] RuntimeError at '/': Division by zero is not allowed.");
        assert_eq!(errors[0].file, Some(0));

        let errors = session.run("f(1, 2)\n", &mut stdout).unwrap_err();
        assert_eq!(errors[0].to_string(), "[line 1] RuntimeError at ')': Expected 1 arguments but got 2.");
        assert_eq!(errors[0].file, Some(3));

        let mut output = termcolor::NoColor::new(Vec::new());
        let errors = session.run("f(0)\n", &mut stdout).unwrap_err();
        report_err(&mut output, session.files(), &errors).unwrap();
        let output = String::from_utf8(output.into_inner()).unwrap();
        assert!(output.contains("return with 1 / n"), "{output}");
        assert!(!output.contains("f(0)"), "{output}");
    }

    #[test]
    fn compile_errors_name_their_entry() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        session.run("display(1)\n", &mut stdout).unwrap();
        let errors = session.run("display(a)\n", &mut stdout).unwrap_err();
        assert_eq!(errors[0].file, Some(1));
    }

    #[test]
    fn line_endings_are_normalized() {
        let mut session = Session::default();
        let mut stdout = Vec::new();
        session.run("if true\r\n  display(1)\r\ndisplay(2)\r\n", &mut stdout).unwrap();
        assert_eq!(String::from_utf8(stdout).unwrap(), "1\n2\n");
    }
}
