pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

use crate::ast::Program;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::token::TokenKind;

use plume_common::error::{Diagnostics, ErrorS};

/// Scans and parses `source`. The parser only runs if scanning succeeded.
pub fn parse(source: &str) -> Result<Program, Vec<ErrorS>> {
    let mut diagnostics = Diagnostics::default();
    let tokens = Lexer::new(source).scan(&mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics.into_errors());
    }
    let program = Parser::new(tokens, &mut diagnostics).parse();
    if diagnostics.has_errors() {
        return Err(diagnostics.into_errors());
    }
    Ok(program)
}

/// Whether an interactive entry can be run as-is. An entry that opens a block
/// stays incomplete until it ends with an empty line.
pub fn is_complete(source: &str) -> bool {
    if source.ends_with('\n') || source.trim().is_empty() {
        return true;
    }
    let mut diagnostics = Diagnostics::default();
    let tokens = Lexer::new(source).scan(&mut diagnostics);
    !tokens.iter().any(|token| {
        matches!(
            token.kind,
            TokenKind::Define | TokenKind::If | TokenKind::Otherwise | TokenKind::Repeat
        )
    })
}
