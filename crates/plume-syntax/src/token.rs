use logos::Logos;
use plume_common::error::{Error, ErrorS, Location};
use plume_common::types::Span;

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
pub enum TokenKind {
    // Single-character tokens.
    #[token("(")]
    LtParen,
    #[token(")")]
    RtParen,
    #[token(",")]
    Comma,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("/")]
    Slash,
    #[token("*")]
    Asterisk,

    // One or two character tokens.
    #[token("=")]
    Equal,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,

    // Literals.
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
    #[regex(r#""[^"\n]*""#)]
    Text,
    #[regex("[0-9]+", lex_fraction)]
    Number,

    // Keywords.
    #[token("accept")]
    Accept,
    #[token("and")]
    And,
    #[token("change")]
    Change,
    #[token("create")]
    Create,
    #[token("define")]
    Define,
    #[token("empty")]
    Empty,
    #[token("equals")]
    Equals,
    #[token("false")]
    False,
    #[token("if")]
    If,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("otherwise")]
    Otherwise,
    #[token("repeat")]
    Repeat,
    #[token("return")]
    Return,
    #[token("times")]
    Times,
    #[token("true")]
    True,
    #[token("unequals")]
    Unequals,
    #[token("while")]
    While,
    #[token("with")]
    With,

    // Produced by the indentation tracker, never by the line lexer.
    Newline,
    Indent,
    Dedent,
    Eof,

    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[error]
    Error,
}

impl TokenKind {
    /// Keywords that can only appear at the start of a statement.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Change
                | TokenKind::Create
                | TokenKind::Define
                | TokenKind::If
                | TokenKind::Repeat
                | TokenKind::Return
        )
    }
}

/// Extends an integer literal with a fractional part, but only when the dot
/// is followed by at least one digit.
fn lex_fraction(lexer: &mut logos::Lexer<TokenKind>) -> bool {
    let remainder = lexer.remainder().as_bytes();
    if remainder.first() == Some(&b'.') {
        let digits = remainder[1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            lexer.bump(1 + digits);
        }
    }
    true
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, span: Span) -> Self {
        Self { kind, lexeme: lexeme.into(), literal: None, line, span }
    }

    pub fn location(&self) -> Location {
        match self.kind {
            TokenKind::Dedent => Location::Dedent,
            TokenKind::Eof => Location::EndOfFile,
            TokenKind::Indent => Location::Indent,
            TokenKind::Newline => Location::EndOfLine,
            _ => Location::Lexeme(self.lexeme.clone()),
        }
    }

    /// Builds a diagnostic pinned to this token.
    pub fn error(&self, error: impl Into<Error>) -> ErrorS {
        ErrorS::new(error, self.line, self.location(), self.span.clone())
    }
}
