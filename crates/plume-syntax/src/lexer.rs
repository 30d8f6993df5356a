use crate::token::{Literal, Token, TokenKind};

use logos::Logos;
use plume_common::error::{Diagnostics, ErrorS, LexicalError, Location};

use std::borrow::Cow;

/// Columns a tab advances the primary indentation measure to the next
/// multiple of.
pub const TAB_WIDTH: usize = 8;
/// Columns a tab advances the alternate indentation measure by.
pub const ALT_TAB_WIDTH: usize = 1;
pub const MAX_INDENT_DEPTH: usize = 100;

/// Rewrites `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_newlines(source: &str) -> Cow<'_, str> {
    if source.contains('\r') {
        Cow::Owned(source.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(source)
    }
}

/// The indentation of one line, measured twice.
///
/// Two lines are consistently indented only if both measures agree on how
/// they compare. A tab counts 8 columns in `col` but 1 in `alt`, so mixing
/// tabs and spaces shows up as a disagreement even when `col` alone looks
/// fine.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Indent {
    col: usize,
    alt: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    indents: Vec<Indent>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, tokens: Vec::new(), indents: vec![Indent::default()] }
    }

    /// Scans the whole source. Errors are recorded in `diagnostics` and
    /// scanning carries on, so the returned stream always ends with
    /// [`TokenKind::Eof`] and has as many DEDENTs as INDENTs.
    pub fn scan(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        let mut offset = 0;
        let mut line = 0;
        for text in self.source.split_inclusive('\n') {
            line += 1;
            let terminated = text.ends_with('\n');
            let text = text.strip_suffix('\n').unwrap_or(text);
            self.scan_line(text, offset, line, terminated, diagnostics);
            offset += text.len() + usize::from(terminated);
        }

        let line = line.max(1);
        let end = self.source.len();
        let eof_span = end..end;
        if !self.source.is_empty() && !self.source.ends_with('\n') && self.indents.len() > 1 {
            diagnostics.push(ErrorS::new(
                LexicalError::MissingFinalNewline,
                line,
                Location::EndOfFile,
                eof_span.clone(),
            ));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", line, eof_span.clone()));
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", line, eof_span));

        tracing::debug!(tokens = self.tokens.len(), errors = diagnostics.len(), "scanned source");
        self.tokens
    }

    fn scan_line(
        &mut self,
        text: &str,
        offset: usize,
        line: usize,
        terminated: bool,
        diagnostics: &mut Diagnostics,
    ) {
        let mut current = Indent::default();
        let mut width = 0;
        for c in text.chars() {
            match c {
                ' ' => {
                    current.col += 1;
                    current.alt += 1;
                }
                '\t' => {
                    current.col = (current.col / TAB_WIDTH + 1) * TAB_WIDTH;
                    current.alt += ALT_TAB_WIDTH;
                }
                '\x0c' => current = Indent::default(),
                _ => break,
            }
            width += c.len_utf8();
        }

        let rest = &text[width..];
        if rest.trim().is_empty() || rest.starts_with("//") {
            return;
        }

        let indent = Token::new(TokenKind::Indent, &text[..width], line, offset..offset + width);
        self.measure(current, indent, diagnostics);

        let base = offset + width;
        let mut lexer = TokenKind::lexer(rest);
        while let Some(kind) = lexer.next() {
            let span = lexer.span();
            let slice = lexer.slice();
            let abs = base + span.start..base + span.end;
            match kind {
                TokenKind::Error if slice.starts_with('"') => {
                    // A text literal runs to the end of the line at most.
                    let lexeme = &rest[span.start..];
                    diagnostics.push(ErrorS::new(
                        LexicalError::UnterminatedText,
                        line,
                        Location::Lexeme(lexeme.to_string()),
                        abs.start..base + rest.len(),
                    ));
                    break;
                }
                TokenKind::Error => {
                    diagnostics.push(ErrorS::new(
                        LexicalError::UnexpectedCharacter,
                        line,
                        Location::Lexeme(slice.to_string()),
                        abs,
                    ));
                }
                TokenKind::Number => {
                    let mut token = Token::new(kind, slice, line, abs);
                    // The regex only admits digits with an optional fraction.
                    token.literal = slice.parse::<f64>().ok().map(Literal::Number);
                    self.tokens.push(token);
                }
                TokenKind::Text => {
                    let mut token = Token::new(kind, slice, line, abs);
                    token.literal = Some(Literal::Text(slice[1..slice.len() - 1].to_string()));
                    self.tokens.push(token);
                }
                kind => self.tokens.push(Token::new(kind, slice, line, abs)),
            }
        }

        let end = offset + text.len();
        let span = if terminated { end..end + 1 } else { end..end };
        self.tokens.push(Token::new(TokenKind::Newline, "\n", line, span));
    }

    /// Compares the indentation of a non-blank line against the indent stack
    /// and emits the INDENT or DEDENT tokens it implies.
    fn measure(&mut self, current: Indent, indent: Token, diagnostics: &mut Diagnostics) {
        let mut top = self.top();
        if current.col == top.col {
            if current.alt != top.alt {
                diagnostics.push(indent.error(LexicalError::InconsistentIndentation));
            }
        } else if current.col > top.col {
            if current.alt <= top.alt {
                diagnostics.push(indent.error(LexicalError::InconsistentIndentation));
            }
            if self.indents.len() > MAX_INDENT_DEPTH {
                diagnostics
                    .push(indent.error(LexicalError::IndentationTooDeep { max: MAX_INDENT_DEPTH }));
            }
            self.indents.push(current);
            self.tokens.push(indent);
        } else {
            while self.indents.len() > 1 && current.col < top.col {
                self.indents.pop();
                let span = indent.span.end..indent.span.end;
                self.tokens.push(Token::new(TokenKind::Dedent, "", indent.line, span));
                top = self.top();
            }
            if current.col != top.col {
                diagnostics.push(indent.error(LexicalError::UnmatchedIndentation));
            } else if current.alt != top.alt {
                diagnostics.push(indent.error(LexicalError::InconsistentIndentation));
            }
        }
    }

    fn top(&self) -> Indent {
        self.indents.last().copied().unwrap_or_default()
    }
}
