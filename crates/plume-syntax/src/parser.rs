use crate::ast::{
    ElseIf, Expr, ExprBinary, ExprCall, ExprGrouping, ExprLiteral, ExprLogical, ExprUnary,
    ExprVariable, OpBinary, OpLogical, OpUnary, Program, Stmt, StmtBlock, StmtChange, StmtCreate,
    StmtDefine, StmtExpr, StmtIf, StmtRepeatTimes, StmtRepeatWhile, StmtReturn, StmtReturnWith,
};
use crate::token::{Literal, Token, TokenKind};

use plume_common::error::{Diagnostics, ErrorS, SyntaxError};
use plume_common::stack::ensure_sufficient_stack;

use std::rc::Rc;

/// Maximum number of arguments in a call, and of parameters in a definition.
pub const MAX_ARGS: usize = 255;

type Result<T, E = ErrorS> = std::result::Result<T, E>;

/// Recursive-descent parser over the scanner's token stream.
///
/// A malformed statement is reported to the [`Diagnostics`] and skipped, and
/// parsing resumes at the next statement, so one run can report several
/// independent errors.
pub struct Parser<'d> {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Parser<'d> {
    /// `tokens` must end with [`TokenKind::Eof`], as produced by the lexer.
    pub fn new(tokens: Vec<Token>, diagnostics: &'d mut Diagnostics) -> Self {
        Self { tokens, current: 0, diagnostics }
    }

    pub fn parse(mut self) -> Program {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::Eof) {
            // A stray DEDENT closes nothing at the top level.
            if self.check(TokenKind::Dedent) {
                self.advance();
                continue;
            }
            self.statement_or_recover(&mut stmts);
        }
        tracing::debug!(stmts = stmts.len(), errors = self.diagnostics.len(), "parsed program");
        Program { stmts }
    }

    fn statement_or_recover(&mut self, stmts: &mut Vec<Stmt>) {
        match self.statement() {
            Ok(stmt) => stmts.push(stmt),
            Err(e) => {
                self.diagnostics.push(e);
                self.synchronize();
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| match self.peek().kind {
            TokenKind::Change => self.change(),
            TokenKind::Create => self.create(),
            TokenKind::Define => self.define(),
            TokenKind::If => self.if_(),
            TokenKind::Indent => Err(self.peek().error(SyntaxError::UnexpectedIndent)),
            TokenKind::Repeat => self.repeat(),
            TokenKind::Return => self.return_(),
            _ => self.expr_stmt(),
        })
    }

    fn change(&mut self) -> Result<Stmt> {
        self.advance();
        let target = self.expression()?;
        let equal = self.consume(TokenKind::Equal, "'=' after the target of 'change'")?;
        let value = self.expression()?;
        let Expr::Variable(target) = target else {
            // Recovery resumes right after this line.
            return Err(equal.error(SyntaxError::InvalidChangeTarget));
        };
        self.end_of_statement()?;
        Ok(Stmt::Change(Box::new(StmtChange { target, value })))
    }

    fn create(&mut self) -> Result<Stmt> {
        self.advance();
        let name = self.consume(TokenKind::Identifier, "a variable name after 'create'")?;
        self.consume(TokenKind::Equal, "'=' after the variable name")?;
        let value = self.expression()?;
        self.end_of_statement()?;
        Ok(Stmt::Create(Box::new(StmtCreate { name, value })))
    }

    fn define(&mut self) -> Result<Stmt> {
        self.advance();
        let name = self.consume(TokenKind::Identifier, "a function name after 'define'")?;
        self.consume(TokenKind::LtParen, "'(' after the function name")?;
        let mut params = Vec::new();
        if self.match_(TokenKind::Accept) {
            loop {
                if params.len() == MAX_ARGS {
                    let e = self.peek().error(SyntaxError::TooManyParameters { max: MAX_ARGS });
                    self.diagnostics.push(e);
                }
                params.push(self.consume(TokenKind::Identifier, "a parameter name")?);
                if !self.match_(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RtParen, "')' after the parameters")?;
        let body = self.block()?;
        Ok(Stmt::Define(Rc::new(StmtDefine { name, params, body })))
    }

    fn if_(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let cond = self.expression()?;
        let then = self.block()?;
        let mut else_ifs = Vec::new();
        let mut else_ = None;
        while self.check(TokenKind::Otherwise) {
            self.advance();
            if self.check(TokenKind::If) {
                let token = self.advance();
                let cond = self.expression()?;
                let then = self.block()?;
                else_ifs.push(ElseIf { token, cond, then });
            } else {
                else_ = Some(self.block()?);
                break;
            }
        }
        Ok(Stmt::If(Box::new(StmtIf { token, cond, then, else_ifs, else_ })))
    }

    fn repeat(&mut self) -> Result<Stmt> {
        let token = self.advance();
        if self.match_(TokenKind::While) {
            let cond = self.expression()?;
            let body = self.block()?;
            return Ok(Stmt::RepeatWhile(Box::new(StmtRepeatWhile { token, cond, body })));
        }
        let count = self.expression()?;
        self.consume(TokenKind::Times, "'times' after the number of repetitions")?;
        let body = self.block()?;
        Ok(Stmt::RepeatTimes(Box::new(StmtRepeatTimes { token, count, body })))
    }

    fn return_(&mut self) -> Result<Stmt> {
        let token = self.advance();
        if self.match_(TokenKind::With) {
            let value = self.expression()?;
            self.end_of_statement()?;
            return Ok(Stmt::ReturnWith(Box::new(StmtReturnWith { token, value })));
        }
        self.end_of_statement()?;
        Ok(Stmt::Return(StmtReturn { token }))
    }

    fn expr_stmt(&mut self) -> Result<Stmt> {
        let value = self.expression()?;
        if let Expr::Variable(var) = &value {
            if self.check(TokenKind::Equal) {
                let name = var.name().to_string();
                return Err(self.peek().error(SyntaxError::MissingCreateOrChange { name }));
            }
        }
        self.end_of_statement()?;
        Ok(Stmt::Expr(StmtExpr { value }))
    }

    /// block → NEWLINE INDENT statement+ DEDENT
    fn block(&mut self) -> Result<StmtBlock> {
        self.end_of_statement()?;
        if !self.check(TokenKind::Indent) {
            return Err(self.peek().error(SyntaxError::ExpectedBlock));
        }
        self.advance();

        let mut stmts = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.check(TokenKind::Eof) {
            self.statement_or_recover(&mut stmts);
        }
        // Only reachable when every statement of the block was malformed.
        if stmts.is_empty() {
            let e = self.peek().error(SyntaxError::EmptyBlock);
            self.diagnostics.push(e);
        }
        self.consume(TokenKind::Dedent, "the end of the block")?;
        Ok(StmtBlock { stmts })
    }

    fn end_of_statement(&mut self) -> Result<()> {
        self.consume(TokenKind::Newline, "the end of the line")?;
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.or())
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;
        while self.check(TokenKind::Or) {
            let token = self.advance();
            let rt = self.and()?;
            expr = Expr::Logical(Box::new(ExprLogical { lt: expr, op: OpLogical::Or, token, rt }));
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;
        while self.check(TokenKind::And) {
            let token = self.advance();
            let rt = self.comparison()?;
            expr = Expr::Logical(Box::new(ExprLogical { lt: expr, op: OpLogical::And, token, rt }));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Equals => OpBinary::Equal,
                TokenKind::Unequals => OpBinary::NotEqual,
                TokenKind::Greater => OpBinary::Greater,
                TokenKind::GreaterEqual => OpBinary::GreaterEqual,
                TokenKind::Less => OpBinary::Less,
                TokenKind::LessEqual => OpBinary::LessEqual,
                _ => return Ok(expr),
            };
            let token = self.advance();
            let rt = self.additive()?;
            expr = Expr::Binary(Box::new(ExprBinary { lt: expr, op, token, rt }));
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => OpBinary::Add,
                TokenKind::Minus => OpBinary::Subtract,
                _ => return Ok(expr),
            };
            let token = self.advance();
            let rt = self.multiplicative()?;
            expr = Expr::Binary(Box::new(ExprBinary { lt: expr, op, token, rt }));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Asterisk => OpBinary::Multiply,
                TokenKind::Slash => OpBinary::Divide,
                _ => return Ok(expr),
            };
            let token = self.advance();
            let rt = self.unary()?;
            expr = Expr::Binary(Box::new(ExprBinary { lt: expr, op, token, rt }));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Not => OpUnary::Not,
            TokenKind::Minus => OpUnary::Negate,
            _ => return self.call(),
        };
        let token = self.advance();
        let rt = ensure_sufficient_stack(|| self.unary())?;
        Ok(Expr::Unary(Box::new(ExprUnary { op, token, rt })))
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        while self.match_(TokenKind::LtParen) {
            let mut args = Vec::new();
            if !self.check(TokenKind::RtParen) {
                loop {
                    if args.len() == MAX_ARGS {
                        let e = self.peek().error(SyntaxError::TooManyArguments { max: MAX_ARGS });
                        self.diagnostics.push(e);
                    }
                    args.push(self.expression()?);
                    if !self.match_(TokenKind::Comma) {
                        break;
                    }
                }
            }
            let paren = self.consume(TokenKind::RtParen, "')' after the arguments")?;
            expr = Expr::Call(Box::new(ExprCall { callee: expr, paren, args }));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        let expr = match self.peek().kind {
            TokenKind::False => Expr::Literal(ExprLiteral::Bool(false)),
            TokenKind::True => Expr::Literal(ExprLiteral::Bool(true)),
            TokenKind::Empty => Expr::Literal(ExprLiteral::Empty),
            TokenKind::Number | TokenKind::Text => {
                let token = self.advance();
                return Ok(Expr::Literal(match token.literal {
                    Some(Literal::Number(number)) => ExprLiteral::Number(number),
                    Some(Literal::Text(text)) => ExprLiteral::Text(text),
                    None => return Err(token.error(SyntaxError::ExpectedExpression)),
                }));
            }
            TokenKind::Identifier => {
                let name = self.advance();
                return Ok(Expr::Variable(ExprVariable { name }));
            }
            TokenKind::LtParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RtParen, "')' after the expression")?;
                return Ok(Expr::Grouping(Box::new(ExprGrouping { expr })));
            }
            _ => return Err(self.peek().error(SyntaxError::ExpectedExpression)),
        };
        self.advance();
        Ok(expr)
    }

    /// Skips past a malformed statement.
    ///
    /// The offending token is the current one. It is discarded, then tokens
    /// are skipped up to the next NEWLINE (consumed), statement keyword or
    /// DEDENT (left in place for the enclosing block). An INDENT that starts
    /// an illegal block is skipped together with everything up to its
    /// matching DEDENT, and so is the body of a header line that failed.
    fn synchronize(&mut self) {
        match self.peek().kind {
            TokenKind::Dedent | TokenKind::Eof => return,
            TokenKind::Indent => return self.skip_block(),
            TokenKind::Newline => {
                self.advance();
                return self.skip_orphan_block();
            }
            _ => {
                self.advance();
            }
        }
        loop {
            match self.peek().kind {
                TokenKind::Dedent | TokenKind::Eof => return,
                TokenKind::Indent => return self.skip_block(),
                TokenKind::Newline => {
                    self.advance();
                    return self.skip_orphan_block();
                }
                kind if kind.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_orphan_block(&mut self) {
        if self.check(TokenKind::Indent) {
            self.skip_block();
        }
    }

    /// Skips an INDENT ... DEDENT region, including nested ones.
    fn skip_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let expected = expected.to_string();
            Err(self.peek().error(SyntaxError::Expected { expected }))
        }
    }

    fn match_(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn peek(&self) -> &Token {
        // The stream always ends with EOF, which is never consumed.
        let idx = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    use plume_common::error::{Error, Location};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (Program, Vec<ErrorS>) {
        let mut diagnostics = Diagnostics::default();
        let tokens = Lexer::new(source).scan(&mut diagnostics);
        assert!(!diagnostics.has_errors(), "lexing failed: {:?}", diagnostics.errors());
        let program = Parser::new(tokens, &mut diagnostics).parse();
        (program, diagnostics.into_errors())
    }

    fn syntax_errors(source: &str) -> Vec<(usize, SyntaxError)> {
        let (_, errors) = parse(source);
        errors
            .into_iter()
            .map(|e| match e.error {
                Error::SyntaxError(syntax) => (e.line, syntax),
                e => panic!("expected a syntax error, got {e:?}"),
            })
            .collect()
    }

    fn expected(what: &str) -> SyntaxError {
        SyntaxError::Expected { expected: what.to_string() }
    }

    #[test]
    fn parse_precedence() {
        let (program, errors) = parse("1 + 2 * 3 < 10 and not false or x\n");
        assert_eq!(errors, vec![]);
        let Stmt::Expr(StmtExpr { value: Expr::Logical(or) }) = &program.stmts[0] else {
            panic!("expected a logical expression: {:?}", program.stmts[0]);
        };
        assert_eq!(or.op, OpLogical::Or);
        let Expr::Logical(and) = &or.lt else { panic!("expected 'and' on the left") };
        assert_eq!(and.op, OpLogical::And);
        let Expr::Binary(less) = &and.lt else { panic!("expected '<' on the left") };
        assert_eq!(less.op, OpBinary::Less);
        let Expr::Binary(add) = &less.lt else { panic!("expected '+' on the left") };
        assert_eq!(add.op, OpBinary::Add);
        assert!(matches!(&add.rt, Expr::Binary(mul) if mul.op == OpBinary::Multiply));
        assert!(matches!(&and.rt, Expr::Unary(not) if not.op == OpUnary::Not));
    }

    #[test]
    fn parse_binary_is_left_associative() {
        let (program, _) = parse("8 - 4 - 2\n");
        let Stmt::Expr(StmtExpr { value: Expr::Binary(outer) }) = &program.stmts[0] else {
            panic!("expected a binary expression");
        };
        assert!(matches!(&outer.rt, Expr::Literal(ExprLiteral::Number(n)) if *n == 2.0));
        assert!(matches!(&outer.lt, Expr::Binary(_)));
    }

    #[test]
    fn parse_chained_calls() {
        let (program, errors) = parse("make()(1, 2)\n");
        assert_eq!(errors, vec![]);
        let Stmt::Expr(StmtExpr { value: Expr::Call(outer) }) = &program.stmts[0] else {
            panic!("expected a call");
        };
        assert_eq!(outer.args.len(), 2);
        assert_eq!(outer.paren.lexeme, ")");
        assert!(matches!(&outer.callee, Expr::Call(inner) if inner.args.is_empty()));
    }

    #[test]
    fn parse_statements() {
        let source = "\
define add(accept a, b)
  return with a + b
create x = add(1, 2)
change x = x * 2
if x equals 6
  display(x)
otherwise if x > 6
  return
otherwise
  display(0)
repeat 3 times
  display(1)
repeat while false
  display(2)
";
        let (program, errors) = parse(source);
        assert_eq!(errors, vec![]);
        assert_eq!(program.stmts.len(), 6);

        let Stmt::Define(define) = &program.stmts[0] else { panic!("expected define") };
        assert_eq!(define.name.lexeme, "add");
        let params = define.params.iter().map(|p| p.lexeme.as_str()).collect::<Vec<_>>();
        assert_eq!(params, vec!["a", "b"]);
        assert!(matches!(define.body.stmts.as_slice(), [Stmt::ReturnWith(_)]));

        assert!(matches!(&program.stmts[1], Stmt::Create(create) if create.name.lexeme == "x"));
        assert!(matches!(&program.stmts[2], Stmt::Change(change) if change.target.name() == "x"));

        let Stmt::If(if_) = &program.stmts[3] else { panic!("expected if") };
        assert_eq!(if_.else_ifs.len(), 1);
        assert!(matches!(if_.else_ifs[0].then.stmts.as_slice(), [Stmt::Return(_)]));
        assert!(if_.else_.is_some());

        assert!(matches!(&program.stmts[4], Stmt::RepeatTimes(_)));
        assert!(matches!(&program.stmts[5], Stmt::RepeatWhile(_)));
    }

    #[test]
    fn parse_define_without_parameters() {
        let (program, errors) = parse("define f()\n  return\n");
        assert_eq!(errors, vec![]);
        assert!(matches!(&program.stmts[0], Stmt::Define(define) if define.params.is_empty()));
    }

    #[test]
    fn parse_missing_create_or_change() {
        let (_, errors) = parse("x = 5\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error,
            Error::SyntaxError(SyntaxError::MissingCreateOrChange { name: "x".to_string() })
        );
        assert_eq!(errors[0].location, Location::Lexeme("=".to_string()));
    }

    #[test]
    fn parse_invalid_change_target() {
        let (program, errors) = parse("change f() = 1\ndisplay(2)\nchange (x) = 1 2\ndisplay(3)\n");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error, Error::SyntaxError(SyntaxError::InvalidChangeTarget));
        assert_eq!(errors[0].location, Location::Lexeme("=".to_string()));
        assert_eq!(errors[1].line, 3);
        assert_eq!(program.stmts.len(), 2);
        assert!(program.stmts.iter().all(|stmt| matches!(stmt, Stmt::Expr(_))));
    }

    #[test]
    fn parse_reports_independent_errors() {
        let source = "create = 1\ndisplay(1)\ncreate y 2\ndisplay(2)\n";
        let (program, errors) = parse(source);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 3);
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn parse_skips_illegal_nested_block() {
        let source = "display(1)\n    create = =\n    x = y\ndisplay(3)\n";
        assert_eq!(syntax_errors(source), vec![(2, SyntaxError::UnexpectedIndent)]);
        let (program, _) = parse(source);
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn parse_failed_header_skips_its_body() {
        let source = "if x y\n  create = 1\ndisplay(1)\n";
        assert_eq!(syntax_errors(source), vec![(1, expected("the end of the line"))]);
        let (program, _) = parse(source);
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn parse_recovers_inside_block() {
        let source = "if x\n  create = 1\n  display(1)\n  )\ndisplay(2)\n";
        assert_eq!(syntax_errors(source), vec![
            (2, expected("a variable name after 'create'")),
            (4, SyntaxError::ExpectedExpression),
        ]);
        let (program, _) = parse(source);
        assert_eq!(program.stmts.len(), 2);
        let Stmt::If(if_) = &program.stmts[0] else { panic!("expected if") };
        assert_eq!(if_.then.stmts.len(), 1);
    }

    #[test]
    fn parse_error_at_end_of_line_keeps_next_statement() {
        let source = "create x =\ndisplay(1)\n";
        assert_eq!(syntax_errors(source), vec![(1, SyntaxError::ExpectedExpression)]);
        let (program, _) = parse(source);
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn parse_block_left_empty_by_recovery() {
        let source = "if x\n  )\ndisplay(1)\n";
        assert_eq!(syntax_errors(source), vec![
            (2, SyntaxError::ExpectedExpression),
            (3, SyntaxError::EmptyBlock),
        ]);
        let (program, _) = parse(source);
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn parse_missing_block() {
        assert_eq!(syntax_errors("if x\ndisplay(1)\n"), vec![(2, SyntaxError::ExpectedBlock)]);
    }

    #[test]
    fn parse_missing_times() {
        assert_eq!(syntax_errors("repeat 3\n  display(1)\n"), vec![(
            1,
            expected("'times' after the number of repetitions")
        )]);
    }

    #[test]
    fn parse_dangling_otherwise() {
        assert_eq!(syntax_errors("otherwise\n  display(1)\ndisplay(2)\n"), vec![(
            1,
            SyntaxError::ExpectedExpression
        )]);
    }

    #[test]
    fn parse_too_many_arguments() {
        let args = vec!["1"; MAX_ARGS + 1].join(", ");
        let source = format!("f({args})\ndisplay(1)\n");
        let (program, errors) = parse(&source);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error,
            Error::SyntaxError(SyntaxError::TooManyArguments { max: MAX_ARGS })
        );
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn parse_too_many_parameters() {
        let params = (0..=MAX_ARGS).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ");
        let source = format!("define f(accept {params})\n  return\n");
        assert_eq!(syntax_errors(&source), vec![(1, SyntaxError::TooManyParameters {
            max: MAX_ARGS
        })]);
    }

    #[test]
    fn parse_unclosed_call_at_end_of_input() {
        let (_, errors) = parse("display(1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location, Location::EndOfLine);
    }
}
