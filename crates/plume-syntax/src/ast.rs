use crate::token::Token;

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub enum Stmt {
    Block(StmtBlock),
    Change(Box<StmtChange>),
    Create(Box<StmtCreate>),
    Define(Rc<StmtDefine>),
    Expr(StmtExpr),
    If(Box<StmtIf>),
    RepeatTimes(Box<StmtRepeatTimes>),
    RepeatWhile(Box<StmtRepeatWhile>),
    Return(StmtReturn),
    ReturnWith(Box<StmtReturnWith>),
}

/// An ordered list of statements with a scope of its own.
#[derive(Debug, PartialEq)]
pub struct StmtBlock {
    pub stmts: Vec<Stmt>,
}

/// Rebinds an existing variable.
#[derive(Debug, PartialEq)]
pub struct StmtChange {
    pub target: ExprVariable,
    pub value: Expr,
}

/// Declares a variable in the current scope and initializes it.
#[derive(Debug, PartialEq)]
pub struct StmtCreate {
    pub name: Token,
    pub value: Expr,
}

#[derive(Debug, PartialEq)]
pub struct StmtDefine {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: StmtBlock,
}

/// An expression statement evaluates an expression and discards the result.
#[derive(Debug, PartialEq)]
pub struct StmtExpr {
    pub value: Expr,
}

#[derive(Debug, PartialEq)]
pub struct StmtIf {
    pub token: Token,
    pub cond: Expr,
    pub then: StmtBlock,
    pub else_ifs: Vec<ElseIf>,
    pub else_: Option<StmtBlock>,
}

#[derive(Debug, PartialEq)]
pub struct ElseIf {
    pub token: Token,
    pub cond: Expr,
    pub then: StmtBlock,
}

#[derive(Debug, PartialEq)]
pub struct StmtRepeatTimes {
    pub token: Token,
    pub count: Expr,
    pub body: StmtBlock,
}

#[derive(Debug, PartialEq)]
pub struct StmtRepeatWhile {
    pub token: Token,
    pub cond: Expr,
    pub body: StmtBlock,
}

#[derive(Debug, PartialEq)]
pub struct StmtReturn {
    pub token: Token,
}

#[derive(Debug, PartialEq)]
pub struct StmtReturnWith {
    pub token: Token,
    pub value: Expr,
}

#[remain::sorted]
#[derive(Debug, PartialEq)]
pub enum Expr {
    Binary(Box<ExprBinary>),
    Call(Box<ExprCall>),
    Grouping(Box<ExprGrouping>),
    Literal(ExprLiteral),
    Logical(Box<ExprLogical>),
    Unary(Box<ExprUnary>),
    Variable(ExprVariable),
}

#[derive(Debug, PartialEq)]
pub struct ExprBinary {
    pub lt: Expr,
    pub op: OpBinary,
    pub token: Token,
    pub rt: Expr,
}

#[derive(Debug, PartialEq)]
pub struct ExprCall {
    pub callee: Expr,
    /// The closing parenthesis, where call faults are reported.
    pub paren: Token,
    pub args: Vec<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct ExprGrouping {
    pub expr: Expr,
}

#[derive(Debug, PartialEq)]
pub enum ExprLiteral {
    Bool(bool),
    Empty,
    Number(f64),
    Text(String),
}

#[derive(Debug, PartialEq)]
pub struct ExprLogical {
    pub lt: Expr,
    pub op: OpLogical,
    pub token: Token,
    pub rt: Expr,
}

#[derive(Debug, PartialEq)]
pub struct ExprUnary {
    pub op: OpUnary,
    pub token: Token,
    pub rt: Expr,
}

/// A reference to a variable. The span of `name` identifies the reference
/// site in the resolver's scope map.
#[derive(Debug, PartialEq)]
pub struct ExprVariable {
    pub name: Token,
}

impl ExprVariable {
    pub fn name(&self) -> &str {
        &self.name.lexeme
    }
}

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpBinary {
    Add,
    Divide,
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Multiply,
    NotEqual,
    Subtract,
}

impl Display for OpBinary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = match self {
            OpBinary::Add => "+",
            OpBinary::Divide => "/",
            OpBinary::Equal => "equals",
            OpBinary::Greater => ">",
            OpBinary::GreaterEqual => ">=",
            OpBinary::Less => "<",
            OpBinary::LessEqual => "<=",
            OpBinary::Multiply => "*",
            OpBinary::NotEqual => "unequals",
            OpBinary::Subtract => "-",
        };
        write!(f, "{op}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpLogical {
    /// Short-circuiting logical AND.
    And,
    /// Short-circuiting logical OR.
    Or,
}

impl Display for OpLogical {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OpLogical::And => write!(f, "and"),
            OpLogical::Or => write!(f, "or"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpUnary {
    Negate,
    Not,
}

impl Display for OpUnary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OpUnary::Negate => write!(f, "-"),
            OpUnary::Not => write!(f, "not"),
        }
    }
}
