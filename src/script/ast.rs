//! Syntax tree produced by the parser.

use std::sync::Arc;

use super::value::Value;

/// A parsed program: function definitions and top-level constants.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Function definitions, in source order.
    pub functions: Vec<Arc<FnDef>>,
    /// Top-level `let` constants, evaluated in source order at load.
    pub constants: Vec<Constant>,
}

/// A top-level constant.
#[derive(Debug, Clone)]
pub struct Constant {
    /// Constant name.
    pub name: String,
    /// Initialiser.
    pub value: Expr,
    /// Source line.
    pub line: u32,
}

/// A function definition.
#[derive(Debug)]
pub struct FnDef {
    /// Function name.
    pub name: String,
    /// Declared parameters.
    pub params: Vec<Param>,
    /// Body statements.
    pub body: Vec<Stmt>,
    /// Line of the `fn` keyword.
    pub line: u32,
}

impl FnDef {
    /// Number of parameters without a default value.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}

/// A function parameter.
#[derive(Debug)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Default value expression, evaluated at call time.
    pub default: Option<Expr>,
}

/// Statements.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let name = value;`
    Let {
        /// Bound name.
        name: String,
        /// Initialiser.
        value: Expr,
        /// Source line.
        line: u32,
    },
    /// `target = value;`
    Assign {
        /// Variable name at the root of the target.
        name: String,
        /// Index chain, outermost first (`x[a][b]` is `[a, b]`).
        path: Vec<Expr>,
        /// Assigned value.
        value: Expr,
        /// Source line.
        line: u32,
    },
    /// `if` / `else if` / `else`.
    If {
        /// Condition and body pairs.
        branches: Vec<(Expr, Vec<Stmt>)>,
        /// Final `else` body.
        otherwise: Option<Vec<Stmt>>,
    },
    /// `while cond { body }`
    While {
        /// Loop condition.
        cond: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// `for var in iter { body }`
    For {
        /// Loop variable.
        var: String,
        /// Iterated value.
        iter: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// Source line.
        line: u32,
    },
    /// `return;` or `return value;`
    Return(Option<Expr>),
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// Expression evaluated for effect.
    Expr(Expr),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

/// Short-circuiting logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// `and`
    And,
    /// `or`
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
}

/// A call argument, optionally named.
#[derive(Debug, Clone)]
pub struct Arg {
    /// Parameter name for keyword arguments.
    pub name: Option<String>,
    /// Argument expression.
    pub value: Expr,
}

/// Expressions. Every node carries the line it starts on.
#[derive(Debug, Clone)]
pub struct Expr {
    /// Node kind.
    pub kind: ExprKind,
    /// Source line.
    pub line: u32,
}

/// Expression kinds.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Literal constant.
    Literal(Value),
    /// Variable reference.
    Ident(String),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `{"k": v}`
    Map(Vec<(Expr, Expr)>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `a and b`, `a or b`
    Logic(LogicOp, Box<Expr>, Box<Expr>),
    /// `name(args)`
    Call(String, Vec<Arg>),
    /// `target[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `target[start:end]`
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
}
