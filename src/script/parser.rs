//! Recursive-descent parser producing a [`Program`].

use std::collections::HashSet;
use std::sync::Arc;

use super::ast::{
    Arg, BinOp, Constant, Expr, ExprKind, FnDef, LogicOp, Param, Program, Stmt, UnaryOp,
};
use super::error::ScriptError;
use super::lexer::{tokenize, Tok, Token};
use super::value::Value;

/// Maximum nesting of expressions and blocks.
const MAX_NESTING: usize = 128;

/// Parse source text into a program.
///
/// # Errors
///
/// Returns [`ScriptError::Syntax`] for any lexical or grammatical error,
/// duplicate function names, or nesting deeper than the parser allows.
pub fn parse(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        loops: 0,
    };
    parser.program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    loops: usize,
}

impl Parser {
    // -----------------------------------------------------------------------
    // Token cursor
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.saturating_add(offset).min(last)].tok
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.tok != Tok::Eof {
            self.pos = self.pos.saturating_add(1);
        }
        token
    }

    fn check(&self, tok: &Tok) -> bool {
        &self.peek().tok == tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.check(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ScriptError {
        let token = self.peek();
        ScriptError::syntax(token.line, token.column, message)
    }

    fn expect(&mut self, tok: &Tok, context: &str) -> Result<Token, ScriptError> {
        if self.check(tok) {
            Ok(self.advance())
        } else {
            let found = self.peek().tok.describe();
            Err(self.error_here(format!(
                "expected {} {context}, found {found}",
                tok.describe()
            )))
        }
    }

    fn ident(&mut self, context: &str) -> Result<(String, u32), ScriptError> {
        let token = self.peek().clone();
        match token.tok {
            Tok::Ident(name) => {
                self.advance();
                Ok((name, token.line))
            }
            other => Err(self.error_here(format!(
                "expected identifier {context}, found {}",
                other.describe()
            ))),
        }
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth = self.depth.saturating_add(1);
        if self.depth > MAX_NESTING {
            return Err(self.error_here(format!("nesting deeper than {MAX_NESTING} levels")));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    fn program(&mut self) -> Result<Program, ScriptError> {
        let mut program = Program::default();
        let mut seen = HashSet::new();
        loop {
            match self.peek().tok.clone() {
                Tok::Eof => return Ok(program),
                Tok::Fn => {
                    let line = self.peek().line;
                    let column = self.peek().column;
                    let def = self.function()?;
                    if !seen.insert(def.name.clone()) {
                        return Err(ScriptError::syntax(
                            line,
                            column,
                            format!("function '{}' is defined more than once", def.name),
                        ));
                    }
                    program.functions.push(Arc::new(def));
                }
                Tok::Let => {
                    let line = self.advance().line;
                    let (name, _) = self.ident("after 'let'")?;
                    self.expect(&Tok::Assign, "in constant definition")?;
                    let value = self.expr()?;
                    self.expect(&Tok::Semi, "after constant definition")?;
                    program.constants.push(Constant { name, value, line });
                }
                other => {
                    let found = other.describe();
                    return Err(self.error_here(format!(
                        "expected 'fn' or 'let' at top level, found {found}"
                    )));
                }
            }
        }
    }

    fn function(&mut self) -> Result<FnDef, ScriptError> {
        let line = self.expect(&Tok::Fn, "")?.line;
        let (name, _) = self.ident("after 'fn'")?;
        self.expect(&Tok::LParen, "after function name")?;
        let mut params: Vec<Param> = Vec::new();
        while !self.check(&Tok::RParen) {
            let (param, _) = self.ident("in parameter list")?;
            if params.iter().any(|p| p.name == param) {
                return Err(self.error_here(format!("duplicate parameter '{param}'")));
            }
            let default = if self.eat(&Tok::Assign) {
                Some(self.expr()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(self.error_here(format!(
                        "parameter '{param}' without default follows a defaulted parameter"
                    )));
                }
                None
            };
            params.push(Param {
                name: param,
                default,
            });
            if !self.eat(&Tok::Comma) {
                break;
            }
        }
        self.expect(&Tok::RParen, "to close parameter list")?;
        let body = self.block()?;
        Ok(FnDef {
            name,
            params,
            body,
            line,
        })
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect(&Tok::LBrace, "to open block")?;
        self.enter()?;
        let mut body = Vec::new();
        while !self.check(&Tok::RBrace) {
            if self.check(&Tok::Eof) {
                return Err(self.error_here("expected '}' to close block, found end of input"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        self.leave();
        Ok(body)
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.peek().line;
        match self.peek().tok.clone() {
            Tok::Let => {
                self.advance();
                let (name, _) = self.ident("after 'let'")?;
                self.expect(&Tok::Assign, "in 'let' statement")?;
                let value = self.expr()?;
                self.expect(&Tok::Semi, "after 'let' statement")?;
                Ok(Stmt::Let { name, value, line })
            }
            Tok::If => self.if_statement(),
            Tok::While => {
                self.advance();
                let cond = self.expr()?;
                let body = self.loop_body()?;
                Ok(Stmt::While { cond, body })
            }
            Tok::For => {
                self.advance();
                let (var, _) = self.ident("after 'for'")?;
                self.expect(&Tok::In, "in 'for' loop")?;
                let iter = self.expr()?;
                let body = self.loop_body()?;
                Ok(Stmt::For {
                    var,
                    iter,
                    body,
                    line,
                })
            }
            Tok::Return => {
                self.advance();
                let value = if self.check(&Tok::Semi) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(&Tok::Semi, "after 'return'")?;
                Ok(Stmt::Return(value))
            }
            Tok::Break | Tok::Continue if self.loops == 0 => {
                Err(self.error_here(format!("{} outside loop", self.peek().tok.describe())))
            }
            Tok::Break => {
                self.advance();
                self.expect(&Tok::Semi, "after 'break'")?;
                Ok(Stmt::Break)
            }
            Tok::Continue => {
                self.advance();
                self.expect(&Tok::Semi, "after 'continue'")?;
                Ok(Stmt::Continue)
            }
            Tok::Fn => Err(self.error_here("functions can only be defined at top level")),
            _ => self.expression_statement(line),
        }
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.loops = self.loops.saturating_add(1);
        let body = self.block();
        self.loops = self.loops.saturating_sub(1);
        body
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        self.expect(&Tok::If, "")?;
        loop {
            let cond = self.expr()?;
            let body = self.block()?;
            branches.push((cond, body));
            if !self.eat(&Tok::Else) {
                break;
            }
            if !self.eat(&Tok::If) {
                otherwise = Some(self.block()?);
                break;
            }
        }
        Ok(Stmt::If {
            branches,
            otherwise,
        })
    }

    fn expression_statement(&mut self, line: u32) -> Result<Stmt, ScriptError> {
        let target = self.expr()?;
        if self.eat(&Tok::Assign) {
            let (name, path) = assignment_target(target).ok_or_else(|| {
                ScriptError::syntax(line, 1, "invalid assignment target")
            })?;
            let value = self.expr()?;
            self.expect(&Tok::Semi, "after assignment")?;
            return Ok(Stmt::Assign {
                name,
                path,
                value,
                line,
            });
        }
        self.expect(&Tok::Semi, "after expression")?;
        Ok(Stmt::Expr(target))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.or_expr();
        self.leave();
        expr
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.and_expr()?;
        while self.check(&Tok::Or) {
            let line = self.advance().line;
            let rhs = self.and_expr()?;
            lhs = Expr {
                kind: ExprKind::Logic(LogicOp::Or, Box::new(lhs), Box::new(rhs)),
                line,
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.not_expr()?;
        while self.check(&Tok::And) {
            let line = self.advance().line;
            let rhs = self.not_expr()?;
            lhs = Expr {
                kind: ExprKind::Logic(LogicOp::And, Box::new(lhs), Box::new(rhs)),
                line,
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.check(&Tok::Not) {
            let line = self.advance().line;
            self.enter()?;
            let operand = self.not_expr();
            self.leave();
            return Ok(Expr {
                kind: ExprKind::Unary(UnaryOp::Not, Box::new(operand?)),
                line,
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek().tok.clone() {
                Tok::Eq => BinOp::Eq,
                Tok::Ne => BinOp::Ne,
                Tok::Lt => BinOp::Lt,
                Tok::Le => BinOp::Le,
                Tok::Gt => BinOp::Gt,
                Tok::Ge => BinOp::Ge,
                Tok::In => BinOp::In,
                Tok::Not if self.peek_at(1) == &Tok::In => {
                    self.advance();
                    BinOp::NotIn
                }
                _ => return Ok(lhs),
            };
            let line = self.advance().line;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match &self.peek().tok {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            let line = self.advance().line;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match &self.peek().tok {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Rem,
                _ => return Ok(lhs),
            };
            let line = self.advance().line;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs, line);
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.check(&Tok::Minus) {
            let line = self.advance().line;
            self.enter()?;
            let operand = self.unary();
            self.leave();
            return Ok(Expr {
                kind: ExprKind::Unary(UnaryOp::Neg, Box::new(operand?)),
                line,
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        while self.check(&Tok::LBracket) {
            let line = self.advance().line;
            let start = if self.check(&Tok::Colon) {
                None
            } else {
                Some(self.expr()?)
            };
            if self.eat(&Tok::Colon) {
                let end = if self.check(&Tok::RBracket) {
                    None
                } else {
                    Some(Box::new(self.expr()?))
                };
                self.expect(&Tok::RBracket, "to close slice")?;
                expr = Expr {
                    kind: ExprKind::Slice(Box::new(expr), start.map(Box::new), end),
                    line,
                };
            } else {
                let index = start.ok_or_else(|| self.error_here("expected index expression"))?;
                self.expect(&Tok::RBracket, "to close index")?;
                expr = Expr {
                    kind: ExprKind::Index(Box::new(expr), Box::new(index)),
                    line,
                };
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.advance();
        let line = token.line;
        let kind = match token.tok {
            Tok::Int(i) => ExprKind::Literal(Value::Int(i)),
            Tok::Float(f) => ExprKind::Literal(Value::Float(f)),
            Tok::Str(s) => ExprKind::Literal(Value::Str(s)),
            Tok::True => ExprKind::Literal(Value::Bool(true)),
            Tok::False => ExprKind::Literal(Value::Bool(false)),
            Tok::None => ExprKind::Literal(Value::None),
            Tok::Ident(name) => {
                if self.eat(&Tok::LParen) {
                    ExprKind::Call(name, self.arguments()?)
                } else {
                    ExprKind::Ident(name)
                }
            }
            Tok::LParen => {
                let inner = self.expr()?;
                self.expect(&Tok::RParen, "to close parenthesis")?;
                return Ok(inner);
            }
            Tok::LBracket => {
                let items = self.sequence(&Tok::RBracket, Self::expr)?;
                ExprKind::List(items)
            }
            Tok::LBrace => {
                let entries = self.sequence(&Tok::RBrace, |p| {
                    let key = p.expr()?;
                    p.expect(&Tok::Colon, "after map key")?;
                    let value = p.expr()?;
                    Ok((key, value))
                })?;
                ExprKind::Map(entries)
            }
            other => {
                return Err(ScriptError::syntax(
                    token.line,
                    token.column,
                    format!("expected expression, found {}", other.describe()),
                ))
            }
        };
        Ok(Expr { kind, line })
    }

    fn arguments(&mut self) -> Result<Vec<Arg>, ScriptError> {
        let args = self.sequence(&Tok::RParen, |p| {
            let named = matches!(p.peek().tok, Tok::Ident(_)) && p.peek_at(1) == &Tok::Assign;
            if named {
                let (name, _) = p.ident("")?;
                p.advance();
                let value = p.expr()?;
                Ok(Arg {
                    name: Some(name),
                    value,
                })
            } else {
                Ok(Arg {
                    name: None,
                    value: p.expr()?,
                })
            }
        })?;
        let mut seen_named = false;
        for arg in &args {
            if arg.name.is_some() {
                seen_named = true;
            } else if seen_named {
                return Err(ScriptError::syntax(
                    arg.value.line,
                    1,
                    "positional argument follows keyword argument",
                ));
            }
        }
        Ok(args)
    }

    /// Comma-separated items up to `close`; a trailing comma is allowed.
    fn sequence<T>(
        &mut self,
        close: &Tok,
        mut item: impl FnMut(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<Vec<T>, ScriptError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(item(self)?);
            if !self.eat(&Tok::Comma) {
                break;
            }
        }
        self.expect(close, "to close list")?;
        Ok(items)
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr, line: u32) -> Expr {
    Expr {
        kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
        line,
    }
}

/// Decompose `x`, `x[a]`, `x[a][b]` into the root name and index chain.
fn assignment_target(expr: Expr) -> Option<(String, Vec<Expr>)> {
    match expr.kind {
        ExprKind::Ident(name) => Some((name, Vec::new())),
        ExprKind::Index(target, index) => {
            let (name, mut path) = assignment_target(*target)?;
            path.push(*index);
            Some((name, path))
        }
        _ => None,
    }
}
