//! Tree-walking interpreter.
//!
//! One [`Interpreter`] is built per invocation from a parsed [`Program`] and
//! a freshly bound [`CapabilityTable`]. It owns every value it touches, so
//! nothing survives the invocation that created it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::ast::{Arg, Expr, ExprKind, FnDef, LogicOp, Program, Stmt, UnaryOp};
use super::builtins;
use super::error::{Fault, ScriptError};
use super::ops;
use super::value::Value;
use crate::capability::CapabilityTable;

/// Execution bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Step budget; `0` disables the check.
    pub max_steps: u64,
    /// Deepest allowed chain of user function calls.
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 10_000_000,
            max_call_depth: 64,
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

type Frame = HashMap<String, Value>;

fn at(line: u32) -> impl FnOnce(Fault) -> ScriptError {
    move |fault| ScriptError::Runtime { line, fault }
}

/// A loaded program ready to be called.
#[derive(Debug)]
pub struct Interpreter {
    functions: HashMap<String, Arc<FnDef>>,
    globals: IndexMap<String, Value>,
    capabilities: CapabilityTable,
    limits: Limits,
    interrupt: Arc<AtomicBool>,
    steps: u64,
    depth: usize,
}

impl Interpreter {
    /// Bind `program` and evaluate its top-level constants in order.
    ///
    /// # Errors
    ///
    /// Any runtime error raised while evaluating a constant, or
    /// [`ScriptError::Interrupted`].
    pub fn load(
        program: Program,
        capabilities: CapabilityTable,
        limits: Limits,
        interrupt: Arc<AtomicBool>,
    ) -> Result<Self, ScriptError> {
        let functions = program
            .functions
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        let mut interp = Self {
            functions,
            globals: IndexMap::new(),
            capabilities,
            limits,
            interrupt,
            steps: 0,
            depth: 0,
        };
        for constant in program.constants {
            interp.step(constant.line)?;
            let mut frame = Frame::new();
            let value = interp.eval(&constant.value, &mut frame)?;
            interp.globals.insert(constant.name, value);
        }
        Ok(interp)
    }

    /// Look up a user-defined function.
    pub fn function(&self, name: &str) -> Option<&Arc<FnDef>> {
        self.functions.get(name)
    }

    /// Steps consumed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Call user function `name` with positional `args`.
    ///
    /// # Errors
    ///
    /// `NameError` if no such function exists, otherwise whatever the call
    /// raises.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
        let Some(def) = self.functions.get(name).cloned() else {
            return Err(ScriptError::Runtime {
                line: 0,
                fault: Fault::Name(format!("function '{name}' is not defined")),
            });
        };
        let args = args.into_iter().map(|v| (None, v)).collect();
        self.call_user(&def, args, def.line)
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn step(&mut self, line: u32) -> Result<(), ScriptError> {
        if self.interrupt.load(Ordering::Relaxed) {
            return Err(ScriptError::Interrupted);
        }
        self.steps = self.steps.saturating_add(1);
        if self.limits.max_steps != 0 && self.steps > self.limits.max_steps {
            return Err(ScriptError::Runtime {
                line,
                fault: Fault::StepLimit(self.limits.max_steps),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    fn call_user(
        &mut self,
        def: &FnDef,
        args: Vec<(Option<String>, Value)>,
        line: u32,
    ) -> Result<Value, ScriptError> {
        self.step(line)?;
        if self.depth >= self.limits.max_call_depth {
            return Err(at(line)(Fault::CallDepth(self.limits.max_call_depth)));
        }

        let mut bound: Vec<Option<Value>> = vec![None; def.params.len()];
        let mut positional = 0usize;
        for (name, value) in args {
            let slot = match name {
                None => {
                    let slot = positional;
                    positional = positional.saturating_add(1);
                    if slot >= def.params.len() {
                        return Err(at(line)(Fault::Type(format!(
                            "{}() takes {} argument(s) but more were given",
                            def.name,
                            def.params.len()
                        ))));
                    }
                    slot
                }
                Some(name) => def
                    .params
                    .iter()
                    .position(|p| p.name == name)
                    .ok_or_else(|| {
                        at(line)(Fault::Type(format!(
                            "{}() got an unexpected keyword argument '{name}'",
                            def.name
                        )))
                    })?,
            };
            if bound[slot].is_some() {
                return Err(at(line)(Fault::Type(format!(
                    "{}() got multiple values for argument '{}'",
                    def.name, def.params[slot].name
                ))));
            }
            bound[slot] = Some(value);
        }

        self.depth = self.depth.saturating_add(1);
        let result = self.run_body(def, bound, line);
        self.depth = self.depth.saturating_sub(1);
        result
    }

    fn run_body(
        &mut self,
        def: &FnDef,
        bound: Vec<Option<Value>>,
        line: u32,
    ) -> Result<Value, ScriptError> {
        let mut frame = Frame::with_capacity(def.params.len());
        for (param, value) in def.params.iter().zip(bound) {
            let value = match (value, &param.default) {
                (Some(v), _) => v,
                (None, Some(default)) => self.eval(default, &mut frame)?,
                (None, None) => {
                    return Err(at(line)(Fault::Type(format!(
                        "{}() missing required argument '{}'",
                        def.name, param.name
                    ))))
                }
            };
            frame.insert(param.name.clone(), value);
        }
        match self.exec_block(&def.body, &mut frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::None),
        }
    }

    fn call_named(
        &mut self,
        name: &str,
        args: &[Arg],
        frame: &mut Frame,
        line: u32,
    ) -> Result<Value, ScriptError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push((arg.name.clone(), self.eval(&arg.value, frame)?));
        }

        if let Some(def) = self.functions.get(name).cloned() {
            return self.call_user(&def, values, line);
        }

        self.step(line)?;
        let is_capability = self.capabilities.contains(name);
        if !is_capability && !builtins::is_builtin(name) {
            return Err(at(line)(Fault::Name(format!("name '{name}' is not defined"))));
        }
        if let Some((Some(keyword), _)) = values.iter().find(|(k, _)| k.is_some()) {
            return Err(at(line)(Fault::Type(format!(
                "{name}() got an unexpected keyword argument '{keyword}'"
            ))));
        }
        let positional: Vec<Value> = values.into_iter().map(|(_, v)| v).collect();

        let result = if is_capability {
            self.capabilities
                .call(name, &positional)
                .map(|r| r.map_err(|e| Fault::Capability(e.to_string())))
        } else {
            builtins::call(name, positional)
        };
        result
            .unwrap_or_else(|| Err(Fault::Name(format!("name '{name}' is not defined"))))
            .map_err(at(line))
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn exec_block(&mut self, body: &[Stmt], frame: &mut Frame) -> Result<Flow, ScriptError> {
        for stmt in body {
            match self.exec(stmt, frame)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<Flow, ScriptError> {
        match stmt {
            Stmt::Let { name, value, line } => {
                self.step(*line)?;
                let value = self.eval(value, frame)?;
                frame.insert(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Assign {
                name,
                path,
                value,
                line,
            } => {
                self.step(*line)?;
                self.assign(name, path, value, frame, *line)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    self.step(cond.line)?;
                    if self.eval(cond, frame)?.is_truthy() {
                        return self.exec_block(body, frame);
                    }
                }
                match otherwise {
                    Some(body) => self.exec_block(body, frame),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::While { cond, body } => {
                loop {
                    self.step(cond.line)?;
                    if !self.eval(cond, frame)?.is_truthy() {
                        break;
                    }
                    match self.exec_block(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                var,
                iter,
                body,
                line,
            } => {
                self.step(*line)?;
                let items = iterate(self.eval(iter, frame)?).map_err(at(*line))?;
                for item in items {
                    self.step(*line)?;
                    frame.insert(var.clone(), item);
                    match self.exec_block(body, frame)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let line = value.as_ref().map_or(0, |v| v.line);
                self.step(line)?;
                let value = match value {
                    Some(expr) => self.eval(expr, frame)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Expr(expr) => {
                self.step(expr.line)?;
                self.eval(expr, frame)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn assign(
        &mut self,
        name: &str,
        path: &[Expr],
        value: &Expr,
        frame: &mut Frame,
        line: u32,
    ) -> Result<(), ScriptError> {
        let value = self.eval(value, frame)?;
        let mut keys = Vec::with_capacity(path.len());
        for key in path {
            keys.push(self.eval(key, frame)?);
        }

        let Some(root) = frame.get_mut(name) else {
            let fault = if self.globals.contains_key(name) {
                Fault::Name(format!("cannot assign to constant '{name}'"))
            } else {
                Fault::Name(format!("name '{name}' is not defined"))
            };
            return Err(at(line)(fault));
        };

        let Some((last, parents)) = keys.split_last() else {
            *root = value;
            return Ok(());
        };
        let mut target = root;
        for key in parents {
            target = ops::index_mut(target, key).map_err(at(line))?;
        }
        ops::set_index(target, last.clone(), value).map_err(at(line))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, frame: &mut Frame) -> Result<Value, ScriptError> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Ident(name) => frame
                .get(name)
                .or_else(|| self.globals.get(name))
                .cloned()
                .ok_or_else(|| at(line)(Fault::Name(format!("name '{name}' is not defined")))),
            ExprKind::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item, frame)?);
                }
                Ok(Value::List(out))
            }
            ExprKind::Map(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match self.eval(key, frame)? {
                        Value::Str(s) => s,
                        other => {
                            return Err(at(line)(Fault::Type(format!(
                                "map keys must be str, not {}",
                                other.type_name()
                            ))))
                        }
                    };
                    let value = self.eval(value, frame)?;
                    out.insert(key, value);
                }
                Ok(Value::Map(out))
            }
            ExprKind::Unary(op, operand) => {
                let value = self.eval(operand, frame)?;
                match op {
                    UnaryOp::Neg => ops::negate(&value).map_err(at(line)),
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let left = self.eval(lhs, frame)?;
                let right = self.eval(rhs, frame)?;
                ops::binary(*op, left, right).map_err(at(line))
            }
            ExprKind::Logic(op, lhs, rhs) => {
                let left = self.eval(lhs, frame)?;
                let short_circuit = match op {
                    LogicOp::And => !left.is_truthy(),
                    LogicOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(rhs, frame)
                }
            }
            ExprKind::Call(name, args) => self.call_named(name, args, frame, line),
            ExprKind::Index(target, key) => {
                let target = self.eval(target, frame)?;
                let key = self.eval(key, frame)?;
                ops::index(&target, &key).map_err(at(line))
            }
            ExprKind::Slice(target, start, end) => {
                let target = self.eval(target, frame)?;
                let start = self.slice_bound(start.as_deref(), frame)?;
                let end = self.slice_bound(end.as_deref(), frame)?;
                ops::slice(&target, start, end).map_err(at(line))
            }
        }
    }

    fn slice_bound(
        &mut self,
        bound: Option<&Expr>,
        frame: &mut Frame,
    ) -> Result<Option<i128>, ScriptError> {
        let Some(expr) = bound else {
            return Ok(None);
        };
        match self.eval(expr, frame)? {
            Value::Int(i) => Ok(Some(i)),
            Value::None => Ok(None),
            other => Err(at(expr.line)(Fault::Type(format!(
                "slice indices must be int, not {}",
                other.type_name()
            )))),
        }
    }
}

/// Items a `for` loop visits.
fn iterate(value: Value) -> Result<Vec<Value>, Fault> {
    match value {
        Value::List(items) => Ok(items),
        Value::Map(map) => Ok(map.into_keys().map(Value::Str).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Bytes(b) => Ok(b.into_iter().map(|byte| Value::Int(i128::from(byte))).collect()),
        other => Err(Fault::Type(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}
