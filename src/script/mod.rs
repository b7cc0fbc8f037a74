//! The snippet language: a small, dynamically typed, brace-delimited
//! language with value semantics and no ambient I/O.
//!
//! Source goes through [`lexer`] and [`parser`] into an [`ast::Program`],
//! which [`interp::Interpreter`] executes against a per-invocation
//! capability table. The only way out of the sandbox is a capability.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::capability::CapabilityTable;

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod value;

pub use error::{Fault, ScriptError};
pub use interp::{Interpreter, Limits};
pub use parser::parse;
pub use value::Value;

/// Parse `source` and bind it into a ready interpreter.
///
/// # Errors
///
/// [`ScriptError::Syntax`] for malformed source, or any error raised while
/// evaluating top-level constants.
pub fn load(
    source: &str,
    capabilities: CapabilityTable,
    limits: Limits,
    interrupt: Arc<AtomicBool>,
) -> Result<Interpreter, ScriptError> {
    let program = parse(source)?;
    Interpreter::load(program, capabilities, limits, interrupt)
}
