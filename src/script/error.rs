//! Errors raised while loading or running a script.

/// A fault raised by running code, without its location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// An operation was applied to values of the wrong type.
    #[error("TypeError: {0}")]
    Type(String),
    /// A name was used that is not defined.
    #[error("NameError: {0}")]
    Name(String),
    /// A sequence index was out of range.
    #[error("IndexError: {0}")]
    Index(String),
    /// A map key was not present.
    #[error("KeyError: {0}")]
    Key(String),
    /// A value was of the right type but unacceptable (includes `fail()`).
    #[error("ValueError: {0}")]
    Value(String),
    /// Division or modulo by zero.
    #[error("ZeroDivisionError: division by zero")]
    ZeroDivision,
    /// Integer arithmetic overflowed.
    #[error("OverflowError: integer overflow")]
    Overflow,
    /// Too many nested calls.
    #[error("RecursionError: call depth exceeded {0}")]
    CallDepth(usize),
    /// The step budget ran out.
    #[error("StepLimitError: step budget of {0} exhausted")]
    StepLimit(u64),
    /// A capability rejected its arguments.
    #[error("CapabilityError: {0}")]
    Capability(String),
}

/// Errors produced by the script front end and interpreter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// The source text is not a valid program.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line.
        line: u32,
        /// 1-based column.
        column: u32,
        /// What the parser expected or rejected.
        message: String,
    },
    /// A fault raised while executing, with the line it was raised on.
    #[error("line {line}: {fault}")]
    Runtime {
        /// 1-based line of the statement or expression that faulted.
        line: u32,
        /// The fault.
        fault: Fault,
    },
    /// Execution was cancelled through the interrupt flag.
    #[error("execution interrupted")]
    Interrupted,
}

impl ScriptError {
    /// Build a syntax error.
    pub fn syntax(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}
