//! The fixed set of host primitives injected code may call.
//!
//! Every capability is pure computation apart from the clock. None of them
//! touches the file system, network, process environment or other stored
//! algorithms. The names are part of the public snippet surface: renaming one
//! breaks existing snippets.
//!
//! The registry is a template; the engine calls [`CapabilityRegistry::bind`]
//! once per invocation to get a fresh [`CapabilityTable`].

use std::sync::Arc;

use indexmap::IndexMap;

use crate::script::value::Value;

pub mod clock;
pub mod codec;
pub mod digest;

use clock::{Clock, SystemClock};
use digest::HashAlgorithm;

/// `hash(algorithm, data) -> bytes`
pub const HASH: &str = "hash";
/// `keyedHash(algorithm, key, message) -> bytes`
pub const KEYED_HASH: &str = "keyedHash";
/// `encode(bytes) -> string` (base64)
pub const ENCODE: &str = "encode";
/// `decode(string) -> bytes` (base64)
pub const DECODE: &str = "decode";
/// `parseStructured(string) -> value` (JSON)
pub const PARSE_STRUCTURED: &str = "parseStructured";
/// `serializeStructured(value, indent?) -> string` (JSON)
pub const SERIALIZE_STRUCTURED: &str = "serializeStructured";
/// `nowEpochSeconds() -> int`
pub const NOW_EPOCH_SECONDS: &str = "nowEpochSeconds";
/// `nowEpochMillis() -> int`
pub const NOW_EPOCH_MILLIS: &str = "nowEpochMillis";

/// Errors raised by capabilities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// The digest algorithm name is not supported.
    #[error("unsupported hash algorithm '{0}'")]
    UnknownAlgorithm(String),
    /// Wrong number of arguments.
    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        /// Capability name.
        name: &'static str,
        /// Accepted count, e.g. `"1-2"`.
        expected: String,
        /// Supplied count.
        got: usize,
    },
    /// An argument had the wrong type or content.
    #[error("{0}")]
    InvalidArgument(String),
}

/// Signature shared by all capabilities.
pub type CapabilityFn = fn(&[Value], &dyn Clock) -> Result<Value, CapabilityError>;

/// One registered capability.
#[derive(Debug, Clone, Copy)]
pub struct CapabilitySpec {
    /// Name scripts call it by.
    pub name: &'static str,
    /// Minimum argument count.
    pub min_args: usize,
    /// Maximum argument count.
    pub max_args: usize,
    /// One-line description.
    pub summary: &'static str,
    func: CapabilityFn,
}

impl CapabilitySpec {
    /// Accepted argument count, `"2"` or `"1-2"`.
    pub fn arity(&self) -> String {
        if self.min_args == self.max_args {
            self.min_args.to_string()
        } else {
            format!("{}-{}", self.min_args, self.max_args)
        }
    }

    fn invoke(&self, args: &[Value], clock: &dyn Clock) -> Result<Value, CapabilityError> {
        if args.len() < self.min_args || args.len() > self.max_args {
            return Err(CapabilityError::Arity {
                name: self.name,
                expected: self.arity(),
                got: args.len(),
            });
        }
        (self.func)(args, clock)
    }
}

/// The fixed capability set plus the clock it reads time from.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    specs: Vec<CapabilitySpec>,
    clock: Arc<dyn Clock>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl CapabilityRegistry {
    /// The standard set, reading the system clock.
    pub fn standard() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// The standard set with a caller-supplied clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let specs = vec![
            spec(HASH, 2, 2, "digest data with md5/sha1/sha224/sha256/sha384/sha512", cap_hash),
            spec(KEYED_HASH, 3, 3, "HMAC of message under key", cap_keyed_hash),
            spec(ENCODE, 1, 1, "base64-encode bytes", cap_encode),
            spec(DECODE, 1, 1, "base64-decode a string", cap_decode),
            spec(PARSE_STRUCTURED, 1, 1, "parse a JSON document", cap_parse),
            spec(SERIALIZE_STRUCTURED, 1, 2, "serialize a value as JSON", cap_serialize),
            spec(NOW_EPOCH_SECONDS, 0, 0, "seconds since the Unix epoch", cap_now_seconds),
            spec(NOW_EPOCH_MILLIS, 0, 0, "milliseconds since the Unix epoch", cap_now_millis),
        ];
        Self { specs, clock }
    }

    /// Registered capabilities in registration order.
    pub fn specs(&self) -> &[CapabilitySpec] {
        &self.specs
    }

    /// Registered capability names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|s| s.name)
    }

    /// Build a fresh table for one invocation.
    pub fn bind(&self) -> CapabilityTable {
        CapabilityTable {
            entries: self.specs.iter().map(|s| (s.name, *s)).collect(),
            clock: Arc::clone(&self.clock),
        }
    }
}

fn spec(
    name: &'static str,
    min_args: usize,
    max_args: usize,
    summary: &'static str,
    func: CapabilityFn,
) -> CapabilitySpec {
    CapabilitySpec {
        name,
        min_args,
        max_args,
        summary,
        func,
    }
}

/// Per-invocation capability bindings. Owns nothing but the bindings and a
/// clock handle.
#[derive(Debug)]
pub struct CapabilityTable {
    entries: IndexMap<&'static str, CapabilitySpec>,
    clock: Arc<dyn Clock>,
}

impl CapabilityTable {
    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of bound capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Call `name` with `args`; `None` when `name` is not bound.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Result<Value, CapabilityError>> {
        self.entries
            .get(name)
            .map(|spec| spec.invoke(args, self.clock.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// Capability implementations
// ---------------------------------------------------------------------------

fn bytes_arg(name: &str, position: usize, value: &Value) -> Result<Vec<u8>, CapabilityError> {
    match value {
        Value::Str(s) => Ok(s.as_bytes().to_vec()),
        Value::Bytes(b) => Ok(b.clone()),
        other => Err(CapabilityError::InvalidArgument(format!(
            "{name}() argument {position} must be str or bytes, got {}",
            other.type_name()
        ))),
    }
}

fn str_arg<'a>(name: &str, position: usize, value: &'a Value) -> Result<&'a str, CapabilityError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(CapabilityError::InvalidArgument(format!(
            "{name}() argument {position} must be str, got {}",
            other.type_name()
        ))),
    }
}

fn algorithm_arg(name: &str, value: &Value) -> Result<HashAlgorithm, CapabilityError> {
    str_arg(name, 1, value)?.parse()
}

fn cap_hash(args: &[Value], _clock: &dyn Clock) -> Result<Value, CapabilityError> {
    let alg = algorithm_arg(HASH, &args[0])?;
    let data = bytes_arg(HASH, 2, &args[1])?;
    Ok(Value::Bytes(digest::hash(alg, &data)))
}

fn cap_keyed_hash(args: &[Value], _clock: &dyn Clock) -> Result<Value, CapabilityError> {
    let alg = algorithm_arg(KEYED_HASH, &args[0])?;
    let key = bytes_arg(KEYED_HASH, 2, &args[1])?;
    let message = bytes_arg(KEYED_HASH, 3, &args[2])?;
    digest::keyed_hash(alg, &key, &message).map(Value::Bytes)
}

fn cap_encode(args: &[Value], _clock: &dyn Clock) -> Result<Value, CapabilityError> {
    let bytes = bytes_arg(ENCODE, 1, &args[0])?;
    Ok(Value::Str(codec::encode(&bytes)))
}

fn cap_decode(args: &[Value], _clock: &dyn Clock) -> Result<Value, CapabilityError> {
    let text = str_arg(DECODE, 1, &args[0])?;
    codec::decode(text).map(Value::Bytes)
}

fn cap_parse(args: &[Value], _clock: &dyn Clock) -> Result<Value, CapabilityError> {
    let text = str_arg(PARSE_STRUCTURED, 1, &args[0])?;
    codec::parse_structured(text).map(|json| Value::from_json(&json))
}

fn cap_serialize(args: &[Value], _clock: &dyn Clock) -> Result<Value, CapabilityError> {
    let json = args[0].to_json().map_err(|e| {
        CapabilityError::InvalidArgument(format!("{SERIALIZE_STRUCTURED}(): {e}"))
    })?;
    let indent = match args.get(1) {
        None | Some(Value::None) => None,
        Some(Value::Int(n)) => Some(usize::try_from(*n).map_err(|_| {
            CapabilityError::InvalidArgument(format!(
                "{SERIALIZE_STRUCTURED}() indent must be non-negative"
            ))
        })?),
        Some(other) => {
            return Err(CapabilityError::InvalidArgument(format!(
                "{SERIALIZE_STRUCTURED}() indent must be int, got {}",
                other.type_name()
            )))
        }
    };
    codec::serialize_structured(&json, indent).map(Value::Str)
}

fn cap_now_seconds(_args: &[Value], clock: &dyn Clock) -> Result<Value, CapabilityError> {
    Ok(Value::Int(i128::from(clock.now_seconds())))
}

fn cap_now_millis(_args: &[Value], clock: &dyn Clock) -> Result<Value, CapabilityError> {
    Ok(Value::Int(i128::from(clock.now_millis())))
}
