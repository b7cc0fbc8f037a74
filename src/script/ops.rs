//! Operator semantics shared by the interpreter and the built-ins.
//!
//! Integer arithmetic is checked; overflow is a fault, never a wrap.

use std::cmp::Ordering;

use super::ast::BinOp;
use super::error::Fault;
use super::value::Value;

/// Longest string, bytes or list that `*` and `range` will build.
pub const MAX_SEQUENCE_LEN: usize = 16 * 1024 * 1024;

enum Num {
    Int(i128),
    Float(f64),
}

fn num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

/// Widen an int for mixed arithmetic.
#[allow(clippy::cast_precision_loss)] // same promotion rule as any float mix
pub fn int_to_float(i: i128) -> f64 {
    i as f64
}

fn as_float(n: &Num) -> f64 {
    match n {
        Num::Int(i) => int_to_float(*i),
        Num::Float(f) => *f,
    }
}

fn unsupported(symbol: &str, left: &Value, right: &Value) -> Fault {
    Fault::Type(format!(
        "unsupported operand types for {symbol}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

/// Evaluate a non-short-circuit binary operator.
///
/// # Errors
///
/// Returns the [`Fault`] the operation raises.
pub fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, Fault> {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => sub(&left, &right),
        BinOp::Mul => mul(&left, &right),
        BinOp::Div => div(&left, &right),
        BinOp::Rem => rem(&left, &right),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Ne => Ok(Value::Bool(left != right)),
        BinOp::Lt => ordered("<", &left, &right, |o| o == Ordering::Less),
        BinOp::Le => ordered("<=", &left, &right, |o| o != Ordering::Greater),
        BinOp::Gt => ordered(">", &left, &right, |o| o == Ordering::Greater),
        BinOp::Ge => ordered(">=", &left, &right, |o| o != Ordering::Less),
        BinOp::In => contains(&right, &left).map(Value::Bool),
        BinOp::NotIn => contains(&right, &left).map(|found| Value::Bool(!found)),
    }
}

fn ordered(
    symbol: &str,
    left: &Value,
    right: &Value,
    test: impl Fn(Ordering) -> bool,
) -> Result<Value, Fault> {
    Ok(Value::Bool(compare(symbol, left, right)?.is_some_and(test)))
}

fn add(left: Value, right: Value) -> Result<Value, Fault> {
    match (left, right) {
        (Value::Str(mut a), Value::Str(b)) => {
            a.push_str(&b);
            Ok(Value::Str(a))
        }
        (Value::Bytes(mut a), Value::Bytes(b)) => {
            a.extend_from_slice(&b);
            Ok(Value::Bytes(a))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Value::Map(mut a), Value::Map(b)) => {
            a.extend(b);
            Ok(Value::Map(a))
        }
        (left, right) => match (num(&left), num(&right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                a.checked_add(b).map(Value::Int).ok_or(Fault::Overflow)
            }
            (Some(a), Some(b)) => Ok(Value::Float(as_float(&a) + as_float(&b))),
            _ => Err(unsupported("+", &left, &right)),
        },
    }
}

fn sub(left: &Value, right: &Value) -> Result<Value, Fault> {
    match (num(left), num(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => {
            a.checked_sub(b).map(Value::Int).ok_or(Fault::Overflow)
        }
        (Some(a), Some(b)) => Ok(Value::Float(as_float(&a) - as_float(&b))),
        _ => Err(unsupported("-", left, right)),
    }
}

fn mul(left: &Value, right: &Value) -> Result<Value, Fault> {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let count = repeat_count(*n, s.len())?;
            Ok(Value::Str(s.repeat(count)))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let count = repeat_count(*n, items.len())?;
            let mut out = Vec::with_capacity(items.len().saturating_mul(count));
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            Ok(Value::List(out))
        }
        _ => match (num(left), num(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                a.checked_mul(b).map(Value::Int).ok_or(Fault::Overflow)
            }
            (Some(a), Some(b)) => Ok(Value::Float(as_float(&a) * as_float(&b))),
            _ => Err(unsupported("*", left, right)),
        },
    }
}

fn repeat_count(n: i128, unit: usize) -> Result<usize, Fault> {
    let count = usize::try_from(n)
        .map_err(|_| Fault::Value("repeat count must be non-negative".to_owned()))?;
    match unit.checked_mul(count) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(count),
        _ => Err(Fault::Value("repeated sequence too large".to_owned())),
    }
}

fn div(left: &Value, right: &Value) -> Result<Value, Fault> {
    match (num(left), num(right)) {
        (Some(Num::Int(_)), Some(Num::Int(0))) => Err(Fault::ZeroDivision),
        (Some(Num::Int(a)), Some(Num::Int(b))) => {
            if a.checked_rem(b) == Some(0) {
                a.checked_div(b).map(Value::Int).ok_or(Fault::Overflow)
            } else {
                Ok(Value::Float(int_to_float(a) / int_to_float(b)))
            }
        }
        (Some(a), Some(b)) => {
            let divisor = as_float(&b);
            if divisor == 0.0 {
                return Err(Fault::ZeroDivision);
            }
            Ok(Value::Float(as_float(&a) / divisor))
        }
        _ => Err(unsupported("/", left, right)),
    }
}

/// Modulo taking the sign of the divisor.
fn rem(left: &Value, right: &Value) -> Result<Value, Fault> {
    match (num(left), num(right)) {
        (Some(Num::Int(_)), Some(Num::Int(0))) => Err(Fault::ZeroDivision),
        (Some(Num::Int(a)), Some(Num::Int(b))) => {
            // i128::MIN % -1 overflows in the checked form but is 0.
            let r = a.checked_rem(b).unwrap_or(0);
            if r != 0 && (r < 0) != (b < 0) {
                r.checked_add(b).map(Value::Int).ok_or(Fault::Overflow)
            } else {
                Ok(Value::Int(r))
            }
        }
        (Some(a), Some(b)) => {
            let (a, b) = (as_float(&a), as_float(&b));
            if b == 0.0 {
                return Err(Fault::ZeroDivision);
            }
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                Ok(Value::Float(r + b))
            } else {
                Ok(Value::Float(r))
            }
        }
        _ => Err(unsupported("%", left, right)),
    }
}

/// Arithmetic negation.
///
/// # Errors
///
/// `TypeError` for non-numbers, `OverflowError` for `-i128::MIN`.
pub fn negate(value: &Value) -> Result<Value, Fault> {
    match value {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(Fault::Overflow),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(Fault::Type(format!(
            "bad operand type for unary -: '{}'",
            other.type_name()
        ))),
    }
}

/// Order two values. `Ok(None)` means unordered (a NaN was involved).
///
/// # Errors
///
/// `TypeError` when the two types have no ordering between them.
pub fn compare(symbol: &str, left: &Value, right: &Value) -> Result<Option<Ordering>, Fault> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Bytes(a), Value::Bytes(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare(symbol, x, y)? {
                    Some(Ordering::Equal) => {}
                    other => return Ok(other),
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => match (num(left), num(right)) {
            (Some(a), Some(b)) => Ok(as_float(&a).partial_cmp(&as_float(&b))),
            _ => Err(Fault::Type(format!(
                "'{symbol}' not supported between '{}' and '{}'",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

/// Membership test behind `in`.
///
/// # Errors
///
/// `TypeError` when `container` cannot hold `item`.
pub fn contains(container: &Value, item: &Value) -> Result<bool, Fault> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Bytes(haystack), Value::Bytes(needle)) => Ok(needle.is_empty()
            || haystack.windows(needle.len()).any(|w| w == needle.as_slice())),
        (Value::Bytes(haystack), Value::Int(b)) => {
            Ok(u8::try_from(*b).is_ok_and(|b| haystack.contains(&b)))
        }
        (Value::List(items), needle) => Ok(items.iter().any(|v| v == needle)),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
        (Value::Map(_), _) => Ok(false),
        (container, item) => Err(Fault::Type(format!(
            "'in <{}>' requires a matching operand, got '{}'",
            container.type_name(),
            item.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

/// Resolve a possibly negative index against `len`.
pub fn resolve_index(index: i128, len: usize) -> Option<usize> {
    let len = i128::try_from(len).ok()?;
    let idx = if index < 0 { index.checked_add(len)? } else { index };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}

fn clamp_bound(bound: i128, len: usize) -> usize {
    let signed_len = i128::try_from(len).unwrap_or(i128::MAX);
    let idx = if bound < 0 {
        bound.saturating_add(signed_len).max(0)
    } else {
        bound.min(signed_len)
    };
    usize::try_from(idx).unwrap_or(0)
}

/// Clamp slice bounds the way Python does.
pub fn slice_bounds(start: Option<i128>, end: Option<i128>, len: usize) -> (usize, usize) {
    let start = start.map_or(0, |s| clamp_bound(s, len));
    let end = end.map_or(len, |e| clamp_bound(e, len));
    (start, end.max(start))
}

fn int_key(type_name: &str, key: &Value) -> Result<i128, Fault> {
    match key {
        Value::Int(i) => Ok(*i),
        other => Err(Fault::Type(format!(
            "{type_name} indices must be int, not {}",
            other.type_name()
        ))),
    }
}

fn key_error(key: &str) -> Fault {
    Fault::Key(serde_json::Value::String(key.to_owned()).to_string())
}

/// `target[key]`
///
/// # Errors
///
/// `IndexError`, `KeyError` or `TypeError` as appropriate.
pub fn index(target: &Value, key: &Value) -> Result<Value, Fault> {
    match target {
        Value::List(items) => {
            let i = int_key(target.type_name(), key)?;
            resolve_index(i, items.len())
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| Fault::Index("list index out of range".to_owned()))
        }
        Value::Str(s) => {
            let i = int_key(target.type_name(), key)?;
            let count = s.chars().count();
            resolve_index(i, count)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| Fault::Index("string index out of range".to_owned()))
        }
        Value::Bytes(b) => {
            let i = int_key(target.type_name(), key)?;
            resolve_index(i, b.len())
                .and_then(|i| b.get(i))
                .map(|byte| Value::Int(i128::from(*byte)))
                .ok_or_else(|| Fault::Index("bytes index out of range".to_owned()))
        }
        Value::Map(map) => match key {
            Value::Str(k) => map.get(k).cloned().ok_or_else(|| key_error(k)),
            other => Err(Fault::Type(format!(
                "map keys must be str, not {}",
                other.type_name()
            ))),
        },
        other => Err(Fault::Type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `target[start:end]`
///
/// # Errors
///
/// `TypeError` when `target` is not a sequence.
pub fn slice(target: &Value, start: Option<i128>, end: Option<i128>) -> Result<Value, Fault> {
    match target {
        Value::List(items) => {
            let (a, b) = slice_bounds(start, end, items.len());
            Ok(Value::List(items.get(a..b).unwrap_or_default().to_vec()))
        }
        Value::Bytes(bytes) => {
            let (a, b) = slice_bounds(start, end, bytes.len());
            Ok(Value::Bytes(bytes.get(a..b).unwrap_or_default().to_vec()))
        }
        Value::Str(s) => {
            let (a, b) = slice_bounds(start, end, s.chars().count());
            Ok(Value::Str(
                s.chars().skip(a).take(b.saturating_sub(a)).collect(),
            ))
        }
        other => Err(Fault::Type(format!(
            "'{}' object is not sliceable",
            other.type_name()
        ))),
    }
}

/// Mutable access to `target[key]` for nested assignment.
///
/// # Errors
///
/// `IndexError`, `KeyError` or `TypeError` as appropriate.
pub fn index_mut<'a>(target: &'a mut Value, key: &Value) -> Result<&'a mut Value, Fault> {
    let type_name = target.type_name();
    match target {
        Value::List(items) => {
            let i = int_key(type_name, key)?;
            let len = items.len();
            resolve_index(i, len)
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| Fault::Index("list index out of range".to_owned()))
        }
        Value::Map(map) => match key {
            Value::Str(k) => map.get_mut(k).ok_or_else(|| key_error(k)),
            other => Err(Fault::Type(format!(
                "map keys must be str, not {}",
                other.type_name()
            ))),
        },
        _ => Err(Fault::Type(format!(
            "'{type_name}' object does not support item assignment"
        ))),
    }
}

/// `target[key] = value`
///
/// # Errors
///
/// `IndexError` or `TypeError` as appropriate.
pub fn set_index(target: &mut Value, key: Value, value: Value) -> Result<(), Fault> {
    let type_name = target.type_name();
    match target {
        Value::List(items) => {
            let i = int_key(type_name, &key)?;
            let slot = resolve_index(i, items.len())
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| Fault::Index("list assignment index out of range".to_owned()))?;
            *slot = value;
            Ok(())
        }
        Value::Map(map) => match key {
            Value::Str(k) => {
                map.insert(k, value);
                Ok(())
            }
            other => Err(Fault::Type(format!(
                "map keys must be str, not {}",
                other.type_name()
            ))),
        },
        _ => Err(Fault::Type(format!(
            "'{type_name}' object does not support item assignment"
        ))),
    }
}
