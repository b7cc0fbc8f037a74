//! Language built-ins. Pure functions of their arguments; no I/O.

use std::cmp::Ordering;

use super::error::Fault;
use super::ops::{self, MAX_SEQUENCE_LEN};
use super::value::Value;

/// Every built-in name.
pub const NAMES: [&str; 30] = [
    "len",
    "str",
    "pystr",
    "int",
    "float",
    "bool",
    "type",
    "keys",
    "values",
    "get",
    "sorted",
    "reversed",
    "join",
    "split",
    "upper",
    "lower",
    "trim",
    "replace",
    "starts_with",
    "ends_with",
    "contains",
    "push",
    "range",
    "hex",
    "unhex",
    "utf8",
    "text",
    "fail",
    "min",
    "max",
];

/// Whether `name` is a built-in.
pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

/// Call built-in `name`; `None` if there is no such built-in.
pub fn call(name: &str, args: Vec<Value>) -> Option<Result<Value, Fault>> {
    let result = match name {
        "len" => len(args),
        "str" => unary(name, args, |v| Ok(Value::Str(v.render()))),
        "pystr" => unary(name, args, |v| Ok(Value::Str(v.render_python()))),
        "int" => int(args),
        "float" => float(args),
        "bool" => unary(name, args, |v| Ok(Value::Bool(v.is_truthy()))),
        "type" => unary(name, args, |v| Ok(Value::Str(v.type_name().to_owned()))),
        "keys" => unary(name, args, |v| {
            let map = expect_map("keys", &v)?;
            Ok(Value::List(map.keys().cloned().map(Value::Str).collect()))
        }),
        "values" => unary(name, args, |v| {
            let map = expect_map("values", &v)?;
            Ok(Value::List(map.values().cloned().collect()))
        }),
        "get" => get(args),
        "sorted" => sorted(args),
        "reversed" => unary(name, args, reversed),
        "join" => join(args),
        "split" => split(args),
        "upper" => string_op(name, args, |s| s.to_uppercase()),
        "lower" => string_op(name, args, |s| s.to_lowercase()),
        "trim" => string_op(name, args, |s| s.trim().to_owned()),
        "replace" => replace(args),
        "starts_with" => affix(name, args, |s, p| s.starts_with(p)),
        "ends_with" => affix(name, args, |s, p| s.ends_with(p)),
        "contains" => {
            arity(name, &args, 2, 2).and_then(|()| ops::contains(&args[0], &args[1]).map(Value::Bool))
        }
        "push" => push(args),
        "range" => range(args),
        "hex" => unary(name, args, |v| match v {
            Value::Bytes(b) => Ok(Value::Str(hex::encode(b))),
            Value::Str(s) => Ok(Value::Str(hex::encode(s.as_bytes()))),
            other => Err(type_error("hex", "str or bytes", &other)),
        }),
        "unhex" => unary(name, args, |v| match v {
            Value::Str(s) => hex::decode(s.trim())
                .map(Value::Bytes)
                .map_err(|e| Fault::Value(format!("unhex(): {e}"))),
            other => Err(type_error("unhex", "str", &other)),
        }),
        "utf8" => unary(name, args, |v| match v {
            Value::Str(s) => Ok(Value::Bytes(s.into_bytes())),
            Value::Bytes(b) => Ok(Value::Bytes(b)),
            other => Err(type_error("utf8", "str", &other)),
        }),
        "text" => unary(name, args, |v| match v {
            Value::Bytes(b) => String::from_utf8(b)
                .map(Value::Str)
                .map_err(|_| Fault::Value("text(): bytes are not valid UTF-8".to_owned())),
            Value::Str(s) => Ok(Value::Str(s)),
            other => Err(type_error("text", "bytes", &other)),
        }),
        "fail" => fail(args),
        "min" => extreme(name, args, Ordering::Less),
        "max" => extreme(name, args, Ordering::Greater),
        _ => return None,
    };
    Some(result)
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), Fault> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min}-{max}")
    };
    Err(Fault::Type(format!(
        "{name}() takes {expected} argument(s), got {}",
        args.len()
    )))
}

fn type_error(name: &str, expected: &str, got: &Value) -> Fault {
    Fault::Type(format!(
        "{name}() expected {expected}, got {}",
        got.type_name()
    ))
}

fn unary(
    name: &str,
    args: Vec<Value>,
    f: impl FnOnce(Value) -> Result<Value, Fault>,
) -> Result<Value, Fault> {
    arity(name, &args, 1, 1)?;
    let mut args = args.into_iter();
    f(args.next().unwrap_or_default())
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, Fault> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(type_error(name, "str", other)),
    }
}

fn expect_map<'a>(
    name: &str,
    value: &'a Value,
) -> Result<&'a indexmap::IndexMap<String, Value>, Fault> {
    match value {
        Value::Map(m) => Ok(m),
        other => Err(type_error(name, "map", other)),
    }
}

fn expect_int(name: &str, value: &Value) -> Result<i128, Fault> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(type_error(name, "int", other)),
    }
}

fn string_op(name: &str, args: Vec<Value>, f: impl Fn(&str) -> String) -> Result<Value, Fault> {
    arity(name, &args, 1, 1)?;
    Ok(Value::Str(f(expect_str(name, &args[0])?)))
}

fn affix(name: &str, args: Vec<Value>, f: impl Fn(&str, &str) -> bool) -> Result<Value, Fault> {
    arity(name, &args, 2, 2)?;
    let s = expect_str(name, &args[0])?;
    let p = expect_str(name, &args[1])?;
    Ok(Value::Bool(f(s, p)))
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

fn len(args: Vec<Value>) -> Result<Value, Fault> {
    arity("len", &args, 1, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        other => return Err(type_error("len", "a sized value", other)),
    };
    i128::try_from(n).map(Value::Int).map_err(|_| Fault::Overflow)
}

fn int(args: Vec<Value>) -> Result<Value, Fault> {
    arity("int", &args, 1, 2)?;
    if let Some(base) = args.get(1) {
        let base = expect_int("int", base)?;
        let radix = u32::try_from(base)
            .ok()
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| Fault::Value("int() base must be between 2 and 36".to_owned()))?;
        let text = expect_str("int", &args[0])?;
        return i128::from_str_radix(text.trim(), radix)
            .map(Value::Int)
            .map_err(|_| Fault::Value(format!("invalid literal for int() with base {base}: {text:?}")));
    }
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(i128::from(*b))),
        Value::Float(f) => float_to_int(*f).map(Value::Int),
        Value::Str(s) => s
            .trim()
            .parse::<i128>()
            .map(Value::Int)
            .map_err(|_| Fault::Value(format!("invalid literal for int(): {s:?}"))),
        other => Err(type_error("int", "int, float, bool or str", other)),
    }
}

/// Truncate toward zero, rejecting values outside `i128`.
#[allow(clippy::cast_possible_truncation)] // range checked before the cast
fn float_to_int(f: f64) -> Result<i128, Fault> {
    let t = f.trunc();
    // 2^127 is exactly representable; every finite value below it fits.
    let limit = 2f64.powi(127);
    if !t.is_finite() || t < -limit || t >= limit {
        return Err(Fault::Overflow);
    }
    Ok(t as i128)
}

fn float(args: Vec<Value>) -> Result<Value, Fault> {
    arity("float", &args, 1, 1)?;
    match &args[0] {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(ops::int_to_float(*i))),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Fault::Value(format!("could not convert string to float: {s:?}"))),
        other => Err(type_error("float", "int, float or str", other)),
    }
}

fn get(args: Vec<Value>) -> Result<Value, Fault> {
    arity("get", &args, 2, 3)?;
    let mut args = args.into_iter();
    let container = args.next().unwrap_or_default();
    let key = args.next().unwrap_or_default();
    let default = args.next().unwrap_or_default();
    match (&container, &key) {
        (Value::Map(map), Value::Str(k)) => Ok(map.get(k).cloned().unwrap_or(default)),
        (Value::Map(_), _) => Ok(default),
        (Value::List(_) | Value::Str(_) | Value::Bytes(_), Value::Int(_)) => {
            match ops::index(&container, &key) {
                Err(Fault::Index(_)) => Ok(default),
                other => other,
            }
        }
        (other, _) => Err(type_error("get", "map or sequence", other)),
    }
}

fn sorted(args: Vec<Value>) -> Result<Value, Fault> {
    arity("sorted", &args, 1, 1)?;
    let mut items = match args.into_iter().next().unwrap_or_default() {
        Value::List(items) => items,
        Value::Map(map) => map.into_keys().map(Value::Str).collect(),
        Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
        other => return Err(type_error("sorted", "list, map or str", &other)),
    };
    // Validate comparability up front so sort_by never sees a TypeError.
    for pair in items.windows(2) {
        ops::compare("<", &pair[0], &pair[1])?;
    }
    items.sort_by(|a, b| {
        ops::compare("<", a, b)
            .ok()
            .flatten()
            .unwrap_or(Ordering::Equal)
    });
    Ok(Value::List(items))
}

fn reversed(value: Value) -> Result<Value, Fault> {
    match value {
        Value::List(mut items) => {
            items.reverse();
            Ok(Value::List(items))
        }
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        Value::Bytes(mut b) => {
            b.reverse();
            Ok(Value::Bytes(b))
        }
        other => Err(type_error("reversed", "list, str or bytes", &other)),
    }
}

fn join(args: Vec<Value>) -> Result<Value, Fault> {
    arity("join", &args, 1, 2)?;
    let sep = match args.get(1) {
        Some(v) => expect_str("join", v)?,
        None => "",
    };
    let Value::List(items) = &args[0] else {
        return Err(type_error("join", "list", &args[0]));
    };
    let parts: Vec<String> = items.iter().map(Value::render).collect();
    Ok(Value::Str(parts.join(sep)))
}

fn split(args: Vec<Value>) -> Result<Value, Fault> {
    arity("split", &args, 1, 2)?;
    let s = expect_str("split", &args[0])?;
    let parts: Vec<Value> = match args.get(1) {
        None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
        Some(sep) => {
            let sep = expect_str("split", sep)?;
            if sep.is_empty() {
                return Err(Fault::Value("split(): empty separator".to_owned()));
            }
            s.split(sep).map(Value::from).collect()
        }
    };
    Ok(Value::List(parts))
}

fn replace(args: Vec<Value>) -> Result<Value, Fault> {
    arity("replace", &args, 3, 3)?;
    let s = expect_str("replace", &args[0])?;
    let from = expect_str("replace", &args[1])?;
    let to = expect_str("replace", &args[2])?;
    if from.is_empty() {
        return Err(Fault::Value("replace(): empty pattern".to_owned()));
    }
    Ok(Value::Str(s.replace(from, to)))
}

fn push(args: Vec<Value>) -> Result<Value, Fault> {
    arity("push", &args, 2, 2)?;
    let mut args = args.into_iter();
    match (args.next().unwrap_or_default(), args.next().unwrap_or_default()) {
        (Value::List(mut items), item) => {
            items.push(item);
            Ok(Value::List(items))
        }
        (other, _) => Err(type_error("push", "list", &other)),
    }
}

fn range(args: Vec<Value>) -> Result<Value, Fault> {
    arity("range", &args, 1, 3)?;
    let ints = args
        .iter()
        .map(|v| expect_int("range", v))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, end, step) = match ints.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step] => (*start, *end, *step),
        _ => return Err(Fault::Type("range() takes 1-3 arguments".to_owned())),
    };
    if step == 0 {
        return Err(Fault::Value("range() step must not be zero".to_owned()));
    }
    let mut out = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        if out.len() >= MAX_SEQUENCE_LEN {
            return Err(Fault::Value("range() too large".to_owned()));
        }
        out.push(Value::Int(current));
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(Value::List(out))
}

fn fail(args: Vec<Value>) -> Result<Value, Fault> {
    arity("fail", &args, 0, 1)?;
    let message = args
        .first()
        .map_or_else(|| "fail() called".to_owned(), Value::render);
    Err(Fault::Value(message))
}

fn extreme(name: &str, args: Vec<Value>, want: Ordering) -> Result<Value, Fault> {
    let items = if args.len() == 1 {
        match args.into_iter().next() {
            Some(Value::List(items)) => items,
            other => return Err(type_error(name, "list", &other.unwrap_or_default())),
        }
    } else if args.is_empty() {
        return Err(Fault::Type(format!("{name}() expected at least 1 argument")));
    } else {
        args
    };
    let mut iter = items.into_iter();
    let Some(mut best) = iter.next() else {
        return Err(Fault::Value(format!("{name}() of an empty list")));
    };
    for item in iter {
        if ops::compare(name, &item, &best)? == Some(want) {
            best = item;
        }
    }
    Ok(best)
}
