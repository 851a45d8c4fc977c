//! Builtin functions, called by name from `Call` nodes.
//!
//! Builtins are pure: same arguments, same result. Anything that touches the
//! outside world is an effect instead.

use crate::errors::{
    index_out_of_bounds, invalid_argument, key_not_found, type_mismatch, unknown_function,
    wrong_arity, EvalError, EvalResult,
};
use crate::value::Value;

pub fn call(name: &str, args: &[Value]) -> EvalResult {
    match name {
        "str.upper" => {
            let text = single_text(name, args)?;
            Ok(Value::text(text.to_uppercase()))
        }
        "str.lower" => {
            let text = single_text(name, args)?;
            Ok(Value::text(text.to_lowercase()))
        }
        "concat" => concat(args),
        "len" => {
            let [arg] = args else {
                return Err(wrong_arity(name, "1", args.len()));
            };
            let len = match arg {
                Value::Text(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Set(items) => items.len(),
                Value::Map(entries) => entries.len(),
                other => return Err(type_mismatch(name, "a text or collection", other)),
            };
            i64::try_from(len)
                .map(Value::Int)
                .map_err(|_| invalid_argument(name, "length exceeds int range"))
        }
        "get" => {
            let [container, key] = args else {
                return Err(wrong_arity(name, "2", args.len()));
            };
            get(container, key)
        }
        "contains" => {
            let [container, needle] = args else {
                return Err(wrong_arity(name, "2", args.len()));
            };
            let found = match (container, needle) {
                (Value::List(items), _) => items.contains(needle),
                (Value::Set(items), _) => items.contains(needle),
                (Value::Map(entries), _) => entries.contains_key(needle),
                (Value::Text(hay), Value::Text(n)) => hay.contains(&**n),
                (Value::Text(_), other) => return Err(type_mismatch(name, "text", other)),
                (other, _) => return Err(type_mismatch(name, "a text or collection", other)),
            };
            Ok(Value::Bool(found))
        }
        "json.parse" => {
            let text = single_text(name, args)?;
            let json: serde_json::Value =
                serde_json::from_str(text).map_err(|e| invalid_argument(name, e.to_string()))?;
            Value::from_json(&json).map_err(|message| invalid_argument(name, message))
        }
        _ => Err(unknown_function(name)),
    }
}

fn single_text<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, EvalError> {
    let [arg] = args else {
        return Err(wrong_arity(name, "1", args.len()));
    };
    arg.as_text().ok_or_else(|| type_mismatch(name, "text", arg))
}

fn concat(args: &[Value]) -> EvalResult {
    match args.first() {
        None | Some(Value::Text(_)) => {
            let mut out = String::new();
            for arg in args {
                out.push_str(
                    arg.as_text()
                        .ok_or_else(|| type_mismatch("concat", "text", arg))?,
                );
            }
            Ok(Value::text(out))
        }
        Some(Value::List(_)) => {
            let mut out = Vec::new();
            for arg in args {
                match arg {
                    Value::List(items) => out.extend(items.iter().cloned()),
                    other => return Err(type_mismatch("concat", "a list", other)),
                }
            }
            Ok(Value::list(out))
        }
        Some(other) => Err(type_mismatch("concat", "text or lists", other)),
    }
}

fn get(container: &Value, key: &Value) -> EvalResult {
    match (container, key) {
        (Value::Map(entries), _) => entries.get(key).cloned().ok_or_else(|| key_not_found(key)),
        (Value::List(items), Value::Int(index)) => usize::try_from(*index)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| index_out_of_bounds(*index, items.len())),
        (Value::List(_), other) => Err(type_mismatch("get", "an int index", other)),
        (other, _) => Err(type_mismatch("get", "a map or list", other)),
    }
}
