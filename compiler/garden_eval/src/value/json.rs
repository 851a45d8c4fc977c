//! Conversion between values and JSON.
//!
//! Effect requests carry their arguments as JSON, and `json.parse` turns
//! JSON text into values.

use serde_json::{Map as JsonMap, Number, Value as Json};

use super::Value;

impl Value {
    /// Encode as JSON.
    ///
    /// Sets become arrays. Map keys that are not text are rendered with
    /// their display form, since JSON object keys are strings.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Int(n) => Json::Number((*n).into()),
            Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Bool(b) => Json::Bool(*b),
            Value::Text(s) => Json::String(s.to_string()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Set(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                let mut object = JsonMap::new();
                for (k, v) in entries.iter() {
                    let key = match k {
                        Value::Text(s) => s.to_string(),
                        other => other.to_string(),
                    };
                    object.insert(key, v.to_json());
                }
                Json::Object(object)
            }
        }
    }

    /// Decode from JSON. `null` has no value counterpart.
    pub fn from_json(json: &Json) -> Result<Value, String> {
        Ok(match json {
            Json::Null => return Err("JSON null has no value representation".to_owned()),
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    return Err(format!("JSON number {n} is out of range"));
                }
            }
            Json::String(s) => Value::text(s.as_str()),
            Json::Array(items) => Value::list(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Json::Object(object) => {
                let mut entries = Vec::with_capacity(object.len());
                for (k, v) in object {
                    entries.push((Value::text(k.as_str()), Value::from_json(v)?));
                }
                Value::map(entries)
            }
        })
    }
}
