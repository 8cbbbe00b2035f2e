use anyhow::{bail, Context};
use serde_json::{json, Map as JsonMap, Value as Json};
use stampdb_codec::{Value, ValueKind};

/// JSON form of a value.
///
/// Maps whose keys are all strings become objects; any other map becomes
/// an array of `[key, value]` pairs. Non-finite floats become `null`.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Byte(v) => json!(v),
        Value::Short(v) => json!(v),
        Value::Int(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::Float(v) => json!(f64::from(*v)),
        Value::Double(v) => json!(v),
        Value::Bool(v) => json!(v),
        Value::Char(unit) => match char::from_u32(u32::from(*unit)) {
            Some(c) => json!(c.to_string()),
            None => json!(format!("\\u{unit:04x}")),
        },
        Value::String(s) => json!(s),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Set(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => {
            if pairs.keys().all(|k| k.as_str().is_some()) {
                let object: JsonMap<String, Json> = pairs
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_owned(), to_json(v))))
                    .collect();
                Json::Object(object)
            } else {
                Json::Array(
                    pairs
                        .iter()
                        .map(|(k, v)| Json::Array(vec![to_json(k), to_json(v)]))
                        .collect(),
                )
            }
        }
    }
}

/// JSON form of one entry: `{"key", "kind", "value"}`, or `null` when the
/// key is not set.
pub fn entry_json(key: &str, value: Option<&Value>) -> Json {
    match value {
        Some(v) => json!({ "key": key, "kind": v.kind(), "value": to_json(v) }),
        None => Json::Null,
    }
}

/// Parse a command-line argument as a scalar of the given kind.
pub fn parse_scalar(kind: ValueKind, raw: &str) -> anyhow::Result<Value> {
    let value = match kind {
        ValueKind::Byte => Value::Byte(raw.parse().context("invalid byte")?),
        ValueKind::Short => Value::Short(raw.parse().context("invalid short")?),
        ValueKind::Int => Value::Int(raw.parse().context("invalid int")?),
        ValueKind::Long => Value::Long(raw.parse().context("invalid long")?),
        ValueKind::Float => Value::Float(raw.parse().context("invalid float")?),
        ValueKind::Double => Value::Double(raw.parse().context("invalid double")?),
        ValueKind::Bool => Value::Bool(raw.parse().context("expected `true` or `false`")?),
        ValueKind::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => match Value::char(c) {
                    Some(v) => v,
                    None => bail!("{c:?} does not fit in one UTF-16 code unit"),
                },
                _ => bail!("expected exactly one character, got {raw:?}"),
            }
        }
        ValueKind::String => Value::String(raw.to_owned()),
        ValueKind::List | ValueKind::Set | ValueKind::Map => {
            bail!("{kind} values cannot be set from the command line")
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn scalars_to_json() {
        assert_eq!(to_json(&Value::Int(3)), json!(3));
        assert_eq!(to_json(&Value::Float(0.5)), json!(0.5));
        assert_eq!(to_json(&Value::Double(f64::NAN)), Json::Null);
        assert_eq!(to_json(&Value::Char(0x41)), json!("A"));
        assert_eq!(to_json(&Value::Char(0xd800)), json!("\\ud800"));
    }

    #[test]
    fn string_keyed_map_becomes_object() {
        let mut map = BTreeMap::new();
        map.insert(Value::from("a"), Value::List(vec![Value::Bool(true)]));
        assert_eq!(to_json(&Value::Map(map)), json!({ "a": [true] }));
    }

    #[test]
    fn other_maps_become_pair_arrays() {
        let mut map = BTreeMap::new();
        map.insert(Value::Int(1), Value::from("one"));
        map.insert(Value::from("two"), Value::Int(2));
        assert_eq!(
            to_json(&Value::Map(map)),
            json!([[1, "one"], ["two", 2]])
        );
    }

    #[test]
    fn entry_json_carries_kind() {
        let value = Value::Long(7);
        assert_eq!(
            entry_json("count", Some(&value)),
            json!({ "key": "count", "kind": "long", "value": 7 })
        );
        assert_eq!(entry_json("count", None), Json::Null);
    }

    #[test]
    fn kind_names_match_display() {
        for kind in ValueKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.to_string()));
        }
        let kind: ValueKind = serde_json::from_str("\"map\"").unwrap();
        assert_eq!(kind, ValueKind::Map);
    }

    #[test]
    fn parse_scalars() {
        assert_eq!(parse_scalar(ValueKind::Int, "42").unwrap(), Value::Int(42));
        assert_eq!(parse_scalar(ValueKind::Byte, "-8").unwrap(), Value::Byte(-8));
        assert_eq!(parse_scalar(ValueKind::Bool, "true").unwrap(), Value::Bool(true));
        assert_eq!(parse_scalar(ValueKind::Char, "é").unwrap(), Value::Char(0xe9));
        assert_eq!(parse_scalar(ValueKind::String, "x y").unwrap(), Value::from("x y"));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse_scalar(ValueKind::Byte, "300").is_err());
        assert!(parse_scalar(ValueKind::Char, "ab").is_err());
        assert!(parse_scalar(ValueKind::Char, "😀").is_err());
        assert!(parse_scalar(ValueKind::List, "[]").is_err());
    }
}
