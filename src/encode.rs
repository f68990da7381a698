//! Value → tree. Dispatches on the runtime tag of each value.
use serde_json::Number;

use crate::node::{Mapping, Node};
use crate::value::Value;

/// Encode `value` as a data tree. `flatten_enums` applies at every depth:
/// members become their bare underlying value instead of
/// `{"name": .., "value": ..}`.
pub fn encode(value: &Value, flatten_enums: bool) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Int(i) => Node::Number((*i).into()),
        // non-finite floats have no JSON form
        Value::Float(f) => Number::from_f64(f.0).map(Node::Number).unwrap_or(Node::Null),
        Value::Str(s) => Node::String(s.clone()),
        Value::Raw(node) => node.clone(),
        Value::Enum(e) if flatten_enums => e.value().clone(),
        Value::Enum(e) => {
            let mut m = Mapping::new();
            m.insert("name".into(), Node::String(e.name().to_string()));
            m.insert("value".into(), e.value().clone());
            Node::Object(m)
        }
        Value::Record(r) => Node::Object(
            r.fields()
                .iter()
                .map(|(name, v)| (name.clone(), encode(v, flatten_enums)))
                .collect(),
        ),
        Value::Seq(xs) => Node::Array(xs.iter().map(|x| encode(x, flatten_enums)).collect()),
        Value::Map(m) => Node::Object(
            m.iter()
                .map(|(k, v)| (key_text(k, flatten_enums), encode(v, flatten_enums)))
                .collect(),
        ),
    }
}

/// Tree mapping keys are strings: strings stay, enum members use their
/// underlying value, everything else its JSON text.
fn key_text(key: &Value, flatten_enums: bool) -> String {
    let node = match key {
        Value::Enum(e) => e.value().clone(),
        other => encode(other, flatten_enums),
    };
    match node {
        Node::String(s) => s,
        other => other.to_string(),
    }
}

/// Encode and serialize to JSON text.
pub fn to_text(value: &Value, flatten_enums: bool, pretty: bool) -> String {
    let node = encode(value, flatten_enums);
    if pretty {
        // Value → String cannot fail: keys are strings, no custom Serialize
        serde_json::to_string_pretty(&node).unwrap_or_else(|_| node.to_string())
    } else {
        node.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{EnumType, RecordType, TypeDecl};
    use indexmap::IndexMap;
    use serde_json::json;

    #[test]
    fn enum_flattening_toggle() {
        let color = EnumType::new("Color", [("RED", json!(1))]);
        let red = Value::Enum(color.member("RED").unwrap());
        assert_eq!(encode(&red, true), json!(1));
        assert_eq!(encode(&red, false), json!({"name": "RED", "value": 1}));
    }

    #[test]
    fn flattening_reaches_every_depth() {
        let color = EnumType::new("Color", [("RED", json!("red"))]);
        let red = || Value::Enum(color.member("RED").unwrap());
        let holder = RecordType::builder("Holder")
            .field("c", TypeDecl::enumeration(&color))
            .field("cs", TypeDecl::list(TypeDecl::enumeration(&color)))
            .build();
        let mut args = IndexMap::new();
        args.insert("c".to_string(), red());
        args.insert("cs".to_string(), Value::Seq(vec![red()]));
        let v = Value::Record(holder.construct(args).unwrap());
        assert_eq!(encode(&v, true), json!({"c": "red", "cs": ["red"]}));
        assert_eq!(
            encode(&v, false),
            json!({"c": {"name": "RED", "value": "red"}, "cs": [{"name": "RED", "value": "red"}]})
        );
    }

    #[test]
    fn records_encode_every_declared_field_in_order() {
        let ty = RecordType::builder("R")
            .field("b", TypeDecl::int())
            .computed("a", TypeDecl::str(), Value::from("derived"))
            .build();
        let mut args = IndexMap::new();
        args.insert("b".to_string(), Value::Int(1));
        let node = encode(&Value::Record(ty.construct(args).unwrap()), false);
        let keys: Vec<_> = node.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(node, json!({"b": 1, "a": "derived"}));
    }

    #[test]
    fn integers_and_floats_stay_distinct() {
        assert!(encode(&Value::Int(2), false).is_i64());
        assert!(encode(&Value::float(2.0), false).is_f64());
        assert_eq!(encode(&Value::float(f64::NAN), false), Node::Null);
    }

    #[test]
    fn map_keys_become_strings() {
        let mut m = IndexMap::new();
        m.insert(Value::Int(1), Value::from("a"));
        m.insert(Value::Bool(true), Value::Null);
        m.insert(Value::from("k"), Value::Raw(json!([1])));
        assert_eq!(
            encode(&Value::Map(m), false),
            json!({"1": "a", "true": null, "k": [1]})
        );
    }

    #[test]
    fn text_output_is_compact_or_pretty() {
        let v = Value::Seq(vec![Value::Int(1)]);
        assert_eq!(to_text(&v, false, false), "[1]");
        assert_eq!(to_text(&v, false, true), "[\n  1\n]");
    }
}
