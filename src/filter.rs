use crate::decl::RecordType;
use crate::node::Mapping;

/// Keep only the keys naming a constructible field of `record`.
///
/// Unknown keys are dropped; missing required keys are left for the
/// constructor to report.
pub fn filter_fields(mapping: &Mapping, record: &RecordType) -> Mapping {
    mapping
        .iter()
        .filter(|(k, _)| record.field(k).is_some_and(|f| f.init))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::TypeDecl;
    use crate::value::Value;
    use serde_json::json;

    fn record() -> std::sync::Arc<RecordType> {
        RecordType::builder("R")
            .field("a", TypeDecl::int())
            .field_default("b", TypeDecl::str(), Value::from(""))
            .computed("c", TypeDecl::int(), Value::Int(0))
            .build()
    }

    #[test]
    fn drops_unknown_and_non_constructible_keys() {
        let m = json!({"zzz": 1, "b": "x", "c": 3, "a": 2});
        let out = filter_fields(m.as_object().unwrap(), &record());
        assert_eq!(serde_json::Value::Object(out), json!({"b": "x", "a": 2}));
    }

    #[test]
    fn is_idempotent() {
        let m = json!({"a": 1, "c": 2, "other": [1]});
        let ty = record();
        let once = filter_fields(m.as_object().unwrap(), &ty);
        let twice = filter_fields(&once, &ty);
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_keys_stay_missing() {
        let m = json!({"b": "x"});
        let out = filter_fields(m.as_object().unwrap(), &record());
        assert!(!out.contains_key("a"));
    }
}
