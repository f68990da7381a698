//! The untyped data tree.
//!
//! `serde_json::Value` (with `preserve_order`) is the tree: it keeps
//! integers apart from floats and objects in insertion order.

pub type Node = serde_json::Value;
pub type Mapping = serde_json::Map<String, Node>;

const SUMMARY_MAX_CHARS: usize = 64;

/// Short name of the node's shape, for diagnostics.
pub fn kind_name(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "boolean",
        Node::Number(n) if n.is_f64() => "float",
        Node::Number(_) => "integer",
        Node::String(_) => "string",
        Node::Array(_) => "sequence",
        Node::Object(_) => "mapping",
    }
}

/// Compact JSON rendering, cut on a char boundary.
pub fn summarize(node: &Node) -> String {
    let text = node.to_string();
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text;
    }
    let mut out: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_float_are_told_apart() {
        assert_eq!(kind_name(&json!(1)), "integer");
        assert_eq!(kind_name(&json!(1.0)), "float");
        assert_eq!(kind_name(&json!({"a": 1})), "mapping");
    }

    #[test]
    fn summary_truncation_survives_utf8() {
        let long = Node::String("αβγ".repeat(100));
        let s = summarize(&long);
        assert!(s.ends_with('…'));
        assert_eq!(s.chars().count(), SUMMARY_MAX_CHARS + 1);
    }
}
