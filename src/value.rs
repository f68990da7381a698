//! Typed values: what decode produces and encode consumes.
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::decl::{EnumType, RecordType};
use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    /// Unconverted node (`object` targets and passthrough markers).
    Raw(Node),
    Enum(EnumValue),
    Record(RecordValue),
    Seq(Vec<Value>),
    Map(IndexMap<Value, Value>),
}

impl Value {
    pub fn float(f: f64) -> Self { Value::Float(OrderedFloat(f)) }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(e) => Some(e),
            _ => None,
        }
    }
}

impl From<bool> for Value { fn from(b: bool) -> Self { Value::Bool(b) } }
impl From<i64> for Value { fn from(i: i64) -> Self { Value::Int(i) } }
impl From<f64> for Value { fn from(f: f64) -> Self { Value::float(f) } }
impl From<&str> for Value { fn from(s: &str) -> Self { Value::Str(s.to_string()) } }
impl From<String> for Value { fn from(s: String) -> Self { Value::Str(s) } }
impl From<EnumValue> for Value { fn from(e: EnumValue) -> Self { Value::Enum(e) } }
impl From<RecordValue> for Value { fn from(r: RecordValue) -> Self { Value::Record(r) } }

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(xs: Vec<T>) -> Self { Value::Seq(xs.into_iter().map(Into::into).collect()) }
}

// Raw nodes only hash their tag: node equality ignores object key order,
// their text does not.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null | Value::Raw(_) => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Enum(e) => e.hash(state),
            Value::Record(r) => r.hash(state),
            Value::Seq(xs) => xs.hash(state),
            // map equality ignores entry order, so the hash must too
            Value::Map(m) => {
                m.len().hash(state);
                let folded = m.iter().fold(0u64, |acc, entry| {
                    let mut h = DefaultHasher::new();
                    entry.hash(&mut h);
                    acc.wrapping_add(h.finish())
                });
                folded.hash(state);
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENUM MEMBERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct EnumValue {
    ty: Arc<EnumType>,
    index: usize,
}

impl EnumValue {
    pub(crate) fn new(ty: Arc<EnumType>, index: usize) -> Self {
        Self { ty, index }
    }

    pub fn enum_type(&self) -> &Arc<EnumType> { &self.ty }

    pub fn name(&self) -> &str { &self.ty.members[self.index].name }

    pub fn value(&self) -> &Node { &self.ty.members[self.index].value }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) && self.index == other.index
    }
}

impl Eq for EnumValue {}

impl Hash for EnumValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.name.hash(state);
        self.index.hash(state);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RECORD INSTANCES
// ————————————————————————————————————————————————————————————————————————————

/// Instance of a `RecordType`: every declared field, in declared order.
#[derive(Debug, Clone)]
pub struct RecordValue {
    ty: Arc<RecordType>,
    fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub(crate) fn new(ty: Arc<RecordType>, fields: Vec<(String, Value)>) -> Self {
        Self { ty, fields }
    }

    pub fn record_type(&self) -> &Arc<RecordType> { &self.ty }

    pub fn fields(&self) -> &[(String, Value)] { &self.fields }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) && self.fields == other.fields
    }
}

impl Eq for RecordValue {}

impl Hash for RecordValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.name.hash(state);
        self.fields.hash(state);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

/// Constructor-call rendering, e.g. `Parent(a=2, c=Child(x="meow", y=4))`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{:?}", x.0),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Raw(node) => write!(f, "{node}"),
            Value::Enum(e) => write!(f, "{}.{}", e.enum_type().name, e.name()),
            Value::Record(r) => {
                write!(f, "{}(", r.record_type().name)?;
                for (i, (name, v)) in r.fields().iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{name}={v}")?;
                }
                f.write_str(")")
            }
            Value::Seq(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::TypeDecl;
    use serde_json::json;

    #[test]
    fn records_of_distinct_types_never_compare_equal() {
        let a = RecordType::builder("P").field("x", TypeDecl::int()).build();
        let b = RecordType::builder("P").field("x", TypeDecl::int()).build();
        let mut args = IndexMap::new();
        args.insert("x".to_string(), Value::Int(1));
        let ra = a.construct(args.clone()).unwrap();
        let rb = b.construct(args.clone()).unwrap();
        assert_ne!(ra, rb);
        assert_eq!(ra, a.construct(args).unwrap());
    }

    #[test]
    fn values_work_as_map_keys() {
        let color = EnumType::new("Color", [("RED", json!(1))]);
        let mut m = IndexMap::new();
        m.insert(Value::Int(1), Value::from("one"));
        m.insert(Value::float(1.5), Value::from("one and a half"));
        m.insert(Value::Enum(color.member("RED").unwrap()), Value::Null);
        assert_eq!(m.get(&Value::Int(1)), Some(&Value::from("one")));
        assert!(m.contains_key(&Value::Enum(color.from_value(&json!(1)).unwrap())));
    }

    #[test]
    fn reordered_maps_are_equal_and_hash_alike() {
        fn hash_of(v: &Value) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }
        let forward: IndexMap<_, _> =
            [(Value::Int(1), Value::from("a")), (Value::Int(2), Value::from("b"))].into_iter().collect();
        let backward: IndexMap<_, _> =
            [(Value::Int(2), Value::from("b")), (Value::Int(1), Value::from("a"))].into_iter().collect();
        let (a, b) = (Value::Map(forward), Value::Map(backward));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display_reads_like_a_constructor_call() {
        let child = RecordType::builder("Child")
            .field("x", TypeDecl::str())
            .field_default("y", TypeDecl::int(), Value::Int(4))
            .build();
        let mut args = IndexMap::new();
        args.insert("x".to_string(), Value::from("meow"));
        let v = Value::Record(child.construct(args).unwrap());
        assert_eq!(v.to_string(), "Child(x=\"meow\", y=4)");
    }
}
