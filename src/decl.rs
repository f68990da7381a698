//! Type declarations: the caller-side description of a target type.
//!
//! A `TypeDecl` plays the part of a type annotation. It is not interpreted
//! here; `resolve` classifies it into a `TypeDescriptor`.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ConstructionError;
use crate::node::Node;
use crate::value::{EnumValue, RecordValue, Value};

// ————————————————————————————————————————————————————————————————————————————
// ANNOTATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub enum TypeDecl {
    /// A plain named type, no type arguments.
    Named(Named),
    /// A parametrized type such as `List[int]` or `Union[int, str]`.
    Applied { origin: Origin, args: Vec<TypeDecl> },
    /// `Literal[...]`: arguments are values, not types.
    Literal(Vec<Node>),
}

#[derive(Debug, Clone)]
pub enum Named {
    Bool,
    Int,
    Float,
    Str,
    NoneType,
    /// Anything goes (`object` / `Any`).
    Object,
    Enum(Arc<EnumType>),
    Record(Arc<RecordType>),
    /// A named type with no known data shape (functions, handles, …).
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    List,
    Dict,
    Union,
    ClassVar,
    Callable,
    Tuple,
    Other(String),
}

impl TypeDecl {
    pub fn bool() -> Self { Self::Named(Named::Bool) }
    pub fn int() -> Self { Self::Named(Named::Int) }
    pub fn float() -> Self { Self::Named(Named::Float) }
    pub fn str() -> Self { Self::Named(Named::Str) }
    pub fn none() -> Self { Self::Named(Named::NoneType) }
    pub fn object() -> Self { Self::Named(Named::Object) }
    pub fn opaque(name: impl Into<String>) -> Self { Self::Named(Named::Opaque(name.into())) }

    pub fn record(ty: &Arc<RecordType>) -> Self {
        Self::Named(Named::Record(Arc::clone(ty)))
    }

    pub fn enumeration(ty: &Arc<EnumType>) -> Self {
        Self::Named(Named::Enum(Arc::clone(ty)))
    }

    pub fn list(item: TypeDecl) -> Self {
        Self::Applied { origin: Origin::List, args: vec![item] }
    }

    pub fn dict(key: TypeDecl, value: TypeDecl) -> Self {
        Self::Applied { origin: Origin::Dict, args: vec![key, value] }
    }

    pub fn union(alternatives: impl IntoIterator<Item = TypeDecl>) -> Self {
        Self::Applied { origin: Origin::Union, args: alternatives.into_iter().collect() }
    }

    /// `Optional[T]` is `Union[T, None]`.
    pub fn optional(inner: TypeDecl) -> Self {
        Self::union([inner, Self::none()])
    }

    pub fn class_var(inner: TypeDecl) -> Self {
        Self::Applied { origin: Origin::ClassVar, args: vec![inner] }
    }

    pub fn literal(values: impl IntoIterator<Item = Node>) -> Self {
        Self::Literal(values.into_iter().collect())
    }

    pub fn callable(params: Vec<TypeDecl>, ret: TypeDecl) -> Self {
        Self::Applied {
            origin: Origin::Callable,
            args: vec![Self::Applied { origin: Origin::Other("params".into()), args: params }, ret],
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::List => f.write_str("List"),
            Origin::Dict => f.write_str("Dict"),
            Origin::Union => f.write_str("Union"),
            Origin::ClassVar => f.write_str("ClassVar"),
            Origin::Callable => f.write_str("Callable"),
            Origin::Tuple => f.write_str("Tuple"),
            Origin::Other(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDecl::Named(named) => match named {
                Named::Bool => f.write_str("bool"),
                Named::Int => f.write_str("int"),
                Named::Float => f.write_str("float"),
                Named::Str => f.write_str("str"),
                Named::NoneType => f.write_str("None"),
                Named::Object => f.write_str("object"),
                Named::Enum(ty) => f.write_str(&ty.name),
                Named::Record(ty) => f.write_str(&ty.name),
                Named::Opaque(name) => f.write_str(name),
            },
            TypeDecl::Applied { origin, args } => {
                write!(f, "{origin}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
            TypeDecl::Literal(values) => {
                f.write_str("Literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENUMERATED TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub value: Node,
}

impl EnumType {
    pub fn new<N, I>(name: impl Into<String>, members: I) -> Arc<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Node)>,
    {
        Arc::new(Self {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(name, value)| EnumMember { name: name.into(), value })
                .collect(),
        })
    }

    /// Member by name.
    pub fn member(self: &Arc<Self>, name: &str) -> Option<EnumValue> {
        let index = self.members.iter().position(|m| m.name == name)?;
        Some(EnumValue::new(Arc::clone(self), index))
    }

    /// Member by underlying value. Duplicate values are aliases of the first.
    /// Numbers compare by magnitude, so `1.0` finds a member valued `1`.
    pub fn from_value(self: &Arc<Self>, value: &Node) -> Option<EnumValue> {
        let index = self.members.iter().position(|m| same_value(&m.value, value))?;
        Some(EnumValue::new(Arc::clone(self), index))
    }
}

pub(crate) fn same_value(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::Number(x), Node::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RECORD TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeDecl,
    /// false for fields the constructor does not accept (derived fields).
    pub init: bool,
    pub default: Option<FieldDefault>,
}

#[derive(Debug, Clone)]
pub enum FieldDefault {
    Value(Value),
    /// Fresh value per construction.
    Factory(fn() -> Value),
}

impl FieldDefault {
    fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Factory(make) => make(),
        }
    }
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder { name: name.into(), fields: Vec::new() }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Build an instance from named arguments. Defaults are applied here and
    /// nowhere else.
    pub fn construct(
        self: &Arc<Self>,
        mut args: IndexMap<String, Value>,
    ) -> Result<RecordValue, ConstructionError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for decl in &self.fields {
            let supplied = args.shift_remove(&decl.name);
            let value = match (decl.init, supplied) {
                (true, Some(v)) => v,
                (false, Some(_)) => {
                    return Err(ConstructionError::UnexpectedArgument {
                        record: self.name.clone(),
                        field: decl.name.clone(),
                    });
                }
                (init, None) => match &decl.default {
                    Some(default) => default.produce(),
                    None if init => {
                        return Err(ConstructionError::MissingArgument {
                            record: self.name.clone(),
                            field: decl.name.clone(),
                        });
                    }
                    None => {
                        return Err(ConstructionError::Uninitialized {
                            record: self.name.clone(),
                            field: decl.name.clone(),
                        });
                    }
                },
            };
            fields.push((decl.name.clone(), value));
        }
        if let Some((extra, _)) = args.into_iter().next() {
            return Err(ConstructionError::UnexpectedArgument {
                record: self.name.clone(),
                field: extra,
            });
        }
        Ok(RecordValue::new(Arc::clone(self), fields))
    }
}

pub struct RecordBuilder {
    name: String,
    fields: Vec<FieldDecl>,
}

impl RecordBuilder {
    /// Required constructor argument.
    pub fn field(mut self, name: impl Into<String>, ty: TypeDecl) -> Self {
        self.fields.push(FieldDecl { name: name.into(), ty, init: true, default: None });
        self
    }

    pub fn field_default(mut self, name: impl Into<String>, ty: TypeDecl, default: Value) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            init: true,
            default: Some(FieldDefault::Value(default)),
        });
        self
    }

    pub fn field_factory(mut self, name: impl Into<String>, ty: TypeDecl, make: fn() -> Value) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            init: true,
            default: Some(FieldDefault::Factory(make)),
        });
        self
    }

    /// Field excluded from construction; always takes its default.
    pub fn computed(mut self, name: impl Into<String>, ty: TypeDecl, default: Value) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            init: false,
            default: Some(FieldDefault::Value(default)),
        });
        self
    }

    pub fn push(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn build(self) -> Arc<RecordType> {
        Arc::new(RecordType { name: self.name, fields: self.fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child() -> Arc<RecordType> {
        RecordType::builder("Child")
            .field("x", TypeDecl::union([TypeDecl::int(), TypeDecl::str()]))
            .field_default("y", TypeDecl::int(), Value::Int(4))
            .computed("tag", TypeDecl::str(), Value::Str("child".into()))
            .build()
    }

    #[test]
    fn construct_applies_defaults_in_declared_order() {
        let ty = child();
        let mut args = IndexMap::new();
        args.insert("x".to_string(), Value::Str("meow".into()));
        let rec = ty.construct(args).unwrap();
        let names: Vec<_> = rec.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["x", "y", "tag"]);
        assert_eq!(rec.get("y"), Some(&Value::Int(4)));
        assert_eq!(rec.get("tag"), Some(&Value::Str("child".into())));
    }

    #[test]
    fn construct_rejects_missing_and_unexpected() {
        let ty = child();
        let err = ty.construct(IndexMap::new()).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingArgument { ref field, .. } if field == "x"));

        let mut args = IndexMap::new();
        args.insert("x".to_string(), Value::Int(1));
        args.insert("tag".to_string(), Value::Str("nope".into()));
        let err = ty.construct(args).unwrap_err();
        assert!(matches!(err, ConstructionError::UnexpectedArgument { ref field, .. } if field == "tag"));

        let mut args = IndexMap::new();
        args.insert("x".to_string(), Value::Int(1));
        args.insert("zzz".to_string(), Value::Null);
        assert!(ty.construct(args).is_err());
    }

    #[test]
    fn factory_default_runs_per_construction() {
        let ty = RecordType::builder("Bag")
            .field_factory("items", TypeDecl::list(TypeDecl::int()), || Value::Seq(Vec::new()))
            .build();
        let rec = ty.construct(IndexMap::new()).unwrap();
        assert_eq!(rec.get("items"), Some(&Value::Seq(Vec::new())));
    }

    #[test]
    fn enum_lookup_by_value_prefers_first_alias() {
        let ty = EnumType::new("Level", [("LOW", json!(1)), ("MIN", json!(1)), ("HIGH", json!(9))]);
        assert_eq!(ty.from_value(&json!(1)).unwrap().name(), "LOW");
        assert_eq!(ty.member("HIGH").unwrap().value(), &json!(9));
        assert!(ty.from_value(&json!("1")).is_none());
    }

    #[test]
    fn enum_lookup_treats_equal_numbers_alike() {
        let ty = EnumType::new("Level", [("LOW", json!(1)), ("HALF", json!(0.5))]);
        assert_eq!(ty.from_value(&json!(1.0)).unwrap().name(), "LOW");
        assert_eq!(ty.from_value(&json!(0.5)).unwrap().name(), "HALF");
        assert!(ty.from_value(&json!(1.5)).is_none());
        assert!(ty.from_value(&json!(true)).is_none());
    }

    #[test]
    fn annotations_display_like_type_hints() {
        let ty = child();
        let decl = TypeDecl::dict(TypeDecl::str(), TypeDecl::optional(TypeDecl::record(&ty)));
        assert_eq!(decl.to_string(), "Dict[str, Union[Child, None]]");
        assert_eq!(TypeDecl::literal([json!("a"), json!(2)]).to_string(), "Literal[\"a\", 2]");
    }
}
