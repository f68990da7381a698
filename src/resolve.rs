//! Classify a `TypeDecl` into a `TypeDescriptor`.
//!
//! Never fails: shapes we cannot handle become `Unsupported`, and the
//! failure surfaces when something is decoded against them.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::trace;

use crate::decl::{EnumType, Named, Origin, RecordType, TypeDecl};

#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Enum(Arc<EnumType>),
    Record(Arc<RecordDescriptor>),
    Union(Arc<[TypeDescriptor]>),
    Sequence(Box<TypeDescriptor>),
    Mapping(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// `Literal[...]` / `ClassVar[...]`: the node is kept as-is, unchecked.
    Passthrough(Marker),
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    Str,
    Null,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Literal,
    ClassVar,
}

#[derive(Debug)]
pub struct RecordDescriptor {
    pub ty: Arc<RecordType>,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub constructible: bool,
}

// ------------------------------- Resolver -------------------------------- //

/// Resolver with a read-only cache of record descriptors keyed by type-id
/// (the `Arc<RecordType>` allocation). Cached descriptors keep their type
/// alive, so an address is never reused while it is a key.
#[derive(Default)]
pub struct Resolver {
    records: RwLock<HashMap<usize, Arc<RecordDescriptor>>>,
}

static SHARED: Lazy<Resolver> = Lazy::new(Resolver::new);

/// Resolve through the process-wide resolver.
pub fn resolve_type(decl: &TypeDecl) -> TypeDescriptor {
    SHARED.resolve(decl)
}

impl Resolver {
    pub fn new() -> Self { Self::default() }

    pub fn resolve(&self, decl: &TypeDecl) -> TypeDescriptor {
        match decl {
            TypeDecl::Applied { origin, args } => self.resolve_applied(origin, args),
            TypeDecl::Literal(_) => TypeDescriptor::Passthrough(Marker::Literal),
            TypeDecl::Named(named) => match named {
                Named::Bool => TypeDescriptor::Primitive(PrimitiveKind::Bool),
                Named::Int => TypeDescriptor::Primitive(PrimitiveKind::Int),
                Named::Float => TypeDescriptor::Primitive(PrimitiveKind::Float),
                Named::Str => TypeDescriptor::Primitive(PrimitiveKind::Str),
                Named::NoneType => TypeDescriptor::Primitive(PrimitiveKind::Null),
                Named::Object => TypeDescriptor::Primitive(PrimitiveKind::Object),
                Named::Enum(ty) => TypeDescriptor::Enum(Arc::clone(ty)),
                Named::Record(ty) => TypeDescriptor::Record(self.resolve_record(ty)),
                Named::Opaque(name) => {
                    TypeDescriptor::Unsupported(format!("`{name}` has no data-tree shape"))
                }
            },
        }
    }

    fn resolve_applied(&self, origin: &Origin, args: &[TypeDecl]) -> TypeDescriptor {
        match (origin, args) {
            (Origin::List, [item]) => TypeDescriptor::Sequence(Box::new(self.resolve(item))),
            (Origin::Dict, [k, v]) => {
                TypeDescriptor::Mapping(Box::new(self.resolve(k)), Box::new(self.resolve(v)))
            }
            (Origin::Union, alts) if !alts.is_empty() => {
                TypeDescriptor::Union(alts.iter().map(|a| self.resolve(a)).collect())
            }
            (Origin::ClassVar, _) => TypeDescriptor::Passthrough(Marker::ClassVar),
            (Origin::List | Origin::Dict | Origin::Union, _) => TypeDescriptor::Unsupported(
                format!("{origin} given {} type argument(s)", args.len()),
            ),
            (other, _) => TypeDescriptor::Unsupported(format!("unexpected type origin `{other}`")),
        }
    }

    fn resolve_record(&self, ty: &Arc<RecordType>) -> Arc<RecordDescriptor> {
        let key = Arc::as_ptr(ty) as usize;
        if let Ok(cache) = self.records.read() {
            if let Some(hit) = cache.get(&key) {
                trace!(record = %ty.name, "record descriptor cache hit");
                return Arc::clone(hit);
            }
        }

        let fields = ty
            .fields
            .iter()
            .map(|f| FieldDescriptor {
                name: f.name.clone(),
                descriptor: self.resolve(&f.ty),
                constructible: f.init,
            })
            .collect();
        let resolved = Arc::new(RecordDescriptor { ty: Arc::clone(ty), fields });
        trace!(record = %ty.name, "record descriptor resolved");

        if let Ok(mut cache) = self.records.write() {
            return Arc::clone(cache.entry(key).or_insert(resolved));
        }
        resolved
    }
}

// ------------------------------- Display --------------------------------- //

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Str => "str",
            PrimitiveKind::Null => "None",
            PrimitiveKind::Object => "object",
        })
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{kind}"),
            TypeDescriptor::Enum(ty) => f.write_str(&ty.name),
            TypeDescriptor::Record(rd) => f.write_str(&rd.ty.name),
            TypeDescriptor::Union(alts) => {
                f.write_str("Union[")?;
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{alt}")?;
                }
                f.write_str("]")
            }
            TypeDescriptor::Sequence(item) => write!(f, "List[{item}]"),
            TypeDescriptor::Mapping(k, v) => write!(f, "Dict[{k}, {v}]"),
            TypeDescriptor::Passthrough(Marker::Literal) => f.write_str("Literal"),
            TypeDescriptor::Passthrough(Marker::ClassVar) => f.write_str("ClassVar"),
            TypeDescriptor::Unsupported(_) => f.write_str("<unsupported>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn containers_resolve_recursively() {
        let decl = TypeDecl::dict(TypeDecl::str(), TypeDecl::list(TypeDecl::optional(TypeDecl::int())));
        let d = Resolver::new().resolve(&decl);
        assert_eq!(d.to_string(), "Dict[str, List[Union[int, None]]]");
        assert!(matches!(d, TypeDescriptor::Mapping(..)));
    }

    #[test]
    fn records_keep_declared_field_order_and_constructibility() {
        let ty = RecordType::builder("Point")
            .field("x", TypeDecl::int())
            .field("y", TypeDecl::float())
            .computed("norm", TypeDecl::float(), Value::float(0.0))
            .build();
        let TypeDescriptor::Record(rd) = Resolver::new().resolve(&TypeDecl::record(&ty)) else {
            panic!("expected a record descriptor");
        };
        let summary: Vec<_> = rd
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.descriptor.to_string(), f.constructible))
            .collect();
        assert_eq!(summary, [
            ("x", "int".to_string(), true),
            ("y", "float".to_string(), true),
            ("norm", "float".to_string(), false),
        ]);
    }

    #[test]
    fn record_descriptors_are_cached_per_type() {
        let ty = RecordType::builder("Leaf").field("v", TypeDecl::int()).build();
        let resolver = Resolver::new();
        let (TypeDescriptor::Record(a), TypeDescriptor::Record(b)) = (
            resolver.resolve(&TypeDecl::record(&ty)),
            resolver.resolve(&TypeDecl::record(&ty)),
        ) else {
            panic!("expected record descriptors");
        };
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unclassifiable_declarations_resolve_to_unsupported() {
        let r = Resolver::new();
        let callable = TypeDecl::callable(vec![TypeDecl::int()], TypeDecl::str());
        assert!(matches!(r.resolve(&callable), TypeDescriptor::Unsupported(_)));
        assert!(matches!(r.resolve(&TypeDecl::opaque("socket")), TypeDescriptor::Unsupported(_)));
        let bad_list = TypeDecl::Applied { origin: Origin::List, args: vec![] };
        assert!(matches!(r.resolve(&bad_list), TypeDescriptor::Unsupported(_)));
        assert!(matches!(r.resolve(&TypeDecl::union([])), TypeDescriptor::Unsupported(_)));
    }

    #[test]
    fn markers_resolve_to_passthrough() {
        let r = Resolver::new();
        assert!(matches!(
            r.resolve(&TypeDecl::literal([json!("a")])),
            TypeDescriptor::Passthrough(Marker::Literal)
        ));
        assert!(matches!(
            r.resolve(&TypeDecl::class_var(TypeDecl::int())),
            TypeDescriptor::Passthrough(Marker::ClassVar)
        ));
    }
}
