//! Type-directed conversion between JSON-shaped data trees and typed values.
//!
//! - `resolve_type` turns a `TypeDecl` into a `TypeDescriptor`.
//! - `decode` matches a tree against a descriptor and builds a `Value`.
//! - `encode` walks a `Value` back into a tree.
//! - `filter_fields` trims a mapping to a record's constructor arguments.
pub mod decl;
pub mod decode;
pub mod encode;
pub mod error;
pub mod filter;
pub mod node;
pub mod path_de;
pub mod resolve;
pub mod schema;
pub mod value;

pub use decl::{EnumType, FieldDecl, FieldDefault, Named, Origin, RecordType, TypeDecl};
pub use decode::decode;
pub use encode::{encode, to_text};
pub use error::{ConstructionError, DecodeError, Error, Path};
pub use filter::filter_fields;
pub use node::Node;
pub use resolve::{resolve_type, Resolver, TypeDescriptor};
pub use schema::{Schema, SchemaError};
pub use value::{EnumValue, RecordValue, Value};

/// Parse JSON text, then decode it against `descriptor`.
pub fn parse_text(text: &str, descriptor: &TypeDescriptor) -> Result<Value, Error> {
    let node: Node = serde_json::from_str(text)?;
    Ok(decode(&node, descriptor)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_separates_syntax_from_shape_errors() {
        let d = resolve_type(&TypeDecl::list(TypeDecl::int()));
        assert_eq!(parse_text("[1, 2]", &d).unwrap(), Value::Seq(vec![Value::Int(1), Value::Int(2)]));
        assert!(matches!(parse_text("[1,", &d), Err(Error::Json(_))));
        assert!(matches!(parse_text("[\"x\"]", &d), Err(Error::Decode(DecodeError::TypeMismatch { .. }))));
    }
}
