//! Declaration documents: record and enum types written as JSON, with
//! field types given as annotation expressions (`Dict[str, List[Child]]`).
//!
//! ```json
//! {
//!   "enums":   { "Color": { "RED": 1, "GREEN": 2 } },
//!   "records": { "Child": [ { "name": "x", "type": "Union[int, str]" },
//!                           { "name": "y", "type": "int", "default": 4 } ] }
//! }
//! ```
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use crate::decl::{EnumType, FieldDecl, FieldDefault, Origin, RecordType, TypeDecl};
use crate::decode::decode;
use crate::error::DecodeError;
use crate::node::Node;
use crate::path_de::{from_str_with_path, PathError};
use crate::resolve::{resolve_type, TypeDescriptor};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed declaration document {0}")]
    Document(#[from] PathError),
    #[error("bad annotation `{expr}` at offset {offset}: {message}")]
    Syntax { expr: String, offset: usize, message: String },
    #[error("type `{0}` is declared twice")]
    Duplicate(String),
    #[error("record types form a cycle: {}", .0.join(" → "))]
    Cycle(Vec<String>),
    #[error("default of {record}.{field} does not fit its type: {source}")]
    BadDefault {
        record: String,
        field: String,
        #[source]
        source: DecodeError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclDocument {
    #[serde(default)]
    pub enums: IndexMap<String, IndexMap<String, Node>>,
    #[serde(default)]
    pub records: IndexMap<String, Vec<FieldEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// `null` is a real default, so presence is tracked separately from `Option`.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Node>,
    #[serde(default = "yes")]
    pub init: bool,
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Node>, D::Error> {
    Node::deserialize(de).map(Some)
}

fn yes() -> bool { true }

/// The named types of one declaration document.
#[derive(Debug, Default)]
pub struct Schema {
    enums: IndexMap<String, Arc<EnumType>>,
    records: IndexMap<String, Arc<RecordType>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(src: &str) -> Result<Self, SchemaError> {
        let doc: DeclDocument = from_str_with_path(src)?;
        Self::from_document(&doc)
    }
}

impl Schema {
    pub fn from_document(doc: &DeclDocument) -> Result<Self, SchemaError> {
        let mut enums = IndexMap::new();
        for (name, members) in &doc.enums {
            if doc.records.contains_key(name) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
            let members = members.iter().map(|(m, v)| (m.clone(), v.clone()));
            enums.insert(name.clone(), EnumType::new(name.clone(), members));
        }

        let mut builder = Builder {
            src: &doc.records,
            enums: &enums,
            built: IndexMap::new(),
            visiting: Vec::new(),
        };
        for name in doc.records.keys() {
            builder.record(name)?;
        }
        let records = builder.built;
        debug!(enums = enums.len(), records = records.len(), "declaration document loaded");
        Ok(Self { enums, records })
    }

    pub fn record(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.records.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumType>> {
        self.enums.get(name)
    }

    /// Parse an annotation expression against the declared names.
    pub fn annotation(&self, expr: &str) -> Result<TypeDecl, SchemaError> {
        let parsed = Parser::new(expr).parse()?;
        to_decl(&parsed, expr, &mut |name: &str| {
            Ok(self
                .records
                .get(name)
                .map(TypeDecl::record)
                .or_else(|| self.enums.get(name).map(TypeDecl::enumeration)))
        })
    }

    /// Parse and resolve an annotation expression.
    pub fn descriptor(&self, expr: &str) -> Result<TypeDescriptor, SchemaError> {
        Ok(resolve_type(&self.annotation(expr)?))
    }
}

struct Builder<'a> {
    src: &'a IndexMap<String, Vec<FieldEntry>>,
    enums: &'a IndexMap<String, Arc<EnumType>>,
    built: IndexMap<String, Arc<RecordType>>,
    visiting: Vec<String>,
}

impl Builder<'_> {
    /// Build a record after everything it references. `None` when the name
    /// is not a record.
    fn record(&mut self, name: &str) -> Result<Option<Arc<RecordType>>, SchemaError> {
        if let Some(done) = self.built.get(name) {
            return Ok(Some(Arc::clone(done)));
        }
        let src = self.src;
        let Some(entries) = src.get(name) else {
            return Ok(None);
        };
        if let Some(start) = self.visiting.iter().position(|v| v == name) {
            let mut chain = self.visiting[start..].to_vec();
            chain.push(name.to_string());
            return Err(SchemaError::Cycle(chain));
        }
        self.visiting.push(name.to_string());

        let mut fields = Vec::with_capacity(entries.len());
        for entry in entries {
            let parsed = Parser::new(&entry.ty).parse()?;
            let enums = self.enums;
            let ty = to_decl(&parsed, &entry.ty, &mut |n: &str| match enums.get(n) {
                Some(e) => Ok(Some(TypeDecl::enumeration(e))),
                None => Ok(self.record(n)?.map(|r| TypeDecl::record(&r))),
            })?;
            let default = match &entry.default {
                None => None,
                Some(node) => {
                    let value = decode(node, &resolve_type(&ty)).map_err(|source| SchemaError::BadDefault {
                        record: name.to_string(),
                        field: entry.name.clone(),
                        source,
                    })?;
                    Some(FieldDefault::Value(value))
                }
            };
            fields.push(FieldDecl { name: entry.name.clone(), ty, init: entry.init, default });
        }

        self.visiting.pop();
        let built = fields.into_iter().fold(RecordType::builder(name), |b, f| b.push(f)).build();
        self.built.insert(name.to_string(), Arc::clone(&built));
        Ok(Some(built))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ANNOTATION EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
enum Expr {
    /// `Name` or `Name[args]`; offset of the name for diagnostics
    Name { name: String, args: Option<Vec<Expr>>, offset: usize },
    /// `[a, b]`, as in `Callable[[int], str]`
    Group(Vec<Expr>),
    Scalar { value: Node, offset: usize },
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, SchemaError> {
        let expr = self.expr()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.error("trailing input"));
        }
        Ok(expr)
    }

    fn expr(&mut self) -> Result<Expr, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                Ok(Expr::Group(self.list()?))
            }
            Some('"') => self.string(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
                self.skip_ws();
                let args = if self.peek() == Some('[') {
                    self.pos += 1;
                    Some(self.list()?)
                } else {
                    None
                };
                Ok(Expr::Name { name: name.to_string(), args, offset: start })
            }
            Some(_) => Err(self.error("expected a type")),
            None => Err(self.error("unexpected end of annotation")),
        }
    }

    /// Items up to and including the closing `]`.
    fn list(&mut self) -> Result<Vec<Expr>, SchemaError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') && items.is_empty() {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.expr()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error("expected `,` or `]`")),
            }
        }
    }

    fn string(&mut self) -> Result<Expr, SchemaError> {
        let (src, start) = (self.src, self.pos);
        let mut escaped = false;
        for (i, c) in src[start + 1..].char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    let end = start + 1 + i + 1;
                    return self.scalar(start, end);
                }
                _ => {}
            }
        }
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> Result<Expr, SchemaError> {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
        self.scalar(start, self.pos)
    }

    fn scalar(&mut self, start: usize, end: usize) -> Result<Expr, SchemaError> {
        let src = self.src;
        let value = serde_json::from_str::<Node>(&src[start..end]).map_err(|e| {
            self.pos = start;
            self.error(&e.to_string())
        })?;
        self.pos = end;
        Ok(Expr::Scalar { value, offset: start })
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'s str {
        let (src, start) = (self.src, self.pos);
        let len = src[start..].find(|c: char| !keep(c)).unwrap_or(src.len() - start);
        self.pos += len;
        &src[start..self.pos]
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn error(&self, message: &str) -> SchemaError {
        SchemaError::Syntax { expr: self.src.to_string(), offset: self.pos, message: message.to_string() }
    }
}

type Lookup<'f> = dyn FnMut(&str) -> Result<Option<TypeDecl>, SchemaError> + 'f;

fn to_decl(expr: &Expr, src: &str, lookup: &mut Lookup<'_>) -> Result<TypeDecl, SchemaError> {
    let syntax = |offset: usize, message: &str| SchemaError::Syntax {
        expr: src.to_string(),
        offset,
        message: message.to_string(),
    };
    let (name, args, offset) = match expr {
        Expr::Name { name, args, offset } => (name.as_str(), args, *offset),
        Expr::Group(items) => {
            let args = items.iter().map(|e| to_decl(e, src, lookup)).collect::<Result<_, _>>()?;
            return Ok(TypeDecl::Applied { origin: Origin::Other("params".into()), args });
        }
        Expr::Scalar { offset, .. } => return Err(syntax(*offset, "expected a type, found a value")),
    };

    if name == "Literal" {
        let items = args.as_deref().unwrap_or_default();
        let values = items
            .iter()
            .map(|e| literal_value(e).ok_or_else(|| syntax(offset, "Literal arguments must be values")))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(TypeDecl::Literal(values));
    }

    let Some(items) = args else {
        return Ok(match name {
            "bool" => TypeDecl::bool(),
            "int" => TypeDecl::int(),
            "float" => TypeDecl::float(),
            "str" => TypeDecl::str(),
            "None" | "NoneType" => TypeDecl::none(),
            "object" | "Any" => TypeDecl::object(),
            other => lookup(other)?.unwrap_or_else(|| TypeDecl::opaque(other)),
        });
    };

    let mut args = items.iter().map(|e| to_decl(e, src, lookup)).collect::<Result<Vec<_>, _>>()?;
    let origin = match name {
        "List" | "list" => Origin::List,
        "Dict" | "dict" => Origin::Dict,
        "Union" => Origin::Union,
        "Optional" if args.len() == 1 => return Ok(TypeDecl::optional(args.remove(0))),
        "ClassVar" => Origin::ClassVar,
        "Callable" => Origin::Callable,
        "Tuple" | "tuple" => Origin::Tuple,
        other => Origin::Other(other.to_string()),
    };
    Ok(TypeDecl::Applied { origin, args })
}

fn literal_value(expr: &Expr) -> Option<Node> {
    match expr {
        Expr::Scalar { value, .. } => Some(value.clone()),
        Expr::Name { name, args: None, .. } => match name.as_str() {
            "true" | "True" => Some(Node::Bool(true)),
            "false" | "False" => Some(Node::Bool(false)),
            "null" | "None" => Some(Node::Null),
            _ => None,
        },
        _ => None,
    }
}
