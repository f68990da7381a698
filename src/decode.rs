//! Tree → value: match a node against a descriptor.
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::decl::same_value;
use crate::error::{Attempt, DecodeError, Path, Segment};
use crate::node::{Mapping, Node};
use crate::resolve::{PrimitiveKind, RecordDescriptor, TypeDescriptor};
use crate::value::Value;

/// Decode `node` as a value of the type described by `descriptor`.
pub fn decode(node: &Node, descriptor: &TypeDescriptor) -> Result<Value, DecodeError> {
    Decoder::default().decode(node, descriptor)
}

#[derive(Default)]
struct Decoder {
    path: Path,
}

impl Decoder {
    fn decode(&mut self, node: &Node, descriptor: &TypeDescriptor) -> Result<Value, DecodeError> {
        match descriptor {
            TypeDescriptor::Primitive(kind) => self.decode_primitive(node, *kind),
            TypeDescriptor::Enum(ty) => {
                let member = match node {
                    Node::Object(m) => named_member(m).and_then(|(name, value)| {
                        ty.member(name).filter(|e| same_value(e.value(), value))
                    }),
                    other => ty.from_value(other),
                };
                member.map(Value::Enum).ok_or_else(|| self.mismatch(descriptor, node))
            }
            TypeDescriptor::Record(rd) => self.decode_record(node, rd, descriptor),
            TypeDescriptor::Union(alts) => self.decode_union(node, alts, descriptor),
            TypeDescriptor::Sequence(item) => {
                let Node::Array(xs) = node else {
                    return Err(self.mismatch(descriptor, node));
                };
                let mut out = Vec::with_capacity(xs.len());
                for (i, x) in xs.iter().enumerate() {
                    self.path.push(Segment::Index(i));
                    let v = self.decode(x, item);
                    self.path.pop();
                    out.push(v?);
                }
                Ok(Value::Seq(out))
            }
            TypeDescriptor::Mapping(key_desc, value_desc) => {
                let Node::Object(m) = node else {
                    return Err(self.mismatch(descriptor, node));
                };
                let mut out = IndexMap::with_capacity(m.len());
                for (k, v) in m {
                    self.path.push(Segment::Key(k.clone()));
                    let entry = self
                        .decode_key(k, key_desc)
                        .and_then(|key| Ok((key, self.decode(v, value_desc)?)));
                    self.path.pop();
                    let (key, value) = entry?;
                    out.insert(key, value);
                }
                Ok(Value::Map(out))
            }
            TypeDescriptor::Passthrough(marker) => {
                debug!(path = %self.path, ?marker, "passing node through unchecked");
                Ok(Value::Raw(node.clone()))
            }
            TypeDescriptor::Unsupported(reason) => Err(DecodeError::UnsupportedType {
                path: self.path.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Tree keys are always strings. A key that does not fit as text is
    /// read back as the JSON scalar the encoder wrote (`"1"`, `"true"`).
    fn decode_key(&mut self, key: &str, descriptor: &TypeDescriptor) -> Result<Value, DecodeError> {
        let error = match self.decode(&Node::String(key.to_string()), descriptor) {
            Ok(v) => return Ok(v),
            Err(error) => error,
        };
        match serde_json::from_str::<Node>(key) {
            Ok(parsed) if !parsed.is_string() => {
                trace!(path = %self.path, key, "retrying key as JSON text");
                self.decode(&parsed, descriptor).map_err(|_| error)
            }
            _ => Err(error),
        }
    }

    fn decode_primitive(&self, node: &Node, kind: PrimitiveKind) -> Result<Value, DecodeError> {
        let converted = match (kind, node) {
            (PrimitiveKind::Object, _) => Some(Value::Raw(node.clone())),
            (PrimitiveKind::Null, Node::Null) => Some(Value::Null),
            (PrimitiveKind::Bool, Node::Bool(b)) => Some(Value::Bool(*b)),
            (PrimitiveKind::Bool, Node::Number(n)) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
            (PrimitiveKind::Str, Node::String(s)) => Some(Value::Str(s.clone())),
            (PrimitiveKind::Str, Node::Number(n)) => Some(Value::Str(n.to_string())),
            (PrimitiveKind::Str, Node::Bool(b)) => Some(Value::Str(bool_text(*b).to_string())),
            (PrimitiveKind::Int, Node::Number(n)) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().and_then(truncated_f64).map(Value::Int),
            },
            (PrimitiveKind::Int, Node::Bool(b)) => Some(Value::Int(i64::from(*b))),
            (PrimitiveKind::Int, Node::String(s)) => s.trim().parse::<i64>().ok().map(Value::Int),
            (PrimitiveKind::Float, Node::Number(n)) => n.as_f64().map(Value::float),
            (PrimitiveKind::Float, Node::Bool(b)) => Some(Value::float(if *b { 1.0 } else { 0.0 })),
            (PrimitiveKind::Float, Node::String(s)) => s.trim().parse::<f64>().ok().map(Value::float),
            _ => None,
        };
        converted.ok_or_else(|| self.mismatch(&TypeDescriptor::Primitive(kind), node))
    }

    fn decode_record(
        &mut self,
        node: &Node,
        rd: &RecordDescriptor,
        descriptor: &TypeDescriptor,
    ) -> Result<Value, DecodeError> {
        let Node::Object(m) = node else {
            return Err(self.mismatch(descriptor, node));
        };
        let mut args = IndexMap::new();
        for field in rd.fields.iter().filter(|f| f.constructible) {
            let Some(raw) = m.get(&field.name) else { continue };
            self.path.push(Segment::Key(field.name.clone()));
            let v = self.decode(raw, &field.descriptor);
            self.path.pop();
            args.insert(field.name.clone(), v?);
        }
        rd.ty
            .construct(args)
            .map(Value::Record)
            .map_err(|source| DecodeError::Construction { path: self.path.clone(), source })
    }

    fn decode_union(
        &mut self,
        node: &Node,
        alts: &[TypeDescriptor],
        descriptor: &TypeDescriptor,
    ) -> Result<Value, DecodeError> {
        let mut attempts = Vec::with_capacity(alts.len());
        for alt in alts {
            match self.decode(node, alt) {
                Ok(v) => return Ok(v),
                Err(error) => {
                    trace!(path = %self.path, alternative = %alt, %error, "union alternative rejected");
                    attempts.push(Attempt { alternative: alt.to_string(), error });
                }
            }
        }
        Err(DecodeError::NoMatchingAlternative {
            path: self.path.clone(),
            union: descriptor.to_string(),
            found: node.clone(),
            attempts,
        })
    }

    fn mismatch(&self, expected: &TypeDescriptor, found: &Node) -> DecodeError {
        DecodeError::TypeMismatch {
            path: self.path.clone(),
            expected: expected.to_string(),
            found: found.clone(),
        }
    }
}

/// `{"name": .., "value": ..}`, the non-flattened enum encoding.
fn named_member(m: &Mapping) -> Option<(&str, &Node)> {
    if m.len() != 2 {
        return None;
    }
    Some((m.get("name")?.as_str()?, m.get("value")?))
}

/// Toward zero, like `int(3.7) == 3`. Out-of-range and non-finite floats fail.
fn truncated_f64(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound.
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

fn bool_text(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}
