use std::fmt;

use thiserror::Error;

use crate::node::{kind_name, summarize, Node};

/// Location of a node inside the tree being decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Path {
    pub fn root() -> Self { Self::default() }

    pub fn segments(&self) -> &[Segment] { &self.0 }

    pub(crate) fn push(&mut self, segment: Segment) { self.0.push(segment) }

    pub(crate) fn pop(&mut self) { self.0.pop(); }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

/// The record constructor refused the assembled arguments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("{record}() missing required argument `{field}`")]
    MissingArgument { record: String, field: String },
    #[error("{record}() got an unexpected argument `{field}`")]
    UnexpectedArgument { record: String, field: String },
    #[error("{record}.{field} is excluded from construction and has no default")]
    Uninitialized { record: String, field: String },
}

/// One failed union alternative.
#[derive(Debug)]
pub struct Attempt {
    pub alternative: String,
    pub error: DecodeError,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("type mismatch at {path}: expected {expected}, found {} {}", kind_name(.found), summarize(.found))]
    TypeMismatch {
        path: Path,
        expected: String,
        found: Node,
    },
    #[error("no alternative of {union} matched at {path} ({})", render_attempts(.attempts))]
    NoMatchingAlternative {
        path: Path,
        union: String,
        found: Node,
        attempts: Vec<Attempt>,
    },
    #[error("unsupported type at {path}: {reason}")]
    UnsupportedType { path: Path, reason: String },
    #[error("cannot construct record at {path}: {source}")]
    Construction {
        path: Path,
        #[source]
        source: ConstructionError,
    },
}

impl DecodeError {
    pub fn path(&self) -> &Path {
        match self {
            DecodeError::TypeMismatch { path, .. }
            | DecodeError::NoMatchingAlternative { path, .. }
            | DecodeError::UnsupportedType { path, .. }
            | DecodeError::Construction { path, .. } => path,
        }
    }
}

fn render_attempts(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.alternative, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of the text front end.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JSON text: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_renders_keys_and_indices() {
        let mut p = Path::root();
        assert_eq!(p.to_string(), "$");
        p.push(Segment::Key("items".into()));
        p.push(Segment::Index(1));
        assert_eq!(p.to_string(), "$.items[1]");
        p.pop();
        assert_eq!(p.to_string(), "$.items");
    }

    #[test]
    fn mismatch_message_names_both_sides() {
        let err = DecodeError::TypeMismatch {
            path: Path::root(),
            expected: "int".into(),
            found: json!("x"),
        };
        assert_eq!(err.to_string(), "type mismatch at $: expected int, found string \"x\"");
    }
}
