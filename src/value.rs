use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically typed register slot value. Type checks happen when an
/// instruction uses the value, never earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    /// Names another register in the same frame. Resolved one level per use.
    Ref(usize),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Bytes(_) => "bytes",
            Value::Ref(_) => "reference",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Ref(i) => write!(f, "@r{i}"),
        }
    }
}
