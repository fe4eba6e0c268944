//! The typed value and dictionary types that make up a [`crate::record::Record`].
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// The scalar type of a single value or the element type of an array.
///
/// Mirrors the `data_type` enum of the format this crate reads, minus its
/// `data_none` sentinel (an empty dict entry never exists here).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    /// a signed integer
    Int,
    /// a double-precision float
    Float,
    /// a boolean
    Bool,
    /// a UTF-8 string
    String,
}

impl TypeTag {
    /// The name used in `ErrorKind::IncompatibleArrayTypes` messages.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::String => "string",
        }
    }

    /// The result of unifying two tags in the same array, if any.
    ///
    /// An int column that later sees a float value is promoted to float (and
    /// vice versa); any other pairing of distinct tags is incompatible.
    pub fn promote(self, other: TypeTag) -> Option<TypeTag> {
        if self == other {
            return Some(self);
        }
        match (self, other) {
            (TypeTag::Int, TypeTag::Float) | (TypeTag::Float, TypeTag::Int) => Some(TypeTag::Float),
            _ => None,
        }
    }
}

/// A single scalar value, tagged with its type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// a signed integer
    Int(i64),
    /// a double-precision float
    Float(f64),
    /// a boolean
    Bool(bool),
    /// a UTF-8 string
    String(String),
}

impl Value {
    /// This value's `TypeTag`.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Bool(_) => TypeTag::Bool,
            Value::String(_) => TypeTag::String,
        }
    }

    /// Promote this value to `target`, if the promotion is representable.
    ///
    /// Only `Int -> Float` is a real conversion; every other tag pairing that
    /// `TypeTag::promote` allows is the identity (same tag on both sides).
    pub fn promote_to(self, target: TypeTag) -> Value {
        match (self, target) {
            (Value::Int(i), TypeTag::Float) => Value::Float(i as f64),
            (v, _) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

/// The shape of a `DictEntry`'s data.
///
/// `(0, 0)` is a scalar, `(0, n)` is a 1-D vector of length `n`, and
/// `(r, c)` with both positive is a row-major `r` by `c` matrix.
pub type Shape = (usize, usize);

/// A single entry in an [`Dict`]: a key, its values in row-major order, its
/// shape and its element type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    /// the entry's key
    pub key: String,
    /// the entry's values, in row-major order
    pub data: Vec<Value>,
    /// the element type shared by every value in `data`
    pub type_tag: TypeTag,
    /// the entry's shape
    pub shape: Shape,
}

impl DictEntry {
    /// Build a scalar entry.
    pub fn scalar(key: impl Into<String>, value: Value) -> Self {
        let type_tag = value.tag();
        DictEntry {
            key: key.into(),
            data: vec![value],
            type_tag,
            shape: (0, 0),
        }
    }

    /// Build a 1-D vector entry.
    pub fn vector(key: impl Into<String>, type_tag: TypeTag, data: Vec<Value>) -> Self {
        let len = data.len();
        DictEntry {
            key: key.into(),
            data,
            type_tag,
            shape: (0, len),
        }
    }

    /// Build a row-major matrix entry.
    pub fn matrix(key: impl Into<String>, type_tag: TypeTag, rows: usize, cols: usize, data: Vec<Value>) -> Self {
        DictEntry {
            key: key.into(),
            data,
            type_tag,
            shape: (rows, cols),
        }
    }

    /// True if this entry is a bare scalar.
    pub fn is_scalar(&self) -> bool {
        self.shape == (0, 0)
    }
}

/// An insertion-ordered key/value dictionary.
///
/// Backed by a `Vec` rather than a hash map: `info`/`Properties` dicts hold
/// on the order of tens of entries, so a linear scan is both fast and keeps
/// the insertion order the format and its readers expect.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dict {
    entries: Vec<DictEntry>,
}

impl Dict {
    /// An empty dict.
    pub fn new() -> Self {
        Dict { entries: Vec::new() }
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, DictEntry> {
        self.entries.iter()
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&DictEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// True if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a new entry, rejecting a duplicate key.
    ///
    /// # Errors
    /// Returns `ErrorKind::InternalError` if `key` is already present.
    pub fn insert(&mut self, entry: DictEntry) -> Result<(), Error> {
        if self.contains_key(&entry.key) {
            return Err(Error::new(
                ErrorKind::InternalError(format!("duplicate key: {}", entry.key)),
                format!("key '{}' already present in dict", entry.key),
            ));
        }
        self.entries.push(entry);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = &'a DictEntry;
    type IntoIter = std::slice::Iter<'a, DictEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_promotion() {
        assert_eq!(TypeTag::Int.promote(TypeTag::Int), Some(TypeTag::Int));
        assert_eq!(TypeTag::Int.promote(TypeTag::Float), Some(TypeTag::Float));
        assert_eq!(TypeTag::Float.promote(TypeTag::Int), Some(TypeTag::Float));
        assert_eq!(TypeTag::Bool.promote(TypeTag::Int), None);
        assert_eq!(TypeTag::String.promote(TypeTag::String), Some(TypeTag::String));
    }

    #[test]
    fn test_value_promote_to() {
        assert_eq!(Value::Int(3).promote_to(TypeTag::Float), Value::Float(3.0));
        assert_eq!(Value::Float(3.5).promote_to(TypeTag::Float), Value::Float(3.5));
    }

    #[test]
    fn test_dict_rejects_duplicates() {
        let mut dict = Dict::new();
        dict.insert(DictEntry::scalar("energy", Value::Float(-1.0))).unwrap();
        assert!(dict.insert(DictEntry::scalar("energy", Value::Float(-2.0))).is_err());
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_dict_preserves_order() {
        let mut dict = Dict::new();
        dict.insert(DictEntry::scalar("b", Value::Int(1))).unwrap();
        dict.insert(DictEntry::scalar("a", Value::Int(2))).unwrap();
        let keys: Vec<_> = dict.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
