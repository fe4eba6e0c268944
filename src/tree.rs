//! The parse tree produced by [`crate::header`] and consumed by
//! [`crate::builder`].
use crate::value::Value;

/// A parsed right-hand side of a `key=value` pair.
///
/// Grammar terminals (`r_integer`, `r_float`, ...) parse into `Scalar`.
/// `old_one_d_array`, `one_d_array_*` and `two_d_array` all parse into
/// nested `Sequence`s: a 1-D array is a `Sequence` of `Scalar`s and a 2-D
/// array is a `Sequence` of `Sequence`s.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueNode {
    /// a single typed value
    Scalar(Value),
    /// an ordered list of nested values
    Sequence(Vec<ValueNode>),
}

/// A single `key=value` pair parsed out of the comment line.
#[derive(Clone, Debug, PartialEq)]
pub struct KvPair {
    /// the key, already unquoted
    pub key: String,
    /// the parsed value
    pub value: ValueNode,
    /// true if `value` came from the legacy `"..."`/`{...}` quoted form
    /// rather than a bracketed `[...]` literal
    pub is_legacy: bool,
}

/// The full parse tree for one comment line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    /// every `key=value` pair found, in the order they appeared
    pub pairs: Vec<KvPair>,
}
