#![deny(
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
//! Reads and writes Extended XYZ atomic configuration files: a `nat` line,
//! a grammar-driven comment line carrying arbitrary `key=value` metadata,
//! and `nat` per-atom data lines whose columns are described by a
//! `Properties` schema in that comment line.
//!
//! ```
//! use extxyz::{compile_grammar, read_record, ReadBuffer};
//!
//! let grammar = compile_grammar()?;
//! let text = "1\nLattice=\"1 0 0 0 1 0 0 0 1\" Properties=species:S:1:pos:R:3\nSi 0.0 0.0 0.0\n";
//! let mut rb = ReadBuffer::from_slice(text.as_bytes());
//! while let Some(record) = read_record(&grammar, &mut rb)? {
//!     println!("{} atoms", record.nat);
//! }
//! # Ok::<(), extxyz::Error>(())
//! ```

/// The buffer interface every reader reads bytes out of.
pub mod buffer;
/// Tree-to-dict conversion: type inference, promotion and shape inference.
pub mod builder;
/// Errors returned by every fallible operation in this crate.
pub mod error;
/// Terminal matchers for the comment-line grammar.
pub mod grammar;
/// The comment-line recursive-descent parser.
pub mod header;
/// The `Properties=` schema grammar.
pub mod properties;
/// The public record type and `read_record`.
pub mod record;
/// Per-atom row regex compilation and decoding.
pub mod row;
/// The parse tree produced by the header parser.
pub mod tree;
/// The typed value/dict data model.
pub mod value;
/// Serializes a `Record` back to Extended XYZ text.
pub mod writer;

pub use buffer::ReadBuffer;
pub use error::{Error, ErrorKind};
pub use grammar::Grammar;
pub use record::{read_record, Record};
pub use value::{Dict, DictEntry, TypeTag, Value};
pub use writer::write_record;

/// Compile the grammar used by [`read_record`].
///
/// Callers are expected to compile this once and reuse it across every
/// record and thread; it holds only immutable, already-compiled regexes.
///
/// # Errors
/// Only fails if one of the built-in patterns is malformed, which cannot
/// happen with the patterns shipped in this crate.
pub fn compile_grammar() -> Result<Grammar, Error> {
    Grammar::compile()
}
