//! Error types returned by every fallible operation in this crate.
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
use std::num::{ParseFloatError, ParseIntError};
use std::str::Utf8Error;

use crate::buffer::ReadBuffer;

/// The kind of failure that occurred while compiling a grammar, parsing a
/// header line, building a dict or decoding an atom row.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input ended before a complete record could be read.
    EndOfStream,
    /// The `nat` line was missing or not a valid non-negative integer.
    BadNatoms,
    /// The underlying reader returned an I/O failure.
    IoFailure,
    /// The comment line could not be parsed by the grammar; carries the byte
    /// offset into the line where parsing gave up.
    HeaderParseFailed(usize),
    /// An array-valued key was given rows of inconsistent length; carries the
    /// key, the offending row index, the length observed and the length
    /// expected.
    InconsistentArrayShape {
        /// the array's key
        key: String,
        /// the row at which the mismatch was found
        row: usize,
        /// the row length that was found
        observed: usize,
        /// the row length every previous row had
        expected: usize,
    },
    /// An array mixed element types that cannot be promoted to a common type.
    IncompatibleArrayTypes {
        /// the array's key
        key: String,
        /// the name of the type already established for the array
        from: &'static str,
        /// the name of the type that conflicted with it
        to: &'static str,
    },
    /// The `Properties` value could not be parsed as a colon-separated
    /// `name:type:ncols` schema.
    BadPropertiesSchema(String),
    /// An atom data line didn't match the schema derived from `Properties`;
    /// carries the 0-based atom index and a short reason.
    AtomLineMismatch(usize, String),
    /// A `Properties` column declared a type character other than
    /// `I`, `R`, `L` or `S`.
    UnknownPropertyType(char),
    /// Any other failure that doesn't fit the kinds above.
    InternalError(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::EndOfStream => write!(f, "end of stream"),
            ErrorKind::BadNatoms => write!(f, "invalid atom count"),
            ErrorKind::IoFailure => write!(f, "I/O failure"),
            ErrorKind::HeaderParseFailed(pos) => {
                write!(f, "could not parse comment line at byte {}", pos)
            }
            ErrorKind::InconsistentArrayShape {
                key,
                row,
                observed,
                expected,
            } => write!(
                f,
                "array '{}' has {} entries in row {}, expected {}",
                key, observed, row, expected
            ),
            ErrorKind::IncompatibleArrayTypes { key, from, to } => write!(
                f,
                "array '{}' cannot mix {} and {} values",
                key, from, to
            ),
            ErrorKind::BadPropertiesSchema(reason) => {
                write!(f, "invalid Properties schema: {}", reason)
            }
            ErrorKind::AtomLineMismatch(index, reason) => {
                write!(f, "atom line {} did not match its schema: {}", index, reason)
            }
            ErrorKind::UnknownPropertyType(c) => {
                write!(f, "unknown Properties column type '{}'", c)
            }
            ErrorKind::InternalError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

/// Extra information about where in the stream an error occurred, used to
/// annotate `Error`'s `Display` output the way a hex dump would.
#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    /// the byte offset in the stream where the error occurred
    pub byte: u64,
    /// the index of the record being read when the error occurred
    pub record: u64,
    /// a short window of the input around the failure
    pub context: Vec<u8>,
    /// the position in `context` that corresponds to `byte`
    pub context_pos: usize,
}

/// The error type returned by this crate.
#[derive(Debug)]
pub struct Error {
    /// what kind of failure this is
    pub kind: ErrorKind,
    /// a human-readable message describing the failure
    pub msg: String,
    /// positional context, if available
    pub context: Option<ErrorContext>,
    orig_err: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Create a new `Error` of the given `kind` with a display message.
    pub fn new<T: Into<String>>(kind: ErrorKind, msg: T) -> Self {
        Error {
            kind,
            msg: msg.into(),
            context: None,
            orig_err: None,
        }
    }

    /// Attach positional context from a `ReadBuffer` to this error.
    #[must_use]
    pub fn add_context(mut self, rb: &ReadBuffer) -> Self {
        let rb_len = rb.buffer.len();
        let (context, context_pos) = match (rb.consumed < 16, rb_len < rb.consumed + 16) {
            (true, true) => (rb.buffer[..].to_vec(), rb.consumed),
            (true, false) => (rb.buffer[..rb.consumed + 16].to_vec(), rb.consumed),
            (false, true) => {
                if rb.consumed < rb_len {
                    (rb.buffer[rb.consumed - 16..].to_vec(), 16)
                } else {
                    (Vec::new(), 0)
                }
            }
            (false, false) => (rb.buffer[rb.consumed - 16..rb.consumed + 16].to_vec(), 16),
        };

        self.context = Some(ErrorContext {
            record: rb.record_pos,
            byte: rb.get_byte_pos(),
            context,
            context_pos,
        });
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.kind, self.msg)?;
        if let Some(context) = &self.context {
            for c in &context.context {
                write!(f, "{:02X}", c)?;
            }
            writeln!(f)?;
            for c in &context.context {
                if *c > 31 && *c < 127 {
                    write!(f, " {}", char::from(*c))?;
                } else {
                    write!(f, "  ")?;
                }
            }
            write!(
                f,
                "\n{:>width$} {}\n",
                "^^",
                context.byte,
                width = 2 * context.context_pos
            )?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.orig_err.as_ref().map(|c| {
            let b: &(dyn StdError + 'static) = &**c;
            b
        })
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        Error {
            kind: ErrorKind::IoFailure,
            msg: error.to_string(),
            context: None,
            orig_err: Some(Box::new(error)),
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(error: Utf8Error) -> Self {
        Error {
            kind: ErrorKind::InternalError("invalid utf-8".to_string()),
            msg: error.to_string(),
            context: None,
            orig_err: Some(Box::new(error)),
        }
    }
}

impl From<ParseFloatError> for Error {
    fn from(error: ParseFloatError) -> Self {
        Error {
            kind: ErrorKind::InternalError("invalid float".to_string()),
            msg: error.to_string(),
            context: None,
            orig_err: Some(Box::new(error)),
        }
    }
}

impl From<ParseIntError> for Error {
    fn from(error: ParseIntError) -> Self {
        Error {
            kind: ErrorKind::InternalError("invalid integer".to_string()),
            msg: error.to_string(),
            context: None,
            orig_err: Some(Box::new(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let rb = ReadBuffer::from_slice(b"1234567890ABCDEF");
        let err = Error::new(ErrorKind::InternalError("test".to_string()), "Test").add_context(&rb);
        let msg = format!("{}", err);
        assert!(msg.starts_with("internal error: test: Test\n"));
        assert!(msg.contains("^^ 0"));
    }

    #[test]
    fn test_error_kind_display() {
        let err = ErrorKind::UnknownPropertyType('Q');
        assert_eq!(format!("{}", err), "unknown Properties column type 'Q'");
    }
}
