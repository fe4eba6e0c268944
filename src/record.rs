//! The public record type and the top-level `read_record` operation that
//! ties the header parser, builder, Properties schema and row decoder
//! together.
use std::str;

use crate::buffer::ReadBuffer;
use crate::builder::build_dict;
use crate::error::{Error, ErrorKind};
use crate::grammar::Grammar;
use crate::header::parse_header_partial;
use crate::properties::{parse_properties, PropertiesSchema};
use crate::row::{compile_row_regex, decode_row};
use crate::tree::Header;
use crate::value::{Dict, DictEntry, Value};

/// One parsed Extended XYZ record: an atom count, a comment-line-derived
/// info dict, and a per-atom arrays dict.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    /// the number of atoms, read from the first line
    pub nat: usize,
    /// key/value data parsed out of the comment line
    pub info: Dict,
    /// per-atom columnar data, keyed by `Properties` field name
    pub arrays: Dict,
    /// the raw comment line, kept only when it wasn't an extended header
    pub comment: Option<String>,
}

/// Read a single record from `rb` using the given compiled `grammar`.
///
/// Returns `Ok(None)` at a clean end of stream, and also when the line where
/// the atom count is expected is blank: a blank line is a tolerated record
/// terminator, not something to skip past.
///
/// # Errors
/// `ErrorKind::BadNatoms` if the atom-count line isn't a valid
/// non-negative integer, `ErrorKind::EndOfStream` if the stream ends
/// mid-record, `ErrorKind::HeaderParseFailed` if the comment line isn't
/// fully parseable and its already-parsed prefix mentions one of the
/// `Lattice`/`Cell`/`Properties` marker keys, or any of the
/// Properties/row-decoding error kinds for a malformed schema or atom line.
pub fn read_record(grammar: &Grammar, rb: &mut ReadBuffer) -> Result<Option<Record>, Error> {
    let line = match rb.read_line()? {
        Some(line) => line,
        None => return Ok(None),
    };
    let text = str::from_utf8(line)?.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let nat = text
        .parse::<usize>()
        .map_err(|_| Error::new(ErrorKind::BadNatoms, format!("'{}' is not a valid atom count", text)))?;

    let comment_line = rb
        .read_line()?
        .ok_or_else(|| Error::new(ErrorKind::EndOfStream, "stream ended before the comment line"))?;
    let raw_comment = str::from_utf8(comment_line)?.to_string();

    let (header, fail_pos) = parse_header_partial(&raw_comment, grammar);
    let (info, comment) = match fail_pos {
        None => (build_dict(&header)?, None),
        Some(pos) => {
            if header_mentions_marker_keys(&header) {
                return Err(Error::new(
                    ErrorKind::HeaderParseFailed(pos),
                    format!("could not parse key=value pair at byte {}", pos),
                ));
            }
            (Dict::new(), Some(raw_comment))
        }
    };

    let schema = match info.get("Properties") {
        Some(entry) => match entry.data.first() {
            Some(Value::String(s)) => parse_properties(s)?,
            _ => {
                return Err(Error::new(
                    ErrorKind::BadPropertiesSchema("Properties value was not a string".to_string()),
                    "Properties key must hold a string schema",
                ))
            }
        },
        None => PropertiesSchema::default_schema(),
    };
    let row_regex = compile_row_regex(&schema)?;

    let mut rows = Vec::with_capacity(nat);
    for atom_index in 0..nat {
        let line = rb
            .read_line()?
            .ok_or_else(|| Error::new(ErrorKind::EndOfStream, "stream ended before all atom lines were read"))?;
        let text = str::from_utf8(line)?;
        rows.push(decode_row(text, &row_regex, atom_index)?);
    }

    let arrays = build_arrays(&schema, rows, nat);

    Ok(Some(Record {
        nat,
        info,
        arrays,
        comment,
    }))
}

/// Mirrors the original format's `appears_to_be_extxyz` check: once a parse
/// attempt has stalled partway through the comment line, the already-parsed
/// prefix (not the raw, unparsed text) is consulted for one of the three
/// keys that only ever appear in an extended header. Their presence turns
/// the stalled parse into a hard error instead of a plain-xyz fallback.
fn header_mentions_marker_keys(header: &Header) -> bool {
    header.pairs.iter().any(|pair| {
        let key = pair.key.to_ascii_lowercase();
        key == "lattice" || key == "cell" || key == "properties"
    })
}

fn build_arrays(schema: &PropertiesSchema, rows: Vec<Vec<Value>>, nat: usize) -> Dict {
    let mut arrays = Dict::new();
    let mut offset = 0;
    for field in &schema.fields {
        let mut data = Vec::with_capacity(nat * field.ncols);
        for row in &rows {
            data.extend_from_slice(&row[offset..offset + field.ncols]);
        }
        let entry = if field.ncols == 1 {
            DictEntry::vector(&field.name, field.type_tag, data)
        } else {
            DictEntry::matrix(&field.name, field.type_tag, nat, field.ncols, data)
        };
        // Field names are guaranteed unique by construction of the schema's
        // column ranges, so this can never collide.
        let _ = arrays.insert(entry);
        offset += field.ncols;
    }
    arrays
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(text: &str) -> Record {
        let grammar = Grammar::compile().unwrap();
        let mut rb = ReadBuffer::from_slice(text.as_bytes());
        read_record(&grammar, &mut rb).unwrap().unwrap()
    }

    #[test]
    fn test_plain_xyz_fallback() {
        let record = read_one("2\nwater molecule\nO 0.0 0.0 0.0\nH 0.0 0.0 1.0\n");
        assert_eq!(record.nat, 2);
        assert_eq!(record.comment.as_deref(), Some("water molecule"));
        assert!(record.info.is_empty());
        let species = record.arrays.get("species").unwrap();
        assert_eq!(species.data[0], Value::String("O".to_string()));
    }

    #[test]
    fn test_extended_header_with_lattice_and_properties() {
        let text = "1\nLattice=\"1 0 0 0 1 0 0 0 1\" Properties=species:S:1:pos:R:3 energy=-1.0\nSi 0.0 0.0 0.0\n";
        let record = read_one(text);
        assert_eq!(record.nat, 1);
        assert!(record.comment.is_none());
        let lattice = record.info.get("Lattice").unwrap();
        assert_eq!(lattice.shape, (3, 3));
        let energy = record.info.get("energy").unwrap();
        assert_eq!(energy.data[0], Value::Float(-1.0));
        let pos = record.arrays.get("pos").unwrap();
        assert_eq!(pos.shape, (1, 3));
    }

    #[test]
    fn test_extra_property_columns() {
        let text = "2\nProperties=species:S:1:pos:R:3:forces:R:3\nH 0.0 0.0 0.0 0.1 0.0 0.0\nH 0.0 0.0 1.0 -0.1 0.0 0.0\n";
        let record = read_one(text);
        let forces = record.arrays.get("forces").unwrap();
        assert_eq!(forces.shape, (2, 3));
        assert_eq!(forces.data[0], Value::Float(0.1));
    }

    #[test]
    fn test_bad_natoms_errors() {
        let grammar = Grammar::compile().unwrap();
        let mut rb = ReadBuffer::from_slice(b"not_a_number\ncomment\n");
        let err = read_record(&grammar, &mut rb).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadNatoms);
    }

    #[test]
    fn test_end_of_stream_returns_none() {
        let grammar = Grammar::compile().unwrap();
        let mut rb = ReadBuffer::from_slice(b"");
        assert!(read_record(&grammar, &mut rb).unwrap().is_none());
    }

    #[test]
    fn test_blank_line_terminates_stream() {
        let grammar = Grammar::compile().unwrap();
        let mut rb = ReadBuffer::from_slice(b"\n1\ncomment\nC 0.0 0.0 0.0\n");
        assert!(read_record(&grammar, &mut rb).unwrap().is_none());
    }

    #[test]
    fn test_partial_header_without_marker_keys_falls_back() {
        let record = read_one("1\nenergy=1.0 ===\nC 0.0 0.0 0.0\n");
        assert!(record.info.is_empty());
        assert_eq!(record.comment.as_deref(), Some("energy=1.0 ==="));
    }

    #[test]
    fn test_partial_header_with_marker_key_errors() {
        let grammar = Grammar::compile().unwrap();
        let mut rb = ReadBuffer::from_slice(b"1\nLattice=[1,0,0,0,1,0,0,0,1] ===\nC 0.0 0.0 0.0\n");
        let err = read_record(&grammar, &mut rb).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::HeaderParseFailed(_)));
    }

    #[test]
    fn test_multiple_records_from_one_stream() {
        let grammar = Grammar::compile().unwrap();
        let mut rb = ReadBuffer::from_slice(b"1\nfirst\nC 0.0 0.0 0.0\n1\nsecond\nN 0.0 0.0 0.0\n");
        let first = read_record(&grammar, &mut rb).unwrap().unwrap();
        let second = read_record(&grammar, &mut rb).unwrap().unwrap();
        assert_eq!(first.comment.as_deref(), Some("first"));
        assert_eq!(second.comment.as_deref(), Some("second"));
        assert!(read_record(&grammar, &mut rb).unwrap().is_none());
    }
}
