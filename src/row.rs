//! Compiles a [`PropertiesSchema`] into an anchored regex with one capture
//! group per column, and decodes atom data lines against it.
use regex::Regex;

use crate::error::{Error, ErrorKind};
use crate::properties::PropertiesSchema;
use crate::value::{TypeTag, Value};

/// The per-column regex fragment used for each `Properties` type letter.
fn column_pattern(type_tag: TypeTag) -> &'static str {
    match type_tag {
        TypeTag::Int => r"[+-]?[0-9]+",
        TypeTag::Float => r"[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[dDeE][+-]?[0-9]+)?",
        TypeTag::Bool => r"(?:[TF]|[tT]rue|[fF]alse|TRUE|FALSE)",
        TypeTag::String => r"\S+",
    }
}

/// An atom data line regex compiled from a [`PropertiesSchema`], with one
/// capture group per column and the column types needed to decode a match.
#[derive(Debug, Clone)]
pub struct RowRegex {
    regex: Regex,
    types: Vec<TypeTag>,
}

/// Compile `schema` into a [`RowRegex`].
///
/// # Errors
/// `ErrorKind::BadPropertiesSchema` if the assembled pattern fails to
/// compile, which cannot happen for the four supported type letters but is
/// still surfaced rather than panicking.
pub fn compile_row_regex(schema: &PropertiesSchema) -> Result<RowRegex, Error> {
    let mut types = Vec::with_capacity(schema.total_columns());
    let mut fragments = Vec::with_capacity(schema.total_columns());
    for field in &schema.fields {
        for _ in 0..field.ncols {
            types.push(field.type_tag);
            fragments.push(format!("({})", column_pattern(field.type_tag)));
        }
    }
    let pattern = format!(r"^\s*{}\s*$", fragments.join(r"\s+"));
    let regex = Regex::new(&pattern).map_err(|e| {
        Error::new(
            ErrorKind::BadPropertiesSchema(format!("could not compile row regex: {}", e)),
            "internal row regex failed to compile",
        )
    })?;
    Ok(RowRegex { regex, types })
}

/// Decode a single atom data line against `row_regex`, producing one
/// [`Value`] per column in schema order.
///
/// # Errors
/// `ErrorKind::AtomLineMismatch` if the line doesn't match the schema, with
/// `atom_index` carried through for the caller's error context.
pub fn decode_row(line: &str, row_regex: &RowRegex, atom_index: usize) -> Result<Vec<Value>, Error> {
    let caps = row_regex.regex.captures(line).ok_or_else(|| {
        Error::new(
            ErrorKind::AtomLineMismatch(atom_index, "line did not match the Properties schema".to_string()),
            line.to_string(),
        )
    })?;

    let mut values = Vec::with_capacity(row_regex.types.len());
    for (i, type_tag) in row_regex.types.iter().enumerate() {
        let text = caps.get(i + 1).map(|m| m.as_str()).unwrap_or("");
        let value = decode_column(text, *type_tag, atom_index)?;
        values.push(value);
    }
    Ok(values)
}

fn decode_column(text: &str, type_tag: TypeTag, atom_index: usize) -> Result<Value, Error> {
    let mismatch = |reason: String| {
        Error::new(ErrorKind::AtomLineMismatch(atom_index, reason), text.to_string())
    };
    match type_tag {
        TypeTag::Int => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| mismatch(format!("invalid integer '{}': {}", text, e))),
        TypeTag::Float => {
            let rewritten: String = text.chars().map(|c| if c == 'd' || c == 'D' { 'e' } else { c }).collect();
            rewritten
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| mismatch(format!("invalid float '{}': {}", text, e)))
        }
        TypeTag::Bool => match text {
            "T" | "t" | "True" | "true" | "TRUE" => Ok(Value::Bool(true)),
            "F" | "f" | "False" | "false" | "FALSE" => Ok(Value::Bool(false)),
            other => Err(mismatch(format!("invalid boolean '{}'", other))),
        },
        TypeTag::String => Ok(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::parse_properties;

    #[test]
    fn test_decode_default_schema_row() {
        let schema = PropertiesSchema::default_schema();
        let rr = compile_row_regex(&schema).unwrap();
        let values = decode_row("Si   0.0 1.5 -2.25", &rr, 0).unwrap();
        assert_eq!(
            values,
            vec![
                Value::String("Si".to_string()),
                Value::Float(0.0),
                Value::Float(1.5),
                Value::Float(-2.25),
            ]
        );
    }

    #[test]
    fn test_decode_with_int_and_bool_columns() {
        let schema = parse_properties("species:S:1:pos:R:3:id:I:1:fixed:L:1").unwrap();
        let rr = compile_row_regex(&schema).unwrap();
        let values = decode_row("O 0.0 0.0 0.0 7 T", &rr, 2).unwrap();
        assert_eq!(values[3], Value::Int(7));
        assert_eq!(values[4], Value::Bool(true));
    }

    #[test]
    fn test_decode_fortran_exponent() {
        let schema = parse_properties("species:S:1:pos:R:3").unwrap();
        let rr = compile_row_regex(&schema).unwrap();
        let values = decode_row("H 1.0D+01 2.0d-02 0.0", &rr, 0).unwrap();
        assert_eq!(values[1], Value::Float(10.0));
        assert_eq!(values[2], Value::Float(0.02));
    }

    #[test]
    fn test_decode_mismatch_reports_index() {
        let schema = PropertiesSchema::default_schema();
        let rr = compile_row_regex(&schema).unwrap();
        let err = decode_row("only two tokens", &rr, 3).unwrap_err();
        match err.kind {
            ErrorKind::AtomLineMismatch(idx, _) => assert_eq!(idx, 3),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
