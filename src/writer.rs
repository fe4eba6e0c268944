//! Serializes a [`Record`] back into Extended XYZ text.
use std::fmt::Write as _;
use std::io::Write;

use crate::error::Error;
use crate::record::Record;
use crate::value::{Dict, DictEntry, TypeTag, Value};

/// Write `record` to `out` as a complete Extended XYZ record (the `nat`
/// line, comment line and one data line per atom).
///
/// If `record.comment` is set (meaning it was read back from a plain XYZ
/// file with no `key=value` header), the original comment text is written
/// back verbatim so a plain-XYZ round trip is byte-identical; otherwise the
/// comment line is rebuilt from `record.info` plus a `Properties` schema
/// derived from `record.arrays`.
///
/// # Errors
/// Propagates any I/O failure from `out` as `ErrorKind::IoFailure`.
pub fn write_record<W: Write>(record: &Record, out: &mut W) -> Result<(), Error> {
    writeln!(out, "{}", record.nat)?;

    if record.info.is_empty() {
        if let Some(comment) = &record.comment {
            writeln!(out, "{}", comment)?;
        } else {
            writeln!(out)?;
        }
    } else {
        let mut line = String::new();
        for entry in &record.info {
            if !line.is_empty() {
                line.push(' ');
            }
            write_key_value(&mut line, entry);
        }
        if !record.arrays.is_empty() && !record.info.contains_key("Properties") {
            if !line.is_empty() {
                line.push(' ');
            }
            let _ = write!(line, "Properties={}", schema_string(&record.arrays));
        }
        writeln!(out, "{}", line)?;
    }

    let fields: Vec<(&str, usize)> = if let Some(entry) = record.info.get("Properties") {
        match entry.data.first() {
            Some(Value::String(s)) => schema_fields_from_string(s),
            _ => schema_fields_from_arrays(&record.arrays),
        }
    } else {
        schema_fields_from_arrays(&record.arrays)
    };

    for atom_index in 0..record.nat {
        let mut line = String::new();
        for (name, ncols) in &fields {
            let entry = match record.arrays.get(name) {
                Some(e) => e,
                None => continue,
            };
            for col in 0..*ncols {
                if !line.is_empty() {
                    line.push(' ');
                }
                let value = &entry.data[atom_index * ncols + col];
                write_scalar(&mut line, value);
            }
        }
        writeln!(out, "{}", line)?;
    }

    Ok(())
}

fn write_key_value(line: &mut String, entry: &DictEntry) {
    write_key(line, &entry.key);
    line.push('=');
    match entry.shape {
        (0, 0) => write_scalar(line, &entry.data[0]),
        (0, n) => write_vector(line, &entry.data, n),
        (rows, cols) => write_matrix(line, &entry.data, rows, cols),
    }
}

fn write_key(line: &mut String, key: &str) {
    if key.chars().any(|c| c.is_whitespace() || "=\",}{][\\".contains(c)) {
        line.push('"');
        escape_into(line, key);
        line.push('"');
    } else {
        line.push_str(key);
    }
}

fn write_vector(line: &mut String, data: &[Value], n: usize) {
    line.push('[');
    for (i, v) in data[..n].iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        write_scalar(line, v);
    }
    line.push(']');
}

fn write_matrix(line: &mut String, data: &[Value], rows: usize, cols: usize) {
    line.push('[');
    for r in 0..rows {
        if r > 0 {
            line.push(',');
        }
        write_vector(line, &data[r * cols..(r + 1) * cols], cols);
    }
    line.push(']');
}

fn write_scalar(line: &mut String, value: &Value) {
    match value {
        Value::Int(i) => {
            let _ = write!(line, "{}", i);
        }
        Value::Float(x) => {
            let _ = write!(line, "{}", x);
        }
        Value::Bool(b) => line.push_str(if *b { "T" } else { "F" }),
        Value::String(s) => {
            if s.is_empty() || s.chars().any(|c| c.is_whitespace() || "=\",}{][\\".contains(c)) {
                line.push('"');
                escape_into(line, s);
                line.push('"');
            } else {
                line.push_str(s);
            }
        }
    }
}

fn escape_into(line: &mut String, s: &str) {
    for c in s.chars() {
        if c == '"' || c == '\\' {
            line.push('\\');
        }
        if c == '\n' {
            line.push_str("\\n");
        } else {
            line.push(c);
        }
    }
}

fn type_letter(type_tag: TypeTag) -> char {
    match type_tag {
        TypeTag::Int => 'I',
        TypeTag::Float => 'R',
        TypeTag::Bool => 'L',
        TypeTag::String => 'S',
    }
}

fn schema_string(arrays: &Dict) -> String {
    let mut out = String::new();
    for entry in arrays {
        if !out.is_empty() {
            out.push(':');
        }
        let ncols = if entry.shape.0 == 0 { 1.max(entry.shape.1) } else { entry.shape.1 };
        let _ = write!(out, "{}:{}:{}", entry.key, type_letter(entry.type_tag), ncols);
    }
    out
}

fn schema_fields_from_arrays(arrays: &Dict) -> Vec<(&str, usize)> {
    arrays
        .iter()
        .map(|entry| {
            let ncols = if entry.shape.0 == 0 { 1.max(entry.shape.1) } else { entry.shape.1 };
            (entry.key.as_str(), ncols)
        })
        .collect()
}

fn schema_fields_from_string(schema: &str) -> Vec<(&str, usize)> {
    let parts: Vec<&str> = schema.split(':').collect();
    parts
        .chunks(3)
        .filter_map(|chunk| {
            let ncols = chunk.get(2)?.parse().ok()?;
            Some((chunk[0], ncols))
        })
        .collect()
}
