//! Converts a parsed [`Header`] into an info [`Dict`], applying type
//! inference/promotion and shape inference the way the original format's
//! `tree_to_dict`/`DataLinkedList_to_data` do.
use crate::error::{Error, ErrorKind};
use crate::tree::{Header, ValueNode};
use crate::value::{Dict, DictEntry, TypeTag, Value};

/// Build an info [`Dict`] from a parsed header.
///
/// # Errors
/// `ErrorKind::InconsistentArrayShape` if a 2-D array's rows differ in
/// length, `ErrorKind::IncompatibleArrayTypes` if an array mixes types that
/// cannot be promoted to a common one, or `ErrorKind::InternalError` if a
/// key appears more than once.
pub fn build_dict(header: &Header) -> Result<Dict, Error> {
    let mut dict = Dict::new();
    for pair in &header.pairs {
        let entry = build_entry(&pair.key, &pair.value, pair.is_legacy)?;
        dict.insert(entry)?;
    }
    Ok(dict)
}

fn build_entry(key: &str, value: &ValueNode, is_legacy: bool) -> Result<DictEntry, Error> {
    match value {
        ValueNode::Scalar(v) => Ok(DictEntry::scalar(key, v.clone())),
        ValueNode::Sequence(items) => {
            if items.is_empty() {
                return Err(Error::new(
                    ErrorKind::InternalError(format!("empty array for key {}", key)),
                    "array literal had no elements",
                ));
            }
            if is_row(&items[0]) {
                build_matrix_entry(key, items)
            } else {
                build_vector_entry(key, items, is_legacy)
            }
        }
    }
}

fn is_row(node: &ValueNode) -> bool {
    matches!(node, ValueNode::Sequence(_))
}

fn build_vector_entry(key: &str, items: &[ValueNode], is_legacy: bool) -> Result<DictEntry, Error> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ValueNode::Scalar(v) => values.push(v.clone()),
            ValueNode::Sequence(_) => {
                return Err(Error::new(
                    ErrorKind::InconsistentArrayShape {
                        key: key.to_string(),
                        row: values.len(),
                        observed: 0,
                        expected: 0,
                    },
                    "mixed scalar and nested array elements in a 1-D array",
                ));
            }
        }
    }
    let type_tag = unify_type(key, &values)?;
    let values = promote_all(values, type_tag);

    // A single-element *legacy* quoted sequence collapses to a scalar,
    // matching the original parser's depth-1-exit special case; a bracketed
    // `[v]` literal stays a 1-D vector of length 1.
    if is_legacy && values.len() == 1 {
        return Ok(DictEntry::scalar(key, values.into_iter().next().unwrap()));
    }

    // A 9-element legacy quoted array reshapes into a 3x3 matrix, stored
    // column-major (the Fortran-order convention the legacy format used),
    // which only ever applies to the quoted `"..."`/`{...}` form and never
    // to a bracketed `[...]` literal.
    if is_legacy && values.len() == 9 {
        let mut data = vec![values[0].clone(); 9];
        for c in 0..3 {
            for r in 0..3 {
                data[r * 3 + c] = values[c * 3 + r].clone();
            }
        }
        return Ok(DictEntry::matrix(key, type_tag, 3, 3, data));
    }

    Ok(DictEntry::vector(key, type_tag, values))
}

fn build_matrix_entry(key: &str, rows: &[ValueNode]) -> Result<DictEntry, Error> {
    let mut all_values = Vec::new();
    let mut ncols = None;
    for (row_idx, row) in rows.iter().enumerate() {
        let row_number = row_idx + 1;
        let items = match row {
            ValueNode::Sequence(items) => items,
            ValueNode::Scalar(_) => {
                return Err(Error::new(
                    ErrorKind::InconsistentArrayShape {
                        key: key.to_string(),
                        row: row_number,
                        observed: 1,
                        expected: ncols.unwrap_or(0),
                    },
                    "mixed scalar and nested array rows in a 2-D array",
                ));
            }
        };
        match ncols {
            None => ncols = Some(items.len()),
            Some(expected) if expected != items.len() => {
                return Err(Error::new(
                    ErrorKind::InconsistentArrayShape {
                        key: key.to_string(),
                        row: row_number,
                        observed: items.len(),
                        expected,
                    },
                    "row length did not match previous rows",
                ));
            }
            Some(_) => {}
        }
        for item in items {
            match item {
                ValueNode::Scalar(v) => all_values.push(v.clone()),
                ValueNode::Sequence(_) => {
                    return Err(Error::new(
                        ErrorKind::InternalError(format!("array for key {} is more than 2-D", key)),
                        "only scalars and 1-D/2-D arrays are supported",
                    ));
                }
            }
        }
    }
    let type_tag = unify_type(key, &all_values)?;
    let all_values = promote_all(all_values, type_tag);
    Ok(DictEntry::matrix(key, type_tag, rows.len(), ncols.unwrap_or(0), all_values))
}

fn unify_type(key: &str, values: &[Value]) -> Result<TypeTag, Error> {
    let mut tag = values[0].tag();
    for v in &values[1..] {
        let other = v.tag();
        tag = tag.promote(other).ok_or_else(|| {
            Error::new(
                ErrorKind::IncompatibleArrayTypes {
                    key: key.to_string(),
                    from: tag.name(),
                    to: other.name(),
                },
                format!("array '{}' mixes incompatible types", key),
            )
        })?;
    }
    Ok(tag)
}

fn promote_all(values: Vec<Value>, target: TypeTag) -> Vec<Value> {
    values.into_iter().map(|v| v.promote_to(target)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::parse_header;
    use crate::grammar::Grammar;

    fn parse(line: &str) -> Header {
        parse_header(line, &Grammar::compile().unwrap()).unwrap()
    }

    #[test]
    fn test_scalar_entry() {
        let dict = build_dict(&parse("energy=-1.5")).unwrap();
        let e = dict.get("energy").unwrap();
        assert!(e.is_scalar());
        assert_eq!(e.data[0], Value::Float(-1.5));
    }

    #[test]
    fn test_bracketed_single_element_stays_a_vector() {
        let dict = build_dict(&parse("x=[1]")).unwrap();
        let e = dict.get("x").unwrap();
        assert!(!e.is_scalar());
        assert_eq!(e.shape, (0, 1));
    }

    #[test]
    fn test_legacy_single_element_collapses_to_scalar() {
        let dict = build_dict(&parse(r#"pbc="T""#)).unwrap();
        let e = dict.get("pbc").unwrap();
        assert!(e.is_scalar());
        assert_eq!(e.data[0], Value::Bool(true));
    }

    #[test]
    fn test_type_promotion_int_float() {
        let dict = build_dict(&parse("v=[1,2.5,3]")).unwrap();
        let e = dict.get("v").unwrap();
        assert_eq!(e.type_tag, TypeTag::Float);
        assert_eq!(e.data, vec![Value::Float(1.0), Value::Float(2.5), Value::Float(3.0)]);
    }

    #[test]
    fn test_incompatible_types_error() {
        let err = build_dict(&parse(r#"v=[1,"a"]"#)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::IncompatibleArrayTypes { .. }));
    }

    #[test]
    fn test_legacy_nine_element_transpose() {
        let dict = build_dict(&parse(r#"Lattice="1 2 3 4 5 6 7 8 9""#)).unwrap();
        let e = dict.get("Lattice").unwrap();
        assert_eq!(e.shape, (3, 3));
        // column-major fill: row 0 is [1, 4, 7]
        assert_eq!(e.data[0], Value::Int(1));
        assert_eq!(e.data[1], Value::Int(4));
        assert_eq!(e.data[2], Value::Int(7));
    }

    #[test]
    fn test_bracketed_nine_element_is_not_transposed() {
        let dict = build_dict(&parse("Lattice=[1,2,3,4,5,6,7,8,9]")).unwrap();
        let e = dict.get("Lattice").unwrap();
        assert_eq!(e.shape, (0, 9));
        assert_eq!(e.data[1], Value::Int(2));
    }

    #[test]
    fn test_2d_matrix() {
        let dict = build_dict(&parse("Lattice=[[1,0,0],[0,1,0],[0,0,1]]")).unwrap();
        let e = dict.get("Lattice").unwrap();
        assert_eq!(e.shape, (3, 3));
        assert_eq!(e.data[4], Value::Int(1));
    }

    #[test]
    fn test_inconsistent_shape_error() {
        let err = build_dict(&parse("Lattice=[[1,0],[0,1,0],[0,0,1]]")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InconsistentArrayShape { .. }));
    }
}
