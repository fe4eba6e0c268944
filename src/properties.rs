//! Parses the `Properties=name:type:ncols:...` schema string that describes
//! the columns of every per-atom data line.
use crate::error::{Error, ErrorKind};
use crate::value::TypeTag;

/// One `name:type:ncols` field of a `Properties` schema.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyField {
    /// the field's name, e.g. `species` or `pos`
    pub name: String,
    /// the scalar type of every column in this field
    pub type_tag: TypeTag,
    /// how many columns this field occupies
    pub ncols: usize,
}

/// A full `Properties` schema: an ordered list of fields, together spanning
/// every column of an atom data line.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertiesSchema {
    /// the fields, in column order
    pub fields: Vec<PropertyField>,
}

impl PropertiesSchema {
    /// The default schema used when no `Properties` key is present:
    /// `species:S:1:pos:R:3`.
    pub fn default_schema() -> Self {
        PropertiesSchema {
            fields: vec![
                PropertyField {
                    name: "species".to_string(),
                    type_tag: TypeTag::String,
                    ncols: 1,
                },
                PropertyField {
                    name: "pos".to_string(),
                    type_tag: TypeTag::Float,
                    ncols: 3,
                },
            ],
        }
    }

    /// The total number of columns across every field.
    pub fn total_columns(&self) -> usize {
        self.fields.iter().map(|f| f.ncols).sum()
    }
}

/// Parse a `Properties` value of the form
/// `name:type:ncols(:name:type:ncols)*` where `type` is one of `I`, `R`,
/// `L` or `S`.
///
/// # Errors
/// `ErrorKind::BadPropertiesSchema` if the string isn't well-formed, or
/// `ErrorKind::UnknownPropertyType` if a type character isn't one of the
/// four recognized letters.
pub fn parse_properties(raw: &str) -> Result<PropertiesSchema, Error> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.is_empty() || parts.len() % 3 != 0 {
        return Err(Error::new(
            ErrorKind::BadPropertiesSchema(raw.to_string()),
            "Properties value must be name:type:ncols triples separated by ':'",
        ));
    }
    let mut fields = Vec::with_capacity(parts.len() / 3);
    for chunk in parts.chunks(3) {
        let name = chunk[0];
        if name.is_empty() {
            return Err(Error::new(
                ErrorKind::BadPropertiesSchema(raw.to_string()),
                "field name may not be empty",
            ));
        }
        let type_char = chunk[1].chars().next().ok_or_else(|| {
            Error::new(
                ErrorKind::BadPropertiesSchema(raw.to_string()),
                "field type may not be empty",
            )
        })?;
        let type_tag = match type_char {
            'I' => TypeTag::Int,
            'R' => TypeTag::Float,
            'L' => TypeTag::Bool,
            'S' => TypeTag::String,
            other => return Err(Error::new(ErrorKind::UnknownPropertyType(other), raw.to_string())),
        };
        let ncols: usize = chunk[2].parse().map_err(|_| {
            Error::new(
                ErrorKind::BadPropertiesSchema(raw.to_string()),
                format!("'{}' is not a valid column count", chunk[2]),
            )
        })?;
        if ncols == 0 {
            return Err(Error::new(
                ErrorKind::BadPropertiesSchema(raw.to_string()),
                "field column count must be at least 1",
            ));
        }
        fields.push(PropertyField {
            name: name.to_string(),
            type_tag,
            ncols,
        });
    }
    Ok(PropertiesSchema { fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema() {
        let schema = PropertiesSchema::default_schema();
        assert_eq!(schema.total_columns(), 4);
    }

    #[test]
    fn test_parse_standard_schema() {
        let schema = parse_properties("species:S:1:pos:R:3:forces:R:3").unwrap();
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields[2].name, "forces");
        assert_eq!(schema.total_columns(), 7);
    }

    #[test]
    fn test_unknown_type_errors() {
        let err = parse_properties("species:X:1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownPropertyType('X'));
    }

    #[test]
    fn test_malformed_schema_errors() {
        assert!(parse_properties("species:S").is_err());
        assert!(parse_properties("").is_err());
    }
}
