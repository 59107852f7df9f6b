//! CSV packet-definition loader (AMBIENT-5): parses the field table
//! format of a packet definition file into a [`PacketDefinition`].
//!
//! Columns, in order: `name`, `data_type`, `bit_length`, and optionally
//! `bit_offset` and `byte_order`. A `data_type` of the form
//! `TYPE(shape)` (e.g. `uint(2,3)`, `uint(expand)`, `uint(n1)`) declares
//! an array field: a fixed N-D shape, an expanding array, or a
//! size-by-name array referencing an earlier field, respectively.
use csv::ReaderBuilder;

use crate::error::{DecodeError, Result};
use crate::field::{ArrayOrder, ArrayShape, ByteOrder, DataType, Field};

/// Parse a CSV packet definition from `contents`.
///
/// # Errors
/// Returns [`DecodeError::DefinitionError`] for a malformed row (missing
/// required columns, unknown data type, unparsable array shape), or any
/// error from the underlying [`Field`] constructors.
pub fn parse_fields(contents: &str) -> Result<Vec<Field>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut fields = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DecodeError::DefinitionError {
            field: String::new(),
            reason: format!("malformed CSV row: {e}"),
        })?;
        fields.push(parse_row(&record)?);
    }
    Ok(fields)
}

fn parse_row(record: &csv::StringRecord) -> Result<Field> {
    let get = |i: usize, what: &str| -> Result<&str> {
        record.get(i).ok_or_else(|| DecodeError::DefinitionError {
            field: String::new(),
            reason: format!("missing '{what}' column"),
        })
    };

    let name = get(0, "name")?.trim().to_string();
    let data_type_cell = get(1, "data_type")?.trim();
    let bit_length: u32 = get(2, "bit_length")?
        .trim()
        .parse()
        .map_err(|_| DecodeError::DefinitionError {
            field: name.clone(),
            reason: "bit_length must be an integer".to_string(),
        })?;

    let bit_offset = match record.get(3).map(str::trim) {
        Some(s) if !s.is_empty() => Some(s.parse::<i64>().map_err(|_| DecodeError::DefinitionError {
            field: name.clone(),
            reason: "bit_offset must be an integer".to_string(),
        })?),
        _ => None,
    };

    let byte_order = match record.get(4).map(str::trim) {
        Some(s) if !s.is_empty() => ByteOrder::parse(s)?,
        _ => ByteOrder::Big,
    };

    let (data_type, shape) = parse_data_type_cell(&name, data_type_cell)?;

    match shape {
        ArrayShape::Scalar => Field::with_offset(name, data_type, bit_length, bit_offset, byte_order),
        other => {
            if bit_offset.is_some() {
                return Err(DecodeError::DefinitionError {
                    field: name,
                    reason: "array fields do not support an explicit bit_offset".to_string(),
                });
            }
            Field::array(name, data_type, bit_length, other, ArrayOrder::RowMajor)
        }
    }
}

fn parse_data_type_cell(name: &str, cell: &str) -> Result<(DataType, ArrayShape)> {
    let (base, shape_str) = match cell.split_once('(') {
        Some((base, rest)) => {
            let shape_str = rest.strip_suffix(')').ok_or_else(|| DecodeError::DefinitionError {
                field: name.to_string(),
                reason: format!("unterminated array shape in '{cell}'"),
            })?;
            (base, Some(shape_str))
        }
        None => (cell, None),
    };

    let data_type = match base {
        "uint" => DataType::Uint,
        "int" => DataType::Int,
        "float" => DataType::Float,
        "str" => DataType::Str,
        "fill" => DataType::Fill,
        other => {
            return Err(DecodeError::DefinitionError {
                field: name.to_string(),
                reason: format!("unknown data_type '{other}'"),
            })
        }
    };

    let shape = match shape_str {
        None => ArrayShape::Scalar,
        Some("expand") => ArrayShape::Expand,
        Some(dims) if dims.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
            let parsed: Result<Vec<usize>> = dims
                .split(',')
                .map(|d| {
                    d.trim().parse().map_err(|_| DecodeError::DefinitionError {
                        field: name.to_string(),
                        reason: format!("invalid array dimension in '{dims}'"),
                    })
                })
                .collect();
            ArrayShape::Fixed(parsed?)
        }
        Some(reference) => ArrayShape::SizedBy(reference.trim().to_string()),
    };

    Ok((data_type, shape))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_scalar_fields() {
        let csv = "name,data_type,bit_length\nA,uint,16\nB,int,8\n";
        let fields = parse_fields(csv).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name(), "A");
        assert_eq!(fields[1].data_type(), DataType::Int);
    }

    #[test]
    fn parses_fixed_shape_array() {
        let csv = "name,data_type,bit_length\nimg,uint(2,3),8\n";
        let fields = parse_fields(csv).unwrap();
        assert_eq!(fields[0].array_shape(), &ArrayShape::Fixed(vec![2, 3]));
    }

    #[test]
    fn parses_expand_array() {
        let csv = "name,data_type,bit_length\ndata,uint(expand),16\n";
        let fields = parse_fields(csv).unwrap();
        assert_eq!(fields[0].array_shape(), &ArrayShape::Expand);
    }

    #[test]
    fn parses_size_by_name_array() {
        let csv = "name,data_type,bit_length\nn1,uint,8\ndata1,uint(n1),16\n";
        let fields = parse_fields(csv).unwrap();
        assert_eq!(
            fields[1].array_shape(),
            &ArrayShape::SizedBy("n1".to_string())
        );
    }

    #[test]
    fn parses_explicit_offset_and_byte_order() {
        let csv = "name,data_type,bit_length,bit_offset,byte_order\nA,uint,16,8,little\n";
        let fields = parse_fields(csv).unwrap();
        assert_eq!(fields[0].bit_offset(), Some(8));
        assert_eq!(fields[0].byte_order(), &ByteOrder::Little);
    }
}
