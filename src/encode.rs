//! Packet encoder (C10): the inverse of the fixed-length (C6) and
//! variable-length (C7) decoders. Packs a map of column arrays, plus a
//! per-packet set of primary-header values, into a byte stream.
//!
//! Bit packing mirrors [`crate::decode::common::decode_scalar_element`]
//! in reverse: mask the value to its declared `bit_length`, shift it into
//! position within its promoted storage width, byte-swap or permute, and
//! OR the resulting bytes into the packet buffer (OR rather than
//! overwrite, since two sub-byte fields may share a byte).
use crate::column::{Column, ColumnSet};
use crate::decode::common::{bit_mask, byteswap_n, field_geometry, ElementValue};
use crate::error::{DecodeError, Result};
use crate::expand::{self, ExpandLedger};
use crate::field::{ArrayShape, ByteOrder, DataType, Field, PacketDefinition, PacketKind};
use crate::header::HeaderFields;
use crate::offset;
use crate::permute;

/// Encode `columns` against a fixed-length `fields` definition, using
/// `header` for the per-packet primary-header values.
///
/// `fields` are the user's body fields (no primary-header pseudo-fields):
/// the header's 48 bits are always prepended, exactly as
/// [`crate::packet::PacketSpec::load`] does on decode.
///
/// # Errors
/// Returns [`DecodeError::DefinitionError`] if `fields` describes a
/// variable-length layout, [`DecodeError::EncodingError`] if column
/// lengths disagree, a body field is missing its column, the body is not
/// byte-aligned, or a value does not fit in its declared bit width.
pub fn encode_fixed(fields: &[Field], header: &HeaderFields, columns: &ColumnSet) -> Result<Vec<u8>> {
    PacketDefinition::fixed_length(fields.to_vec())?;

    let (expanded_fields, ledger): (Vec<Field>, ExpandLedger) = expand::expand_array_fields(fields);
    let expanded_columns = expand::split_array_columns(fields, &ledger, columns);

    let n_packets = header.len().ok_or_else(|| {
        DecodeError::EncodingError("header_fields column lengths disagree".to_string())
    })?;
    for field in &expanded_fields {
        let len = expanded_columns
            .get(field.name())
            .ok_or_else(|| DecodeError::EncodingError(format!("missing column '{}'", field.name())))?
            .len();
        if len != n_packets {
            return Err(DecodeError::EncodingError(format!(
                "column '{}' has {len} rows, expected {n_packets}",
                field.name()
            )));
        }
    }

    let body_bits: i64 = expanded_fields.iter().map(|f| i64::from(f.bit_length())).sum();
    if body_bits % 8 != 0 {
        return Err(DecodeError::EncodingError(
            "fixed-length body is not a whole number of bytes".to_string(),
        ));
    }
    let body_bytes = (body_bits / 8) as usize;
    let packet_bytes = 6 + body_bytes;
    let packet_bits = (packet_bytes * 8) as i64;

    let offsets = offset::plan_fixed(&expanded_fields, packet_bits)?;

    let mut out = Vec::with_capacity(packet_bytes * n_packets);
    for k in 0..n_packets {
        let mut packet = vec![0_u8; packet_bytes];
        write_header_prefix(&mut packet, header, k, body_bytes)?;

        for (field, &bit_offset) in expanded_fields.iter().zip(offsets.iter()) {
            let column = expanded_columns.get(field.name()).expect("checked above");
            let value = element_value_at(column, k)?;
            encode_scalar_element(field, bit_offset, &value, &mut packet)?;
        }

        out.extend_from_slice(&packet);
    }

    Ok(out)
}

/// Encode `columns` against a variable-length `fields` definition.
///
/// Per packet, the expanding field's element count is the length of its
/// jagged column row; a size-by-name field's count is likewise its own
/// row's length (the caller is responsible for having set the
/// referenced scalar field's column to the matching value, per spec).
///
/// # Errors
/// Returns [`DecodeError::DefinitionError`] if `fields` is not a valid
/// variable-length layout, or [`DecodeError::EncodingError`] for column
/// length mismatches, missing columns, or values that do not fit their
/// declared bit width.
pub fn encode_variable(fields: &[Field], header: &HeaderFields, columns: &ColumnSet) -> Result<Vec<u8>> {
    PacketDefinition::variable_length(fields.to_vec())?;

    let (expanded_fields, ledger): (Vec<Field>, ExpandLedger) = expand::expand_array_fields(fields);
    let expanded_columns = expand::split_array_columns(fields, &ledger, columns);

    let n_packets = header
        .len()
        .ok_or_else(|| DecodeError::EncodingError("header_fields column lengths disagree".to_string()))?;

    let mut out = Vec::new();
    for k in 0..n_packets {
        let packet = encode_one_variable_packet(&expanded_fields, header, &expanded_columns, k)?;
        out.extend_from_slice(&packet);
    }

    Ok(out)
}

fn encode_one_variable_packet(
    fields: &[Field],
    header: &HeaderFields,
    columns: &ColumnSet,
    k: usize,
) -> Result<Vec<u8>> {
    let mut counter: i64 = 0;
    let mut offsets = vec![0_i64; fields.len()];
    let mut elem_counts = vec![1_usize; fields.len()];

    for (i, field) in fields.iter().enumerate() {
        let column = columns
            .get(field.name())
            .ok_or_else(|| DecodeError::EncodingError(format!("missing column '{}'", field.name())))?;
        let count = match field.array_shape() {
            ArrayShape::Expand | ArrayShape::SizedBy(_) => jagged_row_len(column, field, k)?,
            _ => 1,
        };
        elem_counts[i] = count;
        offsets[i] = counter;
        counter += count as i64 * i64::from(field.bit_length());
    }

    if counter % 8 != 0 {
        return Err(DecodeError::EncodingError(format!(
            "packet {k}'s variable-length body is not byte aligned ({counter} bits)"
        )));
    }
    let body_bytes = (counter / 8) as usize;
    let packet_bytes = 6 + body_bytes;
    let mut packet = vec![0_u8; packet_bytes];
    write_header_prefix(&mut packet, header, k, body_bytes)?;

    for (i, field) in fields.iter().enumerate() {
        let column = columns.get(field.name()).expect("checked above");
        let base = offsets[i];
        if elem_counts[i] == 1 && !matches!(field.array_shape(), ArrayShape::Expand | ArrayShape::SizedBy(_)) {
            let value = element_value_at(column, k)?;
            encode_scalar_element(field, base, &value, &mut packet)?;
        } else {
            let values = jagged_row_values(column, field, k)?;
            for (e, value) in values.into_iter().enumerate() {
                let bit_offset = base + e as i64 * i64::from(field.bit_length());
                encode_scalar_element(field, bit_offset, &value, &mut packet)?;
            }
        }
    }

    Ok(packet)
}

fn write_header_prefix(packet: &mut [u8], header: &HeaderFields, k: usize, body_bytes: usize) -> Result<()> {
    if body_bytes == 0 {
        return Err(DecodeError::EncodingError("packet body must be at least 1 byte".to_string()));
    }
    let prefix = header.primary_header(k).encode_prefix();
    packet[0..4].copy_from_slice(&prefix);
    let packet_length = (body_bytes - 1) as u16;
    packet[4..6].copy_from_slice(&packet_length.to_be_bytes());
    Ok(())
}

fn jagged_row_len(column: &Column, field: &Field, k: usize) -> Result<usize> {
    Ok(match column {
        Column::JaggedUint(rows) => rows[k].len(),
        Column::JaggedInt(rows) => rows[k].len(),
        Column::JaggedFloat(rows) => rows[k].len(),
        Column::JaggedBytes(rows) => rows[k].len() / ((field.bit_length() / 8).max(1) as usize),
        other => {
            return Err(DecodeError::EncodingError(format!(
                "field '{}' expects a jagged column, found {other:?}",
                field.name()
            )))
        }
    })
}

fn jagged_row_values(column: &Column, field: &Field, k: usize) -> Result<Vec<ElementValue>> {
    Ok(match (column, field.data_type()) {
        (Column::JaggedUint(rows), DataType::Uint) => {
            rows[k].iter().map(|&v| ElementValue::Uint(v)).collect()
        }
        (Column::JaggedInt(rows), DataType::Int) => rows[k].iter().map(|&v| ElementValue::Int(v)).collect(),
        (Column::JaggedFloat(rows), DataType::Float) => {
            rows[k].iter().map(|&v| ElementValue::Float(v)).collect()
        }
        (Column::JaggedBytes(rows), DataType::Str | DataType::Fill) => {
            let width = (field.bit_length() / 8).max(1) as usize;
            rows[k].chunks(width).map(|c| ElementValue::Bytes(c.to_vec())).collect()
        }
        (other, _) => {
            return Err(DecodeError::EncodingError(format!(
                "field '{}' column variant {other:?} does not match its declared data type",
                field.name()
            )))
        }
    })
}

fn element_value_at(column: &Column, k: usize) -> Result<ElementValue> {
    Ok(match column {
        Column::UInt8(v) => ElementValue::Uint(u64::from(v[k])),
        Column::UInt16(v) => ElementValue::Uint(u64::from(v[k])),
        Column::UInt32(v) => ElementValue::Uint(u64::from(v[k])),
        Column::UInt64(v) => ElementValue::Uint(v[k]),
        Column::Int8(v) => ElementValue::Int(i64::from(v[k])),
        Column::Int16(v) => ElementValue::Int(i64::from(v[k])),
        Column::Int32(v) => ElementValue::Int(i64::from(v[k])),
        Column::Int64(v) => ElementValue::Int(v[k]),
        Column::Float32(v) => ElementValue::Float(f64::from(v[k])),
        Column::Float64(v) => ElementValue::Float(v[k]),
        Column::Bytes(v) => ElementValue::Bytes(v[k].clone()),
        other => {
            return Err(DecodeError::EncodingError(format!(
                "column variant {other:?} is not a plain scalar"
            )))
        }
    })
}

/// Write one scalar element's encoded bits into `packet`, OR-merging with
/// whatever is already there so neighbouring sub-byte fields don't clobber
/// each other.
fn encode_scalar_element(field: &Field, bit_offset: i64, value: &ElementValue, packet: &mut [u8]) -> Result<()> {
    let geometry = field_geometry(bit_offset, field.bit_length());

    match field.data_type() {
        DataType::Str | DataType::Fill => {
            let bytes = match value {
                ElementValue::Bytes(b) => b,
                other => return Err(type_mismatch(field, other)),
            };
            if bytes.len() != geometry.bytes_in_file {
                return Err(DecodeError::EncodingError(format!(
                    "field '{}' expected {} byte(s), got {}",
                    field.name(),
                    geometry.bytes_in_file,
                    bytes.len()
                )));
            }
            packet[geometry.byte_start..geometry.byte_start + geometry.bytes_in_file].copy_from_slice(bytes);
        }
        DataType::Float => {
            let v = match value {
                ElementValue::Float(f) => *f,
                other => return Err(type_mismatch(field, other)),
            };
            let little = matches!(field.byte_order(), ByteOrder::Little);
            let mut raw = if field.bit_length() == 32 {
                let bits = (v as f32).to_bits();
                if little { bits.to_le_bytes().to_vec() } else { bits.to_be_bytes().to_vec() }
            } else {
                let bits = v.to_bits();
                if little { bits.to_le_bytes().to_vec() } else { bits.to_be_bytes().to_vec() }
            };
            if let ByteOrder::Permutation(digits) = field.byte_order() {
                let inverse = permute::invert_permutation(digits);
                raw = permute::permute_bytes(&raw, &inverse);
            }
            packet[geometry.byte_start..geometry.byte_start + geometry.bytes_in_file].copy_from_slice(&raw);
        }
        DataType::Uint | DataType::Int => {
            let bit_length = field.bit_length();
            let mask = bit_mask(bit_length);

            let raw_value: u64 = match value {
                ElementValue::Uint(u) => {
                    if *u > mask {
                        return Err(DecodeError::EncodingError(format!(
                            "field '{}' value {u} does not fit in {bit_length} bits",
                            field.name()
                        )));
                    }
                    *u
                }
                ElementValue::Int(i) => {
                    let (lo, hi) = if bit_length >= 64 {
                        (i64::MIN, i64::MAX)
                    } else {
                        (-(1_i64 << (bit_length - 1)), (1_i64 << (bit_length - 1)) - 1)
                    };
                    if *i < lo || *i > hi {
                        return Err(DecodeError::EncodingError(format!(
                            "field '{}' value {i} does not fit in {bit_length} signed bits",
                            field.name()
                        )));
                    }
                    (*i as u64) & mask
                }
                other => return Err(type_mismatch(field, other)),
            };

            let shift = crate::decode::common::right_shift(bit_offset, &geometry, bit_length);
            let mut shifted = raw_value;
            if shift > 0 {
                shifted <<= shift;
            }

            if matches!(field.byte_order(), ByteOrder::Little) {
                shifted = byteswap_n(shifted, geometry.storage_bytes);
            }

            let storage_be = shifted.to_be_bytes();
            let padded_start = 8 - geometry.storage_bytes;
            let storage_slice = &storage_be[padded_start..];
            let raw_start = geometry.storage_bytes - geometry.bytes_in_file;
            let mut raw = storage_slice[raw_start..].to_vec();

            if let ByteOrder::Permutation(digits) = field.byte_order() {
                let inverse = permute::invert_permutation(digits);
                raw = permute::permute_bytes(&raw, &inverse);
            }

            for (i, byte) in raw.iter().enumerate() {
                packet[geometry.byte_start + i] |= byte;
            }
        }
    }

    Ok(())
}

fn type_mismatch(field: &Field, value: &ElementValue) -> DecodeError {
    DecodeError::EncodingError(format!(
        "field '{}' (data_type {:?}) given a mismatched value {value:?}",
        field.name(),
        field.data_type()
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode;
    use crate::field::ArrayOrder;

    fn simple_header(n: usize) -> HeaderFields {
        HeaderFields {
            version: vec![0; n],
            packet_type: vec![0; n],
            secondary_flag: vec![false; n],
            apid: vec![10; n],
            sequence_flag: vec![3; n],
            sequence_count: (0..n as u16).collect(),
        }
    }

    #[test]
    fn s1_round_trip_minimal_fixed_packet() {
        let fields = vec![
            Field::new("A", DataType::Uint, 16).unwrap(),
            Field::new("B", DataType::Uint, 16).unwrap(),
            Field::new("C", DataType::Uint, 32).unwrap(),
        ];

        let mut columns = ColumnSet::new();
        columns.insert("A", Column::UInt16(vec![314, 1]));
        columns.insert("B", Column::UInt16(vec![512, 2]));
        columns.insert("C", Column::UInt32(vec![10000, 3]));

        let header = simple_header(2);
        let bytes = encode_fixed(&fields, &header, &columns).unwrap();

        let definition = PacketDefinition::fixed_length(fields).unwrap();
        let decoded = decode::fixed::decode(&definition, &bytes).unwrap();

        match decoded.get("A").unwrap() {
            Column::UInt16(v) => assert_eq!(v, &vec![314, 1]),
            other => panic!("{other:?}"),
        }
        match decoded.get("C").unwrap() {
            Column::UInt32(v) => assert_eq!(v, &vec![10000, 3]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn s2_round_trip_sub_byte_fields() {
        let fields = vec![
            Field::new("u3", DataType::Uint, 3).unwrap(),
            Field::new("i5", DataType::Int, 5).unwrap(),
            Field::new("i12a", DataType::Int, 12).unwrap(),
            Field::new("i12b", DataType::Int, 12).unwrap(),
        ];
        let mut columns = ColumnSet::new();
        columns.insert("u3", Column::UInt8(vec![2]));
        columns.insert("i5", Column::Int8(vec![-5]));
        columns.insert("i12a", Column::Int16(vec![12]));
        columns.insert("i12b", Column::Int16(vec![-6]));

        let header = simple_header(1);
        let bytes = encode_fixed(&fields, &header, &columns).unwrap();

        let definition = PacketDefinition::fixed_length(fields).unwrap();
        let decoded = decode::fixed::decode(&definition, &bytes).unwrap();

        match decoded.get("u3").unwrap() {
            Column::UInt8(v) => assert_eq!(v, &vec![2]),
            other => panic!("{other:?}"),
        }
        match decoded.get("i5").unwrap() {
            Column::Int8(v) => assert_eq!(v, &vec![-5]),
            other => panic!("{other:?}"),
        }
        match decoded.get("i12a").unwrap() {
            Column::Int16(v) => assert_eq!(v, &vec![12]),
            other => panic!("{other:?}"),
        }
        match decoded.get("i12b").unwrap() {
            Column::Int16(v) => assert_eq!(v, &vec![-6]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn rejects_value_that_does_not_fit() {
        let fields = vec![Field::new("A", DataType::Uint, 4).unwrap()];
        let mut columns = ColumnSet::new();
        columns.insert("A", Column::UInt8(vec![255]));
        let header = simple_header(1);
        assert!(encode_fixed(&fields, &header, &columns).is_err());
    }

    #[test]
    fn round_trips_fixed_shape_array() {
        let array = Field::array(
            "img",
            DataType::Uint,
            8,
            ArrayShape::Fixed(vec![2, 2]),
            ArrayOrder::RowMajor,
        )
        .unwrap();
        let fields = vec![array];

        let mut columns = ColumnSet::new();
        columns.insert(
            "img",
            Column::ArrayUInt64 {
                shape: vec![2, 2],
                data: vec![1, 2, 3, 4],
            },
        );

        let header = simple_header(1);
        let bytes = encode_fixed(&fields, &header, &columns).unwrap();

        let definition = PacketDefinition::fixed_length(fields.clone()).unwrap();
        let (expanded, ledger) = expand::expand_array_fields(&fields);
        let expanded_definition = PacketDefinition::fixed_length(expanded).unwrap();
        let mut decoded = decode::fixed::decode(&expanded_definition, &bytes).unwrap();
        expand::collapse_array_fields(&mut decoded, &ledger);
        let _ = definition;

        match decoded.get("img").unwrap() {
            Column::ArrayUInt64 { shape, data } => {
                assert_eq!(shape, &vec![2, 2]);
                assert_eq!(data, &vec![1, 2, 3, 4]);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn encodes_variable_length_expand_array() {
        let fields = vec![
            Field::new("header", DataType::Uint, 8).unwrap(),
            Field::array(
                "data",
                DataType::Uint,
                16,
                ArrayShape::Expand,
                ArrayOrder::RowMajor,
            )
            .unwrap(),
        ];
        let mut columns = ColumnSet::new();
        columns.insert("header", Column::UInt8(vec![1, 2]));
        columns.insert("data", Column::JaggedUint(vec![vec![2, 3], vec![5, 6, 7]]));

        let header = simple_header(2);
        let bytes = encode_variable(&fields, &header, &columns).unwrap();

        let definition = PacketDefinition::variable_length(fields).unwrap();
        let decoded = decode::variable::decode(&definition, &bytes).unwrap();
        match decoded.get("data").unwrap() {
            Column::JaggedUint(rows) => assert_eq!(rows, &vec![vec![2, 3], vec![5, 6, 7]]),
            other => panic!("{other:?}"),
        }
    }
}
