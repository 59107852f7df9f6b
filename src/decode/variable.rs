//! Variable-length per-packet decoder (C7): each packet's body length can
//! depend on an `expand` array (consuming the remainder) or one or more
//! size-by-name arrays (element count read from an earlier field).
use std::collections::HashMap;

use crate::column::{Column, ColumnSet};
use crate::decode::common::{decode_scalar_element, ElementValue};
use crate::error::{DecodeError, Result};
use crate::field::{ArrayShape, DataType, Field, PacketDefinition, PacketKind};
use crate::header::{get_packet_total_bytes, PRIMARY_HEADER_NUM_BYTES};
use crate::offset;

enum PerPacket {
    Scalar(ElementValue),
    Array(Vec<ElementValue>),
}

/// Decode every packet in `data` against a variable-length `definition`.
/// Scalar and fixed-shape-array fields produce one value per packet;
/// `expand` and size-by-name arrays produce one jagged row per packet.
///
/// # Errors
/// Returns [`DecodeError::LayoutError`] if an `expand` field's remaining
/// body bits do not divide evenly by its element width, or the usual
/// header/truncation errors while walking packet boundaries.
///
/// # Panics
/// Panics if `definition.kind() != PacketKind::VariableLength`.
pub fn decode(definition: &PacketDefinition, data: &[u8]) -> Result<ColumnSet> {
    assert_eq!(definition.kind(), PacketKind::VariableLength);
    let fields = definition.fields();
    let plan = offset::plan_variable(fields)?;

    let mut per_field: Vec<Vec<PerPacket>> = fields.iter().map(|_| Vec::new()).collect();

    let mut packet_start = 0_usize;
    while packet_start + PRIMARY_HEADER_NUM_BYTES <= data.len() {
        let header = &data[packet_start..packet_start + PRIMARY_HEADER_NUM_BYTES];
        let packet_nbytes = get_packet_total_bytes(header)?;
        if packet_start + packet_nbytes > data.len() {
            return Err(DecodeError::Truncation {
                missing: packet_start + packet_nbytes - data.len(),
            });
        }
        let packet = &data[packet_start..packet_start + packet_nbytes];
        decode_one_packet(fields, plan.expand_index, packet, &mut per_field)?;
        packet_start += packet_nbytes;
    }

    let mut columns = ColumnSet::new();
    for (field, values) in fields.iter().zip(per_field.into_iter()) {
        columns.insert(field.name(), pack_field_column(field, values));
    }
    Ok(columns)
}

fn decode_one_packet(
    fields: &[Field],
    expand_index: Option<usize>,
    packet: &[u8],
    per_field: &mut [Vec<PerPacket>],
) -> Result<()> {
    let packet_total_bits = (packet.len() * 8) as i64;
    let mut counter: i64 = 0;
    let mut scalars: HashMap<&str, i64> = HashMap::new();

    for (i, field) in fields.iter().enumerate() {
        if Some(i) == expand_index {
            let footer_bits: i64 = fields[i + 1..]
                .iter()
                .map(|f| i64::from(f.bit_length()))
                .sum();
            let available = packet_total_bits - counter - footer_bits;
            if available < 0 || available % i64::from(field.bit_length()) != 0 {
                return Err(DecodeError::LayoutError {
                    field: field.name().to_string(),
                    reason: format!(
                        "expand array of {} remaining bits does not divide evenly by element width {}",
                        available,
                        field.bit_length()
                    ),
                });
            }
            let n_elements = (available / i64::from(field.bit_length())) as usize;
            let mut values = Vec::with_capacity(n_elements);
            for element in 0..n_elements {
                let offset = counter + element as i64 * i64::from(field.bit_length());
                values.push(decode_scalar_element(field, offset, packet));
            }
            counter += available;
            per_field[i].push(PerPacket::Array(values));
            continue;
        }

        if let ArrayShape::SizedBy(ref_name) = field.array_shape() {
            let n = *scalars.get(ref_name.as_str()).ok_or_else(|| DecodeError::LayoutError {
                field: field.name().to_string(),
                reason: format!("size-by-name reference '{ref_name}' was not decoded yet"),
            })?;
            if n < 0 {
                return Err(DecodeError::LayoutError {
                    field: field.name().to_string(),
                    reason: format!("size-by-name reference '{ref_name}' decoded to a negative count"),
                });
            }
            let n = n as usize;
            let mut values = Vec::with_capacity(n);
            for element in 0..n {
                let offset = counter + element as i64 * i64::from(field.bit_length());
                values.push(decode_scalar_element(field, offset, packet));
            }
            counter += n as i64 * i64::from(field.bit_length());
            per_field[i].push(PerPacket::Array(values));
            continue;
        }

        let value = decode_scalar_element(field, counter, packet);
        if let ElementValue::Uint(v) = value {
            scalars.insert(field.name(), v as i64);
        } else if let ElementValue::Int(v) = value {
            scalars.insert(field.name(), v);
        }
        counter += i64::from(field.bit_length());
        per_field[i].push(PerPacket::Scalar(value));
    }

    Ok(())
}

fn pack_field_column(field: &Field, values: Vec<PerPacket>) -> Column {
    let is_array = matches!(
        field.array_shape(),
        ArrayShape::Expand | ArrayShape::SizedBy(_)
    );

    if !is_array {
        let scalars = values
            .into_iter()
            .map(|v| match v {
                PerPacket::Scalar(e) => e,
                PerPacket::Array(_) => unreachable!("scalar field produced an array value"),
            })
            .collect();
        return crate::decode::common::pack_column(field.data_type(), field.bit_length(), scalars);
    }

    let rows: Vec<Vec<ElementValue>> = values
        .into_iter()
        .map(|v| match v {
            PerPacket::Array(a) => a,
            PerPacket::Scalar(_) => unreachable!("array field produced a scalar value"),
        })
        .collect();

    match field.data_type() {
        DataType::Uint => Column::JaggedUint(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| match v {
                            ElementValue::Uint(u) => u,
                            _ => 0,
                        })
                        .collect()
                })
                .collect(),
        ),
        DataType::Int => Column::JaggedInt(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| match v {
                            ElementValue::Int(i) => i,
                            _ => 0,
                        })
                        .collect()
                })
                .collect(),
        ),
        DataType::Float => Column::JaggedFloat(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| match v {
                            ElementValue::Float(f) => f,
                            _ => 0.0,
                        })
                        .collect()
                })
                .collect(),
        ),
        DataType::Str | DataType::Fill => Column::JaggedBytes(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .flat_map(|v| match v {
                            ElementValue::Bytes(b) => b,
                            _ => Vec::new(),
                        })
                        .collect()
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::ArrayOrder;

    fn packet_with_body(body: &[u8]) -> Vec<u8> {
        let mut packet = vec![0x00, 0x0A, 0xC0, 0x00];
        let packet_length = (body.len() - 1) as u16;
        packet.extend_from_slice(&packet_length.to_be_bytes());
        packet.extend_from_slice(body);
        packet
    }

    #[test]
    fn s3_expand_consumes_remainder_with_footer() {
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
            Field::new("footer", DataType::Uint, 16).unwrap(),
        ];
        let definition = PacketDefinition::variable_length(fields).unwrap();

        // body: header(1) + 2 uint16 elements + footer(2) = 7 bytes
        let body = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x09];
        let data = packet_with_body(&body);

        let columns = decode(&definition, &data).unwrap();
        match columns.get("data").unwrap() {
            Column::JaggedUint(rows) => assert_eq!(rows, &vec![vec![2, 3]]),
            other => panic!("{other:?}"),
        }
        match columns.get("footer").unwrap() {
            Column::UInt16(v) => assert_eq!(v, &vec![9]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn s4_size_by_name_reads_count_from_earlier_field() {
        let fields = vec![
            Field::new("n1", DataType::Uint, 8).unwrap(),
            Field::array(
                "data1",
                DataType::Uint,
                16,
                ArrayShape::SizedBy("n1".to_string()),
                ArrayOrder::RowMajor,
            )
            .unwrap(),
        ];
        let definition = PacketDefinition::variable_length(fields).unwrap();

        let body = [0x02, 0x00, 0x05, 0x00, 0x06];
        let data = packet_with_body(&body);

        let columns = decode(&definition, &data).unwrap();
        match columns.get("data1").unwrap() {
            Column::JaggedUint(rows) => assert_eq!(rows, &vec![vec![5, 6]]),
            other => panic!("{other:?}"),
        }
    }
}
