//! Fixed-length columnar decoder (C6): every packet in the stream shares
//! one body layout, decoded field-by-field across every packet at once.
use crate::column::ColumnSet;
use crate::decode::common::{decode_scalar_element, pack_column};
use crate::error::{DecodeError, Result};
use crate::field::{Field, PacketDefinition, PacketKind};
use crate::header::{get_packet_total_bytes, PRIMARY_HEADER_NUM_BYTES};
use crate::offset;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Decode every packet in `data` against `definition`, one column per
/// field, one row per packet.
///
/// # Errors
/// Returns [`DecodeError::Truncation`] if `data` is shorter than one
/// packet, or a layout error if the offset planner cannot fit the
/// field list into the packet's declared length.
///
/// # Panics
/// Panics if `definition.kind() != PacketKind::FixedLength` (callers are
/// expected to have already branched on [`PacketDefinition::kind`]).
pub fn decode(definition: &PacketDefinition, data: &[u8]) -> Result<ColumnSet> {
    assert_eq!(definition.kind(), PacketKind::FixedLength);
    let fields = definition.fields();

    if data.len() < PRIMARY_HEADER_NUM_BYTES {
        return Err(DecodeError::Truncation {
            missing: PRIMARY_HEADER_NUM_BYTES - data.len(),
        });
    }
    let packet_nbytes = get_packet_total_bytes(&data[..PRIMARY_HEADER_NUM_BYTES])?;
    if packet_nbytes == 0 {
        return Err(DecodeError::HeaderError("packet length is zero".to_string()));
    }

    let packet_count = data.len() / packet_nbytes;
    if packet_count == 0 {
        return Err(DecodeError::Truncation {
            missing: packet_nbytes - data.len(),
        });
    }
    let used = packet_count * packet_nbytes;

    let offsets = offset::plan_fixed(fields, (packet_nbytes * 8) as i64)?;

    let mut columns = ColumnSet::new();
    for (field, &bit_offset) in fields.iter().zip(offsets.iter()) {
        let column = decode_field(field, bit_offset, &data[..used], packet_nbytes, packet_count);
        columns.insert(field.name(), column);
    }

    Ok(columns)
}

#[cfg(not(feature = "parallel"))]
fn decode_field(
    field: &Field,
    bit_offset: i64,
    data: &[u8],
    packet_nbytes: usize,
    packet_count: usize,
) -> crate::column::Column {
    let values = (0..packet_count)
        .map(|i| {
            let body = &data[i * packet_nbytes..(i + 1) * packet_nbytes];
            decode_scalar_element(field, bit_offset, body)
        })
        .collect();
    pack_column(field.data_type(), field.bit_length(), values)
}

#[cfg(feature = "parallel")]
fn decode_field(
    field: &Field,
    bit_offset: i64,
    data: &[u8],
    packet_nbytes: usize,
    packet_count: usize,
) -> crate::column::Column {
    let values = (0..packet_count)
        .into_par_iter()
        .map(|i| {
            let body = &data[i * packet_nbytes..(i + 1) * packet_nbytes];
            decode_scalar_element(field, bit_offset, body)
        })
        .collect();
    pack_column(field.data_type(), field.bit_length(), values)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::DataType;

    #[test]
    fn s1_minimal_fixed_packet_decodes_two_rows() {
        // primary header (48 bits) + u16 A, u16 B, u32 C (64-bit body)
        let fields = vec![
            Field::new("A", DataType::Uint, 16).unwrap(),
            Field::new("B", DataType::Uint, 16).unwrap(),
            Field::new("C", DataType::Uint, 32).unwrap(),
        ];
        let definition = PacketDefinition::fixed_length(fields).unwrap();

        let mut packet = vec![0x00, 0x0A, 0xC0, 0x00, 0x00, 0x07];
        packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03]);
        let data: Vec<u8> = packet.iter().cycle().take(packet.len() * 2).copied().collect();

        let columns = decode(&definition, &data).unwrap();
        assert_eq!(columns.get("A").unwrap().len(), 2);
        match columns.get("C").unwrap() {
            crate::column::Column::UInt32(v) => assert_eq!(v, &vec![3, 3]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let definition = PacketDefinition::fixed_length(vec![Field::new("A", DataType::Uint, 16).unwrap()]).unwrap();
        assert!(decode(&definition, &[0; 3]).is_err());
    }
}
