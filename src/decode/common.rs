//! Bit-math shared by the fixed-length (C6) and variable-length (C7)
//! decoders: per-field byte geometry, the gather/mask/shift/byteswap/
//! sign-extend pipeline, and permutation byte order.
use crate::column::Column;
use crate::field::{promoted_storage_bytes, ByteOrder, DataType, Field};
use crate::permute;

/// Byte geometry of one field within a packet: where its bytes start in
/// the file, how many file bytes it occupies, and the storage width its
/// decoded value is promoted to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldGeometry {
    pub byte_start: usize,
    pub bytes_in_file: usize,
    pub storage_bytes: usize,
}

/// Compute a field's byte geometry from its planned bit offset and
/// declared bit length. `bit_offset` must be non-negative (callers
/// resolve negative, end-relative offsets to an absolute position
/// first).
pub(crate) fn field_geometry(bit_offset: i64, bit_length: u32) -> FieldGeometry {
    let sub_byte_offset = (bit_offset % 8) as u32;
    let bytes_in_file = ((sub_byte_offset + bit_length + 7) / 8) as usize;
    let storage_bytes = promoted_storage_bytes(bytes_in_file);
    let byte_start = (bit_offset / 8) as usize;
    FieldGeometry {
        byte_start,
        bytes_in_file,
        storage_bytes,
    }
}

/// Right-shift amount that moves a field's bits down to occupy
/// `[0, bit_length)` once its raw bytes have been read as a big-endian,
/// zero-padded `storage_bytes`-wide integer.
pub(crate) fn right_shift(bit_offset: i64, geometry: &FieldGeometry, bit_length: u32) -> i64 {
    let left_pad = bit_offset
        + 8 * (geometry.storage_bytes as i64 - geometry.bytes_in_file as i64)
        - 8 * geometry.byte_start as i64;
    8 * geometry.storage_bytes as i64 - left_pad - i64::from(bit_length)
}

pub(crate) fn bit_mask(bit_length: u32) -> u64 {
    if bit_length >= 64 {
        u64::MAX
    } else {
        (1_u64 << bit_length) - 1
    }
}

pub(crate) fn byteswap_n(value: u64, storage_bytes: usize) -> u64 {
    let bytes = value.to_be_bytes();
    let start = 8 - storage_bytes;
    let mut buf = bytes[start..].to_vec();
    buf.reverse();
    buf.iter().fold(0_u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn sign_extend(value: u64, bit_length: u32) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }
    let shift = 64 - bit_length;
    ((value << shift) as i64) >> shift
}

/// Decode one scalar element (one field, one packet) from `packet_body`,
/// given its already-resolved non-negative bit offset. `packet_body` is
/// the full byte range the offset is relative to (the packet body for
/// fixed-length decoding, or the whole packet for the header-relative /
/// footer-relative ranges of variable-length decoding).
pub(crate) fn decode_scalar_element(
    field: &Field,
    bit_offset: i64,
    packet_body: &[u8],
) -> ElementValue {
    let geometry = field_geometry(bit_offset, field.bit_length());
    let mut raw = vec![0_u8; geometry.bytes_in_file];
    // Bound the read: a field's planned end can coincide with the packet's
    // end exactly, but clamp defensively rather than trust every caller's
    // arithmetic. Any byte this would have read past the slice is always
    // masked/shifted away downstream, so zero-padding it is a no-op on the
    // decoded value.
    let available_start = geometry.byte_start.min(packet_body.len());
    let available_end = (geometry.byte_start + geometry.bytes_in_file).min(packet_body.len());
    let available = &packet_body[available_start..available_end];
    raw[..available.len()].copy_from_slice(available);

    if let ByteOrder::Permutation(_) = field.byte_order() {
        raw = permute::apply_byte_order_permutation(&raw, field.byte_order());
    }

    match field.data_type() {
        DataType::Str | DataType::Fill => ElementValue::Bytes(raw),
        DataType::Float => {
            let little = matches!(field.byte_order(), ByteOrder::Little);
            let value = if field.bit_length() == 32 {
                let bits = if little {
                    u32::from_le_bytes(raw.clone().try_into().unwrap_or([0; 4]))
                } else {
                    u32::from_be_bytes(raw.clone().try_into().unwrap_or([0; 4]))
                };
                f64::from(f32::from_bits(bits))
            } else {
                let bits = if little {
                    u64::from_le_bytes(raw.clone().try_into().unwrap_or([0; 8]))
                } else {
                    u64::from_be_bytes(raw.clone().try_into().unwrap_or([0; 8]))
                };
                f64::from_bits(bits)
            };
            ElementValue::Float(value)
        }
        DataType::Uint | DataType::Int => {
            let storage_bytes = geometry.storage_bytes;
            let padded_start = storage_bytes - geometry.bytes_in_file;
            let mut storage = vec![0_u8; storage_bytes];
            storage[padded_start..].copy_from_slice(&raw);
            let mut value = storage
                .iter()
                .fold(0_u64, |acc, &b| (acc << 8) | u64::from(b));

            let shift = right_shift(bit_offset, &geometry, field.bit_length());
            if shift > 0 {
                value >>= shift;
            }
            value &= bit_mask(field.bit_length());

            if matches!(field.byte_order(), ByteOrder::Little) {
                value = byteswap_n(value, storage_bytes);
            }

            if field.data_type() == DataType::Int {
                ElementValue::Int(sign_extend(value, field.bit_length()))
            } else {
                ElementValue::Uint(value)
            }
        }
    }
}

/// A single decoded scalar value, before it is gathered into a [`Column`].
#[derive(Debug, Clone)]
pub(crate) enum ElementValue {
    Uint(u64),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

/// Narrow a full-width [`ElementValue`] vector down to the smallest
/// [`Column`] variant that can hold `bit_length` bits, matching how the
/// original decoder picks a numpy dtype width per field.
pub(crate) fn pack_column(data_type: DataType, bit_length: u32, values: Vec<ElementValue>) -> Column {
    match data_type {
        DataType::Uint => {
            let raw: Vec<u64> = values
                .into_iter()
                .map(|v| match v {
                    ElementValue::Uint(u) => u,
                    _ => 0,
                })
                .collect();
            match promoted_storage_bytes(((bit_length + 7) / 8) as usize) {
                1 => Column::UInt8(raw.iter().map(|&v| v as u8).collect()),
                2 => Column::UInt16(raw.iter().map(|&v| v as u16).collect()),
                4 => Column::UInt32(raw.iter().map(|&v| v as u32).collect()),
                _ => Column::UInt64(raw),
            }
        }
        DataType::Int => {
            let raw: Vec<i64> = values
                .into_iter()
                .map(|v| match v {
                    ElementValue::Int(i) => i,
                    _ => 0,
                })
                .collect();
            match promoted_storage_bytes(((bit_length + 7) / 8) as usize) {
                1 => Column::Int8(raw.iter().map(|&v| v as i8).collect()),
                2 => Column::Int16(raw.iter().map(|&v| v as i16).collect()),
                4 => Column::Int32(raw.iter().map(|&v| v as i32).collect()),
                _ => Column::Int64(raw),
            }
        }
        DataType::Float => {
            let raw: Vec<f64> = values
                .into_iter()
                .map(|v| match v {
                    ElementValue::Float(f) => f,
                    _ => 0.0,
                })
                .collect();
            if bit_length == 32 {
                Column::Float32(raw.iter().map(|&v| v as f32).collect())
            } else {
                Column::Float64(raw)
            }
        }
        DataType::Str | DataType::Fill => {
            let raw: Vec<Vec<u8>> = values
                .into_iter()
                .map(|v| match v {
                    ElementValue::Bytes(b) => b,
                    _ => Vec::new(),
                })
                .collect();
            Column::Bytes(raw)
        }
    }
}
