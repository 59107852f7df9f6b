//! Packet stream iteration and splitting (C2): walking a byte stream
//! packet-by-packet via the primary header's length field, counting
//! packets, and splitting by APID.
use std::collections::HashMap;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{DecodeError, Result};
use crate::header::{get_packet_apid, get_packet_total_bytes, PRIMARY_HEADER_NUM_BYTES};

/// Yield each packet's byte slice in `data`, in stream order. Stops at
/// the last packet that fits entirely within `data`; a trailing partial
/// packet is reported through `diagnostics` rather than treated as fatal.
/// When `include_primary_header` is `false`, each yielded slice starts
/// right after the 6-byte primary header.
pub fn iter_packet_bytes<'a>(
    data: &'a [u8],
    include_primary_header: bool,
    diagnostics: &mut Diagnostics,
) -> impl Iterator<Item = &'a [u8]> {
    let mut packets = Vec::new();
    let mut offset = 0_usize;

    while offset + PRIMARY_HEADER_NUM_BYTES <= data.len() {
        let header = &data[offset..offset + PRIMARY_HEADER_NUM_BYTES];
        let total = match get_packet_total_bytes(header) {
            Ok(total) => total,
            Err(_) => break,
        };
        if offset + total > data.len() {
            diagnostics.push(Warning::Truncation {
                missing: offset + total - data.len(),
            });
            break;
        }
        let start = if include_primary_header {
            offset
        } else {
            offset + PRIMARY_HEADER_NUM_BYTES
        };
        packets.push(&data[start..offset + total]);
        offset += total;
    }

    packets.into_iter()
}

/// Split `data` into its raw byte segments, one per packet, stopping at
/// the first incomplete trailing packet.
pub fn split_packet_bytes(data: &[u8], include_primary_header: bool, diagnostics: &mut Diagnostics) -> Vec<Vec<u8>> {
    iter_packet_bytes(data, include_primary_header, diagnostics)
        .map(<[u8]>::to_vec)
        .collect()
}

/// Count complete packets in `data`.
///
/// `missing_bytes` is non-zero only when a complete primary header was
/// read but its body could not be (the classic truncated-stream case).
/// `extra_bytes` is the length of whatever is left after the last
/// complete packet: zero, a fragmentary header (`< 6` bytes), or a
/// complete header whose body is incomplete (in which case
/// `extra_bytes >= missing_bytes`, since it also counts the header and
/// whatever partial body bytes did arrive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketCount {
    pub num_packets: usize,
    pub missing_bytes: usize,
    pub extra_bytes: usize,
}

/// Count how many complete packets `data` contains, without decoding
/// them.
pub fn count_packets(data: &[u8]) -> PacketCount {
    let mut offset = 0_usize;
    let mut num_packets = 0_usize;
    let mut missing_bytes = 0_usize;

    while offset + PRIMARY_HEADER_NUM_BYTES <= data.len() {
        let header = &data[offset..offset + PRIMARY_HEADER_NUM_BYTES];
        let total = match get_packet_total_bytes(header) {
            Ok(total) => total,
            Err(_) => break,
        };
        if offset + total > data.len() {
            missing_bytes = offset + total - data.len();
            break;
        }
        offset += total;
        num_packets += 1;
    }

    PacketCount {
        num_packets,
        missing_bytes,
        extra_bytes: data.len() - offset,
    }
}

/// Split `data` by APID, returning each APID's concatenated packet bytes
/// in first-seen order. A packet whose APID is not in `valid_apids` (when
/// given) is still appended to its APID's stream; only a
/// [`Warning::UnknownApid`] is reported for it.
pub fn split_by_apid(
    data: &[u8],
    valid_apids: Option<&[u16]>,
    diagnostics: &mut Diagnostics,
) -> Result<HashMap<u16, Vec<u8>>> {
    let mut by_apid: HashMap<u16, Vec<u8>> = HashMap::new();
    let mut offset = 0_usize;

    while offset + PRIMARY_HEADER_NUM_BYTES <= data.len() {
        let header = &data[offset..offset + PRIMARY_HEADER_NUM_BYTES];
        let apid = get_packet_apid(header)?;
        let total = get_packet_total_bytes(header)?;
        if offset + total > data.len() {
            diagnostics.push(Warning::Truncation {
                missing: offset + total - data.len(),
            });
            break;
        }

        if let Some(valid) = valid_apids {
            if !valid.contains(&apid) {
                diagnostics.push(Warning::UnknownApid { apid, offset });
            }
        }

        by_apid
            .entry(apid)
            .or_default()
            .extend_from_slice(&data[offset..offset + total]);
        offset += total;
    }

    Ok(by_apid)
}

/// Decoded primary-header pseudo-fields for every packet in `data`, built
/// the same way a synthetic expand-byte variable-length definition would:
/// this only needs the 6-byte header, so it tolerates packets with bodies
/// this crate has no definition for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryHeaderColumns {
    pub version: Vec<u8>,
    pub packet_type: Vec<u8>,
    pub secondary_flag: Vec<bool>,
    pub apid: Vec<u16>,
    pub sequence_flag: Vec<u8>,
    pub sequence_count: Vec<u16>,
}

/// Decode just the primary header of every packet in `data`, without
/// requiring a body definition at all.
///
/// # Errors
/// Returns [`DecodeError::Truncation`] if a trailing packet's header
/// cannot be read.
pub fn read_primary_headers(data: &[u8]) -> Result<PrimaryHeaderColumns> {
    let mut out = PrimaryHeaderColumns {
        version: Vec::new(),
        packet_type: Vec::new(),
        secondary_flag: Vec::new(),
        apid: Vec::new(),
        sequence_flag: Vec::new(),
        sequence_count: Vec::new(),
    };

    let mut offset = 0_usize;
    while offset + PRIMARY_HEADER_NUM_BYTES <= data.len() {
        let header_bytes = &data[offset..offset + PRIMARY_HEADER_NUM_BYTES];
        let header = crate::header::PrimaryHeader::parse(header_bytes)?;
        let total = get_packet_total_bytes(header_bytes)?;
        if offset + total > data.len() {
            return Err(DecodeError::Truncation {
                missing: offset + total - data.len(),
            });
        }

        out.version.push(header.version);
        out.packet_type.push(header.packet_type);
        out.secondary_flag.push(header.secondary_flag);
        out.apid.push(header.apid);
        out.sequence_flag.push(header.sequence_flag);
        out.sequence_count.push(header.sequence_count);

        offset += total;
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    fn packet(apid: u16, body_len: u16) -> Vec<u8> {
        let mut packet = vec![0x00, 0x00, 0xC0, 0x00];
        packet[0] = (apid >> 8) as u8;
        packet[1] = (apid & 0xFF) as u8;
        packet.extend_from_slice(&body_len.to_be_bytes());
        packet.extend(std::iter::repeat(0xAA).take(body_len as usize + 1));
        packet
    }

    #[test]
    fn fragmentary_trailing_header_is_extra_not_missing() {
        let mut data = packet(1, 3);
        data.extend(packet(2, 3));
        data.push(0xFF); // trailing partial header, < 6 bytes

        let count = count_packets(&data);
        assert_eq!(count.num_packets, 2);
        assert_eq!(count.missing_bytes, 0);
        assert_eq!(count.extra_bytes, 1);
    }

    #[test]
    fn complete_header_with_incomplete_body_reports_missing() {
        let mut data = packet(1, 3);
        let mut trailing = packet(2, 10); // full 6-byte header + 11-byte body
        trailing.truncate(6 + 4); // keep the header plus 4 of the 11 body bytes
        data.extend(trailing);

        let count = count_packets(&data);
        assert_eq!(count.num_packets, 1);
        assert_eq!(count.missing_bytes, 7);
        assert_eq!(count.extra_bytes, 10);
    }

    #[test]
    fn splits_by_apid_warns_but_still_records_unknown_apid() {
        let mut data = packet(1, 3);
        data.extend(packet(2, 3));
        let mut diagnostics = Diagnostics::new();

        let split = split_by_apid(&data, Some(&[1]), &mut diagnostics).unwrap();
        assert_eq!(split.len(), 2);
        assert!(split.contains_key(&1));
        assert!(split.contains_key(&2));
        assert_eq!(split[&2], packet(2, 3));
        assert!(diagnostics
            .warnings()
            .contains(&Warning::UnknownApid { apid: 2, offset: packet(1, 3).len() }));
    }

    #[test]
    fn reads_primary_headers_without_a_body_definition() {
        let mut data = packet(42, 3);
        data.extend(packet(43, 3));
        let headers = read_primary_headers(&data).unwrap();
        assert_eq!(headers.apid, vec![42, 43]);
    }
}
