//! CCSDS Space Packet primary header codec (C1).
//!
//! Layout, MSB-first, exactly 48 bits / 6 bytes:
//!
//! ```text
//!  byte:  0        1        2        3        4        5
//!  bits:  VVVT S AAAAAAAAAAA  FF CCCCCCCCCCCCCC  LLLLLLLLLLLLLLLL
//! ```
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{DecodeError, Result};

/// Number of bytes in every CCSDS primary header.
pub const PRIMARY_HEADER_NUM_BYTES: usize = 6;

/// Number of bits in a byte.
pub const BITS_PER_BYTE: usize = 8;

/// CCSDS Space Packet primary header, defined in CCSDS 133.0-B.
///
/// The packet length field is omitted here and computed from the body at
/// encode time, matching the teacher's `PrimaryHeader` convention of never
/// storing a value that's derivable from the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimaryHeader {
    /// CCSDS version number (3 bits).
    pub version: u8,
    /// Packet type: 0 = telemetry, 1 = command (1 bit).
    pub packet_type: u8,
    /// Secondary header flag (1 bit).
    pub secondary_flag: bool,
    /// Application Process Identifier (11 bits).
    pub apid: u16,
    /// Sequence flags (2 bits).
    pub sequence_flag: u8,
    /// Sequence count or packet name (14 bits).
    pub sequence_count: u16,
}

impl PrimaryHeader {
    /// Parse a primary header from exactly 6 bytes.
    ///
    /// # Errors
    /// Returns [`DecodeError::HeaderError`] if `bytes.len() != 6`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIMARY_HEADER_NUM_BYTES {
            return Err(DecodeError::HeaderError(format!(
                "expected {PRIMARY_HEADER_NUM_BYTES} bytes, found {}",
                bytes.len()
            )));
        }

        let mut cursor = bytes;
        let header0 = cursor.read_u16::<BigEndian>()?;
        let header1 = cursor.read_u16::<BigEndian>()?;

        Ok(Self {
            version: ((header0 & 0xE000) >> 13) as u8,
            packet_type: ((header0 & 0x1000) >> 12) as u8,
            secondary_flag: (header0 & 0x0800) != 0,
            apid: header0 & 0x07FF,
            sequence_flag: ((header1 & 0xC000) >> 14) as u8,
            sequence_count: header1 & 0x3FFF,
        })
    }

    /// Parse a primary header directly from a reader, leaving the cursor
    /// positioned right after the header.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0_u8; PRIMARY_HEADER_NUM_BYTES];
        reader.read_exact(&mut buf)?;
        Self::parse(&buf)
    }

    /// Serialise the version/type/secondary/APID/sequence fields to their
    /// 4-byte wire layout. The packet-length field is appended separately
    /// by callers once the body length is known (see [`crate::encode`]).
    pub fn encode_prefix(&self) -> [u8; 4] {
        let header0 = (u16::from(self.version) & 0x7) << 13
            | (u16::from(self.packet_type) & 0x1) << 12
            | (u16::from(self.secondary_flag) << 11)
            | (self.apid & 0x07FF);
        let header1 = (u16::from(self.sequence_flag) & 0x3) << 14 | (self.sequence_count & 0x3FFF);

        let mut out = [0_u8; 4];
        out[0..2].copy_from_slice(&header0.to_be_bytes());
        out[2..4].copy_from_slice(&header1.to_be_bytes());
        out
    }
}

/// Per-packet primary-header values supplied by the caller to
/// [`crate::encode::encode_fixed`] / [`crate::encode::encode_variable`].
/// The packet-length field is never here: C10 always computes it from
/// the encoded body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    pub version: Vec<u8>,
    pub packet_type: Vec<u8>,
    pub secondary_flag: Vec<bool>,
    pub apid: Vec<u16>,
    pub sequence_flag: Vec<u8>,
    pub sequence_count: Vec<u16>,
}

impl HeaderFields {
    /// Number of packets this header set describes, or `None` if its
    /// per-field vectors disagree on length.
    pub fn len(&self) -> Option<usize> {
        let n = self.version.len();
        let all_same = [
            self.packet_type.len(),
            self.secondary_flag.len(),
            self.apid.len(),
            self.sequence_flag.len(),
            self.sequence_count.len(),
        ]
        .iter()
        .all(|&l| l == n);
        all_same.then_some(n)
    }

    pub fn is_empty(&self) -> bool {
        self.len().unwrap_or(0) == 0
    }

    pub(crate) fn primary_header(&self, k: usize) -> PrimaryHeader {
        PrimaryHeader {
            version: self.version[k],
            packet_type: self.packet_type[k],
            secondary_flag: self.secondary_flag[k],
            apid: self.apid[k],
            sequence_flag: self.sequence_flag[k],
            sequence_count: self.sequence_count[k],
        }
    }
}

/// Extract the APID from the first 6 bytes of a packet without fully
/// parsing the primary header.
pub fn get_packet_apid(header_bytes: &[u8]) -> Result<u16> {
    if header_bytes.len() != PRIMARY_HEADER_NUM_BYTES {
        return Err(DecodeError::HeaderError(format!(
            "expected {PRIMARY_HEADER_NUM_BYTES} bytes, found {}",
            header_bytes.len()
        )));
    }
    Ok(((u16::from(header_bytes[0]) << 8) | u16::from(header_bytes[1])) & 0x07FF)
}

/// Compute the total packet length in bytes (header + body) from the first
/// 6 bytes of a packet.
pub fn get_packet_total_bytes(header_bytes: &[u8]) -> Result<usize> {
    if header_bytes.len() != PRIMARY_HEADER_NUM_BYTES {
        return Err(DecodeError::HeaderError(format!(
            "expected {PRIMARY_HEADER_NUM_BYTES} bytes, found {}",
            header_bytes.len()
        )));
    }
    let packet_length =
        (u16::from(header_bytes[4]) << 8) | u16::from(header_bytes[5]);
    Ok(packet_length as usize + 1 + PRIMARY_HEADER_NUM_BYTES)
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1, true, 2042, 3, 16355)]
    #[case(0, 0, false, 10, 0, 0)]
    fn header_roundtrip(
        #[case] version: u8,
        #[case] packet_type: u8,
        #[case] secondary_flag: bool,
        #[case] apid: u16,
        #[case] sequence_flag: u8,
        #[case] sequence_count: u16,
    ) {
        let header = PrimaryHeader {
            version,
            packet_type,
            secondary_flag,
            apid,
            sequence_flag,
            sequence_count,
        };

        let mut bytes = header.encode_prefix().to_vec();
        bytes.extend_from_slice(&0_u16.to_be_bytes());

        let recovered = PrimaryHeader::parse(&bytes).unwrap();
        assert_eq!(header, recovered);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(PrimaryHeader::parse(&[0; 5]).is_err());
        assert!(PrimaryHeader::parse(&[0; 7]).is_err());
    }

    #[test]
    fn header_fields_rejects_mismatched_lengths() {
        let mut header = HeaderFields::default();
        header.version = vec![0, 0];
        header.packet_type = vec![0];
        header.secondary_flag = vec![false, false];
        header.apid = vec![1, 1];
        header.sequence_flag = vec![3, 3];
        header.sequence_count = vec![0, 1];
        assert_eq!(header.len(), None);
    }

    #[test]
    fn s1_minimal_fixed_packet_header() {
        // S1: APID=10, packet_length=7
        let bytes = [0x00, 0x0A, 0xC0, 0x00, 0x00, 0x07];
        let header = PrimaryHeader::parse(&bytes).unwrap();
        assert_eq!(header.apid, 10);
        assert_eq!(get_packet_apid(&bytes).unwrap(), 10);
        assert_eq!(get_packet_total_bytes(&bytes).unwrap(), 14);
    }
}
