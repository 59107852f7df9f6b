//! CCSDS Space Packet telemetry decoder.
//!
//! A packet definition (the ordered [`field::Field`] list describing one
//! APID's body layout) plus an optional chain of [`convert::Binding`]s is
//! all a caller needs to turn a raw byte stream into a [`column::ColumnSet`]:
//!
//! ```no_run
//! use ccsds_telemetry::field::{DataType, Field};
//! use ccsds_telemetry::packet::PacketSpec;
//!
//! let fields = vec![
//!     Field::new("VOLTAGE", DataType::Uint, 16).unwrap(),
//!     Field::new("TEMPERATURE", DataType::Int, 16).unwrap(),
//! ];
//! let spec = PacketSpec::fixed_length(fields).unwrap();
//! let data: Vec<u8> = std::fs::read("telemetry.tlm").unwrap_or_default();
//! let outcome = spec.load(&data, false, None).unwrap();
//! let _ = outcome.columns;
//! ```
//!
//! [`packet::PacketSpec`] is the entry point most callers want: it wires
//! together array expansion (C4), offset planning (C5), decoding (C6/C7),
//! array collapse, the converter pipeline (C9), and primary-header anomaly
//! diagnostics into one `load()` call. The lower-level building blocks
//! (C1-C10) are exposed as their own modules for callers who need finer
//! control, and as the flat free functions below for parity with the
//! distilled public operation list.
pub mod column;
pub mod convert;
pub mod csv_def;
pub mod decode;
pub mod diagnostics;
pub mod encode;
pub mod error;
pub mod expand;
pub mod field;
pub mod header;
pub mod iter;
pub mod offset;
pub mod packet;
pub mod permute;

use std::collections::HashMap;

pub use column::{Column, ColumnSet};
pub use convert::{Binding, Converter};
pub use diagnostics::{Diagnostics, Warning};
pub use error::{ConversionError, DecodeError, Result};
pub use field::{ArrayOrder, ArrayShape, ByteOrder, DataType, Field, PacketDefinition, PacketKind};
pub use header::{HeaderFields, PrimaryHeader};
pub use iter::{PacketCount, PrimaryHeaderColumns};
pub use packet::{LoadOutcome, PacketSpec};

/// Decode every packet in `data` against a fixed-length `definition`.
///
/// # Errors
/// See [`decode::fixed::decode`].
pub fn decode_fixed(definition: &PacketDefinition, data: &[u8]) -> Result<ColumnSet> {
    decode::fixed::decode(definition, data)
}

/// Decode every packet in `data` against a variable-length `definition`.
///
/// # Errors
/// See [`decode::variable::decode`].
pub fn decode_variable(definition: &PacketDefinition, data: &[u8]) -> Result<ColumnSet> {
    decode::variable::decode(definition, data)
}

/// Encode `columns` against a fixed-length `definition`, using `header`
/// for each packet's primary-header values.
///
/// # Errors
/// See [`encode::encode_fixed`].
pub fn encode_fixed(definition: &PacketDefinition, header: &HeaderFields, columns: &ColumnSet) -> Result<Vec<u8>> {
    encode::encode_fixed(definition.fields(), header, columns)
}

/// Encode `columns` against a variable-length `definition`, using `header`
/// for each packet's primary-header values.
///
/// # Errors
/// See [`encode::encode_variable`].
pub fn encode_variable(
    definition: &PacketDefinition,
    header: &HeaderFields,
    columns: &ColumnSet,
) -> Result<Vec<u8>> {
    encode::encode_variable(definition.fields(), header, columns)
}

/// Split `data` by APID, without decoding any bodies.
///
/// # Errors
/// See [`iter::split_by_apid`].
pub fn split_by_apid(
    data: &[u8],
    valid_apids: Option<&[u16]>,
    diagnostics: &mut Diagnostics,
) -> Result<HashMap<u16, Vec<u8>>> {
    iter::split_by_apid(data, valid_apids, diagnostics)
}

/// Count complete packets in `data`. See [`iter::PacketCount`] for the
/// distinction between `missing_bytes` and `extra_bytes`.
pub fn count_packets(data: &[u8]) -> PacketCount {
    iter::count_packets(data)
}

/// Yield each packet's byte slice in `data`, in stream order.
pub fn iter_packet_bytes<'a>(
    data: &'a [u8],
    include_primary_header: bool,
    diagnostics: &mut Diagnostics,
) -> impl Iterator<Item = &'a [u8]> {
    iter::iter_packet_bytes(data, include_primary_header, diagnostics)
}

/// Decode just the primary header of every packet in `data`.
///
/// # Errors
/// See [`iter::read_primary_headers`].
pub fn read_primary_headers(data: &[u8]) -> Result<PrimaryHeaderColumns> {
    iter::read_primary_headers(data)
}
