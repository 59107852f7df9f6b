//! High-level packet definition API: ties together array expansion (C4),
//! offset planning (C5), decoding (C6/C7), array collapse (C4), the
//! converter pipeline (C9), and primary-header anomaly diagnostics
//! (inspecting `CCSDS_SEQUENCE_COUNT`/`CCSDS_APID` once decoded) into the
//! single `load()` call most callers use.
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use crate::column::ColumnSet;
use crate::convert::{self, Binding};
use crate::decode;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{ConversionError, DecodeError, Result};
use crate::expand::{self, ExpandLedger};
use crate::field::{primary_header_fields, Field, PacketDefinition, PacketKind, PRIMARY_HEADER_FIELD_NAMES};
use crate::iter;

/// A packet definition together with its converter bindings: the unit a
/// caller builds once and reuses across many `load()` calls.
pub struct PacketSpec {
    kind: PacketKind,
    fields: Vec<Field>,
    bindings: Vec<Binding>,
}

/// Result of a [`PacketSpec::load`] call.
pub struct LoadOutcome {
    pub columns: ColumnSet,
    pub diagnostics: Diagnostics,
}

impl PacketSpec {
    /// Build a fixed-length packet spec from user fields (no primary
    /// header pseudo-fields; `load` prepends/removes them per call).
    ///
    /// # Errors
    /// Returns [`DecodeError::DefinitionError`] if `fields` contains an
    /// `expand` or size-by-name array.
    pub fn fixed_length(fields: Vec<Field>) -> Result<Self> {
        PacketDefinition::fixed_length(fields.clone())?;
        Ok(Self {
            kind: PacketKind::FixedLength,
            fields,
            bindings: Vec::new(),
        })
    }

    /// Build a variable-length packet spec from user fields.
    ///
    /// # Errors
    /// Returns [`DecodeError::DefinitionError`] if `fields` has more than
    /// one `expand` array, an out-of-order size-by-name reference, or an
    /// explicit `bit_offset`.
    pub fn variable_length(fields: Vec<Field>) -> Result<Self> {
        PacketDefinition::variable_length(fields.clone())?;
        Ok(Self {
            kind: PacketKind::VariableLength,
            fields,
            bindings: Vec::new(),
        })
    }

    /// Append a converter binding, run in the order added during `load`.
    pub fn add_converter(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }

    /// Decode `data` against this spec.
    ///
    /// Always decodes the primary header internally (needed for
    /// `include_primary_header` and the sequence/APID diagnostics below);
    /// `include_primary_header` only controls whether the seven
    /// `CCSDS_*` pseudo-field columns are kept in the returned
    /// [`ColumnSet`]. A trailing incomplete packet is reported as a
    /// [`Warning::Truncation`] rather than a fatal error, as long as at
    /// least one complete packet was decoded.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if the stream contains no complete
    /// packets, or [`ConversionError`] (wrapped) if a converter binding
    /// fails.
    pub fn load(
        &self,
        data: &[u8],
        include_primary_header: bool,
        valid_apids: Option<&[u16]>,
    ) -> Result<LoadOutcome> {
        let mut diagnostics = Diagnostics::new();

        let count = iter::count_packets(data);
        if count.num_packets == 0 {
            return Err(DecodeError::Truncation {
                missing: count.missing_bytes,
            });
        }
        if count.extra_bytes > 0 {
            diagnostics.push(Warning::Truncation {
                missing: count.missing_bytes,
            });
        }
        let usable = &data[..data.len() - count.extra_bytes];

        let (expanded_fields, ledger): (Vec<Field>, ExpandLedger) = expand::expand_array_fields(&self.fields);

        // The body fields were already validated by PacketSpec::fixed_length /
        // variable_length at construction time; re-running that check here
        // would wrongly reject the header pseudo-fields' explicit offsets
        // under the variable-length "no explicit bit_offset" rule.
        let mut all_fields = primary_header_fields();
        all_fields.extend(expanded_fields);
        let definition = PacketDefinition::assemble(self.kind, all_fields);

        let mut columns = decode::decode(&definition, usable)?;

        inspect_primary_header(&columns, valid_apids, &mut diagnostics);

        expand::collapse_array_fields(&mut columns, &ledger);

        convert::apply_converters(&mut columns, &self.bindings)
            .map_err(conversion_as_decode_error)?;

        if !include_primary_header {
            for name in PRIMARY_HEADER_FIELD_NAMES {
                columns.remove(name);
            }
        }

        Ok(LoadOutcome {
            columns,
            diagnostics,
        })
    }

    /// Like [`PacketSpec::load`], but reads its input from a stream rather
    /// than an in-memory buffer, reading it to end first (per §5, the core
    /// only suspends at this I/O boundary). When `reset_file_obj` is set,
    /// the stream's position is restored to where it started once decoding
    /// finishes, win or lose, matching the `reset_file_obj` caller option.
    ///
    /// # Errors
    /// Returns [`DecodeError::Io`] if the stream cannot be read (or, with
    /// `reset_file_obj`, if seeking back afterwards fails), otherwise the
    /// same errors as [`PacketSpec::load`].
    pub fn load_reader<R: Read + Seek>(
        &self,
        reader: &mut R,
        include_primary_header: bool,
        valid_apids: Option<&[u16]>,
        reset_file_obj: bool,
    ) -> Result<LoadOutcome> {
        let start = reset_file_obj.then(|| reader.stream_position()).transpose()?;

        let mut data = Vec::new();
        let read_result = reader.read_to_end(&mut data).map_err(DecodeError::from);

        if let Some(start) = start {
            reader.seek(SeekFrom::Start(start))?;
        }
        read_result?;

        self.load(&data, include_primary_header, valid_apids)
    }
}

fn conversion_as_decode_error(error: ConversionError) -> DecodeError {
    DecodeError::EncodingError(error.to_string())
}

/// Check decoded `CCSDS_SEQUENCE_COUNT`/`CCSDS_APID` columns for gaps,
/// out-of-order sequence counts, and multiple APIDs in a single stream,
/// pushing a [`Warning`] for each anomaly found.
fn inspect_primary_header(columns: &ColumnSet, valid_apids: Option<&[u16]>, diagnostics: &mut Diagnostics) {
    let sequence_counts = match columns.get("CCSDS_SEQUENCE_COUNT") {
        Some(crate::column::Column::UInt16(v)) => v.clone(),
        _ => Vec::new(),
    };
    let apids = match columns.get("CCSDS_APID") {
        Some(crate::column::Column::UInt16(v)) => v.clone(),
        _ => Vec::new(),
    };

    if sequence_counts.windows(2).any(|w| w[1] < w[0]) {
        diagnostics.push(Warning::SequenceOutOfOrder);
    }

    if let (Some(&min), Some(&max)) = (sequence_counts.iter().min(), sequence_counts.iter().max()) {
        let seen: HashSet<u16> = sequence_counts.iter().copied().collect();
        let missing: Vec<u16> = (min..=max).filter(|v| !seen.contains(v)).collect();
        if !missing.is_empty() {
            diagnostics.push(Warning::SequenceGap { missing });
        }
    }

    let mut distinct: Vec<u16> = Vec::new();
    for apid in &apids {
        if !distinct.contains(apid) {
            distinct.push(*apid);
        }
    }
    if distinct.len() > 1 {
        diagnostics.push(Warning::MultipleApids { apids: distinct });
    }

    if let Some(valid) = valid_apids {
        for &apid in &apids {
            if !valid.contains(&apid) {
                diagnostics.push(Warning::UnknownApid { apid, offset: 0 });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::DataType;
    use std::io::Cursor;

    fn two_packets() -> Vec<u8> {
        let mut packet = vec![0x00, 0x0A, 0xC0, 0x00, 0x00, 0x07];
        packet.extend_from_slice(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03]);
        let mut second = packet.clone();
        second[5] = 0x07;
        second[11] = 0x04;
        let mut data = packet;
        data.extend(second);
        data
    }

    #[test]
    fn loads_fixed_length_without_header_columns_by_default() {
        let fields = vec![
            Field::new("A", DataType::Uint, 16).unwrap(),
            Field::new("B", DataType::Uint, 16).unwrap(),
            Field::new("C", DataType::Uint, 32).unwrap(),
        ];
        let spec = PacketSpec::fixed_length(fields).unwrap();
        let outcome = spec.load(&two_packets(), false, None).unwrap();
        assert!(outcome.columns.get("CCSDS_APID").is_none());
        assert_eq!(outcome.columns.get("A").unwrap().len(), 2);
    }

    #[test]
    fn keeps_header_columns_when_requested() {
        let fields = vec![
            Field::new("A", DataType::Uint, 16).unwrap(),
            Field::new("B", DataType::Uint, 16).unwrap(),
            Field::new("C", DataType::Uint, 32).unwrap(),
        ];
        let spec = PacketSpec::fixed_length(fields).unwrap();
        let outcome = spec.load(&two_packets(), true, None).unwrap();
        match outcome.columns.get("CCSDS_APID").unwrap() {
            crate::column::Column::UInt16(v) => assert_eq!(v, &vec![10, 10]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn load_reader_restores_stream_position_when_requested() {
        let fields = vec![
            Field::new("A", DataType::Uint, 16).unwrap(),
            Field::new("B", DataType::Uint, 16).unwrap(),
            Field::new("C", DataType::Uint, 32).unwrap(),
        ];
        let spec = PacketSpec::fixed_length(fields).unwrap();
        let mut cursor = Cursor::new(two_packets());
        cursor.set_position(3);

        let outcome = spec.load_reader(&mut cursor, false, None, true).unwrap();
        assert_eq!(outcome.columns.get("A").unwrap().len(), 2);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn load_reader_leaves_stream_at_end_by_default() {
        let fields = vec![
            Field::new("A", DataType::Uint, 16).unwrap(),
            Field::new("B", DataType::Uint, 16).unwrap(),
            Field::new("C", DataType::Uint, 32).unwrap(),
        ];
        let spec = PacketSpec::fixed_length(fields).unwrap();
        let data = two_packets();
        let total_len = data.len() as u64;
        let mut cursor = Cursor::new(data);

        spec.load_reader(&mut cursor, false, None, false).unwrap();
        assert_eq!(cursor.position(), total_len);
    }

    #[test]
    fn loads_variable_length_with_expand_array() {
        use crate::field::{ArrayOrder, ArrayShape};

        let fields = vec![
            Field::new("n", DataType::Uint, 8).unwrap(),
            Field::array(
                "data",
                DataType::Uint,
                16,
                ArrayShape::Expand,
                ArrayOrder::RowMajor,
            )
            .unwrap(),
        ];
        let spec = PacketSpec::variable_length(fields).unwrap();

        // one packet: CCSDS header (APID 10, packet_length=2 => 3-byte body)
        // + n=1 + one uint16 element
        let mut data = vec![0x00, 0x0A, 0xC0, 0x00, 0x00, 0x02];
        data.extend_from_slice(&[0x01, 0x00, 0x2A]);

        let outcome = spec.load(&data, true, None).unwrap();
        match outcome.columns.get("CCSDS_APID").unwrap() {
            crate::column::Column::UInt16(v) => assert_eq!(v, &vec![10]),
            other => panic!("{other:?}"),
        }
        match outcome.columns.get("data").unwrap() {
            crate::column::Column::JaggedUint(rows) => assert_eq!(rows, &vec![vec![0x2A]]),
            other => panic!("{other:?}"),
        }
    }
}
