//! Packet body decoders: fixed-length columnar gather (C6) and
//! variable-length per-packet walk (C7).
pub(crate) mod common;
pub mod fixed;
pub mod variable;

use crate::column::ColumnSet;
use crate::error::Result;
use crate::field::{PacketDefinition, PacketKind};

/// Decode every packet in `data` against `definition`, dispatching to the
/// fixed- or variable-length decoder by [`PacketKind`].
pub fn decode(definition: &PacketDefinition, data: &[u8]) -> Result<ColumnSet> {
    match definition.kind() {
        PacketKind::FixedLength => fixed::decode(definition, data),
        PacketKind::VariableLength => variable::decode(definition, data),
    }
}
