//! Offset planner (C5): computes each field's starting bit under the
//! implicit-packing / explicit-override / backtrack / expand rules of the
//! spec, independent of the decoder that will use the result.
use crate::error::{DecodeError, Result};
use crate::field::{ArrayShape, Field};

/// Per-field bit offset plan for a [`crate::field::PacketKind::FixedLength`]
/// definition, indexed the same as the input field slice.
///
/// Anchors the declared body to the packet tail when every field is
/// implicit (so preceding bits belong to the header); otherwise anchors to
/// offset 0 once the first explicit field appears.
pub fn plan_fixed(fields: &[Field], packet_total_bits: i64) -> Result<Vec<i64>> {
    let all_implicit = fields.iter().all(|f| f.bit_offset().is_none());
    let body_bits: i64 = fields.iter().map(|f| i64::from(f.bit_length())).sum();

    let mut counter: i64 = if all_implicit {
        packet_total_bits - body_bits
    } else {
        0
    };

    let mut offsets = Vec::with_capacity(fields.len());

    for (i, field) in fields.iter().enumerate() {
        let len = i64::from(field.bit_length());
        let offset = match field.bit_offset() {
            Some(b) if i == 0 => {
                counter = b + len;
                b
            }
            None => {
                let o = counter;
                counter += len;
                o
            }
            Some(b) if b < counter => {
                // Backtrack: explicit offset overlaps already-placed bits.
                // Retained verbatim per spec: take the explicit offset,
                // advance counter only if the overlap extends past it.
                counter = counter.max(b + len);
                b
            }
            Some(b) => {
                // b >= counter: explicit offset skips ahead.
                counter = b + len;
                b
            }
        };
        offsets.push(offset);
    }

    if all_implicit {
        if counter != packet_total_bits {
            return Err(DecodeError::LayoutError {
                field: fields.last().map(|f| f.name().to_string()).unwrap_or_default(),
                reason: format!(
                    "field definition does not match packet length: expected {packet_total_bits} bits, got {counter}"
                ),
            });
        }
    } else if counter > packet_total_bits {
        return Err(DecodeError::LayoutError {
            field: fields.last().map(|f| f.name().to_string()).unwrap_or_default(),
            reason: format!(
                "packet definition larger than packet length by {} bits",
                counter - packet_total_bits
            ),
        });
    }

    Ok(offsets)
}

/// Result of planning a [`crate::field::PacketKind::VariableLength`]
/// definition: a bit offset per field (negative offsets are relative to
/// the end of the packet body), and the index of the expanding field if
/// one is present.
#[derive(Debug, Clone)]
pub struct VariablePlan {
    /// Bit offset per field, same length/order as the input fields.
    /// Non-negative for fields before (and including) the expanding
    /// field; negative (relative to packet end) for fields after it.
    pub offsets: Vec<i64>,
    /// Index into the field list of the expanding field, if any.
    pub expand_index: Option<usize>,
}

/// Plan bit offsets for a variable-length definition. This is a one-time,
/// whole-definition computation: header-relative offsets for fields up to
/// and including the expanding field, and end-relative (negative) offsets
/// for fields after it, which do not depend on any particular packet's
/// total length.
pub fn plan_variable(fields: &[Field]) -> Result<VariablePlan> {
    let mut offsets = vec![0_i64; fields.len()];
    let mut counter: i64 = 0;
    let mut expand_index = None;

    for (i, field) in fields.iter().enumerate() {
        match field.bit_offset() {
            None => {
                if matches!(field.array_shape(), ArrayShape::Expand) && counter % 8 != 0 {
                    return Err(DecodeError::LayoutError {
                        field: field.name().to_string(),
                        reason: "expanding fields must be byte aligned".to_string(),
                    });
                }
                offsets[i] = counter;
                counter += i64::from(field.bit_length());

                if matches!(field.array_shape(), ArrayShape::Expand) {
                    expand_index = Some(i);
                    break;
                }
            }
            Some(b) => {
                offsets[i] = b;
                counter = counter.max(b + i64::from(field.bit_length()));
            }
        }
    }

    if let Some(expand_index) = expand_index {
        let mut counter: i64 = 0;
        for (rev_i, field) in fields[expand_index + 1..].iter().enumerate().rev() {
            let idx = expand_index + 1 + rev_i;
            offsets[idx] = counter - i64::from(field.bit_length());
            counter -= i64::from(field.bit_length());
        }
    }

    Ok(VariablePlan {
        offsets,
        expand_index,
    })
}
