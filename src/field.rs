//! In-memory field model (C3): the ordered list of fields that describes a
//! packet's body layout, independent of how it will be decoded.
use crate::error::{DecodeError, Result};

/// Closed set of primitive wire data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// Unsigned integer, 1..=64 bits.
    Uint,
    /// Signed (two's complement) integer, 1..=64 bits.
    Int,
    /// IEEE-754 float, 32 or 64 bits.
    Float,
    /// Raw bytes, no character decoding. Bit length must be a multiple of 8.
    Str,
    /// Opaque padding, never interpreted.
    Fill,
}

/// Byte order of a scalar field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// Standard big-endian (network) byte order.
    Big,
    /// Standard little-endian byte order.
    Little,
    /// Arbitrary digit permutation, e.g. `3412`. Digit `k` at position `i`
    /// (1-indexed) means "the `i`-th assembled byte is file-byte `k`". The
    /// permutation's length must equal the field's byte width.
    Permutation(Vec<u8>),
}

impl ByteOrder {
    /// Parse a byte-order string: `"big"`, `"little"`, or a permutation
    /// string of digits 1..=N with no repeats.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "big" => Ok(ByteOrder::Big),
            "little" => Ok(ByteOrder::Little),
            digits if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                let parsed: Vec<u8> = digits
                    .chars()
                    .map(|c| c.to_digit(10).unwrap() as u8)
                    .collect();
                validate_permutation(&parsed)?;
                Ok(ByteOrder::Permutation(parsed))
            }
            other => Err(DecodeError::DefinitionError {
                field: String::new(),
                reason: format!("invalid byte_order '{other}'"),
            }),
        }
    }

    /// Byte width implied by a permutation, or `None` for `Big`/`Little`.
    pub fn permutation_width(&self) -> Option<usize> {
        match self {
            ByteOrder::Permutation(digits) => Some(digits.len()),
            _ => None,
        }
    }
}

fn validate_permutation(digits: &[u8]) -> Result<()> {
    let n = digits.len();
    if !(1..=8).contains(&n) {
        return Err(DecodeError::DefinitionError {
            field: String::new(),
            reason: format!("permutation byte_order must have 1..=8 digits, found {n}"),
        });
    }
    let mut seen = vec![false; n + 1];
    for &d in digits {
        if d == 0 || usize::from(d) > n || seen[usize::from(d)] {
            return Err(DecodeError::DefinitionError {
                field: String::new(),
                reason: format!("permutation '{digits:?}' must be digits 1..={n} with no repeats"),
            });
        }
        seen[usize::from(d)] = true;
    }
    Ok(())
}

/// Storage width selected for a field's decoded representation, after
/// widths 3/5/6/7 are promoted to the next power of two.
pub fn promoted_storage_bytes(nbytes_file: usize) -> usize {
    match nbytes_file {
        3 => 4,
        5 | 6 | 7 => 8,
        n => n,
    }
}

/// Shape of an array field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayShape {
    /// Not an array: a plain scalar field.
    Scalar,
    /// Fixed N-D shape.
    Fixed(Vec<usize>),
    /// Consumes all remaining body bytes. At most one per packet
    /// definition; requires `data_type == Uint`.
    Expand,
    /// Element count taken at decode time from a preceding scalar field.
    SizedBy(String),
}

/// Row-major (`C`) or column-major (`Fortran`) array element ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayOrder {
    /// Row-major (C-style) ordering.
    RowMajor,
    /// Column-major (Fortran-style) ordering.
    ColumnMajor,
}

/// A single field (scalar or array) in a packet definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) bit_length: u32,
    pub(crate) bit_offset: Option<i64>,
    pub(crate) byte_order: ByteOrder,
    pub(crate) array_shape: ArrayShape,
    pub(crate) array_order: ArrayOrder,
}

impl Field {
    /// Construct a scalar field.
    ///
    /// # Errors
    /// Returns [`DecodeError::DefinitionError`] if `name` is empty,
    /// `bit_length == 0`, or the data type's width constraint is violated
    /// (`float` must be 32 or 64 bits; `str` must be a multiple of 8 bits).
    pub fn new(name: impl Into<String>, data_type: DataType, bit_length: u32) -> Result<Self> {
        Self::with_offset(name, data_type, bit_length, None, ByteOrder::Big)
    }

    /// Construct a scalar field with an explicit bit offset and/or byte
    /// order.
    pub fn with_offset(
        name: impl Into<String>,
        data_type: DataType,
        bit_length: u32,
        bit_offset: Option<i64>,
        byte_order: ByteOrder,
    ) -> Result<Self> {
        let name = name.into();
        validate_scalar(&name, data_type, bit_length)?;
        Ok(Self {
            name,
            data_type,
            bit_length,
            bit_offset,
            byte_order,
            array_shape: ArrayShape::Scalar,
            array_order: ArrayOrder::RowMajor,
        })
    }

    /// Construct an array field.
    ///
    /// # Errors
    /// Returns [`DecodeError::DefinitionError`] if `shape` is
    /// [`ArrayShape::Expand`] and `data_type != Uint`, if a
    /// [`ArrayShape::Fixed`] shape has any zero dimension, or if the
    /// underlying scalar constraints are violated.
    pub fn array(
        name: impl Into<String>,
        data_type: DataType,
        bit_length: u32,
        shape: ArrayShape,
        order: ArrayOrder,
    ) -> Result<Self> {
        let name = name.into();
        validate_scalar(&name, data_type, bit_length)?;

        match &shape {
            ArrayShape::Expand if data_type != DataType::Uint => {
                return Err(DecodeError::DefinitionError {
                    field: name,
                    reason: "expanding arrays must have data_type=uint".to_string(),
                });
            }
            ArrayShape::Fixed(dims) => {
                if dims.is_empty() || dims.iter().any(|&d| d == 0) {
                    return Err(DecodeError::DefinitionError {
                        field: name,
                        reason: "array shape dimensions must all be >= 1".to_string(),
                    });
                }
            }
            _ => {}
        }

        Ok(Self {
            name,
            data_type,
            bit_length,
            bit_offset: None,
            byte_order: ByteOrder::Big,
            array_shape: shape,
            array_order: order,
        })
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Bit length of a single element.
    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    /// Explicit bit offset, if any.
    pub fn bit_offset(&self) -> Option<i64> {
        self.bit_offset
    }

    /// Byte order.
    pub fn byte_order(&self) -> &ByteOrder {
        &self.byte_order
    }

    /// Array shape (`Scalar` for non-array fields).
    pub fn array_shape(&self) -> &ArrayShape {
        &self.array_shape
    }

    /// Row-major or column-major element ordering (only meaningful for
    /// `Fixed`-shape array fields).
    pub fn array_order(&self) -> ArrayOrder {
        self.array_order
    }

    /// True if this field is an array field (any non-`Scalar` shape).
    pub fn is_array(&self) -> bool {
        !matches!(self.array_shape, ArrayShape::Scalar)
    }
}

fn validate_scalar(name: &str, data_type: DataType, bit_length: u32) -> Result<()> {
    if name.is_empty() {
        return Err(DecodeError::DefinitionError {
            field: name.to_string(),
            reason: "field name must not be empty".to_string(),
        });
    }
    if bit_length == 0 {
        return Err(DecodeError::DefinitionError {
            field: name.to_string(),
            reason: "bit_length must be >= 1".to_string(),
        });
    }
    match data_type {
        DataType::Float if bit_length != 32 && bit_length != 64 => {
            return Err(DecodeError::DefinitionError {
                field: name.to_string(),
                reason: "float fields must be 32 or 64 bits".to_string(),
            });
        }
        DataType::Str if bit_length % 8 != 0 => {
            return Err(DecodeError::DefinitionError {
                field: name.to_string(),
                reason: "str fields must be a multiple of 8 bits".to_string(),
            });
        }
        DataType::Int | DataType::Uint if bit_length > 64 => {
            return Err(DecodeError::DefinitionError {
                field: name.to_string(),
                reason: "int/uint fields must be <= 64 bits".to_string(),
            });
        }
        _ => {}
    }
    Ok(())
}

/// Whether a packet definition describes fixed- or variable-length
/// packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketKind {
    /// Every packet of this APID has an identical body layout.
    FixedLength,
    /// A single expanding field or size-by-name arrays make body length
    /// depend on packet content.
    VariableLength,
}

/// An ordered, immutable list of fields describing a packet body, plus its
/// [`PacketKind`]. Constructed once; [`PacketDefinition::validate`] is run
/// at construction time so that a `PacketDefinition` which exists is
/// always internally consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketDefinition {
    pub(crate) kind: PacketKind,
    pub(crate) fields: Vec<Field>,
}

impl PacketDefinition {
    /// Build a [`PacketKind::FixedLength`] definition.
    ///
    /// # Errors
    /// Returns [`DecodeError::DefinitionError`] if any field has a
    /// non-scalar, non-`Fixed` array shape (`Expand` or `SizedBy`).
    pub fn fixed_length(fields: Vec<Field>) -> Result<Self> {
        for field in &fields {
            if matches!(
                field.array_shape,
                ArrayShape::Expand | ArrayShape::SizedBy(_)
            ) {
                return Err(DecodeError::DefinitionError {
                    field: field.name.clone(),
                    reason: "FixedLength definitions do not support expand or size-by-name arrays"
                        .to_string(),
                });
            }
        }
        Ok(Self {
            kind: PacketKind::FixedLength,
            fields,
        })
    }

    /// Build a [`PacketKind::VariableLength`] definition.
    ///
    /// # Errors
    /// Returns [`DecodeError::DefinitionError`] if more than one field has
    /// `array_shape=Expand`, if a `SizedBy` array references a field that
    /// does not strictly precede it, or if any field has an explicit
    /// `bit_offset`.
    pub fn variable_length(fields: Vec<Field>) -> Result<Self> {
        let expand_count = fields
            .iter()
            .filter(|f| matches!(f.array_shape, ArrayShape::Expand))
            .count();
        if expand_count > 1 {
            return Err(DecodeError::DefinitionError {
                field: String::new(),
                reason: "VariableLength definitions support at most one expand array".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            if let ArrayShape::SizedBy(ref_name) = &field.array_shape {
                if !seen.contains(ref_name.as_str()) {
                    return Err(DecodeError::DefinitionError {
                        field: field.name.clone(),
                        reason: format!(
                            "size-by-name field references '{ref_name}' which does not precede it"
                        ),
                    });
                }
            }
            if field.bit_offset.is_some() {
                return Err(DecodeError::DefinitionError {
                    field: field.name.clone(),
                    reason: "VariableLength definitions do not support explicit bit_offset"
                        .to_string(),
                });
            }
            seen.insert(field.name.clone());
        }

        Ok(Self {
            kind: PacketKind::VariableLength,
            fields,
        })
    }

    /// Assemble an already-validated field list (typically the primary
    /// header pseudo-fields prepended to a body already checked by
    /// [`PacketDefinition::fixed_length`] or [`PacketDefinition::variable_length`]).
    /// Skips re-validation, since the header's explicit offsets would
    /// otherwise trip [`PacketDefinition::variable_length`]'s "no explicit
    /// bit_offset" rule, which is meant for the *body* fields only.
    pub(crate) fn assemble(kind: PacketKind, fields: Vec<Field>) -> Self {
        Self { kind, fields }
    }

    /// This definition's fields, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Whether this is a fixed- or variable-length definition.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }
}

/// The seven primary-header pseudo-fields, in wire order, prepended to a
/// definition's fields whenever `include_primary_header` decoding is
/// requested.
pub fn primary_header_fields() -> Vec<Field> {
    vec![
        Field::with_offset("CCSDS_VERSION_NUMBER", DataType::Uint, 3, Some(0), ByteOrder::Big)
            .expect("static field is valid"),
        Field::with_offset("CCSDS_PACKET_TYPE", DataType::Uint, 1, Some(3), ByteOrder::Big)
            .expect("static field is valid"),
        Field::with_offset(
            "CCSDS_SECONDARY_FLAG",
            DataType::Uint,
            1,
            Some(4),
            ByteOrder::Big,
        )
        .expect("static field is valid"),
        Field::with_offset("CCSDS_APID", DataType::Uint, 11, Some(5), ByteOrder::Big)
            .expect("static field is valid"),
        Field::with_offset(
            "CCSDS_SEQUENCE_FLAG",
            DataType::Uint,
            2,
            Some(16),
            ByteOrder::Big,
        )
        .expect("static field is valid"),
        Field::with_offset(
            "CCSDS_SEQUENCE_COUNT",
            DataType::Uint,
            14,
            Some(18),
            ByteOrder::Big,
        )
        .expect("static field is valid"),
        Field::with_offset(
            "CCSDS_PACKET_LENGTH",
            DataType::Uint,
            16,
            Some(32),
            ByteOrder::Big,
        )
        .expect("static field is valid"),
    ]
}

/// Names of the seven primary-header pseudo-fields, in wire order.
pub const PRIMARY_HEADER_FIELD_NAMES: [&str; 7] = [
    "CCSDS_VERSION_NUMBER",
    "CCSDS_PACKET_TYPE",
    "CCSDS_SECONDARY_FLAG",
    "CCSDS_APID",
    "CCSDS_SEQUENCE_FLAG",
    "CCSDS_SEQUENCE_COUNT",
    "CCSDS_PACKET_LENGTH",
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(Field::new("", DataType::Uint, 8).is_err());
    }

    #[test]
    fn rejects_bad_float_width() {
        assert!(Field::new("f", DataType::Float, 16).is_err());
        assert!(Field::new("f", DataType::Float, 32).is_ok());
        assert!(Field::new("f", DataType::Float, 64).is_ok());
    }

    #[test]
    fn rejects_bad_str_width() {
        assert!(Field::new("s", DataType::Str, 12).is_err());
        assert!(Field::new("s", DataType::Str, 16).is_ok());
    }

    #[test]
    fn permutation_byte_order_parses() {
        let order = ByteOrder::parse("3412").unwrap();
        assert_eq!(order, ByteOrder::Permutation(vec![3, 4, 1, 2]));
        assert_eq!(order.permutation_width(), Some(4));
    }

    #[test]
    fn permutation_rejects_repeats_and_out_of_range() {
        assert!(ByteOrder::parse("1123").is_err());
        assert!(ByteOrder::parse("3456").is_err());
    }

    #[test]
    fn expand_requires_uint() {
        let err = Field::array(
            "data",
            DataType::Int,
            16,
            ArrayShape::Expand,
            ArrayOrder::RowMajor,
        );
        assert!(err.is_err());
    }

    #[test]
    fn variable_length_rejects_explicit_offset() {
        let field =
            Field::with_offset("a", DataType::Uint, 8, Some(0), ByteOrder::Big).unwrap();
        assert!(PacketDefinition::variable_length(vec![field]).is_err());
    }

    #[test]
    fn variable_length_rejects_forward_reference() {
        let array = Field::array(
            "data",
            DataType::Uint,
            16,
            ArrayShape::SizedBy("n".to_string()),
            ArrayOrder::RowMajor,
        )
        .unwrap();
        assert!(PacketDefinition::variable_length(vec![array]).is_err());
    }

    #[test]
    fn variable_length_rejects_multiple_expand() {
        let a = Field::array(
            "a",
            DataType::Uint,
            16,
            ArrayShape::Expand,
            ArrayOrder::RowMajor,
        )
        .unwrap();
        let b = Field::array(
            "b",
            DataType::Uint,
            16,
            ArrayShape::Expand,
            ArrayOrder::RowMajor,
        )
        .unwrap();
        assert!(PacketDefinition::variable_length(vec![a, b]).is_err());
    }

    #[test]
    fn fixed_length_rejects_expand() {
        let a = Field::array(
            "a",
            DataType::Uint,
            16,
            ArrayShape::Expand,
            ArrayOrder::RowMajor,
        )
        .unwrap();
        assert!(PacketDefinition::fixed_length(vec![a]).is_err());
    }
}
