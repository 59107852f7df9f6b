//! The `name -> Column` output map produced by a decode call.
//!
//! Rather than a single heterogeneous dictionary value (the Python
//! implementation's `dict[str, np.ndarray]` with an `object` dtype
//! escape hatch for jagged data), the decoded columns are represented as
//! a closed tagged union. Each decoder (C6, C7) and each converter (C9)
//! produces one of these variants; nothing downstream needs to guess a
//! dtype at runtime.
use chrono::{DateTime, Utc};

/// One named output column. The outer length (number of packets) is
/// always `len()`.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Unsigned 8/16/32/64-bit scalar column.
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    /// Signed 8/16/32/64-bit scalar column, sign-extended from the
    /// field's declared bit length.
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    /// IEEE-754 float column.
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// Fixed-width raw byte column (one `str` or `fill` field per
    /// packet, all the same width).
    Bytes(Vec<Vec<u8>>),
    /// Jagged raw byte column: one `expand` array per packet, lengths
    /// vary.
    JaggedBytes(Vec<Vec<u8>>),
    /// Jagged integer column: one size-by-name or expand array of
    /// unsigned integer elements per packet, lengths vary.
    JaggedUint(Vec<Vec<u64>>),
    /// Jagged signed-integer column, for size-by-name arrays of `int`.
    JaggedInt(Vec<Vec<i64>>),
    /// Jagged float column, for size-by-name arrays of `float`.
    JaggedFloat(Vec<Vec<f64>>),
    /// A collapsed fixed-shape unsigned integer array, `shape` excludes
    /// the leading packet dimension; `data` is flattened row-major
    /// across `(n_packets, *shape)`.
    ArrayUInt64 { shape: Vec<usize>, data: Vec<u64> },
    /// A collapsed fixed-shape signed integer array.
    ArrayInt64 { shape: Vec<usize>, data: Vec<i64> },
    /// A collapsed fixed-shape float array.
    ArrayFloat64 { shape: Vec<usize>, data: Vec<f64> },
    /// A collapsed fixed-shape raw byte (`str`/`fill`) array.
    ArrayBytes { shape: Vec<usize>, data: Vec<Vec<u8>> },
    /// Converter output: replacement strings (`EnumConverter`) or
    /// formatted numeric strings (`StringifyBytesConverter`).
    Strings(Vec<String>),
    /// Converter output: jagged formatted numeric strings, preserving
    /// the shape/jaggedness of a `StringifyBytesConverter` input.
    JaggedStrings(Vec<Vec<String>>),
    /// Converter output: reconstructed timestamps (`DatetimeConverter`).
    Datetime(Vec<DateTime<Utc>>),
}

impl Column {
    /// Number of packets (outer length) represented by this column.
    pub fn len(&self) -> usize {
        match self {
            Column::UInt8(v) => v.len(),
            Column::UInt16(v) => v.len(),
            Column::UInt32(v) => v.len(),
            Column::UInt64(v) => v.len(),
            Column::Int8(v) => v.len(),
            Column::Int16(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float32(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Bytes(v) => v.len(),
            Column::JaggedBytes(v) => v.len(),
            Column::JaggedUint(v) => v.len(),
            Column::JaggedInt(v) => v.len(),
            Column::JaggedFloat(v) => v.len(),
            Column::ArrayUInt64 { shape, data } => n_packets(shape, data.len()),
            Column::ArrayInt64 { shape, data } => n_packets(shape, data.len()),
            Column::ArrayFloat64 { shape, data } => n_packets(shape, data.len()),
            Column::ArrayBytes { shape, data } => n_packets(shape, data.len()),
            Column::Strings(v) => v.len(),
            Column::JaggedStrings(v) => v.len(),
            Column::Datetime(v) => v.len(),
        }
    }

    /// True if this column has zero packets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reinterpret every element as `f64`, for converters (Polynomial,
    /// Linear) that operate numerically regardless of storage width.
    /// Returns `None` for non-numeric-scalar columns (byte/jagged/array
    /// columns, or converter-produced string/datetime columns).
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        Some(match self {
            Column::UInt8(v) => v.iter().map(|&x| x as f64).collect(),
            Column::UInt16(v) => v.iter().map(|&x| x as f64).collect(),
            Column::UInt32(v) => v.iter().map(|&x| x as f64).collect(),
            Column::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            Column::Int8(v) => v.iter().map(|&x| x as f64).collect(),
            Column::Int16(v) => v.iter().map(|&x| x as f64).collect(),
            Column::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            Column::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            Column::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            Column::Float64(v) => v.clone(),
            _ => return None,
        })
    }

    /// Reinterpret every element as `i64`, for converters (Enum) that
    /// need exact integer keys. Returns `None` for non-integer-scalar
    /// columns.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        Some(match self {
            Column::UInt8(v) => v.iter().map(|&x| x as i64).collect(),
            Column::UInt16(v) => v.iter().map(|&x| x as i64).collect(),
            Column::UInt32(v) => v.iter().map(|&x| x as i64).collect(),
            Column::UInt64(v) => v.iter().map(|&x| x as i64).collect(),
            Column::Int8(v) => v.iter().map(|&x| x as i64).collect(),
            Column::Int16(v) => v.iter().map(|&x| x as i64).collect(),
            Column::Int32(v) => v.iter().map(|&x| x as i64).collect(),
            Column::Int64(v) => v.clone(),
            _ => return None,
        })
    }

    /// Reinterpret every element as `u64`, for array collapse (C4) and
    /// the encoder (C10), which need the decoded value regardless of
    /// which promoted-width variant a particular field happened to
    /// narrow to. Returns `None` for non-unsigned-scalar columns.
    pub fn to_u64_vec(&self) -> Option<Vec<u64>> {
        Some(match self {
            Column::UInt8(v) => v.iter().map(|&x| u64::from(x)).collect(),
            Column::UInt16(v) => v.iter().map(|&x| u64::from(x)).collect(),
            Column::UInt32(v) => v.iter().map(|&x| u64::from(x)).collect(),
            Column::UInt64(v) => v.clone(),
            _ => return None,
        })
    }
}

fn n_packets(shape: &[usize], data_len: usize) -> usize {
    let elems_per_packet: usize = shape.iter().product::<usize>().max(1);
    if elems_per_packet == 0 {
        0
    } else {
        data_len / elems_per_packet
    }
}

/// Ordered mapping of field name to decoded column, as produced by a
/// `load()` call. Preserves insertion (definition) order, unlike a plain
/// hash map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnSet {
    order: Vec<String>,
    columns: std::collections::HashMap<String, Column>,
}

impl ColumnSet {
    /// Create an empty column set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, appending to the order if the name is new, or
    /// overwriting in place if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, column: Column) {
        let name = name.into();
        if !self.columns.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.columns.insert(name, column);
    }

    /// Remove a column by name.
    pub fn remove(&mut self, name: &str) -> Option<Column> {
        if let Some(pos) = self.order.iter().position(|n| n == name) {
            self.order.remove(pos);
        }
        self.columns.remove(name)
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Iterate `(name, column)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.order.iter().map(move |n| (n.as_str(), &self.columns[n]))
    }

    /// Position of a child's earliest index among the given names. Used
    /// by array collapse to reinsert the composite column at the
    /// earliest child's position.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Insert a column at a specific position in the order, shifting
    /// later entries down. Used by array collapse to restore the
    /// composite array's original position.
    pub fn insert_at(&mut self, index: usize, name: impl Into<String>, column: Column) {
        let name = name.into();
        let index = index.min(self.order.len());
        self.order.insert(index, name.clone());
        self.columns.insert(name, column);
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
