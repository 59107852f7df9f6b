//! Array expansion / collapse (C4): turn a fixed-shape `Array` field into
//! one scalar field per element for decoding, then reassemble the
//! decoded scalar columns back into an N-D array column.
use std::collections::HashMap;

use crate::column::{Column, ColumnSet};
use crate::field::{ArrayOrder, ArrayShape, DataType, Field};

/// One array field's expansion record: its shape/dtype, plus the ordered
/// list of (child field name, multi-index) pairs produced for it. Holds
/// indices only (no back-reference to the children's data), so there is
/// no cycle between the composite array and its scalar children.
#[derive(Debug, Clone)]
pub struct ExpandedArray {
    pub shape: Vec<usize>,
    pub data_type: DataType,
    pub children: Vec<(String, Vec<usize>)>,
}

/// Maps an array field's name to its [`ExpandedArray`] record. Only
/// fixed-shape arrays are recorded; `expand` and size-by-name arrays are
/// left jagged and skip expansion entirely.
pub type ExpandLedger = HashMap<String, ExpandedArray>;

/// Expand every fixed-shape array field in `fields` into per-element
/// scalar fields, returning the flattened field list and a ledger that
/// can later reconstruct the arrays from decoded columns.
pub fn expand_array_fields(fields: &[Field]) -> (Vec<Field>, ExpandLedger) {
    let mut out = Vec::new();
    let mut ledger = ExpandLedger::new();

    for field in fields {
        let shape = match field.array_shape() {
            ArrayShape::Fixed(shape) => shape.clone(),
            _ => {
                out.push(field.clone());
                continue;
            }
        };

        let indices = multi_indices(&shape, field.array_order());
        let mut children = Vec::with_capacity(indices.len());

        for (i, idx) in indices.into_iter().enumerate() {
            let name = format!(
                "{}[{}]",
                field.name(),
                idx.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            );

            let bit_offset = field
                .bit_offset()
                .map(|parent| parent + i as i64 * i64::from(field.bit_length()));

            let child = Field::with_offset(
                name.clone(),
                field.data_type(),
                field.bit_length(),
                bit_offset,
                field.byte_order().clone(),
            )
            .expect("child field inherits a valid parent definition");

            children.push((name, idx));
            out.push(child);
        }

        ledger.insert(
            field.name().to_string(),
            ExpandedArray {
                shape,
                data_type: field.data_type(),
                children,
            },
        );
    }

    (out, ledger)
}

/// Enumerate every index tuple of an N-D shape in the flattening order
/// implied by `order`: row-major visits the last dimension fastest,
/// column-major visits the first dimension fastest.
fn multi_indices(shape: &[usize], order: ArrayOrder) -> Vec<Vec<usize>> {
    let total: usize = shape.iter().product();
    let mut out = Vec::with_capacity(total);

    for p in 0..total {
        let mut idx = vec![0_usize; shape.len()];
        let mut rem = p;
        match order {
            ArrayOrder::RowMajor => {
                for d in (0..shape.len()).rev() {
                    idx[d] = rem % shape[d];
                    rem /= shape[d];
                }
            }
            ArrayOrder::ColumnMajor => {
                for d in 0..shape.len() {
                    idx[d] = rem % shape[d];
                    rem /= shape[d];
                }
            }
        }
        out.push(idx);
    }

    out
}

/// Reverse [`expand_array_fields`]: scatter each array's scalar child
/// columns into a freshly allocated N-D array column, delete the child
/// columns, and reinsert the composite column at the position of the
/// earliest child.
pub fn collapse_array_fields(columns: &mut ColumnSet, ledger: &ExpandLedger) {
    for (array_name, expanded) in ledger {
        if expanded.children.is_empty() {
            continue;
        }

        let insert_at = expanded
            .children
            .iter()
            .filter_map(|(name, _)| columns.position(name))
            .min()
            .unwrap_or(0);

        let n_packets = columns
            .get(&expanded.children[0].0)
            .map(Column::len)
            .unwrap_or(0);
        let elems_per_packet: usize = expanded.shape.iter().product();

        let composite = match expanded.data_type {
            DataType::Uint => {
                let mut data = vec![0_u64; n_packets * elems_per_packet];
                for (child_name, idx) in &expanded.children {
                    if let Some(values) = columns.get(child_name).and_then(Column::to_u64_vec) {
                        scatter(&mut data, &values, idx, &expanded.shape, n_packets);
                    }
                }
                Column::ArrayUInt64 {
                    shape: expanded.shape.clone(),
                    data,
                }
            }
            DataType::Int => {
                let mut data = vec![0_i64; n_packets * elems_per_packet];
                for (child_name, idx) in &expanded.children {
                    if let Some(values) = columns.get(child_name).and_then(Column::to_i64_vec) {
                        scatter(&mut data, &values, idx, &expanded.shape, n_packets);
                    }
                }
                Column::ArrayInt64 {
                    shape: expanded.shape.clone(),
                    data,
                }
            }
            DataType::Float => {
                let mut data = vec![0.0_f64; n_packets * elems_per_packet];
                for (child_name, idx) in &expanded.children {
                    if let Some(values) = columns.get(child_name).and_then(Column::to_f64_vec) {
                        scatter(&mut data, &values, idx, &expanded.shape, n_packets);
                    }
                }
                Column::ArrayFloat64 {
                    shape: expanded.shape.clone(),
                    data,
                }
            }
            DataType::Str | DataType::Fill => {
                let mut data = vec![Vec::new(); n_packets * elems_per_packet];
                for (child_name, idx) in &expanded.children {
                    if let Some(Column::Bytes(values)) = columns.get(child_name) {
                        scatter(&mut data, values, idx, &expanded.shape, n_packets);
                    }
                }
                Column::ArrayBytes {
                    shape: expanded.shape.clone(),
                    data,
                }
            }
        };

        for (child_name, _) in &expanded.children {
            columns.remove(child_name);
        }

        columns.insert_at(insert_at.min(columns.len()), array_name.clone(), composite);
    }
}

fn scatter<T: Clone>(
    data: &mut [T],
    values: &[T],
    idx: &[usize],
    shape: &[usize],
    n_packets: usize,
) {
    let elems_per_packet: usize = shape.iter().product();
    let flat_index = flatten_row_major(idx, shape);

    for packet in 0..n_packets {
        data[packet * elems_per_packet + flat_index] = values[packet].clone();
    }
}

/// Inverse of [`collapse_array_fields`], used by the encoder (C10): given
/// the user's field list, its expansion ledger, and a column set keyed by
/// user field names (composite arrays included), produce a column set
/// keyed by the *expanded* scalar field names that `expand_array_fields`
/// would have produced. Non-array fields pass through unchanged.
pub fn split_array_columns(user_fields: &[Field], ledger: &ExpandLedger, columns: &ColumnSet) -> ColumnSet {
    let mut out = ColumnSet::new();

    for field in user_fields {
        match ledger.get(field.name()) {
            Some(expanded) => {
                if let Some(composite) = columns.get(field.name()) {
                    gather_children(composite, expanded, &mut out);
                }
            }
            None => {
                if let Some(column) = columns.get(field.name()) {
                    out.insert(field.name(), column.clone());
                }
            }
        }
    }

    out
}

fn gather_children(composite: &Column, expanded: &ExpandedArray, out: &mut ColumnSet) {
    let elems_per_packet: usize = expanded.shape.iter().product::<usize>().max(1);

    macro_rules! gather {
        ($data:expr, $make:expr) => {{
            let n_packets = $data.len() / elems_per_packet;
            for (child_name, idx) in &expanded.children {
                let flat = flatten_row_major(idx, &expanded.shape);
                let values: Vec<_> = (0..n_packets).map(|p| $data[p * elems_per_packet + flat].clone()).collect();
                out.insert(child_name.clone(), $make(values));
            }
        }};
    }

    match composite {
        Column::ArrayUInt64 { data, .. } => gather!(data, Column::UInt64),
        Column::ArrayInt64 { data, .. } => gather!(data, Column::Int64),
        Column::ArrayFloat64 { data, .. } => gather!(data, Column::Float64),
        Column::ArrayBytes { data, .. } => gather!(data, Column::Bytes),
        _ => {}
    }
}

fn flatten_row_major(idx: &[usize], shape: &[usize]) -> usize {
    let mut pos = 0;
    let mut stride = 1;
    for d in (0..shape.len()).rev() {
        pos += idx[d] * stride;
        stride *= shape[d];
    }
    pos
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collapse_widens_narrow_uint_children() {
        // A realistic decode produces UInt8 children for an 8-bit-element
        // array (decode::common::pack_column narrows to the smallest
        // variant that fits); collapse must still gather them.
        let array = Field::array(
            "img",
            DataType::Uint,
            8,
            ArrayShape::Fixed(vec![2, 2]),
            ArrayOrder::RowMajor,
        )
        .unwrap();
        let (expanded, ledger) = expand_array_fields(&[array]);

        let mut columns = ColumnSet::new();
        for (i, field) in expanded.iter().enumerate() {
            columns.insert(field.name(), Column::UInt8(vec![i as u8; 3]));
        }

        collapse_array_fields(&mut columns, &ledger);

        match columns.get("img").unwrap() {
            Column::ArrayUInt64 { shape, data } => {
                assert_eq!(shape, &vec![2, 2]);
                assert_eq!(data, &vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3]);
            }
            other => panic!("unexpected column variant: {other:?}"),
        }
    }

    #[test]
    fn split_array_columns_is_inverse_of_collapse() {
        let array = Field::array(
            "img",
            DataType::Uint,
            16,
            ArrayShape::Fixed(vec![2, 2]),
            ArrayOrder::RowMajor,
        )
        .unwrap();
        let (_, ledger) = expand_array_fields(&[array.clone()]);

        let mut columns = ColumnSet::new();
        columns.insert(
            "img",
            Column::ArrayUInt64 {
                shape: vec![2, 2],
                data: vec![10, 11, 12, 13, 20, 21, 22, 23],
            },
        );

        let split = split_array_columns(&[array], &ledger, &columns);
        match split.get("img[0,0]").unwrap() {
            Column::UInt64(v) => assert_eq!(v, &vec![10, 20]),
            other => panic!("{other:?}"),
        }
        match split.get("img[1,1]").unwrap() {
            Column::UInt64(v) => assert_eq!(v, &vec![13, 23]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn expand_then_collapse_is_identity() {
        let array = Field::array(
            "img",
            DataType::Uint,
            8,
            ArrayShape::Fixed(vec![2, 3]),
            ArrayOrder::RowMajor,
        )
        .unwrap();

        let (expanded, ledger) = expand_array_fields(&[array]);
        assert_eq!(expanded.len(), 6);
        assert_eq!(expanded[0].name(), "img[0,0]");
        assert_eq!(expanded[5].name(), "img[1,2]");

        let mut columns = ColumnSet::new();
        for (i, field) in expanded.iter().enumerate() {
            columns.insert(field.name(), Column::UInt64(vec![i as u64; 2]));
        }

        collapse_array_fields(&mut columns, &ledger);

        let composite = columns.get("img").unwrap();
        match composite {
            Column::ArrayUInt64 { shape, data } => {
                assert_eq!(shape, &vec![2, 3]);
                assert_eq!(data, &vec![0, 1, 2, 3, 4, 5, 0, 1, 2, 3, 4, 5]);
            }
            other => panic!("unexpected column variant: {other:?}"),
        }
    }

    #[test]
    fn column_major_visits_first_dimension_fastest() {
        let indices = multi_indices(&[2, 3], ArrayOrder::ColumnMajor);
        assert_eq!(
            indices,
            vec![
                vec![0, 0],
                vec![1, 0],
                vec![0, 1],
                vec![1, 1],
                vec![0, 2],
                vec![1, 2],
            ]
        );
    }
}
