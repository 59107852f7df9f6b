//! Enum converter: replaces integer values with a string label.
use std::collections::HashMap;

use crate::column::Column;
use crate::convert::Converter;
use crate::error::ConversionError;

/// Maps decoded integer values to string labels, e.g. `0 -> "OFF"`,
/// `1 -> "ON"`. Every value in the input column must have a matching
/// key; an unrecognized value is a fatal [`ConversionError::EnumMissingKey`]
/// rather than a silent passthrough, since a label table with a gap
/// usually means the table is stale.
#[derive(Clone, Debug)]
pub struct EnumConverter {
    mapping: HashMap<i64, String>,
}

impl EnumConverter {
    pub fn new(mapping: HashMap<i64, String>) -> Self {
        Self { mapping }
    }
}

impl Converter for EnumConverter {
    fn convert(&self, inputs: &[&Column]) -> Result<Column, ConversionError> {
        let values = inputs[0]
            .to_i64_vec()
            .ok_or_else(|| ConversionError::UnitMismatch(1, 0))?;

        let missing: Vec<i64> = values
            .iter()
            .filter(|v| !self.mapping.contains_key(v))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ConversionError::EnumMissingKey(missing));
        }

        Ok(Column::Strings(
            values
                .into_iter()
                .map(|v| self.mapping[&v].clone())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn replaces_known_values() {
        let mapping = HashMap::from([(0, "OFF".to_string()), (1, "ON".to_string())]);
        let converter = EnumConverter::new(mapping);
        let input = Column::UInt8(vec![0, 1, 0]);
        let output = converter.convert(&[&input]).unwrap();
        match output {
            Column::Strings(v) => assert_eq!(v, vec!["OFF", "ON", "OFF"]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn unknown_value_is_fatal() {
        let mapping = HashMap::from([(0, "OFF".to_string())]);
        let converter = EnumConverter::new(mapping);
        let input = Column::UInt8(vec![0, 5]);
        let err = converter.convert(&[&input]).unwrap_err();
        assert_eq!(err, ConversionError::EnumMissingKey(vec![5]));
    }
}
