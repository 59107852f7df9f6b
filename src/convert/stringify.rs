//! Stringify-bytes converter: formats decoded integer or raw-byte values
//! as prefixed binary/octal/hex strings, preserving jaggedness for
//! `expand`/size-by-name inputs.
use crate::column::Column;
use crate::convert::Converter;
use crate::error::ConversionError;

/// Target numeral base and prefix for [`StringifyBytesConverter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringifyFormat {
    /// `0b` prefix, base 2.
    Bin,
    /// `0o` prefix, base 8.
    Oct,
    /// `0x` prefix, base 16.
    Hex,
}

impl StringifyFormat {
    fn format(self, value: i64) -> String {
        let sign = if value < 0 { "-" } else { "" };
        let magnitude = value.unsigned_abs();
        match self {
            StringifyFormat::Bin => format!("{sign}0b{magnitude:b}"),
            StringifyFormat::Oct => format!("{sign}0o{magnitude:o}"),
            StringifyFormat::Hex => format!("{sign}0x{magnitude:x}"),
        }
    }

    fn format_bytes(self, bytes: &[u8]) -> String {
        let value = bytes.iter().fold(0_u64, |acc, &b| (acc << 8) | u64::from(b));
        self.format(value as i64)
    }
}

/// Formats every value in a numeric or raw-byte column as a
/// `sign? prefix digits` string. Jagged inputs (`JaggedUint`,
/// `JaggedBytes`) produce a matching [`Column::JaggedStrings`] output.
#[derive(Clone, Debug)]
pub struct StringifyBytesConverter {
    format: StringifyFormat,
}

impl StringifyBytesConverter {
    pub fn new(format: StringifyFormat) -> Self {
        Self { format }
    }
}

impl Converter for StringifyBytesConverter {
    fn convert(&self, inputs: &[&Column]) -> Result<Column, ConversionError> {
        Ok(match inputs[0] {
            Column::Bytes(rows) => {
                Column::Strings(rows.iter().map(|b| self.format.format_bytes(b)).collect())
            }
            Column::JaggedBytes(rows) => Column::JaggedStrings(
                rows.iter()
                    .map(|row| vec![self.format.format_bytes(row)])
                    .collect(),
            ),
            Column::JaggedUint(rows) => Column::JaggedStrings(
                rows.iter()
                    .map(|row| row.iter().map(|&v| self.format.format(v as i64)).collect())
                    .collect(),
            ),
            Column::JaggedInt(rows) => Column::JaggedStrings(
                rows.iter()
                    .map(|row| row.iter().map(|&v| self.format.format(v)).collect())
                    .collect(),
            ),
            other => {
                let values = other
                    .to_i64_vec()
                    .ok_or_else(|| ConversionError::StringifyBadFormat("non-integer input column".to_string()))?;
                Column::Strings(values.into_iter().map(|v| self.format.format(v)).collect())
            }
        })
    }
}
