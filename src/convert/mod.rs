//! Converter pipeline (C9): an ordered list of bindings, each taking one
//! or more already-decoded columns through a [`Converter`] to produce a
//! new output column, applied strictly after decoding (C6/C7) and array
//! collapse (C4) have finished.
mod datetime;
mod r#enum;
mod polynomial;
mod stringify;

pub use datetime::DatetimeConverter;
pub use polynomial::{LinearConverter, PolynomialConverter};
pub use r#enum::EnumConverter;
pub use stringify::{StringifyBytesConverter, StringifyFormat};

use crate::column::{Column, ColumnSet};
use crate::error::ConversionError;

/// A value-level transform from one or more input columns to one output
/// column. Implemented by the five built-ins; the trait is the escape
/// hatch for callers who need a converter this crate does not ship.
pub trait Converter {
    /// Apply this converter to its input columns, in the order given by
    /// the binding that references it.
    fn convert(&self, inputs: &[&Column]) -> Result<Column, ConversionError>;
}

/// One pipeline step: read `inputs` columns, run them through
/// `converter`, and bind the result to `output` (which may overwrite an
/// existing column, e.g. a `raw_temperature` field converted in place
/// into engineering units).
pub struct Binding {
    pub output: String,
    pub inputs: Vec<String>,
    pub converter: Box<dyn Converter>,
}

impl Binding {
    pub fn new(
        output: impl Into<String>,
        inputs: Vec<String>,
        converter: impl Converter + 'static,
    ) -> Self {
        Self {
            output: output.into(),
            inputs,
            converter: Box::new(converter),
        }
    }
}

/// Run every binding in order against `columns`, inserting (or
/// overwriting) each binding's output column as it completes. Bindings
/// run strictly in order, so a later binding may reference an earlier
/// binding's output by name.
///
/// # Errors
/// Returns [`ConversionError`] from the first binding whose converter
/// fails (missing enum key, unit/column count mismatch, bad stringify
/// format), or [`ConversionError::UnitMismatch`] if a binding names an
/// input column that was never decoded or produced.
pub fn apply_converters(columns: &mut ColumnSet, bindings: &[Binding]) -> Result<(), ConversionError> {
    for binding in bindings {
        let inputs: Vec<&Column> = binding
            .inputs
            .iter()
            .map(|name| {
                columns
                    .get(name)
                    .ok_or_else(|| ConversionError::UnitMismatch(binding.inputs.len(), 0))
            })
            .collect::<Result<_, _>>()?;

        let output = binding.converter.convert(&inputs)?;
        columns.insert(binding.output.clone(), output);
    }
    Ok(())
}
