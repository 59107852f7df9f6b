//! Polynomial and linear unit converters.
use crate::column::Column;
use crate::convert::Converter;
use crate::error::ConversionError;

/// Evaluates `coeffs[0]*x^(n-1) + coeffs[1]*x^(n-2) + ... + coeffs[n-1]`
/// against a single numeric input column, coefficients given
/// highest-power-first.
#[derive(Clone, Debug)]
pub struct PolynomialConverter {
    coeffs: Vec<f64>,
}

impl PolynomialConverter {
    /// Coefficients highest-power-first, e.g. `[2.0, -1.0, 3.0]` for
    /// `2x^2 - x + 3`.
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
    }
}

impl Converter for PolynomialConverter {
    fn convert(&self, inputs: &[&Column]) -> Result<Column, ConversionError> {
        let values = inputs[0]
            .to_f64_vec()
            .ok_or_else(|| ConversionError::UnitMismatch(1, 0))?;
        Ok(Column::Float64(
            values.into_iter().map(|x| self.evaluate(x)).collect(),
        ))
    }
}

/// `y = slope * x + intercept`, a two-term [`PolynomialConverter`].
#[derive(Clone, Debug)]
pub struct LinearConverter {
    inner: PolynomialConverter,
}

impl LinearConverter {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self {
            inner: PolynomialConverter::new(vec![slope, intercept]),
        }
    }
}

impl Converter for LinearConverter {
    fn convert(&self, inputs: &[&Column]) -> Result<Column, ConversionError> {
        self.inner.convert(inputs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn polynomial_evaluates_highest_power_first() {
        let converter = PolynomialConverter::new(vec![2.0, -1.0, 3.0]);
        let input = Column::UInt8(vec![0, 1, 2]);
        let output = converter.convert(&[&input]).unwrap();
        match output {
            Column::Float64(v) => assert_eq!(v, vec![3.0, 4.0, 13.0]),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn linear_matches_two_term_polynomial() {
        let converter = LinearConverter::new(0.5, 10.0);
        let input = Column::UInt16(vec![0, 2, 100]);
        let output = converter.convert(&[&input]).unwrap();
        match output {
            Column::Float64(v) => assert_eq!(v, vec![10.0, 11.0, 60.0]),
            other => panic!("{other:?}"),
        }
    }
}
