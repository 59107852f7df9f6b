//! Datetime converter: reconstructs timestamps from one or more numeric
//! columns (e.g. whole seconds plus sub-second ticks), each scaled to
//! seconds by a per-column unit factor and added to an epoch.
use chrono::{DateTime, Duration, Utc};

use crate::column::Column;
use crate::convert::Converter;
use crate::error::ConversionError;

/// Combines `units.len()` input columns into one [`Column::Datetime`]
/// column: `timestamp[row] = since + sum(inputs[j][row] * units[j] seconds)`.
///
/// A single-column binding with `units = [1.0]` is an ordinary
/// seconds-since-epoch conversion; a two-column binding with
/// `units = [1.0, 1e-6]` combines whole seconds and microsecond ticks.
#[derive(Clone, Debug)]
pub struct DatetimeConverter {
    since: DateTime<Utc>,
    units: Vec<f64>,
}

impl DatetimeConverter {
    pub fn new(since: DateTime<Utc>, units: Vec<f64>) -> Self {
        Self { since, units }
    }
}

impl Converter for DatetimeConverter {
    fn convert(&self, inputs: &[&Column]) -> Result<Column, ConversionError> {
        if inputs.len() != self.units.len() {
            return Err(ConversionError::UnitMismatch(self.units.len(), inputs.len()));
        }

        let columns: Vec<Vec<f64>> = inputs
            .iter()
            .map(|c| c.to_f64_vec().ok_or_else(|| ConversionError::UnitMismatch(self.units.len(), inputs.len())))
            .collect::<Result<_, _>>()?;

        let n_rows = columns.first().map(Vec::len).unwrap_or(0);
        let mut timestamps = Vec::with_capacity(n_rows);
        for row in 0..n_rows {
            let total_seconds: f64 = columns
                .iter()
                .zip(&self.units)
                .map(|(col, unit)| col[row] * unit)
                .sum();
            let nanos = (total_seconds * 1e9).round() as i64;
            timestamps.push(self.since + Duration::nanoseconds(nanos));
        }

        Ok(Column::Datetime(timestamps))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::column::Column;

    #[test]
    fn combines_seconds_and_microsecond_columns() {
        let since = DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let converter = DatetimeConverter::new(since, vec![1.0, 1e-6]);

        let seconds = Column::UInt32(vec![10]);
        let micros = Column::UInt32(vec![500_000]);
        let output = converter.convert(&[&seconds, &micros]).unwrap();

        match output {
            Column::Datetime(v) => {
                assert_eq!(v[0], since + Duration::milliseconds(10_500));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn unit_column_mismatch_is_fatal() {
        let since = Utc::now();
        let converter = DatetimeConverter::new(since, vec![1.0, 1.0]);
        let seconds = Column::UInt32(vec![1]);
        assert!(converter.convert(&[&seconds]).is_err());
    }
}
