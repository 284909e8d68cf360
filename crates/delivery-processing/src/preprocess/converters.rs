//! Best-effort column conversions used by normalization.
//!
//! Every converter keeps the series length and turns anything it cannot
//! interpret into a null.

use crate::error::Result;
use crate::utils::{epoch_to_millis, is_datetime_dtype, is_numeric_dtype, parse_numeric_string, parse_timestamp_millis};
use polars::prelude::*;

/// Coerce a series to Float64. Unparseable strings and NaN become null.
pub(crate) fn to_float64(series: &Series) -> Result<Series> {
    let values: Vec<Option<f64>> = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|opt| opt.and_then(parse_numeric_string))
            .collect(),
        dtype if is_numeric_dtype(dtype) => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|opt| opt.filter(|v| v.is_finite()))
            .collect(),
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|opt| opt.map(|b| if b { 1.0 } else { 0.0 }))
            .collect(),
        _ => vec![None; series.len()],
    };

    Ok(Series::new(series.name().clone(), values))
}

/// Parse a series into `Datetime(ms)`. Unparseable values become null.
pub(crate) fn to_datetime(series: &Series) -> Result<Series> {
    let target = DataType::Datetime(TimeUnit::Milliseconds, None);

    let millis: Vec<Option<i64>> = match series.dtype() {
        dtype if is_datetime_dtype(dtype) => return Ok(series.cast(&target)?),
        DataType::String => series
            .str()?
            .into_iter()
            .map(|opt| opt.and_then(parse_timestamp_millis))
            .collect(),
        DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|opt| opt.and_then(epoch_to_millis))
            .collect(),
        _ => vec![None; series.len()],
    };

    Ok(Series::new(series.name().clone(), millis).cast(&target)?)
}

/// Cast a categorical column to String without touching its values.
pub(crate) fn to_category_string(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::String {
        return Ok(series.clone());
    }
    Ok(series.cast(&DataType::String)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_null_at(series: &Series, idx: usize) -> bool {
        matches!(series.get(idx).unwrap(), AnyValue::Null)
    }

    #[test]
    fn test_to_float64_from_strings() {
        let series = Series::new("ATD".into(), &["12.5", "abc", "", "7", "NaN"]);
        let result = to_float64(&series).unwrap();

        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(result.len(), 5);
        assert_eq!(result.get(0).unwrap().try_extract::<f64>().unwrap(), 12.5);
        assert!(is_null_at(&result, 1));
        assert!(is_null_at(&result, 2));
        assert_eq!(result.get(3).unwrap().try_extract::<f64>().unwrap(), 7.0);
        assert!(is_null_at(&result, 4));
    }

    #[test]
    fn test_to_float64_from_integers() {
        let series = Series::new("ATD".into(), &[Some(10i64), None, Some(30)]);
        let result = to_float64(&series).unwrap();

        assert_eq!(result.dtype(), &DataType::Float64);
        assert_eq!(result.null_count(), 1);
        assert_eq!(result.get(2).unwrap().try_extract::<f64>().unwrap(), 30.0);
    }

    #[test]
    fn test_to_datetime_from_strings() {
        let series = Series::new(
            "ts".into(),
            &[Some("2024-01-01 10:00:00"), Some("garbage"), None],
        );
        let result = to_datetime(&series).unwrap();

        assert!(matches!(result.dtype(), DataType::Datetime(_, _)));
        assert_eq!(result.len(), 3);
        assert!(!is_null_at(&result, 0));
        assert!(is_null_at(&result, 1));
        assert!(is_null_at(&result, 2));
    }

    #[test]
    fn test_to_datetime_from_epoch_integers() {
        let series = Series::new("ts".into(), &[1_577_836_800i64, 42]);
        let result = to_datetime(&series).unwrap();

        assert!(matches!(result.dtype(), DataType::Datetime(_, _)));
        assert!(!is_null_at(&result, 0));
        assert!(is_null_at(&result, 1));
    }

    #[test]
    fn test_to_datetime_unsupported_dtype_is_all_null() {
        let series = Series::new("ts".into(), &[1.5f64, 2.5]);
        let result = to_datetime(&series).unwrap();
        assert_eq!(result.null_count(), 2);
    }

    #[test]
    fn test_to_category_string_from_numbers() {
        let series = Series::new("territory".into(), &[1i64, 2]);
        let result = to_category_string(&series).unwrap();
        assert_eq!(result.dtype(), &DataType::String);
        assert_eq!(result.str().unwrap().get(0), Some("1"));
    }
}
