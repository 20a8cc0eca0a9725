use std::collections::HashMap;

use polars::prelude::{
    Column, DataFrame, DataType, IntoLazy, NamedFrom, Series, TimeUnit as PlTimeUnit, TimeZone,
    col, df,
};

use crate::{
    binned::BinnedTimeSeries,
    error::{ChronobinError, ChronobinResult, DataError},
    series::{ColumnValues, TimeSeries},
    unit::Unit,
};

pub const TIME_BIN_START: &str = "time_bin_start";
pub const TIME_BIN_END: &str = "time_bin_end";

fn polars_to_chronobin_error(context: &str, e: polars::error::PolarsError) -> ChronobinError {
    ChronobinError::Data(DataError::DataFrame(format!("{context}: {e}")))
}

fn utc_micros() -> DataType {
    DataType::Datetime(PlTimeUnit::Microseconds, Some(TimeZone::UTC))
}

impl TimeSeries {
    /// Reads a time series out of a `DataFrame`.
    ///
    /// `time_col` must be a `Datetime` column without nulls, sorted ascending.
    /// Integer and float columns become numeric columns (nulls read as NaN),
    /// tagged with a unit when `units` names one. Every other dtype becomes an
    /// opaque column holding the textual form of its values.
    pub fn from_df(
        df: &DataFrame,
        time_col: &str,
        units: &HashMap<String, Unit>,
    ) -> ChronobinResult<Self> {
        let time_column = df
            .column(time_col)
            .map_err(|_| DataError::MissingColumn(time_col.to_string()))?;

        if !matches!(time_column.dtype(), DataType::Datetime(_, _)) {
            return Err(DataError::UnsupportedTimeDtype {
                column: time_col.to_string(),
                dtype: time_column.dtype().to_string(),
            }
            .into());
        }

        let time = time_column
            .datetime()
            .map_err(|e| polars_to_chronobin_error("Reading time column", e))?
            .as_datetime_iter()
            .enumerate()
            .map(|(row, ts)| {
                ts.map(|naive| naive.and_utc()).ok_or_else(|| {
                    DataError::NullTimestamp {
                        column: time_col.to_string(),
                        row,
                    }
                    .into()
                })
            })
            .collect::<ChronobinResult<Vec<_>>>()?;

        let mut series = TimeSeries::new(time)?;
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == time_col {
                continue;
            }
            let values = read_values(column, units.get(name))?;
            series = series.with_column(name, values)?;
        }
        Ok(series)
    }
}

fn read_values(column: &Column, unit: Option<&Unit>) -> ChronobinResult<ColumnValues> {
    let numeric = matches!(
        column.dtype(),
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    );

    if !numeric {
        let values = (0..column.len())
            .map(|i| column.get(i).map(|av| av.to_string()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| polars_to_chronobin_error(column.name().as_str(), e))?;
        return Ok(ColumnValues::Opaque {
            type_name: column.dtype().to_string(),
            values,
        });
    }

    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| polars_to_chronobin_error(column.name().as_str(), e))?;
    let values: Vec<f64> = casted
        .f64()
        .map_err(|e| polars_to_chronobin_error(column.name().as_str(), e))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    Ok(match unit {
        Some(unit) => ColumnValues::Quantity {
            values,
            unit: unit.clone(),
        },
        None => ColumnValues::Float(values),
    })
}

impl BinnedTimeSeries {
    /// Renders the binned series as a `DataFrame`.
    ///
    /// Layout: `time_bin_start` and `time_bin_end` (UTC microsecond datetimes),
    /// then one nullable `Float64` column per value column, masked bins as null.
    /// Units are not representable in the frame; read them from
    /// [`BinnedTimeSeries::column`].
    pub fn to_df(&self) -> ChronobinResult<DataFrame> {
        let starts: Vec<i64> = self
            .time_bin_start()
            .iter()
            .map(|t| t.timestamp_micros())
            .collect();
        let ends: Vec<i64> = self.bins().map(|b| b.end.timestamp_micros()).collect();

        let mut df = df![
            TIME_BIN_START => starts,
            TIME_BIN_END => ends,
        ]
        .map_err(|e| polars_to_chronobin_error("Building bin columns", e))?;

        for (name, column) in self.columns() {
            if name == TIME_BIN_START || name == TIME_BIN_END {
                return Err(DataError::DataFrame(format!(
                    "Column name '{name}' collides with a bin boundary column"
                ))
                .into());
            }
            df.with_column(Series::new(name.into(), column.values().to_vec()))
                .map_err(|e| polars_to_chronobin_error(name, e))?;
        }

        df.lazy()
            .with_columns([
                col(TIME_BIN_START).cast(utc_micros()),
                col(TIME_BIN_END).cast(utc_micros()),
            ])
            .collect()
            .map_err(|e| polars_to_chronobin_error("Casting bin columns", e))
    }
}
