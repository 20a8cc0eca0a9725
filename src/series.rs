use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ChronobinResult, TypeConstraintError},
    unit::Unit,
};

/// Name of the implicit timestamp column. Value columns may not use it.
pub const TIME_COLUMN: &str = "time";

/// Read access to an irregularly sampled, time-sorted series.
///
/// Implementors promise one timestamp per sample and one value per sample in
/// every column. The binning engine re-checks this contract (and the sort order)
/// before touching the data, so a foreign container that breaks it yields a
/// `TypeConstraintError` instead of silently wrong bins.
pub trait SampledSeries {
    fn timestamps(&self) -> &[DateTime<Utc>];

    /// Value columns in their display order. The time column is not included.
    fn columns(&self) -> &[SeriesColumn];

    fn len(&self) -> usize {
        self.timestamps().len()
    }

    fn is_empty(&self) -> bool {
        self.timestamps().is_empty()
    }
}

/// A named column of per-sample values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumn {
    pub name: String,
    pub values: ColumnValues,
}

/// Typed storage of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    /// Plain numeric magnitudes.
    Float(Vec<f64>),

    /// Numeric magnitudes tagged with a physical unit.
    Quantity { values: Vec<f64>, unit: Unit },

    /// A column the engine cannot reduce (strings, nested values, ...).
    /// Values are kept in their textual form.
    Opaque { type_name: String, values: Vec<String> },
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(values) | Self::Quantity { values, .. } => values.len(),
            Self::Opaque { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric magnitudes, if the column is numeric or unit-tagged numeric.
    pub fn magnitudes(&self) -> Option<&[f64]> {
        match self {
            Self::Float(values) | Self::Quantity { values, .. } => Some(values.as_slice()),
            Self::Opaque { .. } => None,
        }
    }

    pub fn unit(&self) -> Option<&Unit> {
        match self {
            Self::Quantity { unit, .. } => Some(unit),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Float(_) => "float",
            Self::Quantity { .. } => "quantity",
            Self::Opaque { type_name, .. } => type_name,
        }
    }

    fn select(&self, keep: &[bool]) -> Self {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter_map(|(v, &k)| k.then(|| v.clone()))
                .collect()
        }

        match self {
            Self::Float(values) => Self::Float(pick(values, keep)),
            Self::Quantity { values, unit } => Self::Quantity {
                values: pick(values, keep),
                unit: unit.clone(),
            },
            Self::Opaque { type_name, values } => Self::Opaque {
                type_name: type_name.clone(),
                values: pick(values, keep),
            },
        }
    }
}

/// In-memory time series: sorted timestamps plus ordered value columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    time: Vec<DateTime<Utc>>,
    columns: Vec<SeriesColumn>,
}

impl TimeSeries {
    /// # Errors
    /// `TypeConstraintError::Unsorted` if `time` is not ascending. Equal
    /// neighbouring timestamps are accepted.
    pub fn new(time: Vec<DateTime<Utc>>) -> ChronobinResult<Self> {
        check_sorted(&time)?;
        Ok(Self {
            time,
            columns: Vec::new(),
        })
    }

    pub fn with_float_column(self, name: &str, values: Vec<f64>) -> ChronobinResult<Self> {
        self.with_column(name, ColumnValues::Float(values))
    }

    pub fn with_quantity_column(
        self,
        name: &str,
        values: Vec<f64>,
        unit: impl Into<Unit>,
    ) -> ChronobinResult<Self> {
        self.with_column(
            name,
            ColumnValues::Quantity {
                values,
                unit: unit.into(),
            },
        )
    }

    pub fn with_opaque_column(
        self,
        name: &str,
        type_name: &str,
        values: Vec<String>,
    ) -> ChronobinResult<Self> {
        self.with_column(
            name,
            ColumnValues::Opaque {
                type_name: type_name.to_string(),
                values,
            },
        )
    }

    /// Appends a column after the existing ones.
    ///
    /// # Errors
    /// Fails if the name is reserved or already taken, or if the column length
    /// differs from the number of timestamps.
    pub fn with_column(mut self, name: &str, values: ColumnValues) -> ChronobinResult<Self> {
        if name == TIME_COLUMN {
            return Err(TypeConstraintError::ReservedColumn(name.to_string()).into());
        }
        if self.columns.iter().any(|c| c.name == name) {
            return Err(TypeConstraintError::DuplicateColumn(name.to_string()).into());
        }
        if values.len() != self.time.len() {
            return Err(TypeConstraintError::LengthMismatch {
                column: name.to_string(),
                expected: self.time.len(),
                found: values.len(),
            }
            .into());
        }
        self.columns.push(SeriesColumn {
            name: name.to_string(),
            values,
        });
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the subset of samples whose `keep` flag is set, with every column
    /// filtered alike.
    pub fn filter(&self, keep: &[bool]) -> ChronobinResult<Self> {
        if keep.len() != self.time.len() {
            return Err(TypeConstraintError::MaskLength {
                expected: self.time.len(),
                found: keep.len(),
            }
            .into());
        }

        let time = self
            .time
            .iter()
            .zip(keep)
            .filter_map(|(t, &k)| k.then_some(*t))
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|c| SeriesColumn {
                name: c.name.clone(),
                values: c.values.select(keep),
            })
            .collect();

        Ok(Self { time, columns })
    }
}

impl SampledSeries for TimeSeries {
    fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    fn columns(&self) -> &[SeriesColumn] {
        &self.columns
    }
}

/// Checks the full read contract: non-empty, time-sorted and rectangular.
pub(crate) fn validate<S: SampledSeries + ?Sized>(series: &S) -> ChronobinResult<()> {
    let time = series.timestamps();
    if time.is_empty() {
        return Err(TypeConstraintError::EmptySeries.into());
    }
    check_sorted(time)?;

    let mut seen = HashSet::new();
    for column in series.columns() {
        if column.name == TIME_COLUMN {
            return Err(TypeConstraintError::ReservedColumn(column.name.clone()).into());
        }
        if !seen.insert(column.name.as_str()) {
            return Err(TypeConstraintError::DuplicateColumn(column.name.clone()).into());
        }
        if column.values.len() != time.len() {
            return Err(TypeConstraintError::LengthMismatch {
                column: column.name.clone(),
                expected: time.len(),
                found: column.values.len(),
            }
            .into());
        }
    }
    Ok(())
}

fn check_sorted(time: &[DateTime<Utc>]) -> ChronobinResult<()> {
    match time.windows(2).position(|w| w[1] < w[0]) {
        Some(prev) => Err(TypeConstraintError::Unsorted {
            index: prev + 1,
            prev,
            current: time[prev + 1].to_rfc3339(),
            previous: time[prev].to_rfc3339(),
        }
        .into()),
        None => Ok(()),
    }
}
