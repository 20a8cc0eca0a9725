use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ChronobinResult, TypeConstraintError},
    unit::Unit,
};

/// One output interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bin {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bin {
    /// Half-open membership test.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Per-bin values of one column. `None` marks a bin without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedColumn {
    values: Vec<Option<f64>>,
    unit: Option<Unit>,
}

impl MaskedColumn {
    /// A column of `len` bins, all masked.
    pub fn masked(len: usize, unit: Option<Unit>) -> Self {
        Self {
            values: vec![None; len],
            unit,
        }
    }

    pub fn from_values(values: Vec<Option<f64>>, unit: Option<Unit>) -> Self {
        Self { values, unit }
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = Some(value);
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn is_masked(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mask_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// A regularly binned series.
///
/// Bins are described by their start times plus one trailing end time: the end
/// of bin `i` is the start of bin `i + 1`, and the last bin ends at
/// [`BinnedTimeSeries::time_bin_end`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedTimeSeries {
    time_bin_start: Vec<DateTime<Utc>>,
    time_bin_end: DateTime<Utc>,
    columns: Vec<(String, MaskedColumn)>,
}

impl BinnedTimeSeries {
    /// # Errors
    /// `TypeConstraintError::NonIncreasingBins` unless the starts are strictly
    /// increasing and the end lies after the last start.
    pub fn new(
        time_bin_start: Vec<DateTime<Utc>>,
        time_bin_end: DateTime<Utc>,
    ) -> ChronobinResult<Self> {
        let bounds = time_bin_start.iter().chain(std::iter::once(&time_bin_end));
        if let Some(index) = bounds
            .clone()
            .zip(bounds.skip(1))
            .position(|(a, b)| b <= a)
        {
            let start = time_bin_start
                .get(index + 1)
                .unwrap_or(&time_bin_end)
                .to_rfc3339();
            return Err(TypeConstraintError::NonIncreasingBins {
                index: index + 1,
                start,
            }
            .into());
        }

        Ok(Self {
            time_bin_start,
            time_bin_end,
            columns: Vec::new(),
        })
    }

    pub fn n_bins(&self) -> usize {
        self.time_bin_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_bin_start.is_empty()
    }

    pub fn time_bin_start(&self) -> &[DateTime<Utc>] {
        &self.time_bin_start
    }

    pub fn time_bin_end(&self) -> DateTime<Utc> {
        self.time_bin_end
    }

    pub fn bin_start(&self, index: usize) -> Option<DateTime<Utc>> {
        self.time_bin_start.get(index).copied()
    }

    pub fn bin_end(&self, index: usize) -> Option<DateTime<Utc>> {
        if index >= self.n_bins() {
            return None;
        }
        Some(
            self.time_bin_start
                .get(index + 1)
                .copied()
                .unwrap_or(self.time_bin_end),
        )
    }

    pub fn bins(&self) -> impl Iterator<Item = Bin> + '_ {
        (0..self.n_bins()).filter_map(|index| {
            Some(Bin {
                index,
                start: self.bin_start(index)?,
                end: self.bin_end(index)?,
            })
        })
    }

    /// Sets a named column, replacing any existing column of that name in place.
    ///
    /// # Errors
    /// `TypeConstraintError::LengthMismatch` if the column does not have one entry
    /// per bin.
    pub fn set_column(&mut self, name: &str, column: MaskedColumn) -> ChronobinResult<()> {
        if column.len() != self.n_bins() {
            return Err(TypeConstraintError::LengthMismatch {
                column: name.to_string(),
                expected: self.n_bins(),
                found: column.len(),
            }
            .into());
        }

        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&MaskedColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &MaskedColumn)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}
