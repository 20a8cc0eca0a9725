use std::ops::Range;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    aggregate::{Aggregator, Reducer},
    binned::{BinnedTimeSeries, MaskedColumn},
    error::{ChronobinResult, InvalidParameterError},
    series::{self, SampledSeries},
    unit::{self, BinSize},
};

// ================================================================================================
// Engine
// ================================================================================================

/// Result of a downsampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct Downsampled {
    pub binned: BinnedTimeSeries,

    /// Columns left out of `binned` because their values are not numeric.
    pub skipped: Vec<SkippedColumn>,

    /// Number of input samples that fell into each bin.
    pub counts: Vec<usize>,
}

impl Downsampled {
    pub fn into_binned(self) -> BinnedTimeSeries {
        self.binned
    }

    /// Number of input samples that landed in some bin.
    pub fn kept(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// A column the engine could not reduce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkippedColumn {
    pub name: String,
    pub type_name: String,
}

/// Downsamples `series` into contiguous bins of width `bin_size`.
///
/// - `aggregator`: reduces the values of one bin, defaults to [`Reducer::NanMedian`].
/// - `origin`: start of bin 0, defaults to the first timestamp.
/// - `n_bins`: number of bins, defaults to `ceil((last - origin) / bin_size)`.
///
/// Bins are half-open. A sample on an interior edge belongs to the later bin;
/// samples before `origin` or at/after the end of the last bin are dropped.
/// Bins that receive no sample are masked in every column, and the aggregator
/// is never called for them. Quantity columns keep their unit. Opaque columns
/// are reported in [`Downsampled::skipped`].
///
/// # Errors
/// - `TypeConstraintError` if the series is empty, unsorted or ragged.
/// - `InvalidParameterError` if the bin size is below one nanosecond, if `n_bins`
///   must be derived but `origin` lies after the last sample, or if the window
///   leaves the representable timestamp range.
#[tracing::instrument(
    skip(series, aggregator),
    fields(width = %bin_size, samples = series.len())
)]
pub fn downsample<S>(
    series: &S,
    bin_size: BinSize,
    aggregator: Option<&dyn Aggregator>,
    origin: Option<DateTime<Utc>>,
    n_bins: Option<usize>,
) -> ChronobinResult<Downsampled>
where
    S: SampledSeries + ?Sized,
{
    series::validate(series)?;
    let time = series.timestamps();
    let aggregator = aggregator.unwrap_or(&Reducer::NanMedian);

    let origin = origin.unwrap_or(time[0]);
    let relative: Vec<i128> = time
        .iter()
        .map(|t| unit::delta_nanos(*t - origin))
        .collect();

    let width = bin_size.to_nanos();
    if width < 1 {
        return Err(InvalidParameterError::BinSizeBelowResolution(bin_size.to_string()).into());
    }

    let n_bins = match n_bins {
        Some(n) => n,
        None => default_bin_count(&relative, width, origin, time)?,
    };
    let grid = BinGrid {
        origin,
        width,
        n_bins,
    };
    let window_end = grid.edge(n_bins)?;

    let runs = grid.runs(&relative);
    let mut counts = vec![0; n_bins];
    for (bin, range) in &runs {
        counts[*bin] = range.len();
    }
    debug!(
        %origin,
        n_bins,
        kept = counts.iter().sum::<usize>(),
        occupied = runs.len(),
        "Computed bin window"
    );

    let mut binned = BinnedTimeSeries::new(grid.starts()?, window_end)?;
    let mut skipped = Vec::new();

    for column in series.columns() {
        let Some(values) = column.values.magnitudes() else {
            warn!(
                column = %column.name,
                type_name = column.values.type_name(),
                "Skipping column with non-numeric values"
            );
            skipped.push(SkippedColumn {
                name: column.name.clone(),
                type_name: column.values.type_name().to_string(),
            });
            continue;
        };

        let mut reduced = MaskedColumn::masked(n_bins, column.values.unit().cloned());
        for (bin, range) in &runs {
            reduced.set(*bin, aggregator.aggregate(&values[range.clone()]));
        }
        binned.set_column(&column.name, reduced)?;
    }

    Ok(Downsampled {
        binned,
        skipped,
        counts,
    })
}

/// Default window: enough bins to reach the last sample. A last sample sitting
/// exactly on the final edge is still outside the window.
fn default_bin_count(
    relative: &[i128],
    width: i128,
    origin: DateTime<Utc>,
    time: &[DateTime<Utc>],
) -> ChronobinResult<usize> {
    let last = relative.last().copied().unwrap_or_default();
    if last < 0 {
        let last_ts = time.last().copied().unwrap_or(origin);
        return Err(InvalidParameterError::OriginAfterLastSample {
            origin: origin.to_rfc3339(),
            last: last_ts.to_rfc3339(),
        }
        .into());
    }

    let n = last / width + i128::from(last % width != 0);
    usize::try_from(n).map_err(|_| {
        InvalidParameterError::WindowOverflow(format!("{n} bins exceed the addressable range"))
            .into()
    })
}

// ================================================================================================
// Bin Grid
// ================================================================================================

/// Edges `origin + j * width` for `j = 0..=n_bins`, on an integer nanosecond grid.
struct BinGrid {
    origin: DateTime<Utc>,
    width: i128,
    n_bins: usize,
}

impl BinGrid {
    fn edge_offset(&self, j: usize) -> Option<i128> {
        i128::try_from(j).ok()?.checked_mul(self.width)
    }

    fn edge(&self, j: usize) -> ChronobinResult<DateTime<Utc>> {
        self.edge_offset(j)
            .and_then(unit::nanos_to_delta)
            .and_then(|delta| self.origin.checked_add_signed(delta))
            .ok_or_else(|| {
                InvalidParameterError::WindowOverflow(format!(
                    "edge {j} of {} bins from {}",
                    self.n_bins, self.origin
                ))
                .into()
            })
    }

    fn starts(&self) -> ChronobinResult<Vec<DateTime<Utc>>> {
        (0..self.n_bins).map(|j| self.edge(j)).collect()
    }

    /// Bin of a sample, or `None` if it lies outside `[edge(0), edge(n_bins))`.
    ///
    /// This is the largest `j` with `edge(j) <= t`.
    fn locate(&self, relative: i128) -> Option<usize> {
        let end = self.edge_offset(self.n_bins)?;
        if relative < 0 || relative >= end {
            return None;
        }
        usize::try_from(relative / self.width).ok()
    }

    /// Groups the samples of each occupied bin into one run of input indices.
    ///
    /// Relies on the input being time-sorted: kept samples then form one
    /// contiguous block and every bin's samples are adjacent.
    fn runs(&self, relative: &[i128]) -> Vec<(usize, Range<usize>)> {
        let located = relative
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| self.locate(t).map(|bin| (i, bin)));

        let mut runs = Vec::new();
        for (bin, mut group) in &located.chunk_by(|&(_, bin)| bin) {
            let Some((first, _)) = group.next() else {
                continue;
            };
            let last = group.last().map_or(first, |(i, _)| i);
            runs.push((bin, first..last + 1));
        }

        debug_assert!(
            runs.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1.end == w[1].1.start),
            "Runs must be ordered and contiguous"
        );
        runs
    }
}

// ================================================================================================
// Configuration
// ================================================================================================

/// Serializable downsampling parameters.
///
/// # Example
/// ```
/// # use chronobin::{DownsampleConfig, Reducer};
/// let config: DownsampleConfig = serde_json::from_str(
///     r#"{ "bin_size": "2s", "n_bins": 3, "reducer": "nan_mean" }"#,
/// )
/// .unwrap();
/// assert_eq!(config.bin_size.to_seconds(), 2.0);
/// assert_eq!(config.reducer, Reducer::NanMean);
/// assert!(config.origin.is_none());
/// ```
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownsampleConfig {
    /// Bin width, e.g. `"30s"`, `"1.5 h"` or `"1h 30m"`.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub bin_size: BinSize,

    /// Start of bin 0. Defaults to the first sample.
    #[serde(default)]
    pub origin: Option<DateTime<Utc>>,

    /// Number of bins. Defaults to the count needed to reach the last sample.
    #[serde(default)]
    pub n_bins: Option<usize>,

    #[serde(default)]
    pub reducer: Reducer,
}

impl DownsampleConfig {
    pub fn new(bin_size: BinSize) -> Self {
        Self {
            bin_size,
            origin: None,
            n_bins: None,
            reducer: Reducer::default(),
        }
    }

    pub fn with_origin(self, origin: DateTime<Utc>) -> Self {
        Self {
            origin: Some(origin),
            ..self
        }
    }

    pub fn with_n_bins(self, n_bins: usize) -> Self {
        Self {
            n_bins: Some(n_bins),
            ..self
        }
    }

    pub fn with_reducer(self, reducer: Reducer) -> Self {
        Self { reducer, ..self }
    }

    pub fn run<S: SampledSeries + ?Sized>(&self, series: &S) -> ChronobinResult<Downsampled> {
        downsample(
            series,
            self.bin_size,
            Some(&self.reducer),
            self.origin,
            self.n_bins,
        )
    }
}
