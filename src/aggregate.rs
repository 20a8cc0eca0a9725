use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Collapses the values of one bin into a single value.
///
/// The engine only ever calls `aggregate` with a non-empty slice, in input
/// order. Implementations must be pure: identical input, identical output.
pub trait Aggregator: Send + Sync {
    fn aggregate(&self, values: &[f64]) -> f64;
}

impl<F> Aggregator for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn aggregate(&self, values: &[f64]) -> f64 {
        self(values)
    }
}

/// Built-in reducers.
///
/// The `Nan*` variants ignore NaN entries and return NaN when every value in
/// the bin is NaN.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Reducer {
    #[default]
    NanMedian,
    NanMean,
    NanSum,
    NanMin,
    NanMax,
    First,
    Last,
    /// Number of non-NaN values.
    Count,
}

impl Aggregator for Reducer {
    fn aggregate(&self, values: &[f64]) -> f64 {
        match self {
            Self::NanMedian => nan_median(values),
            Self::NanMean => {
                let (sum, n) = non_nan(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    f64::NAN
                } else {
                    sum / n as f64
                }
            }
            Self::NanSum => {
                let mut present = non_nan(values).peekable();
                if present.peek().is_none() {
                    f64::NAN
                } else {
                    present.sum()
                }
            }
            Self::NanMin => non_nan(values).reduce(f64::min).unwrap_or(f64::NAN),
            Self::NanMax => non_nan(values).reduce(f64::max).unwrap_or(f64::NAN),
            Self::First => values.first().copied().unwrap_or(f64::NAN),
            Self::Last => values.last().copied().unwrap_or(f64::NAN),
            Self::Count => non_nan(values).count() as f64,
        }
    }
}

fn non_nan(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Median of the non-NaN values; even counts average the two middle values.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = non_nan(values).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
