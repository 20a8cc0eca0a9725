use std::{fmt, str::FromStr};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ChronobinError, ChronobinResult, InvalidParameterError};

const NANOS_PER_SECOND: f64 = 1e9;
const NANOS_PER_SECOND_I128: i128 = 1_000_000_000;

/// Physical unit attached to the magnitudes of a quantity column (e.g. `"Jy"`, `"mag"`).
///
/// The label is opaque to the binning engine: it is carried from input to output
/// unchanged and never used for conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(String);

impl Unit {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Unit {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Time units accepted for bin sizes.
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    IntoStaticStr,
)]
pub enum TimeUnit {
    #[strum(to_string = "ns", serialize = "nanosecond", serialize = "nanoseconds")]
    Nanosecond,
    #[strum(to_string = "us", serialize = "µs", serialize = "microsecond", serialize = "microseconds")]
    Microsecond,
    #[strum(to_string = "ms", serialize = "millisecond", serialize = "milliseconds")]
    Millisecond,
    #[strum(to_string = "s", serialize = "sec", serialize = "second", serialize = "seconds")]
    Second,
    #[strum(to_string = "min", serialize = "minute", serialize = "minutes")]
    Minute,
    #[strum(to_string = "h", serialize = "hr", serialize = "hour", serialize = "hours")]
    Hour,
    #[strum(to_string = "d", serialize = "day", serialize = "days")]
    Day,
    #[strum(to_string = "w", serialize = "week", serialize = "weeks")]
    Week,
}

impl TimeUnit {
    /// Number of seconds in one unit.
    pub fn seconds_factor(self) -> f64 {
        match self {
            Self::Nanosecond => 1e-9,
            Self::Microsecond => 1e-6,
            Self::Millisecond => 1e-3,
            Self::Second => 1.0,
            Self::Minute => 60.0,
            Self::Hour => 3_600.0,
            Self::Day => 86_400.0,
            Self::Week => 604_800.0,
        }
    }
}

/// Width of a time bin: a strictly positive, finite duration.
///
/// # Parsing
/// `"2s"`, `"2 s"`, `"1.5h"` and `"500ms"` are read as a magnitude followed by a
/// [`TimeUnit`]. Anything else is handed to `humantime` (e.g. `"1h 30m"`) and
/// normalised to seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSize {
    value: f64,
    unit: TimeUnit,
}

impl BinSize {
    /// # Errors
    /// `InvalidParameterError::NonPositiveBinSize` if the duration is not strictly
    /// positive and finite.
    pub fn new(value: f64, unit: TimeUnit) -> ChronobinResult<Self> {
        let seconds = value * unit.seconds_factor();
        if !value.is_finite() || !seconds.is_finite() || seconds <= 0.0 {
            return Err(InvalidParameterError::NonPositiveBinSize(format!("{value}{unit}")).into());
        }
        Ok(Self { value, unit })
    }

    pub fn seconds(value: f64) -> ChronobinResult<Self> {
        Self::new(value, TimeUnit::Second)
    }

    pub fn minutes(value: f64) -> ChronobinResult<Self> {
        Self::new(value, TimeUnit::Minute)
    }

    pub fn hours(value: f64) -> ChronobinResult<Self> {
        Self::new(value, TimeUnit::Hour)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Canonical magnitude in seconds.
    pub fn to_seconds(&self) -> f64 {
        self.value * self.unit.seconds_factor()
    }

    /// Width rounded to whole nanoseconds, the resolution of the bin grid.
    pub fn to_nanos(&self) -> i128 {
        (self.to_seconds() * NANOS_PER_SECOND).round() as i128
    }
}

impl fmt::Display for BinSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

impl FromStr for BinSize {
    type Err = ChronobinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_alphabetic() || c == 'µ')
            .unwrap_or(s.len());
        let (magnitude, unit) = s.split_at(split);

        if let (Ok(value), Ok(unit)) = (magnitude.trim().parse::<f64>(), unit.trim().parse::<TimeUnit>()) {
            return Self::new(value, unit);
        }

        let duration = humantime::parse_duration(s)
            .map_err(|_| InvalidParameterError::InvalidBinSize(s.to_string()))?;
        Self::seconds(duration.as_secs_f64())
    }
}

impl TryFrom<TimeDelta> for BinSize {
    type Error = ChronobinError;

    fn try_from(value: TimeDelta) -> Result<Self, Self::Error> {
        Self::seconds(delta_nanos(value) as f64 / NANOS_PER_SECOND)
    }
}

impl TryFrom<std::time::Duration> for BinSize {
    type Error = ChronobinError;

    fn try_from(value: std::time::Duration) -> Result<Self, Self::Error> {
        Self::seconds(value.as_secs_f64())
    }
}

/// Signed length of `delta` in nanoseconds.
pub(crate) fn delta_nanos(delta: TimeDelta) -> i128 {
    i128::from(delta.num_seconds()) * NANOS_PER_SECOND_I128 + i128::from(delta.subsec_nanos())
}

/// Inverse of [`delta_nanos`]. `None` when the offset does not fit in a `TimeDelta`.
pub(crate) fn nanos_to_delta(nanos: i128) -> Option<TimeDelta> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND_I128)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND_I128)).ok()?;
    TimeDelta::new(secs, subsec)
}
