//! Fixed-width time-bin downsampling.
//!
//! [`downsample`] splits an irregularly sampled [`TimeSeries`] into contiguous,
//! equal-width, half-open bins and reduces every numeric column per bin with an
//! [`Aggregator`]. Bins that receive no sample are masked instead of filled.
//!
//! ```
//! # use chrono::{TimeDelta, TimeZone, Utc};
//! # use chronobin::{BinSize, TimeSeries, downsample};
//! let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
//! let time = [0, 1000, 2000, 3500, 4000]
//!     .map(|ms| t0 + TimeDelta::milliseconds(ms))
//!     .to_vec();
//! let series = TimeSeries::new(time)?
//!     .with_quantity_column("flux", vec![10.0, 20.0, 30.0, 40.0, 50.0], "Jy")?;
//!
//! let out = downsample(&series, BinSize::seconds(2.0)?, None, None, Some(3))?;
//! let flux = out.binned.column("flux").unwrap();
//! assert_eq!(flux.values(), &[Some(15.0), Some(35.0), Some(50.0)]);
//! assert_eq!(flux.unit().map(|u| u.as_str()), Some("Jy"));
//! # Ok::<(), chronobin::error::ChronobinError>(())
//! ```

pub mod aggregate;
pub mod binned;
pub mod downsample;
pub mod error;
pub mod frame;
pub mod series;
pub mod unit;

pub use aggregate::{Aggregator, Reducer};
pub use binned::{Bin, BinnedTimeSeries, MaskedColumn};
pub use downsample::{DownsampleConfig, Downsampled, SkippedColumn, downsample};
pub use error::{ChronobinError, ChronobinResult};
pub use series::{ColumnValues, SampledSeries, SeriesColumn, TimeSeries};
pub use unit::{BinSize, TimeUnit, Unit};
