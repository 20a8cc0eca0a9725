use thiserror::Error;

pub type ChronobinResult<T> = Result<T, ChronobinError>;

#[derive(Debug, Error)]
pub enum ChronobinError {
    #[error(transparent)]
    TypeConstraint(#[from] TypeConstraintError),

    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// The input does not satisfy the time series contract.
#[derive(Debug, Error, PartialEq)]
pub enum TypeConstraintError {
    #[error("Time series is empty")]
    EmptySeries,

    #[error("Time series is not sorted: sample {index} ({current}) precedes sample {prev} ({previous})")]
    Unsorted {
        index: usize,
        prev: usize,
        current: String,
        previous: String,
    },

    #[error("Column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name: '{0}'")]
    DuplicateColumn(String),

    #[error("Reserved column name: '{0}'")]
    ReservedColumn(String),

    #[error("Keep mask has {found} entries, expected {expected}")]
    MaskLength { expected: usize, found: usize },

    #[error("Bin starts must be strictly increasing: bin {index} starts at {start}")]
    NonIncreasingBins { index: usize, start: String },
}

/// A caller-supplied parameter is out of range.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidParameterError {
    #[error("Bin size must be positive and finite, got {0}")]
    NonPositiveBinSize(String),

    #[error("Bin size {0} is below the nanosecond resolution of the bin grid")]
    BinSizeBelowResolution(String),

    #[error("Invalid bin size string: '{0}'")]
    InvalidBinSize(String),

    #[error("Origin {origin} lies after the last sample {last}; pass n_bins explicitly")]
    OriginAfterLastSample { origin: String, last: String },

    #[error("Bin window does not fit in the timestamp range: {0}")]
    WindowOverflow(String),
}

/// Errors raised while moving data between containers.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Missing column: '{0}'")]
    MissingColumn(String),

    #[error("Column '{column}' has unsupported dtype {dtype} for timestamps")]
    UnsupportedTimeDtype { column: String, dtype: String },

    #[error("Null timestamp in column '{column}' at row {row}")]
    NullTimestamp { column: String, row: usize },
}
