use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressError {
    #[error("invalid cell address '{0}': expected letters followed by a row number, e.g. B8")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransposeError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("start cell {address} is outside the {height}x{width} grid")]
    AddressOutOfBounds {
        address: String,
        height: usize,
        width: usize,
    },
    #[error("no data rows remain below {address} after removing metadata rows")]
    EmptyBlock { address: String },
    #[error("well '{0}' appears more than once")]
    DuplicateWell(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("time does not increase at sample {row}: {elapsed}s follows {previous}s")]
    NonMonotonicTime {
        row: usize,
        previous: f64,
        elapsed: f64,
    },
    #[error("invalid well number range '{0}'")]
    InvalidRange(String),
    #[error("invalid well letters '{0}'")]
    InvalidLetters(String),
    #[error("column filter matched none of the {available} wells")]
    NoWellsSelected { available: usize },
    #[error("time column has no usable samples")]
    NoTimeSamples,
    #[error("well {well} has a non-numeric value at sample {row}")]
    NonNumericValue { well: String, row: usize },
    #[error("first_n_reads must be at least 1")]
    InvalidFirstNReads,
    #[error("max_seconds must be a positive number, got {0}")]
    InvalidMaxSeconds(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReduceError {
    #[error("well {0} has no samples to summarize")]
    EmptyWell(String),
}

/// First failure of a pipeline run, tagged with the stage that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("transpose failed: {0}")]
    Transpose(#[from] TransposeError),
    #[error("normalize failed: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("first peak / AUC failed: {0}")]
    Reduce(#[from] ReduceError),
}

impl From<AddressError> for PipelineError {
    fn from(e: AddressError) -> Self {
        PipelineError::Transpose(TransposeError::Address(e))
    }
}

impl PipelineError {
    /// Whether this failure means an internal invariant broke, as opposed to
    /// bad input or configuration.
    pub fn is_defect(&self) -> bool {
        matches!(self, PipelineError::Reduce(ReduceError::EmptyWell(_)))
    }
}
