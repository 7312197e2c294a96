//! Plate-reader fluorescence pipeline: transpose an instrument export,
//! normalize each well against its baseline, then summarize first peak and
//! area under the curve.

pub mod data;
pub mod error;
pub mod pipeline;

pub use data::address::CellAddress;
pub use data::filter::ColumnFilter;
pub use data::model::{Cell, Grid, Temporal, Well};
pub use error::{AddressError, NormalizeError, PipelineError, ReduceError, TransposeError};
pub use pipeline::options::{
    BaselinePolicy, NormalizeOptions, PipelineOptions, TimeUnit, TransposeOptions,
};
pub use pipeline::{run_all, run_normalize, run_transpose, PipelineOutput};
