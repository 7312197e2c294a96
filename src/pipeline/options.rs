use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::address::CellAddress;
use crate::data::filter::ColumnFilter;

/// Start cell used when a caller does not pick one.
pub const DEFAULT_START_CELL: CellAddress = CellAddress { column: 1, row: 7 };
/// Baseline window length (reads).
pub const DEFAULT_FIRST_N_READS: usize = 30;

pub fn default_metadata_labels() -> Vec<String> {
    vec!["Comment".to_string(), "Type".to_string()]
}

// ---------------------------------------------------------------------------
// Stage options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransposeOptions {
    /// Cell holding the label of the time row (`B8`).
    pub start_cell: CellAddress,
    /// Row labels dropped before transposing, matched case-insensitively
    /// (`["Comment", "Type"]`).
    pub metadata_row_labels: Vec<String>,
}

impl Default for TransposeOptions {
    fn default() -> Self {
        Self {
            start_cell: DEFAULT_START_CELL,
            metadata_row_labels: default_metadata_labels(),
        }
    }
}

/// How a well's baseline is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BaselinePolicy {
    /// Mean of the first `first_n_reads` samples.
    #[default]
    DivideByBaselineAverage,
    /// The first sample alone.
    DivideByT0,
}

/// Unit of plain numeric time cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Milliseconds => value / 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Baseline window (`30`). Must be at least 1.
    pub first_n_reads: usize,
    /// Inclusive bound on elapsed seconds; later rows are dropped (none).
    pub max_seconds: Option<f64>,
    /// Wells to keep (all).
    pub column_filter: Option<ColumnFilter>,
    /// Baseline policy (`DivideByBaselineAverage`).
    pub policy: BaselinePolicy,
    /// Unit of numeric time cells (`Seconds`).
    pub time_unit: TimeUnit,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            first_n_reads: DEFAULT_FIRST_N_READS,
            max_seconds: None,
            column_filter: None,
            policy: BaselinePolicy::default(),
            time_unit: TimeUnit::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline options
// ---------------------------------------------------------------------------

/// Every knob of a pipeline run, in one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub transpose: TransposeOptions,
    pub normalize: NormalizeOptions,
}

impl PipelineOptions {
    /// Load options from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
