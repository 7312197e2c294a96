//! Processing layer: the three stages and their composition.
//!
//! ```text
//!   Grid (typed cells)
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ transpose │  block at start cell → TransposedTable
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ normalize │  elapsed seconds, baseline → NormalizedTable (+ skipped wells)
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │  reduce   │  first peak / AUC → FpAucResult
//!   └───────────┘
//! ```
//!
//! Every stage takes its input by reference and builds a new value, so one
//! run never shares state with another.

pub mod normalize;
pub mod options;
pub mod reduce;
pub mod transpose;

use log::{debug, error, warn};

use crate::data::model::Grid;
use crate::error::PipelineError;
use normalize::NormalizeOutput;
use options::PipelineOptions;
use reduce::FpAucResult;
use transpose::TransposedTable;

/// Every artifact of a full run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub transposed: TransposedTable,
    pub normalized: NormalizeOutput,
    pub summary: FpAucResult,
}

fn log_failure(err: PipelineError) -> PipelineError {
    if err.is_defect() {
        error!("internal consistency error: {err}");
    } else {
        warn!("{err}");
    }
    err
}

fn transpose_stage(
    grid: &Grid,
    opts: &PipelineOptions,
) -> Result<TransposedTable, PipelineError> {
    Ok(transpose::transpose(grid, &opts.transpose)?)
}

fn normalize_stage(
    grid: &Grid,
    opts: &PipelineOptions,
) -> Result<(TransposedTable, NormalizeOutput), PipelineError> {
    let transposed = transpose_stage(grid, opts)?;
    let normalized = normalize::normalize(&transposed, &opts.normalize)?;
    Ok((transposed, normalized))
}

/// Transpose only.
pub fn run_transpose(
    grid: &Grid,
    opts: &PipelineOptions,
) -> Result<TransposedTable, PipelineError> {
    debug!("pipeline: transpose");
    transpose_stage(grid, opts).map_err(log_failure)
}

/// Transpose, then normalize.
pub fn run_normalize(
    grid: &Grid,
    opts: &PipelineOptions,
) -> Result<NormalizeOutput, PipelineError> {
    debug!("pipeline: transpose + normalize");
    normalize_stage(grid, opts)
        .map(|(_, normalized)| normalized)
        .map_err(log_failure)
}

/// Transpose, normalize, then first peak / AUC.
pub fn run_all(grid: &Grid, opts: &PipelineOptions) -> Result<PipelineOutput, PipelineError> {
    debug!("pipeline: transpose + normalize + first peak / AUC");
    let run = || -> Result<PipelineOutput, PipelineError> {
        let (transposed, normalized) = normalize_stage(grid, opts)?;
        let summary = reduce::reduce(&normalized.table)?;
        Ok(PipelineOutput {
            transposed,
            normalized,
            summary,
        })
    };
    run().map_err(log_failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::address::CellAddress;
    use crate::data::model::Cell;
    use crate::error::{NormalizeError, TransposeError};

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn export() -> Grid {
        Grid::new(vec![
            vec![Cell::text("Plate reader export")],
            vec![Cell::Empty, Cell::text("time"), n(0.0), n(10.0), n(20.0), n(30.0)],
            vec![Cell::Empty, Cell::text("Comment"), Cell::text("lid on")],
            vec![Cell::Empty, Cell::text("A1"), n(100.0), n(110.0), n(120.0), n(130.0)],
            vec![Cell::Empty, Cell::text("A2"), n(200.0), n(0.0), n(0.0), n(0.0)],
            vec![Cell::Empty, Cell::text("A3"), n(0.0), n(5.0), n(5.0), n(5.0)],
        ])
    }

    fn options() -> PipelineOptions {
        let mut opts = PipelineOptions::default();
        opts.transpose.start_cell = CellAddress::parse("B2").unwrap();
        opts.normalize.first_n_reads = 1;
        opts
    }

    #[test]
    fn full_run_matches_hand_computation() {
        let out = run_all(&export(), &options()).unwrap();
        assert_eq!(out.transposed.well_labels(), ["A1", "A2", "A3"]);
        assert_eq!(out.normalized.skipped_wells, ["A3"]);

        let a1 = out.summary.get("A1").unwrap();
        assert!((a1.first_peak - 0.3).abs() < 1e-12);
        assert!((a1.auc - 0.6).abs() < 1e-12);
        let a2 = out.summary.get("A2").unwrap();
        assert_eq!((a2.first_peak, a2.auc), (0.0, -3.0));
        assert!(out.summary.get("A3").is_none());
    }

    #[test]
    fn max_seconds_applies_before_reduction() {
        let mut opts = options();
        opts.normalize.max_seconds = Some(20.0);
        let out = run_all(&export(), &opts).unwrap();
        assert_eq!(out.normalized.table.elapsed_seconds, vec![0.0, 10.0, 20.0]);
        let a1 = out.summary.get("A1").unwrap();
        assert!((a1.first_peak - 0.2).abs() < 1e-12);
        assert!((a1.auc - 0.3).abs() < 1e-12);
        assert_eq!(out.summary.get("A2").unwrap().auc, -2.0);
    }

    #[test]
    fn stages_compose() {
        let grid = export();
        let opts = options();
        let transposed = run_transpose(&grid, &opts).unwrap();
        let normalized = run_normalize(&grid, &opts).unwrap();
        let all = run_all(&grid, &opts).unwrap();
        assert_eq!(all.transposed, transposed);
        assert_eq!(all.normalized, normalized);
    }

    #[test]
    fn first_failure_is_surfaced_with_its_stage() {
        let mut opts = options();
        opts.transpose.start_cell = CellAddress::parse("K40").unwrap();
        let err = run_all(&export(), &opts).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transpose(TransposeError::AddressOutOfBounds { .. })
        ));
        assert!(!err.is_defect());

        let mut opts = options();
        opts.normalize.first_n_reads = 0;
        assert_eq!(
            run_normalize(&export(), &opts),
            Err(PipelineError::Normalize(NormalizeError::InvalidFirstNReads))
        );
    }
}
