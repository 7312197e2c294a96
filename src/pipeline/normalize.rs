use log::{debug, warn};

use super::options::{BaselinePolicy, NormalizeOptions, TimeUnit};
use super::transpose::{TransposedTable, TIME_LABEL};
use crate::data::filter::selected_indices;
use crate::data::model::{Cell, Grid};
use crate::error::NormalizeError;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A well after normalization: `(raw - baseline) / baseline` per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWell {
    pub label: String,
    pub baseline: f64,
    pub values: Vec<f64>,
}

/// Wells on a shared elapsed-seconds axis starting at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub time_label: String,
    pub elapsed_seconds: Vec<f64>,
    pub wells: Vec<NormalizedWell>,
    /// Reads averaged into each baseline (before clamping to series length).
    pub baseline_reads: usize,
}

/// Borrowed view of one well's series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeries<'a> {
    pub label: &'a str,
    pub elapsed_seconds: &'a [f64],
    pub values: &'a [f64],
}

impl TimeSeries<'_> {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.elapsed_seconds
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

/// Any table that can hand out per-well time series.
pub trait SeriesTable {
    fn series(&self) -> Vec<TimeSeries<'_>>;
}

impl SeriesTable for NormalizedTable {
    fn series(&self) -> Vec<TimeSeries<'_>> {
        self.wells
            .iter()
            .map(|w| TimeSeries {
                label: &w.label,
                elapsed_seconds: &self.elapsed_seconds,
                values: &w.values,
            })
            .collect()
    }
}

/// A normalized table plus what was left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutput {
    pub table: NormalizedTable,
    /// Wells whose baseline was exactly zero.
    pub skipped_wells: Vec<String>,
    /// Wells with fewer samples than the baseline window; their baseline
    /// averages every available sample.
    pub short_baseline_wells: Vec<String>,
    /// Rows dropped because their time cell held no time.
    pub dropped_time_rows: usize,
}

const BASELINE_ROW_PREFIX: &str = "Average first";

impl NormalizedTable {
    pub fn well_labels(&self) -> Vec<String> {
        self.wells.iter().map(|w| w.label.clone()).collect()
    }

    /// Render the normalized file layout: baseline row, header row, then
    /// one row per sample.
    pub fn to_grid(&self) -> Grid {
        let mut rows = Vec::with_capacity(self.elapsed_seconds.len() + 2);

        let mut baseline_row = vec![Cell::text(format!(
            "{BASELINE_ROW_PREFIX} {}",
            self.baseline_reads
        ))];
        baseline_row.extend(self.wells.iter().map(|w| Cell::Number(w.baseline)));
        rows.push(baseline_row);

        let mut header = vec![Cell::text(&self.time_label)];
        header.extend(self.wells.iter().map(|w| Cell::text(&w.label)));
        rows.push(header);

        for (i, &t) in self.elapsed_seconds.iter().enumerate() {
            let mut row = vec![Cell::Number(t)];
            row.extend(self.wells.iter().map(|w| Cell::Number(w.values[i])));
            rows.push(row);
        }
        Grid::new(rows)
    }

    /// Read back a grid written by [`NormalizedTable::to_grid`]. The baseline
    /// row is optional; without it baselines read as NaN. Rows whose time
    /// cell is not a number are skipped.
    pub fn from_grid(grid: &Grid) -> Result<NormalizedTable, NormalizeError> {
        let prefix = BASELINE_ROW_PREFIX.to_ascii_lowercase();
        let has_baseline_row = grid
            .get(0, 0)
            .as_text()
            .is_some_and(|s| s.trim().to_ascii_lowercase().starts_with(&prefix));
        let header_row = usize::from(has_baseline_row);

        let baseline_reads = if has_baseline_row {
            grid.get(0, 0)
                .as_text()
                .and_then(|s| s.trim()[BASELINE_ROW_PREFIX.len()..].trim().parse().ok())
                .unwrap_or(0)
        } else {
            0
        };

        let time_label = grid
            .get(header_row, 0)
            .label()
            .unwrap_or_else(|| TIME_LABEL.to_string());
        let mut wells: Vec<NormalizedWell> = (1..grid.width())
            .filter_map(|c| {
                grid.get(header_row, c).label().map(|label| NormalizedWell {
                    label,
                    baseline: if has_baseline_row {
                        grid.get(0, c).as_f64().unwrap_or(f64::NAN)
                    } else {
                        f64::NAN
                    },
                    values: Vec::new(),
                })
            })
            .collect();
        let columns: Vec<usize> = (1..grid.width())
            .filter(|&c| grid.get(header_row, c).label().is_some())
            .collect();

        let mut elapsed_seconds = Vec::new();
        for row in (header_row + 1)..grid.height() {
            let Some(t) = grid.get(row, 0).as_f64() else {
                continue;
            };
            elapsed_seconds.push(t);
            for (well, &c) in wells.iter_mut().zip(&columns) {
                let v = grid
                    .get(row, c)
                    .as_f64()
                    .ok_or_else(|| NormalizeError::NonNumericValue {
                        well: well.label.clone(),
                        row: elapsed_seconds.len() - 1,
                    })?;
                well.values.push(v);
            }
        }
        if elapsed_seconds.is_empty() {
            return Err(NormalizeError::NoTimeSamples);
        }

        Ok(NormalizedTable {
            time_label,
            elapsed_seconds,
            wells,
            baseline_reads,
        })
    }
}

// ---------------------------------------------------------------------------
// Time axis
// ---------------------------------------------------------------------------

fn cell_seconds(cell: &Cell, unit: TimeUnit) -> Option<f64> {
    match cell {
        Cell::Number(v) if v.is_finite() => Some(unit.to_seconds(*v)),
        Cell::Temporal(t) => Some(t.as_seconds()),
        _ => None,
    }
}

/// Elapsed seconds since the first timed row, paired with each row's index
/// in the table. Rows without a time are left out.
fn elapsed_axis(time: &[Cell], unit: TimeUnit) -> Result<Vec<(usize, f64)>, NormalizeError> {
    let timed: Vec<(usize, f64)> = time
        .iter()
        .enumerate()
        .filter_map(|(i, c)| cell_seconds(c, unit).map(|s| (i, s)))
        .collect();
    let origin = timed.first().ok_or(NormalizeError::NoTimeSamples)?.1;

    let axis: Vec<(usize, f64)> = timed.into_iter().map(|(i, s)| (i, s - origin)).collect();
    for pair in axis.windows(2) {
        let ((_, previous), (row, elapsed)) = (pair[0], pair[1]);
        if elapsed <= previous {
            return Err(NormalizeError::NonMonotonicTime {
                row,
                previous,
                elapsed,
            });
        }
    }
    Ok(axis)
}

fn validate(opts: &NormalizeOptions) -> Result<(), NormalizeError> {
    if opts.first_n_reads == 0 {
        return Err(NormalizeError::InvalidFirstNReads);
    }
    if let Some(max) = opts.max_seconds {
        if !(max.is_finite() && max > 0.0) {
            return Err(NormalizeError::InvalidMaxSeconds(max));
        }
    }
    if let Some(filter) = &opts.column_filter {
        filter.validate()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

/// Put the table on an elapsed-seconds axis and divide every selected well by
/// its baseline.
///
/// Rows past `max_seconds` are dropped before baselines are taken. Wells
/// with a zero baseline are skipped and reported, not treated as errors.
pub fn normalize(
    table: &TransposedTable,
    opts: &NormalizeOptions,
) -> Result<NormalizeOutput, NormalizeError> {
    validate(opts)?;

    let mut axis = elapsed_axis(&table.time, opts.time_unit)?;
    let dropped_time_rows = table.time.len() - axis.len();
    if dropped_time_rows > 0 {
        debug!("{dropped_time_rows} rows without a time value dropped");
    }
    if let Some(max) = opts.max_seconds {
        let before = axis.len();
        axis.retain(|&(_, t)| t <= max);
        debug!("max_seconds={max} kept {} of {before} samples", axis.len());
    }

    let labels = table.well_labels();
    let selected = selected_indices(&labels, opts.column_filter.as_ref())?;
    if selected.is_empty() {
        return Err(NormalizeError::NoWellsSelected { available: 0 });
    }

    let window = match opts.policy {
        BaselinePolicy::DivideByBaselineAverage => opts.first_n_reads,
        BaselinePolicy::DivideByT0 => 1,
    };

    let mut wells = Vec::with_capacity(selected.len());
    let mut skipped_wells = Vec::new();
    let mut short_baseline_wells = Vec::new();

    for idx in selected {
        let column = &table.wells[idx];
        let raw = axis
            .iter()
            .map(|&(row, _)| {
                column
                    .values
                    .get(row)
                    .and_then(Cell::as_f64)
                    .ok_or_else(|| NormalizeError::NonNumericValue {
                        well: column.label.clone(),
                        row,
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if raw.len() < window {
            warn!(
                "well {}: only {} samples for a {window}-read baseline",
                column.label,
                raw.len()
            );
            short_baseline_wells.push(column.label.clone());
        }
        let reads = &raw[..window.min(raw.len())];
        let baseline = reads.iter().sum::<f64>() / reads.len() as f64;

        if baseline == 0.0 {
            warn!("well {}: baseline is 0, skipped", column.label);
            skipped_wells.push(column.label.clone());
            continue;
        }

        wells.push(NormalizedWell {
            label: column.label.clone(),
            baseline,
            values: raw.iter().map(|v| (v - baseline) / baseline).collect(),
        });
    }

    debug!(
        "normalized {} wells over {} samples ({} skipped)",
        wells.len(),
        axis.len(),
        skipped_wells.len()
    );

    Ok(NormalizeOutput {
        table: NormalizedTable {
            time_label: table.time_label.clone(),
            elapsed_seconds: axis.iter().map(|&(_, t)| t).collect(),
            wells,
            baseline_reads: window,
        },
        skipped_wells,
        short_baseline_wells,
        dropped_time_rows,
    })
}
