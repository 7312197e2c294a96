use std::collections::BTreeSet;

use log::debug;

use super::options::TransposeOptions;
use crate::data::model::{Cell, Grid, Well};
use crate::error::TransposeError;

/// Header used for the time column when the export leaves its label empty.
pub const TIME_LABEL: &str = "time";

/// One well's raw readings, top to bottom in sample order.
#[derive(Debug, Clone, PartialEq)]
pub struct WellColumn {
    pub label: String,
    pub values: Vec<Cell>,
}

/// Time-indexed table: one row per sample, one column per well.
#[derive(Debug, Clone, PartialEq)]
pub struct TransposedTable {
    pub time_label: String,
    /// Raw time cells, one per sample.
    pub time: Vec<Cell>,
    /// Wells in the order they appear in the source.
    pub wells: Vec<WellColumn>,
}

impl TransposedTable {
    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    pub fn well_labels(&self) -> Vec<String> {
        self.wells.iter().map(|w| w.label.clone()).collect()
    }

    /// Render as a grid: header row, then one row per sample.
    pub fn to_grid(&self) -> Grid {
        let mut rows = Vec::with_capacity(self.time.len() + 1);
        let mut header = vec![Cell::text(&self.time_label)];
        header.extend(self.wells.iter().map(|w| Cell::text(&w.label)));
        rows.push(header);

        for (i, t) in self.time.iter().enumerate() {
            let mut row = vec![t.clone()];
            row.extend(self.wells.iter().map(|w| w.values[i].clone()));
            rows.push(row);
        }
        Grid::new(rows)
    }
}

// ---------------------------------------------------------------------------
// Block extraction
// ---------------------------------------------------------------------------

fn is_metadata_row(row: &[Cell], labels: &[String]) -> bool {
    match row.first().and_then(Cell::label) {
        Some(label) => labels.iter().any(|m| m.trim().eq_ignore_ascii_case(&label)),
        None => false,
    }
}

/// Cut the data block out of `grid`: rows from the start cell's row down,
/// columns from the start column rightwards, metadata rows removed, and
/// empty edge rows/columns trimmed. Column 0 of the block holds row labels.
pub fn extract_block(grid: &Grid, opts: &TransposeOptions) -> Result<Grid, TransposeError> {
    let start = opts.start_cell;
    if start.row >= grid.height() || start.column >= grid.width() {
        return Err(TransposeError::AddressOutOfBounds {
            address: start.to_string(),
            height: grid.height(),
            width: grid.width(),
        });
    }

    let mut rows: Vec<Vec<Cell>> = grid
        .rows()
        .skip(start.row)
        .map(|r| r[start.column..].to_vec())
        .filter(|r| !is_metadata_row(r, &opts.metadata_row_labels))
        .collect();

    while rows.last().is_some_and(|r| r.iter().all(Cell::is_blank)) {
        rows.pop();
    }
    let leading = rows
        .iter()
        .take_while(|r| r.iter().all(Cell::is_blank))
        .count();
    rows.drain(..leading);

    let used_width = (0..rows.first().map_or(0, Vec::len))
        .rev()
        .find(|&c| rows.iter().any(|r| !r[c].is_blank()))
        .map_or(0, |c| c + 1);
    for row in &mut rows {
        row.truncate(used_width);
    }

    // The label column alone carries no samples.
    if rows.is_empty() || used_width < 2 {
        return Err(TransposeError::EmptyBlock {
            address: start.to_string(),
        });
    }
    Ok(Grid::new(rows))
}

// ---------------------------------------------------------------------------
// Transpose
// ---------------------------------------------------------------------------

/// Flip the block at `opts.start_cell` so samples run down and wells across.
///
/// The first block row becomes the time column; every further row becomes
/// one well. Empty well labels are replaced by plate-order identifiers,
/// skipping any identifier another row already carries.
pub fn transpose(grid: &Grid, opts: &TransposeOptions) -> Result<TransposedTable, TransposeError> {
    let block = extract_block(grid, opts)?;
    debug!(
        "transposing block at {}: {} rows x {} columns",
        opts.start_cell,
        block.height(),
        block.width()
    );

    let mut block_rows = block.rows();
    let time_row = block_rows.next().ok_or_else(|| TransposeError::EmptyBlock {
        address: opts.start_cell.to_string(),
    })?;
    let time_label = time_row[0].label().unwrap_or_else(|| TIME_LABEL.to_string());
    let time = time_row[1..].to_vec();

    let well_rows: Vec<&[Cell]> = block_rows.collect();

    // Explicit labels first, so generated ones can step around them.
    let mut taken = BTreeSet::new();
    for label in well_rows.iter().filter_map(|row| row[0].label()) {
        if !taken.insert(label.to_ascii_uppercase()) {
            return Err(TransposeError::DuplicateWell(label));
        }
    }

    let mut next = 0;
    let mut wells = Vec::with_capacity(well_rows.len());
    for (i, row) in well_rows.iter().enumerate() {
        let label = match row[0].label() {
            Some(label) => label,
            None => {
                next = next.max(i);
                while taken.contains(&Well::sequential(next).to_string()) {
                    next += 1;
                }
                let generated = Well::sequential(next).to_string();
                taken.insert(generated.clone());
                next += 1;
                generated
            }
        };
        wells.push(WellColumn {
            label,
            values: row[1..].to_vec(),
        });
    }

    debug!("transposed {} wells x {} samples", wells.len(), time.len());
    Ok(TransposedTable {
        time_label,
        time,
        wells,
    })
}
