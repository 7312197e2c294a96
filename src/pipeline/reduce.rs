use log::debug;

use super::normalize::SeriesTable;
use crate::data::model::{Cell, Grid};
use crate::error::ReduceError;

/// Summary scalars for one well.
#[derive(Debug, Clone, PartialEq)]
pub struct WellSummary {
    pub label: String,
    /// Largest value in the series.
    pub first_peak: f64,
    /// Plain sum of the sampled values.
    pub auc: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FpAucResult {
    pub wells: Vec<WellSummary>,
}

impl FpAucResult {
    pub fn get(&self, label: &str) -> Option<&WellSummary> {
        self.wells.iter().find(|w| w.label == label)
    }

    /// `["", wells...]`, `["First Peak", ...]`, `["AUC", ...]`.
    pub fn to_grid(&self) -> Grid {
        let mut header = vec![Cell::Empty];
        let mut peaks = vec![Cell::text("First Peak")];
        let mut aucs = vec![Cell::text("AUC")];
        for w in &self.wells {
            header.push(Cell::text(&w.label));
            peaks.push(Cell::Number(w.first_peak));
            aucs.push(Cell::Number(w.auc));
        }
        Grid::new(vec![header, peaks, aucs])
    }
}

/// First peak (max) and AUC (discrete sum) for every well of `table`.
pub fn reduce(table: &impl SeriesTable) -> Result<FpAucResult, ReduceError> {
    let wells = table
        .series()
        .into_iter()
        .map(|s| -> Result<WellSummary, ReduceError> {
            let first_peak = s
                .values
                .iter()
                .copied()
                .reduce(f64::max)
                .ok_or_else(|| ReduceError::EmptyWell(s.label.to_string()))?;
            Ok(WellSummary {
                label: s.label.to_string(),
                first_peak,
                auc: s.values.iter().sum(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("summarized {} wells", wells.len());
    Ok(FpAucResult { wells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::{NormalizedTable, NormalizedWell};

    fn normalized(wells: &[(&str, &[f64])]) -> NormalizedTable {
        let len = wells.first().map_or(0, |(_, v)| v.len());
        NormalizedTable {
            time_label: "time".into(),
            elapsed_seconds: (0..len).map(|i| i as f64 * 10.0).collect(),
            wells: wells
                .iter()
                .map(|(label, values)| NormalizedWell {
                    label: label.to_string(),
                    baseline: 1.0,
                    values: values.to_vec(),
                })
                .collect(),
            baseline_reads: 1,
        }
    }

    #[test]
    fn peak_is_max_and_auc_is_sum() {
        let table = normalized(&[
            ("A1", &[0.0, 0.1, 0.2, 0.3]),
            ("A2", &[0.0, -1.0, -1.0, -1.0]),
        ]);
        let result = reduce(&table).unwrap();
        let a1 = result.get("A1").unwrap();
        assert!((a1.first_peak - 0.3).abs() < 1e-12);
        assert!((a1.auc - 0.6).abs() < 1e-12);
        let a2 = result.get("A2").unwrap();
        assert_eq!(a2.first_peak, 0.0);
        assert_eq!(a2.auc, -3.0);
    }

    #[test]
    fn empty_series_is_reported() {
        let table = normalized(&[("A1", &[])]);
        assert_eq!(reduce(&table), Err(ReduceError::EmptyWell("A1".into())));
    }

    #[test]
    fn grid_layout() {
        let result = reduce(&normalized(&[("B3", &[1.0, 2.0])])).unwrap();
        let grid = result.to_grid();
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.get(0, 0), &Cell::Empty);
        assert_eq!(grid.get(0, 1), &Cell::text("B3"));
        assert_eq!(grid.get(1, 0), &Cell::text("First Peak"));
        assert_eq!(grid.get(1, 1), &Cell::Number(2.0));
        assert_eq!(grid.get(2, 1), &Cell::Number(3.0));
    }
}
