use std::fmt;

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use super::address::column_letters;

// ---------------------------------------------------------------------------
// Temporal – a time-like cell value
// ---------------------------------------------------------------------------

/// Time-like values an instrument export may carry in its time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temporal {
    /// Clock reading (seconds since midnight when converted).
    TimeOfDay(NaiveTime),
    /// Elapsed duration.
    Duration(chrono::Duration),
    /// Calendar timestamp, interpreted as UTC.
    DateTime(NaiveDateTime),
}

impl Temporal {
    /// Seconds on this value's own axis. Only differences between two values
    /// of the same kind are meaningful.
    pub fn as_seconds(&self) -> f64 {
        match self {
            Temporal::TimeOfDay(t) => {
                t.num_seconds_from_midnight() as f64 + t.nanosecond() as f64 * 1e-9
            }
            Temporal::Duration(d) => match d.num_microseconds() {
                Some(us) => us as f64 * 1e-6,
                None => d.num_milliseconds() as f64 * 1e-3,
            },
            Temporal::DateTime(dt) => dt.and_utc().timestamp_millis() as f64 * 1e-3,
        }
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::TimeOfDay(t) => write!(f, "{t}"),
            Temporal::Duration(d) => {
                let total_ms = d.num_milliseconds();
                let sign = if total_ms < 0 { "-" } else { "" };
                let ms = total_ms.abs();
                let (h, rem) = (ms / 3_600_000, ms % 3_600_000);
                let (m, rem) = (rem / 60_000, rem % 60_000);
                let (s, frac) = (rem / 1000, rem % 1000);
                if frac == 0 {
                    write!(f, "{sign}{h:02}:{m:02}:{s:02}")
                } else {
                    write!(f, "{sign}{h:02}:{m:02}:{s:02}.{frac:03}")
                }
            }
            Temporal::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

// ---------------------------------------------------------------------------
// Cell – one grid position
// ---------------------------------------------------------------------------

/// A typed spreadsheet cell. The type is resolved once, by whoever decodes
/// the file; the pipeline never re-parses text into numbers or times.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    Number(f64),
    Text(String),
    Temporal(Temporal),
    #[default]
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Numeric value, if the cell holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the cell carries nothing (empty, or whitespace-only text).
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed label text used to recognise row labels.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Temporal(t) => write!(f, "{t}"),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Grid – rectangular rows of cells
// ---------------------------------------------------------------------------

static EMPTY_CELL: Cell = Cell::Empty;

/// A rectangular, immutable grid of cells. Short rows are padded with
/// [`Cell::Empty`] on construction so every row has [`Grid::width`] cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    pub fn new(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Grid { rows, width }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.width == 0
    }

    /// Cell at `(row, col)`; positions outside the grid read as empty.
    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// A new grid whose rows are this grid's columns.
    pub fn transposed(&self) -> Grid {
        let rows = (0..self.width)
            .map(|c| self.rows.iter().map(|r| r[c].clone()).collect())
            .collect();
        Grid {
            rows,
            width: self.rows.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Well – plate position identifier
// ---------------------------------------------------------------------------

/// Plate wells per letter group when generating identifiers (96-well plate).
pub const WELLS_PER_ROW: usize = 12;

/// A well identifier: letter group plus number, e.g. `A1`, `B12`, `AA3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Well {
    pub letters: String,
    pub number: u32,
}

impl Well {
    /// Parse `[A-Za-z]+[0-9]+`; letters are normalised to uppercase.
    pub fn parse(text: &str) -> Option<Well> {
        let text = text.trim();
        let split = text.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse().ok()?;
        Some(Well {
            letters: letters.to_ascii_uppercase(),
            number,
        })
    }

    /// The `index`-th well in plate order: `A1..A12, B1..B12, ...`.
    pub fn sequential(index: usize) -> Well {
        Well {
            letters: column_letters(index / WELLS_PER_ROW),
            number: (index % WELLS_PER_ROW) as u32 + 1,
        }
    }
}

impl fmt::Display for Well {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letters, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_pads_short_rows() {
        let grid = Grid::new(vec![
            vec![Cell::from(1.0), Cell::from(2.0), Cell::from(3.0)],
            vec![Cell::from("a")],
        ]);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(1, 2), &Cell::Empty);
        assert_eq!(grid.get(9, 9), &Cell::Empty);
    }

    #[test]
    fn transposed_swaps_axes() {
        let grid = Grid::new(vec![
            vec![Cell::from(1.0), Cell::from(2.0)],
            vec![Cell::from(3.0), Cell::from(4.0)],
            vec![Cell::from(5.0), Cell::from(6.0)],
        ]);
        let t = grid.transposed();
        assert_eq!(t.height(), 2);
        assert_eq!(t.width(), 3);
        assert_eq!(t.get(0, 2), &Cell::from(5.0));
        assert_eq!(t.transposed(), grid);
    }

    #[test]
    fn well_parse_and_sequence() {
        assert_eq!(
            Well::parse(" b12 "),
            Some(Well {
                letters: "B".into(),
                number: 12
            })
        );
        assert_eq!(Well::parse("No."), None);
        assert_eq!(Well::parse("12"), None);
        assert_eq!(Well::parse("A1x"), None);
        assert_eq!(Well::sequential(0).to_string(), "A1");
        assert_eq!(Well::sequential(11).to_string(), "A12");
        assert_eq!(Well::sequential(12).to_string(), "B1");
    }

    #[test]
    fn temporal_seconds() {
        let t = NaiveTime::from_hms_milli_opt(0, 1, 30, 500).unwrap();
        assert!((Temporal::TimeOfDay(t).as_seconds() - 90.5).abs() < 1e-9);
        let d = Temporal::Duration(chrono::Duration::milliseconds(2_500));
        assert!((d.as_seconds() - 2.5).abs() < 1e-9);
        assert_eq!(d.to_string(), "00:00:02.500");
    }

    #[test]
    fn labels_trim_and_render_numbers() {
        assert_eq!(Cell::text("  Comment ").label().as_deref(), Some("Comment"));
        assert_eq!(Cell::from(3.0).label().as_deref(), Some("3"));
        assert_eq!(Cell::text("   ").label(), None);
        assert_eq!(Cell::Empty.label(), None);
    }
}
