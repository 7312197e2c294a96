use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
use arrow::datatypes::{
    DataType, DurationMicrosecondType, DurationMillisecondType, DurationNanosecondType,
    DurationSecondType, Field, Float32Type, Float64Type, Int32Type, Int64Type, Schema,
    Time32MillisecondType, Time32SecondType, Time64MicrosecondType, Time64NanosecondType,
    TimeUnit as ArrowTimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType,
};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDateTime, NaiveTime};
use log::info;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Cell, Grid, Temporal};

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

/// Decodes a file into a typed grid. Cell types are settled here, once.
pub trait GridReader {
    fn read_grid(&self, path: &Path) -> Result<Grid>;
}

/// Persists a grid.
pub trait GridWriter {
    fn write_grid(&self, grid: &Grid, path: &Path) -> Result<()>;
}

/// On-disk layouts understood by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    /// Plain rows, no header handling.
    Csv,
    /// `[[cell, cell, ...], ...]`
    Json,
    /// One Parquet column per grid column; row 0 travels as field names
    /// (foreign files) or field metadata (files written here).
    Parquet,
}

impl GridFormat {
    /// Dispatch by extension.
    pub fn from_path(path: &Path) -> Result<GridFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(GridFormat::Csv),
            "json" => Ok(GridFormat::Json),
            "parquet" | "pq" => Ok(GridFormat::Parquet),
            other => bail!("Unsupported file extension: .{other}"),
        }
    }
}

impl GridReader for GridFormat {
    fn read_grid(&self, path: &Path) -> Result<Grid> {
        match self {
            GridFormat::Csv => load_csv(path),
            GridFormat::Json => load_json(path),
            GridFormat::Parquet => load_parquet(path),
        }
    }
}

impl GridWriter for GridFormat {
    fn write_grid(&self, grid: &Grid, path: &Path) -> Result<()> {
        match self {
            GridFormat::Csv => save_csv(grid, path),
            GridFormat::Json => save_json(grid, path),
            GridFormat::Parquet => save_parquet(grid, path),
        }?;
        info!("wrote {}x{} grid to {}", grid.height(), grid.width(), path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a grid from a file, picking the format from its extension.
pub fn load_grid(path: &Path) -> Result<Grid> {
    GridFormat::from_path(path)?
        .read_grid(path)
        .with_context(|| format!("loading {}", path.display()))
}

/// Save a grid, picking the format from the target's extension.
pub fn save_grid(grid: &Grid, path: &Path) -> Result<()> {
    GridFormat::from_path(path)?
        .write_grid(grid, path)
        .with_context(|| format!("saving {}", path.display()))
}

/// `<dir>/<stem>_<tag>.<ext>`, with an earlier stage's tag removed from the
/// stem (`run_transposed.csv` → `run_normalized.csv`).
pub fn derived_output_path(input: &Path, tag: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let stem = ["_transposed", "_normalized"]
        .iter()
        .find_map(|t| stem.strip_suffix(t))
        .unwrap_or(stem);
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    input.with_file_name(format!("{stem}_{tag}.{ext}"))
}

// ---------------------------------------------------------------------------
// Cell typing for text sources
// ---------------------------------------------------------------------------

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// `h:mm:ss[.fff]` with hours past 23, as exported for long kinetic runs.
fn parse_long_duration(s: &str) -> Option<chrono::Duration> {
    let mut parts = s.split(':');
    let (h, m, sec) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let hours: i64 = h.parse().ok()?;
    let minutes: i64 = m.parse().ok()?;
    let seconds: f64 = sec.parse().ok()?;
    if minutes >= 60 || !(0.0..60.0).contains(&seconds) || hours < 0 {
        return None;
    }
    let millis = (hours * 3600 + minutes * 60) * 1000 + (seconds * 1000.0).round() as i64;
    Some(chrono::Duration::milliseconds(millis))
}

/// Decide a text field's type: empty, number, time, date-time or text.
pub fn guess_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() {
        return Cell::Empty;
    }
    if let Ok(v) = s.parse::<f64>() {
        if v.is_finite() {
            return Cell::Number(v);
        }
    }
    if s.contains(':') {
        if let Some(t) = TIME_FORMATS
            .iter()
            .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
        {
            return Cell::Temporal(Temporal::TimeOfDay(t));
        }
        if let Some(dt) = DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        {
            return Cell::Temporal(Temporal::DateTime(dt));
        }
        if let Some(d) = parse_long_duration(s) {
            return Cell::Temporal(Temporal::Duration(d));
        }
    }
    Cell::Text(raw.to_string())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// CSV layout: no header, rows of any length.
fn load_csv(path: &Path) -> Result<Grid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell).collect());
    }
    Ok(Grid::new(rows))
}

fn save_csv(grid: &Grid, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("creating CSV")?;
    for row in grid.rows() {
        writer
            .write_record(row.iter().map(|c| c.to_string()))
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Expected JSON: an array of row arrays.
///
/// ```json
/// [
///   [null, "time", 0, 10, 20],
///   [null, "A1", 100.5, 110.0, 121.2]
/// ]
/// ```
fn load_json(path: &Path) -> Result<Grid> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let cells = rec
                .as_array()
                .with_context(|| format!("Row {i} is not a JSON array"))?;
            cells
                .iter()
                .enumerate()
                .map(|(j, v)| json_to_cell(v).with_context(|| format!("Row {i}, cell {j}")))
                .collect::<Result<Vec<Cell>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Grid::new(rows))
}

fn json_to_cell(val: &JsonValue) -> Result<Cell> {
    Ok(match val {
        JsonValue::Null => Cell::Empty,
        JsonValue::Number(n) => Cell::Number(n.as_f64().context("number out of range")?),
        JsonValue::String(s) => guess_cell(s),
        JsonValue::Bool(b) => Cell::Text(b.to_string()),
        other => bail!("unsupported JSON cell {other}"),
    })
}

fn cell_to_json(cell: &Cell) -> JsonValue {
    match cell {
        Cell::Empty => JsonValue::Null,
        Cell::Number(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Cell::Text(s) => JsonValue::String(s.clone()),
        Cell::Temporal(t) => JsonValue::String(t.to_string()),
    }
}

fn save_json(grid: &Grid, path: &Path) -> Result<()> {
    let rows: Vec<JsonValue> = grid
        .rows()
        .map(|row| JsonValue::Array(row.iter().map(cell_to_json).collect()))
        .collect();
    let text = serde_json::to_string_pretty(&JsonValue::Array(rows)).context("encoding JSON")?;
    std::fs::write(path, text).context("writing JSON file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Schema metadata key marking files whose row 0 lives in field metadata.
const GRID_LAYOUT_KEY: &str = "rusty_plate.layout";
const GRID_LAYOUT_POSITIONAL: &str = "positional";
/// Field metadata key holding the row-0 text of a column.
const HEADER_CELL_KEY: &str = "rusty_plate.header";

/// Load a Parquet file as a grid: a header row, then one row per record.
///
/// The header comes from field metadata for files written by [`save_grid`]
/// and from the field names otherwise. Numeric columns become numbers, Arrow
/// time/timestamp/duration columns become temporal cells and nulls are empty.
/// Strings (and header text) are typed like CSV fields, since mixed columns
/// are stored as text.
fn load_parquet(path: &Path) -> Result<Grid> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema();
    let positional = schema
        .metadata()
        .get(GRID_LAYOUT_KEY)
        .is_some_and(|v| v == GRID_LAYOUT_POSITIONAL);
    let header: Vec<Cell> = schema
        .fields()
        .iter()
        .map(|f| {
            if positional {
                f.metadata()
                    .get(HEADER_CELL_KEY)
                    .map_or(Cell::Empty, |text| guess_cell(text))
            } else {
                guess_cell(f.name())
            }
        })
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = vec![header];
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| arrow_cell(col, row))
                .collect::<Result<Vec<Cell>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(cells);
        }
    }
    Ok(Grid::new(rows))
}

/// Extract one cell from an Arrow column.
fn arrow_cell(col: &ArrayRef, row: usize) -> Result<Cell> {
    if col.is_null(row) {
        return Ok(Cell::Empty);
    }
    let temporal = |t: Option<Temporal>| -> Result<Cell> {
        t.map(Cell::Temporal)
            .with_context(|| format!("{:?} value out of range", col.data_type()))
    };

    let cell = match col.data_type() {
        DataType::Utf8 => guess_cell(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => guess_cell(col.as_string::<i64>().value(row)),
        DataType::Boolean => Cell::Text(col.as_boolean().value(row).to_string()),
        DataType::Int32 => Cell::Number(col.as_primitive::<Int32Type>().value(row) as f64),
        DataType::Int64 => Cell::Number(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Float32 => Cell::Number(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Cell::Number(col.as_primitive::<Float64Type>().value(row)),
        DataType::Time32(ArrowTimeUnit::Second) => temporal(
            col.as_primitive::<Time32SecondType>()
                .value_as_time(row)
                .map(Temporal::TimeOfDay),
        )?,
        DataType::Time32(ArrowTimeUnit::Millisecond) => temporal(
            col.as_primitive::<Time32MillisecondType>()
                .value_as_time(row)
                .map(Temporal::TimeOfDay),
        )?,
        DataType::Time64(ArrowTimeUnit::Microsecond) => temporal(
            col.as_primitive::<Time64MicrosecondType>()
                .value_as_time(row)
                .map(Temporal::TimeOfDay),
        )?,
        DataType::Time64(ArrowTimeUnit::Nanosecond) => temporal(
            col.as_primitive::<Time64NanosecondType>()
                .value_as_time(row)
                .map(Temporal::TimeOfDay),
        )?,
        DataType::Timestamp(unit, _) => temporal(
            match unit {
                ArrowTimeUnit::Second => col
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(row),
                ArrowTimeUnit::Millisecond => col
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                ArrowTimeUnit::Microsecond => col
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                ArrowTimeUnit::Nanosecond => col
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            }
            .map(Temporal::DateTime),
        )?,
        DataType::Duration(unit) => temporal(
            match unit {
                ArrowTimeUnit::Second => col
                    .as_primitive::<DurationSecondType>()
                    .value_as_duration(row),
                ArrowTimeUnit::Millisecond => col
                    .as_primitive::<DurationMillisecondType>()
                    .value_as_duration(row),
                ArrowTimeUnit::Microsecond => col
                    .as_primitive::<DurationMicrosecondType>()
                    .value_as_duration(row),
                ArrowTimeUnit::Nanosecond => col
                    .as_primitive::<DurationNanosecondType>()
                    .value_as_duration(row),
            }
            .map(Temporal::Duration),
        )?,
        other => bail!("unsupported parquet column type {other:?}"),
    };
    Ok(cell)
}

/// Write a grid as Parquet. Fields are named by position and row 0 is kept
/// verbatim in each field's metadata, so repeated or numeric header cells
/// survive. A column whose remaining cells are all numbers (or empty) is
/// stored as Float64, any other column as text.
fn save_parquet(grid: &Grid, path: &Path) -> Result<()> {
    if grid.is_empty() {
        bail!("cannot write an empty grid as parquet");
    }

    let mut fields = Vec::with_capacity(grid.width());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(grid.width());
    for c in 0..grid.width() {
        let name = format!("column_{c}");
        let header = grid.get(0, c);
        let metadata: HashMap<String, String> = if header.is_blank() {
            HashMap::new()
        } else {
            HashMap::from([(HEADER_CELL_KEY.to_string(), header.to_string())])
        };
        let cells: Vec<&Cell> = (1..grid.height()).map(|r| grid.get(r, c)).collect();

        if cells.iter().all(|cell| matches!(cell, Cell::Number(_) | Cell::Empty)) {
            let values: Float64Array = cells.iter().map(|cell| cell.as_f64()).collect();
            fields.push(Field::new(name, DataType::Float64, true).with_metadata(metadata));
            columns.push(Arc::new(values));
        } else {
            let values: StringArray = cells
                .iter()
                .map(|cell| (!matches!(cell, Cell::Empty)).then(|| cell.to_string()))
                .collect();
            fields.push(Field::new(name, DataType::Utf8, true).with_metadata(metadata));
            columns.push(Arc::new(values));
        }
    }

    let schema = Arc::new(Schema::new(fields).with_metadata(HashMap::from([(
        GRID_LAYOUT_KEY.to_string(),
        GRID_LAYOUT_POSITIONAL.to_string(),
    )])));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_cell_types_once() {
        assert_eq!(guess_cell(""), Cell::Empty);
        assert_eq!(guess_cell(" 12.5 "), Cell::Number(12.5));
        assert_eq!(guess_cell("Comment"), Cell::text("Comment"));
        assert_eq!(guess_cell("inf"), Cell::text("inf"));
        assert_eq!(
            guess_cell("00:01:30"),
            Cell::Temporal(Temporal::TimeOfDay(NaiveTime::from_hms_opt(0, 1, 30).unwrap()))
        );
        assert!(matches!(
            guess_cell("2024-03-01 08:00:00"),
            Cell::Temporal(Temporal::DateTime(_))
        ));
        assert_eq!(
            guess_cell("26:00:00"),
            Cell::Temporal(Temporal::Duration(chrono::Duration::hours(26)))
        );
    }

    #[test]
    fn derived_paths_follow_stage_tags() {
        assert_eq!(
            derived_output_path(Path::new("/tmp/run.csv"), "transposed"),
            PathBuf::from("/tmp/run_transposed.csv")
        );
        assert_eq!(
            derived_output_path(Path::new("/tmp/run_transposed.csv"), "normalized"),
            PathBuf::from("/tmp/run_normalized.csv")
        );
        assert_eq!(
            derived_output_path(Path::new("run_normalized.parquet"), "FP_AUC"),
            PathBuf::from("run_FP_AUC.parquet")
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(GridFormat::from_path(Path::new("plate.xlsx")).is_err());
        assert_eq!(
            GridFormat::from_path(Path::new("plate.PQ")).unwrap(),
            GridFormat::Parquet
        );
    }
}
