//! Command line front end: load a grid, run a pipeline prefix, save the
//! resulting tables next to the input.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};

use rusty_plate::data::loader::{derived_output_path, load_grid, save_grid};
use rusty_plate::pipeline::normalize::{NormalizeOutput, NormalizedTable};
use rusty_plate::pipeline::reduce;
use rusty_plate::{
    BaselinePolicy, CellAddress, ColumnFilter, Grid, PipelineOptions, TimeUnit, run_all,
    run_normalize, run_transpose,
};

/// Start cell used by `run-all` when neither a flag nor a config sets one.
const RUN_ALL_START_CELL: CellAddress = CellAddress { column: 1, row: 8 };

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Mean of the first N reads
    Average,
    /// First read only
    T0,
}

impl From<PolicyArg> for BaselinePolicy {
    fn from(v: PolicyArg) -> Self {
        match v {
            PolicyArg::Average => BaselinePolicy::DivideByBaselineAverage,
            PolicyArg::T0 => BaselinePolicy::DivideByT0,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeUnitArg {
    S,
    Ms,
}

impl From<TimeUnitArg> for TimeUnit {
    fn from(v: TimeUnitArg) -> Self {
        match v {
            TimeUnitArg::S => TimeUnit::Seconds,
            TimeUnitArg::Ms => TimeUnit::Milliseconds,
        }
    }
}

#[derive(Debug, Args)]
struct TransposeArgs {
    /// Cell holding the time row label, e.g. B8
    #[arg(long = "start-cell")]
    start_cell: Option<CellAddress>,

    /// Row label to drop before transposing (repeatable; default Comment, Type)
    #[arg(long = "metadata-label")]
    metadata_labels: Vec<String>,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    /// Reads averaged into each well's baseline
    #[arg(long = "first-n-reads")]
    first_n_reads: Option<usize>,

    /// Drop samples later than this many seconds
    #[arg(long = "max-seconds")]
    max_seconds: Option<f64>,

    /// Well letter groups to keep, e.g. "A,B,C"
    #[arg(long, requires = "range")]
    letters: Option<String>,

    /// Well numbers to keep, e.g. "1-12"
    #[arg(long, requires = "letters")]
    range: Option<String>,

    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Unit of numeric time cells
    #[arg(long = "time-unit", value_enum)]
    time_unit: Option<TimeUnitArg>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Flip the export so samples run down and wells across
    Transpose {
        input: PathBuf,
        output: Option<PathBuf>,
        #[command(flatten)]
        transpose: TransposeArgs,
    },

    /// Transpose and normalize every well against its baseline
    Normalize {
        input: PathBuf,
        output: Option<PathBuf>,
        /// Input is already transposed (header row, one row per sample)
        #[arg(long = "pre-transposed", default_value_t = false)]
        pre_transposed: bool,
        #[command(flatten)]
        transpose: TransposeArgs,
        #[command(flatten)]
        normalize: NormalizeArgs,
    },

    /// First peak and AUC per well of a normalized file
    FpAuc {
        input: PathBuf,
        output: Option<PathBuf>,
    },

    /// Transpose, normalize and summarize, writing every artifact
    RunAll {
        input: PathBuf,
        /// Where to write the first peak / AUC table
        output: Option<PathBuf>,
        #[command(flatten)]
        transpose: TransposeArgs,
        #[command(flatten)]
        normalize: NormalizeArgs,
    },
}

#[derive(Debug, Parser)]
#[command(name = "rusty-plate", version, about)]
struct Cli {
    /// JSON file with pipeline options; flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn base_options(config: Option<&Path>) -> Result<PipelineOptions> {
    match config {
        Some(path) => PipelineOptions::from_json_file(path),
        None => Ok(PipelineOptions::default()),
    }
}

fn apply_transpose(opts: &mut PipelineOptions, args: &TransposeArgs) {
    if let Some(cell) = args.start_cell {
        opts.transpose.start_cell = cell;
    }
    if !args.metadata_labels.is_empty() {
        opts.transpose.metadata_row_labels = args.metadata_labels.clone();
    }
}

fn apply_normalize(opts: &mut PipelineOptions, args: &NormalizeArgs) -> Result<()> {
    let n = &mut opts.normalize;
    if let Some(reads) = args.first_n_reads {
        n.first_n_reads = reads;
    }
    if let Some(max) = args.max_seconds {
        n.max_seconds = Some(max);
    }
    if let (Some(letters), Some(range)) = (&args.letters, &args.range) {
        n.column_filter = Some(ColumnFilter::parse(letters, range)?);
    }
    if let Some(policy) = args.policy {
        n.policy = policy.into();
    }
    if let Some(unit) = args.time_unit {
        n.time_unit = unit.into();
    }
    Ok(())
}

fn report_warnings(out: &NormalizeOutput) {
    if !out.skipped_wells.is_empty() {
        warn!(
            "skipped wells with a zero baseline: {}",
            out.skipped_wells.join(", ")
        );
    }
    if !out.short_baseline_wells.is_empty() {
        warn!(
            "wells shorter than the baseline window: {}",
            out.short_baseline_wells.join(", ")
        );
    }
}

fn save(grid: &Grid, path: &Path, what: &str) -> Result<()> {
    save_grid(grid, path)?;
    info!("{what} written to {}", path.display());
    println!("Done. {what} file saved to: {}", path.display());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut opts = base_options(cli.config.as_deref())?;

    match cli.command {
        Command::Transpose {
            input,
            output,
            transpose,
        } => {
            apply_transpose(&mut opts, &transpose);
            let grid = load_grid(&input)?;
            let table = run_transpose(&grid, &opts)?;
            let out = output.unwrap_or_else(|| derived_output_path(&input, "transposed"));
            save(&table.to_grid(), &out, "Transposed")?;
        }

        Command::Normalize {
            input,
            output,
            pre_transposed,
            transpose,
            normalize,
        } => {
            let mut grid = load_grid(&input)?;
            if pre_transposed {
                // Back to one row per well so the regular transpose applies.
                grid = grid.transposed();
                opts.transpose.start_cell = CellAddress::new(0, 0);
            }
            apply_transpose(&mut opts, &transpose);
            apply_normalize(&mut opts, &normalize)?;

            let normalized = run_normalize(&grid, &opts)?;
            report_warnings(&normalized);
            let out = output.unwrap_or_else(|| derived_output_path(&input, "normalized"));
            save(&normalized.table.to_grid(), &out, "Normalized")?;
        }

        Command::FpAuc { input, output } => {
            let grid = load_grid(&input)?;
            let table = NormalizedTable::from_grid(&grid)
                .with_context(|| format!("reading normalized table from {}", input.display()))?;
            let summary = reduce::reduce(&table)?;
            let out = output.unwrap_or_else(|| derived_output_path(&input, "FP_AUC"));
            save(&summary.to_grid(), &out, "FP_AUC")?;
        }

        Command::RunAll {
            input,
            output,
            transpose,
            normalize,
        } => {
            if cli.config.is_none() {
                opts.transpose.start_cell = RUN_ALL_START_CELL;
            }
            apply_transpose(&mut opts, &transpose);
            apply_normalize(&mut opts, &normalize)?;

            let grid = load_grid(&input)?;
            let run = run_all(&grid, &opts)?;
            report_warnings(&run.normalized);

            save(
                &run.transposed.to_grid(),
                &derived_output_path(&input, "transposed"),
                "Transposed",
            )?;
            save(
                &run.normalized.table.to_grid(),
                &derived_output_path(&input, "normalized"),
                "Normalized",
            )?;
            let out = output.unwrap_or_else(|| derived_output_path(&input, "FP_AUC"));
            save(&run.summary.to_grid(), &out, "FP_AUC")?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
