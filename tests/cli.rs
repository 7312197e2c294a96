use std::process::Command;

use rusty_plate::data::loader::load_grid;
use rusty_plate::Cell;

const EXPORT_CSV: &str = "\
Plate reader export,,,,,
,,,,,
,,,,,
,,,,,
,,,,,
,,,,,
,,,,,
,Comment,,,,
,Time [s],0,10,20,30
,Type,Raw,Raw,Raw,Raw
,A1,100,110,120,130
,B1,200,0,0,0
";

fn rusty_plate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rusty-plate"))
}

#[test]
fn run_all_writes_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.csv");
    std::fs::write(&input, EXPORT_CSV).unwrap();

    let status = rusty_plate()
        .args(["run-all", input.to_str().unwrap(), "--first-n-reads", "1", "--max-seconds", "20"])
        .status()
        .unwrap();
    assert!(status.success());

    for name in ["plate_transposed.csv", "plate_normalized.csv", "plate_FP_AUC.csv"] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }

    let summary = load_grid(&dir.path().join("plate_FP_AUC.csv")).unwrap();
    assert_eq!(summary.get(0, 1), &Cell::text("A1"));
    assert_eq!(summary.get(1, 0), &Cell::text("First Peak"));
    let b1_auc = summary.get(2, 2).as_f64().unwrap();
    assert_eq!(b1_auc, -2.0);
}

#[test]
fn fp_auc_runs_on_a_normalized_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.csv");
    std::fs::write(&input, EXPORT_CSV).unwrap();

    let normalized = dir.path().join("plate_normalized.csv");
    let status = rusty_plate()
        .args(["normalize", input.to_str().unwrap(), normalized.to_str().unwrap()])
        .args(["--start-cell", "B9", "--letters", "A", "--range", "1-12", "--first-n-reads", "2"])
        .status()
        .unwrap();
    assert!(status.success());

    let status = rusty_plate()
        .args(["fp-auc", normalized.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let summary = load_grid(&dir.path().join("plate_FP_AUC.csv")).unwrap();
    assert_eq!(summary.width(), 2);
    assert_eq!(summary.get(0, 1), &Cell::text("A1"));
}

#[test]
fn bad_start_cell_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.csv");
    std::fs::write(&input, EXPORT_CSV).unwrap();

    let output = rusty_plate()
        .args(["transpose", input.to_str().unwrap(), "--start-cell", "ZZ900"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("outside"), "{stderr}");
}

#[test]
fn config_file_is_loaded_and_flags_override_it() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.csv");
    std::fs::write(&input, EXPORT_CSV).unwrap();
    let config = dir.path().join("plate.json");
    std::fs::write(
        &config,
        r#"{
            "transpose": { "start_cell": "b9" },
            "normalize": {
                "first_n_reads": 30,
                "column_filter": { "letters": ["a"], "range_start": 1, "range_end": 12 }
            }
        }"#,
    )
    .unwrap();

    let output = rusty_plate()
        .args(["run-all", input.to_str().unwrap(), "--config", config.to_str().unwrap()])
        .args(["--first-n-reads", "1"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // Only A1 passes the filter; a single-read baseline of 100 gives 0, .1, .2, .3.
    let summary = load_grid(&dir.path().join("plate_FP_AUC.csv")).unwrap();
    assert_eq!(summary.width(), 2);
    assert_eq!(summary.get(0, 1), &Cell::text("A1"));
    let auc = summary.get(2, 1).as_f64().unwrap();
    assert!((auc - 0.6).abs() < 1e-12, "{auc}");
}

#[test]
fn unreadable_config_fails_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plate.csv");
    std::fs::write(&input, EXPORT_CSV).unwrap();
    let config = dir.path().join("plate.json");
    std::fs::write(&config, "{ not json").unwrap();

    let output = rusty_plate()
        .args(["run-all", input.to_str().unwrap(), "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("plate.json"));
    assert!(!dir.path().join("plate_transposed.csv").exists());
}
