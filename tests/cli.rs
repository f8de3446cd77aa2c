mod common;

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

use common::{TestWorkspace, fixture_path, read_csv};

fn table_audit() -> Command {
    Command::cargo_bin("table-audit").expect("binary exists")
}

#[test]
fn profile_writes_generated_report() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("generated.csv");
    let input = fixture_path("orders.csv");

    table_audit()
        .args([
            "profile",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let (headers, rows) = read_csv(&output);
    assert_eq!(
        headers,
        vec![
            "Column",
            "Num_Of_Rows",
            "Datatype",
            "Num_Of_Nulls",
            "Num_Of_Non_Nulls",
            "Num_Unique_Vals",
            "Num_Of_Duplicates",
            "Most_Occurring_Vals",
        ]
    );
    let names = rows.iter().map(|row| row[0].as_str()).collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["amount", "customer", "order_id", "ordered_at", "status"]
    );
    assert_eq!(
        rows[1],
        vec!["customer", "5", "text", "1", "4", "3", "1", "alice"]
    );
    assert_eq!(rows[3][2], "date");
}

#[test]
fn profile_limit_caps_profiled_rows() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("generated.csv");
    let input = fixture_path("orders.csv");

    table_audit()
        .args([
            "profile",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--limit",
            "2",
        ])
        .assert()
        .success();

    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| row[1] == "2"), "{rows:?}");
    assert_eq!(
        rows[1],
        vec!["customer", "2", "text", "0", "2", "2", "0", "alice"]
    );
}

#[test]
fn profile_without_output_writes_stdout() {
    let input = fixture_path("orders.csv");

    table_audit()
        .args(["profile", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains(
            "\"Column\",\"Num_Of_Rows\",\"Datatype\",\"Num_Of_Nulls\",\"Num_Of_Non_Nulls\",\
             \"Num_Unique_Vals\",\"Num_Of_Duplicates\",\"Most_Occurring_Vals\"\n",
        ))
        .stdout(contains(
            "\"customer\",\"5\",\"text\",\"1\",\"4\",\"3\",\"1\",\"alice\"",
        ));
}

#[test]
fn audit_flags_discrepancies_against_owner() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("combined.csv");
    let summary = workspace.path().join("summary.json");
    let input = fixture_path("orders.csv");
    let owner = fixture_path("orders_owner.csv");

    table_audit()
        .args([
            "audit",
            "-i",
            input.to_str().unwrap(),
            "-r",
            owner.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--summary",
            summary.to_str().unwrap(),
        ])
        .assert()
        .success();

    let (headers, rows) = read_csv(&output);
    assert_eq!(headers.first().map(String::as_str), Some("Column"));
    assert_eq!(headers.last().map(String::as_str), Some("Steward"));
    let keys = rows.iter().map(|row| row[0].as_str()).collect::<Vec<_>>();
    assert_eq!(
        keys,
        vec!["amount", "customer", "order_id", "status", "region", "ordered_at"]
    );
    assert_eq!(
        rows[1],
        vec![
            "customer",
            "5",
            "text",
            "MISMATCH",
            "MISMATCH",
            "3",
            "MISMATCH",
            "alice",
            "MISSING PARAMETER",
        ]
    );
    assert_eq!(rows[4][1], "MISSING COLUMN");
    assert_eq!(rows[5][1], "EXTRA COLUMN");
    assert!(rows.iter().all(|row| row[8] == "MISSING PARAMETER"));

    let summary: Value =
        serde_json::from_str(&fs::read_to_string(&summary).expect("read summary"))
            .expect("parse summary");
    assert_eq!(summary["mismatches"], 3);
    assert_eq!(summary["columns"]["missing"][0], "region");
    assert_eq!(summary["columns"]["extra"][0], "ordered_at");
    assert_eq!(summary["parameters"]["missing"][0], "Steward");
    assert_eq!(summary["parameters"]["relationship"], "fewer");
}

#[test]
fn compare_exports_into_output_directory() {
    let workspace = TestWorkspace::new();
    let generated = workspace.write(
        "generated.csv",
        "Column,Value,Extra_Stat\nA,1,x\nB,2,y\n",
    );
    let owner = workspace.write("owner.csv", "Column,Value\nA,1\nB,9\nC,5\n");
    let reports = workspace.path().join("reports");

    table_audit()
        .args([
            "compare",
            "-g",
            generated.to_str().unwrap(),
            "-r",
            owner.to_str().unwrap(),
            "--output-dir",
            reports.to_str().unwrap(),
        ])
        .assert()
        .success();

    let files = workspace.files_in("reports");
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("Report_") && name.ends_with(".csv"), "{name}");

    let (headers, rows) = read_csv(&files[0]);
    assert_eq!(headers, vec!["Column", "Value", "Extra_Stat"]);
    assert_eq!(
        rows,
        vec![
            vec!["A", "1", "EXTRA PARAMETER"],
            vec!["B", "MISMATCH", "EXTRA PARAMETER"],
            vec!["C", "MISSING COLUMN", "EXTRA PARAMETER"],
        ]
    );
}

#[test]
fn compare_without_join_key_fails_and_writes_nothing() {
    let workspace = TestWorkspace::new();
    let generated = workspace.write("generated.csv", "Name,Value\nA,1\n");
    let owner = workspace.write("owner.csv", "Column,Value\nA,1\n");
    let reports = workspace.path().join("reports");

    table_audit()
        .args([
            "compare",
            "-g",
            generated.to_str().unwrap(),
            "-r",
            owner.to_str().unwrap(),
            "--output-dir",
            reports.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("field 'Column' is not shared"));

    assert!(!reports.exists());
}

#[test]
fn compare_rejects_duplicate_owner_columns() {
    let workspace = TestWorkspace::new();
    let generated = workspace.write("generated.csv", "Column,Value\nA,1\n");
    let owner = workspace.write("owner.csv", "Column,Value\nA,1\nA,2\n");
    let output = workspace.path().join("out.csv");

    table_audit()
        .args([
            "compare",
            "-g",
            generated.to_str().unwrap(),
            "-r",
            owner.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("owner report lists column 'A' more than once"));

    assert!(!output.exists());
}

#[test]
fn compare_reads_tsv_and_renders_table() {
    let workspace = TestWorkspace::new();
    let generated = workspace.write("generated.tsv", "Column\tValue\nA\t1\n");
    let owner = workspace.write("owner.tsv", "Column\tValue\nA\t2\n");
    let output = workspace.path().join("combined.csv");

    table_audit()
        .args([
            "compare",
            "-g",
            generated.to_str().unwrap(),
            "-r",
            owner.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--table",
        ])
        .assert()
        .success()
        .stdout(contains("Column  Value"))
        .stdout(contains("A       MISMATCH"));

    let (_, rows) = read_csv(&output);
    assert_eq!(rows, vec![vec!["A", "MISMATCH"]]);
}

#[test]
fn log_dir_receives_log_file() {
    let workspace = TestWorkspace::new();
    let generated = workspace.write("generated.csv", "Column,Value\nA,1\n");
    let owner = workspace.write("owner.csv", "Column,Value\nB,1\n");
    let output = workspace.path().join("combined.csv");
    let logs = workspace.path().join("logs");

    table_audit()
        .env_remove("RUST_LOG")
        .args([
            "--log-dir",
            logs.to_str().unwrap(),
            "compare",
            "-g",
            generated.to_str().unwrap(),
            "-r",
            owner.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let files = workspace.files_in("logs");
    assert_eq!(files.len(), 1);
    let contents = fs::read_to_string(&files[0]).expect("read log");
    assert!(contents.contains("No common columns found!"));
}
