use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const ANNOTATIONS: &str = "Entry\tEC number\n\
P1\t1.1.1.1\n\
P2\t1.1.1.1\n\
P3\t1.1.1.2\n\
P4\t1.1.1.2;2.7.1.-\n\
P5\t2.7.1.-\n";

const DISTANCES: &str = r#"{
  "1.1.1.1": {"1.1.1.1": 0.0, "1.1.1.2": 0.4, "2.7.1.-": 3.0},
  "1.1.1.2": {"1.1.1.1": 0.4, "1.1.1.2": 0.0, "2.7.1.-": 2.5},
  "2.7.1.-": {"1.1.1.1": 3.0, "1.1.1.2": 2.5, "2.7.1.-": 0.0}
}"#;

/// Class list of an entry in `ANNOTATIONS`.
fn classes_of(entry: &str) -> Vec<&'static str> {
    ANNOTATIONS
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once('\t'))
        .find(|(id, _)| *id == entry)
        .map(|(_, classes)| classes.split(';').collect())
        .unwrap_or_default()
}

fn get_test_dir() -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(paths: &[&Path]) -> std::io::Result<()> {
    for path in paths {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

#[test]
fn test_cli_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("stats_annotations.tsv");
    fs::write(&file, ANNOTATIONS)?;

    let mut cmd = Command::cargo_bin("ecsample")?;
    cmd.arg("stats").arg(&file);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Entities:            5"))
        .stdout(predicate::str::contains("Classes:             3"))
        .stdout(predicate::str::contains("Fully specified:     2"))
        .stdout(predicate::str::contains("Multi-class entries: 1"));

    cleanup(&[&file])?;
    Ok(())
}

#[test]
fn test_cli_mine_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let input = dir.join("mine_distances.json");
    let output = dir.join("mine_out.json");
    fs::write(&input, DISTANCES)?;

    let mut cmd = Command::cargo_bin("ecsample")?;
    cmd.arg("mine")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--knn")
        .arg("1");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Mined 3 classes"));

    let mined = fs::read_to_string(&output)?;
    // knn=1 keeps only the nearest class per row.
    let expected = [
        ("1.1.1.1", "1.1.1.2"),
        ("1.1.1.2", "1.1.1.1"),
        ("2.7.1.-", "1.1.1.2"),
    ];
    let value: serde_json::Value = serde_json::from_str(&mined)?;
    for (class, nearest) in expected {
        assert_eq!(value[class]["candidates"], serde_json::json!([nearest]));
        assert_eq!(value[class]["weights"], serde_json::json!([1.0]));
    }

    cleanup(&[&input, &output])?;
    Ok(())
}

#[test]
fn test_cli_mine_rejects_zero_knn() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let input = dir.join("zero_knn_distances.json");
    let output = dir.join("zero_knn_out.json");
    fs::write(&input, DISTANCES)?;

    let mut cmd = Command::cargo_bin("ecsample")?;
    cmd.arg("mine")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--knn")
        .arg("0");
    cmd.assert().failure();

    cleanup(&[&input, &output])?;
    Ok(())
}

#[test]
fn test_cli_mine_degenerate_row_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let input = dir.join("degenerate_distances.json");
    let output = dir.join("degenerate_out.json");
    fs::write(&input, r#"{"A": {"A": 0.0, "B": 0.0}}"#)?;

    let mut cmd = Command::cargo_bin("ecsample")?;
    cmd.arg("mine").arg(&input).arg("-o").arg(&output);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no non-zero distance"));

    cleanup(&[&input, &output])?;
    Ok(())
}

#[test]
fn test_cli_triplets_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let annotations = dir.join("triplets_annotations.tsv");
    let distances = dir.join("triplets_distances.json");
    let mined = dir.join("triplets_mined.bin");
    fs::write(&annotations, ANNOTATIONS)?;
    fs::write(&distances, DISTANCES)?;

    Command::cargo_bin("ecsample")?
        .arg("mine")
        .arg(&distances)
        .arg("-o")
        .arg(&mined)
        .assert()
        .success();
    assert!(mined.exists());

    let run = |seed: &str| -> Result<String, Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("ecsample")?
            .arg("triplets")
            .arg(&annotations)
            .arg(&mined)
            .arg("--count")
            .arg("12")
            .arg("--seed")
            .arg(seed)
            .output()?;
        assert!(output.status.success());
        Ok(String::from_utf8(output.stdout)?)
    };

    let first = run("7")?;
    let second = run("7")?;
    assert_eq!(first, second, "same seed must give same triplets");
    assert_eq!(first.lines().count(), 12);

    for line in first.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 3, "bad line: {line}");
        assert_ne!(fields[0], fields[1]);
        assert_ne!(fields[0], fields[2]);
        let anchor = classes_of(fields[0]);
        assert!(
            classes_of(fields[2]).iter().all(|c| !anchor.contains(c)),
            "negative shares a class with anchor: {line}"
        );
    }

    cleanup(&[&annotations, &distances, &mined])?;
    Ok(())
}

#[test]
fn test_cli_multi() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let annotations = dir.join("multi_annotations.tsv");
    let distances = dir.join("multi_distances.json");
    let mined = dir.join("multi_mined.json");
    fs::write(&annotations, ANNOTATIONS)?;
    fs::write(&distances, DISTANCES)?;

    Command::cargo_bin("ecsample")?
        .arg("mine")
        .arg(&distances)
        .arg("-o")
        .arg(&mined)
        .assert()
        .success();

    let output = Command::cargo_bin("ecsample")?
        .arg("multi")
        .arg(&annotations)
        .arg(&mined)
        .arg("--n-pos")
        .arg("2")
        .arg("--n-neg")
        .arg("3")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    // One line per fully-specified class: anchor + 2 positives + 3 negatives.
    assert_eq!(stdout.lines().count(), 2);
    for line in stdout.lines() {
        assert_eq!(line.split('\t').count(), 6, "bad line: {line}");
    }

    cleanup(&[&annotations, &distances, &mined])?;
    Ok(())
}

#[test]
fn test_cli_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ecsample")?;
    cmd.arg("stats").arg("target/tmp/tests/does_not_exist.tsv");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load annotations"));
    Ok(())
}

