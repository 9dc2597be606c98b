use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SMALL_CONFIG: &str = r#"{
    "seed": 11,
    "population": { "initial_size": 30 },
    "genome": {
        "sequence": "aaaaCCCCCcCCCCggTTTTTTaa",
        "storage": "diff",
        "features": [
            { "name": "POL", "type": "amino_acid", "fragments": [[4, 9], [10, 14]] }
        ]
    },
    "fitness": [
        { "kind": "purifying", "feature": "POL", "selection_coefficient": 0.2 }
    ],
    "mutator": {
        "substitution_rate": 0.01,
        "indel": { "insertion_rate": 0.001, "deletion_rate": 0.001 }
    },
    "replicator": {
        "type": "recombinant",
        "recombination_probability": 0.5,
        "breakpoint_probability": 0.05
    },
    "epochs": [
        { "name": "first", "generations": 10 },
        { "name": "second", "generations": 10, "replicator": { "type": "clonal" } }
    ],
    "sampling": { "interval": 5, "sample_size": 4 }
}"#;

fn write_config(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_init_writes_config() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("santa.json");

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--population-size")
        .arg("10")
        .arg("--generations")
        .arg("50")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"))
        .stdout(predicate::str::contains("Initial Population: 10"));

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"initial_size\": 10"));
    assert!(text.contains("\"generations\": 50"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = tempdir().unwrap();
    let path = write_config(temp.path(), "{}");

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("init")
        .arg("--output")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("init")
        .arg("--output")
        .arg(&path)
        .arg("--force")
        .assert()
        .success();
}

#[test]
fn test_init_then_run() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("santa.json");

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("init")
        .arg("--output")
        .arg(&path)
        .arg("-n")
        .arg("20")
        .arg("-g")
        .arg("5")
        .arg("-l")
        .arg("60")
        .arg("--seed")
        .arg("3")
        .arg("--indel-ins-rate")
        .arg("0.001")
        .arg("--recombination-prob")
        .arg("0.3")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("run")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generations Run: 5"));
}

#[test]
fn test_validate_accepts_good_config() {
    let temp = tempdir().unwrap();
    let path = write_config(temp.path(), SMALL_CONFIG);

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("20 generations"));
}

#[test]
fn test_validate_rejects_bad_config() {
    let temp = tempdir().unwrap();
    let bad = SMALL_CONFIG.replace("[[4, 9], [10, 14]]", "[[4, 9], [8, 14]]");
    let path = write_config(temp.path(), &bad);

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_validate_missing_file() {
    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg("/no/such/config.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_run_writes_samples() {
    let temp = tempdir().unwrap();
    let path = write_config(temp.path(), SMALL_CONFIG);
    let stats = temp.path().join("stats.tsv");
    let alignment = temp.path().join("sample.fasta");

    let mut cmd = Command::cargo_bin("santa").unwrap();
    cmd.arg("run")
        .arg("--config")
        .arg(&path)
        .arg("--stats")
        .arg(&stats)
        .arg("--alignment")
        .arg(&alignment)
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation complete!"));

    let table = fs::read_to_string(&stats).unwrap();
    let generations: Vec<&str> = table
        .lines()
        .skip(1)
        .map(|line| line.split('\t').next().unwrap())
        .collect();
    assert_eq!(generations, vec!["0", "5", "10", "15", "20"]);

    let fasta = fs::read_to_string(&alignment).unwrap();
    assert_eq!(fasta.lines().filter(|l| l.starts_with('>')).count(), 5 * 4);
}

#[test]
fn test_run_seed_is_reproducible() {
    let temp = tempdir().unwrap();
    let path = write_config(temp.path(), SMALL_CONFIG);

    let run = |name: &str| {
        let out = temp.path().join(name);
        let mut cmd = Command::cargo_bin("santa").unwrap();
        cmd.arg("run")
            .arg("--config")
            .arg(&path)
            .arg("--seed")
            .arg("99")
            .arg("--alignment")
            .arg(&out)
            .assert()
            .success();
        fs::read_to_string(out).unwrap()
    };
    assert_eq!(run("a.fasta"), run("b.fasta"));
}
