use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn chonk() -> Command {
    Command::cargo_bin("chonk").unwrap()
}

#[test]
fn hash_prints_sha256_digest() {
    chonk()
        .args(["hash", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ))
        .stdout(predicate::str::contains("leading zeros: 0"));
}

#[test]
fn hash_with_simple_algorithm() {
    chonk()
        .args(["hash", "a", "--algorithm", "simple"])
        .assert()
        .success()
        .stdout(predicate::str::contains("af63dc4c8601ec8c"));
}

#[test]
fn mine_finds_a_block() {
    chonk()
        .args(["mine", "--difficulty", "1", "--tx", "alice:bob:5"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("found"))
        .stdout(predicate::str::contains("tip:   #1 (1 txs)"));
}

#[test]
fn mine_reports_exhausted_budget() {
    let out = chonk()
        .args(["mine", "--difficulty", "64", "--max-iterations", "30", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let outcome: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(outcome["found"], false);
    assert_eq!(outcome["attempts"], 30);
}

#[test]
fn chain_verifies_clean() {
    chonk()
        .args(["chain", "--blocks", "3", "--difficulty", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chain valid"));
}

#[test]
fn chain_detects_tamper() {
    chonk()
        .args(["chain", "--blocks", "3", "--difficulty", "1", "--tamper", "2:0:1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chain INVALID at [2]"))
        .stdout(predicate::str::contains("HashMismatch"));
}

#[test]
fn chain_rehash_moves_failure_downstream() {
    chonk()
        .args([
            "chain", "--blocks", "3", "--difficulty", "0", "--tamper", "1:0:1", "--rehash",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("chain INVALID at [2]"))
        .stdout(predicate::str::contains("BrokenLink"));
}

#[test]
fn chain_rejects_unknown_block() {
    chonk()
        .args(["chain", "--blocks", "1", "--difficulty", "0", "--tamper", "9:0:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no block at index 9"));
}

#[test]
fn simulate_json_is_line_delimited() {
    let out = chonk()
        .args([
            "simulate", "--algorithm", "dpos", "--nodes", "5", "--rounds", "4", "--seed", "3",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 5);
    for (i, outcome) in lines[..4].iter().enumerate() {
        assert_eq!(outcome["round"], i as u64);
        assert_eq!(outcome["algorithm"], "dpos");
        assert_eq!(outcome["height_advanced"], true);
    }
    let snapshot = &lines[4];
    assert_eq!(snapshot["block_height"], 4);
    assert_eq!(snapshot["nodes"].as_array().unwrap().len(), 5);
}

#[test]
fn simulate_is_reproducible_with_seed() {
    let run = || {
        chonk()
            .args(["simulate", "--algorithm", "pos", "--rounds", "6", "--seed", "9"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn config_file_sets_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"simulation":{{"algorithm":"pbft","node_count":4}}}}"#).unwrap();
    chonk()
        .arg("--config")
        .arg(file.path())
        .args(["simulate", "--rounds", "2", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Practical Byzantine Fault Tolerance with 4 nodes"))
        .stdout(predicate::str::contains("pbft"));
}

#[test]
fn invalid_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"simulation":{{"fault_probability":2.0}}}}"#).unwrap();
    chonk()
        .arg("--config")
        .arg(file.path())
        .args(["simulate", "--rounds", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fault probability"));
}

#[test]
fn missing_config_file_is_reported() {
    chonk()
        .args(["--config", "/definitely/not/here.json", "hash", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading config"));
}

#[test]
fn realtime_simulation_reports_each_requested_round() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"simulation":{{"round_ms":5,"algorithm":"pow","node_count":3}}}}"#
    )
    .unwrap();
    let out = chonk()
        .arg("--config")
        .arg(file.path())
        .args(["simulate", "--rounds", "3", "--seed", "1", "--realtime", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    let rounds: Vec<u64> = lines[..3].iter().map(|o| o["round"].as_u64().unwrap()).collect();
    assert_eq!(rounds, vec![0, 1, 2]);
    let snapshot = &lines[3];
    assert_eq!(snapshot["round"], 3);
    assert_eq!(snapshot["block_height"], 3);
    assert_eq!(snapshot["phase"], "idle");
    for node in snapshot["nodes"].as_array().unwrap() {
        assert_eq!(node["state"], "pending");
    }
}
