use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn generate(fabric: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smartzone"));
    cmd.arg("generate")
        .arg("--intent")
        .arg(fixture("fixtures/hosts.toml"))
        .arg("--fabric")
        .arg(fabric)
        .arg("--zoneset")
        .arg("ZS_FABRIC_A")
        .arg("--vsan")
        .arg("10")
        .assert()
}

#[test]
fn generate_prints_apply_sequence() {
    let output = generate("fabric_a").success().get_output().stdout.clone();
    let text = String::from_utf8(output).expect("utf-8 output");

    let expected_order = [
        "config t",
        "device-alias database",
        "  device-alias name esx01_hba0 pwwn 10:00:00:00:c9:aa:bb:01",
        "device-alias commit",
        "zone name Z_ESX_PROD vsan 10",
        "  member device-alias esx01_hba0 initiator",
        "  member device-alias vnx_spa0 target",
        "zone name Z_ESX_BACKUP vsan 10",
        "zoneset name ZS_FABRIC_A vsan 10",
        "  member Z_ESX_BACKUP",
        "zoneset activate name ZS_FABRIC_A vsan 10",
        "copy running-config startup-config",
    ];
    let mut from = 0;
    for line in expected_order {
        let pos = text[from..]
            .find(line)
            .unwrap_or_else(|| panic!("missing or out of order: {line}\n{text}"));
        from += pos + line.len();
    }
}

#[test]
fn generate_uses_selected_fabric_side() {
    generate("fabric_b")
        .success()
        .stdout(predicate::str::contains(
            "device-alias name esx01_hba0 pwwn 10:00:00:00:c9:aa:bb:02",
        ))
        .stdout(predicate::str::contains("10:00:00:00:c9:aa:bb:01").not());
}

#[test]
fn generate_rejects_unknown_fabric() {
    generate("fabric_z")
        .failure()
        .stderr(predicate::str::contains("failed to load intent"))
        .stderr(predicate::str::contains("fabric_z"));
}

#[test]
fn generate_rejects_invalid_vsan() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smartzone"));
    cmd.arg("generate")
        .arg("--intent")
        .arg(fixture("fixtures/hosts.toml"))
        .arg("--fabric")
        .arg("fabric_a")
        .arg("--zoneset")
        .arg("ZS")
        .arg("--vsan")
        .arg("4095")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid vsan"));
}

#[test]
fn generate_reports_missing_intent_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[[host]]\nname = ").expect("write broken intent");

    for (path, needle) in [(missing, "not found"), (broken, "malformed intent file")] {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smartzone"));
        cmd.arg("generate")
            .arg("--intent")
            .arg(&path)
            .arg("--fabric")
            .arg("fabric_a")
            .arg("--zoneset")
            .arg("ZS")
            .arg("--vsan")
            .arg("10")
            .assert()
            .failure()
            .stderr(predicate::str::contains(needle));
    }
}
