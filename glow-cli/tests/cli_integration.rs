//! CLI integration tests for glow-cli.
//!
//! These tests run the actual binary against a local ledger journal and
//! check outputs, exit codes, and file artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use glow_core::codec::{self, EncodeFormat};
use glow_core::CertificationResult;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the glow binary.
fn glow() -> Command {
    Command::cargo_bin("glow").unwrap()
}

/// First topic id a fresh journal hands out.
const FIRST_TOPIC: &str = "0.0.1001";

fn write_png(path: &Path, width: u32, height: u32) {
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| [(i % 200) as u8, (i / 7 % 256) as u8, (i * 3 % 256) as u8, 255])
        .collect();
    fs::write(path, codec::encode(&pixels, width, height, EncodeFormat::Png).unwrap()).unwrap();
}

/// Journal with one topic plus a 64x64 test photo.
fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let journal = temp.path().join("ledger.json");
    let photo = temp.path().join("photo.png");
    write_png(&photo, 64, 64);

    glow()
        .args(["--journal", journal.to_str().unwrap(), "topic", "create", "--memo", "Test clinic"])
        .assert()
        .success()
        .stdout(predicate::str::contains(FIRST_TOPIC));

    (temp, journal, photo)
}

fn certify(journal: &Path, photo: &Path) -> assert_cmd::assert::Assert {
    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "certify",
            photo.to_str().unwrap(),
            "--clinic",
            "clinic-harbor",
            "--patient",
            "patient-0042",
            "--photographer",
            "dr-okafor",
            "--angle",
            "face_frontal",
            "--topic",
            FIRST_TOPIC,
        ])
        .assert()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    glow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Certified clinical photography"))
        .stdout(predicate::str::contains("certify"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn test_version_displays_version() {
    glow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("glow"));
}

#[test]
fn test_help_shows_exit_codes() {
    glow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_certify_help_shows_options() {
    glow()
        .args(["certify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--clinic"))
        .stdout(predicate::str::contains("--angle"))
        .stdout(predicate::str::contains("--jpeg-quality"));
}

// ============================================================================
// Workflow Tests
// ============================================================================

#[test]
fn test_certify_writes_bundle() {
    let (temp, journal, photo) = setup();

    certify(&journal, &photo)
        .success()
        .stdout(predicate::str::contains("Computing SHA-256 hash..."))
        .stdout(predicate::str::contains("Anchoring to Hedera blockchain..."))
        .stdout(predicate::str::contains("Photo certified."));

    let bundle_path = temp.path().join("photo.png.glow");
    let bundle = CertificationResult::from_cbor(&fs::read(bundle_path).unwrap()).unwrap();
    assert_eq!(bundle.hedera.topic_id, FIRST_TOPIC);
    assert_eq!(bundle.hedera.sequence_number, 1);
    assert_eq!(bundle.sha256_hash, glow_core::compute_hash(&fs::read(&photo).unwrap()));
}

#[test]
fn test_verify_original_is_certified() {
    let (temp, journal, photo) = setup();
    certify(&journal, &photo).success();
    let bundle = temp.path().join("photo.png.glow");

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "verify",
            photo.to_str().unwrap(),
            "--bundle",
            bundle.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("CERTIFIED"));

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "verify",
            photo.to_str().unwrap(),
            "--topic",
            FIRST_TOPIC,
            "--sequence",
            "1",
        ])
        .assert()
        .success();
}

#[test]
fn test_verify_modified_image_fails() {
    let (temp, journal, photo) = setup();
    certify(&journal, &photo).success();

    let edited = temp.path().join("edited.png");
    write_png(&edited, 64, 63);

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "verify",
            edited.to_str().unwrap(),
            "--topic",
            FIRST_TOPIC,
            "--sequence",
            "1",
        ])
        .assert()
        .code(65)
        .stdout(predicate::str::contains("MODIFIED"));
}

#[test]
fn test_verify_missing_record_is_unknown() {
    let (_temp, journal, photo) = setup();

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "verify",
            photo.to_str().unwrap(),
            "--topic",
            FIRST_TOPIC,
            "--sequence",
            "42",
        ])
        .assert()
        .code(69)
        .stdout(predicate::str::contains("UNKNOWN"));
}

#[test]
fn test_decrypt_then_extract() {
    let (temp, journal, photo) = setup();
    certify(&journal, &photo).success();
    let bundle = temp.path().join("photo.png.glow");
    let decrypted = temp.path().join("delivered.png");

    glow()
        .args([
            "decrypt",
            bundle.to_str().unwrap(),
            "-o",
            decrypted.to_str().unwrap(),
        ])
        .assert()
        .success();
    assert!(decrypted.exists());

    glow()
        .args(["extract", decrypted.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watermark found"))
        .stdout(predicate::str::contains("clinic-harbor"))
        .stdout(predicate::str::contains(FIRST_TOPIC));
}

#[test]
fn test_json_bundle_roundtrip() {
    let (temp, journal, photo) = setup();
    let bundle = temp.path().join("bundle.json");

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "certify",
            photo.to_str().unwrap(),
            "--clinic",
            "c",
            "--patient",
            "p",
            "--photographer",
            "u",
            "--topic",
            FIRST_TOPIC,
            "--format",
            "json",
            "-o",
            bundle.to_str().unwrap(),
        ])
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&bundle).unwrap()).unwrap();
    assert!(json.get("sha256Hash").is_some());

    glow()
        .args(["decrypt", bundle.to_str().unwrap()])
        .assert()
        .success();
    assert!(temp.path().join("bundle.certified.png").exists());
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_missing_image_exit_code() {
    let (_temp, journal, _photo) = setup();
    certify(&journal, Path::new("nonexistent_photo.png"))
        .code(66)
        .stderr(predicate::str::contains("Failed to read image"));
}

#[test]
fn test_unmarked_image_has_no_watermark() {
    let temp = TempDir::new().unwrap();
    let photo = temp.path().join("plain.png");
    write_png(&photo, 32, 32);

    glow()
        .args(["extract", photo.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("No watermark found"));
}

#[test]
fn test_corrupt_bundle_rejected() {
    let temp = TempDir::new().unwrap();
    let bundle = temp.path().join("bad.glow");
    fs::write(&bundle, b"not a bundle").unwrap();

    glow()
        .args(["decrypt", bundle.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to parse bundle"));
}

#[test]
fn test_corrupt_journal_is_unavailable() {
    let temp = TempDir::new().unwrap();
    let journal = temp.path().join("ledger.json");
    fs::write(&journal, b"{ truncated").unwrap();

    glow()
        .args(["--journal", journal.to_str().unwrap(), "topic", "create"])
        .assert()
        .code(69)
        .stderr(predicate::str::contains("Corrupt journal"));
}

#[test]
fn test_certify_without_topic_fails() {
    let temp = TempDir::new().unwrap();
    let journal = temp.path().join("ledger.json");
    let photo = temp.path().join("photo.png");
    write_png(&photo, 64, 64);

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "certify",
            photo.to_str().unwrap(),
            "--clinic",
            "c",
            "--patient",
            "p",
            "--photographer",
            "u",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No topic bound"));
}

#[test]
fn test_low_jpeg_quality_rejected() {
    let (_temp, journal, photo) = setup();

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "certify",
            photo.to_str().unwrap(),
            "--clinic",
            "c",
            "--patient",
            "p",
            "--photographer",
            "u",
            "--jpeg-quality",
            "70",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("70"));
}

#[test]
fn test_unknown_angle_rejected() {
    let (_temp, journal, photo) = setup();

    glow()
        .args([
            "--journal",
            journal.to_str().unwrap(),
            "certify",
            photo.to_str().unwrap(),
            "--clinic",
            "c",
            "--patient",
            "p",
            "--photographer",
            "u",
            "--angle",
            "upside_down",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown capture angle"));
}

#[test]
fn test_conflicting_verbose_quiet_rejected() {
    glow()
        .args(["--verbose", "--quiet", "series"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_color_never_no_ansi() {
    let output = glow()
        .args(["--color=never", "series", "rhinoplasty"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(stdout.contains("Rhinoplasty Series"));
    assert!(stdout.contains("face_nose_basal_closeup"));
    assert!(!stdout.contains("\x1b["), "Color=never stdout should not contain ANSI codes");
}
