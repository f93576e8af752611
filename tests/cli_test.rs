//! Integration tests for the stagehand binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::io::{Cursor, Write};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A temp dir holding `stagehand.yml` and an `app/` installation.
fn setup_install(metadata_url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let app = temp.path().join("app");
    fs::create_dir_all(app.join("server")).unwrap();
    fs::write(app.join("server/server_db.json"), "{\"orders\": [7]}").unwrap();
    fs::write(
        temp.path().join("stagehand.yml"),
        format!("metadata_url: {}\ninstall_root: app\n", metadata_url),
    )
    .unwrap();
    temp
}

fn release_archive() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer
        .start_file("Org-Repo-abc123/server/index.js", options)
        .unwrap();
    writer.write_all(b"// 2.0.0").unwrap();
    writer
        .start_file("Org-Repo-abc123/server/server_db.json", options)
        .unwrap();
    writer.write_all(b"{}").unwrap();
    writer.finish().unwrap().into_inner()
}

fn mock_release(server: &MockServer, tag: &str) {
    let archive_url = server.url("/zipball");
    server.mock(|when, then| {
        when.method(GET).path("/releases/latest");
        then.status(200).json_body(json!({
            "tag_name": tag,
            "zipball_url": archive_url
        }));
    });
}

fn stagehand(dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Self-update pipeline"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_missing_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    stagehand(&temp)
        .args(["check", "--current-version", "1.0.0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("stagehand.yml"));
    Ok(())
}

#[test]
fn cli_check_reports_available_update() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    mock_release(&server, "v2.0.0");
    let temp = setup_install(&server.url("/releases/latest"));

    stagehand(&temp)
        .args(["--no-color", "check", "--current-version", "1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available: 1.0.0 → 2.0.0"));
    Ok(())
}

#[test]
fn cli_check_json_when_current() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    mock_release(&server, "v1.0.0");
    let temp = setup_install(&server.url("/releases/latest"));

    let output = stagehand(&temp)
        .args(["check", "--current-version", "v1.0.0", "--json"])
        .output()?;

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["updateAvailable"], false);
    assert_eq!(report["current"], "1.0.0");
    Ok(())
}

#[test]
fn cli_check_failure_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/releases/latest");
        then.status(500);
    });
    let temp = setup_install(&server.url("/releases/latest"));

    stagehand(&temp)
        .args(["check", "--current-version", "1.0.0"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("HTTP 500"));
    Ok(())
}

#[test]
fn cli_update_json_streams_events_then_outcome() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    mock_release(&server, "v2.0.0");
    let archive = release_archive();
    server.mock(|when, then| {
        when.method(GET).path("/zipball");
        then.status(200).body(&archive);
    });
    let temp = setup_install(&server.url("/releases/latest"));

    let output = stagehand(&temp)
        .args(["update", "--current-version", "1.0.0", "--json"])
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let lines = stdout
        .lines()
        .map(serde_json::from_str::<serde_json::Value>)
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(lines[0]["status"], "checking");
    assert_eq!(lines[1]["status"], "found");
    assert_eq!(lines[1]["version"], "2.0.0");
    let outcome = lines.last().unwrap();
    assert_eq!(outcome["updated"], true);
    assert_eq!(outcome["version"], "2.0.0");

    let app = temp.path().join("app");
    assert_eq!(fs::read_to_string(app.join("server/index.js"))?, "// 2.0.0");
    assert_eq!(
        fs::read_to_string(app.join("server/server_db.json"))?,
        "{\"orders\": [7]}"
    );
    assert!(!temp.path().join("update_staging").exists());
    Ok(())
}

#[test]
fn cli_update_up_to_date() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    mock_release(&server, "v1.0.0");
    let temp = setup_install(&server.url("/releases/latest"));

    stagehand(&temp)
        .args(["--no-color", "update", "--current-version", "1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checking for updates"))
        .stdout(predicate::str::contains("Already up to date"));
    Ok(())
}

#[test]
fn cli_update_error_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    mock_release(&server, "v2.0.0");
    server.mock(|when, then| {
        when.method(GET).path("/zipball");
        then.status(404);
    });
    let temp = setup_install(&server.url("/releases/latest"));

    stagehand(&temp)
        .args(["--no-color", "update", "--current-version", "1.0.0"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Update failed"))
        .stdout(predicate::str::contains("partially updated").not());
    Ok(())
}

#[test]
fn cli_update_apply_failure_warns_about_partial_install() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start();
    mock_release(&server, "v2.0.0");
    let archive = release_archive();
    server.mock(|when, then| {
        when.method(GET).path("/zipball");
        then.status(200).body(&archive);
    });
    let temp = setup_install(&server.url("/releases/latest"));
    // A directory where the release ships a file makes the copy fail.
    fs::create_dir_all(temp.path().join("app/server/index.js"))?;

    stagehand(&temp)
        .args(["--no-color", "update", "--current-version", "1.0.0"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Failed to apply update"))
        .stdout(predicate::str::contains("partially updated"));
    Ok(())
}
