#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// 設定・認証情報が一切ない環境で tcflow を実行する
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tcflow").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env_remove("TCFLOW_CONFIG_PATH")
        .env_remove("TENCENTCLOUD_SECRET_ID")
        .env_remove("TENCENTCLOUD_SECRET_KEY")
        .env_remove("TENCENTCLOUD_REGION");
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("tcflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("vpcs"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("tcflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tcflow"));
}

/// applyコマンドのヘルプにオプションが表示されることを確認
#[test]
fn test_apply_help() {
    let mut cmd = Command::cargo_bin("tcflow").unwrap();
    cmd.arg("apply")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--prune"))
        .stdout(predicate::str::contains("--yes"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("tcflow").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// 定義ファイルがない場所でplanを実行するとエラーになることを確認
#[test]
fn test_plan_without_resources_file() {
    let dir = tempfile::tempdir().unwrap();
    isolated(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("リソース定義ファイルが見つかりません"));
}

/// 壊れた定義ファイルは解析エラーになることを確認
#[test]
fn test_plan_with_malformed_resources_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("resources.json"), "{ not json").unwrap();

    isolated(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("resources.json"));
}

/// 認証情報がなければplanは失敗することを確認
#[test]
fn test_plan_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("resources.json"),
        r#"{"resources": [{"type": "vpc", "name": "main", "config": {"name": "main", "cidr_block": "10.0.0.0/16"}}]}"#,
    )
    .unwrap();

    isolated(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TENCENTCLOUD_SECRET_ID"));
}

/// 空の状態でshowを実行できることを確認
#[test]
fn test_show_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    isolated(&dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("リソースがありません"));
}
