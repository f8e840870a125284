use assert_cmd::Command;
use predicates::prelude::*;

fn devservices() -> Command {
    let mut cmd = Command::cargo_bin("devservices").unwrap();
    // ホスト側のオーバーライドファイルや設定を拾わないようにする
    cmd.current_dir(std::env::temp_dir())
        .env_remove("DEVSERVICES_CONFIG")
        .env_remove("SENTRY_EVENTSTREAM")
        .env_remove("SENTRY_CACHE")
        .env_remove("SENTRY_USE_RELAY")
        .env_remove("SENTRY_SYMBOLICATOR_ENABLED");
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    devservices()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("attach"))
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("down"))
        .stdout(predicate::str::contains("rm"));
}

/// attachのヘルプに--projectと--fastが表示されることを確認
#[test]
fn test_attach_help() {
    devservices()
        .arg("attach")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--project"))
        .stdout(predicate::str::contains("--fast"))
        .stdout(predicate::str::contains("<SERVICE>"));
}

/// upのヘルプに--excludeと--fastが表示されることを確認
#[test]
fn test_up_help() {
    devservices()
        .arg("up")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--exclude"))
        .stdout(predicate::str::contains("--fast"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    devservices().arg("invalid-command").assert().failure();
}

/// 未知のサービスへのattachはDocker接続前に失敗することを確認
#[test]
fn test_attach_unknown_service() {
    devservices()
        .arg("attach")
        .arg("nonexistent-service")
        .assert()
        .failure()
        .stderr(predicate::str::contains("不明か、無効化されています"));
}

/// only_if条件で無効化されたサービスへのattachも同様に失敗することを確認
#[test]
fn test_attach_disabled_service() {
    // イベントストリームがdummyならkafkaは解決結果に含まれない
    devservices()
        .env("SENTRY_EVENTSTREAM", "dummy")
        .arg("attach")
        .arg("kafka")
        .assert()
        .failure()
        .stderr(predicate::str::contains("不明か、無効化されています"));
}

/// rmは確認を辞退すると何も変更せずに中止することを確認
#[test]
fn test_rm_declined_confirmation() {
    devservices()
        .arg("rm")
        .write_stdin("n\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("中止しました"));
}

/// rmは空入力（EOF）でも中止することを確認
#[test]
fn test_rm_empty_input_aborts() {
    devservices()
        .arg("rm")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("中止しました"));
}

/// 壊れたオーバーライドファイルはパースエラーになることを確認
#[test]
fn test_broken_override_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devservices.yml");
    std::fs::write(&path, "redis: [broken\n").unwrap();

    devservices()
        .env("DEVSERVICES_CONFIG", &path)
        .arg("attach")
        .arg("redis")
        .assert()
        .failure()
        .stderr(predicate::str::contains("パースエラー"));
}
